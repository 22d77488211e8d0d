//! Chat persistence seam
//!
//! [`ChatStore`] is the narrow interface the editor mirrors its history
//! into. Two implementations ship with the crate:
//! - [`InMemoryChatStore`]: concurrent maps, for tests
//! - [`JsonFileChatStore`]: one JSON file per form, written atomically

use crate::error::{PersistenceError, StoreResult};
use crate::types::{ChatMessage, ChatSession, FormId, MessageId, Role, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;
use formpilot_document::CommandInvocation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Session and message persistence
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Session for `form_id`, created on first use
    async fn get_or_create_session(&self, form_id: &FormId) -> StoreResult<ChatSession>;

    /// Messages of a session, oldest first
    async fn get_messages(&self, session_id: &SessionId) -> StoreResult<Vec<ChatMessage>>;

    /// Append a message
    async fn save_message(
        &self,
        session_id: &SessionId,
        role: Role,
        text: &str,
        command_invocations: Vec<CommandInvocation>,
    ) -> StoreResult<ChatMessage>;

    /// Set a message's applied flag; idempotent
    async fn mark_applied(&self, message_id: &MessageId) -> StoreResult<()>;

    /// Drop all messages of a form's session
    async fn clear_history(&self, form_id: &FormId) -> StoreResult<()>;
}

/// In-memory store backed by concurrent maps
#[derive(Debug, Default)]
pub struct InMemoryChatStore {
    sessions: DashMap<FormId, ChatSession>,
    messages: DashMap<SessionId, Vec<ChatMessage>>,
    message_sessions: DashMap<MessageId, SessionId>,
}

impl InMemoryChatStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages across all sessions
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn get_or_create_session(&self, form_id: &FormId) -> StoreResult<ChatSession> {
        let session = self
            .sessions
            .entry(form_id.clone())
            .or_insert_with(|| ChatSession::new(form_id.clone()))
            .clone();
        Ok(session)
    }

    async fn get_messages(&self, session_id: &SessionId) -> StoreResult<Vec<ChatMessage>> {
        Ok(self
            .messages
            .get(session_id)
            .map(|messages| messages.clone())
            .unwrap_or_default())
    }

    async fn save_message(
        &self,
        session_id: &SessionId,
        role: Role,
        text: &str,
        command_invocations: Vec<CommandInvocation>,
    ) -> StoreResult<ChatMessage> {
        if !self.sessions.iter().any(|s| &s.value().id == session_id) {
            return Err(PersistenceError::SessionNotFound(*session_id));
        }
        let message = ChatMessage::new(*session_id, role, text, command_invocations);
        self.messages
            .entry(*session_id)
            .or_default()
            .push(message.clone());
        self.message_sessions.insert(message.id, *session_id);
        Ok(message)
    }

    async fn mark_applied(&self, message_id: &MessageId) -> StoreResult<()> {
        let session_id = self
            .message_sessions
            .get(message_id)
            .map(|entry| *entry.value())
            .ok_or(PersistenceError::MessageNotFound(*message_id))?;

        let mut messages = self
            .messages
            .get_mut(&session_id)
            .ok_or(PersistenceError::MessageNotFound(*message_id))?;
        let message = messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or(PersistenceError::MessageNotFound(*message_id))?;
        message.mark_applied();
        Ok(())
    }

    async fn clear_history(&self, form_id: &FormId) -> StoreResult<()> {
        let Some(session_id) = self.sessions.get(form_id).map(|s| s.id) else {
            return Ok(());
        };
        if let Some((_, removed)) = self.messages.remove(&session_id) {
            for message in removed {
                self.message_sessions.remove(&message.id);
            }
        }
        Ok(())
    }
}

/// On-disk layout of one form's history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormHistory {
    session: ChatSession,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

/// One `<form>.json` file per form under a directory
///
/// Writes go to a temp file that is then renamed over the target, so a crash
/// never leaves a half-written history behind. Read-modify-write cycles are
/// serialized by an internal lock.
#[derive(Debug)]
pub struct JsonFileChatStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileChatStore {
    /// Store rooted at `dir` (created if missing)
    ///
    /// # Errors
    /// [`PersistenceError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| PersistenceError::io(&dir, err))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn history_path(&self, form_id: &FormId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(form_id)))
    }

    /// Read the history at `path`, refusing one recorded for another form
    async fn read_form_history(path: &Path, form_id: &FormId) -> StoreResult<Option<FormHistory>> {
        match Self::read_history(path).await? {
            Some(history) if history.session.form_id != *form_id => {
                Err(PersistenceError::FormMismatch {
                    requested: form_id.clone(),
                    stored: history.session.form_id,
                })
            }
            history => Ok(history),
        }
    }

    /// Session for `form_id` if one was stored; never creates anything
    ///
    /// # Errors
    /// [`PersistenceError::Io`] or [`PersistenceError::Serialization`] when
    /// the file cannot be read, [`PersistenceError::FormMismatch`] when it
    /// belongs to another form.
    pub async fn session_for(&self, form_id: &FormId) -> StoreResult<Option<ChatSession>> {
        let path = self.history_path(form_id);
        Ok(Self::read_form_history(&path, form_id)
            .await?
            .map(|history| history.session))
    }

    async fn read_history(path: &Path) -> StoreResult<Option<FormHistory>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistenceError::io(path, err)),
        }
    }

    async fn write_history(path: &Path, history: &FormHistory) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(history)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|err| PersistenceError::io(&tmp_path, err))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|err| PersistenceError::io(path, err))
    }

    /// Find the history file whose session satisfies `matches`
    async fn find_history(
        &self,
        matches: impl Fn(&FormHistory) -> bool,
    ) -> StoreResult<Option<(PathBuf, FormHistory)>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|err| PersistenceError::io(&self.dir, err))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| PersistenceError::io(&self.dir, err))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_history(&path).await {
                Ok(Some(history)) if matches(&history) => return Ok(Some((path, history))),
                Ok(_) => {}
                Err(err) => debug!(path = %path.display(), error = %err, "skipping unreadable history"),
            }
        }
        Ok(None)
    }

    async fn history_for_session(&self, session_id: &SessionId) -> StoreResult<(PathBuf, FormHistory)> {
        self.find_history(|h| &h.session.id == session_id)
            .await?
            .ok_or(PersistenceError::SessionNotFound(*session_id))
    }
}

#[async_trait]
impl ChatStore for JsonFileChatStore {
    async fn get_or_create_session(&self, form_id: &FormId) -> StoreResult<ChatSession> {
        let _guard = self.write_lock.lock().await;
        let path = self.history_path(form_id);
        if let Some(history) = Self::read_form_history(&path, form_id).await? {
            return Ok(history.session);
        }
        let history = FormHistory {
            session: ChatSession::new(form_id.clone()),
            messages: Vec::new(),
        };
        Self::write_history(&path, &history).await?;
        Ok(history.session)
    }

    async fn get_messages(&self, session_id: &SessionId) -> StoreResult<Vec<ChatMessage>> {
        let (_, history) = self.history_for_session(session_id).await?;
        Ok(history.messages)
    }

    async fn save_message(
        &self,
        session_id: &SessionId,
        role: Role,
        text: &str,
        command_invocations: Vec<CommandInvocation>,
    ) -> StoreResult<ChatMessage> {
        let _guard = self.write_lock.lock().await;
        let (path, mut history) = self.history_for_session(session_id).await?;
        let message = ChatMessage::new(*session_id, role, text, command_invocations);
        history.messages.push(message.clone());
        Self::write_history(&path, &history).await?;
        Ok(message)
    }

    async fn mark_applied(&self, message_id: &MessageId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let (path, mut history) = self
            .find_history(|h| h.messages.iter().any(|m| &m.id == message_id))
            .await?
            .ok_or(PersistenceError::MessageNotFound(*message_id))?;

        let changed = history
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .is_some_and(ChatMessage::mark_applied);
        if changed {
            Self::write_history(&path, &history).await?;
        }
        Ok(())
    }

    async fn clear_history(&self, form_id: &FormId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.history_path(form_id);
        let Some(mut history) = Self::read_form_history(&path, form_id).await? else {
            return Ok(());
        };
        history.messages.clear();
        Self::write_history(&path, &history).await
    }
}

/// File stem for a form id
///
/// ASCII letters, digits and `-` pass through; every other byte becomes
/// `_xx` (lowercase hex), so distinct ids never share a file.
fn file_stem(form_id: &FormId) -> String {
    let mut stem = String::with_capacity(form_id.as_str().len());
    for byte in form_id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn exercise(store: &dyn ChatStore) {
        let form = FormId::new("contact-form");
        let session = store.get_or_create_session(&form).await.unwrap();
        assert_eq!(store.get_or_create_session(&form).await.unwrap().id, session.id);

        store
            .save_message(&session.id, Role::User, "add an email field", Vec::new())
            .await
            .unwrap();
        let reply = store
            .save_message(
                &session.id,
                Role::Assistant,
                "Done",
                vec![CommandInvocation::new("addFields", json!({ "elements": [] }))],
            )
            .await
            .unwrap();

        store.mark_applied(&reply.id).await.unwrap();
        store.mark_applied(&reply.id).await.unwrap();

        let messages = store.get_messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[1].applied);
        assert_eq!(messages[1].command_invocations.len(), 1);

        store.clear_history(&form).await.unwrap();
        assert!(store.get_messages(&session.id).await.unwrap().is_empty());
        assert!(matches!(
            store.mark_applied(&reply.id).await,
            Err(PersistenceError::MessageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        exercise(&InMemoryChatStore::new()).await;
    }

    #[tokio::test]
    async fn json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileChatStore::open(dir.path()).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let form = FormId::new("survey/2024");

        let (session, message) = {
            let store = JsonFileChatStore::open(dir.path()).await.unwrap();
            let session = store.get_or_create_session(&form).await.unwrap();
            let message = store
                .save_message(&session.id, Role::Assistant, "ok", Vec::new())
                .await
                .unwrap();
            store.mark_applied(&message.id).await.unwrap();
            (session, message)
        };

        let store = JsonFileChatStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get_or_create_session(&form).await.unwrap(), session);
        let messages = store.get_messages(&session.id).await.unwrap();
        assert_eq!(messages[0].id, message.id);
        assert!(messages[0].applied);
        assert!(dir.path().join("survey_2f2024.json").exists());
        assert!(!dir.path().join("survey_2f2024.json.tmp").exists());
    }

    #[test]
    fn file_stems_do_not_collide() {
        let stems: Vec<String> = ["survey/2024", "survey_2024", "survey.2024", "survey-2024"]
            .into_iter()
            .map(|id| file_stem(&FormId::new(id)))
            .collect();
        assert_eq!(stems, ["survey_2f2024", "survey_5f2024", "survey_2e2024", "survey-2024"]);
    }

    #[tokio::test]
    async fn similar_form_ids_keep_separate_histories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileChatStore::open(dir.path()).await.unwrap();

        let slash = store.get_or_create_session(&FormId::new("survey/2024")).await.unwrap();
        let underscore = store.get_or_create_session(&FormId::new("survey_2024")).await.unwrap();
        assert_ne!(slash.id, underscore.id);
        assert_eq!(underscore.form_id, FormId::new("survey_2024"));

        store
            .save_message(&slash.id, Role::User, "secret for survey/2024", Vec::new())
            .await
            .unwrap();
        assert!(store.get_messages(&underscore.id).await.unwrap().is_empty());
        assert_eq!(store.get_messages(&slash.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_of_another_form_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileChatStore::open(dir.path()).await.unwrap();
        let contact = FormId::new("contact");
        store.get_or_create_session(&contact).await.unwrap();
        tokio::fs::copy(
            dir.path().join("contact.json"),
            dir.path().join("feedback.json"),
        )
        .await
        .unwrap();

        let err = store
            .get_or_create_session(&FormId::new("feedback"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::FormMismatch { ref stored, .. } if stored == &contact
        ));
    }

    #[tokio::test]
    async fn session_lookup_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileChatStore::open(dir.path()).await.unwrap();
        let form = FormId::new("never-opened");

        assert_eq!(store.session_for(&form).await.unwrap(), None);
        assert!(!dir.path().join("never-opened.json").exists());

        let session = store.get_or_create_session(&form).await.unwrap();
        assert_eq!(store.session_for(&form).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn saving_to_unknown_session_fails() {
        let store = InMemoryChatStore::new();
        let err = store
            .save_message(&SessionId::new(), Role::User, "hi", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::SessionNotFound(_)));
    }
}
