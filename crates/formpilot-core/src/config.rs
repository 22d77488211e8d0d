//! Editor configuration
//!
//! All keys have defaults, so an empty TOML document is a valid config.
//!
//! ```toml
//! default_section_title = "Section 1"
//! continue_prompt = "Continue"
//! auto_continue = false
//!
//! [idle_poll]
//! initial_interval_ms = 100
//! max_interval_ms = 1000
//! backoff_factor = 1.0
//! max_wait_ms = 60000
//! ```

use crate::error::ConfigError;
use formpilot_engine::DEFAULT_SECTION_TITLE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default synthetic prompt injected to advance the workflow
pub const DEFAULT_CONTINUE_PROMPT: &str = "Continue";

/// Form editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Title of the section auto-created for elements added to an empty form
    pub default_section_title: String,
    /// Message sent to the agent to start the next workflow stage
    pub continue_prompt: String,
    /// How to wait for a busy channel before continuing
    pub idle_poll: IdlePollPolicy,
    /// Continue automatically after a confirmation advances the workflow
    pub auto_continue: bool,
}

impl EditorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default section title
    #[inline]
    #[must_use]
    pub fn with_default_section_title(mut self, title: impl Into<String>) -> Self {
        self.default_section_title = title.into();
        self
    }

    /// With continue prompt
    #[inline]
    #[must_use]
    pub fn with_continue_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.continue_prompt = prompt.into();
        self
    }

    /// With idle poll policy
    #[inline]
    #[must_use]
    pub fn with_idle_poll(mut self, policy: IdlePollPolicy) -> Self {
        self.idle_poll = policy;
        self
    }

    /// With auto-continue
    #[inline]
    #[must_use]
    pub fn with_auto_continue(mut self, enabled: bool) -> Self {
        self.auto_continue = enabled;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`EditorConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_section_title.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "default_section_title",
                reason: "must not be empty".into(),
            });
        }
        if self.continue_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "continue_prompt",
                reason: "must not be empty".into(),
            });
        }
        self.idle_poll.validate()
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_section_title: DEFAULT_SECTION_TITLE.to_string(),
            continue_prompt: DEFAULT_CONTINUE_PROMPT.to_string(),
            idle_poll: IdlePollPolicy::default(),
            auto_continue: false,
        }
    }
}

/// Bounded retry-with-backoff for waiting on a busy channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdlePollPolicy {
    /// First wait between status checks
    pub initial_interval_ms: u64,
    /// Ceiling for the wait between checks
    pub max_interval_ms: u64,
    /// Multiplier applied after each busy check
    pub backoff_factor: f64,
    /// Bound on the whole wait; 0 waits forever
    pub max_wait_ms: u64,
}

impl IdlePollPolicy {
    /// Fixed interval, no backoff
    #[must_use]
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        let interval_ms = duration_ms(interval);
        Self {
            initial_interval_ms: interval_ms,
            max_interval_ms: interval_ms,
            backoff_factor: 1.0,
            max_wait_ms: duration_ms(max_wait),
        }
    }

    /// With backoff multiplier and ceiling
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_interval_ms = duration_ms(max_interval);
        self
    }

    /// First interval
    #[inline]
    #[must_use]
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    /// Interval following `current`
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        let scaled = current.mul_f64(self.backoff_factor.max(1.0));
        scaled.min(Duration::from_millis(self.max_interval_ms.max(self.initial_interval_ms)))
    }

    /// Total wait bound, `None` when unbounded
    #[inline]
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_ms > 0).then(|| Duration::from_millis(self.max_wait_ms))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "idle_poll.initial_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid {
                key: "idle_poll.backoff_factor",
                reason: format!("must be a finite number >= 1.0, got {}", self.backoff_factor),
            });
        }
        Ok(())
    }
}

impl Default for IdlePollPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 100,
            max_interval_ms: 1000,
            backoff_factor: 1.0,
            max_wait_ms: 60_000,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
