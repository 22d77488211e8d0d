use formpilot_core::{
    stage_for_kinds, wait_for_idle, ChannelStatus, CoreError, EditorConfig, IdlePollPolicy,
    WorkflowController, WorkflowStep,
};
use formpilot_document::CommandKind;
use formpilot_test_utils::ScriptedChannel;
use proptest::prelude::*;
use std::time::Duration;

fn arb_step() -> impl Strategy<Value = WorkflowStep> {
    proptest::sample::select(WorkflowStep::ALL.to_vec())
}

fn arb_kind() -> impl Strategy<Value = CommandKind> {
    proptest::sample::select(CommandKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_workflow_never_moves_backwards(steps in prop::collection::vec(arb_step(), 0..20)) {
        let mut workflow = WorkflowController::new();
        let mut furthest: Option<WorkflowStep> = None;
        for step in steps {
            let before = workflow.reached();
            let moved = workflow.complete(step);
            prop_assert_eq!(moved, before.map_or(true, |b| step > b));
            prop_assert!(workflow.reached() >= before);
            furthest = furthest.max(Some(step));
        }
        prop_assert_eq!(workflow.reached(), furthest);
    }

    #[test]
    fn prop_batch_stage_is_order_independent(mut kinds in prop::collection::vec(arb_kind(), 0..10)) {
        let forward = stage_for_kinds(kinds.iter().copied());
        kinds.reverse();
        prop_assert_eq!(stage_for_kinds(kinds.iter().copied()), forward);
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_wait_returns_when_idle() {
    let channel = ScriptedChannel::new();
    channel.busy_for(4);
    let policy = IdlePollPolicy::fixed(Duration::from_millis(50), Duration::from_secs(5))
        .with_backoff(2.0, Duration::from_millis(400));

    let started = tokio::time::Instant::now();
    wait_for_idle(&channel, &policy).await.unwrap();
    // 50 + 100 + 200 + 400
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(750), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_wait_outlasts_default_bound() {
    let channel = ScriptedChannel::new();
    channel.busy_for(200);
    let policy = IdlePollPolicy::fixed(Duration::from_millis(500), Duration::ZERO);
    assert_eq!(policy.max_wait(), None);
    wait_for_idle(&channel, &policy).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_error_status_ends_the_wait() {
    let channel = ScriptedChannel::new();
    channel.busy_for(2);
    channel.set_status(ChannelStatus::Error);
    let err = wait_for_idle(&channel, &IdlePollPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Channel(_)));
}

#[test]
fn test_config_from_toml() {
    let config = EditorConfig::from_toml_str(
        r#"
        default_section_title = "Details"
        auto_continue = true

        [idle_poll]
        initial_interval_ms = 250
        max_wait_ms = 10000
        "#,
    )
    .unwrap();
    assert_eq!(config.default_section_title, "Details");
    assert_eq!(config.continue_prompt, "Continue");
    assert!(config.auto_continue);
    assert_eq!(config.idle_poll.initial_interval(), Duration::from_millis(250));
    assert_eq!(config.idle_poll.max_wait(), Some(Duration::from_secs(10)));
}
