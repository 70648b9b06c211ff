use std::env;
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use super::*;
use crate::backend::{MockBackend, ModelBackend};
use crate::config::ConfigError;

const PRIMARY: &str = "org/primary-reranker";
const FALLBACK: &str = "org/fallback-reranker";

fn orchestrator(
    backend: &MockBackend,
    fallback: Option<&str>,
) -> (Orchestrator, MockClock) {
    let clock = MockClock::new();
    let backend: Arc<dyn ModelBackend> = Arc::new(backend.clone());
    let orchestrator = Orchestrator::new_with_clock(
        OrchestratorConfig::for_testing(PRIMARY, fallback),
        backend,
        Arc::new(clock.clone()),
    );
    (orchestrator, clock)
}

#[test]
fn test_transition_table() {
    use BackendState::*;

    assert!(Starting.can_transition_to(WaitingForBackend));
    assert!(CheckingModel.can_transition_to(Verifying));
    assert!(AcquiringModel.can_transition_to(DegradedFallback));
    assert!(Verifying.can_transition_to(DegradedFallback));
    assert!(Failed.can_transition_to(WaitingForBackend));

    assert!(!Starting.can_transition_to(Ready));
    assert!(!WaitingForBackend.can_transition_to(Ready));
    assert!(!Ready.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Ready));
    assert!(!DegradedFallback.can_transition_to(AcquiringModel));
}

#[test]
fn test_illegal_transition_leaves_state_unchanged() {
    let (publisher, gate) = readiness_channel(PRIMARY);

    let err = publisher
        .transition(BackendState::Ready, |r| r.via_fallback = true)
        .unwrap_err();

    assert_eq!(
        err,
        AcquisitionError::IllegalTransition {
            from: BackendState::Starting,
            to: BackendState::Ready,
        }
    );
    assert_eq!(gate.state(), BackendState::Starting);
    assert!(!gate.snapshot().via_fallback);
}

#[test]
fn test_state_labels() {
    assert_eq!(BackendState::WaitingForBackend.to_string(), "waiting_for_backend");
    assert_eq!(BackendState::DegradedFallback.as_str(), "degraded_fallback");
    assert_eq!(
        serde_json::to_string(&BackendState::Ready).unwrap(),
        "\"ready\""
    );
    assert!(BackendState::Failed.is_settled());
    assert!(!BackendState::Verifying.is_settled());
}

#[test]
fn test_gate_closed_before_run() {
    let backend = MockBackend::new().with_model(PRIMARY);
    let (orchestrator, _) = orchestrator(&backend, None);
    let gate = orchestrator.gate();

    assert!(!gate.is_ready());
    assert_eq!(gate.serving_scorer().err(), Some(BackendState::Starting));
    assert_eq!(gate.snapshot().reported_model(), PRIMARY);
}

#[tokio::test]
async fn test_present_model_skips_acquisition() {
    let backend = MockBackend::new().with_model(PRIMARY);
    let (orchestrator, clock) = orchestrator(&backend, Some(FALLBACK));
    let gate = orchestrator.gate();

    assert_eq!(orchestrator.run().await.unwrap(), PRIMARY);

    assert_eq!(gate.state(), BackendState::Ready);
    assert_eq!(backend.acquire_attempts(PRIMARY), 0);
    assert!(clock.sleeps().is_empty());

    let scorer = gate.serving_scorer().ok().unwrap();
    assert_eq!(scorer.model_name(), PRIMARY);
}

#[tokio::test]
async fn test_primary_succeeds_on_last_attempt_without_fallback() {
    let backend = MockBackend::new().failing_acquires(PRIMARY, 4);
    let (orchestrator, clock) = orchestrator(&backend, Some(FALLBACK));

    assert_eq!(orchestrator.run().await.unwrap(), PRIMARY);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.state, BackendState::Ready);
    assert_eq!(snapshot.model_name.as_deref(), Some(PRIMARY));
    assert!(!snapshot.via_fallback);
    assert!(snapshot.last_error.is_none());

    assert_eq!(backend.acquire_attempts(PRIMARY), 5);
    assert_eq!(backend.acquire_attempts(FALLBACK), 0);
    assert_eq!(backend.cleanup_calls(PRIMARY), 4);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 4]);
}

#[tokio::test]
async fn test_fallback_serves_when_primary_exhausted() {
    let backend = MockBackend::new().unacquirable(PRIMARY);
    let (orchestrator, _) = orchestrator(&backend, Some(FALLBACK));
    let gate = orchestrator.gate();

    assert_eq!(orchestrator.run().await.unwrap(), FALLBACK);

    let snapshot = gate.snapshot();
    assert_eq!(snapshot.state, BackendState::Ready);
    assert_eq!(snapshot.reported_model(), FALLBACK);
    assert_eq!(snapshot.target_model, PRIMARY);
    assert!(snapshot.via_fallback);
    assert!(snapshot.last_error.unwrap().contains(PRIMARY));

    assert_eq!(backend.acquire_attempts(PRIMARY), 5);
    assert_eq!(backend.acquire_attempts(FALLBACK), 1);
    assert_eq!(gate.serving_scorer().ok().unwrap().model_name(), FALLBACK);
}

#[tokio::test]
async fn test_present_fallback_is_not_acquired() {
    let backend = MockBackend::new().unacquirable(PRIMARY).with_model(FALLBACK);
    let (orchestrator, _) = orchestrator(&backend, Some(FALLBACK));

    assert_eq!(orchestrator.run().await.unwrap(), FALLBACK);
    assert_eq!(backend.acquire_attempts(FALLBACK), 0);
}

#[tokio::test]
async fn test_primary_verification_failure_uses_fallback() {
    let backend = MockBackend::new()
        .with_model(PRIMARY)
        .failing_verification(PRIMARY)
        .with_model(FALLBACK);
    let (orchestrator, _) = orchestrator(&backend, Some(FALLBACK));

    assert_eq!(orchestrator.run().await.unwrap(), FALLBACK);
    assert!(orchestrator.snapshot().via_fallback);
    assert_eq!(backend.acquire_attempts(PRIMARY), 0);
}

#[tokio::test]
async fn test_both_models_exhausted_fails_closed() {
    let backend = MockBackend::new()
        .unacquirable(PRIMARY)
        .unacquirable(FALLBACK);
    let (orchestrator, _) = orchestrator(&backend, Some(FALLBACK));
    let gate = orchestrator.gate();

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(
        &err,
        AcquisitionError::Exhausted { model, attempts: 5, .. } if model == FALLBACK
    ));

    let snapshot = gate.snapshot();
    assert_eq!(snapshot.state, BackendState::Failed);
    assert!(snapshot.scorer.is_none());
    assert!(snapshot.last_error.is_some());
    assert_eq!(gate.serving_scorer().err(), Some(BackendState::Failed));

    assert_eq!(backend.acquire_attempts(PRIMARY), 5);
    assert_eq!(backend.acquire_attempts(FALLBACK), 5);
    assert_eq!(backend.score_calls(), 0);
}

#[tokio::test]
async fn test_exhausted_without_fallback_fails() {
    let backend = MockBackend::new().unacquirable(PRIMARY);
    let (orchestrator, _) = orchestrator(&backend, None);

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(
        &err,
        AcquisitionError::Exhausted { model, .. } if model == PRIMARY
    ));
    assert_eq!(orchestrator.state(), BackendState::Failed);
}

#[tokio::test]
async fn test_unreachable_backend_fails_after_polling() {
    let backend = MockBackend::new().with_model(PRIMARY).failing_pings(100);
    let (orchestrator, clock) = orchestrator(&backend, Some(FALLBACK));

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err,
        AcquisitionError::BackendUnreachable { attempts: 3, .. }
    ));
    assert_eq!(backend.ping_calls(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
    assert_eq!(orchestrator.state(), BackendState::Failed);
}

#[tokio::test]
async fn test_backend_reachable_after_polling() {
    let backend = MockBackend::new().with_model(PRIMARY).failing_pings(2);
    let (orchestrator, clock) = orchestrator(&backend, None);

    assert!(orchestrator.run().await.is_ok());
    assert_eq!(backend.ping_calls(), 3);
    assert_eq!(clock.elapsed(), Duration::from_secs(4));
}

#[tokio::test]
async fn test_hanging_acquisition_times_out_each_attempt() {
    let backend = MockBackend::new().hanging_acquire(PRIMARY);
    let (orchestrator, clock) = orchestrator(&backend, None);

    let err = orchestrator.run().await.unwrap_err();

    match err {
        AcquisitionError::Exhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 5);
            assert!(last_error.contains("timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.cleanup_calls(PRIMARY), 5);
    assert_eq!(
        clock.elapsed(),
        Duration::from_secs(600) * 5 + Duration::from_secs(10) * 4
    );
}

#[tokio::test]
async fn test_run_only_from_starting() {
    let backend = MockBackend::new().with_model(PRIMARY);
    let (orchestrator, _) = orchestrator(&backend, None);

    orchestrator.run().await.unwrap();
    assert_eq!(
        orchestrator.run().await.unwrap_err(),
        AcquisitionError::NotRetryable {
            state: BackendState::Ready
        }
    );
}

#[tokio::test]
async fn test_retry_requires_failed_state() {
    let backend = MockBackend::new().with_model(PRIMARY);
    let (orchestrator, _) = orchestrator(&backend, None);

    assert_eq!(
        orchestrator.retry().await.unwrap_err(),
        AcquisitionError::NotRetryable {
            state: BackendState::Starting
        }
    );
}

#[tokio::test]
async fn test_retry_after_failure_recovers() {
    let backend = MockBackend::new().failing_acquires(PRIMARY, 5);
    let (orchestrator, _) = orchestrator(&backend, None);

    assert!(orchestrator.run().await.is_err());
    assert_eq!(orchestrator.state(), BackendState::Failed);

    assert_eq!(orchestrator.retry().await.unwrap(), PRIMARY);
    assert_eq!(orchestrator.state(), BackendState::Ready);
    assert_eq!(backend.acquire_attempts(PRIMARY), 6);
    assert!(orchestrator.snapshot().last_error.is_none());
}

#[tokio::test]
async fn test_concurrent_run_rejected() {
    let backend = MockBackend::new().hanging_acquire(PRIMARY);
    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorConfig::for_testing(PRIMARY, None),
        Arc::new(backend.clone()),
    ));

    let background = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move { background.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.acquire_attempts(PRIMARY), 1);
    assert_eq!(
        orchestrator.run().await.unwrap_err(),
        AcquisitionError::AlreadyRunning
    );
    assert_eq!(orchestrator.state(), BackendState::AcquiringModel);

    handle.abort();
}

#[tokio::test]
async fn test_spawned_run_settles_gate() {
    let backend = MockBackend::new().unacquirable(PRIMARY);
    let clock = MockClock::new();
    let orchestrator = Arc::new(Orchestrator::new_with_clock(
        OrchestratorConfig::for_testing(PRIMARY, Some(FALLBACK)),
        Arc::new(backend),
        Arc::new(clock),
    ));
    let gate = orchestrator.gate();

    let handle = Arc::clone(&orchestrator).spawn();
    let settled = gate.settled().await;
    handle.await.unwrap();

    assert_eq!(settled.state, BackendState::Ready);
    assert_eq!(settled.model_name.as_deref(), Some(FALLBACK));
}

fn clear_orchestrator_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("CROSSRANK_MODEL");
        env::remove_var("CROSSRANK_FALLBACK_MODEL");
        env::remove_var("CROSSRANK_CONNECT_ATTEMPTS");
        env::remove_var("CROSSRANK_CONNECT_INTERVAL_SECS");
        env::remove_var("CROSSRANK_ACQUIRE_ATTEMPTS");
        env::remove_var("CROSSRANK_ACQUIRE_TIMEOUT_SECS");
        env::remove_var("CROSSRANK_RETRY_DELAY_SECS");
    }
}

#[test]
#[serial]
fn test_config_defaults_from_env() {
    clear_orchestrator_env();

    let config = OrchestratorConfig::from_env().unwrap();
    assert_eq!(config, OrchestratorConfig::default());
    assert_eq!(config.poll.attempts, 30);
    assert_eq!(config.poll.interval, Duration::from_secs(2));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.attempt_timeout, Duration::from_secs(600));
    assert_eq!(config.retry.retry_delay, Duration::from_secs(10));
    assert!(config.fallback_model.is_some());
}

#[test]
#[serial]
fn test_config_env_overrides() {
    clear_orchestrator_env();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::set_var("CROSSRANK_MODEL", "org/custom");
        env::set_var("CROSSRANK_ACQUIRE_ATTEMPTS", "2");
        env::set_var("CROSSRANK_RETRY_DELAY_SECS", "1");
    }

    let config = OrchestratorConfig::from_env().unwrap();
    clear_orchestrator_env();

    assert_eq!(config.primary_model, "org/custom");
    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(config.retry.retry_delay, Duration::from_secs(1));
}

#[test]
#[serial]
fn test_config_empty_fallback_disables() {
    clear_orchestrator_env();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe { env::set_var("CROSSRANK_FALLBACK_MODEL", "  ") };

    let config = OrchestratorConfig::from_env().unwrap();
    clear_orchestrator_env();

    assert_eq!(config.fallback_model, None);
}

#[test]
#[serial]
fn test_config_rejects_zero_attempts() {
    clear_orchestrator_env();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe { env::set_var("CROSSRANK_ACQUIRE_ATTEMPTS", "0") };

    let result = OrchestratorConfig::from_env();
    clear_orchestrator_env();

    assert!(matches!(result, Err(ConfigError::TooSmall { min: 1, .. })));
}

#[test]
fn test_fallback_equal_to_primary_is_disabled() {
    let config = OrchestratorConfig::new(PRIMARY, Some(PRIMARY.to_string()));
    assert_eq!(config.fallback_model, None);
    assert!(config.validate().is_ok());

    assert!(matches!(
        OrchestratorConfig::new(" ", None).validate(),
        Err(ConfigError::EmptyModel)
    ));
}
