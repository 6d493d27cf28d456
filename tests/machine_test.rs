//! Transition-table tests for the session state machine.
//!
//! The machine is a pure function, so full user flows run here without a
//! device, a runtime, or a network.

use signsight::session::{transition, Effect, SessionEvent, SessionState};
use signsight::types::InferenceResult;

fn denied(message: &str) -> SessionEvent {
    SessionEvent::DeviceDenied {
        message: message.to_string(),
    }
}

fn succeeded(label: &str, camera_active: bool) -> SessionEvent {
    SessionEvent::AnalyzeSucceeded {
        result: InferenceResult::new(label, 0.8),
        camera_active,
    }
}

#[test]
fn test_happy_path_watch_cycle() {
    let (s, effects) = transition(SessionState::Idle, SessionEvent::StartCameraRequested);
    assert_eq!(s, SessionState::RequestingDevice);
    assert!(effects.contains(&Effect::BeginDeviceAcquisition));
    assert!(effects.contains(&Effect::ReleaseUpload));

    let (s, _) = transition(s, SessionEvent::DeviceGranted);
    assert_eq!(s, SessionState::Watching);

    let (s, effects) = transition(s, SessionEvent::AnalyzeStarted);
    assert_eq!(s, SessionState::Translating);
    assert!(effects.contains(&Effect::ClearResult));

    let (s, effects) = transition(s, succeeded("A", true));
    assert_eq!(s, SessionState::Watching);
    assert!(matches!(effects.as_slice(), [Effect::SetResult(r)] if r.label == "A"));
}

#[test]
fn test_device_denial_lands_in_error_with_diagnostic() {
    let (s, _) = transition(SessionState::Idle, SessionEvent::StartCameraRequested);
    let (s, effects) = transition(s, denied("permission denied"));
    assert_eq!(s, SessionState::Error);
    assert_eq!(
        effects,
        vec![Effect::SetDiagnostic("permission denied".to_string())]
    );
}

#[test]
fn test_upload_analysis_returns_to_idle() {
    let (s, _) = transition(SessionState::Idle, SessionEvent::FileSelected);
    assert_eq!(s, SessionState::Idle);

    let (s, _) = transition(s, SessionEvent::AnalyzeStarted);
    assert_eq!(s, SessionState::Translating);

    // No camera: success goes back to Idle, not Watching.
    let (s, _) = transition(s, succeeded("Hello", false));
    assert_eq!(s, SessionState::Idle);
}

#[test]
fn test_failure_preserves_stream_and_requires_retry() {
    let (s, effects) = transition(
        SessionState::Translating,
        SessionEvent::AnalyzeFailed {
            message: "server error 500".to_string(),
        },
    );
    assert_eq!(s, SessionState::Error);
    // Failure never releases the stream: retry resumes watching in place.
    assert!(!effects.contains(&Effect::ReleaseStream));
    assert!(!effects.contains(&Effect::DisarmScheduler));

    let (s, effects) = transition(s, SessionEvent::RetryRequested { camera_active: true });
    assert_eq!(s, SessionState::Watching);
    assert!(effects.contains(&Effect::ForceReleaseGuard));
    assert!(effects.contains(&Effect::ClearDiagnostic));
}

#[test]
fn test_retry_without_camera_returns_to_idle() {
    let (s, _) = transition(
        SessionState::Error,
        SessionEvent::RetryRequested {
            camera_active: false,
        },
    );
    assert_eq!(s, SessionState::Idle);
}

#[test]
fn test_stop_is_accepted_from_every_state() {
    for state in [
        SessionState::Idle,
        SessionState::RequestingDevice,
        SessionState::Watching,
        SessionState::Translating,
        SessionState::Error,
    ] {
        let (s, effects) = transition(state, SessionEvent::StopRequested);
        assert_eq!(s, SessionState::Idle, "stop from {:?}", state);
        assert!(effects.contains(&Effect::ReleaseStream));
        assert!(effects.contains(&Effect::DisarmScheduler));
        assert!(effects.contains(&Effect::ReleaseSuspendedGuard));
        assert!(effects.contains(&Effect::ClearResult));
    }
}

#[test]
fn test_file_selection_tears_down_active_watch() {
    let (s, effects) = transition(SessionState::Watching, SessionEvent::FileSelected);
    assert_eq!(s, SessionState::Idle);
    assert!(effects.contains(&Effect::ReleaseStream));
    assert!(effects.contains(&Effect::ReleaseUpload));
    assert!(effects.contains(&Effect::ReleaseSuspendedGuard));
}

#[test]
fn test_every_teardown_path_frees_a_suspended_slot() {
    // A failed cycle suspends the request slot; every Error exit must be
    // able to free it, not just retry.
    for event in [
        SessionEvent::StopRequested,
        SessionEvent::FileSelected,
        SessionEvent::SelectionCleared,
    ] {
        let (s, effects) = transition(SessionState::Error, event.clone());
        assert_eq!(s, SessionState::Idle, "teardown via {:?}", event);
        assert!(
            effects.contains(&Effect::ReleaseSuspendedGuard),
            "teardown via {:?} must free a suspended slot",
            event
        );
    }
}

#[test]
fn test_clearing_selection_resets_result_and_diagnostic() {
    let (s, effects) = transition(SessionState::Idle, SessionEvent::SelectionCleared);
    assert_eq!(s, SessionState::Idle);
    assert!(effects.contains(&Effect::ReleaseUpload));
    assert!(effects.contains(&Effect::ReleaseSuspendedGuard));
    assert!(effects.contains(&Effect::ClearResult));
    assert!(effects.contains(&Effect::ClearDiagnostic));
}

#[test]
fn test_stale_completions_are_inert() {
    // Completions for a request that no session phase is waiting on leave
    // the machine untouched.
    for state in [SessionState::Idle, SessionState::Watching] {
        let (s, effects) = transition(state, succeeded("X", true));
        assert_eq!(s, state);
        assert!(effects.is_empty());

        let (s, effects) = transition(
            state,
            SessionEvent::AnalyzeFailed {
                message: "late".to_string(),
            },
        );
        assert_eq!(s, state);
        assert!(effects.is_empty());
    }
}

#[test]
fn test_starting_camera_discards_selection_first() {
    let (_, effects) = transition(SessionState::Idle, SessionEvent::StartCameraRequested);
    let release_pos = effects
        .iter()
        .position(|e| *e == Effect::ReleaseUpload)
        .unwrap();
    let begin_pos = effects
        .iter()
        .position(|e| *e == Effect::BeginDeviceAcquisition)
        .unwrap();
    assert!(release_pos < begin_pos);
}
