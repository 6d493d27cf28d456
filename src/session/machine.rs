//! The session state machine as a pure function.
//!
//! Transitions are `(state, event) -> (state, effects)` with no I/O, so the
//! whole table is unit-testable without a device or a network. The session
//! owner interprets the returned effects (releasing streams, arming the
//! scheduler, mutating the displayed result).

use crate::types::InferenceResult;
use serde::Serialize;

/// Exactly one state is active at a time. `Translating` is always entered
/// from `Watching` or `Idle` and always exits back to `Watching`/`Idle` or
/// to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    RequestingDevice,
    Watching,
    Translating,
    Error,
}

/// Everything that can drive the machine: user actions and completions of
/// the asynchronous operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StartCameraRequested,
    DeviceGranted,
    DeviceDenied { message: String },
    AnalyzeStarted,
    AnalyzeSucceeded {
        result: InferenceResult,
        camera_active: bool,
    },
    AnalyzeFailed { message: String },
    RetryRequested { camera_active: bool },
    StopRequested,
    FileSelected,
    SelectionCleared,
}

/// Side effects the session owner must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    BeginDeviceAcquisition,
    WireStreamAndArmScheduler,
    ClearResult,
    SetResult(InferenceResult),
    SetDiagnostic(String),
    ClearDiagnostic,
    ForceReleaseGuard,
    /// Free the request slot only if a failed cycle left it suspended; a
    /// live request keeps its hold until completion.
    ReleaseSuspendedGuard,
    ReleaseStream,
    DisarmScheduler,
    ReleaseUpload,
}

/// Apply one event. Unmatched (state, event) pairs leave the state
/// unchanged with no effects; completions arriving after teardown are
/// ignored here and discarded by the caller's liveness checks.
pub fn transition(state: SessionState, event: SessionEvent) -> (SessionState, Vec<Effect>) {
    use Effect::*;
    use SessionEvent::*;
    use SessionState::*;

    match (state, event) {
        // Starting the camera discards any selected image first.
        (Idle, StartCameraRequested) => (
            RequestingDevice,
            vec![
                ReleaseUpload,
                ClearResult,
                ClearDiagnostic,
                BeginDeviceAcquisition,
            ],
        ),
        (RequestingDevice, DeviceGranted) => (Watching, vec![WireStreamAndArmScheduler]),
        (RequestingDevice, DeviceDenied { message }) => (Error, vec![SetDiagnostic(message)]),

        // A cycle begins: the previous result never lingers under a new one.
        (Watching, AnalyzeStarted) | (Idle, AnalyzeStarted) => {
            (Translating, vec![ClearResult, ClearDiagnostic])
        }

        (Translating, AnalyzeSucceeded {
            result,
            camera_active,
        }) => {
            let next = if camera_active { Watching } else { Idle };
            (next, vec![SetResult(result)])
        }

        // The camera stream, if any, is NOT torn down on failure; ticks stay
        // suspended behind the persisted guard until retry or teardown
        // frees it.
        (Translating, AnalyzeFailed { message }) => (Error, vec![SetDiagnostic(message)]),

        (Error, RetryRequested { camera_active }) => {
            let next = if camera_active { Watching } else { Idle };
            (next, vec![ClearDiagnostic, ForceReleaseGuard])
        }

        // Stop is accepted from every state so release is idempotent, and
        // covers navigating away while a device grant is pending. Teardown
        // frees a slot left suspended by a failed cycle; without that, Idle
        // would be reachable with the slot wedged and no retry to clear it.
        (_, StopRequested) => (
            Idle,
            vec![
                ReleaseStream,
                DisarmScheduler,
                ReleaseSuspendedGuard,
                ClearResult,
                ClearDiagnostic,
            ],
        ),

        // A new selection tears down whatever was in progress.
        (_, FileSelected) => (
            Idle,
            vec![
                ReleaseStream,
                DisarmScheduler,
                ReleaseSuspendedGuard,
                ReleaseUpload,
                ClearResult,
                ClearDiagnostic,
            ],
        ),

        (_, SelectionCleared) => (
            Idle,
            vec![
                ReleaseSuspendedGuard,
                ReleaseUpload,
                ClearResult,
                ClearDiagnostic,
            ],
        ),

        (state, event) => {
            log::debug!("ignoring {:?} in state {:?}", event, state);
            (state, Vec::new())
        }
    }
}
