//! The translation session: owns the state machine, the capture scheduler,
//! the in-flight guard, and the current frame sources.
//!
//! One `Translator` instance covers one session: a continuous period of
//! camera watching or a single uploaded-image analysis, bounded Idle→Idle.
//! The capture mode is fixed at construction; switching modes means
//! dropping the session and building a new one, since each mode maps to a
//! different endpoint and post-processing rule.

pub mod guard;
pub mod machine;

pub use guard::{InflightGuard, InflightLease};
pub use machine::{transition, Effect, SessionEvent, SessionState};

use crate::config::TranslatorConfig;
use crate::inference::InferenceBackend;
use crate::source::{self, DeviceGate, UploadedImage, VideoStream};
use crate::speech::{ClipboardService, SpeechRequest, SpeechService, UiLocale};
use crate::types::{CaptureMode, EncodedImage, InferenceResult};
use crate::scheduler::CaptureScheduler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handle to a live translation session. Cloning shares the session.
pub struct Translator<G: DeviceGate, C: InferenceBackend> {
    inner: Arc<Inner<G, C>>,
}

impl<G: DeviceGate, C: InferenceBackend> Clone for Translator<G, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<G: DeviceGate, C: InferenceBackend> {
    mode: CaptureMode,
    config: TranslatorConfig,
    gate: Arc<G>,
    backend: Arc<C>,
    guard: InflightGuard,
    /// Request-generation counter: bumped on stop, new selection, clear,
    /// and teardown so a late-arriving response can never be applied to a
    /// newer session phase.
    generation: AtomicU64,
    scheduler: CaptureScheduler,
    core: Mutex<Core<G::Stream>>,
}

struct Core<S: VideoStream> {
    state: SessionState,
    stream: Option<S>,
    upload: Option<UploadedImage>,
    result: Option<InferenceResult>,
    diagnostic: Option<String>,
}

impl<G: DeviceGate, C: InferenceBackend> Translator<G, C> {
    pub fn new(mode: CaptureMode, config: TranslatorConfig, gate: G, backend: C) -> Self {
        let interval = Duration::from_secs(config.capture.default_interval_secs);
        log::info!("translator session created ({} mode)", mode.as_str());
        Self {
            inner: Arc::new(Inner {
                mode,
                config,
                gate: Arc::new(gate),
                backend: Arc::new(backend),
                guard: InflightGuard::new(),
                generation: AtomicU64::new(0),
                scheduler: CaptureScheduler::new(interval),
                core: Mutex::new(Core {
                    state: SessionState::Idle,
                    stream: None,
                    upload: None,
                    result: None,
                    diagnostic: None,
                }),
            }),
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.inner.mode
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().expect("lock poisoned").state
    }

    /// The most recent result. A new result fully replaces the previous
    /// one; an empty label reads as "no result yet".
    pub fn result(&self) -> Option<InferenceResult> {
        self.inner
            .core
            .lock()
            .expect("lock poisoned")
            .result
            .clone()
    }

    /// Human-readable message for the `Error` state, if any.
    pub fn diagnostic(&self) -> Option<String> {
        self.inner
            .core
            .lock()
            .expect("lock poisoned")
            .diagnostic
            .clone()
    }

    pub fn camera_active(&self) -> bool {
        self.inner
            .core
            .lock()
            .expect("lock poisoned")
            .stream
            .is_some()
    }

    pub fn has_upload(&self) -> bool {
        self.inner
            .core
            .lock()
            .expect("lock poisoned")
            .upload
            .is_some()
    }

    /// Preview registration id of the selected image, for display layers.
    pub fn upload_preview_id(&self) -> Option<u64> {
        self.inner
            .core
            .lock()
            .expect("lock poisoned")
            .upload
            .as_ref()
            .map(|upload| upload.preview().id())
    }

    /// Whether an inference request is currently outstanding.
    pub fn inflight(&self) -> bool {
        self.inner.guard.is_engaged()
    }

    /// Current capture interval in seconds.
    pub fn capture_interval(&self) -> u64 {
        self.inner.scheduler.interval().as_secs()
    }

    /// Request the camera and, on grant, start watching.
    ///
    /// Failures never propagate: a denied or failed device lands the
    /// session in the `Error` state with a diagnostic. A grant resolving
    /// after the user already stopped or navigated away is abandoned and
    /// the fresh stream is released immediately.
    pub async fn start_camera(&self) {
        let generation = {
            let mut core = self.inner.core.lock().expect("lock poisoned");
            // Starting is only meaningful from pristine Idle; a second call
            // while a grant is pending must not race a duplicate acquisition.
            if core.state != SessionState::Idle || core.stream.is_some() {
                return;
            }
            self.inner
                .apply(&mut core, SessionEvent::StartCameraRequested);
            if core.state != SessionState::RequestingDevice {
                return;
            }
            self.inner.generation.load(Ordering::Acquire)
        };

        log::info!("requesting camera device");
        let gate = self.inner.gate.clone();
        let constraints = self.inner.config.stream.constraints();
        let acquired =
            tokio::task::spawn_blocking(move || gate.acquire(&constraints)).await;

        let mut core = self.inner.core.lock().expect("lock poisoned");
        if self.inner.generation.load(Ordering::Acquire) != generation
            || core.state != SessionState::RequestingDevice
        {
            log::debug!("device grant resolved after teardown; ignoring");
            if let Ok(Ok(mut stream)) = acquired {
                stream.release();
            }
            return;
        }

        match acquired {
            Ok(Ok(stream)) => {
                core.stream = Some(stream);
                self.inner.apply(&mut core, SessionEvent::DeviceGranted);
                drop(core);
                self.arm_scheduler();
                log::info!("camera granted; watching");
            }
            Ok(Err(e)) => {
                log::warn!("camera acquisition failed: {}", e);
                self.inner.apply(
                    &mut core,
                    SessionEvent::DeviceDenied {
                        message: e.diagnostic(),
                    },
                );
            }
            Err(e) => {
                log::error!("device acquisition task failed: {}", e);
                self.inner.apply(
                    &mut core,
                    SessionEvent::DeviceDenied {
                        message: format!("device acquisition task failed: {}", e),
                    },
                );
            }
        }
    }

    /// Stop watching: releases the device, disarms the scheduler, clears
    /// the result and diagnostic. Calling it twice produces the same
    /// observable state as calling it once.
    pub fn stop_camera(&self) {
        let mut core = self.inner.core.lock().expect("lock poisoned");
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.apply(&mut core, SessionEvent::StopRequested);
        log::info!("camera stopped");
    }

    /// Accept a user-selected file. Non-image content is silently ignored
    /// (returns false). Accepting a selection tears down an active camera
    /// session and releases the previous selection's preview resource.
    pub fn select_file_bytes(&self, bytes: Vec<u8>) -> bool {
        let Some(upload) = UploadedImage::from_bytes(bytes) else {
            return false;
        };
        let mut core = self.inner.core.lock().expect("lock poisoned");
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.apply(&mut core, SessionEvent::FileSelected);
        log::info!(
            "uploaded image selected ({} bytes, {})",
            upload.size_bytes(),
            upload.content_type()
        );
        core.upload = Some(upload);
        true
    }

    /// Read a file from disk and select it. Same rules as
    /// [`select_file_bytes`](Self::select_file_bytes).
    pub fn select_file<P: AsRef<std::path::Path>>(&self, path: P) -> bool {
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => self.select_file_bytes(bytes),
            Err(e) => {
                log::warn!("failed to read selected file {:?}: {}", path.as_ref(), e);
                false
            }
        }
    }

    /// Remove the selected image and return to pristine `Idle`, revoking
    /// the preview resource. Idempotent.
    pub fn clear_upload(&self) {
        let mut core = self.inner.core.lock().expect("lock poisoned");
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.apply(&mut core, SessionEvent::SelectionCleared);
    }

    /// Analyze the selected image once. Returns false when no image is
    /// selected, the session is not idle, or a request is already in
    /// flight (the trigger is skipped, not queued). Resolves when the
    /// outcome has been applied to the session.
    pub async fn analyze_uploaded(&self) -> bool {
        let (lease, image, generation) = {
            let mut core = self.inner.core.lock().expect("lock poisoned");
            if core.state != SessionState::Idle || core.upload.is_none() {
                return false;
            }
            let Some(lease) = self.inner.guard.try_lease() else {
                log::debug!("analyze skipped: request already in flight");
                return false;
            };
            let image = core
                .upload
                .as_ref()
                .map(UploadedImage::encoded)
                .unwrap_or_else(|| EncodedImage::jpeg(Vec::new()));
            self.inner.apply(&mut core, SessionEvent::AnalyzeStarted);
            (lease, image, self.inner.generation.load(Ordering::Acquire))
        };

        Inner::finish_analyze(self.inner.clone(), lease, image, generation).await;
        true
    }

    /// User-initiated recovery from the `Error` state: clears the
    /// diagnostic and force-resets the in-flight guard. Returns to
    /// `Watching` when the camera is still active, otherwise `Idle`.
    pub fn retry(&self) {
        let mut core = self.inner.core.lock().expect("lock poisoned");
        let camera_active = core.stream.is_some();
        self.inner
            .apply(&mut core, SessionEvent::RetryRequested { camera_active });
    }

    /// Change the periodic capture interval, clamped to the configured
    /// range. Honored only while the camera is active; takes effect on the
    /// next scheduling cycle, not retroactively. Returns the applied value.
    pub fn set_capture_interval(&self, secs: u64) -> Option<u64> {
        let clamped = self.inner.config.capture.clamp_interval(secs);
        {
            let core = self.inner.core.lock().expect("lock poisoned");
            if core.stream.is_none() {
                return None;
            }
        }
        if self
            .inner
            .scheduler
            .set_interval(Duration::from_secs(clamped))
        {
            log::info!("capture interval set to {}s", clamped);
            Some(clamped)
        } else {
            None
        }
    }

    /// Utterance for the current result, or `None` when no non-empty
    /// result is showing. Does not change the session state.
    pub fn speech_request(&self, locale: UiLocale) -> Option<SpeechRequest> {
        self.actionable_text()
            .map(|text| SpeechRequest::new(text, locale))
    }

    /// Text for clipboard copy, under the same availability rule as
    /// [`speech_request`](Self::speech_request).
    pub fn clipboard_text(&self) -> Option<String> {
        self.actionable_text()
    }

    /// Speak the current result through `service`. Returns whether an
    /// utterance was issued.
    pub fn speak_with<S: SpeechService>(&self, service: &S, locale: UiLocale) -> bool {
        match self.speech_request(locale) {
            Some(request) => {
                service.speak(&request);
                true
            }
            None => false,
        }
    }

    /// Copy the current result through `service`. Returns whether a copy
    /// was issued and acknowledged.
    pub fn copy_with<S: ClipboardService>(&self, service: &S) -> bool {
        match self.clipboard_text() {
            Some(text) => service.copy(&text),
            None => false,
        }
    }

    fn actionable_text(&self) -> Option<String> {
        let core = self.inner.core.lock().expect("lock poisoned");
        match core.state {
            SessionState::Translating | SessionState::Error => None,
            _ => core
                .result
                .as_ref()
                .filter(|result| !result.is_empty())
                .map(|result| result.label.clone()),
        }
    }

    fn arm_scheduler(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.arm(move || {
            let weak = weak.clone();
            async move {
                // A tick racing teardown simply finds the session gone.
                if let Some(inner) = weak.upgrade() {
                    Inner::run_cycle(inner).await;
                }
            }
        });
    }
}

impl<G: DeviceGate, C: InferenceBackend> Inner<G, C> {
    /// Run an event through the state machine and interpret its effects,
    /// all under the core lock.
    fn apply(&self, core: &mut Core<G::Stream>, event: SessionEvent) {
        let (next, effects) = machine::transition(core.state, event);
        for effect in effects {
            match effect {
                // Driven by start_camera itself.
                Effect::BeginDeviceAcquisition | Effect::WireStreamAndArmScheduler => {}
                Effect::ClearResult => core.result = None,
                Effect::SetResult(result) => core.result = Some(result),
                Effect::SetDiagnostic(message) => core.diagnostic = Some(message),
                Effect::ClearDiagnostic => core.diagnostic = None,
                Effect::ForceReleaseGuard => self.guard.force_release(),
                Effect::ReleaseSuspendedGuard => self.guard.release_suspended(),
                Effect::ReleaseStream => {
                    if let Some(mut stream) = core.stream.take() {
                        stream.release();
                    }
                }
                Effect::DisarmScheduler => self.scheduler.disarm(),
                Effect::ReleaseUpload => {
                    if let Some(mut upload) = core.upload.take() {
                        upload.release();
                    }
                }
            }
        }
        core.state = next;
    }

    /// One scheduled capture-and-analyze cycle.
    async fn run_cycle(inner: Arc<Self>) {
        // Capture phase under the core lock; the network round trip happens
        // after it is released.
        let (lease, frame, generation) = {
            let mut core = inner.core.lock().expect("lock poisoned");
            if core.state != SessionState::Watching {
                return;
            }
            let Some(stream) = core.stream.as_mut() else {
                return;
            };
            // Device warmup: skip the tick until dimensions are known.
            if stream.dimensions().is_none() {
                log::debug!("skipping tick: stream not warmed up");
                return;
            }
            let Some(lease) = inner.guard.try_lease() else {
                log::debug!("skipping tick: request already in flight");
                return;
            };
            match stream.read_frame() {
                Ok(frame) => {
                    log::debug!(
                        "captured {}x{} frame at {} ({} bytes)",
                        frame.width,
                        frame.height,
                        frame.captured_at,
                        frame.size_bytes()
                    );
                    inner.apply(&mut core, SessionEvent::AnalyzeStarted);
                    let generation = inner.generation.load(Ordering::Acquire);
                    (lease, frame, generation)
                }
                Err(e) => {
                    log::warn!("frame capture failed: {}", e);
                    inner.apply(&mut core, SessionEvent::AnalyzeStarted);
                    inner.apply(
                        &mut core,
                        SessionEvent::AnalyzeFailed {
                            message: e.diagnostic(),
                        },
                    );
                    lease.persist();
                    return;
                }
            }
        };

        let image = match source::encode_frame(&frame, inner.config.encoding.jpeg_quality) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("frame encoding failed: {}", e);
                let mut core = inner.core.lock().expect("lock poisoned");
                if inner.generation.load(Ordering::Acquire) == generation {
                    inner.apply(
                        &mut core,
                        SessionEvent::AnalyzeFailed {
                            message: e.diagnostic(),
                        },
                    );
                    lease.persist();
                } else {
                    lease.release();
                }
                return;
            }
        };

        Self::finish_analyze(inner, lease, image, generation).await;
    }

    /// Run one inference round trip and reconcile the outcome.
    ///
    /// The session is held only weakly across the network await so
    /// teardown is never delayed by a slow response; a late response whose
    /// generation has moved on is discarded, releasing its lease.
    async fn finish_analyze(
        inner: Arc<Self>,
        lease: InflightLease,
        image: EncodedImage,
        generation: u64,
    ) {
        let backend = inner.backend.clone();
        let mode = inner.mode;
        let weak = Arc::downgrade(&inner);
        drop(inner);

        let outcome =
            tokio::task::spawn_blocking(move || backend.analyze(&image, mode)).await;

        let Some(inner) = weak.upgrade() else {
            // Session torn down mid-flight; the lease drop frees the guard.
            return;
        };

        let mut core = inner.core.lock().expect("lock poisoned");
        if inner.generation.load(Ordering::Acquire) != generation {
            log::debug!("discarding stale inference response");
            lease.release();
            return;
        }

        match outcome {
            Ok(Ok(result)) => {
                log::info!(
                    "inference result: {:?} ({}%)",
                    result.label,
                    result.confidence_percent()
                );
                let camera_active = core.stream.is_some();
                inner.apply(
                    &mut core,
                    SessionEvent::AnalyzeSucceeded {
                        result,
                        camera_active,
                    },
                );
                lease.release();
            }
            Ok(Err(e)) => {
                log::warn!("inference failed: {}", e);
                inner.apply(
                    &mut core,
                    SessionEvent::AnalyzeFailed {
                        message: e.diagnostic(),
                    },
                );
                // Ticks stay suspended until retry or teardown frees
                // the slot.
                lease.persist();
            }
            Err(e) => {
                log::error!("inference task failed: {}", e);
                inner.apply(
                    &mut core,
                    SessionEvent::AnalyzeFailed {
                        message: format!("inference task failed: {}", e),
                    },
                );
                lease.persist();
            }
        }
    }
}

impl<G: DeviceGate, C: InferenceBackend> Drop for Inner<G, C> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.scheduler.disarm();
        if let Ok(mut core) = self.core.lock() {
            if let Some(mut stream) = core.stream.take() {
                stream.release();
            }
            if let Some(mut upload) = core.upload.take() {
                upload.release();
            }
        }
        log::debug!("translator session dropped");
    }
}
