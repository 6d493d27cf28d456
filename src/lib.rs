//! SignSight: live sign-language capture and inference pipeline
//!
//! This crate drives the client side of a sign-language translation
//! system: it acquires frames from a camera or an uploaded image,
//! ships them to a recognition server as JPEG uploads, and tracks the
//! whole session through an explicit state machine.
//!
//! # Features
//! - Periodic still capture from a live video stream with a tunable interval
//! - Single-shot analysis of user-selected image files
//! - Letters and words capture modes mapped to distinct server endpoints
//! - At-most-one in-flight request, with stale-response discarding
//! - Synthetic sources and scripted backends for offline testing
//!
//! # Usage
//! ```rust,ignore
//! use signsight::{CaptureMode, HttpInferenceClient, Translator, TranslatorConfig};
//! use signsight::source::native::NativeGate;
//!
//! #[tokio::main]
//! async fn main() {
//!     signsight::init_logging();
//!     let config = TranslatorConfig::load_or_default();
//!     let client = HttpInferenceClient::new(config.endpoints.clone());
//!     let session = Translator::new(CaptureMode::Letters, config, NativeGate::default(), client);
//!     session.start_camera().await;
//! }
//! ```
pub mod config;
pub mod errors;
pub mod inference;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod speech;
pub mod types;

// Testing utilities - synthetic data for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::TranslatorConfig;
pub use errors::PipelineError;
pub use inference::{HttpInferenceClient, InferenceBackend};
pub use scheduler::CaptureScheduler;
pub use session::{SessionEvent, SessionState, Translator};
pub use source::{DeviceGate, UploadedImage, VideoStream};
pub use types::{CaptureMode, EncodedImage, InferenceResult, RawFrame, StreamConstraints};

/// Crate version, for diagnostics output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize env_logger with a sensible default filter.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("signsight=info"),
    )
    .try_init();
}
