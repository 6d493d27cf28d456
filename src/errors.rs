use thiserror::Error;

/// Failure taxonomy for the capture-and-inference pipeline.
///
/// Every failure inside a capture/analyze cycle is caught at the cycle
/// boundary and converted into an `Error` session state; the kinds exist for
/// message selection, not for differentiated recovery logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Camera permission or hardware failure.
    #[error("camera device error: {0}")]
    Device(String),

    /// The stream could not produce a still frame (e.g. not warmed up yet).
    #[error("frame capture error: {0}")]
    Capture(String),

    /// Transport-level failure reaching the inference endpoint
    /// (unreachable host, cross-origin rejection).
    #[error("network error reaching inference endpoint: {0}")]
    Network(String),

    /// Non-success response from the inference endpoint, body kept as
    /// diagnostic text.
    #[error("inference endpoint returned status {status}: {body}")]
    Server { status: u16, body: String },

    /// Configuration could not be loaded, parsed, or written.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Human-readable message for the `Error` session state.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}
