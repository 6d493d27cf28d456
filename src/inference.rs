//! Inference client: one request/response round trip to the remote
//! recognition service, with error normalization.
//!
//! The client selects an endpoint per capture mode, posts the encoded image
//! as a multipart body, and parses `{label?, confidence?}`. It performs no
//! retries and mutates no shared state; retry policy belongs to the session.

use crate::config::EndpointConfig;
use crate::errors::PipelineError;
use crate::types::{CaptureMode, EncodedImage, InferenceResult};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Backend seam for sessions: one analyze round trip.
///
/// Implementations must be safe to call from a blocking context; sessions
/// wrap calls in `spawn_blocking`.
pub trait InferenceBackend: Send + Sync + 'static {
    fn analyze(
        &self,
        image: &EncodedImage,
        mode: CaptureMode,
    ) -> Result<InferenceResult, PipelineError>;
}

/// Wire shape of the recognition response. Both fields are optional: a
/// missing or empty label is a valid empty result, not an error.
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// HTTP client for the remote recognition endpoints.
pub struct HttpInferenceClient {
    agent: ureq::Agent,
    endpoints: EndpointConfig,
}

impl HttpInferenceClient {
    pub fn new(endpoints: EndpointConfig) -> Self {
        // Non-success responses must surface their body as diagnostic text,
        // so they are not mapped to transport errors. No request timeout: a
        // hung call simply holds the in-flight guard until the user retries.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoints,
        }
    }

    pub fn endpoint_for(&self, mode: CaptureMode) -> String {
        self.endpoints.url_for(mode)
    }
}

impl InferenceBackend for HttpInferenceClient {
    fn analyze(
        &self,
        image: &EncodedImage,
        mode: CaptureMode,
    ) -> Result<InferenceResult, PipelineError> {
        let url = self.endpoints.url_for(mode);
        let boundary = format!(
            "----signsight-{:016x}",
            BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let body = multipart_body(image, &boundary);

        log::debug!(
            "posting {} bytes to {} ({} mode)",
            body.len(),
            url,
            mode.as_str()
        );

        let mut request = self.agent.post(&url).header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        );
        for header in &self.endpoints.extra_headers {
            request = request.header(header.name.as_str(), header.value.as_str());
        }

        let mut response = request
            .send(&body[..])
            .map_err(|e| PipelineError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.body_mut().read_to_string().unwrap_or_default();
            return Err(PipelineError::server(status.as_u16(), body_text));
        }

        let parsed: AnalyzeResponse = response.body_mut().read_json().map_err(|e| {
            PipelineError::server(status.as_u16(), format!("unparseable response: {}", e))
        })?;

        match parsed.label {
            Some(label) if !label.is_empty() => Ok(InferenceResult::new(
                mode.postprocess_label(&label),
                parsed.confidence.unwrap_or(0.0),
            )),
            // The model legitimately detected nothing.
            _ => Ok(InferenceResult::empty()),
        }
    }
}

/// Build a multipart/form-data body with a single `image` field.
fn multipart_body(image: &EncodedImage, boundary: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"capture.jpg\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", image.content_type).as_bytes());
    body.extend_from_slice(&image.data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_shape() {
        let image = EncodedImage::jpeg(vec![1, 2, 3]);
        let body = multipart_body(&image, "----signsight-x");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("------signsight-x\r\n"));
        assert!(text.contains("name=\"image\""));
        assert!(text.contains("filename=\"capture.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.ends_with("\r\n------signsight-x--\r\n"));
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let b = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
        assert_ne!(a, b);
    }

    #[test]
    fn test_endpoint_selection() {
        let client = HttpInferenceClient::new(crate::config::TranslatorConfig::default().endpoints);
        assert!(client
            .endpoint_for(CaptureMode::Letters)
            .ends_with("/analyze"));
        assert!(client
            .endpoint_for(CaptureMode::Words)
            .ends_with("/analyze_word"));
    }
}
