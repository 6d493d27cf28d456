//! Core data types shared across the capture-and-inference pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recognition target for a session.
///
/// Fixed for the lifetime of a session: each mode maps to a different
/// inference endpoint and a different label post-processing rule, so
/// switching modes means starting a brand-new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Letters,
    Words,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Letters => "letters",
            CaptureMode::Words => "words",
        }
    }

    /// Post-process a raw model label for display.
    ///
    /// Letters mode keeps only the first character, uppercased; words mode
    /// passes the label through unchanged.
    pub fn postprocess_label(&self, raw: &str) -> String {
        match self {
            CaptureMode::Letters => raw
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default(),
            CaptureMode::Words => raw.to_string(),
        }
    }
}

/// One classification outcome from the inference endpoint.
///
/// Always produced fresh per request; a new result fully replaces the
/// previous one, never merged or accumulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub label: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
}

impl InferenceResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The model legitimately detected nothing.
    pub fn empty() -> Self {
        Self {
            label: String::new(),
            confidence: 0.0,
        }
    }

    /// An empty label is treated identically to "no result yet" for display.
    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }

    /// Confidence as a rounded percentage for display.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round() as u8
    }
}

/// A packed RGB8 video frame.
///
/// Camera frames are ephemeral: produced at the start of a capture cycle and
/// discarded after encoding, never persisted. `mirrored` marks frames carried
/// in preview orientation (flipped for user feedback); still-frame extraction
/// flips such frames back so the encoded bytes show the natural hand
/// orientation.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mirrored: bool,
    pub captured_at: DateTime<Utc>,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, mirrored: bool) -> Self {
        Self {
            data,
            width,
            height,
            mirrored,
            captured_at: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// A compressed still image ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
        }
    }

    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new(data, "image/jpeg")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Preferred camera facing for device acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front-facing (selfie) camera.
    User,
    /// Rear-facing camera.
    Environment,
}

/// Constraints for acquiring a video device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    /// Preferred width in pixels (ideal, not exact).
    pub width: u32,
    /// Preferred height in pixels (ideal, not exact).
    pub height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            width: 1280,
            height: 720,
        }
    }
}
