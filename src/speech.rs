//! Side actions on a detected result: spoken playback and clipboard copy.
//!
//! Both are one-shot calls into external collaborators and never change the
//! session state. The speech voice is derived from the active UI locale,
//! not from the detected content.

use serde::{Deserialize, Serialize};

/// Active interface locale, used only to pick a speech voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiLocale {
    Arabic,
    English,
}

impl UiLocale {
    pub fn voice_tag(&self) -> &'static str {
        match self {
            UiLocale::Arabic => "ar-SA",
            UiLocale::English => "en-US",
        }
    }
}

/// One utterance to hand to a speech-output service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// BCP 47 voice tag, e.g. "en-US".
    pub lang: String,
    pub rate: f32,
    /// Cancel any in-progress utterance before speaking.
    pub replace_current: bool,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, locale: UiLocale) -> Self {
        Self {
            text: text.into(),
            lang: locale.voice_tag().to_string(),
            rate: 0.9,
            replace_current: true,
        }
    }
}

/// External speech-output collaborator.
pub trait SpeechService {
    fn speak(&self, request: &SpeechRequest);
}

/// External clipboard collaborator. Returns whether the copy succeeded so
/// callers can show a short acknowledgement.
pub trait ClipboardService {
    fn copy(&self, text: &str) -> bool;
}
