//! Synthetic frame sources and scripted inference backends for offline
//! testing without camera hardware or a reachable model server.

use crate::errors::PipelineError;
use crate::inference::InferenceBackend;
use crate::source::{DeviceGate, VideoStream};
use crate::types::{CaptureMode, EncodedImage, InferenceResult, RawFrame, StreamConstraints};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Create a synthetic preview frame with a gradient that varies per
/// sequence number, so consecutive captures encode to different bytes.
pub fn synthetic_frame(sequence: u64, width: u32, height: u32) -> RawFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];
    let base = (sequence % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    RawFrame::new(data, width, height, true)
}

/// Shared observation counters for a synthetic gate and its streams.
#[derive(Default)]
pub struct SyntheticStats {
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub frames: AtomicUsize,
}

/// A [`DeviceGate`] that grants synthetic streams, or denies every
/// request when built with [`SyntheticGate::denying`].
pub struct SyntheticGate {
    stats: Arc<SyntheticStats>,
    deny: bool,
    width: u32,
    height: u32,
    /// Ticks the granted stream spends warming up before reporting
    /// dimensions.
    warmup_reads: usize,
}

impl SyntheticGate {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(SyntheticStats::default()),
            deny: false,
            width: 64,
            height: 48,
            warmup_reads: 0,
        }
    }

    /// A gate that refuses every acquisition, as a user denying the
    /// permission prompt would.
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    pub fn with_warmup(mut self, reads: usize) -> Self {
        self.warmup_reads = reads;
        self
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        self.stats.clone()
    }
}

impl Default for SyntheticGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceGate for SyntheticGate {
    type Stream = SyntheticStream;

    fn acquire(&self, _constraints: &StreamConstraints) -> Result<SyntheticStream, PipelineError> {
        if self.deny {
            return Err(PipelineError::device("permission denied"));
        }
        self.stats.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(SyntheticStream {
            stats: self.stats.clone(),
            width: self.width,
            height: self.height,
            warmup_remaining: self.warmup_reads,
            sequence: 0,
            released: AtomicBool::new(false),
        })
    }
}

/// Stream of synthetic gradient frames. Counts reads and releases into
/// the gate's shared stats.
pub struct SyntheticStream {
    stats: Arc<SyntheticStats>,
    width: u32,
    height: u32,
    warmup_remaining: usize,
    sequence: u64,
    released: AtomicBool,
}

impl VideoStream for SyntheticStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        if self.warmup_remaining > 0 || self.released.load(Ordering::SeqCst) {
            None
        } else {
            Some((self.width, self.height))
        }
    }

    fn read_frame(&mut self) -> Result<RawFrame, PipelineError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(PipelineError::capture("stream already released"));
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Err(PipelineError::capture("stream warming up"));
        }
        self.stats.frames.fetch_add(1, Ordering::SeqCst);
        let frame = synthetic_frame(self.sequence, self.width, self.height);
        self.sequence += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        // Only the first release counts.
        if !self.released.swap(true, Ordering::SeqCst) {
            self.stats.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// An [`InferenceBackend`] that replays a script of outcomes, then falls
/// back to a fixed result once the script is exhausted.
pub struct ScriptedInference {
    script: Mutex<VecDeque<Result<InferenceResult, PipelineError>>>,
    fallback: Result<InferenceResult, PipelineError>,
    calls: AtomicUsize,
}

impl ScriptedInference {
    /// Answer every request with the same result.
    pub fn always(result: InferenceResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every request with the same error.
    pub fn failing(error: PipelineError) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replay `outcomes` in order, then fall back to `fallback`.
    pub fn sequence(
        outcomes: Vec<Result<InferenceResult, PipelineError>>,
        fallback: Result<InferenceResult, PipelineError>,
    ) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for ScriptedInference {
    fn analyze(
        &self,
        _image: &EncodedImage,
        _mode: CaptureMode,
    ) -> Result<InferenceResult, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().expect("lock poisoned").pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamConstraints;

    #[test]
    fn synthetic_frame_has_packed_rgb_size() {
        let frame = synthetic_frame(3, 32, 16);
        assert_eq!(frame.data.len(), 32 * 16 * 3);
        assert!(frame.mirrored);
    }

    #[test]
    fn gate_counts_acquires_and_releases() {
        let gate = SyntheticGate::new();
        let stats = gate.stats();
        let mut stream = gate.acquire(&StreamConstraints::default()).unwrap();
        stream.read_frame().unwrap();
        stream.release();
        stream.release();
        assert_eq!(stats.acquires.load(Ordering::SeqCst), 1);
        assert_eq!(stats.frames.load(Ordering::SeqCst), 1);
        assert_eq!(stats.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn denying_gate_yields_device_error() {
        let gate = SyntheticGate::denying();
        assert!(gate.acquire(&StreamConstraints::default()).is_err());
    }

    #[test]
    fn warmup_stream_hides_dimensions_until_read_through() {
        let gate = SyntheticGate::new().with_warmup(1);
        let mut stream = gate.acquire(&StreamConstraints::default()).unwrap();
        assert!(stream.dimensions().is_none());
        assert!(stream.read_frame().is_err());
        assert!(stream.dimensions().is_some());
        assert!(stream.read_frame().is_ok());
    }

    #[test]
    fn scripted_inference_replays_then_falls_back() {
        let backend = ScriptedInference::sequence(
            vec![Ok(InferenceResult::new("A", 0.9))],
            Ok(InferenceResult::empty()),
        );
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8]);
        let first = backend.analyze(&image, CaptureMode::Letters).unwrap();
        assert_eq!(first.label, "A");
        let second = backend.analyze(&image, CaptureMode::Letters).unwrap();
        assert!(second.is_empty());
        assert_eq!(backend.calls(), 2);
    }
}
