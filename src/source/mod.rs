//! Frame acquisition: live camera streams and uploaded still images.
//!
//! A frame source produces one encoded still image on demand, either by
//! rasterizing the current frame of a live stream or by wrapping a
//! user-selected file. Uploaded images own a scoped preview handle (the
//! object-URL analogue) that is revoked when the image is cleared or
//! replaced.

use crate::errors::PipelineError;
use crate::types::{EncodedImage, RawFrame, StreamConstraints};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "native-camera")]
pub mod native;

/// An acquired live video stream.
///
/// Implementations deliver frames in preview orientation when `mirrored` is
/// set on the frame, and must tolerate `release` being called more than
/// once.
pub trait VideoStream: Send + 'static {
    /// Native stream dimensions. `None` until the device has warmed up and
    /// can report valid dimensions.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// The current frame as packed RGB8.
    fn read_frame(&mut self) -> Result<RawFrame, PipelineError>;

    /// Stop every underlying track. Idempotent: releasing an already
    /// released stream is a no-op, not an error.
    fn release(&mut self);
}

/// Gate to a video device. Acquisition is exclusive: the returned stream
/// owns the device handle until released.
pub trait DeviceGate: Send + Sync + 'static {
    type Stream: VideoStream;

    fn acquire(&self, constraints: &StreamConstraints) -> Result<Self::Stream, PipelineError>;
}

/// Rasterize the current frame of `stream` into a lossy JPEG at the
/// stream's native resolution.
///
/// Fails with a capture error if the stream has not yet reported valid
/// dimensions (guards against capturing before the device warms up).
pub fn extract_still_frame<S: VideoStream>(
    stream: &mut S,
    jpeg_quality: u8,
) -> Result<EncodedImage, PipelineError> {
    if stream.dimensions().is_none() {
        return Err(PipelineError::capture(
            "stream has not reported valid dimensions yet",
        ));
    }
    let frame = stream.read_frame()?;
    encode_frame(&frame, jpeg_quality)
}

/// Encode a raw RGB8 frame as JPEG.
///
/// Preview-mirrored frames are flipped back horizontally first, so the
/// encoded bytes always carry the natural (non-mirrored) hand orientation.
pub fn encode_frame(frame: &RawFrame, jpeg_quality: u8) -> Result<EncodedImage, PipelineError> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.data.len() != expected {
        return Err(PipelineError::capture(format!(
            "frame buffer is {} bytes, expected {} for {}x{} RGB8",
            frame.data.len(),
            expected,
            frame.width,
            frame.height
        )));
    }

    let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| PipelineError::capture("frame buffer does not match dimensions"))?;
    let img = if frame.mirrored {
        image::imageops::flip_horizontal(&img)
    } else {
        img
    };

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
    encoder
        .encode_image(&img)
        .map_err(|e| PipelineError::capture(format!("jpeg encode failed: {}", e)))?;

    Ok(EncodedImage::jpeg(buf))
}

lazy_static::lazy_static! {
    // Global preview registry, the object-URL analogue: bytes registered for
    // display stay reachable until their handle is revoked.
    static ref PREVIEW_REGISTRY: Mutex<HashMap<u64, Arc<Vec<u8>>>> = Mutex::new(HashMap::new());
}

static NEXT_PREVIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Scoped handle to preview bytes registered for display.
///
/// Dropping or revoking the handle unregisters the bytes; revocation is
/// idempotent.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    revoked: bool,
}

impl PreviewHandle {
    fn register(bytes: Arc<Vec<u8>>) -> Self {
        let id = NEXT_PREVIEW_ID.fetch_add(1, Ordering::Relaxed);
        PREVIEW_REGISTRY
            .lock()
            .expect("lock poisoned")
            .insert(id, bytes);
        Self { id, revoked: false }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Look up the registered bytes, or `None` once revoked.
    pub fn resolve(&self) -> Option<Arc<Vec<u8>>> {
        PREVIEW_REGISTRY
            .lock()
            .expect("lock poisoned")
            .get(&self.id)
            .cloned()
    }

    /// Release the display resource. Idempotent.
    pub fn revoke(&mut self) {
        if !self.revoked {
            PREVIEW_REGISTRY
                .lock()
                .expect("lock poisoned")
                .remove(&self.id);
            self.revoked = true;
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// Whether a preview registration is still live (test hook for leak checks).
pub fn preview_exists(id: u64) -> bool {
    PREVIEW_REGISTRY
        .lock()
        .expect("lock poisoned")
        .contains_key(&id)
}

/// A user-selected still image, held for the session until replaced or
/// cleared.
#[derive(Debug)]
pub struct UploadedImage {
    bytes: Arc<Vec<u8>>,
    format: image::ImageFormat,
    preview: PreviewHandle,
}

impl UploadedImage {
    /// Wrap user-selected bytes.
    ///
    /// Validation is by content, not by file name: anything that does not
    /// sniff as an image returns `None` and the selection is silently
    /// ignored.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let format = match image::guess_format(&bytes) {
            Ok(format) => format,
            Err(_) => {
                log::debug!("ignoring non-image selection ({} bytes)", bytes.len());
                return None;
            }
        };
        let bytes = Arc::new(bytes);
        let preview = PreviewHandle::register(bytes.clone());
        Some(Self {
            bytes,
            format,
            preview,
        })
    }

    /// Read and wrap a file from disk. I/O failures are treated like
    /// non-image selections.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Option<Self> {
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => Self::from_bytes(bytes),
            Err(e) => {
                log::warn!("failed to read selected file {:?}: {}", path.as_ref(), e);
                None
            }
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// The image as already-encoded bytes for the inference client.
    pub fn encoded(&self) -> EncodedImage {
        EncodedImage::new(self.bytes.as_ref().clone(), self.content_type())
    }

    /// Release the associated display resource. Idempotent.
    pub fn release(&mut self) {
        self.preview.revoke();
    }
}
