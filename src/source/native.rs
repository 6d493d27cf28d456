//! Native camera capture via nokhwa (feature `native-camera`).

use crate::errors::PipelineError;
use crate::source::{DeviceGate, VideoStream};
use crate::types::{RawFrame, StreamConstraints};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::{query, Camera};

/// List available cameras as (id, name) pairs.
pub fn list_devices() -> Result<Vec<(String, String)>, PipelineError> {
    let cameras = query(nokhwa::utils::ApiBackend::Auto)
        .map_err(|e| PipelineError::device(format!("failed to query cameras: {}", e)))?;

    Ok(cameras
        .into_iter()
        .map(|info| (info.index().to_string(), info.human_name()))
        .collect())
}

/// Gate to a native video device.
#[derive(Debug, Clone)]
pub struct NativeGate {
    device_index: u32,
}

impl NativeGate {
    pub fn new(device_index: u32) -> Self {
        Self { device_index }
    }
}

impl Default for NativeGate {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeviceGate for NativeGate {
    type Stream = NativeStream;

    fn acquire(&self, constraints: &StreamConstraints) -> Result<Self::Stream, PipelineError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(constraints.width, constraints.height),
                FrameFormat::MJPEG,
                30,
            ),
        ));

        let mut camera = Camera::new(CameraIndex::Index(self.device_index), requested)
            .map_err(|e| PipelineError::device(format!("failed to initialize camera: {}", e)))?;

        camera
            .open_stream()
            .map_err(|e| PipelineError::device(format!("failed to open stream: {}", e)))?;

        log::info!(
            "acquired camera {} at {}",
            self.device_index,
            camera.resolution()
        );

        Ok(NativeStream {
            camera: Some(camera),
            dimensions: None,
        })
    }
}

/// A live nokhwa-backed stream.
///
/// Dimensions become available once the first frame has been decoded, so the
/// warmup guard in still-frame extraction applies here too.
pub struct NativeStream {
    camera: Option<Camera>,
    dimensions: Option<(u32, u32)>,
}

impl VideoStream for NativeStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions.or_else(|| {
            self.camera.as_ref().map(|camera| {
                let resolution = camera.resolution();
                (resolution.width_x, resolution.height_y)
            })
        })
    }

    fn read_frame(&mut self) -> Result<RawFrame, PipelineError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| PipelineError::capture("stream already released"))?;

        let buffer = camera
            .frame()
            .map_err(|e| PipelineError::capture(format!("failed to capture frame: {}", e)))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| PipelineError::capture(format!("failed to decode frame: {}", e)))?;

        let (width, height) = decoded.dimensions();
        self.dimensions = Some((width, height));

        // Native frames arrive in natural orientation; only preview layers
        // mirror them.
        Ok(RawFrame::new(decoded.into_raw(), width, height, false))
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("failed to stop camera stream: {}", e);
            }
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.release();
    }
}
