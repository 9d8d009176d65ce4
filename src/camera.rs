// camera.rs - camera snapshot adapter with exclusive stream ownership
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

use crate::image_record::{NewImage, SourceKind};

pub const CAMERA_UNAVAILABLE: &str = "Could not access the camera. Please check permissions.";
const NO_DEVICE: &str = "no video input device on this host";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Front camera
    User,
    /// Rear / outward camera
    #[default]
    Environment,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User        => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera is not running")]
    NotStarted,
    #[error("failed to read frame: {0}")]
    Frame(String),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// A live video stream. Dropping without `stop` is allowed; the controller
/// always calls `stop` first. Native handles are not `Send`, so neither is this.
pub trait VideoStream {
    fn frame(&mut self) -> Result<RgbaImage, CameraError>;
    fn stop(&mut self);
}

/// A video input device. `open` acquires it exclusively.
pub trait CameraDevice: Send {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// Stock device for hosts without capture support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCamera;

impl CameraDevice for UnavailableCamera {
    fn open(&mut self, _facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        Err(CameraError::DeviceUnavailable(NO_DEVICE.into()))
    }
}

impl CameraDevice for Box<dyn CameraDevice> {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
        (**self).open(facing)
    }
}

/// Position in the host's device list for a facing mode: the first device
/// faces the user, the last one faces outward.
pub fn device_slot(count: usize, facing: FacingMode) -> Option<usize> {
    match (count, facing) {
        (0, _)                       => None,
        (_, FacingMode::User)        => Some(0),
        (n, FacingMode::Environment) => Some(n - 1),
    }
}

/// The capture backend this build was compiled with.
pub fn default_device() -> Box<dyn CameraDevice> {
    #[cfg(feature = "camera")]
    {
        Box::new(native::NativeCamera)
    }
    #[cfg(not(feature = "camera"))]
    {
        Box::new(UnavailableCamera)
    }
}

// ── Native backend (feature "camera") ────────────────────────────────────

#[cfg(feature = "camera")]
pub mod native {
    use super::*;
    use nokhwa::pixel_format::RgbAFormat;
    use nokhwa::utils::{ApiBackend, RequestedFormat, RequestedFormatType};
    use nokhwa::Camera;

    fn unavailable(e: impl std::fmt::Display) -> CameraError {
        CameraError::DeviceUnavailable(e.to_string())
    }

    /// Webcam through nokhwa's platform backend (V4L2, AVFoundation, Media Foundation).
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeCamera;

    impl CameraDevice for NativeCamera {
        fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError> {
            let devices = nokhwa::query(ApiBackend::Auto).map_err(unavailable)?;
            let slot = device_slot(devices.len(), facing).ok_or_else(|| unavailable(NO_DEVICE))?;
            let info = &devices[slot];

            let format = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);
            let mut camera = Camera::new(info.index().clone(), format).map_err(unavailable)?;
            camera.open_stream().map_err(unavailable)?;
            log::info!("opened '{}' as {:?} camera", info.human_name(), facing);
            Ok(Box::new(NativeStream { camera }))
        }
    }

    struct NativeStream {
        camera: Camera,
    }

    impl VideoStream for NativeStream {
        fn frame(&mut self) -> Result<RgbaImage, CameraError> {
            let buffer = self.camera.frame().map_err(|e| CameraError::Frame(e.to_string()))?;
            let decoded = buffer
                .decode_image::<RgbAFormat>()
                .map_err(|e| CameraError::Frame(e.to_string()))?;
            let (w, h) = (decoded.width(), decoded.height());
            RgbaImage::from_raw(w, h, decoded.into_raw())
                .ok_or_else(|| CameraError::Frame(format!("{}x{} frame has the wrong size", w, h)))
        }

        fn stop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("camera stop failed: {}", e);
            }
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────

/// Holds at most one stream at a time and releases it on stop, before every
/// start, and on drop.
pub struct CameraCapture<D: CameraDevice> {
    device: D,
    stream: Option<Box<dyn VideoStream>>,
    facing: FacingMode,
    error:  Option<String>,
}

impl<D: CameraDevice> CameraCapture<D> {
    pub fn new(device: D) -> Self {
        Self { device, stream: None, facing: FacingMode::default(), error: None }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// User-visible message from the last failed start.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start (or restart) with the current facing mode. On failure the
    /// controller is left without a stream and `error()` is set.
    pub fn start(&mut self) -> Result<(), CameraError> {
        self.error = None;
        self.stop();
        match self.device.open(self.facing) {
            Ok(stream) => {
                log::info!("camera started ({:?})", self.facing);
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                log::error!("Camera access error: {}", e);
                self.error = Some(CAMERA_UNAVAILABLE.to_string());
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("camera stopped");
        }
    }

    /// Flip facing mode; a running stream is restarted with the new mode.
    pub fn switch_facing(&mut self) -> Result<(), CameraError> {
        self.facing = self.facing.toggled();
        if self.is_active() {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Snapshot the current frame as a PNG record. The stream keeps running.
    pub fn capture(&mut self) -> Result<NewImage, CameraError> {
        let stream = self.stream.as_mut().ok_or(CameraError::NotStarted)?;
        let frame = stream.frame()?;
        let mut png: Vec<u8> = Vec::new();
        DynamicImage::ImageRgba8(frame).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(NewImage::from_bytes(SourceKind::Captured, "image/png", &png))
    }
}

impl<D: CameraDevice> Drop for CameraCapture<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
