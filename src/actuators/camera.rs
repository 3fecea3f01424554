//! Camera capture and local photo housekeeping

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix of every photo this job writes
pub const PHOTO_SUFFIX: &str = "_plant.jpg";
const PHOTO_EXTENSION: &str = ".jpg";

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera device error: {0}")]
    Device(String),
    #[error("failed to encode photo: {0}")]
    Encode(String),
    #[error("photo file error: {0}")]
    Io(#[from] io::Error),
}

/// A still camera with a preview stream
pub trait CaptureDevice {
    fn start_preview(&mut self) -> Result<(), CameraError>;
    /// Grab one frame from the running preview and write it as JPEG to `path`
    fn capture(&mut self, path: &Path) -> Result<(), CameraError>;
    fn stop_preview(&mut self) -> Result<(), CameraError>;
}

/// Owns one photo: its name is fixed when the client is created
pub struct PhotoClient<C> {
    device: C,
    photo_dir: PathBuf,
    photo_name: String,
    settle: Duration,
}

impl<C: CaptureDevice> PhotoClient<C> {
    pub fn new(device: C, photo_dir: impl Into<PathBuf>, timestamp: &str, settle: Duration) -> Self {
        Self {
            device,
            photo_dir: photo_dir.into(),
            photo_name: format!("{}{}", timestamp, PHOTO_SUFFIX),
            settle,
        }
    }

    pub fn photo_name(&self) -> &str {
        &self.photo_name
    }

    pub fn photo_path(&self) -> PathBuf {
        self.photo_dir.join(&self.photo_name)
    }

    /// Open the preview, let exposure settle, capture, close the preview.
    ///
    /// The preview is closed even when the capture fails.
    pub fn take_photo(&mut self) -> Result<(), CameraError> {
        let path = self.photo_path();
        self.device.start_preview()?;
        std::thread::sleep(self.settle);
        let captured = self.device.capture(&path);
        let stopped = self.device.stop_preview();
        captured?;
        stopped?;
        tracing::info!("Captured {}", path.display());
        Ok(())
    }

    /// Remove the photo taken by this client, and nothing else
    pub fn delete_recent_photo(&self) -> Result<(), CameraError> {
        let path = self.photo_path();
        fs::remove_file(&path)?;
        tracing::info!("Deleted {}", path.display());
        Ok(())
    }
}

/// Remove every `.jpg` file in `dir`, whoever wrote it. Returns the count.
pub fn delete_all_photos(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_photo = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(PHOTO_EXTENSION));
        if is_photo && path.is_file() {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted {}", path.display());
            removed += 1;
        }
    }
    tracing::info!("Deleted {} photo(s) from {}", removed, dir.display());
    Ok(removed)
}

#[cfg(feature = "camera")]
pub use self::native::NokhwaCamera;

#[cfg(feature = "camera")]
mod native {
    use super::{CameraError, CaptureDevice};
    use nokhwa::{
        pixel_format::RgbFormat,
        utils::{CameraIndex, RequestedFormat, RequestedFormatType},
        Camera,
    };
    use std::path::Path;

    /// V4L2 camera through nokhwa
    pub struct NokhwaCamera {
        camera: Camera,
    }

    impl NokhwaCamera {
        pub fn open(index: u32) -> Result<Self, CameraError> {
            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
            let camera = Camera::new(CameraIndex::Index(index), requested)
                .map_err(|e| CameraError::Device(format!("Failed to open camera {}: {}", index, e)))?;
            tracing::debug!("Opened camera {}: {}", index, camera.info().human_name());
            Ok(Self { camera })
        }
    }

    impl CaptureDevice for NokhwaCamera {
        fn start_preview(&mut self) -> Result<(), CameraError> {
            self.camera
                .open_stream()
                .map_err(|e| CameraError::Device(format!("Failed to open camera stream: {}", e)))
        }

        fn capture(&mut self, path: &Path) -> Result<(), CameraError> {
            let frame = self
                .camera
                .frame()
                .map_err(|e| CameraError::Device(format!("Failed to capture frame: {}", e)))?;

            let decoded = frame
                .decode_image::<RgbFormat>()
                .map_err(|e| CameraError::Encode(format!("Failed to decode frame: {}", e)))?;

            image::DynamicImage::ImageRgb8(decoded)
                .save_with_format(path, image::ImageFormat::Jpeg)
                .map_err(|e| CameraError::Encode(format!("Failed to write JPEG: {}", e)))
        }

        fn stop_preview(&mut self) -> Result<(), CameraError> {
            self.camera
                .stop_stream()
                .map_err(|e| CameraError::Device(format!("Failed to stop camera stream: {}", e)))
        }
    }
}
