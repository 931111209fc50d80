use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use image::DynamicImage;
use log::{debug, info};
use strum_macros::AsRefStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    /// Access has not been decided yet; acquiring the stream asks for it.
    Prompt,
    Unsupported,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Camera access was denied")]
    PermissionDenied,
    #[error("No camera found on this device")]
    NoCamera,
    #[error("Error accessing camera: {0}")]
    Device(String),
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn permission(&self) -> PermissionState;

    /// Opens the video stream. The returned handle is owned exclusively by
    /// the caller until it is released or dropped.
    async fn acquire(&self) -> Result<Box<dyn FrameStream>, CaptureError>;
}

#[async_trait]
pub trait FrameStream: Send {
    /// Takes one still frame. `None` means no frame is ready yet.
    async fn snapshot(&mut self) -> Result<Option<DynamicImage>, CaptureError>;

    /// Stops the stream. Calling it more than once is a no-op.
    fn release(&mut self);
}

/// A camera whose "video" is an image file that is re-read for every frame,
/// e.g. a file a phone or webcam tool keeps overwriting.
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Camera for StillImageCamera {
    async fn permission(&self) -> PermissionState {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => PermissionState::Granted,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => PermissionState::Denied,
            Err(_) => PermissionState::Prompt,
        }
    }

    async fn acquire(&self) -> Result<Box<dyn FrameStream>, CaptureError> {
        match tokio::fs::File::open(&self.path).await {
            Ok(_) => {
                info!("Camera stream opened on {}", self.path.display());
                Ok(Box::new(StillImageStream {
                    path: self.path.clone(),
                    active: true,
                }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CaptureError::NoCamera),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(CaptureError::PermissionDenied)
            }
            Err(e) => Err(CaptureError::Device(e.to_string())),
        }
    }
}

/// Stands in when no frame source is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCamera;

#[async_trait]
impl Camera for UnavailableCamera {
    async fn permission(&self) -> PermissionState {
        PermissionState::Unsupported
    }

    async fn acquire(&self) -> Result<Box<dyn FrameStream>, CaptureError> {
        Err(CaptureError::NoCamera)
    }
}

struct StillImageStream {
    path: PathBuf,
    active: bool,
}

#[async_trait]
impl FrameStream for StillImageStream {
    async fn snapshot(&mut self) -> Result<Option<DynamicImage>, CaptureError> {
        if !self.active {
            return Err(CaptureError::Device("stream already released".to_string()));
        }
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || image::open(path))
            .await
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        match frame {
            Ok(frame) => Ok(Some(frame)),
            // the file may be mid-write; try again on the next tick
            Err(e) => {
                debug!("No frame available: {}", e);
                Ok(None)
            }
        }
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            info!("Camera stream on {} released", self.path.display());
        }
    }
}

impl Drop for StillImageStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[tokio::test]
    async fn missing_file_is_no_camera() {
        let dir = tempfile::tempdir().unwrap();
        let camera = StillImageCamera::new(dir.path().join("frame.png"));

        assert_eq!(camera.permission().await, PermissionState::Prompt);
        assert_eq!(camera.acquire().await.err(), Some(CaptureError::NoCamera));
    }

    #[tokio::test]
    async fn reads_frames_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        GrayImage::new(8, 4).save(&path).unwrap();
        let camera = StillImageCamera::new(&path);

        assert_eq!(camera.permission().await, PermissionState::Granted);
        let mut stream = camera.acquire().await.unwrap();
        let frame = stream.snapshot().await.unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 4));

        stream.release();
        assert!(stream.snapshot().await.is_err());
    }

    #[tokio::test]
    async fn unreadable_frame_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, b"half a png").unwrap();

        let mut stream = StillImageCamera::new(&path).acquire().await.unwrap();
        assert!(stream.snapshot().await.unwrap().is_none());
    }
}
