//! Barcode capture from a camera-like frame source.
//!
//! [`Scanner::open`] routes on the camera permission, acquires the stream and
//! spawns a [`ScanSession`] that samples one frame per interval until a
//! decoder reads a barcode or the session is cancelled.

pub mod camera;
pub mod decoder;
pub mod scanner;

pub use camera::{
    Camera, CaptureError, FrameStream, PermissionState, StillImageCamera,
    UnavailableCamera,
};
pub use decoder::{BarcodeDecoder, RxingDecoder};
pub use scanner::{route, ScanOutcome, ScanSession, Scanner, ScannerRoute, ScannerStart};
