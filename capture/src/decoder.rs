use image::DynamicImage;
use log::trace;

/// Reads a barcode symbol out of one still frame.
///
/// Not finding a symbol is the normal case while the user lines the product
/// up, so a miss is `None` rather than an error.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, frame: &DynamicImage) -> Option<String>;
}

/// Multi-format decoder (UPC/EAN, Code 128, QR, ...) backed by rxing.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl BarcodeDecoder for RxingDecoder {
    fn decode(&self, frame: &DynamicImage) -> Option<String> {
        let luma = frame.to_luma8();
        let (width, height) = luma.dimensions();
        match rxing::helpers::detect_in_luma(luma.into_raw(), width, height, None) {
            Ok(result) => Some(result.getText().to_string()),
            Err(e) => {
                trace!("No barcode in frame: {}", e);
                None
            }
        }
    }
}
