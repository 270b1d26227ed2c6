use subtitle_lift_types::{GrayFrame, RecognizedText, TextRegion};

use crate::error::OcrError;

/// Common interface for all text engines.
///
/// `detect` runs over a full frame and returns raw candidate regions;
/// `recognize` runs over one rectified crop and returns its text with a
/// confidence score. Both calls block; batching or parallelism inside a
/// backend is opaque to callers.
pub trait TextEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn detect(&self, frame: &GrayFrame) -> Result<Vec<TextRegion>, OcrError>;

    fn recognize(&self, crop: &GrayFrame) -> Result<RecognizedText, OcrError>;
}

/// Placeholder engine used while a real backend is not wired.
#[derive(Debug, Default)]
pub struct NoopEngine;

impl TextEngine for NoopEngine {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn detect(&self, _: &GrayFrame) -> Result<Vec<TextRegion>, OcrError> {
        Ok(Vec::new())
    }

    fn recognize(&self, _: &GrayFrame) -> Result<RecognizedText, OcrError> {
        Ok(RecognizedText::new("", 0.0))
    }
}
