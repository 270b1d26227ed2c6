use std::collections::HashMap;
use std::sync::Mutex;

use subtitle_lift_types::{GrayFrame, RecognizedText, TextRegion};

use crate::engine::TextEngine;
use crate::error::OcrError;

/// Scripted detections and recognitions for one frame index.
#[derive(Debug, Clone, Default)]
pub struct FixtureFrame {
    pub regions: Vec<TextRegion>,
    pub texts: Vec<RecognizedText>,
    pub fail: bool,
}

impl FixtureFrame {
    pub fn with_text(region: TextRegion, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            regions: vec![region],
            texts: vec![RecognizedText::new(text, confidence)],
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

/// Scripted engine keyed by frame index; frames without a script produce no
/// detections. Recognitions for a frame are handed out in the order the
/// pipeline submits crops, which is reading order.
#[derive(Debug, Default)]
pub struct FixtureEngine {
    frames: HashMap<u64, FixtureFrame>,
    cursor: Mutex<HashMap<u64, usize>>,
}

impl FixtureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, frame_index: u64, frame: FixtureFrame) -> Self {
        self.frames.insert(frame_index, frame);
        self
    }

    /// Scripts the same single-line detection for every listed frame index.
    pub fn script_text(
        mut self,
        frame_indices: &[u64],
        region: TextRegion,
        text: &str,
        confidence: f32,
    ) -> Self {
        for &index in frame_indices {
            self.frames
                .insert(index, FixtureFrame::with_text(region, text, confidence));
        }
        self
    }

    fn frame_index_of(frame: &GrayFrame) -> Result<u64, OcrError> {
        frame
            .frame_index()
            .ok_or_else(|| OcrError::backend("fixture engine requires indexed frames"))
    }
}

impl TextEngine for FixtureEngine {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn detect(&self, frame: &GrayFrame) -> Result<Vec<TextRegion>, OcrError> {
        let index = Self::frame_index_of(frame)?;
        match self.frames.get(&index) {
            Some(script) if script.fail => Err(OcrError::backend("scripted detection failure")),
            Some(script) => Ok(script.regions.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn recognize(&self, crop: &GrayFrame) -> Result<RecognizedText, OcrError> {
        let index = Self::frame_index_of(crop)?;
        let script = self
            .frames
            .get(&index)
            .ok_or_else(|| OcrError::backend("recognize called for unscripted frame"))?;
        if script.fail {
            return Err(OcrError::backend("scripted recognition failure"));
        }
        let mut cursors = self
            .cursor
            .lock()
            .map_err(|_| OcrError::backend("fixture cursor poisoned"))?;
        let cursor = cursors.entry(index).or_insert(0);
        let text = script
            .texts
            .get(*cursor)
            .cloned()
            .unwrap_or_else(|| RecognizedText::new("", 0.0));
        *cursor += 1;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> GrayFrame {
        GrayFrame::from_packed(8, 8, vec![0u8; 64])
            .unwrap()
            .with_frame_index(Some(index))
    }

    #[test]
    fn unscripted_frames_detect_nothing() {
        let engine = FixtureEngine::new();
        assert!(engine.detect(&frame(3)).unwrap().is_empty());
    }

    #[test]
    fn recognitions_come_out_in_script_order() {
        let region = TextRegion::from_rect(0.0, 0.0, 4.0, 2.0);
        let engine = FixtureEngine::new().script(
            1,
            FixtureFrame {
                regions: vec![region, region],
                texts: vec![
                    RecognizedText::new("first", 0.9),
                    RecognizedText::new("second", 0.8),
                ],
                fail: false,
            },
        );
        assert_eq!(engine.recognize(&frame(1)).unwrap().text, "first");
        assert_eq!(engine.recognize(&frame(1)).unwrap().text, "second");
    }

    #[test]
    fn scripted_failure_surfaces_as_backend_error() {
        let engine = FixtureEngine::new().script(2, FixtureFrame::failing());
        assert!(engine.detect(&frame(2)).is_err());
    }
}
