//! Extraction pipeline: pulls frames, samples, recognizes, aggregates.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use subtitle_lift_ocr::TextEngine;
use subtitle_lift_types::{FrameError, GrayFrame, RecognizedText, SubtitleCue};

use crate::aggregator::{AggregatorConfig, CueAggregator};
use crate::geometry::{
    self, filter_subtitle_regions, rectify_regions, GeometryConfig, RectifyMode,
};
use crate::output::CropDumper;
use crate::source::FrameSource;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Target frames analyzed per second of video.
    pub sample_rate: f64,
    pub geometry: GeometryConfig,
    pub rectify_mode: RectifyMode,
    pub aggregator: AggregatorConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 5.0,
            geometry: GeometryConfig::default(),
            rectify_mode: RectifyMode::Quad,
            aggregator: AggregatorConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ExtractError {
    /// The source cannot drive an extraction run (missing fps or length).
    Input { message: String },
    /// The engine or configuration rejected the run before frames flowed.
    Configuration { message: String },
}

impl ExtractError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Input { message } => write!(f, "input error: {message}"),
            ExtractError::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Outcome of one extraction run. `failure` carries a mid-stream source
/// error; the cues collected before the failure are still present.
#[derive(Debug)]
pub struct ExtractionReport {
    pub cues: Vec<SubtitleCue>,
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub cancelled: bool,
    pub failure: Option<FrameError>,
}

pub struct SubtitleExtractor {
    config: ExtractorConfig,
    crop_sink: Option<CropDumper>,
}

impl SubtitleExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            crop_sink: None,
        }
    }

    /// Attaches a crop dumper; every rectified crop fed to the recognizer is
    /// also written to disk.
    pub fn with_crop_dumper(mut self, dumper: CropDumper) -> Self {
        self.crop_sink = Some(dumper);
        self
    }

    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        engine: &dyn TextEngine,
    ) -> Result<ExtractionReport, ExtractError> {
        let cancel = AtomicBool::new(false);
        self.run_with_progress(source, engine, &cancel, &mut |_| {})
    }

    pub fn run_with_progress(
        &mut self,
        source: &mut dyn FrameSource,
        engine: &dyn TextEngine,
        cancel: &AtomicBool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<ExtractionReport, ExtractError> {
        let metadata = source.metadata();
        let fps = match metadata.fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => {
                return Err(ExtractError::input(format!(
                    "{} source reports no usable frame rate",
                    source.name()
                )));
            }
        };
        let total_frames = match metadata.calculate_total_frames() {
            Some(total) if total > 0 => total,
            _ => {
                return Err(ExtractError::input(format!(
                    "{} source reports no frames",
                    source.name()
                )));
            }
        };
        if !self.config.sample_rate.is_finite() || self.config.sample_rate <= 0.0 {
            return Err(ExtractError::configuration(format!(
                "sample rate must be positive, got {}",
                self.config.sample_rate
            )));
        }

        engine
            .warm_up()
            .map_err(|err| ExtractError::configuration(format!("engine warm-up failed: {err}")))?;

        let stride = ((fps / self.config.sample_rate).floor() as u64).max(1);
        let mut aggregator = CueAggregator::new(self.config.aggregator.clone());
        let mut cues = Vec::new();
        let mut frames_read: u64 = 0;
        let mut frames_sampled: u64 = 0;
        let mut cancelled = false;
        let mut failure = None;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            let index = frame.frame_index().unwrap_or(frames_read);
            frames_read += 1;
            progress(frames_read);

            if index % stride != 0 {
                if frames_read >= total_frames {
                    break;
                }
                continue;
            }

            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            frames_sampled += 1;
            let time = index as f64 / fps;
            let texts = self.recognize_frame(engine, &frame);
            if let Some(closed) = aggregator.push_sample(time, &texts) {
                cues.push(closed);
            }

            if frames_read >= total_frames {
                break;
            }
        }

        if let Some(last) = aggregator.finish() {
            cues.push(last);
        }

        Ok(ExtractionReport {
            cues,
            frames_read,
            frames_sampled,
            cancelled,
            failure,
        })
    }

    /// Detects, filters, rectifies, and recognizes the text in one frame.
    /// Detector and recognizer failures degrade to "no text here" so one bad
    /// frame never aborts the run.
    fn recognize_frame(&mut self, engine: &dyn TextEngine, frame: &GrayFrame) -> Vec<RecognizedText> {
        let regions = match engine.detect(frame) {
            Ok(regions) => regions,
            Err(err) => {
                eprintln!(
                    "warning: detection failed on frame {}: {err}",
                    frame.frame_index().unwrap_or(0)
                );
                return Vec::new();
            }
        };
        if regions.is_empty() {
            return Vec::new();
        }

        let mut regions =
            filter_subtitle_regions(regions, frame.width(), frame.height(), &self.config.geometry);
        geometry::sort_reading_order(&mut regions);
        let crops = rectify_regions(frame, &regions, self.config.rectify_mode);

        if let Some(sink) = self.crop_sink.as_mut() {
            for crop in &crops {
                if let Err(err) = sink.push(crop) {
                    eprintln!("warning: failed to dump crop: {err}");
                }
            }
        }

        let mut texts = Vec::with_capacity(crops.len());
        for crop in &crops {
            match engine.recognize(crop) {
                Ok(text) => texts.push(text),
                Err(err) => {
                    eprintln!(
                        "warning: recognition failed on frame {}: {err}",
                        frame.frame_index().unwrap_or(0)
                    );
                    return Vec::new();
                }
            }
        }
        texts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtitle_lift_ocr::NoopEngine;
    use subtitle_lift_types::VideoMetadata;

    use crate::source::SyntheticSource;

    struct NoMetadataSource;

    impl FrameSource for NoMetadataSource {
        fn name(&self) -> &'static str {
            "no-metadata"
        }

        fn metadata(&self) -> VideoMetadata {
            VideoMetadata::new()
        }

        fn next_frame(&mut self) -> subtitle_lift_types::FrameResult<Option<GrayFrame>> {
            Ok(None)
        }
    }

    #[test]
    fn missing_metadata_fails_fast() {
        let mut extractor = SubtitleExtractor::new(ExtractorConfig::default());
        let err = extractor
            .run(&mut NoMetadataSource, &NoopEngine)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Input { .. }));
    }

    #[test]
    fn zero_sample_rate_is_a_configuration_error() {
        let config = ExtractorConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        let mut extractor = SubtitleExtractor::new(config);
        let mut source = SyntheticSource::new(8, 8, 30.0, 10);
        let err = extractor.run(&mut source, &NoopEngine).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
    }

    #[test]
    fn sampling_stride_follows_fps_over_rate() {
        // 30 fps at 5 samples/s gives a stride of 6: frames 0, 6, 12, ...
        let mut extractor = SubtitleExtractor::new(ExtractorConfig::default());
        let mut source = SyntheticSource::new(8, 8, 30.0, 60);
        let report = extractor.run(&mut source, &NoopEngine).unwrap();
        assert_eq!(report.frames_read, 60);
        assert_eq!(report.frames_sampled, 10);
        assert!(!report.cancelled);
        assert!(report.failure.is_none());
    }

    #[test]
    fn cancellation_stops_the_run() {
        let mut extractor = SubtitleExtractor::new(ExtractorConfig::default());
        let mut source = SyntheticSource::new(8, 8, 30.0, 600);
        let cancel = AtomicBool::new(true);
        let report = extractor
            .run_with_progress(&mut source, &NoopEngine, &cancel, &mut |_| {})
            .unwrap();
        assert!(report.cancelled);
        assert!(report.frames_read < 600);
    }
}
