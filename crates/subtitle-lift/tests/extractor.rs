//! End-to-end extraction runs over scripted engines and synthetic frames.
//!
//! All scenarios use a 320x240 frame at 30 fps with the default sample rate
//! of 5 samples per second, so every sixth frame is analyzed.

use subtitle_lift::aggregator::ReappearancePolicy;
use subtitle_lift::extractor::{ExtractorConfig, SubtitleExtractor};
use subtitle_lift::source::{FrameSource, SyntheticSource};
use subtitle_lift_ocr::{FixtureEngine, FixtureFrame, TextEngine};
use subtitle_lift_types::{
    FrameError, FrameResult, GrayFrame, RecognizedText, TextRegion, VideoMetadata,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FPS: f64 = 30.0;

/// Centered bottom-band region that passes the default geometric filter.
fn subtitle_region() -> TextRegion {
    TextRegion::from_rect(100.0, 200.0, 120.0, 20.0)
}

fn sampled(range_end: u64) -> Vec<u64> {
    (0..=range_end).step_by(6).collect()
}

fn run(
    total_frames: u64,
    engine: &dyn TextEngine,
    config: ExtractorConfig,
) -> subtitle_lift::extractor::ExtractionReport {
    let mut source = SyntheticSource::new(WIDTH, HEIGHT, FPS, total_frames);
    let mut extractor = SubtitleExtractor::new(config);
    extractor.run(&mut source, engine).unwrap()
}

#[test]
fn steady_text_yields_a_single_cue() {
    let engine = FixtureEngine::new().script_text(&sampled(54), subtitle_region(), "Hello", 0.9);
    let report = run(300, &engine, ExtractorConfig::default());

    assert_eq!(report.frames_read, 300);
    assert_eq!(report.frames_sampled, 50);
    assert_eq!(report.cues.len(), 1);
    let cue = &report.cues[0];
    assert_eq!(cue.text, "Hello");
    assert_eq!(cue.start, 0.0);
    // Last sighting was frame 54, not the frame where absence was confirmed.
    assert_eq!(cue.end, Some(1.8));
}

#[test]
fn text_change_closes_the_old_cue_and_opens_a_new_one() {
    let engine = FixtureEngine::new()
        .script_text(&sampled(24), subtitle_region(), "Hello", 0.9)
        .script_text(&[30, 36, 42, 48, 54], subtitle_region(), "World", 0.9);
    let report = run(60, &engine, ExtractorConfig::default());

    assert_eq!(report.cues.len(), 2);
    assert_eq!(report.cues[0].text, "Hello");
    assert_eq!(report.cues[0].start, 0.0);
    assert_eq!(report.cues[0].end, Some(0.8));
    assert_eq!(report.cues[1].text, "World");
    assert_eq!(report.cues[1].start, 1.0);
    assert_eq!(report.cues[1].end, Some(1.8));
}

#[test]
fn reappearance_is_suppressed_by_default() {
    // Gap of ten empty samples (frames 30..84) closes the cue, then the
    // same text returns at frame 90.
    let engine = FixtureEngine::new()
        .script_text(&sampled(24), subtitle_region(), "Hello", 0.9)
        .script_text(&[90, 96, 102, 108, 114], subtitle_region(), "Hello", 0.9);
    let report = run(120, &engine, ExtractorConfig::default());

    assert_eq!(report.cues.len(), 1);
    assert_eq!(report.cues[0].end, Some(0.8));
}

#[test]
fn reopen_policy_emits_a_second_cue_for_the_returning_text() {
    let engine = FixtureEngine::new()
        .script_text(&sampled(24), subtitle_region(), "Hello", 0.9)
        .script_text(&[90, 96, 102, 108, 114], subtitle_region(), "Hello", 0.9);
    let mut config = ExtractorConfig::default();
    config.aggregator.reappearance = ReappearancePolicy::Reopen;
    let report = run(120, &engine, config);

    assert_eq!(report.cues.len(), 2);
    assert_eq!(report.cues[0].end, Some(0.8));
    assert_eq!(report.cues[1].text, "Hello");
    assert_eq!(report.cues[1].start, 3.0);
    assert_eq!(report.cues[1].end, Some(3.8));
}

#[test]
fn detection_failure_counts_as_absence_and_the_run_continues() {
    let engine = FixtureEngine::new()
        .script_text(&sampled(54), subtitle_region(), "Hello", 0.9)
        .script(30, FixtureFrame::failing());
    let report = run(60, &engine, ExtractorConfig::default());

    assert!(report.failure.is_none());
    assert_eq!(report.cues.len(), 1);
    assert_eq!(report.cues[0].text, "Hello");
    assert_eq!(report.cues[0].end, Some(1.8));
}

#[test]
fn low_confidence_lines_never_open_a_cue() {
    let engine = FixtureEngine::new().script_text(&sampled(54), subtitle_region(), "Hello", 0.3);
    let report = run(60, &engine, ExtractorConfig::default());
    assert!(report.cues.is_empty());
}

#[test]
fn two_lines_join_into_one_cue_in_reading_order() {
    let top = TextRegion::from_rect(100.0, 195.0, 120.0, 18.0);
    let bottom = TextRegion::from_rect(100.0, 218.0, 120.0, 18.0);
    let engine = FixtureEngine::new().script(
        0,
        FixtureFrame {
            regions: vec![top, bottom],
            texts: vec![
                RecognizedText::new("first line", 0.9),
                RecognizedText::new("second line", 0.9),
            ],
            fail: false,
        },
    );
    let report = run(6, &engine, ExtractorConfig::default());

    assert_eq!(report.cues.len(), 1);
    assert_eq!(report.cues[0].text, "first line\nsecond line");
}

/// Delegates to a synthetic source, then fails once the inner source has
/// produced `fail_after` frames.
struct FailingSource {
    inner: SyntheticSource,
    produced: u64,
    fail_after: u64,
}

impl FrameSource for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn metadata(&self) -> VideoMetadata {
        self.inner.metadata()
    }

    fn next_frame(&mut self) -> FrameResult<Option<GrayFrame>> {
        if self.produced >= self.fail_after {
            return Err(FrameError::source_failure("failing", "scripted decode error"));
        }
        self.produced += 1;
        self.inner.next_frame()
    }
}

#[test]
fn mid_stream_failure_keeps_the_cues_collected_so_far() {
    let engine = FixtureEngine::new().script_text(&sampled(24), subtitle_region(), "Hello", 0.9);
    let mut source = FailingSource {
        inner: SyntheticSource::new(WIDTH, HEIGHT, FPS, 300),
        produced: 0,
        fail_after: 36,
    };
    let mut extractor = SubtitleExtractor::new(ExtractorConfig::default());
    let report = extractor.run(&mut source, &engine).unwrap();

    assert!(matches!(
        report.failure,
        Some(FrameError::SourceFailure { .. })
    ));
    assert_eq!(report.frames_read, 36);
    assert_eq!(report.cues.len(), 1);
    assert_eq!(report.cues[0].text, "Hello");
    assert_eq!(report.cues[0].end, Some(0.8));
}
