//! Burned-in subtitle extraction: geometric filtering of detected text
//! regions, perspective rectification, and temporal consolidation into SRT
//! cues.

pub mod aggregator;
pub mod cli;
pub mod extractor;
pub mod geometry;
pub mod output;
pub mod progress;
pub mod settings;
pub mod similarity;
pub mod source;
pub mod srt;

pub use aggregator::{AggregatorConfig, CandidateStrategy, CueAggregator, ReappearancePolicy};
pub use extractor::{ExtractError, ExtractionReport, ExtractorConfig, SubtitleExtractor};
pub use geometry::{GeometryConfig, RectifyMode};
pub use source::{FrameSource, ImageSequenceSource, SyntheticSource};
