//! Text detection and recognition capability consumed by subtitle-lift.
//!
//! The extraction core never talks to a concrete model runtime; it only sees
//! the [`TextEngine`] trait. Real backends (PaddleOCR-style detector and
//! recognizer pairs) live behind this boundary, and tests drive the pipeline
//! with the scripted [`FixtureEngine`].

mod engine;
mod error;
mod fixture;

pub use engine::{NoopEngine, TextEngine};
pub use error::OcrError;
pub use fixture::{FixtureEngine, FixtureFrame};
