//! Shared domain models for the subtitle-lift workspace.
//!
//! This crate centralizes lightweight data structures used across the
//! geometry, recognition, and extraction crates. Keep it backend-agnostic
//! and free of heavy dependencies so every crate can depend on it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

/// Single-channel (luma) pixel buffer for one video frame or crop.
///
/// Pixel data is reference-counted so a frame can be handed to the
/// recognition capability without copying; the extraction core never keeps
/// a frame alive beyond one processing step.
#[derive(Clone)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    stride: usize,
    frame_index: Option<u64>,
    timestamp: Option<Duration>,
    data: Arc<[u8]>,
}

impl fmt::Debug for GrayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrayFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

impl GrayFrame {
    pub fn from_owned(
        width: u32,
        height: u32,
        stride: usize,
        timestamp: Option<Duration>,
        data: Vec<u8>,
    ) -> FrameResult<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidFrame {
                reason: "frame dimensions must be non-zero".into(),
            });
        }
        if stride < width as usize {
            return Err(FrameError::InvalidFrame {
                reason: format!("stride {} is smaller than width {}", stride, width),
            });
        }
        let required =
            stride
                .checked_mul(height as usize)
                .ok_or_else(|| FrameError::InvalidFrame {
                    reason: "calculated pixel buffer length overflowed".into(),
                })?;
        if data.len() < required {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "insufficient pixel bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            timestamp,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        })
    }

    /// Convenience constructor for tightly packed buffers (stride == width).
    pub fn from_packed(width: u32, height: u32, data: Vec<u8>) -> FrameResult<Self> {
        Self::from_owned(width, height, width as usize, None, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }

    pub fn set_frame_index(&mut self, index: Option<u64>) {
        self.frame_index = index;
    }

    /// Pixel value at (x, y); coordinates are clamped to the frame edges so
    /// samplers can replicate the border.
    pub fn pixel_clamped(&self, x: i64, y: i64) -> u8 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.stride + x]
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("source {source_name} is not supported in this build")]
    Unsupported { source_name: &'static str },

    #[error("{source_name} frame source failed: {message}")]
    SourceFailure {
        source_name: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub fn unsupported(source_name: &'static str) -> Self {
        Self::Unsupported { source_name }
    }

    pub fn source_failure(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::SourceFailure {
            source_name,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Video-level properties reported by a frame source before decoding starts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fps_and_total(fps: f64, total_frames: u64) -> Self {
        Self {
            fps: Some(fps),
            total_frames: Some(total_frames),
            ..Default::default()
        }
    }

    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }
        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let total = (duration.as_secs_f64() * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }
        None
    }
}

/// Point in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Four-corner polygon marking where text was found in a frame.
///
/// Corner order follows the detector convention: top-left, top-right,
/// bottom-right, bottom-left. Helpers derive size and centroid from the raw
/// corners so callers never need the order to be axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextRegion {
    pub corners: [Point; 4],
}

impl TextRegion {
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            corners: [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }

    /// Top-left corner as reported by the detector.
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn width(&self) -> f32 {
        let xs = self.corners.iter().map(|p| p.x);
        let min = xs.clone().fold(f32::INFINITY, f32::min);
        let max = xs.fold(f32::NEG_INFINITY, f32::max);
        max - min
    }

    pub fn height(&self) -> f32 {
        let ys = self.corners.iter().map(|p| p.y);
        let min = ys.clone().fold(f32::INFINITY, f32::min);
        let max = ys.fold(f32::NEG_INFINITY, f32::max);
        max - min
    }

    pub fn centroid(&self) -> Point {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for corner in &self.corners {
            cx += corner.x;
            cy += corner.y;
        }
        Point::new(cx / 4.0, cy / 4.0)
    }
}

/// Text recognized from one rectified crop, with recognizer confidence
/// in [0, 1]. Valid only within the frame it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// One subtitle entry. `end` stays `None` while the cue is open; it is
/// assigned exactly once when the cue closes, and a closed cue always has
/// `start <= end`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleCue {
    pub start: f64,
    pub end: Option<f64>,
    pub text: String,
}

impl SubtitleCue {
    pub fn open(start: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end: None,
            text: text.into(),
        }
    }

    pub fn close(&mut self, end: f64) {
        debug_assert!(self.end.is_none(), "cue closed twice");
        self.end = Some(end.max(self.start));
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}
