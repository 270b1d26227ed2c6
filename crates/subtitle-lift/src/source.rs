//! Frame sources the extractor pulls luma frames from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use subtitle_lift_types::{FrameError, FrameResult, GrayFrame, VideoMetadata};

/// Pull-based provider of decoded luma frames.
///
/// `next_frame` returns `Ok(None)` at end of stream. Implementations report
/// whatever metadata they know up front; the extractor validates that frame
/// rate and total frame count are available before it starts pulling.
pub trait FrameSource {
    fn name(&self) -> &'static str;

    fn metadata(&self) -> VideoMetadata;

    fn next_frame(&mut self) -> FrameResult<Option<GrayFrame>>;
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Reads a directory of numbered image files as a frame stream, in
/// lexicographic filename order. The caller supplies the nominal frame rate
/// since image files carry no timing.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(directory: &Path, fps: f64) -> FrameResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FrameError::configuration(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                });
            if is_image {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(FrameError::source_failure(
                "image-sequence",
                format!("no image files found in {}", directory.display()),
            ));
        }
        paths.sort();
        Ok(Self {
            paths,
            fps,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &'static str {
        "image-sequence"
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::with_fps_and_total(self.fps, self.paths.len() as u64)
    }

    fn next_frame(&mut self) -> FrameResult<Option<GrayFrame>> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let index = self.cursor as u64;
        self.cursor += 1;

        let decoded = image::open(path).map_err(|err| {
            FrameError::source_failure(
                "image-sequence",
                format!("failed to decode {}: {err}", path.display()),
            )
        })?;
        let luma = decoded.to_luma8();
        let (width, height) = luma.dimensions();
        let timestamp = Duration::from_secs_f64(index as f64 / self.fps);
        let frame = GrayFrame::from_owned(
            width,
            height,
            width as usize,
            Some(timestamp),
            luma.into_raw(),
        )?
        .with_frame_index(Some(index));
        Ok(Some(frame))
    }
}

/// Deterministic in-memory source producing uniform gray frames, used by the
/// integration tests and available as a smoke-test input.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    fps: f64,
    total_frames: u64,
    next_index: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: f64, total_frames: u64) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames,
            next_index: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::with_fps_and_total(self.fps, self.total_frames)
    }

    fn next_frame(&mut self) -> FrameResult<Option<GrayFrame>> {
        if self.next_index >= self.total_frames {
            return Ok(None);
        }
        let index = self.next_index;
        self.next_index += 1;

        // Shade varies per frame so crops from different frames differ.
        let shade = (index % 251) as u8;
        let data = vec![shade; self.width as usize * self.height as usize];
        let timestamp = Duration::from_secs_f64(index as f64 / self.fps);
        let frame = GrayFrame::from_owned(
            self.width,
            self.height,
            self.width as usize,
            Some(timestamp),
            data,
        )?
        .with_frame_index(Some(index));
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_counts_down_to_end() {
        let mut source = SyntheticSource::new(8, 8, 30.0, 3);
        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            indices.push(frame.frame_index().unwrap());
        }
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn synthetic_timestamps_follow_frame_rate() {
        let mut source = SyntheticSource::new(4, 4, 10.0, 2);
        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.timestamp(), Some(Duration::from_secs_f64(0.0)));
        assert_eq!(second.timestamp(), Some(Duration::from_secs_f64(0.1)));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequenceSource::open(dir.path(), 30.0).unwrap_err();
        assert!(matches!(err, FrameError::SourceFailure { .. }));
    }

    #[test]
    fn image_sequence_sorts_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_002.png", "frame_000.png", "frame_001.png"] {
            let buffer = image::GrayImage::from_pixel(4, 4, image::Luma([42u8]));
            buffer.save(dir.path().join(name)).unwrap();
        }
        let mut source = ImageSequenceSource::open(dir.path(), 2.0).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(
            source.metadata().calculate_total_frames(),
            Some(3),
            "metadata should report the file count"
        );
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.frame_index(), Some(0));
        assert_eq!(first.pixel_clamped(0, 0), 42);
        assert_eq!(first.timestamp(), Some(Duration::from_secs_f64(0.0)));
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.timestamp(), Some(Duration::from_secs_f64(0.5)));
    }

    #[test]
    fn non_image_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
        let buffer = image::GrayImage::from_pixel(4, 4, image::Luma([1u8]));
        buffer.save(dir.path().join("frame.png")).unwrap();
        let source = ImageSequenceSource::open(dir.path(), 30.0).unwrap();
        assert_eq!(source.len(), 1);
    }
}
