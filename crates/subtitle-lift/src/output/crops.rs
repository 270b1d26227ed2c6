use std::fs;
use std::path::PathBuf;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use subtitle_lift_types::GrayFrame;

use crate::output::error::OutputError;

/// Writes rectified crops to a directory as numbered PNG files, for
/// inspecting what the recognizer actually sees.
pub struct CropDumper {
    directory: PathBuf,
    written: usize,
}

impl CropDumper {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            written: 0,
        }
    }

    pub fn push(&mut self, crop: &GrayFrame) -> Result<(), OutputError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("crop_{:06}.png", self.written));

        // Crops are packed, but copy row-by-row in case a strided frame
        // ever lands here.
        let width = crop.width() as usize;
        let mut pixels = Vec::with_capacity(width * crop.height() as usize);
        for row in 0..crop.height() as usize {
            let start = row * crop.stride();
            pixels.extend_from_slice(&crop.data()[start..start + width]);
        }

        let mut encoded = Vec::new();
        let encoder = PngEncoder::new(&mut encoded);
        encoder.write_image(&pixels, crop.width(), crop.height(), ColorType::L8)?;
        fs::write(path, encoded)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_numbered_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = CropDumper::new(dir.path().to_path_buf());
        let crop = GrayFrame::from_packed(4, 2, vec![128u8; 8]).unwrap();
        dumper.push(&crop).unwrap();
        dumper.push(&crop).unwrap();
        assert_eq!(dumper.written(), 2);
        assert!(dir.path().join("crop_000000.png").exists());
        assert!(dir.path().join("crop_000001.png").exists());
    }
}
