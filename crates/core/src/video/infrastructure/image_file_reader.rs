use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::frame_reader::FrameReader;

/// Decodes image files with the `image` crate and converts them to BGR.
///
/// Alpha is dropped and grayscale is expanded to three channels.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl FrameReader for ImageFileReader {
    fn read(
        &self,
        path: &Path,
        index: usize,
    ) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>> {
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        log::debug!("read {} ({width}x{height})", path.display());
        Ok(Frame::from_rgb(rgb.into_raw(), width, height, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_png_as_bgr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        image::RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let frame = ImageFileReader::new().read(&path, 7).unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (4, 3, 3));
        assert_eq!(frame.index(), 7);
        assert_eq!(&frame.data()[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_grayscale_expands_to_three_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(2, 2, image::Luma([77])).save(&path).unwrap();

        let frame = ImageFileReader::new().read(&path, 0).unwrap();
        assert_eq!(frame.channels(), 3);
        assert!(frame.data().iter().all(|&v| v == 77));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ImageFileReader::new()
            .read(Path::new("/nonexistent/in.png"), 0)
            .is_err());
    }
}
