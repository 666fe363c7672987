use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;

/// Writes each frame as `frame_{index:06}.png` inside one directory.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: usize,
}

impl ImageSequenceSink {
    /// Creates `dir` (and parents) if needed.
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn path_for(&self, frame: &Frame) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", frame.index()))
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.to_rgb())
            .ok_or("frame data does not match its dimensions")?;
        let path = self.path_for(frame);
        img.save(&path)?;
        self.written += 1;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}
