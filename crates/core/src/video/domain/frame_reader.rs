use std::path::Path;

use crate::shared::frame::Frame;

/// Loads one still image as a BGR frame.
pub trait FrameReader: Send {
    /// Reads `path`; `index` is stamped on the returned frame.
    fn read(
        &self,
        path: &Path,
        index: usize,
    ) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>>;
}
