use ndarray::ArrayView3;

/// A single image frame: contiguous BGR bytes in row-major order.
///
/// Channel order follows the detector's training convention (OpenCV BGR).
/// Conversion from RGB sources happens at I/O boundaries only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Builds a BGR frame from interleaved RGB bytes.
    pub fn from_rgb(mut rgb: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        swap_red_blue(&mut rgb);
        Self::new(rgb, width, height, 3, index)
    }

    /// Interleaved RGB copy of the pixel data.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = self.data.clone();
        swap_red_blue(&mut rgb);
        rgb
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn swap_red_blue(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "Frame data length must match dimensions")]
    fn test_mismatched_data_length_panics_on_view() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0).as_ndarray();
    }

    #[test]
    fn test_from_rgb_stores_bgr() {
        let frame = Frame::from_rgb(vec![10, 20, 30, 40, 50, 60], 2, 1, 0);
        assert_eq!(frame.data(), &[30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_to_rgb_restores_source_order() {
        let rgb = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let frame = Frame::from_rgb(rgb.clone(), 2, 2, 3);
        assert_eq!(frame.to_rgb(), rgb);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 BGR: set pixel (row=1, col=0) to pure blue
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr[[1, 0, 0]], 255); // B
        assert_eq!(arr[[1, 0, 1]], 0); // G
        assert_eq!(arr[[1, 0, 2]], 0); // R
    }
}
