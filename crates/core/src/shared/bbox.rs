use serde::Serialize;

/// Axis-aligned box in pixel coordinates, corners inclusive.
///
/// Faster R-CNN treats `x2`/`y2` as the last covered pixel, so a box
/// spanning `[0, 9]` is 10 pixels wide. Width, area and IoU all follow
/// that convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Reads a box from the first four values of `coords`.
    pub fn from_slice(coords: &[f32]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1 + 1.0
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1 + 1.0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x1 + 0.5 * self.width(),
            self.y1 + 0.5 * self.height(),
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1 + 1.0).max(0.0) * (iy2 - iy1 + 1.0).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clamps every coordinate into `[0, width - 1] x [0, height - 1]`.
    ///
    /// NaN coordinates collapse to 0 and an inverted box collapses onto
    /// its left/top edge, so the result always satisfies
    /// `0 <= x1 <= x2 <= width - 1` (and likewise for y).
    pub fn clip(&self, width: f32, height: f32) -> BoundingBox {
        let max_x = (width - 1.0).max(0.0);
        let max_y = (height - 1.0).max(0.0);
        let x1 = clamp_coord(self.x1, max_x);
        let y1 = clamp_coord(self.y1, max_y);
        BoundingBox {
            x1,
            y1,
            x2: clamp_coord(self.x2, max_x).max(x1),
            y2: clamp_coord(self.y2, max_y).max(y1),
        }
    }

    /// Maps a box from a scaled image back to the source image.
    pub fn unscale(&self, scale: f32) -> BoundingBox {
        BoundingBox {
            x1: self.x1 / scale,
            y1: self.y1 / scale,
            x2: self.x2 / scale,
            y2: self.y2 / scale,
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

// `f32::max` discards NaN, `clamp` would propagate it.
fn clamp_coord(v: f32, hi: f32) -> f32 {
    v.max(0.0).min(hi)
}
