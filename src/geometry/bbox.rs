//! Bounding-box geometry: orientation-aware normalisation and IoU.

/// Widens a stored pixel dimension to `f32` for bbox arithmetic.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pixels(dim: i32) -> f32 {
    dim as f32
}

/// Axis-aligned box in `[x1, y1, x2, y2]` pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    #[must_use]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Builds a pixel-space box from the Host's relative `[x, y, w, h]`
    /// marker coordinates (fractions of the *displayed* image), before any
    /// orientation correction has been applied.
    #[must_use]
    pub fn from_relative(x: f32, y: f32, w: f32, h: f32, display_width: f32, display_height: f32) -> Self {
        let px1 = x * display_width;
        let py1 = y * display_height;
        Self {
            x1: px1,
            y1: py1,
            x2: px1 + w * display_width,
            y2: py1 + h * display_height,
        }
    }

    /// Converts back to relative `[x, y, w, h]` against a display size.
    #[must_use]
    pub fn to_relative(&self, display_width: f32, display_height: f32) -> (f32, f32, f32, f32) {
        (
            self.x1 / display_width,
            self.y1 / display_height,
            self.width() / display_width,
            self.height() / display_height,
        )
    }
}

/// `intersection_area / union_area`, 0 when the rectangles don't overlap
/// or either has zero area.
#[must_use]
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter_w = (ix2 - ix1).max(0.0);
    let inter_h = (iy2 - iy1).max(0.0);
    let intersection = inter_w * inter_h;

    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}

/// EXIF orientation tag (1-8). The Host displays images already rotated
/// per this tag; local face bboxes are always in *original pixel*
/// coordinates. `to_display` maps an original-pixel box into the
/// coordinate frame the Host's relative marker coordinates live in, so
/// both can be compared directly.
#[must_use]
pub fn original_to_display(b: &BBox, orientation: i32, width: f32, height: f32) -> BBox {
    match orientation {
        // 1: normal — no axis swap, no flip.
        1 => *b,
        // 2: mirrored horizontal — flip x only.
        2 => BBox::new(width - b.x2, b.y1, width - b.x1, b.y2),
        // 3: rotated 180 — flip both axes.
        3 => BBox::new(width - b.x2, height - b.y2, width - b.x1, height - b.y1),
        // 4: mirrored vertical — flip y only.
        4 => BBox::new(b.x1, height - b.y2, b.x2, height - b.y1),
        // 5: mirrored + rotated 270 CW, 6: rotated 90 CW — axes swap.
        5 | 6 => BBox::new(b.y1, b.x1, b.y2, b.x2),
        // 7: mirrored + rotated 90 CW, 8: rotated 270 CW — axes swap, mirrored.
        7 | 8 => BBox::new(height - b.y2, width - b.x2, height - b.y1, width - b.x1),
        _ => *b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_regression_s3() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        let result = iou(&a, &b);
        assert!((result - 25.0 / 175.0).abs() < 1e-5);
    }

    #[test]
    fn iou_symmetry_and_range() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        assert!((iou(&a, &b) - iou(&b, &a)).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&iou(&a, &b)));
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_zero_area_is_zero_not_nan() {
        let zero = BBox::new(5.0, 5.0, 5.0, 5.0);
        let other = BBox::new(0.0, 0.0, 10.0, 10.0);
        let result = iou(&zero, &other);
        assert_eq!(result, 0.0);
        assert!(!result.is_nan());
    }

    #[test]
    fn iou_disjoint_boxes_is_zero() {
        let a = BBox::new(0.0, 0.0, 5.0, 5.0);
        let b = BBox::new(100.0, 100.0, 110.0, 110.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn orientation_one_is_identity() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(original_to_display(&b, 1, 100.0, 200.0), b);
    }

    #[test]
    fn orientation_six_swaps_axes() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let rotated = original_to_display(&b, 6, 100.0, 200.0);
        assert_eq!(rotated, BBox::new(2.0, 1.0, 4.0, 3.0));
    }

    #[test]
    fn orientation_two_flips_x_only() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let flipped = original_to_display(&b, 2, 100.0, 200.0);
        assert_eq!(flipped, BBox::new(97.0, 2.0, 99.0, 4.0));
    }

    #[test]
    fn orientation_four_flips_y_only() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let flipped = original_to_display(&b, 4, 100.0, 200.0);
        assert_eq!(flipped, BBox::new(1.0, 196.0, 3.0, 198.0));
    }
}
