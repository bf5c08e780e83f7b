use serde::{Deserialize, Serialize};

/// Axis-aligned box in document coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// The visible window onto the document.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.scroll_x, self.scroll_y, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Growth applied to the viewport before intersecting, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    pub fn vertical(px: f64) -> Self {
        Self {
            top: px,
            right: 0.0,
            bottom: px,
            left: 0.0,
        }
    }

    pub fn expand(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x - self.left,
            rect.y - self.top,
            rect.width + self.left + self.right,
            rect.height + self.top + self.bottom,
        )
    }
}

/// Fraction of `target` inside the margin-expanded viewport, in `[0, 1]`.
///
/// A zero-area target that touches the expanded viewport counts as fully
/// visible, matching how host intersection observers report empty boxes.
pub fn intersection_ratio(target: Rect, viewport: &Viewport, margin: &RootMargin) -> f64 {
    let root = margin.expand(viewport.as_rect());
    let left = target.x.max(root.x);
    let top = target.y.max(root.y);
    let right = target.right().min(root.right());
    let bottom = target.bottom().min(root.bottom());
    let width = right - left;
    let height = bottom - top;
    if width < 0.0 || height < 0.0 {
        return 0.0;
    }
    let area = target.area();
    if area == 0.0 {
        return 1.0;
    }
    ((width * height) / area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_prefetches_elements_below_the_fold() {
        let viewport = Viewport::new(1000.0, 800.0);
        let below = Rect::new(0.0, 900.0, 1000.0, 100.0);
        assert_eq!(intersection_ratio(below, &viewport, &RootMargin::default()), 0.0);
        let ratio = intersection_ratio(below, &viewport, &RootMargin::vertical(200.0));
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn partial_overlap_reports_fraction() {
        let viewport = Viewport::new(1000.0, 800.0);
        let straddling = Rect::new(0.0, 750.0, 1000.0, 100.0);
        let ratio = intersection_ratio(straddling, &viewport, &RootMargin::default());
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_area_target_counts_when_touching() {
        let viewport = Viewport::new(1000.0, 800.0);
        let empty = Rect::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(intersection_ratio(empty, &viewport, &RootMargin::default()), 1.0);
        let far = Rect::new(10.0, 5000.0, 0.0, 0.0);
        assert_eq!(intersection_ratio(far, &viewport, &RootMargin::default()), 0.0);
    }
}
