use glam::DVec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Lower-left corner.
    pub min: DVec2,
    /// Upper-right corner.
    pub max: DVec2,
}

impl Rect {
    /// Rectangle spanning the two corners, in any order.
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Rectangle of `size` whose bottom edge is centred on `anchor`.
    ///
    /// Blocks and beakers rest on their bottom centre.
    pub fn resting_on(anchor: DVec2, size: DVec2) -> Self {
        let half = size.x / 2.0;
        Self::from_corners(
            DVec2::new(anchor.x - half, anchor.y),
            DVec2::new(anchor.x + half, anchor.y + size.y),
        )
    }

    /// Translate by `delta`.
    pub fn translated(&self, delta: DVec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Whether the point lies inside or on the boundary.
    pub fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether the two rectangles share any area or edge.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Centre point.
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_on_places_bottom_at_anchor() {
        let r = Rect::resting_on(DVec2::new(1.0, 0.0), DVec2::new(0.2, 0.1));
        assert!((r.min.x - 0.9).abs() < 1e-12);
        assert!((r.max.x - 1.1).abs() < 1e-12);
        assert_eq!(r.min.y, 0.0);
        assert!((r.max.y - 0.1).abs() < 1e-12);
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Rect::from_corners(DVec2::ZERO, DVec2::ONE);
        let b = Rect::from_corners(DVec2::new(1.0, 0.0), DVec2::new(2.0, 1.0));
        let c = Rect::from_corners(DVec2::new(1.5, 0.0), DVec2::new(2.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn contains_and_translate() {
        let r = Rect::from_corners(DVec2::ONE, DVec2::ZERO);
        assert!(r.contains(DVec2::splat(0.5)));
        assert!(!r.contains(DVec2::new(1.5, 0.5)));
        let moved = r.translated(DVec2::X);
        assert!(moved.contains(DVec2::new(1.5, 0.5)));
        assert_eq!(moved.center(), DVec2::new(1.5, 0.5));
    }
}
