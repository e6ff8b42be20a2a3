//! Universe-space geometry.
//!
//! Universe coordinates are unsigned 32-bit with the center of the
//! universe at `UNIVERSAL_CENTER`; differences are taken in wrapping
//! signed arithmetic. Screen-space and bounds math uses signed points
//! and rects.

use serde::{Deserialize, Serialize};

/// The center of the universe. Chosen so that coordinates near the
/// center survive reinterpretation as signed 32-bit values, which the
/// bounds math depends on.
pub const UNIVERSAL_CENTER: u32 = 0x3fff_ffff;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// An absolute universe position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub h: u32,
    pub v: u32,
}

impl Coord {
    #[inline]
    pub fn new(h: u32, v: u32) -> Coord {
        Coord { h, v }
    }

    /// Signed horizontal offset to `other`, wrapping.
    #[inline]
    pub fn dh(self, other: Coord) -> i32 {
        other.h.wrapping_sub(self.h) as i32
    }

    /// Signed vertical offset to `other`, wrapping.
    #[inline]
    pub fn dv(self, other: Coord) -> i32 {
        other.v.wrapping_sub(self.v) as i32
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A signed point (grid cells, offsets, screen positions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub h: i32,
    pub v: i32,
}

impl Point {
    #[inline]
    pub fn new(h: i32, v: i32) -> Point {
        Point { h, v }
    }

    #[inline]
    pub fn offset(&mut self, dh: i32, dv: i32) {
        self.h += dh;
        self.v += dv;
    }
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// A half-open axis-aligned rectangle: left/top inclusive, right/bottom
/// exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[inline]
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Half-open intersection test.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    #[inline]
    pub fn offset(&mut self, dh: i32, dv: i32) {
        self.left += dh;
        self.right += dh;
        self.top += dv;
        self.bottom += dv;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_offsets_wrap() {
        let a = Coord::new(UNIVERSAL_CENTER, UNIVERSAL_CENTER);
        let b = Coord::new(UNIVERSAL_CENTER + 100, UNIVERSAL_CENTER - 50);
        assert_eq!(a.dh(b), 100);
        assert_eq!(a.dv(b), -50);
        assert_eq!(b.dh(a), -100);
    }

    #[test]
    fn rect_intersection_is_half_open() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 20, 10);
        assert!(!a.intersects(&b), "touching edges do not intersect");
        let c = Rect::new(9, 9, 20, 20);
        assert!(a.intersects(&c));
    }
}
