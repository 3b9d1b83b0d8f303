//! Screen-space geometry shared by costumes and actors
//!
//! Key concepts:
//! - Point: integer position in room pixels
//! - RegPoint: anchor of a frame, measured from its top-left corner
//! - Rect: corner + extent, right/bottom edges exclusive

use std::ops::{Add, Neg, Sub};

/// 2D size (width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 2D point (x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Registration point of a frame.
///
/// The frame is drawn so that this pixel lands on the owner's position,
/// so a frame with reg `(10, 40)` placed at `(100, 100)` has its top-left
/// corner at `(90, 60)`.
pub type RegPoint = Point;

/// Bounding rectangle (corner + extent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub corner: Point,
    pub extent: Extent,
}

impl Rect {
    pub fn new(corner: Point, extent: Extent) -> Self {
        Self { corner, extent }
    }

    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(Point::new(x, y), Extent::new(width, height))
    }

    /// Rectangle of a frame whose registration point sits at `origin`
    pub fn anchored(origin: Point, reg: RegPoint, extent: Extent) -> Self {
        Self::new(origin - reg, extent)
    }

    pub fn left(&self) -> i32 {
        self.corner.x
    }

    pub fn top(&self) -> i32 {
        self.corner.y
    }

    /// Right edge x-coordinate (exclusive)
    pub fn right(&self) -> i32 {
        self.corner.x + self.extent.width as i32
    }

    /// Bottom edge y-coordinate (exclusive)
    pub fn bottom(&self) -> i32 {
        self.corner.y + self.extent.height as i32
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::from_xywh(left, top, (right - left) as u32, (bottom - top) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(3, -4);
        assert_eq!(p + Point::new(1, 1), Point::new(4, -3));
        assert_eq!(p - Point::new(3, 0), Point::new(0, -4));
        assert_eq!(-p, Point::new(-3, 4));
        assert_eq!(p.offset(2, 2), Point::new(5, -2));
    }

    #[test]
    fn test_anchored_rect() {
        let rect = Rect::anchored(Point::new(100, 100), Point::new(10, 40), Extent::new(20, 50));
        assert_eq!(rect.corner, Point::new(90, 60));
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 110);
    }

    #[test]
    fn test_contains_is_exclusive_on_far_edges() {
        let rect = Rect::from_xywh(0, 0, 10, 10);
        assert!(rect.contains(Point::new(0, 0)));
        assert!(rect.contains(Point::new(9, 9)));
        assert!(!rect.contains(Point::new(10, 5)));
        assert!(!rect.contains(Point::new(5, -1)));
    }

    #[test]
    fn test_union_covers_both() {
        let a = Rect::from_xywh(-5, -5, 10, 10);
        let b = Rect::from_xywh(0, 0, 20, 4);
        let u = a.union(&b);
        assert_eq!(u, Rect::from_xywh(-5, -5, 25, 10));
    }

    #[test]
    fn test_empty_extent() {
        assert!(Extent::new(0, 4).is_empty());
        assert!(!Extent::new(1, 1).is_empty());
    }
}
