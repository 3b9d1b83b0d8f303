//! Geometry primitives used by costume composition and actor placement

pub mod drawable;

pub use drawable::{Extent, Point, Rect, RegPoint};
