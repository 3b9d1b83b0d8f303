// Layer compositing: stacks the visible layers' current frames into one
// image anchored at a shared registration point.

use image::{imageops, Rgba, RgbaImage};

use super::sheet::SheetFrame;
use crate::graphics::{Point, Rect, RegPoint};

/// A composed costume image and its registration point
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbaImage,
    pub reg: RegPoint,
}

impl Composition {
    /// 1×1 transparent stand-in used when nothing is visible
    pub fn placeholder() -> Self {
        Self {
            image: RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])),
            reg: Point::ORIGIN,
        }
    }
}

/// One layer's contribution to a composition
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub frame: &'a SheetFrame,
    /// Extra shift applied at blit time (base-layer relative offset)
    pub shift: Point,
}

/// Bounding box of the frames around their registration points.
/// Shifts are not part of the box; shifted layers clip at its edges.
pub fn bounds(placements: &[Placement<'_>]) -> Option<Rect> {
    placements
        .iter()
        .map(|p| Rect::anchored(Point::ORIGIN, p.frame.reg, p.frame.extent()))
        .reduce(|acc, rect| acc.union(&rect))
}

/// Blit placements in order, later ones on top
pub fn compose(placements: &[Placement<'_>]) -> Composition {
    let Some(bbox) = bounds(placements) else {
        return Composition::placeholder();
    };
    if bbox.extent.is_empty() {
        return Composition::placeholder();
    }

    let mut out = RgbaImage::new(bbox.extent.width, bbox.extent.height);
    for placement in placements {
        let at = -placement.frame.reg - bbox.corner + placement.shift;
        imageops::overlay(&mut out, &*placement.frame.image, at.x as i64, at.y as i64);
    }

    Composition {
        image: out,
        reg: -bbox.corner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::Extent;

    fn solid(width: u32, height: u32, reg: Point, color: [u8; 4]) -> SheetFrame {
        SheetFrame::new(RgbaImage::from_pixel(width, height, Rgba(color)), reg)
    }

    #[test]
    fn test_nothing_visible_yields_placeholder() {
        let comp = compose(&[]);
        assert_eq!(comp.image.dimensions(), (1, 1));
        assert_eq!(comp.reg, Point::ORIGIN);
        assert_eq!(comp.image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_bbox_spans_all_frames() {
        let body = solid(10, 20, Point::new(5, 20), [255, 0, 0, 255]);
        let hat = solid(4, 4, Point::new(2, 26), [0, 0, 255, 255]);
        let placements = [
            Placement { frame: &body, shift: Point::ORIGIN },
            Placement { frame: &hat, shift: Point::ORIGIN },
        ];
        let bbox = bounds(&placements).unwrap();
        assert_eq!(bbox, Rect::from_xywh(-5, -26, 10, 26));

        let comp = compose(&placements);
        assert_eq!(comp.image.dimensions(), (10, 26));
        assert_eq!(comp.reg, Point::new(5, 26));
        // hat sits at x 3..7, y 0..4; body starts at y 6
        assert_eq!(comp.image.get_pixel(3, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(comp.image.get_pixel(0, 0)[3], 0);
        assert_eq!(comp.image.get_pixel(0, 6), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_shift_moves_layer_without_growing_box() {
        let body = solid(8, 8, Point::new(4, 8), [255, 0, 0, 255]);
        let eyes = solid(2, 2, Point::new(1, 6), [0, 255, 0, 255]);
        let placements = [
            Placement { frame: &body, shift: Point::ORIGIN },
            Placement { frame: &eyes, shift: Point::new(2, 1) },
        ];
        let comp = compose(&placements);
        assert_eq!(comp.image.dimensions(), (8, 8));
        // unshifted eyes would land at (3, 2); shifted at (5, 3)
        assert_eq!(comp.image.get_pixel(5, 3), &Rgba([0, 255, 0, 255]));
        assert_eq!(comp.image.get_pixel(3, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(
            bounds(&placements).map(|r| r.extent),
            Some(Extent::new(8, 8))
        );
    }
}
