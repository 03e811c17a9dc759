//! Shared rectangle and point helpers used by every phase.

use geo::{Area, Coord, LineString, Polygon, Rect};
use nalgebra::Point2;

use crate::{MAX_COORDINATE_VALUE, MIN_COORDINATE_VALUE};

/// Tolerance for float comparisons on grid arithmetic.
pub const EPSILON: f64 = 1e-9;

/// Validate that a coordinate pair is finite and within the accepted range.
pub fn coord_is_valid(x: f64, y: f64) -> bool {
    x.is_finite()
        && y.is_finite()
        && x >= MIN_COORDINATE_VALUE
        && x <= MAX_COORDINATE_VALUE
        && y >= MIN_COORDINATE_VALUE
        && y <= MAX_COORDINATE_VALUE
}

/// Build a rectangle from two opposite corners, in any order.
pub fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Rect<f64> {
    Rect::new(Coord { x: x1, y: y1 }, Coord { x: x2, y: y2 })
}

/// Axis-aligned bounding rectangle of a coordinate list. `None` when the list
/// is empty.
pub fn bounding_rect(coords: &[Coord<f64>]) -> Option<Rect<f64>> {
    let first = coords.first()?;
    let mut min_x = first.x;
    let mut min_y = first.y;
    let mut max_x = first.x;
    let mut max_y = first.y;

    for c in &coords[1..] {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }

    Some(rect(min_x, min_y, max_x, max_y))
}

/// Positive-area overlap test. Rectangles that merely share an edge or a
/// corner do not overlap.
pub fn overlaps(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x < b.max().x - EPSILON
        && b.min().x < a.max().x - EPSILON
        && a.min().y < b.max().y - EPSILON
        && b.min().y < a.max().y - EPSILON
}

/// Whether `inner` lies entirely within `outer` (boundaries included).
pub fn contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x - EPSILON
        && inner.min().y >= outer.min().y - EPSILON
        && inner.max().x <= outer.max().x + EPSILON
        && inner.max().y <= outer.max().y + EPSILON
}

/// Smallest rectangle covering both inputs.
pub fn union(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    rect(
        a.min().x.min(b.min().x),
        a.min().y.min(b.min().y),
        a.max().x.max(b.max().x),
        a.max().y.max(b.max().y),
    )
}

/// Grow (or shrink, with negative amounts) a rectangle symmetrically.
pub fn inflate(r: &Rect<f64>, dx: f64, dy: f64) -> Rect<f64> {
    rect(
        r.min().x - dx,
        r.min().y - dy,
        r.max().x + dx,
        r.max().y + dy,
    )
}

/// Guarantee a minimum extent on each axis, growing about the center. Keeps
/// zero-thickness wall lines testable against the overlap predicate.
pub fn ensure_thickness(r: &Rect<f64>, min_extent: f64) -> Rect<f64> {
    let dx = if r.width() < min_extent {
        (min_extent - r.width()) / 2.0
    } else {
        0.0
    };
    let dy = if r.height() < min_extent {
        (min_extent - r.height()) / 2.0
    } else {
        0.0
    };
    inflate(r, dx, dy)
}

pub fn area(r: &Rect<f64>) -> f64 {
    r.unsigned_area()
}

pub fn center(r: &Rect<f64>) -> Point2<f64> {
    let c = r.center();
    Point2::new(c.x, c.y)
}

pub fn distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - b).norm()
}

/// Distance from a point to the nearest point of a rectangle. Zero inside.
pub fn distance_to_rect(p: &Point2<f64>, r: &Rect<f64>) -> f64 {
    let cx = p.x.clamp(r.min().x, r.max().x);
    let cy = p.y.clamp(r.min().y, r.max().y);
    distance(p, &Point2::new(cx, cy))
}

/// Unsigned polygon area of a closed coordinate ring.
pub fn polygon_area(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }

    let line_string = LineString::from(coords.to_vec());
    let polygon = Polygon::new(line_string, vec![]);
    polygon.unsigned_area()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_requires_positive_area() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.0, 1.0, 3.0, 3.0);
        let touching = rect(2.0, 0.0, 4.0, 2.0);

        assert!(overlaps(&a, &b));
        assert!(!overlaps(&a, &touching));
    }

    #[test]
    fn bounding_rect_of_points() {
        let coords = vec![
            Coord { x: 1.0, y: 5.0 },
            Coord { x: -2.0, y: 0.5 },
            Coord { x: 4.0, y: 2.0 },
        ];
        let r = bounding_rect(&coords).expect("non-empty");
        assert_eq!(r.min().x, -2.0);
        assert_eq!(r.max().y, 5.0);
        assert!(bounding_rect(&[]).is_none());
    }

    #[test]
    fn polygon_area_of_square() {
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        assert!((polygon_area(&coords) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn ensure_thickness_expands_degenerate_axis() {
        let line = rect(0.0, 1.0, 10.0, 1.0);
        let wall = ensure_thickness(&line, 0.15);
        assert!((wall.height() - 0.15).abs() < 1e-9);
        assert_eq!(wall.width(), 10.0);
    }

    #[test]
    fn distance_to_rect_is_zero_inside() {
        let r = rect(0.0, 0.0, 4.0, 4.0);
        assert_eq!(distance_to_rect(&Point2::new(2.0, 2.0), &r), 0.0);
        assert!((distance_to_rect(&Point2::new(7.0, 2.0), &r) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn coordinate_validation_rejects_non_finite() {
        assert!(coord_is_valid(0.0, 5.0));
        assert!(!coord_is_valid(f64::NAN, 0.0));
        assert!(!coord_is_valid(0.0, f64::INFINITY));
        assert!(!coord_is_valid(2_000_000.0, 0.0));
    }
}
