/// Geometry primitives shared by grid space and pixel space
use nalgebra::{Point2, Vector2};

use crate::error::{GeometryError, Result};

/// An anchored position. Transforms apply their translation to points.
pub type Point = Point2<f64>;

/// A free direction. Transforms never translate vectors.
pub type Vector = Vector2<f64>;

/// Areas at or below this magnitude are treated as zero.
const AREA_EPSILON: f64 = 1e-12;

/// A straight segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSeg {
    pub start: Point,
    pub end: Point,
}

impl LineSeg {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Direction and length of the segment, as a free vector
    pub fn vector(&self) -> Vector {
        self.end - self.start
    }
}

/// A planar quadrilateral in grid space.
///
/// Corners are listed clockwise starting at the lower-left corner:
/// lower-left, upper-left, upper-right, lower-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    corners: [Point; 4],
}

impl GridCell {
    /// Build a cell from its four corners, rejecting zero-area shapes.
    pub fn new(corners: [Point; 4]) -> Result<Self> {
        if corners.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(GeometryError::MalformedGridCell(
                "corner coordinates must be finite".to_string(),
            ));
        }

        let cell = Self { corners };
        if cell.signed_area().abs() <= AREA_EPSILON {
            return Err(GeometryError::MalformedGridCell(
                "corners enclose zero area".to_string(),
            ));
        }
        Ok(cell)
    }

    /// Build a cell from an arbitrary list of points, which must hold exactly 4.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let corners: [Point; 4] = points.try_into().map_err(|_| {
            GeometryError::MalformedGridCell(format!(
                "expected 4 corners, got {}",
                points.len()
            ))
        })?;
        Self::new(corners)
    }

    /// The unit square whose lower-left corner sits at grid index `(x, y)`.
    ///
    /// Every `u32` is exact in `f64`, so the cell always has area 1.
    pub fn unit(x: u32, y: u32) -> Self {
        let (x, y) = (f64::from(x), f64::from(y));
        Self {
            corners: [
                Point::new(x, y),
                Point::new(x, y + 1.0),
                Point::new(x + 1.0, y + 1.0),
                Point::new(x + 1.0, y),
            ],
        }
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    /// Shoelace area. Negative for the clockwise corner order in a y-up frame.
    pub fn signed_area(&self) -> f64 {
        // Relative to the first corner, so distant cells keep their precision.
        let c = &self.corners;
        let mut twice_area = 0.0;
        for i in 1..3 {
            let (p, q) = (c[i] - c[0], c[i + 1] - c[0]);
            twice_area += p.x * q.y - q.x * p.y;
        }
        twice_area / 2.0
    }
}

/// Fixed per-face shade. No lighting is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shade {
    Top,
    Left,
    Right,
}

impl Shade {
    /// Relative brightness in `[0, 1]`; distinct for each face.
    pub const fn brightness(self) -> f32 {
        match self {
            Shade::Top => 1.0,
            Shade::Left => 0.6,
            Shade::Right => 0.35,
        }
    }
}

/// A filled quadrilateral in pixel space, ready for a renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub points: [Point; 4],
    pub shade: Shade,
}

impl Face {
    pub fn new(points: [Point; 4], shade: Shade) -> Self {
        Self { points, shade }
    }

    /// Split into two triangles sharing the `0–2` diagonal
    pub fn triangles(&self) -> [[Point; 3]; 2] {
        let p = &self.points;
        [[p[0], p[1], p[2]], [p[0], p[2], p[3]]]
    }
}
