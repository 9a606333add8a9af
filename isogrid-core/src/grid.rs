/// Square authoring grid and pixel-to-grid hit testing
use crate::error::Result;
use crate::geometry::{GridCell, LineSeg, Point};
use crate::transform::{AffineTransform, Epsilon};

/// A square grid of `size × size` unit cells with its lower-left corner at the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: u32,
}

impl Grid {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// The `size + 1` horizontal lines, bottom to top
    pub fn hlinesegs(&self) -> Vec<LineSeg> {
        let n = self.size as f64;
        (0..=self.size)
            .map(|i| LineSeg::new(Point::new(0.0, i as f64), Point::new(n, i as f64)))
            .collect()
    }

    /// The `size + 1` vertical lines, left to right
    pub fn vlinesegs(&self) -> Vec<LineSeg> {
        let n = self.size as f64;
        (0..=self.size)
            .map(|i| LineSeg::new(Point::new(i as f64, 0.0), Point::new(i as f64, n)))
            .collect()
    }

    /// Every grid line mapped into pixel space
    pub fn pixel_lines(&self, transform: &AffineTransform) -> Vec<LineSeg> {
        self.hlinesegs()
            .into_iter()
            .chain(self.vlinesegs())
            .map(|seg| {
                LineSeg::new(
                    transform.apply_to_point(&seg.start),
                    transform.apply_to_point(&seg.end),
                )
            })
            .collect()
    }

    /// Unit cells in row-major order, with their integer grid indices
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, GridCell)> + '_ {
        (0..self.size).flat_map(move |y| {
            (0..self.size).map(move |x| (x, y, GridCell::unit(x, y)))
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Maps pixel-space points (e.g. the mouse) back onto the grid plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTester {
    inverse: AffineTransform,
    precision: Option<u32>,
}

impl HitTester {
    /// Fails with `DegenerateTransform` when `transform` cannot be inverted.
    pub fn new(transform: &AffineTransform, epsilon: Epsilon) -> Result<Self> {
        Ok(Self {
            inverse: transform.invert_with(epsilon)?,
            precision: None,
        })
    }

    /// Round results to this many decimal places; `0` snaps to whole grid units.
    pub fn with_precision(mut self, places: u32) -> Self {
        self.precision = Some(places);
        self
    }

    pub fn locate(&self, pixel: &Point) -> Point {
        let grid = self.inverse.apply_to_point(pixel);
        match self.precision {
            None => grid,
            Some(places) => {
                let factor = 10f64.powi(places as i32);
                Point::new(
                    (grid.x * factor).round() / factor,
                    (grid.y * factor).round() / factor,
                )
            }
        }
    }

    /// Index of the unit cell under `pixel`, if it lies on `grid`
    pub fn cell_at(&self, grid: &Grid, pixel: &Point) -> Option<(u32, u32)> {
        let p = self.inverse.apply_to_point(pixel);
        let (x, y) = (p.x.floor(), p.y.floor());
        let n = grid.size() as f64;
        if x >= 0.0 && y >= 0.0 && x < n && y < n {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> AffineTransform {
        AffineTransform::new(20.0, 5.0, 0.0, -10.0, 200.0, 300.0)
    }

    #[test]
    fn test_line_counts_and_extent() {
        let grid = Grid::new(10);
        let h = grid.hlinesegs();
        let v = grid.vlinesegs();
        assert_eq!(h.len(), 11);
        assert_eq!(v.len(), 11);
        assert_eq!(h[3], LineSeg::new(Point::new(0.0, 3.0), Point::new(10.0, 3.0)));
        assert_eq!(v[10], LineSeg::new(Point::new(10.0, 0.0), Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_pixel_lines_follow_transform() {
        let grid = Grid::new(2);
        let lines = grid.pixel_lines(&skewed());
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].start, Point::new(200.0, 300.0));
        assert_eq!(lines[0].end, Point::new(240.0, 300.0));
        // A line's direction is a free vector: only the linear part applies.
        let direction = skewed().apply_to_vector(&grid.vlinesegs()[0].vector());
        assert_eq!(lines[3].vector(), direction);
    }

    #[test]
    fn test_cells_row_major() {
        let cells: Vec<_> = Grid::new(3).cells().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!((cells[0].0, cells[0].1), (0, 0));
        assert_eq!((cells[4].0, cells[4].1), (1, 1));
        assert_eq!(cells[5].2, GridCell::unit(2, 1));
    }

    #[test]
    fn test_locate_on_skewed_grid() {
        let t = skewed();
        let tester = HitTester::new(&t, Epsilon::Auto).unwrap();
        let grid_point = Point::new(3.0, 4.0);
        let located = tester.locate(&t.apply_to_point(&grid_point));
        assert!((located - grid_point).norm() < 1e-9);
    }

    #[test]
    fn test_locate_with_precision() {
        let t = AffineTransform::scale(3.0, 3.0);
        let pixel = Point::new(10.0, -5.0);
        let whole = HitTester::new(&t, Epsilon::Auto).unwrap().with_precision(0);
        assert_eq!(whole.locate(&pixel), Point::new(3.0, -2.0));
        let tenths = HitTester::new(&t, Epsilon::Auto).unwrap().with_precision(1);
        assert_eq!(tenths.locate(&pixel), Point::new(3.3, -1.7));
    }

    #[test]
    fn test_cell_at() {
        let t = skewed();
        let grid = Grid::new(10);
        let tester = HitTester::new(&t, Epsilon::Auto).unwrap();
        let centre = t.apply_to_point(&Point::new(4.5, 7.5));
        assert_eq!(tester.cell_at(&grid, &centre), Some((4, 7)));
        let outside = t.apply_to_point(&Point::new(-0.5, 2.0));
        assert_eq!(tester.cell_at(&grid, &outside), None);
    }

    #[test]
    fn test_degenerate_hit_tester() {
        let singular = AffineTransform::new(2.0, 1.0, 4.0, 2.0, 0.0, 0.0);
        assert!(HitTester::new(&singular, Epsilon::Auto).is_err());
    }
}
