/// 2-D affine transforms between grid space and pixel space
use std::ops::Mul;

use nalgebra::Matrix3;

use crate::error::{GeometryError, Result};
use crate::geometry::{Point, Vector};

/// Tolerance policy for deciding that a determinant is zero
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Epsilon {
    /// Machine epsilon scaled by the squared magnitude of the linear part
    #[default]
    Auto,
    /// An absolute bound on `|Δ|`
    Fixed(f64),
}

impl Epsilon {
    /// Largest `|Δ|` still treated as zero for `transform`
    pub fn threshold(self, transform: &AffineTransform) -> f64 {
        match self {
            Epsilon::Auto => {
                let [a, b, c, d, _, _] = transform.coefficients();
                let magnitude = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
                f64::EPSILON * magnitude * magnitude
            }
            Epsilon::Fixed(bound) => bound.abs(),
        }
    }
}

/// An immutable affine map stored as the homogeneous matrix
///
/// ```text
/// a b e
/// c d f
/// 0 0 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix3<f64>,
}

impl AffineTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            matrix: Matrix3::new(a, b, e, c, d, f, 0.0, 0.0, 1.0),
        }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Pure translation by `(dx, dy)`
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// Scale about the origin
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation about the origin by `angle` radians: `(cosθ, −sinθ, sinθ, cosθ)`
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, -sin, sin, cos, 0.0, 0.0)
    }

    /// Conjugate `linear` so that it acts about `pivot` instead of the origin:
    /// `translate(pivot) · linear · translate(−pivot)`.
    pub fn about(pivot: &Point, linear: &AffineTransform) -> Self {
        Self::translation(pivot.x, pivot.y)
            .compose(linear)
            .compose(&Self::translation(-pivot.x, -pivot.y))
    }

    /// The six coefficients in `[a, b, c, d, e, f]` order
    pub fn coefficients(&self) -> [f64; 6] {
        let m = &self.matrix;
        [m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)], m[(0, 2)], m[(1, 2)]]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// `Δ = a·d − b·c`
    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, _, _] = self.coefficients();
        a * d - b * c
    }

    pub fn is_finite(&self) -> bool {
        self.coefficients().iter().all(|v| v.is_finite())
    }

    /// Apply the linear part only. Used for direction-only quantities.
    pub fn apply_to_vector(&self, v: &Vector) -> Vector {
        let [a, b, c, d, _, _] = self.coefficients();
        Vector::new(a * v.x + b * v.y, c * v.x + d * v.y)
    }

    /// Apply the full map, translation included.
    pub fn apply_to_point(&self, p: &Point) -> Point {
        let [a, b, c, d, e, f] = self.coefficients();
        Point::new(a * p.x + b * p.y + e, c * p.x + d * p.y + f)
    }

    /// `self · other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Invert using the default tolerance
    pub fn invert(&self) -> Result<Self> {
        self.invert_with(Epsilon::Auto)
    }

    /// Invert, treating `|Δ| ≤ epsilon.threshold(self)` as singular.
    pub fn invert_with(&self, epsilon: Epsilon) -> Result<Self> {
        let det = self.ensure_invertible(epsilon)?;
        let [a, b, c, d, e, f] = self.coefficients();

        Ok(Self::new(
            d / det,
            -b / det,
            -c / det,
            a / det,
            (b * f - d * e) / det,
            (c * e - a * f) / det,
        ))
    }

    /// Check that the transform can be inverted, returning its determinant.
    pub fn ensure_invertible(&self, epsilon: Epsilon) -> Result<f64> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() <= epsilon.threshold(self) {
            log::debug!("rejecting degenerate transform {:?} (det = {})", self.coefficients(), det);
            return Err(GeometryError::DegenerateTransform { determinant: det });
        }
        Ok(det)
    }

    /// Coefficient-wise comparison within `tolerance`
    pub fn approx_eq(&self, other: &AffineTransform, tolerance: f64) -> bool {
        self.coefficients()
            .iter()
            .zip(other.coefficients().iter())
            .all(|(x, y)| (x - y).abs() <= tolerance)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for AffineTransform {
    type Output = AffineTransform;

    fn mul(self, rhs: AffineTransform) -> AffineTransform {
        self.compose(&rhs)
    }
}

impl From<AffineTransform> for Matrix3<f64> {
    fn from(transform: AffineTransform) -> Self {
        transform.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const TOL: f64 = 1e-9;

    fn close(p: Point, q: Point) -> bool {
        (p - q).norm() < TOL
    }

    fn skewed() -> AffineTransform {
        AffineTransform::new(20.0, 5.0, 0.0, -10.0, 200.0, 300.0)
    }

    #[test]
    fn test_coefficient_layout() {
        let t = AffineTransform::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(t.coefficients(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t.matrix()[(2, 0)], 0.0);
        assert_eq!(t.matrix()[(2, 2)], 1.0);
    }

    #[test]
    fn test_point_and_vector_differ_by_translation() {
        let t = skewed();
        let p = t.apply_to_point(&Point::new(1.0, 2.0));
        let v = t.apply_to_vector(&Vector::new(1.0, 2.0));
        assert_eq!(p, Point::new(230.0, 280.0));
        assert_eq!(v, Vector::new(30.0, -20.0));
    }

    #[test]
    fn test_identity_law() {
        let t = skewed();
        let id = AffineTransform::identity();
        assert_eq!(t.compose(&id), t);
        assert_eq!(id.compose(&t), t);
        let p = Point::new(-3.5, 7.25);
        assert_eq!(id.apply_to_point(&p), p);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = skewed();
        let inv = t.invert().unwrap();
        for &(x, y) in &[(0.0, 0.0), (1.0, 2.0), (-40.5, 13.0), (1e3, -7.0)] {
            let p = Point::new(x, y);
            assert!(close(inv.apply_to_point(&t.apply_to_point(&p)), p));
            assert!(close(t.apply_to_point(&inv.apply_to_point(&p)), p));
        }
        assert!(t.compose(&inv).approx_eq(&AffineTransform::identity(), TOL));
    }

    #[test]
    fn test_degenerate_inversion() {
        let t = AffineTransform::new(2.0, 1.0, 4.0, 2.0, 0.0, 0.0);
        assert_eq!(t.determinant(), 0.0);
        assert!(matches!(
            t.invert(),
            Err(GeometryError::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn test_near_singular_uses_scaled_epsilon() {
        // Rounding noise must still be seen as singular.
        let t = AffineTransform::new(0.1 * 3.0, 0.3, 1.0, 1.0, 0.0, 0.0);
        assert!(t.determinant() != 0.0);
        assert!(t.invert().is_err());
        // A genuinely small but well-conditioned matrix stays invertible.
        let small = AffineTransform::scale(1e-6, 1e-6);
        assert!(small.invert().is_ok());
    }

    #[test]
    fn test_fixed_epsilon() {
        let t = AffineTransform::scale(0.01, 0.01);
        assert!(t.invert_with(Epsilon::Fixed(1e-3)).is_err());
        assert!(t.invert_with(Epsilon::Fixed(1e-5)).is_ok());
    }

    #[test]
    fn test_composition_order_matters() {
        let rotate = AffineTransform::rotation(FRAC_PI_2);
        let pan = AffineTransform::translation(10.0, 0.0);
        let rotate_then_pan = pan.compose(&rotate);
        let pan_then_rotate = rotate.compose(&pan);
        assert!(!rotate_then_pan.approx_eq(&pan_then_rotate, TOL));

        let p = Point::new(1.0, 0.0);
        assert!(close(rotate_then_pan.apply_to_point(&p), Point::new(10.0, 1.0)));
        assert!(close(pan_then_rotate.apply_to_point(&p), Point::new(0.0, 11.0)));
    }

    #[test]
    fn test_composition_is_associative() {
        let t1 = skewed();
        let t2 = AffineTransform::rotation(0.3);
        let t3 = AffineTransform::translation(-4.0, 9.0);
        let left = t1.compose(&t2).compose(&t3);
        let right = t1.compose(&t2.compose(&t3));
        assert!(left.approx_eq(&right, 1e-9));
        assert_eq!(t1 * t2, t1.compose(&t2));
    }

    #[test]
    fn test_about_keeps_pivot_fixed() {
        let pivot = Point::new(12.0, -3.0);
        let t = AffineTransform::about(&pivot, &AffineTransform::rotation(1.1));
        assert!(close(t.apply_to_point(&pivot), pivot));
    }
}
