//! This module defines the single [`Ray`] consumed by the intersection kernels.

use nalgebra::{Point3, Vector3};

use crate::simd::Real;

/// A ray with a valid parametric range `[tnear, tfar]`.
///
/// Unlike a shading ray, the direction is not normalized: distances reported by the
/// kernels are in units of `direction`. `tfar` narrows as closer hits get committed, which
/// is the business of the epilog, not of the kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray<T: Real> {
    /// The ray origin.
    pub origin: Point3<T>,

    /// The ray direction.
    pub direction: Vector3<T>,

    /// Lower bound of the valid parametric range.
    pub tnear: T,

    /// Upper bound of the valid parametric range.
    pub tfar: T,
}

impl<T: Real> Ray<T> {
    /// Creates a new [`Ray`] from an `origin` and a `direction`, valid on `[0, +inf]`.
    ///
    /// # Examples
    /// ```
    /// use quadsect::ray::Ray;
    /// use nalgebra::{Point3,Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(2.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// assert_eq!(ray.tnear, 0.0);
    /// assert_eq!(ray.tfar, f64::INFINITY);
    /// ```
    pub fn new(origin: Point3<T>, direction: Vector3<T>) -> Ray<T> {
        Ray::segment(origin, direction, T::zero(), T::infinity())
    }

    /// Creates a [`Ray`] that is only valid on `[tnear, tfar]`.
    pub fn segment(origin: Point3<T>, direction: Vector3<T>, tnear: T, tfar: T) -> Ray<T> {
        Ray {
            origin,
            direction,
            tnear,
            tfar,
        }
    }

    /// The point at parametric distance `t`.
    pub fn point_at(&self, t: T) -> Point3<T> {
        self.origin + self.direction * t
    }

    /// Whether an accepted occlusion test has closed this ray, see [`AnyHit`].
    ///
    /// [`AnyHit`]: ../epilog/struct.AnyHit.html
    pub fn is_occluded(&self) -> bool {
        self.tfar == T::neg_infinity()
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use nalgebra::{Point3, Vector3};

    use crate::ray::Ray;

    #[test]
    fn test_segment_keeps_range() {
        let ray = Ray::segment(
            Point3::new(0.0f32, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
            0.5,
            3.0,
        );
        assert_float_eq!(ray.tnear, 0.5, abs <= 0.0);
        assert_float_eq!(ray.tfar, 3.0, abs <= 0.0);
        assert!(!ray.is_occluded());
    }

    #[test]
    fn test_point_at_uses_unnormalized_direction() {
        let ray = Ray::new(Point3::new(1.0f64, 0.0, 0.0), Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(ray.point_at(1.5), Point3::new(1.0, 3.0, 0.0));
    }
}
