use std::ops::{Add, Neg, Sub};

use nalgebra::{Point3, Vector3};

use super::{Mask, SimdFloat, Widen};

/// Structure-of-arrays 3-vector: lane `i` of `x`, `y` and `z` forms one vector.
#[derive(Clone, Copy, Debug)]
pub struct Vec3<V> {
    pub x: V,
    pub y: V,
    pub z: V,
}

impl<V: SimdFloat> Vec3<V> {
    #[inline(always)]
    pub fn new(x: V, y: V, z: V) -> Self {
        Vec3 { x, y, z }
    }

    /// Broadcasts `v` to every lane.
    #[inline(always)]
    pub fn splat(v: &Vector3<V::Element>) -> Self {
        Vec3::new(V::splat(v.x), V::splat(v.y), V::splat(v.z))
    }

    /// Broadcasts `p` to every lane.
    #[inline(always)]
    pub fn splat_point(p: &Point3<V::Element>) -> Self {
        Self::splat(&p.coords)
    }

    #[inline(always)]
    pub fn zero() -> Self {
        Vec3::new(V::zero(), V::zero(), V::zero())
    }

    /// Loads one point per lane. Lanes past the end of `points` are zero.
    pub fn gather(points: &[Point3<V::Element>]) -> Self {
        let zero = <V::Element as num_traits::Zero>::zero();
        let coord = |axis: usize| V::from_fn(|i| points.get(i).map_or(zero, |p| p[axis]));
        Vec3::new(coord(0), coord(1), coord(2))
    }

    /// Reads lane `lane` as a scalar vector.
    #[inline]
    pub fn lane(&self, lane: usize) -> Vector3<V::Element> {
        Vector3::new(self.x.extract(lane), self.y.extract(lane), self.z.extract(lane))
    }

    #[inline(always)]
    pub fn dot(&self, other: &Self) -> V {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline(always)]
    pub fn cross(&self, other: &Self) -> Self {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Lane-wise `if mask { t } else { f }`.
    #[inline(always)]
    pub fn select(mask: Mask<V>, t: &Self, f: &Self) -> Self {
        Vec3::new(
            V::select(mask, t.x, f.x),
            V::select(mask, t.y, f.y),
            V::select(mask, t.z, f.z),
        )
    }
}

impl<V: Widen> Vec3<V> {
    /// Places `lo` in the lower and `hi` in the upper lanes of a twice-as-wide vector.
    #[inline(always)]
    pub fn concat(lo: &Self, hi: &Self) -> Vec3<V::Wide> {
        Vec3::new(
            V::concat(lo.x, hi.x),
            V::concat(lo.y, hi.y),
            V::concat(lo.z, hi.z),
        )
    }
}

impl<V: SimdFloat> Add for Vec3<V> {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<V: SimdFloat> Sub for Vec3<V> {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<V: SimdFloat> Neg for Vec3<V> {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use nalgebra::{Point3, Vector3};

    use crate::simd::{f32x4, Mask, SimdFloat, Vec3};

    #[test]
    fn test_cross_matches_nalgebra() {
        let a = Vector3::new(1.0f32, -2.0, 0.5);
        let b = Vector3::new(0.25f32, 3.0, -1.0);
        let expected = a.cross(&b);
        let simd = Vec3::<f32x4>::splat(&a).cross(&Vec3::splat(&b));
        for lane in 0..4 {
            assert_eq!(simd.lane(lane), expected);
        }
        assert_float_eq!(
            Vec3::<f32x4>::splat(&a).dot(&Vec3::splat(&b)).extract(2),
            a.dot(&b),
            abs <= 0.0
        );
    }

    #[test]
    fn test_gather_pads_with_zero() {
        let points = [Point3::new(1.0f32, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)];
        let v = Vec3::<f32x4>::gather(&points);
        assert_eq!(v.lane(1), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(v.lane(3), Vector3::zeros());
    }

    #[test]
    fn test_select_and_neg() {
        let a = Vec3::<f32x4>::splat(&Vector3::new(1.0, 1.0, 1.0));
        let picked = Vec3::select(Mask::lane(2), &-a, &a);
        assert_eq!(picked.lane(2), Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(picked.lane(0), Vector3::new(1.0, 1.0, 1.0));
        assert_float_eq!(picked.x.extract(3), 1.0, abs <= 0.0);
    }
}
