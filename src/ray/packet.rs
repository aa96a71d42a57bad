//! This module defines [`RayK`], a packet of rays stored one ray per lane.

use nalgebra::Point3;
use num_traits::{Float, Zero};

use crate::error::Error;
use crate::simd::{Mask, SimdFloat, Vec3};

use super::Ray;

/// `K = V::LANES` independent rays in structure-of-arrays layout. Lane `k` is ray `k`.
///
/// The single-ray kernels use [`RayK::broadcast`] to replicate one ray over every lane of a
/// primitive batch, so the same type serves both widening axes.
#[derive(Debug, Clone, Copy)]
pub struct RayK<V: SimdFloat> {
    pub origin: Vec3<V>,
    pub direction: Vec3<V>,
    pub tnear: V,
    pub tfar: V,
}

impl<V: SimdFloat> RayK<V> {
    /// Replicates `ray` in every lane.
    #[inline(always)]
    pub fn broadcast(ray: &Ray<V::Element>) -> Self {
        RayK {
            origin: Vec3::splat_point(&ray.origin),
            direction: Vec3::splat(&ray.direction),
            tnear: V::splat(ray.tnear),
            tfar: V::splat(ray.tfar),
        }
    }

    /// Loads up to `K` rays. Returns the packet and the mask of occupied lanes.
    ///
    /// Unoccupied lanes get an empty range (`tnear = +inf`, `tfar = -inf`) so they can
    /// never report a hit even when the caller forgets the mask.
    ///
    /// # Examples
    /// ```
    /// use quadsect::ray::{Ray, RayK};
    /// use quadsect::simd::f32x4;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0f32, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0));
    /// let (packet, active) = RayK::<f32x4>::from_rays(&[ray, ray]).unwrap();
    ///
    /// assert_eq!(active.to_bitmask(), 0b0011);
    /// assert_eq!(packet.lane(1), ray);
    /// ```
    pub fn from_rays(rays: &[Ray<V::Element>]) -> Result<(Self, Mask<V>), Error> {
        if rays.len() > V::LANES {
            return Err(Error::PacketOverflow {
                given: rays.len(),
                lanes: V::LANES,
            });
        }
        let zero = V::Element::zero();
        let lanes = |f: fn(&Ray<V::Element>) -> V::Element| {
            V::from_fn(|i| rays.get(i).map_or(zero, f))
        };
        let packet = RayK {
            origin: Vec3::new(
                lanes(|r| r.origin.x),
                lanes(|r| r.origin.y),
                lanes(|r| r.origin.z),
            ),
            direction: Vec3::new(
                lanes(|r| r.direction.x),
                lanes(|r| r.direction.y),
                lanes(|r| r.direction.z),
            ),
            tnear: V::from_fn(|i| rays.get(i).map_or(V::Element::infinity(), |r| r.tnear)),
            tfar: V::from_fn(|i| {
                rays.get(i)
                    .map_or(V::Element::neg_infinity(), |r| r.tfar)
            }),
        };
        Ok((packet, Mask::range(0, rays.len())))
    }

    /// Extracts ray `k`.
    pub fn lane(&self, k: usize) -> Ray<V::Element> {
        Ray::segment(
            Point3::from(self.origin.lane(k)),
            self.direction.lane(k),
            self.tnear.extract(k),
            self.tfar.extract(k),
        )
    }

    /// Sets `tfar` of the lanes in `mask` to the matching lanes of `tfar`.
    #[inline(always)]
    pub fn narrow(&mut self, mask: Mask<V>, tfar: V) {
        self.tfar = V::select(mask, tfar, self.tfar);
    }

    /// Sets `tfar` of ray `k`.
    #[inline]
    pub fn set_tfar(&mut self, k: usize, tfar: V::Element) {
        self.narrow(Mask::lane(k), V::splat(tfar));
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use nalgebra::{Point3, Vector3};

    use crate::error::Error;
    use crate::ray::{Ray, RayK};
    use crate::simd::{f32x16, f64x2, f32x4, SimdFloat};

    #[test]
    fn test_from_rays_pads_empty_ranges() {
        let ray = Ray::segment(
            Point3::new(1.0f32, 2.0, 3.0),
            Vector3::new(0.0, 1.0, 0.0),
            0.25,
            9.0,
        );
        let (packet, active) = RayK::<f32x16>::from_rays(&[ray; 5]).unwrap();
        assert_eq!(active.to_bitmask(), 0b1_1111);
        assert_eq!(packet.lane(4), ray);
        assert!(packet.tnear.extract(9) > packet.tfar.extract(9));
    }

    #[test]
    fn test_from_rays_rejects_overflow() {
        let ray = Ray::new(Point3::origin(), Vector3::new(1.0f64, 0.0, 0.0));
        match RayK::<f64x2>::from_rays(&[ray; 3]) {
            Err(Error::PacketOverflow { given, lanes }) => {
                assert_eq!(given, 3);
                assert_eq!(lanes, 2);
            }
            other => panic!("unexpected result {:?}", other.map(|(_, m)| m)),
        }
    }

    #[test]
    fn test_set_tfar_touches_one_lane() {
        let ray = Ray::new(Point3::origin(), Vector3::new(1.0f32, 0.0, 0.0));
        let mut packet = RayK::<f32x4>::broadcast(&ray);
        packet.set_tfar(2, 4.0);
        assert_float_eq!(packet.tfar.extract(2), 4.0, abs <= 0.0);
        assert_eq!(packet.tfar.extract(1), f32::INFINITY);
    }
}
