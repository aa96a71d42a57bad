//! Quads, quad batches and the intersectors that test them.
//!
//! A quad `(v0, v1, v2, v3)` is split along the diagonal `v1`-`v3` into the triangles
//! `(v0, v1, v3)` and `(v2, v3, v1)`. Hits on the second triangle are mapped back so that
//! `(u, v)` spans the whole quad: `(0,0)` is v0, `(1,0)` is v1, `(1,1)` is v2 and `(0,1)`
//! is v3.

mod dispatch;
mod packet;
mod single;

pub use self::dispatch::*;
pub use self::packet::*;
pub use self::single::*;

use nalgebra::{Point3, Vector3};

use crate::error::Error;
use crate::simd::{Mask, Real, SimdFloat, Vec3, Widen};
use crate::triangle::TriangleM;

/// A planar quadrilateral with counter-clockwise vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quad<T: Real> {
    pub v0: Point3<T>,
    pub v1: Point3<T>,
    pub v2: Point3<T>,
    pub v3: Point3<T>,
}

impl<T: Real> Quad<T> {
    pub fn new(v0: Point3<T>, v1: Point3<T>, v2: Point3<T>, v3: Point3<T>) -> Self {
        Quad { v0, v1, v2, v3 }
    }

    /// The unnormalized geometric normal reported for hits on this quad,
    /// `(v0 - v1) × (v3 - v0)`.
    pub fn normal(&self) -> Vector3<T> {
        (self.v0 - self.v1).cross(&(self.v3 - self.v0))
    }

    /// The point with quad coordinates `(u, v)`, interpolated on the triangle that
    /// contains it.
    pub fn point_at(&self, u: T, v: T) -> Point3<T> {
        let one = T::one();
        if u + v <= one {
            self.v0 + (self.v1 - self.v0) * u + (self.v3 - self.v0) * v
        } else {
            self.v2 + (self.v3 - self.v2) * (one - u) + (self.v1 - self.v2) * (one - v)
        }
    }
}

/// Up to `V::LANES` quads in structure-of-arrays layout, quad `i` in lane `i`.
///
/// Unused lanes hold collapsed quads at the origin, which never report a hit.
#[derive(Debug, Clone, Copy)]
pub struct QuadBatch<V: SimdFloat> {
    pub v0: Vec3<V>,
    pub v1: Vec3<V>,
    pub v2: Vec3<V>,
    pub v3: Vec3<V>,
    len: usize,
}

impl<V: SimdFloat> QuadBatch<V> {
    /// Loads `quads` into a batch.
    ///
    /// # Examples
    /// ```
    /// use quadsect::quad::{Quad, QuadBatch};
    /// use quadsect::simd::f32x4;
    /// use nalgebra::Point3;
    ///
    /// let quad = Quad::new(
    ///     Point3::new(0.0f32, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// let batch = QuadBatch::<f32x4>::from_quads(&[quad, quad]).unwrap();
    /// assert_eq!(batch.len(), 2);
    /// assert_eq!(batch.quad(1), quad);
    ///
    /// assert!(QuadBatch::<f32x4>::from_quads(&[quad; 5]).is_err());
    /// ```
    pub fn from_quads(quads: &[Quad<V::Element>]) -> Result<Self, Error> {
        if quads.len() > V::LANES {
            return Err(Error::BatchOverflow {
                given: quads.len(),
                lanes: V::LANES,
            });
        }
        let column = |vertex: fn(&Quad<V::Element>) -> Point3<V::Element>| {
            let zero = <V::Element as num_traits::Zero>::zero();
            let coord = |axis: usize| {
                V::from_fn(|i| quads.get(i).map_or(zero, |q| vertex(q)[axis]))
            };
            Vec3::new(coord(0), coord(1), coord(2))
        };
        Ok(QuadBatch {
            v0: column(|q| q.v0),
            v1: column(|q| q.v1),
            v2: column(|q| q.v2),
            v3: column(|q| q.v3),
            len: quads.len(),
        })
    }

    /// Replicates `quad` in every lane, as the packet kernels test it.
    pub fn splat(quad: &Quad<V::Element>) -> Self {
        QuadBatch {
            v0: Vec3::splat_point(&quad.v0),
            v1: Vec3::splat_point(&quad.v1),
            v2: Vec3::splat_point(&quad.v2),
            v3: Vec3::splat_point(&quad.v3),
            len: V::LANES,
        }
    }

    /// Reads quad `i`.
    pub fn quad(&self, i: usize) -> Quad<V::Element> {
        Quad::new(
            Point3::from(self.v0.lane(i)),
            Point3::from(self.v1.lane(i)),
            Point3::from(self.v2.lane(i)),
            Point3::from(self.v3.lane(i)),
        )
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lanes holding a quad.
    pub fn lanes(&self) -> Mask<V> {
        Mask::range(0, self.len)
    }

    /// Triangles `(v0, v1, v3)`.
    #[inline(always)]
    pub fn first_half(&self) -> TriangleM<V> {
        TriangleM::new(self.v0, self.v1, self.v3)
    }

    /// Triangles `(v2, v3, v1)`.
    #[inline(always)]
    pub fn second_half(&self) -> TriangleM<V> {
        TriangleM::new(self.v2, self.v3, self.v1)
    }
}

impl<V: Widen> QuadBatch<V> {
    /// Both halves of every quad in one register twice as wide: lanes `[0, M)` hold
    /// `(v0, v1, v3)` and lanes `[M, 2M)` hold `(v2, v1, v3)`, so only the first vertex
    /// differs between the blocks.
    ///
    /// The upper block has the reversed winding of `(v2, v3, v1)`; it is flagged so that
    /// culling still sees the quad's own facing, and its hits must be passed through
    /// [`QuadHit::reorder_second_half`] before they are finalized.
    ///
    /// [`QuadHit::reorder_second_half`]: ../hit/struct.QuadHit.html
    #[inline(always)]
    pub fn packed(&self) -> TriangleM<V::Wide> {
        TriangleM::new(
            Vec3::concat(&self.v0, &self.v2),
            Vec3::concat(&self.v1, &self.v1),
            Vec3::concat(&self.v3, &self.v3),
        )
        .with_reversed_winding(Self::upper_block())
    }

    /// Lanes of the packed register that hold second-half triangles.
    #[inline(always)]
    pub fn upper_block() -> Mask<V::Wide> {
        Mask::range(V::LANES, 2 * V::LANES)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use nalgebra::{Point3, Vector3};

    use crate::error::Error;
    use crate::quad::{Quad, QuadBatch};
    use crate::simd::{f32x4, f32x8, SimdFloat};
    use crate::testbase::unit_quad;

    #[test]
    fn test_batch_roundtrips_quads_and_pads() {
        let a = unit_quad();
        let b = Quad::new(a.v1, a.v2, a.v3, a.v0);
        let batch = QuadBatch::<f32x4>::from_quads(&[a, b]).unwrap();
        assert_eq!(batch.quad(0), a);
        assert_eq!(batch.quad(1), b);
        assert_eq!(batch.quad(3).v2, Point3::origin());
        assert_eq!(batch.lanes().to_bitmask(), 0b0011);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_batch_overflow() {
        let quads = [unit_quad(); 5];
        assert_eq!(
            QuadBatch::<f32x4>::from_quads(&quads).unwrap_err(),
            Error::BatchOverflow { given: 5, lanes: 4 }
        );
        assert!(QuadBatch::<f32x8>::from_quads(&quads).is_ok());
    }

    #[test]
    fn test_halves_share_diagonal_and_normal() {
        let quad = unit_quad();
        let batch = QuadBatch::<f32x4>::from_quads(&[quad]).unwrap();
        let first = batch.first_half();
        let second = batch.second_half();
        assert_eq!(first.ng.lane(0), quad.normal());
        assert_eq!(second.ng.lane(0), quad.normal());
        assert_eq!(first.ng.lane(0), Vector3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn test_packed_layout() {
        let quad = unit_quad();
        let batch = QuadBatch::<f32x4>::from_quads(&[quad]).unwrap();
        let packed = batch.packed();
        assert_eq!(packed.v0.lane(0), quad.v0.coords);
        assert_eq!(packed.v0.lane(4), quad.v2.coords);
        assert_eq!(packed.ng.lane(4), -quad.normal());
        assert_eq!(
            QuadBatch::<f32x4>::upper_block().to_bitmask(),
            0b1111_0000
        );
    }

    #[test]
    fn test_point_at_corners() {
        let quad = unit_quad();
        assert_eq!(quad.point_at(0.0, 0.0), quad.v0);
        assert_eq!(quad.point_at(1.0, 0.0), quad.v1);
        assert_eq!(quad.point_at(1.0, 1.0), quad.v2);
        assert_eq!(quad.point_at(0.0, 1.0), quad.v3);
        let centre = quad.point_at(0.5, 0.5);
        assert_float_eq!(centre.x, 0.0, abs <= 1e-7);
        assert_float_eq!(centre.y, 0.0, abs <= 1e-7);
        let splat = QuadBatch::<f32x8>::splat(&quad);
        assert_eq!(splat.len(), f32x8::LANES);
    }
}
