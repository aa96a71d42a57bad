//! One ray against a batch of quads.

use std::marker::PhantomData;

use crate::config::Culling;
use crate::epilog::Epilog1;
use crate::hit::PrimIds;
use crate::ray::{Ray, RayK};
use crate::simd::{Mask, SimdFloat, Widen};
use crate::triangle::{intersect_triangle, test_triangle};

use super::QuadBatch;

/// Tests a ray against the two halves of every quad of a batch, one half per call of
/// the triangle test.
#[derive(Debug, Clone, Copy)]
pub struct QuadIntersector1<V: SimdFloat> {
    culling: Culling,
    _lanes: PhantomData<V>,
}

impl<V: SimdFloat> QuadIntersector1<V> {
    pub fn new(culling: Culling) -> Self {
        QuadIntersector1 {
            culling,
            _lanes: PhantomData,
        }
    }

    pub fn culling(&self) -> Culling {
        self.culling
    }

    /// Hands the hits of each half to `epilog`. The second half is tested against the
    /// range left by the first.
    ///
    /// # Examples
    /// ```
    /// use quadsect::config::Culling;
    /// use quadsect::epilog::ClosestHit;
    /// use quadsect::hit::PrimIds;
    /// use quadsect::quad::{Quad, QuadBatch, QuadIntersector1};
    /// use quadsect::ray::Ray;
    /// use quadsect::simd::f32x4;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let quad = Quad::new(
    ///     Point3::new(-1.0f32, -1.0, 0.0),
    ///     Point3::new(1.0, -1.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(-1.0, 1.0, 0.0),
    /// );
    /// let batch = QuadBatch::<f32x4>::from_quads(&[quad]).unwrap();
    /// let mut ray = Ray::new(Point3::new(0.5, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
    ///
    /// let mut closest = ClosestHit::new();
    /// QuadIntersector1::new(Culling::None).intersect(
    ///     &mut ray,
    ///     &batch,
    ///     &PrimIds::new(&[7], &[42]),
    ///     &mut closest,
    /// );
    ///
    /// let hit = closest.hit.unwrap();
    /// assert_eq!(hit.prim_id, 42);
    /// assert_eq!((hit.u, hit.v), (0.75, 0.625));
    /// assert_eq!(ray.tfar, 1.0);
    /// ```
    pub fn intersect<E: Epilog1<V>>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) {
        let rays = RayK::broadcast(ray);
        intersect_triangle(&rays, &batch.first_half(), Mask::none(), self.culling, |hit| {
            Epilog1::<V>::accept(epilog, ray, &hit, ids)
        });
        let rays = RayK::broadcast(ray);
        intersect_triangle(&rays, &batch.second_half(), Mask::all(), self.culling, |hit| {
            Epilog1::<V>::accept(epilog, ray, &hit, ids)
        });
    }

    /// Returns `true` as soon as the epilog accepts a hit. The second half is not tested
    /// when the first one already occludes the ray.
    pub fn occluded<E: Epilog1<V>>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> bool {
        let rays = RayK::broadcast(ray);
        if intersect_triangle(&rays, &batch.first_half(), Mask::none(), self.culling, |hit| {
            Epilog1::<V>::accept(epilog, ray, &hit, ids)
        }) {
            return true;
        }
        let rays = RayK::broadcast(ray);
        intersect_triangle(&rays, &batch.second_half(), Mask::all(), self.culling, |hit| {
            Epilog1::<V>::accept(epilog, ray, &hit, ids)
        })
    }
}

/// Tests a ray against both halves of every quad of a `V` batch in one triangle test on
/// the twice-as-wide register `V::Wide`.
///
/// Hits are reported on `V::Wide` lanes: lane `i` and lane `i + V::LANES` both belong to
/// quad `i`, the latter to its second half. Results agree with [`QuadIntersector1`].
#[derive(Debug, Clone, Copy)]
pub struct PackedQuadIntersector1<V: Widen> {
    culling: Culling,
    _lanes: PhantomData<V>,
}

impl<V: Widen> PackedQuadIntersector1<V> {
    pub fn new(culling: Culling) -> Self {
        PackedQuadIntersector1 {
            culling,
            _lanes: PhantomData,
        }
    }

    pub fn culling(&self) -> Culling {
        self.culling
    }

    pub fn intersect<E: Epilog1<V::Wide>>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) {
        self.occluded(ray, batch, ids, epilog);
    }

    /// There is only one epilog call, so this is [`PackedQuadIntersector1::intersect`]
    /// returning the verdict.
    pub fn occluded<E: Epilog1<V::Wide>>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> bool {
        let rays = RayK::<V::Wide>::broadcast(ray);
        let flags = QuadBatch::<V>::upper_block();
        match test_triangle(&rays, &batch.packed(), flags, self.culling) {
            Some(mut hit) => {
                hit.reorder_second_half();
                let hit = hit.map_primitives(0, V::LANES);
                Epilog1::<V::Wide>::accept(epilog, ray, &hit, ids)
            }
            None => false,
        }
    }
}

#[cfg(all(feature = "bench", test))]
mod bench {
    use test::{black_box, Bencher};

    use crate::config::Culling;
    use crate::epilog::ClosestHit;
    use crate::hit::PrimIds;
    use crate::quad::{PackedQuadIntersector1, QuadBatch, QuadIntersector1};
    use crate::simd::{f32x8, SimdFloat};
    use crate::testbase::{random_quads, random_rays_into};

    const IDS: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

    #[bench]
    fn bench_generic_f32x8(b: &mut Bencher) {
        let quads = random_quads(f32x8::LANES, 0);
        let batch = QuadBatch::<f32x8>::from_quads(&quads).unwrap();
        let rays = random_rays_into(&quads, 256, 1);
        let kernel = QuadIntersector1::new(Culling::None);
        b.iter(|| {
            for ray in &rays {
                let mut ray = *ray;
                let mut epilog = ClosestHit::new();
                kernel.intersect(&mut ray, &batch, &PrimIds::new(&IDS, &IDS), &mut epilog);
                black_box(epilog.hit);
            }
        });
    }

    #[bench]
    fn bench_packed_f32x8(b: &mut Bencher) {
        let quads = random_quads(f32x8::LANES, 0);
        let batch = QuadBatch::<f32x8>::from_quads(&quads).unwrap();
        let rays = random_rays_into(&quads, 256, 1);
        let kernel = PackedQuadIntersector1::new(Culling::None);
        b.iter(|| {
            for ray in &rays {
                let mut ray = *ray;
                let mut epilog = ClosestHit::new();
                kernel.intersect(&mut ray, &batch, &PrimIds::new(&IDS, &IDS), &mut epilog);
                black_box(epilog.hit);
            }
        });
    }
}
