//! Packets of rays against quads.

use std::marker::PhantomData;

use crate::config::Culling;
use crate::epilog::{Epilog1K, EpilogK};
use crate::hit::PrimIds;
use crate::ray::RayK;
use crate::simd::{Mask, SimdFloat, Vec3, Widen};
use crate::triangle::{intersect_triangle_k, test_triangle, TriangleM};

use super::{Quad, QuadBatch};

/// Tests a packet of `K::LANES` rays against quads, and single rays of such a packet
/// against quad batches.
#[derive(Debug, Clone, Copy)]
pub struct QuadIntersectorK<K: SimdFloat> {
    culling: Culling,
    _lanes: PhantomData<K>,
}

impl<K: SimdFloat> QuadIntersectorK<K> {
    pub fn new(culling: Culling) -> Self {
        QuadIntersectorK {
            culling,
            _lanes: PhantomData,
        }
    }

    pub fn culling(&self) -> Culling {
        self.culling
    }

    /// Tests the `active` rays against `quad`, which is primitive 0 of `ids`.
    ///
    /// Returns the lanes whose hit the epilog accepted, over both halves. Rays that were
    /// not accepted are still active for the next primitive.
    pub fn intersect_k<E: EpilogK<K>>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        quad: &Quad<K::Element>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K> {
        self.intersect_prim(active, rays, quad, 0, ids, epilog)
    }

    /// Like [`QuadIntersectorK::intersect_k`], but lanes accepted on the first half are
    /// not tested against the second, and the second is skipped altogether once every
    /// active ray is occluded.
    pub fn occluded_k<E: EpilogK<K>>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        quad: &Quad<K::Element>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K> {
        self.occluded_prim(active, rays, quad, 0, ids, epilog)
    }

    /// Runs [`QuadIntersectorK::intersect_k`] for every quad of `batch`, quad `i` being
    /// primitive `i` of `ids`.
    ///
    /// The first halves of all quads are tested before the second halves, in the order
    /// the single-ray kernels offer them, so equally close hits resolve the same way.
    pub fn intersect_k_batch<V, E>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K>
    where
        V: SimdFloat<Element = K::Element>,
        E: EpilogK<K>,
    {
        let mut accepted = Mask::none();
        for second in [false, true] {
            for i in 0..batch.len() {
                let tri = Self::half(&batch.quad(i), second);
                accepted |= self.intersect_half(active, rays, &tri, second, i, ids, epilog);
            }
        }
        accepted
    }

    /// Runs [`QuadIntersectorK::occluded_k`] for every quad of `batch` until every active
    /// ray is occluded.
    pub fn occluded_k_batch<V, E>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K>
    where
        V: SimdFloat<Element = K::Element>,
        E: EpilogK<K>,
    {
        let mut occluded = Mask::none();
        for i in 0..batch.len() {
            let remaining = active.and_not(occluded);
            if remaining.is_empty() {
                break;
            }
            occluded |= self.occluded_prim(remaining, rays, &batch.quad(i), i, ids, epilog);
        }
        occluded
    }

    /// Triangle `(v0, v1, v3)` of `quad`, or `(v2, v3, v1)` when `second`.
    fn half(quad: &Quad<K::Element>, second: bool) -> TriangleM<K> {
        let v1 = Vec3::splat_point(&quad.v1);
        let v3 = Vec3::splat_point(&quad.v3);
        if second {
            TriangleM::new(Vec3::splat_point(&quad.v2), v3, v1)
        } else {
            TriangleM::new(Vec3::splat_point(&quad.v0), v1, v3)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn intersect_half<E: EpilogK<K>>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        tri: &TriangleM<K>,
        second: bool,
        prim: usize,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K> {
        let flags = if second { Mask::all() } else { Mask::none() };
        intersect_triangle_k(active, rays, tri, flags, self.culling, |rays, hit| {
            EpilogK::<K>::accept(epilog, rays, &hit.map_primitives(prim, 1), ids)
        })
    }

    fn intersect_prim<E: EpilogK<K>>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        quad: &Quad<K::Element>,
        prim: usize,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K> {
        let first = Self::half(quad, false);
        let accepted = self.intersect_half(active, rays, &first, false, prim, ids, epilog);
        let second = Self::half(quad, true);
        accepted | self.intersect_half(active, rays, &second, true, prim, ids, epilog)
    }

    fn occluded_prim<E: EpilogK<K>>(
        &self,
        active: Mask<K>,
        rays: &mut RayK<K>,
        quad: &Quad<K::Element>,
        prim: usize,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> Mask<K> {
        let first = Self::half(quad, false);
        let occluded = self.intersect_half(active, rays, &first, false, prim, ids, epilog);
        let active = active.and_not(occluded);
        if active.is_empty() {
            return occluded;
        }
        let second = Self::half(quad, true);
        occluded | self.intersect_half(active, rays, &second, true, prim, ids, epilog)
    }

    /// Tests ray `k` of the packet against a batch of quads, one half per call of the
    /// triangle test.
    pub fn intersect1<V, E>(
        &self,
        rays: &mut RayK<K>,
        k: usize,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) where
        V: SimdFloat<Element = K::Element>,
        E: Epilog1K<K, V>,
    {
        let ray = RayK::<V>::broadcast(&rays.lane(k));
        if let Some(hit) = test_triangle(&ray, &batch.first_half(), Mask::none(), self.culling) {
            Epilog1K::<K, V>::accept(epilog, rays, k, &hit, ids);
        }
        let ray = RayK::<V>::broadcast(&rays.lane(k));
        if let Some(hit) = test_triangle(&ray, &batch.second_half(), Mask::all(), self.culling) {
            Epilog1K::<K, V>::accept(epilog, rays, k, &hit, ids);
        }
    }

    /// Returns `true` as soon as the epilog accepts a hit of ray `k`.
    pub fn occluded1<V, E>(
        &self,
        rays: &mut RayK<K>,
        k: usize,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> bool
    where
        V: SimdFloat<Element = K::Element>,
        E: Epilog1K<K, V>,
    {
        let ray = RayK::<V>::broadcast(&rays.lane(k));
        if let Some(hit) = test_triangle(&ray, &batch.first_half(), Mask::none(), self.culling) {
            if Epilog1K::<K, V>::accept(epilog, rays, k, &hit, ids) {
                return true;
            }
        }
        let ray = RayK::<V>::broadcast(&rays.lane(k));
        match test_triangle(&ray, &batch.second_half(), Mask::all(), self.culling) {
            Some(hit) => Epilog1K::<K, V>::accept(epilog, rays, k, &hit, ids),
            None => false,
        }
    }

    /// [`QuadIntersectorK::intersect1`] with both halves in one test on `V::Wide`, laid
    /// out as by [`PackedQuadIntersector1`].
    ///
    /// [`PackedQuadIntersector1`]: struct.PackedQuadIntersector1.html
    pub fn intersect1_packed<V, E>(
        &self,
        rays: &mut RayK<K>,
        k: usize,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) where
        V: Widen<Element = K::Element>,
        E: Epilog1K<K, V::Wide>,
    {
        self.occluded1_packed(rays, k, batch, ids, epilog);
    }

    pub fn occluded1_packed<V, E>(
        &self,
        rays: &mut RayK<K>,
        k: usize,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> bool
    where
        V: Widen<Element = K::Element>,
        E: Epilog1K<K, V::Wide>,
    {
        let ray = RayK::<V::Wide>::broadcast(&rays.lane(k));
        let flags = QuadBatch::<V>::upper_block();
        match test_triangle(&ray, &batch.packed(), flags, self.culling) {
            Some(mut hit) => {
                hit.reorder_second_half();
                let hit = hit.map_primitives(0, V::LANES);
                Epilog1K::<K, V::Wide>::accept(epilog, rays, k, &hit, ids)
            }
            None => false,
        }
    }
}
