//! Hit candidates produced by the kernels, and the identifiers passed through to epilogs.

use nalgebra::Vector3;

use crate::simd::{Mask, Real, SimdFloat, Vec3};

/// Geometry identifiers of a primitive batch. The kernels never look at them, they are
/// handed to the epilog together with each hit.
#[derive(Debug, Clone, Copy)]
pub struct PrimIds<'a> {
    /// Geometry id of every primitive of the batch.
    pub geom_ids: &'a [u32],
    /// Primitive id of every primitive of the batch.
    pub prim_ids: &'a [u32],
    /// Optional geometry id → instance id table.
    pub inst_map: Option<&'a [u32]>,
}

impl<'a> PrimIds<'a> {
    pub fn new(geom_ids: &'a [u32], prim_ids: &'a [u32]) -> Self {
        PrimIds {
            geom_ids,
            prim_ids,
            inst_map: None,
        }
    }

    pub fn with_instances(mut self, inst_map: &'a [u32]) -> Self {
        self.inst_map = Some(inst_map);
        self
    }

    pub fn geom_id(&self, prim: usize) -> u32 {
        self.geom_ids[prim]
    }

    pub fn prim_id(&self, prim: usize) -> u32 {
        self.prim_ids[prim]
    }

    /// Instance id of primitive `prim`, when an instance table is present.
    pub fn inst_id(&self, prim: usize) -> Option<u32> {
        self.inst_map
            .and_then(|map| map.get(self.geom_id(prim) as usize).copied())
    }
}

/// A hit candidate before division: numerators `U`, `V`, `T` share the denominator
/// `abs_den`. Only lanes set in `valid` carry meaningful numbers.
///
/// Lanes set in `flags` belong to the second triangle (v2, v3, v1) of their quad;
/// [`QuadHit::finalize`] maps them into the parameterization of the whole quad.
#[derive(Debug, Clone, Copy)]
pub struct QuadHit<V: SimdFloat> {
    pub valid: Mask<V>,
    pub(crate) u: V,
    pub(crate) v: V,
    pub(crate) t: V,
    pub(crate) abs_den: V,
    pub(crate) ng: Vec3<V>,
    pub(crate) flags: Mask<V>,
    prim_offset: usize,
    prim_stride: usize,
}

impl<V: SimdFloat> QuadHit<V> {
    /// A record whose lane `i` belongs to primitive `i`.
    pub(crate) fn new(
        valid: Mask<V>,
        u: V,
        v: V,
        t: V,
        abs_den: V,
        ng: Vec3<V>,
        flags: Mask<V>,
    ) -> Self {
        QuadHit {
            valid,
            u,
            v,
            t,
            abs_den,
            ng,
            flags,
            prim_offset: 0,
            prim_stride: V::LANES,
        }
    }

    /// Lane `i` now belongs to primitive `offset + i % stride`.
    pub(crate) fn map_primitives(mut self, offset: usize, stride: usize) -> Self {
        self.prim_offset = offset;
        self.prim_stride = stride;
        self
    }

    /// Index into the batch (and into [`PrimIds`]) of the primitive that lane `lane` tested.
    #[inline]
    pub fn primitive(&self, lane: usize) -> usize {
        self.prim_offset + lane % self.prim_stride
    }

    /// Lanes that were tested against the second triangle of their quad.
    #[inline]
    pub fn second_half(&self) -> Mask<V> {
        self.flags
    }

    /// Converts lanes of a packed test from the (v2, v1, v3) vertex order used there to the
    /// (v2, v3, v1) order of the quad parameterization: the barycentric numerators swap and
    /// the normal flips.
    #[inline(always)]
    pub(crate) fn reorder_second_half(&mut self) {
        let (u, v) = (self.u, self.v);
        self.u = V::select(self.flags, v, u);
        self.v = V::select(self.flags, u, v);
        self.ng = Vec3::select(self.flags, &-self.ng, &self.ng);
    }

    /// Divides by the shared denominator and maps second-half lanes to `(1-u, 1-v)`.
    pub fn finalize(&self) -> FinalHit<V> {
        let rcp_abs_den = V::one() / self.abs_den;
        let u = self.u * rcp_abs_den;
        let v = self.v * rcp_abs_den;
        FinalHit {
            valid: self.valid,
            u: V::select(self.flags, V::one() - u, u),
            v: V::select(self.flags, V::one() - v, v),
            t: self.t * rcp_abs_den,
            ng: self.ng,
        }
    }
}

/// A divided hit candidate in quad coordinates: `(0,0)` is v0, `(1,0)` is v1, `(1,1)` is
/// v2 and `(0,1)` is v3.
#[derive(Debug, Clone, Copy)]
pub struct FinalHit<V: SimdFloat> {
    pub valid: Mask<V>,
    pub u: V,
    pub v: V,
    pub t: V,
    /// Unnormalized geometric normal, `(v0 - v1) × (v3 - v0)` for both triangles.
    pub ng: Vec3<V>,
}

impl<V: SimdFloat> FinalHit<V> {
    pub fn uv(&self, lane: usize) -> (V::Element, V::Element) {
        (self.u.extract(lane), self.v.extract(lane))
    }

    pub fn t(&self, lane: usize) -> V::Element {
        self.t.extract(lane)
    }

    pub fn ng(&self, lane: usize) -> Vector3<V::Element> {
        self.ng.lane(lane)
    }

    /// The lane of `candidates` with the smallest distance. Ties go to the lower lane.
    pub fn closest(&self, candidates: Mask<V>) -> Option<usize> {
        let mut best: Option<(usize, V::Element)> = None;
        for lane in candidates.iter() {
            let t = self.t(lane);
            if best.map_or(true, |(_, best_t)| t < best_t) {
                best = Some((lane, t));
            }
        }
        best.map(|(lane, _)| lane)
    }
}

/// A committed hit of one ray, as stored by the reference epilogs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitRecord<T: Real> {
    pub t: T,
    pub u: T,
    pub v: T,
    pub ng: Vector3<T>,
    pub geom_id: u32,
    pub prim_id: u32,
    pub inst_id: Option<u32>,
}

impl<T: Real> HitRecord<T> {
    /// Reads lane `lane` of a finalized hit of primitive `prim`.
    pub fn from_lane<V>(hit: &FinalHit<V>, lane: usize, prim: usize, ids: &PrimIds<'_>) -> Self
    where
        V: SimdFloat<Element = T>,
    {
        let (u, v) = hit.uv(lane);
        HitRecord {
            t: hit.t(lane),
            u,
            v,
            ng: hit.ng(lane),
            geom_id: ids.geom_id(prim),
            prim_id: ids.prim_id(prim),
            inst_id: ids.inst_id(prim),
        }
    }

    /// Whether this hit replaces `current` as the closest one. On equal distances the
    /// hit committed first is kept.
    pub fn improves(&self, current: Option<&HitRecord<T>>) -> bool {
        current.map_or(true, |current| self.t < current.t)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use nalgebra::Vector3;

    use crate::hit::{HitRecord, PrimIds, QuadHit};
    use crate::simd::{f32x4, Mask, SimdFloat, Vec3};

    fn sample_hit(flags: Mask<f32x4>) -> QuadHit<f32x4> {
        QuadHit::new(
            Mask::all(),
            f32x4::from([1.0, 1.0, 2.0, 3.0]),
            f32x4::from([2.0, 1.0, 1.0, 0.0]),
            f32x4::from([8.0, 4.0, 12.0, 2.0]),
            f32x4::splat(4.0),
            Vec3::splat(&Vector3::new(0.0, 0.0, -4.0)),
            flags,
        )
    }

    #[test]
    fn test_finalize_divides_and_flips_second_half() {
        let hit = sample_hit(Mask::from_bitmask(0b1010)).finalize();
        assert_float_eq!(hit.uv(0).0, 0.25, abs <= 1e-7);
        assert_float_eq!(hit.uv(0).1, 0.5, abs <= 1e-7);
        assert_float_eq!(hit.uv(1).0, 0.75, abs <= 1e-7);
        assert_float_eq!(hit.uv(1).1, 0.75, abs <= 1e-7);
        assert_float_eq!(hit.uv(3).0, 0.25, abs <= 1e-7);
        assert_float_eq!(hit.uv(3).1, 1.0, abs <= 1e-7);
        assert_float_eq!(hit.t(2), 3.0, abs <= 1e-7);
    }

    #[test]
    fn test_reorder_swaps_numerators_and_normal() {
        let mut hit = sample_hit(Mask::from_bitmask(0b0001));
        hit.reorder_second_half();
        assert_float_eq!(hit.u.extract(0), 2.0, abs <= 0.0);
        assert_float_eq!(hit.v.extract(0), 1.0, abs <= 0.0);
        assert_eq!(hit.ng.lane(0), Vector3::new(0.0, 0.0, 4.0));
        assert_float_eq!(hit.u.extract(2), 2.0, abs <= 0.0);
        assert_eq!(hit.ng.lane(2), Vector3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn test_closest_prefers_lower_lane_on_ties() {
        let mut hit = sample_hit(Mask::none());
        hit.t = f32x4::from([8.0, 2.0, 12.0, 2.0]);
        let fin = hit.finalize();
        assert_eq!(fin.closest(Mask::all()), Some(1));
        assert_eq!(fin.closest(Mask::from_bitmask(0b1101)), Some(3));
        assert_eq!(fin.closest(Mask::none()), None);
    }

    #[test]
    fn test_primitive_mapping_and_ids() {
        let hit = sample_hit(Mask::none()).map_primitives(0, 2);
        assert_eq!(hit.primitive(3), 1);
        let hit = hit.map_primitives(5, 1);
        assert_eq!(hit.primitive(3), 5);

        let geom = [3, 1];
        let prims = [10, 11];
        let inst = [7, 8, 9, 6];
        let ids = PrimIds::new(&geom, &prims).with_instances(&inst);
        assert_eq!(ids.inst_id(0), Some(6));
        assert_eq!(ids.inst_id(1), Some(8));

        let record = HitRecord::from_lane(&sample_hit(Mask::none()).finalize(), 1, 1, &ids);
        assert_eq!(record.prim_id, 11);
        assert_eq!(record.geom_id, 1);
        assert!(record.improves(None));
        let farther = HitRecord { t: record.t + 1.0, ..record };
        assert!(record.improves(Some(&farther)));
        assert!(!farther.improves(Some(&record)));
        assert!(!record.improves(Some(&record)));
    }
}
