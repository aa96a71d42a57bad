//! Hit acceptance policies.
//!
//! The kernels only find candidate hits. What happens to a candidate (commit the closest
//! one, stop at the first one, run a user filter) is decided by an epilog. There is one
//! trait per call shape:
//!
//! - [`Epilog1`]: one ray against a batch of quads.
//! - [`EpilogK`]: a packet of rays against one quad, lane `k` is ray `k`.
//! - [`Epilog1K`]: ray `k` of a packet against a batch of quads.
//!
//! Closures implement each of them. [`ClosestHit`], [`AnyHit`], [`ClosestHitK`] and
//! [`AnyHitK`] are the usual policies.

use num_traits::Float;

use crate::hit::{FinalHit, HitRecord, PrimIds, QuadHit};
use crate::ray::{Ray, RayK};
use crate::simd::{Mask, Real, SimdFloat, MAX_LANES};

/// Accepts or rejects the candidate hits of one ray against a batch.
pub trait Epilog1<V: SimdFloat> {
    /// Returns whether a hit was accepted. May narrow `ray.tfar`.
    fn accept(&mut self, ray: &mut Ray<V::Element>, hit: &QuadHit<V>, ids: &PrimIds<'_>)
        -> bool;
}

/// Accepts or rejects the candidate hits of a packet against one primitive.
pub trait EpilogK<V: SimdFloat> {
    /// Returns the lanes whose hit was accepted. May narrow `tfar` of those rays.
    fn accept(&mut self, rays: &mut RayK<V>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> Mask<V>;
}

/// Accepts or rejects the candidate hits of ray `k` of a `K`-packet against a batch.
pub trait Epilog1K<K: SimdFloat, V: SimdFloat<Element = K::Element>> {
    fn accept(&mut self, rays: &mut RayK<K>, k: usize, hit: &QuadHit<V>, ids: &PrimIds<'_>)
        -> bool;
}

impl<V, F> Epilog1<V> for F
where
    V: SimdFloat,
    F: FnMut(&mut Ray<V::Element>, &QuadHit<V>, &PrimIds<'_>) -> bool,
{
    #[inline(always)]
    fn accept(&mut self, ray: &mut Ray<V::Element>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> bool {
        self(ray, hit, ids)
    }
}

impl<V, F> EpilogK<V> for F
where
    V: SimdFloat,
    F: FnMut(&mut RayK<V>, &QuadHit<V>, &PrimIds<'_>) -> Mask<V>,
{
    #[inline(always)]
    fn accept(&mut self, rays: &mut RayK<V>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> Mask<V> {
        self(rays, hit, ids)
    }
}

impl<K, V, F> Epilog1K<K, V> for F
where
    K: SimdFloat,
    V: SimdFloat<Element = K::Element>,
    F: FnMut(&mut RayK<K>, usize, &QuadHit<V>, &PrimIds<'_>) -> bool,
{
    #[inline(always)]
    fn accept(
        &mut self,
        rays: &mut RayK<K>,
        k: usize,
        hit: &QuadHit<V>,
        ids: &PrimIds<'_>,
    ) -> bool {
        self(rays, k, hit, ids)
    }
}

/// Runs `filter` on candidates in the order given by `next` until one passes.
fn first_accepted<V, F>(
    hit: &QuadHit<V>,
    ids: &PrimIds<'_>,
    filter: &mut Option<F>,
    mut candidates: Mask<V>,
    next: impl Fn(&FinalHit<V>, Mask<V>) -> Option<usize>,
) -> Option<HitRecord<V::Element>>
where
    V: SimdFloat,
    F: FnMut(&HitRecord<V::Element>) -> bool,
{
    let fin = hit.finalize();
    while let Some(lane) = next(&fin, candidates) {
        let record = HitRecord::from_lane(&fin, lane, hit.primitive(lane), ids);
        if filter.as_mut().map_or(true, |f| f(&record)) {
            return Some(record);
        }
        candidates = candidates.and_not(Mask::lane(lane));
    }
    None
}

/// Commits the closest candidate of every call and narrows `tfar` to it.
///
/// An optional filter can veto candidates; the next closest one is tried instead. A
/// candidate at the same distance as the committed hit is rejected, so among equally
/// close hits the one offered first wins. Use one `ClosestHit` per ray.
#[derive(Debug, Clone)]
pub struct ClosestHit<T: Real, F = fn(&HitRecord<T>) -> bool> {
    /// The closest committed hit so far.
    pub hit: Option<HitRecord<T>>,
    filter: Option<F>,
}

impl<T: Real> ClosestHit<T> {
    pub fn new() -> Self {
        ClosestHit {
            hit: None,
            filter: None,
        }
    }
}

impl<T: Real> Default for ClosestHit<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real, F: FnMut(&HitRecord<T>) -> bool> ClosestHit<T, F> {
    /// Only commits candidates for which `filter` returns `true`.
    pub fn with_filter(filter: F) -> Self {
        ClosestHit {
            hit: None,
            filter: Some(filter),
        }
    }
}

impl<V, F> Epilog1<V> for ClosestHit<V::Element, F>
where
    V: SimdFloat,
    F: FnMut(&HitRecord<V::Element>) -> bool,
{
    fn accept(&mut self, ray: &mut Ray<V::Element>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> bool {
        match first_accepted(hit, ids, &mut self.filter, hit.valid, |fin, m| fin.closest(m)) {
            Some(record) if record.improves(self.hit.as_ref()) => {
                ray.tfar = record.t;
                self.hit = Some(record);
                true
            }
            _ => false,
        }
    }
}

/// Stops at the first candidate that passes the optional filter and closes the ray by
/// setting `tfar` to negative infinity.
#[derive(Debug, Clone)]
pub struct AnyHit<T: Real, F = fn(&HitRecord<T>) -> bool> {
    /// The candidate that occluded the ray.
    pub hit: Option<HitRecord<T>>,
    filter: Option<F>,
}

impl<T: Real> AnyHit<T> {
    pub fn new() -> Self {
        AnyHit {
            hit: None,
            filter: None,
        }
    }
}

impl<T: Real> Default for AnyHit<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real, F: FnMut(&HitRecord<T>) -> bool> AnyHit<T, F> {
    pub fn with_filter(filter: F) -> Self {
        AnyHit {
            hit: None,
            filter: Some(filter),
        }
    }
}

impl<V, F> Epilog1<V> for AnyHit<V::Element, F>
where
    V: SimdFloat,
    F: FnMut(&HitRecord<V::Element>) -> bool,
{
    fn accept(&mut self, ray: &mut Ray<V::Element>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> bool {
        match first_accepted(hit, ids, &mut self.filter, hit.valid, |_, m| m.iter().next()) {
            Some(record) => {
                ray.tfar = V::Element::neg_infinity();
                self.hit = Some(record);
                true
            }
            None => false,
        }
    }
}

/// [`ClosestHit`] for every ray of a packet. Slot `k` holds the hit of ray `k`, ties are
/// kept by the hit committed first.
#[derive(Debug, Clone)]
pub struct ClosestHitK<T: Real, F = fn(&HitRecord<T>) -> bool> {
    hits: [Option<HitRecord<T>>; MAX_LANES],
    filter: Option<F>,
}

impl<T: Real> ClosestHitK<T> {
    pub fn new() -> Self {
        ClosestHitK {
            hits: [None; MAX_LANES],
            filter: None,
        }
    }
}

impl<T: Real> Default for ClosestHitK<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real, F> ClosestHitK<T, F> {
    /// The committed hit of ray `k`.
    pub fn hit(&self, k: usize) -> Option<&HitRecord<T>> {
        self.hits.get(k).and_then(Option::as_ref)
    }
}

impl<T: Real, F: FnMut(&HitRecord<T>) -> bool> ClosestHitK<T, F> {
    pub fn with_filter(filter: F) -> Self {
        ClosestHitK {
            hits: [None; MAX_LANES],
            filter: Some(filter),
        }
    }
}

impl<V, F> EpilogK<V> for ClosestHitK<V::Element, F>
where
    V: SimdFloat,
    F: FnMut(&HitRecord<V::Element>) -> bool,
{
    fn accept(&mut self, rays: &mut RayK<V>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> Mask<V> {
        let fin = hit.finalize();
        let mut accepted = 0u32;
        for k in hit.valid.iter() {
            let record = HitRecord::from_lane(&fin, k, hit.primitive(k), ids);
            if !record.improves(self.hits[k].as_ref()) {
                continue;
            }
            if self.filter.as_mut().map_or(true, |f| f(&record)) {
                self.hits[k] = Some(record);
                accepted |= 1 << k;
            }
        }
        let accepted = Mask::from_bitmask(accepted);
        rays.narrow(accepted, fin.t);
        accepted
    }
}

impl<K, V, F> Epilog1K<K, V> for ClosestHitK<K::Element, F>
where
    K: SimdFloat,
    V: SimdFloat<Element = K::Element>,
    F: FnMut(&HitRecord<K::Element>) -> bool,
{
    fn accept(
        &mut self,
        rays: &mut RayK<K>,
        k: usize,
        hit: &QuadHit<V>,
        ids: &PrimIds<'_>,
    ) -> bool {
        match first_accepted(hit, ids, &mut self.filter, hit.valid, |fin, m| fin.closest(m)) {
            Some(record) if record.improves(self.hits[k].as_ref()) => {
                rays.set_tfar(k, record.t);
                self.hits[k] = Some(record);
                true
            }
            _ => false,
        }
    }
}

/// [`AnyHit`] for every ray of a packet.
#[derive(Debug, Clone)]
pub struct AnyHitK<T: Real, F = fn(&HitRecord<T>) -> bool> {
    occluded: u32,
    filter: Option<F>,
    _real: std::marker::PhantomData<T>,
}

impl<T: Real> AnyHitK<T> {
    pub fn new() -> Self {
        AnyHitK {
            occluded: 0,
            filter: None,
            _real: std::marker::PhantomData,
        }
    }
}

impl<T: Real> Default for AnyHitK<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real, F> AnyHitK<T, F> {
    /// Whether ray `k` was found occluded.
    pub fn is_occluded(&self, k: usize) -> bool {
        (self.occluded >> k) & 1 == 1
    }

    /// The occluded rays, bit `k` for ray `k`.
    pub fn occluded(&self) -> u32 {
        self.occluded
    }
}

impl<T: Real, F: FnMut(&HitRecord<T>) -> bool> AnyHitK<T, F> {
    pub fn with_filter(filter: F) -> Self {
        AnyHitK {
            occluded: 0,
            filter: Some(filter),
            _real: std::marker::PhantomData,
        }
    }
}

impl<V, F> EpilogK<V> for AnyHitK<V::Element, F>
where
    V: SimdFloat,
    F: FnMut(&HitRecord<V::Element>) -> bool,
{
    fn accept(&mut self, rays: &mut RayK<V>, hit: &QuadHit<V>, ids: &PrimIds<'_>) -> Mask<V> {
        let accepted = match self.filter.as_mut() {
            None => hit.valid,
            Some(filter) => {
                let fin = hit.finalize();
                let bits = hit.valid.iter().fold(0u32, |bits, k| {
                    let record = HitRecord::from_lane(&fin, k, hit.primitive(k), ids);
                    if filter(&record) {
                        bits | 1 << k
                    } else {
                        bits
                    }
                });
                Mask::from_bitmask(bits)
            }
        };
        rays.narrow(accepted, V::splat(V::Element::neg_infinity()));
        self.occluded |= accepted.to_bitmask();
        accepted
    }
}

impl<K, V, F> Epilog1K<K, V> for AnyHitK<K::Element, F>
where
    K: SimdFloat,
    V: SimdFloat<Element = K::Element>,
    F: FnMut(&HitRecord<K::Element>) -> bool,
{
    fn accept(
        &mut self,
        rays: &mut RayK<K>,
        k: usize,
        hit: &QuadHit<V>,
        ids: &PrimIds<'_>,
    ) -> bool {
        let found = first_accepted(hit, ids, &mut self.filter, hit.valid, |_, m| m.iter().next());
        if found.is_some() {
            rays.set_tfar(k, K::Element::neg_infinity());
            self.occluded |= 1 << k;
        }
        found.is_some()
    }
}
