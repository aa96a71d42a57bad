//! The triangle test shared by every quad kernel.
//!
//! This is the [Möller-Trumbore](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm)
//! test with deferred division: the barycentric and depth numerators are compared against
//! the unnormalized denominator, so no lane divides before it is known to hit.

use crate::config::Culling;
use crate::hit::QuadHit;
use crate::ray::RayK;
use crate::simd::{Mask, Real, SimdFloat, Vec3};

/// One triangle per lane, stored as first vertex, two edges and the geometric normal.
#[derive(Debug, Clone, Copy)]
pub struct TriangleM<V: SimdFloat> {
    pub v0: Vec3<V>,
    /// `v0 - v1`
    pub e1: Vec3<V>,
    /// `v2 - v0`
    pub e2: Vec3<V>,
    /// `e1 × e2`
    pub ng: Vec3<V>,
    /// Sign bit set in lanes whose vertices were supplied in reversed winding.
    winding: V,
}

impl<V: SimdFloat> TriangleM<V> {
    /// Triangles `(v0, v1, v2)`, one per lane.
    #[inline(always)]
    pub fn new(v0: Vec3<V>, v1: Vec3<V>, v2: Vec3<V>) -> Self {
        let e1 = v0 - v1;
        let e2 = v2 - v0;
        let ng = e1.cross(&e2);
        Self::from_edges(v0, e1, e2, ng)
    }

    /// Triangles given in pre-split form.
    #[inline(always)]
    pub fn from_edges(v0: Vec3<V>, e1: Vec3<V>, e2: Vec3<V>, ng: Vec3<V>) -> Self {
        TriangleM {
            v0,
            e1,
            e2,
            ng,
            winding: V::zero(),
        }
    }

    /// Marks the lanes of `mask` as supplied in reversed winding, so that backface culling
    /// judges them by the facing of the original winding.
    #[inline(always)]
    pub fn with_reversed_winding(mut self, mask: Mask<V>) -> Self {
        self.winding = V::select(mask, V::splat(<V::Element as Real>::SIGN_BIT), V::zero());
        self
    }

    #[inline(always)]
    fn facing(&self, den: V, culling: Culling) -> Mask<V> {
        match culling {
            Culling::None => den.simd_ne(V::zero()),
            Culling::Backface => den.flip_sign(self.winding).simd_gt(V::zero()),
        }
    }
}

/// Numerators shared by both test orders.
struct Setup<V: SimdFloat> {
    c: Vec3<V>,
    r: Vec3<V>,
    den: V,
    abs_den: V,
    sgn_den: V,
}

impl<V: SimdFloat> Setup<V> {
    #[inline(always)]
    fn new(rays: &RayK<V>, tri: &TriangleM<V>) -> Self {
        let c = tri.v0 - rays.origin;
        let r = rays.direction.cross(&c);
        let den = tri.ng.dot(&rays.direction);
        Setup {
            c,
            r,
            den,
            abs_den: den.abs(),
            sgn_den: den.sign_bits(),
        }
    }
}

/// Tests one ray, replicated over the lanes of `rays`, against one triangle per lane.
///
/// Edge and facing tests run in one combined step, then the depth test; the function
/// returns `None` as soon as no lane survives a step. `flags` is copied into the hit to
/// mark second-half triangles.
#[inline(always)]
pub fn test_triangle<V: SimdFloat>(
    rays: &RayK<V>,
    tri: &TriangleM<V>,
    flags: Mask<V>,
    culling: Culling,
) -> Option<QuadHit<V>> {
    let s = Setup::new(rays, tri);

    // edge tests
    let u = s.r.dot(&tri.e2).flip_sign(s.sgn_den);
    let v = s.r.dot(&tri.e1).flip_sign(s.sgn_den);
    let mut valid = tri.facing(s.den, culling)
        & u.simd_ge(V::zero())
        & v.simd_ge(V::zero())
        & (u + v).simd_le(s.abs_den);
    if valid.is_empty() {
        return None;
    }

    // depth test, against the unnormalized range
    let t = tri.ng.dot(&s.c).flip_sign(s.sgn_den);
    valid &= t.simd_ge(s.abs_den * rays.tnear) & t.simd_le(s.abs_den * rays.tfar);
    if valid.is_empty() {
        return None;
    }

    Some(QuadHit::new(valid, u, v, t, s.abs_den, tri.ng, flags))
}

/// [`test_triangle`], handing a surviving hit to `epilog`. Returns the epilog's verdict,
/// or `false` when no lane hit.
#[inline(always)]
pub fn intersect_triangle<V, F>(
    rays: &RayK<V>,
    tri: &TriangleM<V>,
    flags: Mask<V>,
    culling: Culling,
    epilog: F,
) -> bool
where
    V: SimdFloat,
    F: FnOnce(QuadHit<V>) -> bool,
{
    test_triangle(rays, tri, flags, culling).map_or(false, epilog)
}

/// Tests a packet of rays against one triangle replicated over the lanes of `tri`.
///
/// The three edge tests, the depth test and the facing test run as separate stages. Each
/// stage narrows `active` and returns `None` once it is empty, which is cheap for packets
/// whose rays mostly miss.
#[inline(always)]
pub fn test_triangle_k<V: SimdFloat>(
    active: Mask<V>,
    rays: &RayK<V>,
    tri: &TriangleM<V>,
    flags: Mask<V>,
    culling: Culling,
) -> Option<QuadHit<V>> {
    let s = Setup::new(rays, tri);
    let mut valid = active;

    // edge p2 p0
    let u = s.r.dot(&tri.e2).flip_sign(s.sgn_den);
    valid &= u.simd_ge(V::zero());
    if valid.is_empty() {
        return None;
    }

    // edge p0 p1
    let v = s.r.dot(&tri.e1).flip_sign(s.sgn_den);
    valid &= v.simd_ge(V::zero());
    if valid.is_empty() {
        return None;
    }

    // edge p1 p2
    let w = s.abs_den - u - v;
    valid &= w.simd_ge(V::zero());
    if valid.is_empty() {
        return None;
    }

    let t = tri.ng.dot(&s.c).flip_sign(s.sgn_den);
    valid &= t.simd_ge(s.abs_den * rays.tnear) & t.simd_le(s.abs_den * rays.tfar);
    if valid.is_empty() {
        return None;
    }

    valid &= tri.facing(s.den, culling);
    if valid.is_empty() {
        return None;
    }

    Some(QuadHit::new(valid, u, v, t, s.abs_den, tri.ng, flags).map_primitives(0, 1))
}

/// [`test_triangle_k`], handing a surviving hit and the packet to `epilog`. Returns the
/// lanes the epilog accepted, or an empty mask when no ray hit.
#[inline(always)]
pub fn intersect_triangle_k<V, F>(
    active: Mask<V>,
    rays: &mut RayK<V>,
    tri: &TriangleM<V>,
    flags: Mask<V>,
    culling: Culling,
    epilog: F,
) -> Mask<V>
where
    V: SimdFloat,
    F: FnOnce(&mut RayK<V>, QuadHit<V>) -> Mask<V>,
{
    match test_triangle_k(active, rays, tri, flags, culling) {
        Some(hit) => epilog(rays, hit),
        None => Mask::none(),
    }
}
