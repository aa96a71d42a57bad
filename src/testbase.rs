//! Common utilities shared by unit tests.
#![cfg(test)]

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hit::PrimIds;
use crate::quad::Quad;
use crate::ray::Ray;
use crate::simd::Real;

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10 to 10.
/// Small enough that f32 round-off stays far below the tolerances of the tests.
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (-10.0_f32..10.0_f32, -10.0_f32..10.0_f32, -10.0_f32..10.0_f32)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3<f32> {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

const GEOM_IDS: [u32; 16] = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
const PRIM_IDS: [u32; 16] = [
    100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115,
];

/// Identifiers for up to 16 primitives, all distinct.
pub const IDS: PrimIds<'static> = PrimIds {
    geom_ids: &GEOM_IDS,
    prim_ids: &PRIM_IDS,
    inst_map: None,
};

/// The square `[-1, 1]²` at `z = 0`, counter-clockwise seen from `+z`.
pub fn unit_quad() -> Quad<f32> {
    Quad::new(
        Point3::new(-1.0, -1.0, 0.0),
        Point3::new(1.0, -1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(-1.0, 1.0, 0.0),
    )
}

/// Textbook Möller-Trumbore with a division up front, as `(t, u, v)`. Both faces hit.
pub fn reference_hit<T: Real>(
    ray: &Ray<T>,
    a: &Point3<T>,
    b: &Point3<T>,
    c: &Point3<T>,
) -> Option<(T, T, T)> {
    let a_to_b = *b - *a;
    let a_to_c = *c - *a;
    let u_vec = ray.direction.cross(&a_to_c);
    let det = a_to_b.dot(&u_vec);
    if det.abs() < T::epsilon() {
        return None;
    }
    let inv_det = T::one() / det;
    let a_to_origin = ray.origin - *a;
    let u = a_to_origin.dot(&u_vec) * inv_det;
    if !(T::zero()..=T::one()).contains(&u) {
        return None;
    }
    let v_vec = a_to_origin.cross(&a_to_b);
    let v = ray.direction.dot(&v_vec) * inv_det;
    if v < T::zero() || u + v > T::one() {
        return None;
    }
    let dist = a_to_c.dot(&v_vec) * inv_det;
    (ray.tnear..=ray.tfar).contains(&dist).then_some((dist, u, v))
}

fn random_unit(rng: &mut StdRng) -> Vector3<f32> {
    loop {
        let v: Vector3<f32> = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let norm = v.norm();
        if norm > 0.1 && norm <= 1.0 {
            return v / norm;
        }
    }
}

/// `n` convex quads with random position, size, orientation and facing.
///
/// Each quad is inscribed in a circle, one vertex per quarter of the circle, which keeps
/// it convex and its interior angles away from 0 and 180 degrees.
pub fn random_quads(n: usize, seed: u64) -> Vec<Quad<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let centre = Point3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            let normal = random_unit(&mut rng);
            let helper = if normal.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            let tangent = normal.cross(&helper).normalize();
            let bitangent = normal.cross(&tangent);
            let radius: f32 = rng.random_range(0.5..3.0);
            let mut corner = |quarter: f32| {
                let angle = (quarter + rng.random_range(0.15..0.85)) * std::f32::consts::FRAC_PI_2;
                centre + (tangent * angle.cos() + bitangent * angle.sin()) * radius
            };
            Quad::new(corner(0.0), corner(1.0), corner(2.0), corner(3.0))
        })
        .collect()
}

/// `count` rays, three out of four aimed at the interior of one of `quads` away from its
/// diagonal, the rest aimed anywhere.
pub fn random_rays_into(quads: &[Quad<f32>], count: usize, seed: u64) -> Vec<Ray<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let quad = &quads[rng.random_range(0..quads.len())];
            let target = if i % 4 == 3 {
                quad.v0 + random_unit(&mut rng) * rng.random_range(1.0..20.0)
            } else {
                let (u, v) = loop {
                    let u: f32 = rng.random_range(0.05..0.95);
                    let v: f32 = rng.random_range(0.05..0.95);
                    if (u + v - 1.0).abs() > 0.05 {
                        break (u, v);
                    }
                };
                quad.point_at(u, v)
            };
            let origin = target + random_unit(&mut rng) * rng.random_range(2.0..20.0);
            Ray::new(origin, target - origin)
        })
        .collect()
}

#[test]
fn test_reference_hit_unit_quad() {
    let quad = unit_quad();
    let ray = Ray::new(Point3::new(-0.5, -0.5, -1.0), Vector3::new(0.0, 0.0, 1.0));
    let (t, u, v) = reference_hit(&ray, &quad.v0, &quad.v1, &quad.v3).unwrap();
    assert!((t - 1.0).abs() < 1e-6);
    assert!((u - 0.25).abs() < 1e-6);
    assert!((v - 0.25).abs() < 1e-6);
    assert!(reference_hit(&ray, &quad.v2, &quad.v3, &quad.v1).is_none());
}

#[test]
fn test_random_quads_are_planar_and_seeded() {
    let quads = random_quads(8, 5);
    assert_eq!(quads, random_quads(8, 5));
    for quad in &quads {
        let normal = quad.normal().normalize();
        let offset = (quad.v2 - quad.v0).dot(&normal);
        assert!(offset.abs() < 1e-4, "{:?}", quad);
        assert!(quad.normal().norm() > 0.0);
    }
}
