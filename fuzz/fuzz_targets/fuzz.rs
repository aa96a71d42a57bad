#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nalgebra::{Point3, Vector3};
use ordered_float::NotNan;
use quadsect::config::Culling;
use quadsect::epilog::{AnyHit, ClosestHit, ClosestHitK};
use quadsect::hit::PrimIds;
use quadsect::quad::{PackedQuadIntersector1, Quad, QuadBatch, QuadIntersector1, QuadIntersectorK};
use quadsect::ray::{Ray, RayK};
use quadsect::simd::{f32x8, SimdFloat};

type Float = f32;
const LIMIT: Float = 1_000.0;
const IDS: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3<Float> {
        Point3::from_slice(&self.coordinates).map(|f| f.into_inner().clamp(-LIMIT, LIMIT))
    }
}

#[derive(Arbitrary)]
struct ArbitraryQuad {
    vertices: [ArbitraryPoint; 4],
}

impl Debug for ArbitraryQuad {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.quad(), f)
    }
}

impl ArbitraryQuad {
    fn quad(&self) -> Quad<Float> {
        let [a, b, c, d] = &self.vertices;
        Quad::new(a.point(), b.point(), c.point(), d.point())
    }
}

#[derive(Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl Debug for ArbitraryRay {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.ray(), f)
    }
}

impl ArbitraryRay {
    fn ray(&self) -> Ray<Float> {
        let mut direction = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.norm() < 1e-3 {
            direction = Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction)
    }
}

#[derive(Debug, Arbitrary)]
struct Workload {
    quads: Vec<ArbitraryQuad>,
    rays: Vec<ArbitraryRay>,
    backface: bool,
}

impl Workload {
    fn fuzz(self) {
        let quads: Vec<_> = self.quads.iter().take(f32x8::LANES).map(|q| q.quad()).collect();
        let rays: Vec<_> = self.rays.iter().take(f32x8::LANES).map(|r| r.ray()).collect();
        let batch = QuadBatch::<f32x8>::from_quads(&quads).unwrap();
        let ids = PrimIds::new(&IDS, &IDS);
        let culling = if self.backface {
            Culling::Backface
        } else {
            Culling::None
        };

        // Both kernels compute the same candidates and equally close ones resolve to the
        // first half, then the lowest primitive, on every path.
        let mut expected = Vec::with_capacity(rays.len());
        for ray in &rays {
            let mut generic_ray = *ray;
            let mut generic = ClosestHit::new();
            QuadIntersector1::new(culling).intersect(&mut generic_ray, &batch, &ids, &mut generic);

            let mut packed_ray = *ray;
            let mut packed = ClosestHit::new();
            PackedQuadIntersector1::new(culling).intersect(&mut packed_ray, &batch, &ids, &mut packed);

            assert_eq!(generic.hit.map(|h| h.prim_id), packed.hit.map(|h| h.prim_id));
            assert_close(generic_ray.tfar, packed_ray.tfar);

            let occluded = QuadIntersector1::new(culling).occluded(
                &mut ray.clone(),
                &batch,
                &ids,
                &mut AnyHit::new(),
            );
            assert_eq!(occluded, generic.hit.is_some());
            expected.push((generic_ray.tfar, generic.hit.map(|h| h.prim_id)));
        }

        if rays.is_empty() {
            return;
        }
        let (mut packet, active) = RayK::<f32x8>::from_rays(&rays).unwrap();
        let mut epilog = ClosestHitK::new();
        QuadIntersectorK::new(culling).intersect_k_batch(active, &mut packet, &batch, &ids, &mut epilog);
        for (k, (tfar, prim_id)) in expected.iter().enumerate() {
            assert_close(packet.tfar.extract(k), *tfar);
            assert_eq!(epilog.hit(k).map(|h| h.prim_id), *prim_id);
        }
    }
}

fn assert_close(a: Float, b: Float) {
    if a == b {
        return;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    assert!((a - b).abs() <= 1e-4 * scale, "{} != {}", a, b);
}
