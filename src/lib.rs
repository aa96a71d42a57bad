#![cfg_attr(feature = "bench", feature(test))]
//! Leaf-level ray/quad intersection kernels for BVH traversal.
//!
//! ## About
//!
//! This crate tests rays against batches of quads, the way a ray tracer does once its
//! acceleration structure has narrowed a ray down to a leaf. A quad is split along its
//! `v1`-`v3` diagonal into two triangles, which are tested with a
//! [Möller-Trumbore](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm)
//! variant that defers the division until a lane is known to hit. All lanes of a
//! batch are tested in lockstep on SIMD registers from the `wide` crate.
//!
//! Two axes are vectorized:
//!
//! - one ray against `M` quads, see [`QuadIntersector1`] and, with both triangles of every
//!   quad in one register of twice the width, [`PackedQuadIntersector1`];
//! - `K` rays against one quad, see [`QuadIntersectorK`].
//!
//! The kernels never decide what a hit means. They hand candidates to an epilog (see
//! [`epilog`]) which commits the closest one, stops at the first one, or runs user code.
//!
//! ## Example
//!
//! ```
//! use quadsect::config::IntersectorConfig;
//! use quadsect::epilog::ClosestHit;
//! use quadsect::hit::PrimIds;
//! use quadsect::quad::{Dispatch, Quad, QuadBatch};
//! use quadsect::ray::Ray;
//! use quadsect::simd::f32x4;
//! use nalgebra::{Point3, Vector3};
//!
//! let floor = Quad::new(
//!     Point3::new(-1.0, -1.0, 0.0),
//!     Point3::new(1.0, -1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(-1.0, 1.0, 0.0),
//! );
//! let lid = Quad::new(
//!     Point3::new(-1.0, -1.0, 2.0),
//!     Point3::new(1.0, -1.0, 2.0),
//!     Point3::new(1.0, 1.0, 2.0),
//!     Point3::new(-1.0, 1.0, 2.0),
//! );
//! let batch = QuadBatch::<f32x4>::from_quads(&[lid, floor]).unwrap();
//! let ids = PrimIds::new(&[0, 0], &[10, 11]);
//!
//! let mut ray = Ray::new(Point3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0));
//! let mut closest = ClosestHit::new();
//! Dispatch::new(IntersectorConfig::default()).intersect(&mut ray, &batch, &ids, &mut closest);
//!
//! let hit = closest.hit.unwrap();
//! assert_eq!(hit.prim_id, 11);
//! assert_eq!(hit.t, 1.0);
//! assert_eq!((hit.u, hit.v), (0.5, 0.5));
//! ```
//!
//! ## Features
//!
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   rays, quads, hit records and the configuration
//! - `bench` (default **disabled**) - nightly benchmarks of the kernels
//!
//! [`QuadIntersector1`]: quad/struct.QuadIntersector1.html
//! [`PackedQuadIntersector1`]: quad/struct.PackedQuadIntersector1.html
//! [`QuadIntersectorK`]: quad/struct.QuadIntersectorK.html

#[cfg(all(feature = "bench", test))]
extern crate test;

pub mod config;
pub mod epilog;
pub mod error;
pub mod hit;
pub mod quad;
pub mod ray;
pub mod simd;
pub mod triangle;

pub use crate::error::Error;

#[cfg(test)]
mod testbase;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
