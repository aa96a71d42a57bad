//! Runtime selection between the generic and the packed single-ray kernels.

use std::sync::OnceLock;

use tracing::debug;

use crate::config::{Culling, IntersectorConfig, PathPreference};
use crate::epilog::Epilog1;
use crate::hit::PrimIds;
use crate::ray::Ray;
use crate::simd::Widen;

use super::{PackedQuadIntersector1, QuadBatch, QuadIntersector1};

/// Vector capability of the running CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    /// AVX-512F, 512-bit registers.
    Avx512,
    /// AVX2 with FMA, 256-bit registers.
    Avx2,
    /// AVX, 256-bit float registers.
    Avx,
    /// NEON, 128-bit registers.
    Neon,
    /// SSE2 or nothing better, 128-bit registers.
    Baseline,
}

impl SimdLevel {
    /// Width of one float register in bits.
    pub fn register_bits(self) -> usize {
        match self {
            SimdLevel::Avx512 => 512,
            SimdLevel::Avx2 | SimdLevel::Avx => 256,
            SimdLevel::Neon | SimdLevel::Baseline => 128,
        }
    }
}

/// `wide` has no 512-bit registers; wider types are split into 256-bit halves.
const WIDE_MAX_BITS: usize = 256;

static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

fn detect_simd_level() -> SimdLevel {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx512f") {
            return SimdLevel::Avx512;
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx2;
        }
        if is_x86_feature_detected!("avx") {
            return SimdLevel::Avx;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        return SimdLevel::Neon;
    }

    #[allow(unreachable_code)]
    SimdLevel::Baseline
}

/// The level the kernels were compiled for. `wide` picks its register implementation
/// from the enabled target features, so this is what the kernels actually run on.
pub const fn compiled_simd_level() -> SimdLevel {
    if cfg!(target_feature = "avx512f") {
        SimdLevel::Avx512
    } else if cfg!(all(target_feature = "avx2", target_feature = "fma")) {
        SimdLevel::Avx2
    } else if cfg!(target_feature = "avx") {
        SimdLevel::Avx
    } else if cfg!(all(target_arch = "aarch64", target_feature = "neon")) {
        SimdLevel::Neon
    } else {
        SimdLevel::Baseline
    }
}

/// The capability level of this CPU, detected on first use. It may exceed
/// [`compiled_simd_level`], in which case building with `-C target-cpu=native` gives the
/// kernels wider registers.
#[inline]
pub fn simd_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(|| {
        let level = detect_simd_level();
        debug!(?level, bits = level.register_bits(), "detected vector capability");
        level
    })
}

/// A kernel choice made by [`Dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    Generic,
    Packed,
}

/// Runs a quad batch of width `V` through the generic or the packed kernel, as
/// configured.
///
/// [`PathPreference::Auto`] picks the packed kernel when one register of the compiled
/// level holds all `2 * V::LANES` lanes of `V::Wide`; otherwise the wide register would be
/// split into several native ones and the generic kernel is at least as fast.
///
/// The epilog sees `V` hits from the generic and `V::Wide` hits from the packed kernel,
/// so it has to accept both.
///
/// # Examples
/// ```
/// use quadsect::config::{Culling, IntersectorConfig, PathPreference};
/// use quadsect::epilog::ClosestHit;
/// use quadsect::hit::PrimIds;
/// use quadsect::quad::{Dispatch, Path, Quad, QuadBatch};
/// use quadsect::ray::Ray;
/// use quadsect::simd::f32x4;
/// use nalgebra::{Point3, Vector3};
///
/// let config = IntersectorConfig::new(Culling::None, PathPreference::Packed);
/// let dispatch = Dispatch::<f32x4>::new(config);
/// assert_eq!(dispatch.path(), Path::Packed);
///
/// let quad = Quad::new(
///     Point3::new(-1.0f32, -1.0, 0.0),
///     Point3::new(1.0, -1.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(-1.0, 1.0, 0.0),
/// );
/// let batch = QuadBatch::from_quads(&[quad]).unwrap();
/// let mut ray = Ray::new(Point3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0));
/// let mut closest = ClosestHit::new();
/// dispatch.intersect(&mut ray, &batch, &PrimIds::new(&[0], &[0]), &mut closest);
/// assert_eq!(closest.hit.unwrap().t, 1.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Dispatch<V: Widen> {
    path: Path,
    generic: QuadIntersector1<V>,
    packed: PackedQuadIntersector1<V>,
}

impl<V: Widen> Dispatch<V> {
    pub fn new(config: IntersectorConfig) -> Self {
        let compiled = compiled_simd_level();
        let detected = simd_level();
        if detected.register_bits() > compiled.register_bits() {
            debug!(?compiled, ?detected, "kernels built for narrower registers than the CPU has");
        }
        Self::with_level(config, compiled)
    }

    /// Like [`Dispatch::new`], resolving [`PathPreference::Auto`] for `level` instead of
    /// the compiled one.
    pub fn with_level(config: IntersectorConfig, level: SimdLevel) -> Self {
        let path = Self::resolve(config.path, level);
        debug!(
            lanes = V::LANES,
            element_bits = std::mem::size_of::<V::Element>() * 8,
            preference = %config.path,
            culling = %config.culling,
            ?path,
            "quad kernel selected"
        );
        Dispatch {
            path,
            generic: QuadIntersector1::new(config.culling),
            packed: PackedQuadIntersector1::new(config.culling),
        }
    }

    fn resolve(preference: PathPreference, level: SimdLevel) -> Path {
        match preference {
            PathPreference::Generic => Path::Generic,
            PathPreference::Packed => Path::Packed,
            PathPreference::Auto => {
                let wide_bits = 2 * V::LANES * std::mem::size_of::<V::Element>() * 8;
                if wide_bits <= level.register_bits().min(WIDE_MAX_BITS) {
                    Path::Packed
                } else {
                    Path::Generic
                }
            }
        }
    }

    pub fn path(&self) -> Path {
        self.path
    }

    pub fn culling(&self) -> Culling {
        self.generic.culling()
    }

    pub fn intersect<E>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) where
        E: Epilog1<V> + Epilog1<V::Wide>,
    {
        match self.path {
            Path::Generic => self.generic.intersect(ray, batch, ids, epilog),
            Path::Packed => self.packed.intersect(ray, batch, ids, epilog),
        }
    }

    pub fn occluded<E>(
        &self,
        ray: &mut Ray<V::Element>,
        batch: &QuadBatch<V>,
        ids: &PrimIds<'_>,
        epilog: &mut E,
    ) -> bool
    where
        E: Epilog1<V> + Epilog1<V::Wide>,
    {
        match self.path {
            Path::Generic => self.generic.occluded(ray, batch, ids, epilog),
            Path::Packed => self.packed.occluded(ray, batch, ids, epilog),
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Point3, Vector3};

    use crate::config::{Culling, IntersectorConfig, PathPreference};
    use crate::epilog::{AnyHit, ClosestHit};
    use crate::quad::{compiled_simd_level, simd_level, Dispatch, Path, QuadBatch, SimdLevel};
    use crate::ray::Ray;
    use crate::simd::{f32x4, f32x8, f64x2, f64x4};
    use crate::testbase::{unit_quad, IDS};

    fn auto() -> IntersectorConfig {
        IntersectorConfig::new(Culling::None, PathPreference::Auto)
    }

    #[test]
    fn test_auto_fits_wide_register() {
        assert_eq!(Dispatch::<f32x4>::with_level(auto(), SimdLevel::Avx2).path(), Path::Packed);
        assert_eq!(Dispatch::<f32x4>::with_level(auto(), SimdLevel::Neon).path(), Path::Generic);
        assert_eq!(Dispatch::<f32x8>::with_level(auto(), SimdLevel::Avx2).path(), Path::Generic);
        assert_eq!(Dispatch::<f32x4>::with_level(auto(), SimdLevel::Avx512).path(), Path::Packed);
        // A 16-lane f32 register is two 256-bit halves even on AVX-512.
        assert_eq!(Dispatch::<f32x8>::with_level(auto(), SimdLevel::Avx512).path(), Path::Generic);
        assert_eq!(Dispatch::<f64x2>::with_level(auto(), SimdLevel::Avx).path(), Path::Packed);
        assert_eq!(Dispatch::<f64x4>::with_level(auto(), SimdLevel::Avx).path(), Path::Generic);
        assert_eq!(
            Dispatch::<f64x2>::with_level(auto(), SimdLevel::Baseline).path(),
            Path::Generic
        );
    }

    #[test]
    fn test_compiled_level_matches_target_features() {
        let level = compiled_simd_level();
        assert_eq!(level == SimdLevel::Avx512, cfg!(target_feature = "avx512f"));
        if cfg!(not(target_feature = "avx")) {
            assert_eq!(level.register_bits(), 128);
        }
        // Compiled features are only enabled for CPUs that have them.
        assert!(simd_level().register_bits() >= level.register_bits());
    }

    #[test]
    fn test_new_resolves_auto_for_compiled_level() {
        let expected = Dispatch::<f32x4>::with_level(auto(), compiled_simd_level()).path();
        assert_eq!(Dispatch::<f32x4>::new(auto()).path(), expected);
    }

    #[test]
    fn test_forced_paths_ignore_level() {
        let generic = IntersectorConfig::new(Culling::Backface, PathPreference::Generic);
        let packed = IntersectorConfig::new(Culling::Backface, PathPreference::Packed);
        let d = Dispatch::<f32x8>::with_level(generic, SimdLevel::Avx512);
        assert_eq!(d.path(), Path::Generic);
        assert_eq!(d.culling(), Culling::Backface);
        assert_eq!(Dispatch::<f32x8>::with_level(packed, SimdLevel::Baseline).path(), Path::Packed);
    }

    #[test]
    fn test_paths_give_same_hit() {
        let batch = QuadBatch::<f32x4>::from_quads(&[unit_quad()]).unwrap();
        let ray = Ray::new(Point3::new(0.25, 0.5, -2.0), Vector3::new(0.0, 0.0, 2.0));
        let mut hits = Vec::new();
        for path in [PathPreference::Generic, PathPreference::Packed, PathPreference::Auto] {
            let dispatch = Dispatch::<f32x4>::new(IntersectorConfig::new(Culling::None, path));
            let mut closest = ClosestHit::new();
            dispatch.intersect(&mut ray.clone(), &batch, &IDS, &mut closest);
            hits.push(closest.hit.unwrap());

            let mut any = AnyHit::new();
            let mut shadow = ray;
            assert!(dispatch.occluded(&mut shadow, &batch, &IDS, &mut any));
            assert!(shadow.is_occluded());
        }
        assert_eq!(hits[0], hits[1]);
        assert_eq!(hits[0], hits[2]);
        assert_eq!(hits[0].t, 1.0);
    }
}
