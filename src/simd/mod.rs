//! Lane abstraction used by the intersection kernels.
//!
//! The kernels are written once against [`SimdFloat`] and monomorphized for every
//! supported register width. The `wide` crate provides the 2-, 4- and 8-lane registers,
//! [`Pair`] glues two of them together for the 8-lane `f64` and 16-lane `f32` cases.

mod mask;
mod pair;
mod vec3;
mod wide_impl;

pub use self::mask::Mask;
pub use self::pair::{f32x16, f64x8, Pair};
pub use self::vec3::Vec3;
pub use wide::{f32x4, f32x8, f64x2, f64x4};

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::{ClosedAddAssign, ClosedMulAssign, ClosedSubAssign, Scalar};
use num_traits::Float;

/// Upper bound on [`SimdFloat::LANES`] for every register type of this crate.
pub const MAX_LANES: usize = 16;

/// Scalar element type stored in the lanes of a [`SimdFloat`].
pub trait Real:
    Scalar
    + Copy
    + Float
    + Default
    + ClosedAddAssign
    + ClosedSubAssign
    + ClosedMulAssign
    + Send
    + Sync
{
    /// Negative zero, i.e. only the sign bit set.
    const SIGN_BIT: Self;

    /// A value with every bit set. Used as the "true" pattern of a lane mask.
    fn all_bits() -> Self;
}

impl Real for f32 {
    const SIGN_BIT: f32 = -0.0;

    #[inline(always)]
    fn all_bits() -> f32 {
        f32::from_bits(u32::MAX)
    }
}

impl Real for f64 {
    const SIGN_BIT: f64 = -0.0;

    #[inline(always)]
    fn all_bits() -> f64 {
        f64::from_bits(u64::MAX)
    }
}

/// A register of [`SimdFloat::LANES`] floating point lanes.
///
/// Masks are represented the way `wide` represents them: a lane is "true" when all of its
/// bits are set and "false" when all of them are clear. [`Mask`] wraps that convention.
pub trait SimdFloat:
    Copy
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// The scalar type of each lane.
    type Element: Real;

    /// Number of lanes.
    const LANES: usize;

    /// Broadcasts `x` to every lane.
    fn splat(x: Self::Element) -> Self;

    /// Builds a register by evaluating `f` for every lane index.
    fn from_fn(f: impl FnMut(usize) -> Self::Element) -> Self;

    /// Reads lane `lane`.
    fn extract(self, lane: usize) -> Self::Element;

    fn abs(self) -> Self;

    /// Keeps only the IEEE sign bit of every lane.
    fn sign_bits(self) -> Self;

    fn xor_bits(self, other: Self) -> Self;

    fn and_bits(self, other: Self) -> Self;

    fn or_bits(self, other: Self) -> Self;

    fn simd_eq(self, other: Self) -> Mask<Self>;

    fn simd_ne(self, other: Self) -> Mask<Self>;

    fn simd_lt(self, other: Self) -> Mask<Self>;

    fn simd_le(self, other: Self) -> Mask<Self>;

    fn simd_gt(self, other: Self) -> Mask<Self>;

    fn simd_ge(self, other: Self) -> Mask<Self>;

    /// Lane-wise `if mask { t } else { f }`.
    fn select(mask: Mask<Self>, t: Self, f: Self) -> Self;

    /// Packs the sign bit of every lane into the low [`SimdFloat::LANES`] bits.
    fn move_mask(self) -> u32;

    /// Flips the sign of every lane whose sign bit is set in `sign`.
    #[inline(always)]
    fn flip_sign(self, sign: Self) -> Self {
        self.xor_bits(sign)
    }

    #[inline(always)]
    fn zero() -> Self {
        Self::splat(<Self::Element as num_traits::Zero>::zero())
    }

    #[inline(always)]
    fn one() -> Self {
        Self::splat(<Self::Element as num_traits::One>::one())
    }
}

/// A register that has a twice-as-wide sibling. Used to evaluate both triangles of a quad
/// batch in a single pass.
pub trait Widen: SimdFloat {
    /// The register holding `2 * LANES` lanes.
    type Wide: SimdFloat<Element = Self::Element>;

    /// Places `lo` in the lower and `hi` in the upper half of the wide register.
    fn concat(lo: Self, hi: Self) -> Self::Wide;
}
