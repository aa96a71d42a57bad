//! Two registers driven in lockstep, for widths the `wide` crate has no single type for.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::{Mask, SimdFloat};

/// `lo` holds lanes `0..N`, `hi` holds lanes `N..2N`.
#[derive(Clone, Copy, Debug)]
pub struct Pair<V> {
    lo: V,
    hi: V,
}

/// Sixteen `f32` lanes, as on AVX-512 hardware.
#[allow(non_camel_case_types)]
pub type f32x16 = Pair<wide::f32x8>;

/// Eight `f64` lanes, as on AVX-512 hardware.
#[allow(non_camel_case_types)]
pub type f64x8 = Pair<wide::f64x4>;

impl<V: SimdFloat> Pair<V> {
    #[inline(always)]
    pub fn new(lo: V, hi: V) -> Self {
        Pair { lo, hi }
    }

    #[inline(always)]
    pub fn halves(self) -> (V, V) {
        (self.lo, self.hi)
    }

    #[inline(always)]
    fn zip(self, other: Self, f: impl Fn(V, V) -> V) -> Self {
        Pair::new(f(self.lo, other.lo), f(self.hi, other.hi))
    }

    #[inline(always)]
    fn zip_mask(self, other: Self, f: impl Fn(V, V) -> Mask<V>) -> Mask<Self> {
        Mask::from_bits(Pair::new(
            f(self.lo, other.lo).bits(),
            f(self.hi, other.hi).bits(),
        ))
    }
}

macro_rules! impl_pair_op {
    ($op:ident, $method:ident) => {
        impl<V: SimdFloat> $op for Pair<V> {
            type Output = Self;

            #[inline(always)]
            fn $method(self, rhs: Self) -> Self {
                self.zip(rhs, |a, b| a.$method(b))
            }
        }
    };
}

impl_pair_op!(Add, add);
impl_pair_op!(Sub, sub);
impl_pair_op!(Mul, mul);
impl_pair_op!(Div, div);

impl<V: SimdFloat> Neg for Pair<V> {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        Pair::new(-self.lo, -self.hi)
    }
}

impl<V: SimdFloat> SimdFloat for Pair<V> {
    type Element = V::Element;
    const LANES: usize = 2 * V::LANES;

    #[inline(always)]
    fn splat(x: V::Element) -> Self {
        Pair::new(V::splat(x), V::splat(x))
    }

    #[inline(always)]
    fn from_fn(mut f: impl FnMut(usize) -> V::Element) -> Self {
        let lo = V::from_fn(&mut f);
        let hi = V::from_fn(|i| f(i + V::LANES));
        Pair::new(lo, hi)
    }

    #[inline(always)]
    fn extract(self, lane: usize) -> V::Element {
        if lane < V::LANES {
            self.lo.extract(lane)
        } else {
            self.hi.extract(lane - V::LANES)
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        Pair::new(self.lo.abs(), self.hi.abs())
    }

    #[inline(always)]
    fn sign_bits(self) -> Self {
        Pair::new(self.lo.sign_bits(), self.hi.sign_bits())
    }

    #[inline(always)]
    fn xor_bits(self, other: Self) -> Self {
        self.zip(other, V::xor_bits)
    }

    #[inline(always)]
    fn and_bits(self, other: Self) -> Self {
        self.zip(other, V::and_bits)
    }

    #[inline(always)]
    fn or_bits(self, other: Self) -> Self {
        self.zip(other, V::or_bits)
    }

    #[inline(always)]
    fn simd_eq(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_eq)
    }

    #[inline(always)]
    fn simd_ne(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_ne)
    }

    #[inline(always)]
    fn simd_lt(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_lt)
    }

    #[inline(always)]
    fn simd_le(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_le)
    }

    #[inline(always)]
    fn simd_gt(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_gt)
    }

    #[inline(always)]
    fn simd_ge(self, other: Self) -> Mask<Self> {
        self.zip_mask(other, V::simd_ge)
    }

    #[inline(always)]
    fn select(mask: Mask<Self>, t: Self, f: Self) -> Self {
        let (lo, hi) = mask.bits().halves();
        Pair::new(
            V::select(Mask::from_bits(lo), t.lo, f.lo),
            V::select(Mask::from_bits(hi), t.hi, f.hi),
        )
    }

    #[inline(always)]
    fn move_mask(self) -> u32 {
        self.lo.move_mask() | (self.hi.move_mask() << V::LANES)
    }
}
