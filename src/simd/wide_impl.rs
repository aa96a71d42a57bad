//! [`SimdFloat`] for the register types of the `wide` crate.

use wide::*;

use super::{Mask, Pair, SimdFloat, Widen};

macro_rules! impl_simd_float {
    ($register:ident, $element:ty, $lanes:literal) => {
        impl SimdFloat for $register {
            type Element = $element;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(x: $element) -> Self {
                $register::splat(x)
            }

            #[inline(always)]
            fn from_fn(f: impl FnMut(usize) -> $element) -> Self {
                $register::from(std::array::from_fn::<$element, $lanes, _>(f))
            }

            #[inline(always)]
            fn extract(self, lane: usize) -> $element {
                self.to_array()[lane]
            }

            #[inline(always)]
            fn abs(self) -> Self {
                $register::abs(self)
            }

            #[inline(always)]
            fn sign_bits(self) -> Self {
                self & $register::splat(-0.0)
            }

            #[inline(always)]
            fn xor_bits(self, other: Self) -> Self {
                self ^ other
            }

            #[inline(always)]
            fn and_bits(self, other: Self) -> Self {
                self & other
            }

            #[inline(always)]
            fn or_bits(self, other: Self) -> Self {
                self | other
            }

            #[inline(always)]
            fn simd_eq(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_eq(other))
            }

            #[inline(always)]
            fn simd_ne(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_ne(other))
            }

            #[inline(always)]
            fn simd_lt(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_lt(other))
            }

            #[inline(always)]
            fn simd_le(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_le(other))
            }

            #[inline(always)]
            fn simd_gt(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_gt(other))
            }

            #[inline(always)]
            fn simd_ge(self, other: Self) -> Mask<Self> {
                Mask::from_bits(self.cmp_ge(other))
            }

            #[inline(always)]
            fn select(mask: Mask<Self>, t: Self, f: Self) -> Self {
                mask.bits().blend(t, f)
            }

            #[inline(always)]
            fn move_mask(self) -> u32 {
                $register::move_mask(self) as u32
            }
        }
    };
}

impl_simd_float!(f32x4, f32, 4);
impl_simd_float!(f32x8, f32, 8);
impl_simd_float!(f64x2, f64, 2);
impl_simd_float!(f64x4, f64, 4);

impl Widen for f32x4 {
    type Wide = f32x8;

    #[inline(always)]
    fn concat(lo: Self, hi: Self) -> f32x8 {
        let (lo, hi) = (lo.to_array(), hi.to_array());
        f32x8::from([lo[0], lo[1], lo[2], lo[3], hi[0], hi[1], hi[2], hi[3]])
    }
}

impl Widen for f64x2 {
    type Wide = f64x4;

    #[inline(always)]
    fn concat(lo: Self, hi: Self) -> f64x4 {
        let (lo, hi) = (lo.to_array(), hi.to_array());
        f64x4::from([lo[0], lo[1], hi[0], hi[1]])
    }
}

impl Widen for f32x8 {
    type Wide = Pair<f32x8>;

    #[inline(always)]
    fn concat(lo: Self, hi: Self) -> Pair<f32x8> {
        Pair::new(lo, hi)
    }
}

impl Widen for f64x4 {
    type Wide = Pair<f64x4>;

    #[inline(always)]
    fn concat(lo: Self, hi: Self) -> Pair<f64x4> {
        Pair::new(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use crate::simd::{f32x4, f32x8, f64x2, Mask, SimdFloat, Widen};

    #[test]
    fn test_sign_bits_flip_sign() {
        let den = f32x4::from([-2.0, 3.0, -0.5, 0.0]);
        let flipped = f32x4::from([1.0, 1.0, 1.0, 1.0]).flip_sign(den.sign_bits());
        assert_eq!(flipped.to_array(), [-1.0, 1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_compare_and_select() {
        let a = f64x2::from([1.0, 5.0]);
        let b = f64x2::from([2.0, 2.0]);
        let lt = a.simd_lt(b);
        assert_eq!(lt.to_bitmask(), 0b01);
        assert_eq!(SimdFloat::select(lt, a, b).to_array(), [1.0, 2.0]);
        assert_eq!(a.simd_ne(a).to_bitmask(), 0);
        assert_eq!(a.simd_ge(b), Mask::lane(1));
    }

    #[test]
    fn test_concat_places_halves() {
        let lo = f32x4::from([0.0, 1.0, 2.0, 3.0]);
        let hi = f32x4::from([4.0, 5.0, 6.0, 7.0]);
        let wide: f32x8 = f32x4::concat(lo, hi);
        for lane in 0..8 {
            assert_float_eq!(wide.extract(lane), lane as f32, abs <= 0.0);
        }
    }

    #[test]
    fn test_from_fn_extract() {
        let v = f32x8::from_fn(|i| i as f32 * 0.5);
        assert_float_eq!(v.extract(7), 3.5, abs <= 0.0);
        assert_float_eq!(v.abs().extract(2), 1.0, abs <= 0.0);
    }
}
