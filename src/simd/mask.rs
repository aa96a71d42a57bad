use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use num_traits::Zero;

use super::{Real, SimdFloat};

/// Per-lane boolean stored in a float register, one bit pattern per lane.
#[derive(Clone, Copy, Debug)]
pub struct Mask<V>(V);

impl<V: SimdFloat> Mask<V> {
    /// Wraps a register whose lanes are all-ones or all-zeros bit patterns.
    #[inline(always)]
    pub(crate) fn from_bits(bits: V) -> Self {
        Mask(bits)
    }

    /// Raw bit pattern.
    #[inline(always)]
    pub fn bits(self) -> V {
        self.0
    }

    #[inline(always)]
    pub fn all() -> Self {
        Mask(V::splat(V::Element::all_bits()))
    }

    #[inline(always)]
    pub fn none() -> Self {
        Mask(V::splat(V::Element::zero()))
    }

    /// Builds a mask from the low [`SimdFloat::LANES`] bits of `bits`.
    pub fn from_bitmask(bits: u32) -> Self {
        let on = V::Element::all_bits();
        let off = V::Element::zero();
        Mask(V::from_fn(|i| if (bits >> i) & 1 == 1 { on } else { off }))
    }

    /// Lanes `start..end`.
    pub fn range(start: usize, end: usize) -> Self {
        let on = V::Element::all_bits();
        let off = V::Element::zero();
        Mask(V::from_fn(|i| if (start..end).contains(&i) { on } else { off }))
    }

    /// Only lane `lane`.
    #[inline]
    pub fn lane(lane: usize) -> Self {
        Self::range(lane, lane + 1)
    }

    /// Packs the mask into an integer, bit `i` for lane `i`.
    #[inline(always)]
    pub fn to_bitmask(self) -> u32 {
        self.0.move_mask()
    }

    #[inline(always)]
    pub fn any(self) -> bool {
        self.to_bitmask() != 0
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.to_bitmask() == 0
    }

    #[inline(always)]
    pub fn is_full(self) -> bool {
        self.to_bitmask().count_ones() as usize == V::LANES
    }

    #[inline(always)]
    pub fn test(self, lane: usize) -> bool {
        (self.to_bitmask() >> lane) & 1 == 1
    }

    #[inline(always)]
    pub fn count(self) -> usize {
        self.to_bitmask().count_ones() as usize
    }

    /// Lanes set in `self` but not in `other`.
    #[inline(always)]
    pub fn and_not(self, other: Self) -> Self {
        self & !other
    }

    /// Iterates over the indices of the set lanes in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        let mut bits = self.to_bitmask();
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let lane = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(lane)
        })
    }
}

impl<V: SimdFloat> BitAnd for Mask<V> {
    type Output = Self;

    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Mask(self.0.and_bits(rhs.0))
    }
}

impl<V: SimdFloat> BitOr for Mask<V> {
    type Output = Self;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Mask(self.0.or_bits(rhs.0))
    }
}

impl<V: SimdFloat> BitAndAssign for Mask<V> {
    #[inline(always)]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl<V: SimdFloat> BitOrAssign for Mask<V> {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl<V: SimdFloat> Not for Mask<V> {
    type Output = Self;

    #[inline(always)]
    fn not(self) -> Self {
        Mask(self.0.xor_bits(Self::all().0))
    }
}

impl<V: SimdFloat> PartialEq for Mask<V> {
    fn eq(&self, other: &Self) -> bool {
        self.to_bitmask() == other.to_bitmask()
    }
}
