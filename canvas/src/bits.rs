// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Bit fields, within packed pixel words and within rows of sub-byte pixels.

/// Specifies which bits a channel or pixel comes from.
///
/// Within a packed word, `begin` counts from the least significant bit. Within a byte slice of
/// sub-byte pixels, it counts from the most significant bit of the first byte instead, which is
/// how those pixels are ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FromBits {
    pub(crate) begin: usize,
    pub(crate) len: usize,
}

impl FromBits {
    pub(crate) const fn from_range(range: core::ops::Range<usize>) -> Self {
        FromBits {
            begin: range.start,
            len: range.end - range.start,
        }
    }

    pub(crate) const fn mask(self) -> u32 {
        ((-1i64 as u64) ^ u32::MAX as u64).rotate_left(self.len as u32) as u32
    }

    /// Extract the field from a word, as the lowest bits of the result.
    pub(crate) fn extract(self, word: u64) -> u32 {
        (word >> self.begin) as u32 & self.mask()
    }

    /// Replace the field within a word, keeping all other bits.
    pub(crate) fn insert(self, word: u64, bits: u32) -> u64 {
        let mask = u64::from(self.mask()) << self.begin;
        (word & !mask) | ((u64::from(bits) << self.begin) & mask)
    }

    /// Widen the value of this field to 8 bits, replicating high bits into the low ones.
    ///
    /// A field of 5 bits `abcde` becomes `abcdeabc`, so zero stays zero and the maximum becomes
    /// `0xff`. A one bit field becomes either `0x00` or `0xff`.
    pub(crate) fn widen_to_u8(self, bits: u32) -> u8 {
        debug_assert!((1..=8).contains(&self.len));
        let len = self.len as i32;
        let bits = bits & self.mask();

        let mut val = 0u32;
        let mut shift = 8 - len;
        while shift > -len {
            if shift >= 0 {
                val |= bits << shift;
            } else {
                val |= bits >> -shift;
            }
            shift -= len;
        }

        val as u8
    }

    /// Narrow an 8 bit value to this field by truncation.
    pub(crate) fn narrow_u8(self, val: u8) -> u32 {
        debug_assert!((1..=8).contains(&self.len));
        u32::from(val) >> (8 - self.len)
    }

    /// Extract bits counted from the most significant bit of the first byte.
    ///
    /// Returns a value as `u32` where the lowest bits are filled.
    #[inline]
    pub(crate) fn extract_msb_first(self, bytes: &[u8]) -> u32 {
        // Grab up to 8 bytes surrounding the bits, convert using u64 intermediate, then shift
        // downwards and mask off any remaining bits.
        let start_byte = self.begin / 8;
        let from_bytes = &bytes[start_byte.min(bytes.len())..];
        assert!(self.len <= 32);

        let shift = self.begin - start_byte * 8;
        let bitlen = self.len + shift;
        let copylen = bitlen.div_ceil(8);

        let mut be_bytes = [0; 8];
        let initlen = copylen.min(8).min(from_bytes.len());
        be_bytes[..initlen].copy_from_slice(&from_bytes[..initlen]);

        let val = u64::from_be_bytes(be_bytes) >> (64 - bitlen).min(63);
        val as u32 & self.mask()
    }

    /// Replace bits counted from the most significant bit of the first byte.
    ///
    /// All other bits of the touched bytes are preserved.
    #[inline]
    pub(crate) fn insert_msb_first(self, bytes: &mut [u8], bits: u32) {
        let start_byte = self.begin / 8;
        let bytestart = start_byte.min(bytes.len());
        let target = &mut bytes[bytestart..];

        let shift = self.begin - start_byte * 8;
        let bitlen = self.len + shift;
        let copylen = bitlen.div_ceil(8);

        let mut be_bytes = [0; 8];
        let initlen = copylen.min(8).min(target.len());
        be_bytes[..initlen].copy_from_slice(&target[..initlen]);

        let mask = u64::from(self.mask());
        let bitshift = (64 - bitlen).min(63);
        let newval = (u64::from_be_bytes(be_bytes) & !(mask << bitshift))
            | (u64::from(bits) & mask) << bitshift;

        be_bytes = newval.to_be_bytes();
        target[..initlen].copy_from_slice(&be_bytes[..initlen]);
    }
}

#[cfg(test)]
mod tests {
    use super::FromBits;

    #[test]
    fn bit_extraction() {
        fn extract_simple(r: core::ops::Range<usize>, val: u8) -> u32 {
            FromBits::from_range(r).extract_msb_first(&[val])
        }

        let val = 0b1000_1010u8;
        assert_eq!(extract_simple(0..1, val), 1);
        assert_eq!(extract_simple(1..2, val), 0);
        assert_eq!(extract_simple(2..3, val), 0);
        assert_eq!(extract_simple(6..7, val), 1);
        assert_eq!(extract_simple(0..7, val), val as u32 >> 1);
        assert_eq!(extract_simple(1..8, val), (val & 0x7f) as u32);

        assert_eq!(extract_simple(0..0, val), 0);
        assert_eq!(extract_simple(1..1, val), 0);

        let nibbles = [0x12u8, 0x34];
        assert_eq!(FromBits::from_range(4..8).extract_msb_first(&nibbles), 2);
        assert_eq!(FromBits::from_range(8..12).extract_msb_first(&nibbles), 3);
    }

    #[test]
    fn bit_insertion() {
        // Return the binary diff of insertion.
        fn insert_simple(r: core::ops::Range<usize>, bits: u32, val: &mut u8) -> u8 {
            let before = *val;
            FromBits::from_range(r).insert_msb_first(core::slice::from_mut(val), bits);
            before ^ *val
        }

        let mut val = 0b1000_1010u8;
        assert_eq!(insert_simple(0..1, 1, &mut val), 0);
        assert_eq!(insert_simple(1..2, 0, &mut val), 0);
        assert_eq!(insert_simple(2..3, 0, &mut val), 0);
        assert_eq!(insert_simple(6..7, 1, &mut val), 0);
        assert_eq!(insert_simple(0..7, val as u32 >> 1, &mut val), 0);
        assert_eq!(insert_simple(1..8, (val & 0x7f) as u32, &mut val), 0);

        assert_eq!(insert_simple(0..0, 0, &mut val), 0);
        assert_eq!(insert_simple(1..1, 0, &mut val), 0);

        assert_eq!(insert_simple(3..4, 1, &mut val), 0b0001_0000);
        assert_eq!(val, 0b1001_1010);
    }

    #[test]
    fn packed_fields() {
        let red = FromBits::from_range(11..16);
        let green = FromBits::from_range(5..11);

        assert_eq!(red.extract(0xf800), 0x1f);
        assert_eq!(green.extract(0xf800), 0);
        assert_eq!(green.insert(0xffff, 0), 0xf81f);

        assert_eq!(red.widen_to_u8(0x1f), 0xff);
        assert_eq!(red.widen_to_u8(0b10000), 0b1000_0100);
        assert_eq!(green.widen_to_u8(0b100000), 0b1000_0010);
        assert_eq!(FromBits::from_range(15..16).widen_to_u8(1), 0xff);

        assert_eq!(red.narrow_u8(0xff), 0x1f);
        assert_eq!(green.narrow_u8(0x80), 0x20);
    }
}
