// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Concrete pixel formats and the parameters of their encodings.
use crate::bits::FromBits;

/// A concrete encoding of pixels in memory.
///
/// All multi-byte pixels and channels are stored little-endian. The channel order of direct
/// formats in memory is blue, green, red and then alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PixelFormat {
    /// Palette indices of one bit, the first pixel in the most significant bit.
    Indexed1,
    /// Palette indices of four bits, the first pixel in the high nibble.
    Indexed4,
    /// Palette indices of one byte.
    Indexed8,
    /// 16-bit luminance. Lossy, colors are reduced to their luma.
    Gray16,
    /// `0RRRRRGG GGGBBBBB`, lossy.
    Rgb555,
    /// `RRRRRGGG GGGBBBBB`, lossy.
    Rgb565,
    /// `ARRRRRGG GGGBBBBB`, lossy, with a single bit of alpha.
    Argb1555,
    /// Blue, green, red bytes.
    Rgb24,
    /// Blue, green, red and an ignored byte, written as `0xff`.
    Rgb32,
    /// Blue, green, red, alpha bytes with straight alpha.
    Argb32,
    /// Blue, green, red, alpha bytes with the colors multiplied by alpha.
    PArgb32,
    /// Blue, green, red as 16-bit channels.
    Rgb48,
    /// Blue, green, red, alpha as 16-bit channels with straight alpha.
    Argb64,
    /// Blue, green, red, alpha as 16-bit channels with the colors multiplied by alpha.
    PArgb64,
}

/// How the alpha channel of a direct format is to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum AlphaMode {
    /// There is no alpha, colors read as opaque.
    Opaque,
    Straight,
    Premultiplied,
}

/// The parameterization of the codec handling a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Encoding {
    /// Palette indices of `bits` bits each.
    Indexed { bits: u8 },
    /// Bit fields within one little-endian `u16`.
    Packed16 {
        r: FromBits,
        g: FromBits,
        b: FromBits,
        a: Option<FromBits>,
    },
    Gray16,
    /// Channels of one byte each, in order blue, green, red, alpha.
    Direct8 { channels: u8, alpha: AlphaMode },
    /// Channels of a little-endian `u16` each, in order blue, green, red, alpha.
    Direct16 { channels: u8, alpha: AlphaMode },
}

impl PixelFormat {
    /// All formats, in order of their bit depth.
    pub const ALL: [PixelFormat; 14] = [
        PixelFormat::Indexed1,
        PixelFormat::Indexed4,
        PixelFormat::Indexed8,
        PixelFormat::Gray16,
        PixelFormat::Rgb555,
        PixelFormat::Rgb565,
        PixelFormat::Argb1555,
        PixelFormat::Rgb24,
        PixelFormat::Rgb32,
        PixelFormat::Argb32,
        PixelFormat::PArgb32,
        PixelFormat::Rgb48,
        PixelFormat::Argb64,
        PixelFormat::PArgb64,
    ];

    pub const fn bits_per_pixel(self) -> u8 {
        use PixelFormat::*;
        match self {
            Indexed1 => 1,
            Indexed4 => 4,
            Indexed8 => 8,
            Gray16 | Rgb555 | Rgb565 | Argb1555 => 16,
            Rgb24 => 24,
            Rgb32 | Argb32 | PArgb32 => 32,
            Rgb48 => 48,
            Argb64 | PArgb64 => 64,
        }
    }

    /// The number of bytes of one pixel, or `None` if several pixels share a byte.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self.bits_per_pixel() {
            bits if bits % 8 == 0 => Some(bits as usize / 8),
            _ => None,
        }
    }

    pub const fn is_indexed(self) -> bool {
        matches!(
            self,
            PixelFormat::Indexed1 | PixelFormat::Indexed4 | PixelFormat::Indexed8
        )
    }

    /// The number of palette entries that pixels of this format can address.
    ///
    /// This is `0` for direct formats.
    pub const fn palette_capacity(self) -> usize {
        if self.is_indexed() {
            1 << self.bits_per_pixel()
        } else {
            0
        }
    }

    /// Whether pixels store any alpha.
    ///
    /// Indexed formats report `false`, their palette may still contain translucent colors.
    pub const fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Argb1555
                | PixelFormat::Argb32
                | PixelFormat::PArgb32
                | PixelFormat::Argb64
                | PixelFormat::PArgb64
        )
    }

    pub const fn is_premultiplied(self) -> bool {
        matches!(self, PixelFormat::PArgb32 | PixelFormat::PArgb64)
    }

    pub(crate) const fn encoding(self) -> Encoding {
        use PixelFormat::*;

        const B5: FromBits = FromBits::from_range(0..5);
        const G5: FromBits = FromBits::from_range(5..10);
        const R5: FromBits = FromBits::from_range(10..15);

        match self {
            Indexed1 => Encoding::Indexed { bits: 1 },
            Indexed4 => Encoding::Indexed { bits: 4 },
            Indexed8 => Encoding::Indexed { bits: 8 },
            Gray16 => Encoding::Gray16,
            Rgb555 => Encoding::Packed16 {
                r: R5,
                g: G5,
                b: B5,
                a: None,
            },
            Rgb565 => Encoding::Packed16 {
                r: FromBits::from_range(11..16),
                g: FromBits::from_range(5..11),
                b: B5,
                a: None,
            },
            Argb1555 => Encoding::Packed16 {
                r: R5,
                g: G5,
                b: B5,
                a: Some(FromBits::from_range(15..16)),
            },
            Rgb24 => Encoding::Direct8 {
                channels: 3,
                alpha: AlphaMode::Opaque,
            },
            Rgb32 => Encoding::Direct8 {
                channels: 4,
                alpha: AlphaMode::Opaque,
            },
            Argb32 => Encoding::Direct8 {
                channels: 4,
                alpha: AlphaMode::Straight,
            },
            PArgb32 => Encoding::Direct8 {
                channels: 4,
                alpha: AlphaMode::Premultiplied,
            },
            Rgb48 => Encoding::Direct16 {
                channels: 3,
                alpha: AlphaMode::Opaque,
            },
            Argb64 => Encoding::Direct16 {
                channels: 4,
                alpha: AlphaMode::Straight,
            },
            PArgb64 => Encoding::Direct16 {
                channels: 4,
                alpha: AlphaMode::Premultiplied,
            },
        }
    }
}

#[test]
fn descriptors_agree() {
    for format in PixelFormat::ALL {
        let bits = match format.encoding() {
            Encoding::Indexed { bits } => bits,
            Encoding::Packed16 { .. } | Encoding::Gray16 => 16,
            Encoding::Direct8 { channels, .. } => 8 * channels,
            Encoding::Direct16 { channels, .. } => 16 * channels,
        };

        assert_eq!(bits, format.bits_per_pixel(), "{:?}", format);
        assert_eq!(format.is_indexed(), format.bytes_per_pixel().is_none() || format == PixelFormat::Indexed8);
        assert_eq!(format.is_indexed(), format.palette_capacity() > 0);
    }

    assert_eq!(PixelFormat::Indexed4.palette_capacity(), 16);
    assert_eq!(PixelFormat::Indexed8.palette_capacity(), 256);
}
