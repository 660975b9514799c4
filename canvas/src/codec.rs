// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Conversion between logical colors and the native pixels of each format.
use crate::color::{Color, Palette};
use crate::error::CanvasError;
use crate::format::{AlphaMode, Encoding, PixelFormat};

/// The bits of a single pixel in its native encoding.
///
/// The value holds the bytes of the pixel in little-endian order, that is the first byte in
/// memory is the lowest byte of the value. For indexed formats it is the palette index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Native(pub u64);

impl Native {
    /// Read a pixel from the first `len` bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut le = [0u8; 8];
        let len = bytes.len().min(8);
        le[..len].copy_from_slice(&bytes[..len]);
        Native(u64::from_le_bytes(le))
    }

    /// The bytes of the pixel in memory order. Only the first `bytes_per_pixel` are meaningful.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// A byte holding this index of `bits` bits in every one of its pixel slots.
    pub(crate) fn replicate_in_byte(self, bits: u8) -> u8 {
        let mask = (1u16 << bits) - 1;
        let index = self.0 as u16 & mask;
        let mut byte = 0u16;
        let mut shift = 0;
        while shift < 8 {
            byte |= index << shift;
            shift += bits;
        }
        byte as u8
    }
}

/// Converts colors of one format, with the palette of indexed formats.
#[derive(Clone, Copy, Debug)]
pub struct Codec<'pal> {
    format: PixelFormat,
    palette: Option<&'pal Palette>,
}

impl<'pal> Codec<'pal> {
    /// Create a codec for a format.
    ///
    /// Indexed formats require a palette with no more colors than they have indices. A palette of
    /// a direct format is ignored.
    pub fn new(format: PixelFormat, palette: Option<&'pal Palette>) -> Result<Self, CanvasError> {
        if !format.is_indexed() {
            return Ok(Codec {
                format,
                palette: None,
            });
        }

        let Some(palette) = palette else {
            return Err(CanvasError::MissingPalette(format));
        };

        let capacity = format.palette_capacity();
        if palette.len() > capacity {
            return Err(CanvasError::PaletteTooLarge {
                len: palette.len(),
                capacity,
            });
        }

        Ok(Codec {
            format,
            palette: Some(palette),
        })
    }

    /// A codec of parts already validated by [`Codec::new`].
    pub(crate) fn from_parts(format: PixelFormat, palette: Option<&'pal Palette>) -> Self {
        Codec { format, palette }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn palette(&self) -> Option<&'pal Palette> {
        self.palette
    }

    /// Encode a color.
    ///
    /// This is exact for `Argb32` and `Argb64`. Other direct formats lose precision or alpha.
    /// Indexed formats only accept colors that are exactly in the palette.
    pub fn pack(&self, color: Color) -> Result<Native, CanvasError> {
        let native = match self.format.encoding() {
            Encoding::Indexed { .. } => {
                let index = self
                    .palette
                    .and_then(|palette| palette.index_of(color))
                    .ok_or(CanvasError::PaletteLookupFailure(color))?;
                u64::from(index)
            }
            Encoding::Packed16 { r, g, b, a } => {
                let mut word = 0;
                word = r.insert(word, r.narrow_u8(color.r));
                word = g.insert(word, g.narrow_u8(color.g));
                word = b.insert(word, b.narrow_u8(color.b));
                if let Some(a) = a {
                    word = a.insert(word, a.narrow_u8(color.a));
                }
                word
            }
            Encoding::Gray16 => u64::from(widen_u8(luma(color))),
            Encoding::Direct8 { channels, alpha } => {
                let [b, g, r, a] = match alpha {
                    AlphaMode::Opaque => [color.b, color.g, color.r, 0xff],
                    AlphaMode::Straight => [color.b, color.g, color.r, color.a],
                    AlphaMode::Premultiplied => premultiply(color),
                };

                let bytes = [b, g, r, a, 0, 0, 0, 0];
                let word = u64::from_le_bytes(bytes);
                word & width_mask(8 * u32::from(channels))
            }
            Encoding::Direct16 { channels, alpha } => {
                let [b, g, r, a] = match alpha {
                    AlphaMode::Opaque => [color.b, color.g, color.r, 0xff].map(widen_u8),
                    AlphaMode::Straight => [color.b, color.g, color.r, color.a].map(widen_u8),
                    AlphaMode::Premultiplied => premultiply16(color),
                };

                let word = u64::from(b)
                    | u64::from(g) << 16
                    | u64::from(r) << 32
                    | u64::from(a) << 48;
                word & width_mask(16 * u32::from(channels))
            }
        };

        Ok(Native(native))
    }

    /// Decode a pixel.
    ///
    /// This never fails. An index beyond the palette decodes as [`Color::TRANSPARENT`].
    pub fn unpack(&self, native: Native) -> Color {
        let word = native.0;

        match self.format.encoding() {
            Encoding::Indexed { bits } => {
                let index = (word & width_mask(bits.into())) as usize;
                self.palette
                    .and_then(|palette| palette.get(index))
                    .unwrap_or(Color::TRANSPARENT)
            }
            Encoding::Packed16 { r, g, b, a } => Color {
                r: r.widen_to_u8(r.extract(word)),
                g: g.widen_to_u8(g.extract(word)),
                b: b.widen_to_u8(b.extract(word)),
                a: a.map_or(0xff, |a| a.widen_to_u8(a.extract(word))),
            },
            Encoding::Gray16 => {
                let level = narrow_u16(word as u16);
                Color::rgb(level, level, level)
            }
            Encoding::Direct8 { alpha, .. } => {
                let [b, g, r, a, ..] = word.to_le_bytes();
                match alpha {
                    AlphaMode::Opaque => Color::rgb(r, g, b),
                    AlphaMode::Straight => Color::rgba(r, g, b, a),
                    AlphaMode::Premultiplied => unpremultiply([b, g, r, a]),
                }
            }
            Encoding::Direct16 { alpha, .. } => {
                let channel = |n: u32| (word >> (16 * n)) as u16;
                let [b, g, r, a] = [channel(0), channel(1), channel(2), channel(3)];
                match alpha {
                    AlphaMode::Opaque => Color::rgb(narrow_u16(r), narrow_u16(g), narrow_u16(b)),
                    AlphaMode::Straight => Color::rgba(
                        narrow_u16(r),
                        narrow_u16(g),
                        narrow_u16(b),
                        narrow_u16(a),
                    ),
                    AlphaMode::Premultiplied => unpremultiply16([b, g, r, a]),
                }
            }
        }
    }
}

fn width_mask(bits: u32) -> u64 {
    u64::MAX >> (64 - bits.clamp(1, 64))
}

pub(crate) fn widen_u8(val: u8) -> u16 {
    u16::from(val) * 257
}

pub(crate) fn narrow_u16(val: u16) -> u8 {
    (val >> 8) as u8
}

/// The Rec. 601 luma of a color, rounded.
pub(crate) fn luma(color: Color) -> u8 {
    let weighted = u32::from(color.r) * 299 + u32::from(color.g) * 587 + u32::from(color.b) * 114;
    ((weighted + 500) / 1000) as u8
}

/// Multiply the colors by alpha, in memory order blue, green, red, alpha.
pub(crate) fn premultiply(color: Color) -> [u8; 4] {
    match color.a {
        0 => [0; 4],
        0xff => [color.b, color.g, color.r, 0xff],
        a => {
            let mul = |c: u8| ((u32::from(c) * u32::from(a) + 127) / 255) as u8;
            [mul(color.b), mul(color.g), mul(color.r), a]
        }
    }
}

/// Divide the colors of a premultiplied pixel by its alpha, given in memory order.
pub(crate) fn unpremultiply([b, g, r, a]: [u8; 4]) -> Color {
    match a {
        0 => Color::TRANSPARENT,
        0xff => Color::rgb(r, g, b),
        a => {
            let a32 = u32::from(a);
            let div = |c: u8| ((u32::from(c) * 255 + a32 / 2) / a32).min(255) as u8;
            Color::rgba(div(r), div(g), div(b), a)
        }
    }
}

fn premultiply16(color: Color) -> [u16; 4] {
    premultiply_wide([color.b, color.g, color.r, color.a].map(widen_u8))
}

fn unpremultiply16(pixel: [u16; 4]) -> Color {
    let [b, g, r, a] = unpremultiply_wide(pixel).map(narrow_u16);
    match a {
        0 => Color::TRANSPARENT,
        a => Color::rgba(r, g, b, a),
    }
}

/// Multiply 16-bit colors by alpha, in memory order blue, green, red, alpha.
pub(crate) fn premultiply_wide([b, g, r, a]: [u16; 4]) -> [u16; 4] {
    match a {
        0 => [0; 4],
        0xffff => [b, g, r, a],
        _ => {
            let a64 = u64::from(a);
            let mul = |c: u16| ((u64::from(c) * a64 + 32767) / 65535) as u16;
            [mul(b), mul(g), mul(r), a]
        }
    }
}

/// Divide 16-bit premultiplied colors by alpha, in memory order.
pub(crate) fn unpremultiply_wide([b, g, r, a]: [u16; 4]) -> [u16; 4] {
    match a {
        0 => [0; 4],
        0xffff => [b, g, r, a],
        _ => {
            let a64 = u64::from(a);
            let div = |c: u16| ((u64::from(c) * 65535 + a64 / 2) / a64).min(65535) as u16;
            [div(b), div(g), div(r), a]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(format: PixelFormat) -> Codec<'static> {
        Codec::new(format, None).expect("Direct format")
    }

    #[test]
    fn exact_round_trips() {
        let colors = [
            Color::TRANSPARENT,
            Color::WHITE,
            Color::rgba(0x12, 0x34, 0x56, 0x78),
            Color::rgba(0xff, 0, 0x80, 1),
        ];

        for format in [PixelFormat::Argb32, PixelFormat::Argb64] {
            let codec = codec(format);
            for color in colors {
                let native = codec.pack(color).expect("Direct pack");
                assert_eq!(codec.unpack(native), color, "{:?}", format);
            }
        }
    }

    #[test]
    fn memory_order() {
        let color = Color::rgba(0x11, 0x22, 0x33, 0x44);

        let native = codec(PixelFormat::Argb32).pack(color).expect("Direct pack");
        assert_eq!(native.to_le_bytes()[..4], [0x33, 0x22, 0x11, 0x44]);

        let native = codec(PixelFormat::Rgb32).pack(color).expect("Direct pack");
        assert_eq!(native.to_le_bytes()[..4], [0x33, 0x22, 0x11, 0xff]);

        let native = codec(PixelFormat::Rgb24).pack(color).expect("Direct pack");
        assert_eq!(native, Native(0x11_22_33));

        let native = codec(PixelFormat::Rgb48).pack(color).expect("Direct pack");
        assert_eq!(native, Native(0x1111_2222_3333));
    }

    #[test]
    fn packed_words() {
        let codec565 = codec(PixelFormat::Rgb565);
        assert_eq!(codec565.pack(Color::RED), Ok(Native(0xf800)));
        assert_eq!(codec565.pack(Color::rgb(0xff, 0xff, 0)), Ok(Native(0xffe0)));
        assert_eq!(codec565.unpack(Native(0x07e0)), Color::GREEN);
        assert_eq!(codec565.unpack(Native(0x8410)), Color::rgb(0x84, 0x82, 0x84));

        let codec555 = codec(PixelFormat::Rgb555);
        assert_eq!(codec555.pack(Color::WHITE), Ok(Native(0x7fff)));
        assert_eq!(codec555.unpack(Native(0xffff)), Color::WHITE);

        let codec1555 = codec(PixelFormat::Argb1555);
        assert_eq!(codec1555.pack(Color::WHITE), Ok(Native(0xffff)));
        assert_eq!(codec1555.pack(Color::rgba(0xff, 0xff, 0xff, 0x7f)), Ok(Native(0x7fff)));
        assert_eq!(codec1555.unpack(Native(0x7c00)), Color::rgba(0xff, 0, 0, 0));
    }

    #[test]
    fn gray_luma() {
        let gray = codec(PixelFormat::Gray16);
        assert_eq!(gray.pack(Color::WHITE), Ok(Native(0xffff)));
        assert_eq!(gray.pack(Color::RED), Ok(Native(76 * 257)));
        assert_eq!(gray.unpack(Native(76 * 257)), Color::rgb(76, 76, 76));
    }

    #[test]
    fn premultiplied_alpha() {
        let argb = codec(PixelFormat::PArgb32);

        assert_eq!(argb.pack(Color::rgba(0xff, 0x80, 0x10, 0)), Ok(Native(0)));
        assert_eq!(argb.unpack(Native(0)), Color::TRANSPARENT);

        let half = argb.pack(Color::rgba(0xff, 0x80, 0, 0x80)).expect("Direct pack");
        assert_eq!(half.to_le_bytes()[..4], [0, 0x40, 0x80, 0x80]);
        assert_eq!(argb.unpack(half), Color::rgba(0xff, 0x80, 0, 0x80));

        let opaque = Color::rgb(1, 2, 3);
        assert_eq!(argb.unpack(argb.pack(opaque).expect("Direct pack")), opaque);

        // Inconsistent pixels with colors above alpha are clamped.
        assert_eq!(
            argb.unpack(Native(u64::from_le_bytes([0xff, 0, 0, 0x10, 0, 0, 0, 0]))),
            Color::rgba(0, 0, 0xff, 0x10)
        );

        let wide = codec(PixelFormat::PArgb64);
        assert_eq!(wide.pack(Color::rgba(0xff, 0xff, 0xff, 0)), Ok(Native(0)));
        assert_eq!(wide.unpack(Native(0)), Color::TRANSPARENT);
        let half = Color::rgba(0xff, 0x80, 0, 0x80);
        assert_eq!(wide.unpack(wide.pack(half).expect("Direct pack")), half);
        assert_eq!(wide.unpack(wide.pack(Color::WHITE).expect("Direct pack")), Color::WHITE);
    }

    #[test]
    fn indexed_lookup() {
        let palette = Palette::new(vec![Color::BLACK, Color::RED, Color::WHITE]).expect("Valid palette");

        assert_eq!(
            Codec::new(PixelFormat::Indexed8, None).map(|_| ()),
            Err(CanvasError::MissingPalette(PixelFormat::Indexed8))
        );
        assert_eq!(
            Codec::new(PixelFormat::Indexed1, Some(&palette)).map(|_| ()),
            Err(CanvasError::PaletteTooLarge {
                len: 3,
                capacity: 2
            })
        );

        let codec = Codec::new(PixelFormat::Indexed4, Some(&palette)).expect("Valid codec");
        assert_eq!(codec.pack(Color::RED), Ok(Native(1)));
        assert_eq!(
            codec.pack(Color::BLUE),
            Err(CanvasError::PaletteLookupFailure(Color::BLUE))
        );
        assert_eq!(codec.unpack(Native(2)), Color::WHITE);
        assert_eq!(codec.unpack(Native(3)), Color::TRANSPARENT);
    }

    #[test]
    fn replicated_index() {
        assert_eq!(Native(1).replicate_in_byte(1), 0xff);
        assert_eq!(Native(0xa).replicate_in_byte(4), 0xaa);
        assert_eq!(Native(0x7).replicate_in_byte(8), 0x7);
    }
}
