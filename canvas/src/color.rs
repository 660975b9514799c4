// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! The logical color, and palettes of them.
use std::collections::HashMap;

use crate::error::CanvasError;

/// A color with straight alpha and 8 bits for each channel.
///
/// This is the exchange type of all pixel formats. Every format converts its native pixels to and
/// from it, it is the only representation that does not depend on a format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Color::rgb(0, 0, 0);
    pub const WHITE: Self = Color::rgb(0xff, 0xff, 0xff);
    pub const RED: Self = Color::rgb(0xff, 0, 0);
    pub const GREEN: Self = Color::rgb(0, 0xff, 0);
    pub const BLUE: Self = Color::rgb(0, 0, 0xff);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Unpack from `0xAARRGGBB`.
    pub const fn from_argb(argb: u32) -> Self {
        let [b, g, r, a] = argb.to_le_bytes();
        Color { r, g, b, a }
    }

    /// Pack into `0xAARRGGBB`.
    pub const fn to_argb(self) -> u32 {
        u32::from_le_bytes([self.b, self.g, self.r, self.a])
    }

    /// The same color, fully opaque.
    pub const fn opaque(self) -> Self {
        Color { a: 0xff, ..self }
    }
}

/// An ordered sequence of colors that indexed pixels refer to.
///
/// A palette has at least one and at most 256 entries. It may be shorter than the number of
/// indices a format can address, indices beyond its end have no color.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Palette {
    entries: Vec<Color>,
}

impl Palette {
    pub const MAX_LEN: usize = 256;

    pub fn new(entries: Vec<Color>) -> Result<Self, CanvasError> {
        if entries.is_empty() || entries.len() > Self::MAX_LEN {
            return Err(CanvasError::BadPalette(entries.len()));
        }

        Ok(Palette { entries })
    }

    /// The two color palette, black at index 0 and white at index 1.
    pub fn monochrome() -> Self {
        Palette {
            entries: vec![Color::BLACK, Color::WHITE],
        }
    }

    /// Evenly spaced opaque grays from black to white.
    pub fn grayscale(len: usize) -> Result<Self, CanvasError> {
        let entries = match len {
            0 => Vec::new(),
            1 => vec![Color::BLACK],
            _ => (0..len)
                .map(|i| {
                    let level = (i * 255 + (len - 1) / 2) / (len - 1);
                    let level = level as u8;
                    Color::rgb(level, level, level)
                })
                .collect(),
        };

        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false, a palette is never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[Color] {
        &self.entries
    }

    /// The first index holding exactly this color.
    pub fn index_of(&self, color: Color) -> Option<u8> {
        let idx = self.entries.iter().position(|&c| c == color)?;
        // At most 256 entries, checked at construction.
        Some(idx as u8)
    }
}

/// A hashed exact-match lookup from colors to palette indices.
///
/// Built once for conversions that pack many pixels into an indexed format. Where a color occurs
/// in the palette more than once, the first index wins just like in [`Palette::index_of`].
#[derive(Clone, Debug)]
pub struct PaletteIndex {
    indices: HashMap<Color, u8>,
}

impl PaletteIndex {
    pub fn new(palette: &Palette) -> Self {
        let mut indices = HashMap::with_capacity(palette.len());

        for (idx, &color) in palette.entries().iter().enumerate() {
            indices.entry(color).or_insert(idx as u8);
        }

        PaletteIndex { indices }
    }

    pub fn get(&self, color: Color) -> Option<u8> {
        self.indices.get(&color).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_packing() {
        let color = Color::from_argb(0x80_10_20_30);
        assert_eq!(color, Color::rgba(0x10, 0x20, 0x30, 0x80));
        assert_eq!(color.to_argb(), 0x80_10_20_30);
        assert_eq!(bytemuck::bytes_of(&color), &[0x10, 0x20, 0x30, 0x80]);
    }

    #[test]
    fn palette_construction() {
        assert_eq!(Palette::new(vec![]), Err(CanvasError::BadPalette(0)));
        assert_eq!(
            Palette::new(vec![Color::BLACK; 257]),
            Err(CanvasError::BadPalette(257))
        );

        let gray = Palette::grayscale(16).expect("Valid palette");
        assert_eq!(gray.get(0), Some(Color::BLACK));
        assert_eq!(gray.get(15), Some(Color::WHITE));
        assert_eq!(gray.get(1), Some(Color::rgb(17, 17, 17)));
        assert_eq!(gray.get(16), None);

        let gray = Palette::grayscale(256).expect("Valid palette");
        assert!(gray
            .entries()
            .iter()
            .enumerate()
            .all(|(i, c)| *c == Color::rgb(i as u8, i as u8, i as u8)));
    }

    #[test]
    fn first_match_wins() {
        let palette = Palette::new(vec![Color::RED, Color::BLUE, Color::RED]).expect("Valid palette");
        let index = PaletteIndex::new(&palette);

        assert_eq!(palette.index_of(Color::RED), Some(0));
        assert_eq!(index.get(Color::RED), Some(0));
        assert_eq!(index.get(Color::BLUE), Some(1));
        assert_eq!(palette.index_of(Color::GREEN), None);
        assert_eq!(index.get(Color::GREEN), None);
    }
}
