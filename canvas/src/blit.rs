// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Conversion of whole buffers between formats.
//!
//! A [`BlitConverter`] is a table of conversion routines keyed by the pair of source and target
//! format. Pairs without an entry are converted by [`convert_generic`], decoding every pixel to a
//! [`Color`] and encoding it again. This is always correct, the table only makes it faster.
#![allow(unsafe_code)]
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::buffer::{PixelBufferMut, PixelBufferRef};
use crate::codec::{self, Native};
use crate::color::{Color, PaletteIndex};
use crate::error::CanvasError;
use crate::format::PixelFormat;

/// A routine converting all pixels of one buffer into another of the same size.
pub type ConvertFn = fn(&PixelBufferRef<'_>, &mut PixelBufferMut<'_>) -> Result<(), CanvasError>;

/// A table of conversion routines, keyed by source and target format.
#[derive(Clone)]
pub struct BlitConverter {
    paths: HashMap<(PixelFormat, PixelFormat), ConvertFn>,
}

impl BlitConverter {
    /// A table without any routines. Every conversion takes the generic path.
    pub fn empty() -> Self {
        BlitConverter {
            paths: HashMap::new(),
        }
    }

    /// A table with the built-in routines.
    pub fn new() -> Self {
        use PixelFormat::*;

        let mut table = BlitConverter::empty();

        for format in PixelFormat::ALL {
            table.register(format, format, copy_same);
        }

        for from in [Indexed1, Indexed4, Indexed8] {
            for into in PixelFormat::ALL.into_iter().filter(|f| !f.is_indexed()) {
                table.register(from, into, indexed_to_direct);
            }
        }

        table.register(Argb32, Rgb24, bgrx_to_bgr);
        table.register(Rgb32, Rgb24, bgrx_to_bgr);
        table.register(Rgb24, Argb32, bgr_to_bgrx);
        table.register(Rgb24, Rgb32, bgr_to_bgrx);
        table.register(Rgb24, PArgb32, bgr_to_bgrx);
        table.register(Argb32, Rgb32, bgrx_opaque);
        table.register(Rgb32, Argb32, bgrx_opaque);

        table.register(Argb32, Rgb565, bgrx_to_565);
        table.register(Rgb32, Rgb565, bgrx_to_565);
        table.register(Argb32, Rgb555, bgrx_to_555);
        table.register(Rgb32, Rgb555, bgrx_to_555);
        table.register(Rgb565, Argb32, r565_to_bgrx);
        table.register(Rgb565, Rgb32, r565_to_bgrx);
        table.register(Rgb555, Argb32, r555_to_bgrx);
        table.register(Rgb555, Rgb32, r555_to_bgrx);

        table.register(Argb32, PArgb32, premultiply32);
        table.register(PArgb32, Argb32, unpremultiply32);

        table.register(Argb64, Argb32, narrow64);
        table.register(Argb32, Argb64, widen32);
        table.register(Rgb48, Rgb24, narrow48);
        table.register(Rgb48, Rgb32, narrow48_to_bgrx);
        table.register(Rgb48, Argb32, narrow48_to_bgrx);
        table.register(Rgb24, Rgb48, widen24);

        table.register(Argb64, PArgb64, premultiply64);
        table.register(PArgb64, Argb64, unpremultiply64);

        table
    }

    /// The table with the built-in routines, shared by the whole process.
    pub fn global() -> &'static BlitConverter {
        static GLOBAL: OnceLock<BlitConverter> = OnceLock::new();
        GLOBAL.get_or_init(BlitConverter::new)
    }

    /// Add or replace the routine for a pair of formats, returning the one it replaced.
    pub fn register(
        &mut self,
        from: PixelFormat,
        into: PixelFormat,
        convert: ConvertFn,
    ) -> Option<ConvertFn> {
        self.paths.insert((from, into), convert)
    }

    pub fn unregister(&mut self, from: PixelFormat, into: PixelFormat) -> Option<ConvertFn> {
        self.paths.remove(&(from, into))
    }

    pub fn lookup(&self, from: PixelFormat, into: PixelFormat) -> Option<ConvertFn> {
        self.paths.get(&(from, into)).copied()
    }

    /// Convert with the routine registered for the pair of formats.
    ///
    /// Fails with [`CanvasError::UnsupportedFormatPair`] if there is none, and with
    /// [`CanvasError::DimensionMismatch`] if the buffers differ in size. Neither writes anything.
    pub fn convert_direct(
        &self,
        src: &PixelBufferRef<'_>,
        dst: &mut PixelBufferMut<'_>,
    ) -> Result<(), CanvasError> {
        check_size(src, dst)?;

        let Some(convert) = self.lookup(src.format(), dst.format()) else {
            return Err(CanvasError::UnsupportedFormatPair {
                from: src.format(),
                into: dst.format(),
            });
        };

        log::trace!("Converting {:?} to {:?}", src.format(), dst.format());
        convert(src, dst)
    }

    /// Convert all pixels of `src` into the format of `dst`.
    ///
    /// Uses the registered routine if there is one, the generic conversion otherwise.
    pub fn convert(
        &self,
        src: &PixelBufferRef<'_>,
        dst: &mut PixelBufferMut<'_>,
    ) -> Result<(), CanvasError> {
        match self.convert_direct(src, dst) {
            Err(CanvasError::UnsupportedFormatPair { from, into }) => {
                log::debug!("No direct conversion from {:?} to {:?}, decoding colors", from, into);
                convert_generic(src, dst)
            }
            other => other,
        }
    }
}

impl Default for BlitConverter {
    fn default() -> Self {
        BlitConverter::new()
    }
}

impl core::fmt::Debug for BlitConverter {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut pairs: Vec<_> = self.paths.keys().collect();
        pairs.sort();
        f.debug_struct("BlitConverter").field("paths", &pairs).finish()
    }
}

/// Convert every pixel by decoding it to a color and encoding that color.
///
/// For indexed targets the colors are looked up in a hashed index of the palette and all pixels
/// are encoded before the first is written, so a missing color leaves the target untouched.
pub fn convert_generic(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), CanvasError> {
    check_size(src, dst)?;
    let (width, height) = (src.width(), src.height());

    if let Some(palette) = dst.palette() {
        log::debug!("Staging {}x{} pixels for an indexed target", width, height);
        let index = PaletteIndex::new(palette);

        let mut staged = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                // SAFETY: both buffers have the same size, checked above.
                let color = unsafe { src.get_color_unchecked(x, y) };
                let idx = index
                    .get(color)
                    .ok_or(CanvasError::PaletteLookupFailure(color))?;
                staged.push(Native(idx.into()));
            }
        }

        write_all(dst, staged);
        return Ok(());
    }

    let codec = dst.codec();
    for y in 0..height {
        for x in 0..width {
            // SAFETY: both buffers have the same size, checked above.
            unsafe {
                let color = src.get_color_unchecked(x, y);
                dst.set_native_unchecked(x, y, codec.pack(color)?);
            }
        }
    }

    Ok(())
}

fn check_size(src: &PixelBufferRef<'_>, dst: &PixelBufferMut<'_>) -> Result<(), CanvasError> {
    let (src_size, dst_size) = ((src.width(), src.height()), (dst.width(), dst.height()));
    if src_size != dst_size {
        return Err(CanvasError::DimensionMismatch {
            src: src_size,
            dst: dst_size,
        });
    }

    Ok(())
}

fn write_all(dst: &mut PixelBufferMut<'_>, pixels: Vec<Native>) {
    let width = dst.width();
    let positions = (0..dst.height()).flat_map(|y| (0..width).map(move |x| (x, y)));

    for ((x, y), native) in positions.zip(pixels) {
        // SAFETY: iterating within the width and height.
        unsafe { dst.set_native_unchecked(x, y, native) };
    }
}

/// Apply `f` to each pixel of formats made of whole bytes, row by row.
fn map_pixels<const S: usize, const T: usize>(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
    f: impl Fn([u8; S]) -> [u8; T],
) -> Result<(), CanvasError> {
    check_size(src, dst)?;

    for y in 0..src.height() {
        let (Some(from), Some(into)) = (src.row_bytes(y), dst.row_bytes_mut(y)) else {
            continue;
        };

        for (d, s) in into.chunks_exact_mut(T).zip(from.chunks_exact(S)) {
            let (Ok(d), Ok(s)) = (<&mut [u8; T]>::try_from(d), <[u8; S]>::try_from(s)) else {
                continue;
            };
            *d = f(s);
        }
    }

    Ok(())
}

fn copy_same(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    check_size(src, dst)?;

    if src.format().is_indexed() && src.palette() != dst.palette() {
        return convert_generic(src, dst);
    }

    if src.format().bytes_per_pixel().is_none() {
        // Sub-byte pixels of the two buffers need not start at the same bit.
        for y in 0..src.height() {
            for x in 0..src.width() {
                // SAFETY: both buffers have the same size, checked above.
                unsafe { dst.set_native_unchecked(x, y, src.get_native_unchecked(x, y)) };
            }
        }

        return Ok(());
    }

    for y in 0..src.height() {
        if let (Some(from), Some(into)) = (src.row_bytes(y), dst.row_bytes_mut(y)) {
            into.copy_from_slice(from);
        }
    }

    Ok(())
}

fn indexed_to_direct(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), CanvasError> {
    check_size(src, dst)?;

    let codec = dst.codec();
    let lut = (0..src.format().palette_capacity())
        .map(|idx| codec.pack(src.unpack(Native(idx as u64))))
        .collect::<Result<Vec<_>, _>>()?;

    for y in 0..src.height() {
        for x in 0..src.width() {
            // SAFETY: both buffers have the same size, checked above.
            unsafe {
                let idx = src.get_native_unchecked(x, y).0 as usize;
                dst.set_native_unchecked(x, y, lut[idx]);
            }
        }
    }

    Ok(())
}

fn bgrx_to_bgr(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, _]: [u8; 4]| [b, g, r])
}

fn bgr_to_bgrx(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r]: [u8; 3]| [b, g, r, 0xff])
}

fn bgrx_opaque(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, _]: [u8; 4]| [b, g, r, 0xff])
}

fn bgrx_to_565(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, _]: [u8; 4]| {
        let word = u16::from(r >> 3) << 11 | u16::from(g >> 2) << 5 | u16::from(b >> 3);
        word.to_le_bytes()
    })
}

fn bgrx_to_555(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, _]: [u8; 4]| {
        let word = u16::from(r >> 3) << 10 | u16::from(g >> 3) << 5 | u16::from(b >> 3);
        word.to_le_bytes()
    })
}

fn r565_to_bgrx(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |bytes: [u8; 2]| {
        let word = u16::from_le_bytes(bytes);
        let r = expand5(word >> 11);
        let g = expand6(word >> 5);
        let b = expand5(word);
        [b, g, r, 0xff]
    })
}

fn r555_to_bgrx(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |bytes: [u8; 2]| {
        let word = u16::from_le_bytes(bytes);
        let r = expand5(word >> 10);
        let g = expand5(word >> 5);
        let b = expand5(word);
        [b, g, r, 0xff]
    })
}

fn premultiply32(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, a]: [u8; 4]| {
        codec::premultiply(Color::rgba(r, g, b, a))
    })
}

fn unpremultiply32(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), CanvasError> {
    map_pixels(src, dst, |pixel: [u8; 4]| {
        let Color { r, g, b, a } = codec::unpremultiply(pixel);
        [b, g, r, a]
    })
}

// The high byte of a little-endian channel is its value narrowed to 8 bits.
fn narrow64(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |p: [u8; 8]| [p[1], p[3], p[5], p[7]])
}

fn narrow48(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |p: [u8; 6]| [p[1], p[3], p[5]])
}

fn narrow48_to_bgrx(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), CanvasError> {
    map_pixels(src, dst, |p: [u8; 6]| [p[1], p[3], p[5], 0xff])
}

// Multiplying by 257 repeats the byte.
fn widen32(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r, a]: [u8; 4]| [b, b, g, g, r, r, a, a])
}

fn widen24(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |[b, g, r]: [u8; 3]| [b, b, g, g, r, r])
}

fn premultiply64(src: &PixelBufferRef<'_>, dst: &mut PixelBufferMut<'_>) -> Result<(), CanvasError> {
    map_pixels(src, dst, |p: [u8; 8]| {
        encode_wide(codec::premultiply_wide(decode_wide(p)))
    })
}

fn unpremultiply64(
    src: &PixelBufferRef<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), CanvasError> {
    map_pixels(src, dst, |p: [u8; 8]| {
        encode_wide(codec::unpremultiply_wide(decode_wide(p)))
    })
}

fn decode_wide(p: [u8; 8]) -> [u16; 4] {
    [
        u16::from_le_bytes([p[0], p[1]]),
        u16::from_le_bytes([p[2], p[3]]),
        u16::from_le_bytes([p[4], p[5]]),
        u16::from_le_bytes([p[6], p[7]]),
    ]
}

fn encode_wide(channels: [u16; 4]) -> [u8; 8] {
    let mut p = [0u8; 8];
    for (bytes, c) in p.chunks_exact_mut(2).zip(channels) {
        bytes.copy_from_slice(&c.to_le_bytes());
    }
    p
}

fn expand5(bits: u16) -> u8 {
    let v = (bits & 0x1f) as u8;
    v << 3 | v >> 2
}

fn expand6(bits: u16) -> u8 {
    let v = (bits & 0x3f) as u8;
    v << 2 | v >> 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferLayout, Palette, PixelBuffer};

    fn buffer_of(format: PixelFormat, memory: &mut [u8]) -> PixelBufferMut<'_> {
        let layout = BufferLayout::packed(format, 4, 2).expect("Valid layout");
        PixelBuffer::new(&mut memory[..layout.byte_len()], layout).expect("Valid buffer")
    }

    /// Every fast path agrees with decoding and encoding colors.
    #[test]
    fn fast_paths_match_generic() {
        let colors = [
            Color::rgba(0xff, 0x80, 0x00, 0xff),
            Color::rgba(0x12, 0x34, 0x56, 0x78),
            Color::rgba(0xff, 0xff, 0xff, 0x00),
            Color::rgba(0x01, 0xfe, 0x7f, 0x80),
            Color::WHITE,
            Color::BLACK,
            Color::rgba(0x9a, 0xbc, 0xde, 0xf0),
            Color::TRANSPARENT,
        ];

        let table = BlitConverter::new();
        for from in PixelFormat::ALL.into_iter().filter(|f| !f.is_indexed()) {
            let mut src_memory = [0u8; 64];
            let mut src = buffer_of(from, &mut src_memory);
            for (i, &color) in colors.iter().enumerate() {
                src.set_color(i as u32 % 4, i as u32 / 4, color)
                    .expect("Direct format");
            }
            let src = src.as_view();

            for into in PixelFormat::ALL.into_iter().filter(|f| !f.is_indexed()) {
                // Paths from 16-bit premultiplied pixels are more precise than decoding to 8 bits.
                if from == PixelFormat::PArgb64 {
                    continue;
                }

                if table.lookup(from, into).is_none() {
                    continue;
                }

                let (mut fast, mut generic) = ([0u8; 64], [0u8; 64]);
                table
                    .convert_direct(&src, &mut buffer_of(into, &mut fast))
                    .expect("Fast path");
                convert_generic(&src, &mut buffer_of(into, &mut generic)).expect("Generic path");

                assert_eq!(fast, generic, "{:?} to {:?}", from, into);
            }
        }
    }

    #[test]
    fn row_kernels_skip_padding() {
        let layout =
            BufferLayout::with_row_alignment(PixelFormat::Rgb24, 3, 2, 4).expect("Valid layout");
        let mut src_memory = vec![0xeeu8; layout.byte_len()];
        src_memory[..9].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        src_memory[12..21].copy_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2, 1]);
        let src = PixelBuffer::new(&src_memory[..], layout).expect("Valid buffer");

        let wide = BufferLayout::packed(PixelFormat::Argb32, 3, 2).expect("Valid layout");
        let mut dst_memory = vec![0u8; wide.byte_len()];
        let mut dst = PixelBuffer::new(&mut dst_memory[..], wide).expect("Valid buffer");
        BlitConverter::new()
            .convert_direct(&src.as_view(), &mut dst)
            .expect("Fast path");

        drop(dst);
        assert_eq!(
            dst_memory,
            [
                1, 2, 3, 0xff, 4, 5, 6, 0xff, 7, 8, 9, 0xff, //
                9, 8, 7, 0xff, 6, 5, 4, 0xff, 3, 2, 1, 0xff,
            ]
        );

        let mut back = vec![0xeeu8; layout.byte_len()];
        let mut narrow = PixelBuffer::new(&mut back[..], layout).expect("Valid buffer");
        let wide = PixelBuffer::new(&dst_memory[..], wide).expect("Valid buffer");
        BlitConverter::new()
            .convert_direct(&wide.as_view(), &mut narrow)
            .expect("Fast path");

        drop(narrow);
        assert_eq!(back, src_memory);
    }

    #[test]
    fn dispatch() {
        let mut table = BlitConverter::empty();
        let (mut a, mut b) = ([0u8; 64], [0u8; 64]);
        let src = buffer_of(PixelFormat::Argb32, &mut a);
        let mut dst = buffer_of(PixelFormat::Rgb24, &mut b);

        assert_eq!(
            table.convert_direct(&src.as_view(), &mut dst),
            Err(CanvasError::UnsupportedFormatPair {
                from: PixelFormat::Argb32,
                into: PixelFormat::Rgb24
            })
        );

        table.register(PixelFormat::Argb32, PixelFormat::Rgb24, bgrx_to_bgr);
        assert!(table.lookup(PixelFormat::Argb32, PixelFormat::Rgb24).is_some());
        assert_eq!(table.convert_direct(&src.as_view(), &mut dst), Ok(()));

        assert!(table.unregister(PixelFormat::Argb32, PixelFormat::Rgb24).is_some());
        assert_eq!(table.convert(&src.as_view(), &mut dst), Ok(()));
    }

    #[test]
    fn mismatched_sizes() {
        let mut small = [0u8; 16];
        let mut large = [0xa5u8; 64];
        let src = buffer_of(PixelFormat::Argb32, &mut large);
        let layout = BufferLayout::packed(PixelFormat::Argb32, 2, 2).expect("Valid layout");
        let mut dst = PixelBuffer::new(&mut small[..], layout).expect("Valid buffer");

        assert_eq!(
            BlitConverter::global().convert(&src.as_view(), &mut dst),
            Err(CanvasError::DimensionMismatch {
                src: (4, 2),
                dst: (2, 2)
            })
        );

        drop(dst);
        assert_eq!(small, [0; 16]);
    }

    #[test]
    fn indexed_remap() {
        let first = Palette::new(vec![Color::RED, Color::GREEN]).expect("Valid palette");
        let second = Palette::new(vec![Color::GREEN, Color::BLUE, Color::RED]).expect("Valid palette");
        let layout = BufferLayout::packed(PixelFormat::Indexed8, 2, 1).expect("Valid layout");

        let src_memory = [0u8, 1];
        let src = PixelBuffer::with_palette(&src_memory[..], layout, &first).expect("Valid buffer");
        let mut dst_memory = [9u8, 9];
        let mut dst =
            PixelBuffer::with_palette(&mut dst_memory[..], layout, &second).expect("Valid buffer");

        BlitConverter::global()
            .convert(&src.as_view(), &mut dst)
            .expect("All colors in palette");
        drop(dst);
        assert_eq!(dst_memory, [2, 0]);
    }
}
