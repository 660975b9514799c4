// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Drawing, compositing and format conversion on borrowed pixel memory.
//!
//! A [`PixelBuffer`] is a view of pixels in bytes that someone else owns: a locked bitmap, a
//! window surface, a plain `Vec<u8>`. It knows the [`PixelFormat`] of its pixels, the stride of
//! its rows and, for indexed formats, the [`Palette`] of its owner. It never allocates for its
//! pixels and never writes to the padding at the end of rows.
//!
//! # Usage
//!
//! Drawing into a device independent bitmap, with rows padded to four bytes:
//!
//! ```
//! use pixbuf_canvas::{BufferLayout, Color, PixelBuffer, PixelFormat};
//!
//! let layout = BufferLayout::with_row_alignment(PixelFormat::Rgb24, 31, 16, 4)?;
//! let mut memory = vec![0u8; layout.byte_len()];
//! let mut buffer = PixelBuffer::new(&mut memory[..], layout)?;
//!
//! buffer.clear(Color::WHITE)?;
//! buffer.fill_circle(15, 8, 6, Color::RED)?;
//! // Partly outside of the buffer, this is clipped.
//! buffer.draw_line(-4, -4, 40, 20, Color::BLUE)?;
//!
//! assert_eq!(buffer.get_color(15, 8)?, Color::RED);
//! # Ok::<(), pixbuf_canvas::CanvasError>(())
//! ```
//!
//! Converting between buffers of different formats:
//!
//! ```
//! use pixbuf_canvas::{BlitConverter, BufferLayout, Color, PixelBuffer, PixelFormat};
//!
//! let layout = BufferLayout::packed(PixelFormat::Argb32, 8, 8)?;
//! let mut source = vec![0u8; layout.byte_len()];
//! let mut from = PixelBuffer::new(&mut source[..], layout)?;
//! from.clear(Color::rgb(0xff, 0x80, 0x00))?;
//!
//! let layout = BufferLayout::packed(PixelFormat::Rgb565, 8, 8)?;
//! let mut target = vec![0u8; layout.byte_len()];
//! let mut into = PixelBuffer::new(&mut target[..], layout)?;
//!
//! BlitConverter::global().convert(&from.as_view(), &mut into)?;
//! assert_eq!(into.get_native(7, 7)?.0, 0xfc00);
//! # Ok::<(), pixbuf_canvas::CanvasError>(())
//! ```
// Deny, not forbid, unsafe code. The fill engine and the unchecked accessors need it.
#![deny(unsafe_code)]

mod arch;
mod bits;
/// Compositing of colors.
pub mod blend;
mod blit;
mod buffer;
mod codec;
mod color;
mod draw;
mod error;
/// Filling runs of pixels, with the widest registers available.
pub mod fill;
mod format;

#[cfg(test)]
mod tests;

pub use self::blend::source_over;
pub use self::blit::{convert_generic, BlitConverter, ConvertFn};
pub use self::buffer::{BufferLayout, PixelBuffer, PixelBufferMut, PixelBufferRef, RawBitmap};
pub use self::codec::{Codec, Native};
pub use self::color::{Color, Palette, PaletteIndex};
pub use self::error::CanvasError;
pub use self::fill::{FillOps, Tier};
pub use self::format::PixelFormat;

pub mod layout {
    pub use pixbuf_texel::layout::{LayoutError, Rect, StridedBits};
}
