// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! # Texel
//!
//! Element witnesses and strided layouts for pixel memory that is borrowed, not owned.
//!
//! Pixel memory usually arrives from somewhere else: a locked operating system bitmap, a mapped
//! frame buffer, a foreign allocation. This crate offers the language to talk about it without
//! copying. A [`layout::StridedBits`] describes where each pixel lives in a byte region, whatever
//! its row padding or its pixel width down to a single bit, and a [`Texel`] certifies that some
//! element type may be read from and written to such bytes.
//!
//! ## Usage
//!
//! ```
//! use pixbuf_texel::layout::{Rect, StridedBits};
//! use pixbuf_texel::{AsTexel, Texel};
//!
//! // Four 24-bit pixels per row, rows padded to 4 bytes.
//! let layout = StridedBits::with_row_alignment(4, 2, 24, 4)?;
//! assert_eq!(layout.bytes_per_row(), 12);
//!
//! let mut memory = vec![0u8; layout.byte_len()];
//! let pixel = layout.pixel_byte(1, 1);
//! <[u8; 3]>::texel().write_unaligned(&mut memory[pixel..], [0xff, 0x80, 0x00]);
//!
//! // A region addresses the same bytes, translated.
//! let region = layout.region(Rect::new(1, 1, 3, 1))?;
//! assert_eq!(region.pixel_byte(0, 0), pixel);
//! # Ok::<(), pixbuf_texel::layout::LayoutError>(())
//! ```
// Be std for doctests, avoids a weird warning about missing allocator.
#![cfg_attr(not(doctest), no_std)]
// The only module allowed to be `unsafe` is `texel`. It certifies the byte properties of element
// types, everything else builds on its safe interface.
#![deny(unsafe_code)]

mod rect;
mod stride;
mod texel;

pub use self::texel::{AsTexel, Texel, MAX_ALIGN};

/// Layouts of pixel matrices within byte memory.
pub mod layout {
    pub use crate::rect::Rect;
    pub use crate::stride::{LayoutError, StrideSpec, StridedBits};
}

/// Constants for predefined texel types.
///
/// Holding an instance of `Texel<T>` certifies that the type `T` is compatible with the texel
/// concept, that is: its alignment requirement is *small* enough, its size is non-zero, it does
/// not contain any padding, and it is a plain old data type without any inner invariants.
///
/// # Extending
///
/// The recommended method of extending this with a custom type is by implementing `bytemuck::Pod`
/// for this type. This applies a number of consistency checks.
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
/// use pixbuf_texel::{AsTexel, Texel};
///
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct Bgr(pub [u8; 3]);
///
/// impl AsTexel for Bgr {
///     fn texel() -> Texel<Bgr> {
///         Texel::for_type().expect("verified by bytemuck and pixbuf_texel")
///     }
/// }
/// ```
pub mod texels {
    pub use crate::texel::constants::*;
}
