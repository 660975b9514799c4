// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use pixbuf_texel::layout::LayoutError;

use crate::color::Color;
use crate::format::PixelFormat;

/// Errors of operations on pixel buffers.
///
/// Every fallible operation fails before it writes anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("pixel ({x}, {y}) is outside of the {width}x{height} buffer")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
    #[error("color {0:?} is not part of the palette")]
    PaletteLookupFailure(Color),
    #[error("can not convert {}x{} pixels into {}x{} pixels", src.0, src.1, dst.0, dst.1)]
    DimensionMismatch { src: (u32, u32), dst: (u32, u32) },
    /// No fast path is registered for this pair. Recoverable by a generic conversion.
    #[error("no direct conversion from {from:?} into {into:?}")]
    UnsupportedFormatPair { from: PixelFormat, into: PixelFormat },
    #[error("indexed format {0:?} requires a palette")]
    MissingPalette(PixelFormat),
    #[error("a palette of {len} colors exceeds the {capacity} indices of the format")]
    PaletteTooLarge { len: usize, capacity: usize },
    #[error("a palette must have between 1 and 256 colors, not {0}")]
    BadPalette(usize),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl CanvasError {
    pub(crate) fn out_of_bounds(x: impl Into<i64>, y: impl Into<i64>, width: u32, height: u32) -> Self {
        CanvasError::OutOfBounds {
            x: x.into(),
            y: y.into(),
            width,
            height,
        }
    }
}
