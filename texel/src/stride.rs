// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Bit-addressed, strided matrices of pixels.
//!
//! Pixel memory handed to us by the owner of a bitmap is a plain byte region where each row
//! starts `bytes_per_row` after the previous one. The row pitch may exceed what the pixels need,
//! the padding is never touched. Pixels narrower than a byte are packed with the first pixel in
//! the most significant bits.
//!
//! A layout can be narrowed to a region of itself. This is pure coordinate translation: the byte
//! offset moves to the first row of the region, and `x_origin` counts the pixels skipped at the
//! start of each row.
use core::ops::Range;

use crate::rect::Rect;

/// A simple layout describing some pixels as a strided matrix of bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrideSpec {
    /// The number of pixels in width direction.
    pub width: u32,
    /// The number of pixels in height direction.
    pub height: u32,
    /// The number of bits of a single pixel.
    pub bits_per_pixel: u8,
    /// The number of bytes to go one pixel along the height.
    pub bytes_per_row: usize,
    /// Byte offset of the first row from the start.
    pub offset: usize,
    /// Pixels to skip at the start of each row.
    pub x_origin: u32,
}

/// A validated layout of a rectangular matrix of pixels.
///
/// The invariants are that the whole layout fits into memory, that every row holds all its
/// pixels, and that all bit indices within have a proper index into the byte slice containing
/// the data if that slice has at least [`Self::byte_len`] bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StridedBits {
    spec: StrideSpec,
    /// The total number of bytes, as proof of calculation basically.
    total: usize,
}

/// Error that occurs when a [`StrideSpec`] is invalid, or memory does not fit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("pixels of {0} bits are not supported")]
    BadBitsPerPixel(u8),
    #[error("a row of {bytes_per_row} bytes can not hold {row_bits} bits of pixels")]
    StrideTooSmall { bytes_per_row: usize, row_bits: u64 },
    #[error("the layout does not fit into the address space")]
    OutOfMemory,
    #[error("{len} bytes are too few for a layout of {required} bytes")]
    BufferTooSmall { len: usize, required: usize },
    #[error("the region is not contained in its parent")]
    RegionOutOfBounds,
}

impl StrideSpec {
    fn row_bits(&self) -> Option<u64> {
        let pixels = u64::from(self.x_origin) + u64::from(self.width);
        pixels.checked_mul(u64::from(self.bits_per_pixel))
    }

    /// Bytes touched by the last row, measured from its start.
    fn last_row_bytes(&self) -> Option<usize> {
        let bits = self.row_bits()?;
        usize::try_from(bits.div_ceil(8)).ok()
    }

    fn end(&self) -> Option<usize> {
        if self.height == 0 || self.width == 0 {
            return Some(self.offset);
        }

        let max_h = usize::try_from(self.height - 1).ok()?;
        let max_h_offset = max_h.checked_mul(self.bytes_per_row)?;

        self.last_row_bytes()?
            .checked_add(max_h_offset)?
            .checked_add(self.offset)
    }
}

impl StridedBits {
    /// Try to create a new layout from a specification.
    ///
    /// This fails if the specification does not describe a valid layout: the pixel width is not
    /// one we can address, a row is too short for its pixels, or the layout does not describe a
    /// memory size expressible on the current architecture.
    pub fn new(spec: StrideSpec) -> Result<Self, LayoutError> {
        if !matches!(spec.bits_per_pixel, 1 | 2 | 4 | 8 | 16 | 24 | 32 | 48 | 64) {
            return Err(LayoutError::BadBitsPerPixel(spec.bits_per_pixel));
        }

        let row_bits = spec.row_bits().ok_or(LayoutError::OutOfMemory)?;
        let stride_bits = (spec.bytes_per_row as u64).saturating_mul(8);

        if spec.height > 0 && row_bits > stride_bits {
            return Err(LayoutError::StrideTooSmall {
                bytes_per_row: spec.bytes_per_row,
                row_bits,
            });
        }

        let total = spec.end().ok_or(LayoutError::OutOfMemory)?;
        Ok(StridedBits { spec, total })
    }

    /// Construct a layout with rows that are exactly as long as required.
    pub fn packed(width: u32, height: u32, bits_per_pixel: u8) -> Result<Self, LayoutError> {
        Self::with_row_alignment(width, height, bits_per_pixel, 1)
    }

    /// Construct a layout with rows padded to a multiple of `align` bytes.
    ///
    /// Device independent bitmaps for example pad each row to 4 bytes.
    pub fn with_row_alignment(
        width: u32,
        height: u32,
        bits_per_pixel: u8,
        align: usize,
    ) -> Result<Self, LayoutError> {
        let row_bits = u64::from(width)
            .checked_mul(u64::from(bits_per_pixel))
            .ok_or(LayoutError::OutOfMemory)?;
        let row_bytes = usize::try_from(row_bits.div_ceil(8)).map_err(|_| LayoutError::OutOfMemory)?;
        let bytes_per_row = row_bytes
            .checked_next_multiple_of(align.max(1))
            .ok_or(LayoutError::OutOfMemory)?;

        Self::new(StrideSpec {
            width,
            height,
            bits_per_pixel,
            bytes_per_row,
            offset: 0,
            x_origin: 0,
        })
    }

    /// Get the specification of this matrix.
    pub fn spec(&self) -> StrideSpec {
        self.spec
    }

    pub fn width(&self) -> u32 {
        self.spec.width
    }

    pub fn height(&self) -> u32 {
        self.spec.height
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.spec.bits_per_pixel
    }

    pub fn bytes_per_row(&self) -> usize {
        self.spec.bytes_per_row
    }

    /// The number of bytes of a single pixel, if pixels are made up of whole bytes.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self.spec.bits_per_pixel {
            bits if bits % 8 == 0 => Some(usize::from(bits / 8)),
            _ => None,
        }
    }

    /// The number of bytes a slice must have to hold all pixels of this layout.
    pub fn byte_len(&self) -> usize {
        self.total
    }

    /// Check that a slice of bytes is long enough for this layout.
    pub fn fits(&self, len: usize) -> Result<(), LayoutError> {
        if len < self.total {
            Err(LayoutError::BufferTooSmall {
                len,
                required: self.total,
            })
        } else {
            Ok(())
        }
    }

    /// Whether the rows follow each other without any padding bytes in between.
    ///
    /// Then the whole pixel matrix is a single contiguous run of bytes.
    pub fn is_contiguous(&self) -> bool {
        let row = u64::from(self.spec.width) * u64::from(self.spec.bits_per_pixel);
        self.spec.x_origin == 0 && row == (self.spec.bytes_per_row as u64) * 8
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.spec.width && y < self.spec.height
    }

    /// The index of the byte at which row `y` starts.
    pub fn row_start(&self, y: u32) -> usize {
        self.spec.offset + y as usize * self.spec.bytes_per_row
    }

    /// The absolute index of the first bit of a pixel.
    ///
    /// Bits are counted from the most significant bit of each byte, the way sub-byte pixels are
    /// packed. The pixel must be contained in the layout.
    pub fn pixel_bit(&self, x: u32, y: u32) -> usize {
        debug_assert!(self.contains(x, y));
        let column = (self.spec.x_origin as usize + x as usize) * usize::from(self.spec.bits_per_pixel);
        self.row_start(y) * 8 + column
    }

    /// The index of the first byte of a pixel made of whole bytes.
    pub fn pixel_byte(&self, x: u32, y: u32) -> usize {
        debug_assert!(self.spec.bits_per_pixel % 8 == 0);
        self.pixel_bit(x, y) / 8
    }

    /// The bits covering the pixels of row `y`.
    pub fn row_bits(&self, y: u32) -> Range<usize> {
        let bpp = usize::from(self.spec.bits_per_pixel);
        let start = self.row_start(y) * 8 + self.spec.x_origin as usize * bpp;
        start..start + self.spec.width as usize * bpp
    }

    /// The bytes covering the pixels of row `y`.
    ///
    /// For pixels narrower than a byte the first and last byte may be shared with pixels outside
    /// this layout.
    pub fn row_bytes(&self, y: u32) -> Range<usize> {
        let bits = self.row_bits(y);
        bits.start / 8..bits.end.div_ceil(8)
    }

    /// Narrow the layout to a rectangle of its pixels.
    ///
    /// The result addresses the same bytes: pixel `(x, y)` of the region is pixel
    /// `(x + rect.x, y + rect.y)` of `self`.
    pub fn region(&self, rect: Rect) -> Result<Self, LayoutError> {
        if !rect.fits_within(self.spec.width, self.spec.height) {
            return Err(LayoutError::RegionOutOfBounds);
        }

        let offset = if rect.height == 0 {
            self.spec.offset
        } else {
            self.row_start(rect.y)
        };

        let spec = StrideSpec {
            width: rect.width,
            height: rect.height,
            offset,
            x_origin: self
                .spec
                .x_origin
                .checked_add(rect.x)
                .ok_or(LayoutError::OutOfMemory)?,
            ..self.spec
        };

        // A region of a valid layout is always valid, this only recomputes `total`.
        let total = spec.end().ok_or(LayoutError::OutOfMemory)?;
        Ok(StridedBits { spec, total })
    }
}

impl From<&'_ StridedBits> for StrideSpec {
    fn from(layout: &'_ StridedBits) -> Self {
        layout.spec()
    }
}

#[test]
fn stride_validation() {
    let packed = StridedBits::packed(3, 2, 24).expect("Valid layout");
    assert_eq!(packed.bytes_per_row(), 9);
    assert_eq!(packed.byte_len(), 18);

    let too_short = StrideSpec {
        bytes_per_row: 8,
        ..packed.spec()
    };
    assert!(matches!(
        StridedBits::new(too_short),
        Err(LayoutError::StrideTooSmall { .. })
    ));

    let bad_bits = StrideSpec {
        bits_per_pixel: 12,
        ..packed.spec()
    };
    assert_eq!(
        StridedBits::new(bad_bits),
        Err(LayoutError::BadBitsPerPixel(12))
    );
}

#[test]
fn padded_rows() {
    let layout = StridedBits::with_row_alignment(5, 3, 1, 4).expect("Valid layout");
    assert_eq!(layout.bytes_per_row(), 4);
    // The last row only needs its single byte of pixels.
    assert_eq!(layout.byte_len(), 9);
    assert!(!layout.is_contiguous());

    let layout = StridedBits::with_row_alignment(4, 3, 8, 4).expect("Valid layout");
    assert!(layout.is_contiguous());
}

#[test]
fn region_translation() {
    let layout = StridedBits::packed(8, 8, 4).expect("Valid layout");
    let region = layout
        .region(Rect::new(3, 2, 4, 5))
        .expect("Region within bounds");

    assert_eq!(region.width(), 4);
    assert_eq!(region.height(), 5);
    assert_eq!(region.pixel_bit(0, 0), layout.pixel_bit(3, 2));
    assert_eq!(region.pixel_bit(3, 4), layout.pixel_bit(6, 6));
    assert_eq!(region.row_bytes(0), 9..12);

    let nested = region.region(Rect::new(1, 1, 2, 2)).expect("Nested region");
    assert_eq!(nested.pixel_bit(1, 1), layout.pixel_bit(5, 4));

    assert_eq!(
        layout.region(Rect::new(6, 0, 4, 1)),
        Err(LayoutError::RegionOutOfBounds)
    );
}
