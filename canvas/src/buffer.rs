// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! A byte-slice based view of pixels.
#![allow(unsafe_code)]
use core::ops::{Deref, DerefMut};
use core::slice;

use pixbuf_texel::layout::{Rect, StrideSpec, StridedBits};

use crate::bits::FromBits;
use crate::codec::{Codec, Native};
use crate::color::{Color, Palette};
use crate::error::CanvasError;
use crate::fill::FillOps;
use crate::format::PixelFormat;

/// The layout of a buffer: its format and where each pixel lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    format: PixelFormat,
    bytes: StridedBits,
}

/// A view of pixels in memory owned by someone else.
///
/// The buffer never allocates, it only borrows its bytes through `D`. All writes stay within the
/// `width` pixels of each row, any padding up to the row stride is never touched.
///
/// Indexed formats reference the palette of their owner. Writes of colors that are not exactly
/// in the palette fail, nothing is approximated.
pub struct PixelBuffer<'pal, D> {
    data: D,
    layout: StridedBits,
    format: PixelFormat,
    palette: Option<&'pal Palette>,
    fill: FillOps,
}

/// A buffer that can only be read.
pub type PixelBufferRef<'a> = PixelBuffer<'a, &'a [u8]>;

/// A buffer that can be read and written.
pub type PixelBufferMut<'a> = PixelBuffer<'a, &'a mut [u8]>;

/// A locked bitmap, as handed out by whoever owns the pixel memory.
///
/// Rows go downwards in memory from `base`, each `stride` bytes after the previous.
#[derive(Clone, Copy, Debug)]
pub struct RawBitmap<'pal> {
    pub base: *mut u8,
    pub stride: usize,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub palette: Option<&'pal Palette>,
}

impl BufferLayout {
    /// A layout with a given row stride in bytes.
    pub fn new(
        format: PixelFormat,
        width: u32,
        height: u32,
        bytes_per_row: usize,
    ) -> Result<Self, CanvasError> {
        let bytes = StridedBits::new(StrideSpec {
            width,
            height,
            bits_per_pixel: format.bits_per_pixel(),
            bytes_per_row,
            offset: 0,
            x_origin: 0,
        })?;

        Ok(BufferLayout { format, bytes })
    }

    /// A layout without any padding between rows.
    pub fn packed(format: PixelFormat, width: u32, height: u32) -> Result<Self, CanvasError> {
        let bytes = StridedBits::packed(width, height, format.bits_per_pixel())?;
        Ok(BufferLayout { format, bytes })
    }

    /// A layout whose rows are padded to a multiple of `align` bytes.
    pub fn with_row_alignment(
        format: PixelFormat,
        width: u32,
        height: u32,
        align: usize,
    ) -> Result<Self, CanvasError> {
        let bytes = StridedBits::with_row_alignment(width, height, format.bits_per_pixel(), align)?;
        Ok(BufferLayout { format, bytes })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.bytes.width()
    }

    pub fn height(&self) -> u32 {
        self.bytes.height()
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes.bytes_per_row()
    }

    /// The number of bytes a buffer needs for this layout.
    pub fn byte_len(&self) -> usize {
        self.bytes.byte_len()
    }

    pub fn strided(&self) -> &StridedBits {
        &self.bytes
    }
}

impl<'pal, D: Deref<Target = [u8]>> PixelBuffer<'pal, D> {
    /// Create a view of pixels in a direct format.
    ///
    /// Fails if the data is too short for the layout, or if the format is indexed and thus
    /// requires a palette.
    pub fn new(data: D, layout: BufferLayout) -> Result<Self, CanvasError> {
        Self::with_parts(data, layout, None)
    }

    /// Create a view of pixels that refer to a palette.
    ///
    /// For direct formats the palette is ignored.
    pub fn with_palette(
        data: D,
        layout: BufferLayout,
        palette: &'pal Palette,
    ) -> Result<Self, CanvasError> {
        Self::with_parts(data, layout, Some(palette))
    }

    fn with_parts(
        data: D,
        layout: BufferLayout,
        palette: Option<&'pal Palette>,
    ) -> Result<Self, CanvasError> {
        layout.bytes.fits(data.len())?;
        let codec = Codec::new(layout.format, palette)?;

        Ok(PixelBuffer {
            data,
            layout: layout.bytes,
            format: layout.format,
            palette: codec.palette(),
            fill: FillOps::detect(),
        })
    }

    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    /// The distance between rows, in bytes.
    pub fn stride(&self) -> usize {
        self.layout.bytes_per_row()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn palette(&self) -> Option<&'pal Palette> {
        self.palette
    }

    pub fn layout(&self) -> BufferLayout {
        BufferLayout {
            format: self.format,
            bytes: self.layout,
        }
    }

    pub fn fill_ops(&self) -> FillOps {
        self.fill
    }

    /// The codec of this buffer's format and palette.
    pub fn codec(&self) -> Codec<'pal> {
        Codec::from_parts(self.format, self.palette)
    }

    pub fn pack(&self, color: Color) -> Result<Native, CanvasError> {
        self.codec().pack(color)
    }

    pub fn unpack(&self, native: Native) -> Color {
        self.codec().unpack(native)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.layout.contains(x, y)
    }

    /// All bytes of the underlying memory, including any not covered by this view.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The bytes holding the pixels of row `y`.
    ///
    /// With pixels narrower than a byte, the first and last byte may hold pixels of neighboring
    /// views as well.
    pub fn row_bytes(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height() {
            return None;
        }

        self.data.get(self.layout.row_bytes(y))
    }

    /// Read a pixel in its native encoding.
    pub fn get_native(&self, x: u32, y: u32) -> Result<Native, CanvasError> {
        self.check_pixel(x, y)?;
        // SAFETY: just checked that the pixel is in bounds.
        Ok(unsafe { self.get_native_unchecked(x, y) })
    }

    /// Read the color of a pixel.
    pub fn get_color(&self, x: u32, y: u32) -> Result<Color, CanvasError> {
        self.get_native(x, y).map(|native| self.unpack(native))
    }

    /// Read a pixel in its native encoding, without bounds checks.
    ///
    /// # Safety
    ///
    /// The pixel `(x, y)` must be within the width and height of the buffer.
    pub unsafe fn get_native_unchecked(&self, x: u32, y: u32) -> Native {
        debug_assert!(self.contains(x, y));
        let bit = self.layout.pixel_bit(x, y);

        match self.format.bytes_per_pixel() {
            Some(bytes) => {
                let at = bit / 8;
                Native::from_le_bytes(self.data.get_unchecked(at..at + bytes))
            }
            None => {
                let byte = self.data.get_unchecked(bit / 8..bit / 8 + 1);
                Native(self.sub_byte(bit).extract_msb_first(byte).into())
            }
        }
    }

    /// Read the color of a pixel, without bounds checks.
    ///
    /// # Safety
    ///
    /// The pixel `(x, y)` must be within the width and height of the buffer.
    pub unsafe fn get_color_unchecked(&self, x: u32, y: u32) -> Color {
        self.unpack(self.get_native_unchecked(x, y))
    }

    /// A view of a rectangle of this buffer.
    ///
    /// Pixel `(x, y)` of the view is pixel `(x + rect.x, y + rect.y)` of this buffer.
    pub fn slice(&self, rect: Rect) -> Result<PixelBuffer<'pal, &[u8]>, CanvasError> {
        let layout = self.layout.region(rect)?;
        Ok(PixelBuffer {
            data: &self.data[..],
            layout,
            format: self.format,
            palette: self.palette,
            fill: self.fill,
        })
    }

    /// A read-only view of the whole buffer.
    pub fn as_view(&self) -> PixelBuffer<'pal, &[u8]> {
        PixelBuffer {
            data: &self.data[..],
            layout: self.layout,
            format: self.format,
            palette: self.palette,
            fill: self.fill,
        }
    }

    /// Whether all pixels of the buffer are the same.
    ///
    /// Pixels are compared in their native encoding. A buffer without pixels is flat.
    pub fn is_flat_color(&self) -> bool {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return true;
        }

        // SAFETY: the buffer has pixels, so (0, 0) is within it.
        let first = unsafe { self.get_native_unchecked(0, 0) };
        (0..height).all(|y| {
            (0..width).all(|x| {
                // SAFETY: iterating within the width and height.
                unsafe { self.get_native_unchecked(x, y) == first }
            })
        })
    }

    pub(crate) fn check_pixel(&self, x: u32, y: u32) -> Result<(), CanvasError> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(CanvasError::out_of_bounds(x, y, self.width(), self.height()))
        }
    }

    /// The field of a sub-byte pixel within its byte.
    fn sub_byte(&self, bit: usize) -> FromBits {
        FromBits {
            begin: bit % 8,
            len: usize::from(self.format.bits_per_pixel()),
        }
    }
}

impl<'pal, D: DerefMut<Target = [u8]>> PixelBuffer<'pal, D> {
    /// Choose a different strategy for filling runs of pixels.
    pub fn set_fill_ops(&mut self, ops: FillOps) {
        self.fill = ops;
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The bytes holding the pixels of row `y`, see [`Self::row_bytes`].
    pub fn row_bytes_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height() {
            return None;
        }

        let range = self.layout.row_bytes(y);
        self.data.get_mut(range)
    }

    /// Write a pixel in its native encoding.
    pub fn set_native(&mut self, x: u32, y: u32, native: Native) -> Result<(), CanvasError> {
        self.check_pixel(x, y)?;
        // SAFETY: just checked that the pixel is in bounds.
        unsafe { self.set_native_unchecked(x, y, native) };
        Ok(())
    }

    /// Write the color of a pixel.
    ///
    /// Neither a pixel out of bounds nor a color missing from the palette modifies the buffer.
    pub fn set_color(&mut self, x: u32, y: u32, color: Color) -> Result<(), CanvasError> {
        self.check_pixel(x, y)?;
        let native = self.pack(color)?;
        // SAFETY: just checked that the pixel is in bounds.
        unsafe { self.set_native_unchecked(x, y, native) };
        Ok(())
    }

    /// Write a pixel in its native encoding, without bounds checks.
    ///
    /// The neighbors of a sub-byte pixel within the same byte are preserved.
    ///
    /// # Safety
    ///
    /// The pixel `(x, y)` must be within the width and height of the buffer.
    pub unsafe fn set_native_unchecked(&mut self, x: u32, y: u32, native: Native) {
        debug_assert!(self.contains(x, y));
        let bit = self.layout.pixel_bit(x, y);

        match self.format.bytes_per_pixel() {
            Some(bytes) => {
                let at = bit / 8;
                let le = native.to_le_bytes();
                self.data
                    .get_unchecked_mut(at..at + bytes)
                    .copy_from_slice(&le[..bytes]);
            }
            None => {
                let field = self.sub_byte(bit);
                let byte = self.data.get_unchecked_mut(bit / 8..bit / 8 + 1);
                field.insert_msb_first(byte, native.0 as u32);
            }
        }
    }

    /// Write the color of a pixel, without bounds checks.
    ///
    /// A color that is not part of the palette is silently skipped.
    ///
    /// # Safety
    ///
    /// The pixel `(x, y)` must be within the width and height of the buffer.
    pub unsafe fn set_color_unchecked(&mut self, x: u32, y: u32, color: Color) {
        if let Ok(native) = self.pack(color) {
            self.set_native_unchecked(x, y, native);
        }
    }

    /// Set every pixel of the buffer.
    ///
    /// Only the pixels are written, the padding of each row is left as it is.
    pub fn fill(&mut self, native: Native) {
        let (width, height) = (self.width(), self.height());
        if width == 0 {
            return;
        }

        if self.layout.is_contiguous() && self.format.bytes_per_pixel().is_some() {
            let start = self.layout.row_start(0);
            let end = self.layout.byte_len();
            let pattern = native.to_le_bytes();
            let bpp = self.pattern_len();
            let fill = self.fill;
            fill.fill(&mut self.data[start..end], &pattern[..bpp]);
            return;
        }

        for y in 0..height {
            self.write_span(0, y, width, native);
        }
    }

    /// A mutable view of a rectangle of this buffer.
    ///
    /// Pixel `(x, y)` of the view is pixel `(x + rect.x, y + rect.y)` of this buffer, writes go
    /// to the same memory.
    pub fn slice_mut(&mut self, rect: Rect) -> Result<PixelBuffer<'pal, &mut [u8]>, CanvasError> {
        let layout = self.layout.region(rect)?;
        Ok(PixelBuffer {
            data: &mut self.data[..],
            layout,
            format: self.format,
            palette: self.palette,
            fill: self.fill,
        })
    }

    /// A mutable view of the whole buffer.
    pub fn as_view_mut(&mut self) -> PixelBuffer<'pal, &mut [u8]> {
        PixelBuffer {
            data: &mut self.data[..],
            layout: self.layout,
            format: self.format,
            palette: self.palette,
            fill: self.fill,
        }
    }

    /// Write `len` pixels of row `y`, starting at `x`.
    ///
    /// # Panics
    ///
    /// If the run is not within the buffer.
    pub(crate) fn write_span(&mut self, x: u32, y: u32, len: u32, native: Native) {
        assert!(self.span_fits(x, y, len));
        // SAFETY: just checked the run.
        unsafe { self.write_span_unchecked(x, y, len, native) }
    }

    /// Write `len` pixels of column `x`, starting at `y`.
    ///
    /// # Panics
    ///
    /// If the run is not within the buffer.
    pub(crate) fn write_column(&mut self, x: u32, y: u32, len: u32, native: Native) {
        assert!(self.column_fits(x, y, len));
        // SAFETY: just checked the run.
        unsafe { self.write_column_unchecked(x, y, len, native) }
    }

    /// Write a run of pixels within a row, through the fill engine.
    ///
    /// # Safety
    ///
    /// The pixels `x..x + len` of row `y` must be within the buffer.
    pub(crate) unsafe fn write_span_unchecked(&mut self, x: u32, y: u32, len: u32, native: Native) {
        if len == 0 {
            return;
        }

        debug_assert!(self.span_fits(x, y, len));
        let start = self.layout.pixel_bit(x, y);

        let Some(bytes) = self.format.bytes_per_pixel() else {
            return self.write_bits_unchecked(start, len, native);
        };

        let pattern = native.to_le_bytes();
        let fill = self.fill;
        let ptr = self.data.as_mut_ptr().add(start / 8);
        fill.fill_raw(ptr, &pattern[..bytes], len as usize);
    }

    /// Write a run of sub-byte pixels.
    ///
    /// Pixels sharing a byte with the start or end of the run are written one by one, the bytes
    /// in between are filled whole.
    unsafe fn write_bits_unchecked(&mut self, start: usize, len: u32, native: Native) {
        let bpp = usize::from(self.format.bits_per_pixel());
        let end = start + len as usize * bpp;

        let mut bit = start;
        while bit < end && bit % 8 != 0 {
            self.write_bit_pixel(bit, native);
            bit += bpp;
        }

        let whole = (end - bit) / 8;
        if whole > 0 {
            let byte = native.replicate_in_byte(bpp as u8);
            let fill = self.fill;
            let ptr = self.data.as_mut_ptr().add(bit / 8);
            fill.fill_raw(ptr, &[byte], whole);
            bit += whole * 8;
        }

        while bit < end {
            self.write_bit_pixel(bit, native);
            bit += bpp;
        }
    }

    unsafe fn write_bit_pixel(&mut self, bit: usize, native: Native) {
        let field = self.sub_byte(bit);
        let byte = self.data.get_unchecked_mut(bit / 8..bit / 8 + 1);
        field.insert_msb_first(byte, native.0 as u32);
    }

    /// Write a run of pixels within a column.
    ///
    /// Rows are not contiguous so this steps by the stride, eight rows at a time.
    ///
    /// # Safety
    ///
    /// The pixels `y..y + len` of column `x` must be within the buffer.
    pub(crate) unsafe fn write_column_unchecked(&mut self, x: u32, y: u32, len: u32, native: Native) {
        if len == 0 {
            return;
        }

        debug_assert!(self.column_fits(x, y, len));
        let stride = self.stride();

        let Some(bytes) = self.format.bytes_per_pixel() else {
            let stride_bits = stride * 8;
            let mut bit = self.layout.pixel_bit(x, y);
            for _ in 0..len {
                self.write_bit_pixel(bit, native);
                bit += stride_bits;
            }
            return;
        };

        let le = native.to_le_bytes();
        let pattern = le.as_ptr();
        let mut ptr = self.data.as_mut_ptr().add(self.layout.pixel_byte(x, y));
        let mut rows = len as usize;

        while rows >= 8 {
            for row in 0..8 {
                core::ptr::copy_nonoverlapping(pattern, ptr.add(row * stride), bytes);
            }
            ptr = ptr.add(8 * stride);
            rows -= 8;
        }

        for row in 0..rows {
            core::ptr::copy_nonoverlapping(pattern, ptr.add(row * stride), bytes);
        }
    }

    fn span_fits(&self, x: u32, y: u32, len: u32) -> bool {
        len == 0 || (y < self.height() && u64::from(x) + u64::from(len) <= u64::from(self.width()))
    }

    fn column_fits(&self, x: u32, y: u32, len: u32) -> bool {
        len == 0 || (x < self.width() && u64::from(y) + u64::from(len) <= u64::from(self.height()))
    }

    fn pattern_len(&self) -> usize {
        self.format.bytes_per_pixel().unwrap_or(1)
    }
}

impl<'a> PixelBuffer<'a, &'a mut [u8]> {
    /// Create a view of a locked bitmap.
    ///
    /// # Safety
    ///
    /// The memory from `raw.base` must be valid for reads and writes of all rows for the lifetime
    /// `'a`, that is `stride * (height - 1)` bytes plus the bytes of one row. Nothing else may
    /// access it during that time.
    pub unsafe fn from_raw(raw: RawBitmap<'a>) -> Result<Self, CanvasError> {
        let layout = BufferLayout::new(raw.format, raw.width, raw.height, raw.stride)?;
        let len = layout.byte_len();

        let data: &'a mut [u8] = if len == 0 {
            &mut []
        } else {
            slice::from_raw_parts_mut(raw.base, len)
        };

        PixelBuffer::with_parts(data, layout, raw.palette)
    }
}

impl<D> core::fmt::Debug for PixelBuffer<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("layout", &self.layout)
            .field("format", &self.format)
            .field("palette", &self.palette.map(Palette::len))
            .field("fill", &self.fill)
            .finish()
    }
}
