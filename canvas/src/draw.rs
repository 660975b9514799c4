// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Drawing primitives on pixel buffers.
//!
//! Every primitive comes in three variants:
//! * The plain variant takes signed coordinates and clips the shape to the buffer. Shapes that
//!   are entirely outside draw nothing.
//! * The `_checked` variant fails with [`CanvasError::OutOfBounds`] if any part of the shape is
//!   outside of the buffer, before anything is written.
//! * The `_unchecked` variant takes a native pixel and trusts its coordinates. It goes straight
//!   to the fill engine.
//!
//! The plain and checked variants only fail on indexed buffers, for colors that are not part of
//! their palette. Such a failure also happens before anything is written.
#![allow(unsafe_code)]
use core::ops::{Deref, DerefMut};

use pixbuf_texel::layout::Rect;

use crate::blend::source_over;
use crate::blit::BlitConverter;
use crate::buffer::{BufferLayout, PixelBuffer, PixelBufferMut, PixelBufferRef};
use crate::codec::Native;
use crate::color::Color;
use crate::error::CanvasError;

/// The bounding box of a shape, with signed origin.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    x: i64,
    y: i64,
    width: u64,
    height: u64,
}

impl Bounds {
    fn new(x: i64, y: i64, width: u64, height: u64) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        Some(Bounds {
            x,
            y,
            width,
            height,
        })
    }

    /// The box spanned by two corners, both inclusive.
    fn corners(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Bounds {
            x: x0.min(x1),
            y: y0.min(y1),
            width: x0.abs_diff(x1) + 1,
            height: y0.abs_diff(y1) + 1,
        }
    }

    fn around(cx: i64, cy: i64, rx: u32, ry: u32) -> Self {
        let (rx, ry) = (i64::from(rx), i64::from(ry));
        Bounds::corners(cx - rx, cy - ry, cx + rx, cy + ry)
    }
}

/// Writes the pixels of a rasterized shape.
///
/// A clipping pen skips everything outside of the buffer. A pen without clipping trusts that
/// the shape is within the buffer.
struct Pen<'buf, 'pal, D> {
    buffer: &'buf mut PixelBuffer<'pal, D>,
    native: Native,
    clip: bool,
}

impl<'buf, 'pal, D: DerefMut<Target = [u8]>> Pen<'buf, 'pal, D> {
    fn clipping(buffer: &'buf mut PixelBuffer<'pal, D>, native: Native) -> Self {
        Pen {
            buffer,
            native,
            clip: true,
        }
    }

    /// # Safety
    ///
    /// All pixels drawn with the pen must be within the buffer.
    unsafe fn trusting(buffer: &'buf mut PixelBuffer<'pal, D>, native: Native) -> Self {
        Pen {
            buffer,
            native,
            clip: false,
        }
    }

    fn pixel(&mut self, x: i64, y: i64) {
        if self.clip && !self.contains(x, y) {
            return;
        }

        // SAFETY: within the buffer, checked above or guaranteed by the creator of the pen.
        unsafe {
            self.buffer
                .set_native_unchecked(x as u32, y as u32, self.native)
        }
    }

    /// The pixels `x..x + len` of row `y`.
    fn span(&mut self, x: i64, y: i64, len: u64) {
        let Some(rect) = self.clipped(x, y, len, 1) else {
            return;
        };

        // SAFETY: within the buffer, clipped or guaranteed by the creator of the pen.
        unsafe {
            self.buffer
                .write_span_unchecked(rect.x, rect.y, rect.width, self.native)
        }
    }

    /// The pixels from `x0` to `x1` of row `y`, both inclusive.
    fn span_between(&mut self, x0: i64, x1: i64, y: i64) {
        self.span(x0.min(x1), y, x0.abs_diff(x1) + 1)
    }

    /// The pixels `y..y + len` of column `x`.
    fn column(&mut self, x: i64, y: i64, len: u64) {
        let Some(rect) = self.clipped(x, y, 1, len) else {
            return;
        };

        // SAFETY: within the buffer, clipped or guaranteed by the creator of the pen.
        unsafe {
            self.buffer
                .write_column_unchecked(rect.x, rect.y, rect.height, self.native)
        }
    }

    fn clipped(&self, x: i64, y: i64, width: u64, height: u64) -> Option<Rect> {
        if width == 0 || height == 0 {
            return None;
        }

        if self.clip {
            Rect::clip(x, y, width, height, self.buffer.width(), self.buffer.height())
        } else {
            Some(Rect::new(x as u32, y as u32, width as u32, height as u32))
        }
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        (0..i64::from(self.buffer.width())).contains(&x)
            && (0..i64::from(self.buffer.height())).contains(&y)
    }

    /// The steps `t` in `0..=len` for which `start + sign * t` stays within `0..limit`.
    fn steps(&self, start: i64, sign: i64, len: u64, limit: u32) -> Option<(u64, u64)> {
        if !self.clip {
            return Some((0, len));
        }

        let last = i64::from(limit) - 1;
        let len = len as i64;
        let (first, end) = if sign > 0 {
            ((-start).max(0), len.min(last - start))
        } else {
            ((start - last).max(0), len.min(start))
        };

        (first <= end).then_some((first as u64, end as u64))
    }

    fn reach(&self, cx: i64, cy: i64) -> Option<Reach> {
        if !self.clip {
            return Some(Reach {
                x: Reach::ANY,
                y: Reach::ANY,
            });
        }

        Some(Reach {
            x: distances(cx, self.buffer.width())?,
            y: distances(cy, self.buffer.height())?,
        })
    }
}

/// The offsets from a center at which pixels land in the buffer, nearest and farthest per axis.
#[derive(Clone, Copy, Debug)]
struct Reach {
    x: (i64, i64),
    y: (i64, i64),
}

impl Reach {
    const ANY: (i64, i64) = (0, i64::MAX);

    /// The first step from `step` on whose offset lands in the buffer along either axis.
    fn next(&self, step: i64) -> Option<i64> {
        [self.x, self.y]
            .into_iter()
            .filter(|&(_, far)| step <= far)
            .map(|(near, _)| near.max(step))
            .min()
    }
}

fn distances(center: i64, len: u32) -> Option<(i64, i64)> {
    if len == 0 {
        return None;
    }

    let last = i64::from(len) - 1;
    let near = if center < 0 {
        -center
    } else {
        (center - last).max(0)
    };

    Some((near, center.abs().max((last - center).abs())))
}

/// The midpoint circle through one octant, from `(radius, 0)` up to the diagonal.
///
/// Clear of the diagonal, step `y` is at the largest `x` with `x² - x + y² < radius²`. A walk can
/// resume from any such step, so clipped shapes skip what lies outside of the buffer.
#[derive(Clone, Copy, Debug)]
struct Octant {
    r2: i128,
    x: i64,
    y: i64,
    err: i64,
}

impl Octant {
    fn new(radius: u32) -> Self {
        let x = i64::from(radius);
        Octant {
            r2: i128::from(x) * i128::from(x),
            x,
            y: 0,
            err: 1 - x,
        }
    }

    fn done(&self) -> bool {
        self.x < self.y
    }

    fn step(&mut self) {
        self.y += 1;
        if self.err < 0 {
            self.err += 2 * self.y + 1;
        } else {
            self.x -= 1;
            self.err += 2 * (self.y - self.x) + 1;
        }
    }

    /// The `x` of step `y`, if that step is clear of the diagonal.
    fn x_at(&self, y: i64) -> Option<i64> {
        let room = self.r2 - i128::from(y) * i128::from(y);
        let room = u128::try_from(room).ok().filter(|&room| room > 0)?;

        let mut x = (1 + (4 * room + 1).isqrt()) / 2;
        while x * (x - 1) >= room {
            x -= 1;
        }
        while (x + 1) * x < room {
            x += 1;
        }

        let x = x as i64;
        (x >= y + 3).then_some(x)
    }

    /// The last step at which the walk is at `x`.
    fn last_at(&self, x: i64) -> i64 {
        let x = i128::from(x);
        u128::try_from(self.r2 - x * x + x - 1).map_or(0, |room| room.isqrt() as i64)
    }

    /// Move ahead to step `y`, or to the last step before it that is clear of the diagonal.
    fn skip_to(&mut self, y: i64) {
        let (mut lo, mut hi) = (self.y, y);
        let mut landing = None;

        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            match self.x_at(mid) {
                Some(x) => {
                    landing = Some((x, mid));
                    lo = mid;
                }
                None => hi = mid - 1,
            }
        }

        if let Some((x, y)) = landing {
            let (wx, wy) = (i128::from(x), i128::from(y) + 1);
            self.err = (wx * wx - wx + wy * wy - self.r2) as i64;
            self.x = x;
            self.y = y;
        }
    }
}

impl<'pal, D: DerefMut<Target = [u8]>> PixelBuffer<'pal, D> {
    /// Set every pixel to a color.
    pub fn clear(&mut self, color: Color) -> Result<(), CanvasError> {
        let native = self.pack(color)?;
        self.fill(native);
        Ok(())
    }

    pub fn draw_horizontal_line(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), len.into(), 1);
        self.draw_clipped(bounds, color, |pen| pen.span(x.into(), y.into(), len.into()))
    }

    pub fn draw_horizontal_line_checked(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), len.into(), 1);
        self.draw_checked(bounds, color, |pen| pen.span(x.into(), y.into(), len.into()))
    }

    /// # Safety
    ///
    /// The pixels `x..x + len` of row `y` must be within the buffer.
    pub unsafe fn draw_horizontal_line_unchecked(&mut self, x: u32, y: u32, len: u32, native: Native) {
        self.write_span_unchecked(x, y, len, native)
    }

    pub fn draw_vertical_line(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), 1, len.into());
        self.draw_clipped(bounds, color, |pen| pen.column(x.into(), y.into(), len.into()))
    }

    pub fn draw_vertical_line_checked(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), 1, len.into());
        self.draw_checked(bounds, color, |pen| pen.column(x.into(), y.into(), len.into()))
    }

    /// # Safety
    ///
    /// The pixels `y..y + len` of column `x` must be within the buffer.
    pub unsafe fn draw_vertical_line_unchecked(&mut self, x: u32, y: u32, len: u32, native: Native) {
        self.write_column_unchecked(x, y, len, native)
    }

    /// Draw a line between two points, both inclusive.
    pub fn draw_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let (x0, y0, x1, y1) = (x0.into(), y0.into(), x1.into(), y1.into());
        let bounds = Bounds::corners(x0, y0, x1, y1);
        self.draw_clipped(Some(bounds), color, |pen| line(pen, x0, y0, x1, y1))
    }

    pub fn draw_line_checked(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let (x0, y0, x1, y1) = (x0.into(), y0.into(), x1.into(), y1.into());
        let bounds = Bounds::corners(x0, y0, x1, y1);
        self.draw_checked(Some(bounds), color, |pen| line(pen, x0, y0, x1, y1))
    }

    /// # Safety
    ///
    /// Both end points must be within the buffer.
    pub unsafe fn draw_line_unchecked(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, native: Native) {
        let mut pen = Pen::trusting(self, native);
        line(&mut pen, x0.into(), y0.into(), x1.into(), y1.into())
    }

    /// Draw the outline of a rectangle.
    pub fn draw_rectangle(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), width.into(), height.into());
        self.draw_clipped(bounds, color, |pen| outline(pen, bounds))
    }

    pub fn draw_rectangle_checked(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), width.into(), height.into());
        self.draw_checked(bounds, color, |pen| outline(pen, bounds))
    }

    /// # Safety
    ///
    /// The rectangle must be within the buffer.
    pub unsafe fn draw_rectangle_unchecked(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        native: Native,
    ) {
        let bounds = Bounds::new(x.into(), y.into(), width.into(), height.into());
        outline(&mut Pen::trusting(self, native), bounds)
    }

    pub fn fill_rectangle(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), width.into(), height.into());
        self.draw_clipped(bounds, color, |pen| solid(pen, bounds))
    }

    pub fn fill_rectangle_checked(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), width.into(), height.into());
        self.draw_checked(bounds, color, |pen| solid(pen, bounds))
    }

    /// # Safety
    ///
    /// The rectangle must be within the buffer.
    pub unsafe fn fill_rectangle_unchecked(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        native: Native,
    ) {
        for row in y..y + height {
            self.write_span_unchecked(x, row, width, native);
        }
    }

    /// Draw the outline of a circle with the midpoint algorithm.
    ///
    /// A radius of zero draws the center pixel.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), radius, radius);
        self.draw_clipped(Some(bounds), color, |pen| circle(pen, cx.into(), cy.into(), radius))
    }

    pub fn draw_circle_checked(
        &mut self,
        cx: i32,
        cy: i32,
        radius: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), radius, radius);
        self.draw_checked(Some(bounds), color, |pen| circle(pen, cx.into(), cy.into(), radius))
    }

    /// # Safety
    ///
    /// The bounding square of the circle must be within the buffer.
    pub unsafe fn draw_circle_unchecked(&mut self, cx: u32, cy: u32, radius: u32, native: Native) {
        circle(&mut Pen::trusting(self, native), cx.into(), cy.into(), radius)
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), radius, radius);
        self.draw_clipped(Some(bounds), color, |pen| disc(pen, cx.into(), cy.into(), radius))
    }

    pub fn fill_circle_checked(
        &mut self,
        cx: i32,
        cy: i32,
        radius: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), radius, radius);
        self.draw_checked(Some(bounds), color, |pen| disc(pen, cx.into(), cy.into(), radius))
    }

    /// # Safety
    ///
    /// The bounding square of the circle must be within the buffer.
    pub unsafe fn fill_circle_unchecked(&mut self, cx: u32, cy: u32, radius: u32, native: Native) {
        disc(&mut Pen::trusting(self, native), cx.into(), cy.into(), radius)
    }

    /// Draw the outline of an axis aligned ellipse with the two-region midpoint algorithm.
    ///
    /// With one radius zero the ellipse degenerates into a line.
    pub fn draw_ellipse(
        &mut self,
        cx: i32,
        cy: i32,
        rx: u32,
        ry: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), rx, ry);
        self.draw_clipped(Some(bounds), color, |pen| {
            ellipse(pen, cx.into(), cy.into(), rx, ry, false)
        })
    }

    pub fn draw_ellipse_checked(
        &mut self,
        cx: i32,
        cy: i32,
        rx: u32,
        ry: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), rx, ry);
        self.draw_checked(Some(bounds), color, |pen| {
            ellipse(pen, cx.into(), cy.into(), rx, ry, false)
        })
    }

    /// # Safety
    ///
    /// The bounding box of the ellipse must be within the buffer.
    pub unsafe fn draw_ellipse_unchecked(&mut self, cx: u32, cy: u32, rx: u32, ry: u32, native: Native) {
        ellipse(&mut Pen::trusting(self, native), cx.into(), cy.into(), rx, ry, false)
    }

    pub fn fill_ellipse(
        &mut self,
        cx: i32,
        cy: i32,
        rx: u32,
        ry: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), rx, ry);
        self.draw_clipped(Some(bounds), color, |pen| {
            ellipse(pen, cx.into(), cy.into(), rx, ry, true)
        })
    }

    pub fn fill_ellipse_checked(
        &mut self,
        cx: i32,
        cy: i32,
        rx: u32,
        ry: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), rx, ry);
        self.draw_checked(Some(bounds), color, |pen| {
            ellipse(pen, cx.into(), cy.into(), rx, ry, true)
        })
    }

    /// # Safety
    ///
    /// The bounding box of the ellipse must be within the buffer.
    pub unsafe fn fill_ellipse_unchecked(&mut self, cx: u32, cy: u32, rx: u32, ry: u32, native: Native) {
        ellipse(&mut Pen::trusting(self, native), cx.into(), cy.into(), rx, ry, true)
    }

    /// Draw a plus sign with arms of `arm` pixels around the center.
    pub fn draw_cross(&mut self, cx: i32, cy: i32, arm: u32, color: Color) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), arm, arm);
        self.draw_clipped(Some(bounds), color, |pen| cross(pen, cx.into(), cy.into(), arm))
    }

    pub fn draw_cross_checked(
        &mut self,
        cx: i32,
        cy: i32,
        arm: u32,
        color: Color,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::around(cx.into(), cy.into(), arm, arm);
        self.draw_checked(Some(bounds), color, |pen| cross(pen, cx.into(), cy.into(), arm))
    }

    /// # Safety
    ///
    /// The bounding square of the cross must be within the buffer.
    pub unsafe fn draw_cross_unchecked(&mut self, cx: u32, cy: u32, arm: u32, native: Native) {
        cross(&mut Pen::trusting(self, native), cx.into(), cy.into(), arm)
    }

    /// Copy the pixels of `src` to `(x, y)`, converting them to the format of this buffer.
    ///
    /// The part of `src` that falls outside of this buffer is skipped.
    pub fn copy_from<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        x: i32,
        y: i32,
    ) -> Result<(), CanvasError> {
        let Some((src_rect, dst_rect)) = self.clip_source(src, x, y) else {
            return Ok(());
        };

        self.copy_rect(src, src_rect, dst_rect)
    }

    pub fn copy_from_checked<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        x: i32,
        y: i32,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), src.width().into(), src.height().into());
        let Some(dst_rect) = self.check_bounds(bounds)? else {
            return Ok(());
        };

        let src_rect = Rect::with_size(src.width(), src.height());
        self.copy_rect(src, src_rect, dst_rect)
    }

    /// Composite the pixels of `src` over those at `(x, y)`.
    ///
    /// The part of `src` that falls outside of this buffer is skipped.
    pub fn blend_with<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        x: i32,
        y: i32,
    ) -> Result<(), CanvasError> {
        let Some((src_rect, dst_rect)) = self.clip_source(src, x, y) else {
            return Ok(());
        };

        self.blend_rect(src, src_rect, dst_rect)
    }

    pub fn blend_with_checked<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        x: i32,
        y: i32,
    ) -> Result<(), CanvasError> {
        let bounds = Bounds::new(x.into(), y.into(), src.width().into(), src.height().into());
        let Some(dst_rect) = self.check_bounds(bounds)? else {
            return Ok(());
        };

        let src_rect = Rect::with_size(src.width(), src.height());
        self.blend_rect(src, src_rect, dst_rect)
    }

    fn draw_clipped(
        &mut self,
        bounds: Option<Bounds>,
        color: Color,
        shape: impl FnOnce(&mut Pen<'_, 'pal, D>),
    ) -> Result<(), CanvasError> {
        let native = self.pack(color)?;

        let visible = bounds.and_then(|b| {
            Rect::clip(b.x, b.y, b.width, b.height, self.width(), self.height())
        });

        if visible.is_none() {
            log::trace!("Shape within {:?} is clipped entirely", bounds);
            return Ok(());
        }

        shape(&mut Pen::clipping(self, native));
        Ok(())
    }

    fn draw_checked(
        &mut self,
        bounds: Option<Bounds>,
        color: Color,
        shape: impl FnOnce(&mut Pen<'_, 'pal, D>),
    ) -> Result<(), CanvasError> {
        if self.check_bounds(bounds)?.is_none() {
            return Ok(());
        }

        let native = self.pack(color)?;
        // SAFETY: the shape is within its bounds, which are within the buffer.
        shape(&mut unsafe { Pen::trusting(self, native) });
        Ok(())
    }

    /// The bounds as a rectangle, if they are entirely within the buffer.
    ///
    /// Empty bounds are fine, there is nothing to draw.
    fn check_bounds(&self, bounds: Option<Bounds>) -> Result<Option<Rect>, CanvasError> {
        let Some(b) = bounds else {
            return Ok(None);
        };

        let (width, height) = (self.width(), self.height());
        let out_of_bounds = |x: i64, y: i64| CanvasError::out_of_bounds(x, y, width, height);

        if b.x < 0 || b.y < 0 {
            return Err(out_of_bounds(b.x, b.y));
        }

        // Both end points are within `i64` since the origin is non-negative.
        let x_end = b.x + (b.width - 1) as i64;
        let y_end = b.y + (b.height - 1) as i64;
        if x_end >= i64::from(width) || y_end >= i64::from(height) {
            return Err(out_of_bounds(x_end, y_end));
        }

        Ok(Some(Rect::new(
            b.x as u32,
            b.y as u32,
            b.width as u32,
            b.height as u32,
        )))
    }

    /// Clip a source placed at `(x, y)`, returning its visible part in both coordinate systems.
    fn clip_source<S: Deref<Target = [u8]>>(
        &self,
        src: &PixelBuffer<'_, S>,
        x: i32,
        y: i32,
    ) -> Option<(Rect, Rect)> {
        let (x, y) = (i64::from(x), i64::from(y));
        let dst = Rect::clip(
            x,
            y,
            src.width().into(),
            src.height().into(),
            self.width(),
            self.height(),
        );

        let Some(dst) = dst else {
            log::trace!("Source placed at ({}, {}) is clipped entirely", x, y);
            return None;
        };

        // The clipped part starts at or after the origin of the source.
        let src_rect = Rect::new(
            (i64::from(dst.x) - x) as u32,
            (i64::from(dst.y) - y) as u32,
            dst.width,
            dst.height,
        );

        Some((src_rect, dst))
    }

    fn copy_rect<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), CanvasError> {
        let src: PixelBufferRef<'_> = src.slice(src_rect)?;
        let mut dst: PixelBufferMut<'_> = self.slice_mut(dst_rect)?;
        BlitConverter::global().convert(&src, &mut dst)
    }

    fn blend_rect<S: Deref<Target = [u8]>>(
        &mut self,
        src: &PixelBuffer<'_, S>,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), CanvasError> {
        let (width, height) = (dst_rect.width, dst_rect.height);

        // Opaque source pixels come out exactly as a copy writes them. Into a direct format,
        // pixels of an indexed source decode through its palette either way.
        let copy = BlitConverter::global()
            .lookup(src.format(), self.format())
            .filter(|_| !src.format().is_indexed() || self.format().is_indexed());
        let mut pixel = [0u8; 8];
        let layout = BufferLayout::packed(self.format(), 1, 1)?;
        let mut copied: PixelBufferMut<'_> = match self.palette() {
            Some(palette) => PixelBuffer::with_palette(&mut pixel[..], layout, palette)?,
            None => PixelBuffer::new(&mut pixel[..], layout)?,
        };

        let mut blended = |dst: &Self, x: u32, y: u32| -> Option<Result<Native, CanvasError>> {
            let (sx, sy) = (src_rect.x + x, src_rect.y + y);
            let (dx, dy) = (dst_rect.x + x, dst_rect.y + y);
            // SAFETY: both rectangles are within their buffers.
            let color = unsafe { src.get_color_unchecked(sx, sy) };

            match (color.a, copy) {
                (0, _) => None,
                (0xff, Some(convert)) => Some(
                    src.slice(Rect::new(sx, sy, 1, 1))
                        .and_then(|from| convert(&from, &mut copied))
                        .and_then(|()| copied.get_native(0, 0)),
                ),
                _ => {
                    let under = unsafe { dst.get_color_unchecked(dx, dy) };
                    Some(dst.pack(source_over(color, under)))
                }
            }
        };

        if self.format().is_indexed() {
            // Every pixel must be in the palette before the first is written.
            log::debug!(
                "Staging {}x{} blended pixels for an indexed destination",
                width,
                height
            );

            let mut staged = Vec::with_capacity(width as usize * height as usize);
            for y in 0..height {
                for x in 0..width {
                    staged.push(blended(self, x, y).transpose()?);
                }
            }

            let positions = (0..height).flat_map(|y| (0..width).map(move |x| (x, y)));
            for ((x, y), native) in positions.zip(staged) {
                if let Some(native) = native {
                    // SAFETY: the rectangle is within the buffer.
                    unsafe { self.set_native_unchecked(dst_rect.x + x, dst_rect.y + y, native) };
                }
            }

            return Ok(());
        }

        for y in 0..height {
            for x in 0..width {
                if let Some(native) = blended(self, x, y).transpose()? {
                    // SAFETY: the rectangle is within the buffer.
                    unsafe { self.set_native_unchecked(dst_rect.x + x, dst_rect.y + y, native) };
                }
            }
        }

        Ok(())
    }
}

/// Bresenham's line, both end points inclusive.
fn line<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, x0: i64, y0: i64, x1: i64, y1: i64) {
    if y0 == y1 {
        return pen.span_between(x0, x1, y0);
    }

    if x0 == x1 {
        return pen.column(x0, y0.min(y1), y0.abs_diff(y1) + 1);
    }

    let (dx, dy) = (x0.abs_diff(x1), y0.abs_diff(y1));
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (width, height) = (pen.buffer.width(), pen.buffer.height());

    if dx >= dy {
        let Some(steps) = pen.steps(x0, sx, dx, width) else {
            return;
        };
        walk(steps, dx, dy, |t, m| pen.pixel(x0 + sx * t, y0 + sy * m));
    } else {
        let Some(steps) = pen.steps(y0, sy, dy, height) else {
            return;
        };
        walk(steps, dy, dx, |t, m| pen.pixel(x0 + sx * m, y0 + sy * t));
    }
}

/// Walk a line along its major axis from step `first` to `last`, both inclusive.
///
/// Step `t` is at `t * minor / major` on the minor axis, with halves rounded up.
fn walk((first, last): (u64, u64), major: u64, minor: u64, mut plot: impl FnMut(i64, i64)) {
    let scaled = 2 * u128::from(minor) * u128::from(first) + u128::from(major);
    let twice = 2 * u128::from(major);
    let mut offset = (scaled / twice) as i64;
    let mut rem = (scaled % twice) as u64;

    let (step, twice) = (2 * minor, 2 * major);
    for t in first..=last {
        plot(t as i64, offset);
        rem += step;
        if rem >= twice {
            rem -= twice;
            offset += 1;
        }
    }
}

fn outline<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, bounds: Option<Bounds>) {
    let Some(Bounds {
        x,
        y,
        width,
        height,
    }) = bounds
    else {
        return;
    };

    pen.span(x, y, width);
    if height > 1 {
        pen.span(x, y + (height - 1) as i64, width);
    }

    // The sides, without the corners drawn above.
    if height > 2 {
        pen.column(x, y + 1, height - 2);
        if width > 1 {
            pen.column(x + (width - 1) as i64, y + 1, height - 2);
        }
    }
}

fn solid<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, bounds: Option<Bounds>) {
    let Some(b) = bounds else {
        return;
    };

    // Clip once, instead of every row.
    let Some(rect) = pen.clipped(b.x, b.y, b.width, b.height) else {
        return;
    };

    for row in rect.y..rect.y + rect.height {
        pen.span(rect.x.into(), row.into(), rect.width.into());
    }
}

/// Midpoint circle, drawing the eight symmetric octants at once.
fn circle<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, cx: i64, cy: i64, radius: u32) {
    let Some(reach) = pen.reach(cx, cy) else {
        return;
    };

    let mut octant = Octant::new(radius);
    while !octant.done() {
        let Some(next) = reach.next(octant.y) else {
            break;
        };
        octant.skip_to(next);

        let Octant { x, y, .. } = octant;
        pen.pixel(cx + x, cy + y);
        pen.pixel(cx + y, cy + x);
        pen.pixel(cx - y, cy + x);
        pen.pixel(cx - x, cy + y);
        pen.pixel(cx - x, cy - y);
        pen.pixel(cx - y, cy - x);
        pen.pixel(cx + y, cy - x);
        pen.pixel(cx + x, cy - y);
        octant.step();
    }
}

/// Midpoint circle, filling spans between the symmetric points of each step.
fn disc<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, cx: i64, cy: i64, radius: u32) {
    let Some(reach) = pen.reach(cx, cy) else {
        return;
    };
    let (near, far) = reach.y;

    let mut octant = Octant::new(radius);
    while !octant.done() {
        // Rows at `±x` only matter at the last step before `x` moves on, where they are widest.
        let rows_at_y = (octant.y <= far).then(|| octant.y.max(near));
        let rows_at_x = match octant.x {
            x if x > far => Some(octant.last_at(far)),
            x if x >= near => Some(octant.last_at(x)),
            _ => None,
        };
        let Some(next) = rows_at_y.into_iter().chain(rows_at_x).min() else {
            break;
        };
        octant.skip_to(next);

        let Octant { x, y, .. } = octant;
        pen.span_between(cx - x, cx + x, cy + y);
        pen.span_between(cx - x, cx + x, cy - y);
        octant.step();

        if octant.x != x || octant.done() {
            pen.span_between(cx - y, cx + y, cy + x);
            pen.span_between(cx - y, cx + y, cy - x);
        }
    }
}

/// Two-region midpoint ellipse, in integers scaled by four.
///
/// The first region steps along `x` while the slope is shallow, the second along `y`.
fn ellipse<D: DerefMut<Target = [u8]>>(
    pen: &mut Pen<'_, '_, D>,
    cx: i64,
    cy: i64,
    rx: u32,
    ry: u32,
    filled: bool,
) {
    if ry == 0 {
        let rx = i64::from(rx);
        return pen.span_between(cx - rx, cx + rx, cy);
    }

    if rx == 0 {
        let ry = i64::from(ry);
        return pen.column(cx, cy - ry, 2 * ry as u64 + 1);
    }

    let quadrants = |pen: &mut Pen<'_, '_, D>, x: i64, y: i64| {
        if filled {
            pen.span_between(cx - x, cx + x, cy + y);
            pen.span_between(cx - x, cx + x, cy - y);
        } else {
            pen.pixel(cx + x, cy + y);
            pen.pixel(cx - x, cy + y);
            pen.pixel(cx + x, cy - y);
            pen.pixel(cx - x, cy - y);
        }
    };

    let rx2 = i128::from(rx) * i128::from(rx);
    let ry2 = i128::from(ry) * i128::from(ry);

    let mut x = 0i64;
    let mut y = i64::from(ry);
    let mut px = 0i128;
    let mut py = 2 * rx2 * i128::from(y);

    let mut d1 = 4 * ry2 - 4 * rx2 * i128::from(y) + rx2;
    while px < py {
        quadrants(pen, x, y);
        x += 1;
        px += 2 * ry2;
        if d1 < 0 {
            d1 += 4 * (ry2 + px);
        } else {
            y -= 1;
            py -= 2 * rx2;
            d1 += 4 * (ry2 + px - py);
        }
    }

    // Taken from the last decision of the first region, which keeps every term cubic in the radii.
    let mut d2 = d1 - ry2 * (4 * i128::from(x) + 3) + rx2 * (3 - 4 * i128::from(y));
    while y >= 0 {
        quadrants(pen, x, y);
        y -= 1;
        py -= 2 * rx2;
        if d2 > 0 {
            d2 += 4 * (rx2 - py);
        } else {
            x += 1;
            px += 2 * ry2;
            d2 += 4 * (rx2 - py + px);
        }
    }
}

fn cross<D: DerefMut<Target = [u8]>>(pen: &mut Pen<'_, '_, D>, cx: i64, cy: i64, arm: u32) {
    let arm = i64::from(arm);
    pen.span_between(cx - arm, cx + arm, cy);
    pen.column(cx, cy - arm, 2 * arm as u64 + 1);
}
