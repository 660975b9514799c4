// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers

/// An axis aligned rectangle of pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle at the origin, covering a whole `width`×`height` matrix.
    pub const fn with_size(width: u32, height: u32) -> Self {
        Rect::new(0, 0, width, height)
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether all of the rectangle lies within a `width`×`height` matrix.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }

    /// Clip a rectangle with signed origin to a `width`×`height` matrix.
    ///
    /// Returns `None` if nothing of the rectangle remains.
    pub fn clip(x: i64, y: i64, w: u64, h: u64, width: u32, height: u32) -> Option<Self> {
        let (x0, x1) = clip_span(x, w, width)?;
        let (y0, y1) = clip_span(y, h, height)?;
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Intersect `[start, start + len)` with `[0, bound)`.
fn clip_span(start: i64, len: u64, bound: u32) -> Option<(u32, u32)> {
    let end = i128::from(start) + i128::from(len);
    let lo = i128::from(start).max(0);
    let hi = end.min(i128::from(bound));

    if lo >= hi {
        return None;
    }

    // Both are within `0..=bound` now.
    Some((lo as u32, hi as u32))
}

#[test]
fn clipping() {
    assert_eq!(Rect::clip(-2, -2, 4, 4, 8, 8), Some(Rect::new(0, 0, 2, 2)));
    assert_eq!(Rect::clip(6, 7, 4, 4, 8, 8), Some(Rect::new(6, 7, 2, 1)));
    assert_eq!(Rect::clip(8, 0, 4, 4, 8, 8), None);
    assert_eq!(Rect::clip(-4, 0, 4, 4, 8, 8), None);
    assert_eq!(Rect::clip(0, 0, 0, 4, 8, 8), None);
}
