// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Porter-Duff compositing of straight alpha colors.
use crate::color::Color;

/// Composite `src` over `dst`.
///
/// A transparent source leaves the destination as it is, an opaque one replaces it. In between,
/// each channel is the average of both weighted by their contribution to the resulting alpha.
/// Everything is computed in integers, rounded to nearest.
pub fn source_over(src: Color, dst: Color) -> Color {
    match src.a {
        0 => return dst,
        0xff => return src,
        _ => {}
    }

    let sa = u32::from(src.a);
    let da_w = u32::from(dst.a) * (255 - sa);
    let out_w = sa * 255 + da_w;

    if out_w == 0 {
        return Color::TRANSPARENT;
    }

    let channel = |s: u8, d: u8| {
        let weighted = u32::from(s) * sa * 255 + u32::from(d) * da_w;
        ((weighted + out_w / 2) / out_w) as u8
    };

    Color {
        r: channel(src.r, dst.r),
        g: channel(src.g, dst.g),
        b: channel(src.b, dst.b),
        a: ((out_w + 127) / 255) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes() {
        let dst = Color::rgba(10, 20, 30, 40);
        assert_eq!(source_over(Color::rgba(0xff, 0xff, 0xff, 0), dst), dst);
        assert_eq!(source_over(Color::RED, dst), Color::RED);
        assert_eq!(source_over(Color::rgba(1, 2, 3, 4), Color::TRANSPARENT), Color::rgba(1, 2, 3, 4));
    }

    #[test]
    fn half_over_opaque() {
        let out = source_over(Color::rgba(0xff, 0, 0, 0x80), Color::BLUE);
        assert_eq!(out, Color::rgba(0x80, 0, 0x7f, 0xff));
    }

    #[test]
    fn half_over_half() {
        let out = source_over(Color::rgba(0xff, 0xff, 0xff, 0x80), Color::rgba(0, 0, 0, 0x80));
        // Alpha is 1 - (1 - 0.5)², the source has two thirds of the weight.
        assert_eq!(out.a, 0xc0);
        assert_eq!(out.r, 0xaa);
    }
}
