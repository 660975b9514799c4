// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use core::arch::aarch64::uint8x16_t;

use pixbuf_texel::AsTexel;

use super::SplatFill;

#[target_feature(enable = "neon")]
pub unsafe fn fill(dst: *mut u8, pattern: &[u8], count: usize) {
    let Some(mut fill) = SplatFill::new(dst, pattern, count) else {
        return super::fill_irregular(dst, pattern, count);
    };

    fill.tier(uint8x16_t::texel());
    fill.tier(u64::texel());
    fill.finish();
}
