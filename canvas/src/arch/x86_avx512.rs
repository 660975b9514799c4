// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use core::arch::x86_64::{__m128i, __m256i, __m512i};

use pixbuf_texel::AsTexel;

use super::SplatFill;

#[target_feature(enable = "avx512f")]
pub unsafe fn fill(dst: *mut u8, pattern: &[u8], count: usize) {
    let Some(mut fill) = SplatFill::new(dst, pattern, count) else {
        return super::fill_irregular(dst, pattern, count);
    };

    fill.tier(__m512i::texel());
    fill.tier(__m256i::texel());
    fill.tier(__m128i::texel());
    fill.tier(u64::texel());
    fill.finish();
}
