// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Register-width stores backing the fill engine.
//!
//! The per-architecture modules each provide one entry point with the signature of
//! [`fill_portable`], compiled with their target features enabled. They share the loop bodies
//! defined here, which are `#[inline(always)]` so that they are compiled for the features of the
//! function they end up in.
#![allow(unsafe_code)]
use core::ptr;

use pixbuf_texel::{AsTexel, Texel};

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64_neon;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) mod x86_avx;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx512;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) mod x86_sse2;

/// Check for a cpu feature, at runtime when `runtime-features` is enabled.
///
/// Without runtime detection only the features enabled at compile time count.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
macro_rules! x86_feature {
    ($feature:tt) => {{
        #[cfg(feature = "runtime-features")]
        let detected = std::is_x86_feature_detected!($feature);
        #[cfg(not(feature = "runtime-features"))]
        let detected = cfg!(target_feature = $feature);
        detected
    }};
}

#[cfg(target_arch = "aarch64")]
macro_rules! aarch64_feature {
    ($feature:tt) => {{
        #[cfg(feature = "runtime-features")]
        let detected = std::arch::is_aarch64_feature_detected!($feature);
        #[cfg(not(feature = "runtime-features"))]
        let detected = cfg!(target_feature = $feature);
        detected
    }};
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) use x86_feature;

#[cfg(target_arch = "aarch64")]
pub(crate) use aarch64_feature;

/// The widest element we can replicate into a splat.
const SPLAT: usize = 64;

/// A fill of elements whose width evenly divides every register width.
///
/// The pattern is replicated into 64 bytes once. Each tier then stores whole registers of it,
/// four at a time, until fewer elements remain than fit into one of its registers. Smaller tiers
/// take over from there and the final few elements are copied one by one.
pub(crate) struct SplatFill<'pat> {
    dst: *mut u8,
    remaining: usize,
    pattern: &'pat [u8],
    splat: [u8; SPLAT],
}

impl<'pat> SplatFill<'pat> {
    /// Prepare a fill, or `None` if the element width does not divide the register widths.
    #[inline(always)]
    pub(crate) fn new(dst: *mut u8, pattern: &'pat [u8], count: usize) -> Option<Self> {
        if !matches!(pattern.len(), 1 | 2 | 4 | 8) {
            return None;
        }

        let mut splat = [0u8; SPLAT];
        for chunk in splat.chunks_exact_mut(pattern.len()) {
            chunk.copy_from_slice(pattern);
        }

        Some(SplatFill {
            dst,
            remaining: count,
            pattern,
            splat,
        })
    }

    /// Store as many registers of type `R` as fit into the remaining elements.
    ///
    /// # Safety
    ///
    /// The destination must be valid for writes of all remaining elements. The instructions for
    /// reading and writing `R` must be available.
    #[inline(always)]
    pub(crate) unsafe fn tier<R>(&mut self, texel: Texel<R>) {
        let width = self.pattern.len();
        let per_reg = texel.size() / width;
        let Some(reg) = texel.read_unaligned(&self.splat[..texel.size()]) else {
            return;
        };

        let mut regs = self.remaining / per_reg;
        let mut ptr = self.dst as *mut R;

        while regs >= 4 {
            ptr::write_unaligned(ptr, texel.copy_val(&reg));
            ptr::write_unaligned(ptr.add(1), texel.copy_val(&reg));
            ptr::write_unaligned(ptr.add(2), texel.copy_val(&reg));
            ptr::write_unaligned(ptr.add(3), texel.copy_val(&reg));
            ptr = ptr.add(4);
            regs -= 4;
        }

        while regs > 0 {
            ptr::write_unaligned(ptr, texel.copy_val(&reg));
            ptr = ptr.add(1);
            regs -= 1;
        }

        self.dst = ptr as *mut u8;
        // The element count is a power of two, what is left is below it.
        self.remaining &= per_reg - 1;
    }

    /// Copy the elements that no register covered.
    ///
    /// # Safety
    ///
    /// The destination must be valid for writes of all remaining elements.
    #[inline(always)]
    pub(crate) unsafe fn finish(self) {
        fill_elements(self.dst, self.pattern, self.remaining)
    }
}

/// The scalar tier: machine words, then single elements.
///
/// # Safety
///
/// `dst` must be valid for writes of `count * pattern.len()` bytes.
pub(crate) unsafe fn fill_portable(dst: *mut u8, pattern: &[u8], count: usize) {
    match SplatFill::new(dst, pattern, count) {
        Some(mut fill) => {
            fill.tier(u64::texel());
            fill.finish();
        }
        None => fill_irregular(dst, pattern, count),
    }
}

/// Fill elements whose width does not divide the register widths.
///
/// # Safety
///
/// `dst` must be valid for writes of `count * pattern.len()` bytes.
#[inline(always)]
pub(crate) unsafe fn fill_irregular(dst: *mut u8, pattern: &[u8], count: usize) {
    match pattern.len() {
        3 => fill_lcm::<u32, 3>(dst, pattern, count),
        6 => fill_lcm::<u64, 6>(dst, pattern, count),
        _ => fill_elements(dst, pattern, count),
    }
}

/// Fill using a pattern of four elements that spans exactly three words of type `W`.
///
/// Elements are first written one at a time until the destination is aligned to `W`. A
/// destination that can not reach alignment by whole elements is written unaligned.
#[inline(always)]
unsafe fn fill_lcm<W: AsTexel, const N: usize>(mut dst: *mut u8, pattern: &[u8], count: usize) {
    let texel = W::texel();
    debug_assert_eq!(pattern.len(), N);
    debug_assert_eq!(4 * N, 3 * texel.size());

    let mut remaining = count;
    let mut steps = 0;
    while remaining > 0 && steps < 4 && (dst as usize) % texel.align() != 0 {
        ptr::copy_nonoverlapping(pattern.as_ptr(), dst, N);
        dst = dst.add(N);
        remaining -= 1;
        steps += 1;
    }

    let mut lcm = [0u8; 24];
    for chunk in lcm[..4 * N].chunks_exact_mut(N) {
        chunk.copy_from_slice(pattern);
    }

    let size = texel.size();
    let (Some(w0), Some(w1), Some(w2)) = (
        texel.read_unaligned(&lcm[..]),
        texel.read_unaligned(&lcm[size..]),
        texel.read_unaligned(&lcm[2 * size..]),
    ) else {
        return fill_elements(dst, pattern, remaining);
    };

    let mut ptr = dst as *mut W;
    let mut groups = remaining / 4;
    while groups > 0 {
        ptr::write_unaligned(ptr, texel.copy_val(&w0));
        ptr::write_unaligned(ptr.add(1), texel.copy_val(&w1));
        ptr::write_unaligned(ptr.add(2), texel.copy_val(&w2));
        ptr = ptr.add(3);
        groups -= 1;
    }

    fill_elements(ptr as *mut u8, pattern, remaining & 3);
}

/// Copy the pattern element by element.
#[inline(always)]
unsafe fn fill_elements(mut dst: *mut u8, pattern: &[u8], count: usize) {
    for _ in 0..count {
        ptr::copy_nonoverlapping(pattern.as_ptr(), dst, pattern.len());
        dst = dst.add(pattern.len());
    }
}
