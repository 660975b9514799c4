// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Filling runs of pixels with one repeating pattern.
//!
//! The engine knows nothing about pixel formats. It fills `count` contiguous elements of some
//! byte width with the same bytes, using the widest registers the cpu offers.
#![allow(unsafe_code)]
use core::fmt;
use std::sync::OnceLock;

use crate::arch;

/// A register width the fill engine can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Machine words and single elements.
    Scalar,
    /// 128-bit registers on x86.
    Sse2,
    /// 256-bit registers on x86.
    Avx,
    /// 512-bit registers on x86_64.
    Avx512,
    /// 128-bit registers on aarch64.
    Neon,
}

type RawFill = unsafe fn(*mut u8, &[u8], usize);

/// The strategy for filling runs of elements.
///
/// All strategies produce the same bytes, they differ only in the instructions used.
#[derive(Clone, Copy)]
pub struct FillOps {
    tier: Tier,
    fill: RawFill,
}

impl FillOps {
    /// The strategy that works on every cpu.
    pub fn scalar() -> Self {
        FillOps {
            tier: Tier::Scalar,
            fill: arch::fill_portable,
        }
    }

    /// Upgrade to the widest tier the cpu supports.
    ///
    /// With the `runtime-features` feature this queries the cpu, otherwise it only considers the
    /// features enabled at compile time.
    pub fn with_arch(mut self) -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if arch::x86_feature!("sse2") {
            self = self.upgrade(Tier::Sse2, arch::x86_sse2::fill);
        }

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if arch::x86_feature!("avx") {
            self = self.upgrade(Tier::Avx, arch::x86_avx::fill);
        }

        #[cfg(target_arch = "x86_64")]
        if arch::x86_feature!("avx512f") {
            self = self.upgrade(Tier::Avx512, arch::x86_avx512::fill);
        }

        #[cfg(target_arch = "aarch64")]
        if arch::aarch64_feature!("neon") {
            self = self.upgrade(Tier::Neon, arch::aarch64_neon::fill);
        }

        self
    }

    /// The widest strategy of this process, detected once.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<FillOps> = OnceLock::new();

        *DETECTED.get_or_init(|| {
            let ops = FillOps::scalar().with_arch();
            log::debug!("Filling pixels with the {:?} tier", ops.tier);
            ops
        })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Fill the slice with repetitions of `pattern`.
    ///
    /// This writes `dst.len() / pattern.len()` whole elements, trailing bytes that do not make up
    /// a whole element are left untouched. An empty pattern writes nothing.
    pub fn fill(&self, dst: &mut [u8], pattern: &[u8]) {
        if pattern.is_empty() {
            return;
        }

        let count = dst.len() / pattern.len();
        // SAFETY: `count` elements of the pattern fit into `dst` by construction.
        unsafe { self.fill_raw(dst.as_mut_ptr(), pattern, count) }
    }

    /// Fill `count` elements of `pattern.len()` bytes each, starting at `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `count * pattern.len()` bytes, and these bytes must not
    /// overlap the pattern.
    pub unsafe fn fill_raw(&self, dst: *mut u8, pattern: &[u8], count: usize) {
        if count == 0 || pattern.is_empty() {
            return;
        }

        (self.fill)(dst, pattern, count)
    }

    #[allow(unused)]
    fn upgrade(self, tier: Tier, fill: RawFill) -> Self {
        FillOps { tier, fill }
    }
}

impl Default for FillOps {
    fn default() -> Self {
        FillOps::scalar()
    }
}

impl fmt::Debug for FillOps {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FillOps").field("tier", &self.tier).finish()
    }
}

/// Fill the slice with repetitions of `pattern`, one element at a time.
///
/// The plain loop all other strategies are measured against.
pub fn fill_reference(dst: &mut [u8], pattern: &[u8]) {
    if pattern.is_empty() {
        return;
    }

    for element in dst.chunks_exact_mut(pattern.len()) {
        element.copy_from_slice(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_ops() -> Vec<FillOps> {
        let mut ops = vec![FillOps::scalar(), FillOps::detect()];
        ops.dedup_by_key(|ops| ops.tier());
        ops
    }

    #[test]
    fn detection_is_stable() {
        assert_eq!(FillOps::detect().tier(), FillOps::detect().tier());
        assert_eq!(FillOps::default().tier(), Tier::Scalar);
    }

    #[test]
    fn unaligned_starts() {
        let pattern = [1u8, 2, 3, 4, 5, 6, 7, 8];

        for ops in all_ops() {
            for width in [1, 2, 3, 4, 6, 8] {
                for start in 0..8 {
                    let mut memory = [0u8; 300];
                    let mut expected = [0u8; 300];
                    let end = memory.len() - 5;

                    ops.fill(&mut memory[start..end], &pattern[..width]);
                    fill_reference(&mut expected[start..end], &pattern[..width]);

                    assert_eq!(memory, expected, "{:?} width {} at {}", ops, width, start);
                }
            }
        }
    }

    #[test]
    fn odd_widths_fall_back() {
        let pattern = [9u8, 8, 7, 6, 5];
        let mut memory = [0u8; 23];

        FillOps::detect().fill(&mut memory, &pattern);
        assert_eq!(memory[..20], pattern.repeat(4)[..]);
        assert_eq!(memory[20..], [0, 0, 0]);
    }

    #[test]
    fn empty_fills() {
        let mut memory = [7u8; 4];
        FillOps::detect().fill(&mut memory, &[]);
        FillOps::detect().fill(&mut memory[..0], &[1]);
        unsafe { FillOps::detect().fill_raw(memory.as_mut_ptr(), &[1, 2], 0) };
        assert_eq!(memory, [7; 4]);
    }
}
