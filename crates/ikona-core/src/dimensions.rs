//! Pixel dimension types
//!
//! `Dimensions` is the width/height pair used everywhere: native size,
//! pyramid levels, resolved output sizes, and info-document `sizes` entries
//! (hence the serde derive).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Level `k` of the resolution pyramid: each level is exactly half the
    /// linear scale of the previous, truncated toward zero.
    pub fn pyramid_level(&self, k: u32) -> Dimensions {
        Dimensions {
            width: self.width >> k,
            height: self.height >> k,
        }
    }
}

/// Derive a full pyramid: index 0 is the native size, entries 1..pages are
/// successive halvings. Widths and heights are non-increasing by
/// construction.
pub fn pyramid(native: Dimensions, pages: u32) -> Vec<Dimensions> {
    (0..pages.max(1)).map(|k| native.pyramid_level(k)).collect()
}
