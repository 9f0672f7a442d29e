//! Info-document size pyramid
//!
//! Halve the native size repeatedly while both dimensions stay at or above
//! the 64-pixel floor, then emit ascending (smallest first) the way
//! progressive viewers expect. The native size itself is not an entry.

use ikona_core::Dimensions;

const MIN_SIZE: u32 = 64;

pub fn size_pyramid(native: Dimensions) -> Vec<Dimensions> {
    let mut sizes = Vec::new();
    let (mut width, mut height) = (native.width / 2, native.height / 2);
    while width >= MIN_SIZE && height >= MIN_SIZE {
        sizes.push(Dimensions::new(width, height));
        width /= 2;
        height /= 2;
    }
    sizes.reverse();
    sizes
}
