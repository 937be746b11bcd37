//! Cleanup Stage - alpha thresholding and background isolation

use crate::pixels::{PixelData, Rgb};

/// Canonical technical magenta used as the generator's background key.
pub const KEY_MAGENTA: Rgb = [255, 0, 255];

/// Zero all four channels of every pixel with alpha below `threshold`.
pub fn alpha_clean(mut img: PixelData, threshold: u8) -> PixelData {
    for px in img.data_mut().chunks_exact_mut(4) {
        if px[3] < threshold {
            px.fill(0);
        }
    }
    img
}

/// Make background pixels transparent.
///
/// Two references are matched: the color sampled at `(0, 0)` and the key
/// color. A pixel matches when every channel differs by strictly less than
/// `tolerance`. Only alpha is touched; RGB is left as-is.
pub fn isolate_background(mut img: PixelData, key: Rgb, tolerance: u8) -> PixelData {
    let corner = img.pixel(0, 0);
    let corner: Rgb = [corner[0], corner[1], corner[2]];

    for px in img.data_mut().chunks_exact_mut(4) {
        let rgb = [px[0], px[1], px[2]];
        if within(rgb, key, tolerance) || within(rgb, corner, tolerance) {
            px[3] = 0;
        }
    }
    img
}

#[inline]
fn within(a: Rgb, b: Rgb, tolerance: u8) -> bool {
    a.iter().zip(b.iter()).all(|(&x, &y)| x.abs_diff(y) < tolerance)
}
