//! Post-Processing Chain
//!
//! Runs only on output that passed integrity validation, in this order:
//! harmonize, snap, denoise, purify, outline. Each stage consumes its
//! buffer and returns it.

use crate::extract::extract_palette;
use crate::pixels::{PixelData, Rgb};

const NEIGHBORS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Nearest palette entry by squared RGB distance; the earliest entry wins
/// ties.
fn nearest(palette: &[Rgb], rgb: Rgb) -> Rgb {
    let distance = |p: &Rgb| -> u32 {
        p.iter()
            .zip(rgb.iter())
            .map(|(&a, &b)| {
                let d = i32::from(a) - i32::from(b);
                (d * d) as u32
            })
            .sum()
    };

    let mut best = palette[0];
    let mut best_dist = distance(&best);
    for p in &palette[1..] {
        let dist = distance(p);
        if dist < best_dist {
            best = *p;
            best_dist = dist;
        }
    }
    best
}

/// Recolor every pixel with alpha > 0 to its nearest palette entry.
/// An empty palette leaves the image untouched.
pub fn palette_normalize(mut img: PixelData, palette: &[Rgb]) -> PixelData {
    if palette.is_empty() {
        return img;
    }
    for px in img.data_mut().chunks_exact_mut(4) {
        if px[3] > 0 {
            let [r, g, b] = nearest(palette, [px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }
    img
}

/// Pull `generated` back onto `target`, or onto the base's own palette
/// when no target is given.
pub fn harmonize_palette(base: &PixelData, generated: PixelData, target: Option<&[Rgb]>) -> PixelData {
    match target {
        Some(palette) => palette_normalize(generated, palette),
        None => palette_normalize(generated, &extract_palette(base)),
    }
}

/// Round RGB to the nearest multiple of `step` (half rounds up, clamped to
/// 255). Alpha above `alpha_high` becomes 255 and below `alpha_low` becomes
/// 0; the band in between is left for the purifier.
pub fn snap_pixels(mut img: PixelData, step: u8, alpha_high: u8, alpha_low: u8) -> PixelData {
    let step = u16::from(step.max(1));
    let snap = |v: u8| -> u8 {
        let rounded = (u16::from(v) + step / 2) / step * step;
        rounded.min(255) as u8
    };

    for px in img.data_mut().chunks_exact_mut(4) {
        px[0] = snap(px[0]);
        px[1] = snap(px[1]);
        px[2] = snap(px[2]);
        if px[3] > alpha_high {
            px[3] = 255;
        } else if px[3] < alpha_low {
            px[3] = 0;
        }
    }
    img
}

/// Zero the alpha of opaque interior pixels with no opaque 4-neighbor.
/// The outermost ring of pixels is not scanned.
pub fn clean_noise(mut img: PixelData) -> PixelData {
    let (width, height) = img.dimensions();
    if width < 3 || height < 3 {
        return img;
    }

    let mut isolated = Vec::new();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if img.alpha(x, y) == 0 {
                continue;
            }
            let has_neighbor = NEIGHBORS.iter().any(|&(dx, dy)| {
                img.alpha((x as i64 + dx) as u32, (y as i64 + dy) as u32) > 0
            });
            if !has_neighbor {
                isolated.push(img.offset(x, y));
            }
        }
    }

    let data = img.data_mut();
    for i in isolated {
        data[i + 3] = 0;
    }
    img
}

/// Binary alpha: at or above `threshold` becomes 255, the rest 0.
pub fn transparency_purifier(mut img: PixelData, threshold: u8) -> PixelData {
    for px in img.data_mut().chunks_exact_mut(4) {
        px[3] = if px[3] >= threshold { 255 } else { 0 };
    }
    img
}

/// Paint every opaque pixel that touches a transparent pixel or the canvas
/// edge with `color` at full alpha. Neighbors are judged on the input, not
/// on pixels already recolored.
pub fn outline_unifier(mut img: PixelData, color: Rgb) -> PixelData {
    let (width, height) = img.dimensions();

    let mut border = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if img.alpha(x, y) == 0 {
                continue;
            }
            let is_edge = NEIGHBORS.iter().any(|&(dx, dy)| {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    return true;
                }
                img.alpha(nx as u32, ny as u32) == 0
            });
            if is_edge {
                border.push((x, y));
            }
        }
    }

    for (x, y) in border {
        img.set_pixel(x, y, [color[0], color[1], color[2], 255]);
    }
    img
}
