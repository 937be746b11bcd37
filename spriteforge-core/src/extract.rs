//! Feature Extractors
//!
//! Read-only measurements taken from a cleaned sprite: palette, silhouette,
//! coarse skeleton, perceptual identity hash and anatomical band ratios.
//! Nothing here mutates its input.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::pixels::{Mask, Palette, PixelData, Rgb};

const HASH_GRID: u32 = 8;

/// Scanline height fractions for head, shoulders, hips, knees and feet.
pub const SKELETON_ROWS: [f64; 5] = [0.15, 0.30, 0.55, 0.75, 0.95];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Five scanline centroids. Approximate; good enough for pose drift checks,
/// not for rigging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub head: Point,
    pub shoulders: Point,
    pub hips: Point,
    pub knees: Point,
    pub feet: Point,
}

impl Skeleton {
    pub fn joints(&self) -> [(&'static str, Point); 5] {
        [
            ("head", self.head),
            ("shoulders", self.shoulders),
            ("hips", self.hips),
            ("knees", self.knees),
            ("feet", self.feet),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub head: f64,
    pub bust: f64,
    pub hip: f64,
}

/// Unique RGB of every pixel with alpha > 0, in row-major first-seen order.
pub fn extract_palette(img: &PixelData) -> Palette {
    let mut seen: HashSet<Rgb> = HashSet::new();
    let mut palette = Vec::new();

    for px in img.data().chunks_exact(4) {
        if px[3] > 0 {
            let rgb = [px[0], px[1], px[2]];
            if seen.insert(rgb) {
                palette.push(rgb);
            }
        }
    }
    palette
}

/// 255 where alpha > 0, else 0.
pub fn build_silhouette_mask(img: &PixelData) -> Mask {
    let mut mask = Mask::zeroed(img.width(), img.height());
    for (m, px) in mask.as_mut_slice().iter_mut().zip(img.data().chunks_exact(4)) {
        *m = if px[3] > 0 { 255 } else { 0 };
    }
    mask
}

/// Interior pixels whose alpha differs by more than 20 from the right or
/// lower neighbor. The outer border is never marked.
pub fn build_edge_map(img: &PixelData) -> Mask {
    let (width, height) = img.dimensions();
    let mut edges = Mask::zeroed(width, height);
    if width < 3 || height < 3 {
        return edges;
    }

    let out = edges.as_mut_slice();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let alpha = img.alpha(x, y);
            let right = img.alpha(x + 1, y);
            let down = img.alpha(x, y + 1);
            if alpha.abs_diff(right) > 20 || alpha.abs_diff(down) > 20 {
                out[(y * width + x) as usize] = 255;
            }
        }
    }
    edges
}

pub fn detect_skeleton(img: &PixelData) -> Skeleton {
    let point = |fraction: f64| {
        let y = (img.height() as f64 * fraction).floor() as u32;
        Point {
            x: row_centroid(img, y),
            y: y as f64,
        }
    };

    let [head, shoulders, hips, knees, feet] = SKELETON_ROWS.map(point);
    Skeleton { head, shoulders, hips, knees, feet }
}

/// Mean x of active pixels on row `y`, or the canvas center when the row is
/// empty or out of range.
fn row_centroid(img: &PixelData, y: u32) -> f64 {
    let fallback = img.width() as f64 / 2.0;
    if y >= img.height() {
        return fallback;
    }

    let (sum, count) = (0..img.width())
        .filter(|&x| img.alpha(x, y) > 0)
        .fold((0u64, 0u64), |(s, c), x| (s + x as u64, c + 1));

    if count == 0 {
        fallback
    } else {
        sum as f64 / count as f64
    }
}

#[inline]
fn luminance(px: [u8; 4]) -> f64 {
    0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64
}

/// 8x8 mean-luminance bitmap as `{width}x{height}-{hex}`.
///
/// Cell 0 (top-left) is the most significant bit. Cells are
/// `floor(w/8) x floor(h/8)`; any remainder at the right and bottom edges
/// is ignored, and images narrower than 8 pixels hash to all zeros.
pub fn build_identity_hash(img: &PixelData) -> String {
    let block_w = img.width() / HASH_GRID;
    let block_h = img.height() / HASH_GRID;

    let mut cells = [0f64; (HASH_GRID * HASH_GRID) as usize];
    for gy in 0..HASH_GRID {
        for gx in 0..HASH_GRID {
            let mut sum = 0.0;
            let mut count = 0u32;
            for y in gy * block_h..(gy + 1) * block_h {
                for x in gx * block_w..(gx + 1) * block_w {
                    sum += luminance(img.pixel(x, y));
                    count += 1;
                }
            }
            cells[(gy * HASH_GRID + gx) as usize] = if count > 0 { sum / count as f64 } else { 0.0 };
        }
    }

    let mean = cells.iter().sum::<f64>() / cells.len() as f64;
    let bits = cells
        .iter()
        .fold(0u64, |acc, &cell| (acc << 1) | u64::from(cell > mean));

    format!("{}x{}-{:x}", img.width(), img.height(), bits)
}

fn count_alpha(img: &PixelData, from: f64, to: f64) -> usize {
    let height = img.height() as f64;
    let start = (height * from).floor() as u32;
    let end = ((height * to).floor() as u32).min(img.height());

    (start..end)
        .map(|y| (0..img.width()).filter(|&x| img.alpha(x, y) > 0).count())
        .sum()
}

fn band_ratio(img: &PixelData, from: f64, to: f64) -> f64 {
    let total = count_alpha(img, 0.0, 1.0);
    if total == 0 {
        return 0.0;
    }
    count_alpha(img, from, to) as f64 / total as f64
}

/// Share of opaque pixels in the top 20% of rows.
pub fn head_ratio(img: &PixelData) -> f64 {
    band_ratio(img, 0.0, 0.20)
}

/// Share of opaque pixels between 30% and 45% of the height.
pub fn bust_ratio(img: &PixelData) -> f64 {
    band_ratio(img, 0.30, 0.45)
}

/// Share of opaque pixels between 50% and 65% of the height.
pub fn hip_ratio(img: &PixelData) -> f64 {
    band_ratio(img, 0.50, 0.65)
}

pub fn ratios(img: &PixelData) -> Ratios {
    Ratios {
        head: head_ratio(img),
        bust: bust_ratio(img),
        hip: hip_ratio(img),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure() -> PixelData {
        // 20x20 canvas, opaque column at x = 8..=11
        let mut img = PixelData::transparent(20, 20).unwrap();
        for y in 0..20 {
            for x in 8..12 {
                img.set_pixel(x, y, [100, 50, 25, 255]);
            }
        }
        img
    }

    #[test]
    fn test_palette_first_seen_order() {
        let mut img = PixelData::transparent(4, 1).unwrap();
        img.set_pixel(0, 0, [9, 9, 9, 255]);
        img.set_pixel(1, 0, [1, 1, 1, 255]);
        img.set_pixel(2, 0, [9, 9, 9, 255]);
        img.set_pixel(3, 0, [5, 5, 5, 0]);
        assert_eq!(extract_palette(&img), vec![[9, 9, 9], [1, 1, 1]]);
    }

    #[test]
    fn test_silhouette_mask_counts_opaque() {
        let mask = build_silhouette_mask(&figure());
        assert_eq!(mask.len(), 400);
        assert_eq!(mask.count_set(), 80);
        assert_eq!(mask.as_slice()[8], 255);
        assert_eq!(mask.as_slice()[0], 0);
    }

    #[test]
    fn test_skeleton_centroids() {
        let skeleton = detect_skeleton(&figure());
        assert_eq!(skeleton.head, Point { x: 9.5, y: 3.0 });
        assert_eq!(skeleton.shoulders.y, 6.0);
        assert_eq!(skeleton.hips.y, 11.0);
        assert_eq!(skeleton.knees.y, 15.0);
        assert_eq!(skeleton.feet.y, 19.0);
        assert!(skeleton.joints().iter().all(|(_, p)| p.x == 9.5));
    }

    #[test]
    fn test_skeleton_defaults_to_center_on_empty_rows() {
        let skeleton = detect_skeleton(&PixelData::transparent(10, 10).unwrap());
        assert!(skeleton.joints().iter().all(|(_, p)| p.x == 5.0));
    }

    #[test]
    fn test_identity_hash_format() {
        let mut img = PixelData::filled(16, 16, [0, 0, 0, 255]).unwrap();
        // Brighten the top-left 2x2 cell only
        for y in 0..2 {
            for x in 0..2 {
                img.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        assert_eq!(build_identity_hash(&img), "16x16-8000000000000000");
    }

    #[test]
    fn test_identity_hash_flat_image_is_zero() {
        let img = PixelData::filled(16, 8, [0, 0, 0, 255]).unwrap();
        assert_eq!(build_identity_hash(&img), "16x8-0");
    }

    #[test]
    fn test_identity_hash_tiny_image() {
        let img = PixelData::filled(4, 4, [255, 255, 255, 255]).unwrap();
        assert_eq!(build_identity_hash(&img), "4x4-0");
    }

    #[test]
    fn test_ratios_of_uniform_column() {
        let r = ratios(&figure());
        assert!((r.head - 0.20).abs() < 1e-9);
        assert!((r.bust - 0.15).abs() < 1e-9);
        assert!((r.hip - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_empty_image() {
        let r = ratios(&PixelData::transparent(5, 5).unwrap());
        assert_eq!(r, Ratios { head: 0.0, bust: 0.0, hip: 0.0 });
    }

    #[test]
    fn test_edge_map_marks_alpha_steps() {
        let edges = build_edge_map(&figure());
        // x = 7 steps into the column on its right
        assert_eq!(edges.as_slice()[5 * 20 + 7], 255);
        // x = 11 steps out of the column on its right
        assert_eq!(edges.as_slice()[5 * 20 + 11], 255);
        assert_eq!(edges.as_slice()[5 * 20 + 9], 0);
        // border rows stay clear
        assert_eq!(edges.as_slice()[7], 0);
    }
}
