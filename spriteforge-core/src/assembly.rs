//! Multi-Pose Assembly - mirrored poses and horizontal sprite sheets

use serde::{Deserialize, Serialize};

use crate::error::ForgeError;
use crate::extract::Skeleton;
use crate::pixels::PixelData;

/// Rigging joint placed by an external analysis step, in percent of the
/// canvas on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigJoint {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

impl RigJoint {
    pub fn check(&self) -> Result<(), ForgeError> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if in_range(self.x) && in_range(self.y) {
            Ok(())
        } else {
            Err(ForgeError::InvalidRigging(format!(
                "joint '{}' at ({}, {}) is outside 0..=100",
                self.id, self.x, self.y
            )))
        }
    }
}

/// Guidance handed to pose generation.
#[derive(Debug, Clone, Copy)]
pub struct PoseGuide<'a> {
    pub skeleton: &'a Skeleton,
    pub rigging: &'a [RigJoint],
}

/// Horizontal flip: column `x` swaps with `width - 1 - x` on every row.
pub fn mirror(img: &PixelData) -> PixelData {
    let mut flipped = img.clone();
    let row_len = img.width() as usize * 4;
    for row in flipped.data_mut().chunks_exact_mut(row_len) {
        let pixels = row.len() / 4;
        for x in 0..pixels / 2 {
            let (left, right) = (x * 4, (pixels - 1 - x) * 4);
            for c in 0..4 {
                row.swap(left + c, right + c);
            }
        }
    }
    flipped
}

/// The sprite followed by its mirror image.
///
/// The guide is accepted but not yet used for warping; every pose beyond
/// the source is a flip.
pub fn generate_poses(img: PixelData, guide: PoseGuide<'_>) -> Vec<PixelData> {
    tracing::debug!(
        joints = guide.rigging.len(),
        head_x = guide.skeleton.head.x,
        "generating mirrored pose"
    );
    let mirrored = mirror(&img);
    vec![img, mirrored]
}

/// Concatenate poses left to right. All poses must share one height; the
/// sheet is as wide as all poses together.
pub fn compose_sprite_sheet(poses: &[PixelData]) -> Result<PixelData, ForgeError> {
    let first = poses.first().ok_or(ForgeError::EmptyPoseList)?;
    let height = first.height();

    for (index, pose) in poses.iter().enumerate() {
        if pose.height() != height {
            return Err(ForgeError::PoseHeightMismatch {
                expected: height,
                actual: pose.height(),
                index,
            });
        }
    }

    let sheet_width: u32 = poses.iter().map(|p| p.width()).sum();
    let sheet_row = sheet_width as usize * 4;
    let mut data = vec![0u8; sheet_row * height as usize];

    let mut x_offset = 0usize;
    for pose in poses {
        let pose_row = pose.width() as usize * 4;
        for (y, src) in pose.data().chunks_exact(pose_row).enumerate() {
            let start = y * sheet_row + x_offset;
            data[start..start + pose_row].copy_from_slice(src);
        }
        x_offset += pose_row;
    }

    PixelData::new(sheet_width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::detect_skeleton;

    fn gradient(width: u32, height: u32) -> PixelData {
        let mut img = PixelData::transparent(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                img.set_pixel(x, y, [x as u8, y as u8, 7, 255]);
            }
        }
        img
    }

    #[test]
    fn test_mirror_swaps_columns() {
        let img = gradient(3, 2);
        let flipped = mirror(&img);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(flipped.pixel(x, y), img.pixel(2 - x, y));
            }
        }
    }

    #[test]
    fn test_generate_poses_is_source_then_mirror() {
        let img = gradient(4, 4);
        let skeleton = detect_skeleton(&img);
        let poses = generate_poses(img.clone(), PoseGuide { skeleton: &skeleton, rigging: &[] });
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[0], img);
        assert_eq!(poses[1], mirror(&img));
    }

    #[test]
    fn test_sheet_handles_mixed_widths() {
        let a = gradient(2, 3);
        let b = PixelData::filled(3, 3, [1, 1, 1, 255]).unwrap();
        let sheet = compose_sprite_sheet(&[a.clone(), b]).unwrap();
        assert_eq!(sheet.dimensions(), (5, 3));
        assert_eq!(sheet.pixel(1, 2), a.pixel(1, 2));
        assert_eq!(sheet.pixel(2, 0), [1, 1, 1, 255]);
        assert_eq!(sheet.pixel(4, 2), [1, 1, 1, 255]);
    }

    #[test]
    fn test_sheet_rejects_empty_and_mismatched() {
        assert!(matches!(compose_sprite_sheet(&[]), Err(ForgeError::EmptyPoseList)));

        let a = gradient(2, 2);
        let b = gradient(2, 3);
        assert!(matches!(
            compose_sprite_sheet(&[a, b]),
            Err(ForgeError::PoseHeightMismatch { expected: 2, actual: 3, index: 1 })
        ));
    }

    #[test]
    fn test_rig_joint_range() {
        let ok = RigJoint { id: "j1".into(), label: "head".into(), x: 0.0, y: 100.0 };
        assert!(ok.check().is_ok());
        let bad = RigJoint { id: "j2".into(), label: "foot".into(), x: 101.0, y: 50.0 };
        assert!(matches!(bad.check(), Err(ForgeError::InvalidRigging(_))));
    }
}
