//! Integrity Validation - fail-closed drift and pose checks
//!
//! Rules produce structured violations.
//! Any violation rejects the whole asset.

use serde::{Deserialize, Serialize};

use crate::error::ForgeError;
use crate::extract::Skeleton;
use crate::pixels::{Mask, PixelData};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

/// Mark pixels whose summed absolute RGB difference exceeds `threshold`.
pub fn delta_map(a: &PixelData, b: &PixelData, threshold: u16) -> Result<Mask, ForgeError> {
    if a.dimensions() != b.dimensions() {
        return Err(ForgeError::DimensionMismatch {
            expected: a.dimensions(),
            actual: b.dimensions(),
        });
    }

    let data = a
        .data()
        .chunks_exact(4)
        .zip(b.data().chunks_exact(4))
        .map(|(pa, pb)| {
            let diff: u16 = (0..3).map(|c| u16::from(pa[c].abs_diff(pb[c]))).sum();
            if diff > threshold { 255 } else { 0 }
        })
        .collect();

    Mask::new(a.width(), a.height(), data)
}

/// False as soon as one changed pixel lies outside the silhouette.
/// Mismatched lengths also fail.
pub fn validate_drift(delta: &Mask, mask: &Mask) -> bool {
    delta.len() == mask.len() && drift_violations(delta, mask) == 0
}

fn drift_violations(delta: &Mask, mask: &Mask) -> usize {
    delta
        .as_slice()
        .iter()
        .zip(mask.as_slice())
        .filter(|&(&d, &m)| d != 0 && m == 0)
        .count()
}

/// Every joint must stay within `tolerance` on both axes.
pub fn lock_pose(base: &Skeleton, new: &Skeleton, tolerance: f64) -> bool {
    pose_offsets(base, new, tolerance).is_empty()
}

fn pose_offsets(base: &Skeleton, new: &Skeleton, tolerance: f64) -> Vec<(&'static str, f64, f64)> {
    base.joints()
        .iter()
        .zip(new.joints().iter())
        .filter_map(|((name, b), (_, n))| {
            let dx = (b.x - n.x).abs();
            let dy = (b.y - n.y).abs();
            (dx > tolerance || dy > tolerance).then_some((*name, dx, dy))
        })
        .collect()
}

/// Fraction of unchanged pixels: 1.0 identical, 0.0 entirely different.
pub fn calculate_drift_score(delta: &Mask) -> f64 {
    if delta.is_empty() {
        return 1.0;
    }
    1.0 - delta.count_set() as f64 / delta.len() as f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityViolation {
    pub rule: String,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub violations: Vec<IntegrityViolation>,
    pub drift_score: f64,
}

impl IntegrityReport {
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Everything the rules look at for one synthesis.
pub struct IntegrityInput<'a> {
    pub delta: &'a Mask,
    pub silhouette: &'a Mask,
    pub base_skeleton: &'a Skeleton,
    pub new_skeleton: &'a Skeleton,
    pub pose_tolerance: f64,
}

/// Integrity rule trait - produces violations
pub trait IntegrityRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, input: &IntegrityInput<'_>) -> Vec<IntegrityViolation>;
}

// --- Concrete Rules ---

pub struct DriftRule;

impl IntegrityRule for DriftRule {
    fn name(&self) -> &'static str { "silhouette_drift" }

    fn check(&self, input: &IntegrityInput<'_>) -> Vec<IntegrityViolation> {
        if validate_drift(input.delta, input.silhouette) {
            return vec![];
        }

        let actual = if input.delta.len() != input.silhouette.len() {
            format!("delta has {} entries, mask has {}", input.delta.len(), input.silhouette.len())
        } else {
            format!("{} pixels changed outside", drift_violations(input.delta, input.silhouette))
        };

        vec![IntegrityViolation {
            rule: self.name().to_string(),
            message: "Pixels changed outside the original silhouette".to_string(),
            expected: Some("0 pixels changed outside".to_string()),
            actual: Some(actual),
            remediation: vec!["Re-run synthesis with the mask enforced".to_string()],
        }]
    }
}

pub struct PoseRule;

impl IntegrityRule for PoseRule {
    fn name(&self) -> &'static str { "pose_lock" }

    fn check(&self, input: &IntegrityInput<'_>) -> Vec<IntegrityViolation> {
        pose_offsets(input.base_skeleton, input.new_skeleton, input.pose_tolerance)
            .into_iter()
            .map(|(joint, dx, dy)| IntegrityViolation {
                rule: self.name().to_string(),
                message: format!("Joint '{}' moved", joint),
                expected: Some(format!("offset <= {}", input.pose_tolerance)),
                actual: Some(format!("dx={:.2} dy={:.2}", dx, dy)),
                remediation: vec!["Regenerate without altering the pose".to_string()],
            })
            .collect()
    }
}

/// Validator runs every rule; the asset passes only with zero violations.
pub struct IntegrityValidator {
    rules: Vec<Box<dyn IntegrityRule>>,
}

impl IntegrityValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(DriftRule), Box::new(PoseRule)],
        }
    }

    pub fn validate(&self, input: &IntegrityInput<'_>) -> IntegrityReport {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(input))
            .collect();

        IntegrityReport {
            valid: violations.is_empty(),
            violations,
            drift_score: calculate_drift_score(input.delta),
        }
    }
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Point;

    fn skeleton(x: f64) -> Skeleton {
        let p = |y: f64| Point { x, y };
        Skeleton {
            head: p(3.0),
            shoulders: p(6.0),
            hips: p(11.0),
            knees: p(15.0),
            feet: p(19.0),
        }
    }

    #[test]
    fn test_delta_threshold_is_exclusive() {
        let a = PixelData::filled(2, 1, [100, 100, 100, 255]).unwrap();
        let mut b = a.clone();
        b.set_pixel(0, 0, [120, 120, 120, 255]); // sum 60
        b.set_pixel(1, 0, [121, 120, 120, 0]); // sum 61, alpha ignored
        let delta = delta_map(&a, &b, 60).unwrap();
        assert_eq!(delta.as_slice(), &[0, 255]);
    }

    #[test]
    fn test_delta_rejects_mismatched_dimensions() {
        let a = PixelData::transparent(2, 2).unwrap();
        let b = PixelData::transparent(4, 1).unwrap();
        assert!(matches!(
            delta_map(&a, &b, 60),
            Err(ForgeError::DimensionMismatch { expected: (2, 2), actual: (4, 1) })
        ));
    }

    #[test]
    fn test_validate_drift_fails_on_length_mismatch() {
        let delta = Mask::new(2, 1, vec![0, 0]).unwrap();
        let mask = Mask::new(3, 1, vec![255, 255, 255]).unwrap();
        assert!(!validate_drift(&delta, &mask));
    }

    #[test]
    fn test_drift_score_partial() {
        let delta = Mask::new(4, 1, vec![255, 0, 0, 0]).unwrap();
        assert_eq!(calculate_drift_score(&delta), 0.75);
    }

    #[test]
    fn test_validator_reports_each_broken_joint() {
        let delta = Mask::new(2, 1, vec![0, 0]).unwrap();
        let silhouette = Mask::new(2, 1, vec![255, 0]).unwrap();
        let base = skeleton(10.0);
        let mut moved = skeleton(10.0);
        moved.head.x = 14.0;
        moved.feet.y = 23.0;

        let report = IntegrityValidator::new().validate(&IntegrityInput {
            delta: &delta,
            silhouette: &silhouette,
            base_skeleton: &base,
            new_skeleton: &moved,
            pose_tolerance: 3.0,
        });

        assert!(!report.valid);
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations.iter().all(|v| v.rule == "pose_lock"));
        assert!(report.summary().contains("Joint 'head' moved"));
        assert!(report.summary().contains("Joint 'feet' moved"));
        assert_eq!(report.drift_score, 1.0);
    }

    #[test]
    fn test_validator_reports_drift_count() {
        let delta = Mask::new(3, 1, vec![255, 255, 255]).unwrap();
        let silhouette = Mask::new(3, 1, vec![255, 0, 0]).unwrap();
        let base = skeleton(1.0);

        let report = IntegrityValidator::new().validate(&IntegrityInput {
            delta: &delta,
            silhouette: &silhouette,
            base_skeleton: &base,
            new_skeleton: &base,
            pose_tolerance: 3.0,
        });

        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].rule, "silhouette_drift");
        assert_eq!(report.violations[0].actual.as_deref(), Some("2 pixels changed outside"));
        assert_eq!(report.drift_score, 0.0);
    }
}
