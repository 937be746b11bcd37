//! Error Taxonomy
//!
//! One fatal error enum for the whole core. Nothing is recovered locally:
//! every variant is terminal for the call that produced it.

use thiserror::Error;

use crate::executor::ExecutorError;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("Invalid pixel buffer: {width}x{height} RGBA needs width*height*4 bytes, got {len}")]
    InvalidBuffer { width: u32, height: u32, len: usize },

    #[error("IDENTITY_DRIFT: {0}")]
    IdentityDrift(String),

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Sprite sheet requires at least one pose")]
    EmptyPoseList,

    #[error("Pose {index} has height {actual}, sheet height is {expected}")]
    PoseHeightMismatch {
        expected: u32,
        actual: u32,
        index: usize,
    },

    #[error("Invalid rigging: {0}")]
    InvalidRigging(String),

    #[error("Preset {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raised by the synthesis collaborator, passed through untouched.
    #[error("{0}")]
    Executor(#[source] ExecutorError),
}

impl ForgeError {
    pub fn is_identity_drift(&self) -> bool {
        matches!(self, Self::IdentityDrift(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_drift_prefix() {
        let err = ForgeError::IdentityDrift("pose broken".into());
        assert!(err.to_string().starts_with("IDENTITY_DRIFT"));
        assert!(err.is_identity_drift());
    }

    #[test]
    fn test_invalid_buffer_reports_expected_len() {
        let err = ForgeError::InvalidBuffer { width: 2, height: 2, len: 3 };
        assert!(err.to_string().contains("2x2"));
        assert!(err.to_string().ends_with("got 3"));
    }

    #[test]
    fn test_executor_error_is_transparent() {
        let inner: ExecutorError = Box::new(std::io::Error::other("quota exceeded"));
        let err = ForgeError::Executor(inner);
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(!err.is_identity_drift());
    }
}
