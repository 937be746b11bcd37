//! SpriteForge Core - Sprite Integrity Pipeline
//!
//! # The Five Laws (Non-Negotiable)
//! 1. The Caller's Buffer Is Never Touched
//! 2. Synthesis Is Untrusted
//! 3. Validation Fails Closed
//! 4. Post-Processing Is Deterministic
//! 5. Retries Belong To The Caller

pub mod assembly;
pub mod cleanup;
pub mod config;
pub mod directive;
pub mod error;
pub mod executor;
pub mod extract;
pub mod hashing;
pub mod pipeline;
pub mod pixels;
pub mod postprocess;
pub mod validation;

pub use assembly::{compose_sprite_sheet, generate_poses, PoseGuide, RigJoint};
pub use config::{ForgeConfig, PresetRegistry};
pub use directive::{Directive, DirectiveParams};
pub use error::ForgeError;
pub use executor::{ExecutorError, ReplayExecutor, SynthesisExecutor};
pub use extract::{Point, Ratios, Skeleton};
pub use pipeline::{ForgeRequest, ForgeResult, IdentityReport, SpriteManifest, SpritePipeline};
pub use pixels::{Mask, Palette, PixelData, Rgb};
pub use validation::{IntegrityReport, IntegrityViolation};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
