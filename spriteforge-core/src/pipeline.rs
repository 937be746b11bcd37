//! Forge Pipeline - Single Entry Point
//!
//! CRITICAL: forge_sprite MUST validate synthesis output before any
//! post-processing. No bypass. A failed check discards the whole call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assembly::{compose_sprite_sheet, generate_poses, PoseGuide, RigJoint};
use crate::cleanup::{alpha_clean, isolate_background};
use crate::config::ForgeConfig;
use crate::directive::{Directive, DirectiveParams};
use crate::error::ForgeError;
use crate::executor::SynthesisExecutor;
use crate::extract::{
    build_identity_hash, build_silhouette_mask, detect_skeleton, extract_palette, ratios, Ratios,
    Skeleton,
};
use crate::hashing::{compute_job_hash, compute_manifest_hash, content_hash};
use crate::pixels::{PixelData, Rgb};
use crate::postprocess::{
    clean_noise, harmonize_palette, outline_unifier, palette_normalize, snap_pixels,
    transparency_purifier,
};
use crate::validation::{delta_map, IntegrityInput, IntegrityValidator};
use crate::ENGINE_VERSION;

const AUDIT_DIRECTIVE_CHARS: usize = 30;

#[derive(Debug, Clone)]
pub struct ForgeRequest {
    pub base_image: PixelData,
    pub outfit: String,
    pub class_type: String,
    pub theme: String,
    pub sheet_mode: bool,
    /// Optional joints from an external rigging pass; only consulted in
    /// sheet mode.
    pub rigging: Vec<RigJoint>,
}

impl ForgeRequest {
    pub fn directive_params(&self) -> DirectiveParams {
        DirectiveParams {
            outfit: self.outfit.clone(),
            class_type: self.class_type.clone(),
            theme: self.theme.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForgeResult {
    pub image: PixelData,
    /// Identity hash of the cleaned base, taken before synthesis.
    pub identity: String,
    /// Share of pixels synthesis left unchanged, in `[0, 1]`.
    pub drift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityReport {
    pub hash: String,
    pub skeleton: Skeleton,
    pub ratios: Ratios,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteManifest {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub preset: String,
    pub identity: String,
    pub drift: f64,
    pub width: u32,
    pub height: u32,
    pub content_hash: String,
    pub job_hash: String,
    pub manifest_hash: String,
}

/// The forge pipeline - owns configuration, holds no per-call state.
pub struct SpritePipeline {
    config: ForgeConfig,
    validator: IntegrityValidator,
}

impl SpritePipeline {
    pub fn new() -> Self {
        Self {
            config: ForgeConfig::default(),
            validator: IntegrityValidator::new(),
        }
    }

    pub fn with_config(config: ForgeConfig) -> Result<Self, ForgeError> {
        config.check()?;
        check_engine_version(&config)?;
        Ok(Self {
            config,
            validator: IntegrityValidator::new(),
        })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Run one synthesis through the full integrity pipeline.
    ///
    /// The base image is copied; the request is left untouched so a caller
    /// can retry it after an `IdentityDrift`. Executor errors come back as
    /// [`ForgeError::Executor`] carrying the original error.
    #[tracing::instrument(skip_all, fields(class = %request.class_type, sheet = request.sheet_mode))]
    pub async fn forge_sprite<E>(
        &self,
        request: &ForgeRequest,
        executor: &E,
    ) -> Result<ForgeResult, ForgeError>
    where
        E: SynthesisExecutor + ?Sized,
    {
        for joint in &request.rigging {
            joint.check()?;
        }

        let cleanup = &self.config.cleanup;
        let img = alpha_clean(request.base_image.clone(), cleanup.alpha_threshold);
        let img = isolate_background(img, cleanup.key_color, cleanup.background_tolerance);

        let palette = extract_palette(&img);
        let silhouette = build_silhouette_mask(&img);
        let skeleton = detect_skeleton(&img);
        let identity = build_identity_hash(&img);
        tracing::debug!(
            identity = %identity,
            colors = palette.len(),
            silhouette = silhouette.count_set(),
            "extracted base features"
        );

        let directive = Directive::build(&request.directive_params()).combined();
        let projected = silhouette.project();

        let generated = executor
            .synthesize(&directive, &img, &projected)
            .await
            .map_err(ForgeError::Executor)?;

        if generated.dimensions() != img.dimensions() {
            tracing::warn!(
                expected = ?img.dimensions(),
                actual = ?generated.dimensions(),
                "synthesis returned a different canvas size"
            );
            return Err(ForgeError::DimensionMismatch {
                expected: img.dimensions(),
                actual: generated.dimensions(),
            });
        }

        let delta = delta_map(&img, &generated, self.config.integrity.delta_threshold)?;
        let new_skeleton = detect_skeleton(&generated);
        let report = self.validator.validate(&IntegrityInput {
            delta: &delta,
            silhouette: &silhouette,
            base_skeleton: &skeleton,
            new_skeleton: &new_skeleton,
            pose_tolerance: self.config.integrity.pose_tolerance,
        });

        if !report.valid {
            tracing::warn!(
                identity = %identity,
                drift = report.drift_score,
                directive = %audit_excerpt(&directive),
                violations = report.violations.len(),
                "forge rejected"
            );
            return Err(ForgeError::IdentityDrift(report.summary()));
        }

        let post = &self.config.post;
        let out = harmonize_palette(&img, generated, Some(palette.as_slice()));
        let out = snap_pixels(out, post.snap_step, post.snap_alpha_high, post.snap_alpha_low);
        let out = clean_noise(out);
        let out = transparency_purifier(out, post.purify_threshold);
        let mut out = outline_unifier(out, post.outline_color);

        if request.sheet_mode {
            let guide = PoseGuide {
                skeleton: &skeleton,
                rigging: &request.rigging,
            };
            let poses = generate_poses(out, guide);
            out = compose_sprite_sheet(&poses)?;
        }

        tracing::info!(
            identity = %identity,
            drift = report.drift_score,
            directive = %audit_excerpt(&directive),
            "forge succeeded"
        );

        Ok(ForgeResult {
            image: out,
            identity,
            drift: report.drift_score,
        })
    }

    /// Read-only diagnostics for a sprite.
    #[tracing::instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn analyze_identity(&self, img: &PixelData) -> IdentityReport {
        IdentityReport {
            hash: build_identity_hash(img),
            skeleton: detect_skeleton(img),
            ratios: ratios(img),
        }
    }

    /// Cleanup-only chain for assets produced outside `forge_sprite`:
    /// background isolate, alpha clean, purify, snap. A non-empty target
    /// palette is applied last.
    #[tracing::instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn process_game_ready(&self, img: PixelData, target_palette: Option<&[Rgb]>) -> PixelData {
        let cleanup = &self.config.cleanup;
        let post = &self.config.post;

        let img = isolate_background(img, cleanup.key_color, cleanup.background_tolerance);
        let img = alpha_clean(img, cleanup.alpha_threshold);
        let img = transparency_purifier(img, post.purify_threshold);
        let img = snap_pixels(img, post.snap_step, post.snap_alpha_high, post.snap_alpha_low);

        match target_palette {
            Some(palette) if !palette.is_empty() => palette_normalize(img, palette),
            _ => img,
        }
    }

    /// Provenance record for a forged sprite.
    pub fn seal(&self, result: &ForgeResult, params: &DirectiveParams) -> Result<SpriteManifest, ForgeError> {
        let directive = Directive::build(params).combined();

        let mut manifest = SpriteManifest {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            preset: self.config.name.clone(),
            identity: result.identity.clone(),
            drift: result.drift,
            width: result.image.width(),
            height: result.image.height(),
            content_hash: content_hash(&result.image),
            job_hash: compute_job_hash(&directive, &result.identity, ENGINE_VERSION),
            manifest_hash: String::new(), // Computed after
        };

        manifest.manifest_hash = compute_manifest_hash(&manifest)?;
        Ok(manifest)
    }
}

impl Default for SpritePipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn check_engine_version(config: &ForgeConfig) -> Result<(), ForgeError> {
    let engine_ver = semver::Version::parse(ENGINE_VERSION)
        .map_err(|_| ForgeError::Config("Invalid engine version".into()))?;
    let min_ver = semver::Version::parse(&config.engine_min_version)
        .map_err(|_| ForgeError::Config(format!("Invalid engineMinVersion '{}'", config.engine_min_version)))?;

    if engine_ver < min_ver {
        return Err(ForgeError::EngineVersionMismatch(
            config.name.clone(),
            config.engine_min_version.clone(),
            ENGINE_VERSION.to_string(),
        ));
    }
    Ok(())
}

fn audit_excerpt(directive: &str) -> String {
    let mut excerpt: String = directive.chars().take(AUDIT_DIRECTIVE_CHARS).collect();
    if directive.chars().count() > AUDIT_DIRECTIVE_CHARS {
        excerpt.push_str("...");
    }
    excerpt
}
