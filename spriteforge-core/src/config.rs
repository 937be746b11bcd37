//! Forge Configuration - Tunable Constants and Presets
//!
//! Every threshold the pipeline applies lives here. Defaults reproduce the
//! canonical pipeline; presets on disk may override any subset of them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ForgeError;
use crate::pixels::Rgb;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub post: PostProcessConfig,
}

fn default_name() -> String { "default".to_string() }
fn default_engine_min_version() -> String { "1.0.0".to_string() }

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            engine_min_version: default_engine_min_version(),
            cleanup: CleanupConfig::default(),
            integrity: IntegrityConfig::default(),
            post: PostProcessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    /// Pixels with alpha below this are zeroed.
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: u8,
    /// Per-channel tolerance for background matching (strict `<`).
    #[serde(default = "default_background_tolerance")]
    pub background_tolerance: u8,
    #[serde(default = "default_key_color")]
    pub key_color: Rgb,
}

fn default_alpha_threshold() -> u8 { 30 }
fn default_background_tolerance() -> u8 { 45 }
fn default_key_color() -> Rgb { [255, 0, 255] }

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: default_alpha_threshold(),
            background_tolerance: default_background_tolerance(),
            key_color: default_key_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityConfig {
    /// Summed RGB difference above which a pixel counts as changed.
    #[serde(default = "default_delta_threshold")]
    pub delta_threshold: u16,
    #[serde(default = "default_pose_tolerance")]
    pub pose_tolerance: f64,
}

fn default_delta_threshold() -> u16 { 60 }
fn default_pose_tolerance() -> f64 { 3.0 }

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            delta_threshold: default_delta_threshold(),
            pose_tolerance: default_pose_tolerance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessConfig {
    #[serde(default = "default_snap_step")]
    pub snap_step: u8,
    #[serde(default = "default_snap_alpha_high")]
    pub snap_alpha_high: u8,
    #[serde(default = "default_snap_alpha_low")]
    pub snap_alpha_low: u8,
    #[serde(default = "default_purify_threshold")]
    pub purify_threshold: u8,
    #[serde(default)]
    pub outline_color: Rgb,
}

fn default_snap_step() -> u8 { 5 }
fn default_snap_alpha_high() -> u8 { 128 }
fn default_snap_alpha_low() -> u8 { 50 }
fn default_purify_threshold() -> u8 { 128 }

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            snap_step: default_snap_step(),
            snap_alpha_high: default_snap_alpha_high(),
            snap_alpha_low: default_snap_alpha_low(),
            purify_threshold: default_purify_threshold(),
            outline_color: [0, 0, 0],
        }
    }
}

impl ForgeConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ForgeError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Reject values that would make a stage meaningless.
    pub fn check(&self) -> Result<(), ForgeError> {
        if self.post.snap_step == 0 {
            return Err(ForgeError::Config("snapStep must be at least 1".into()));
        }
        if !(self.integrity.pose_tolerance >= 0.0) {
            return Err(ForgeError::Config("poseTolerance must be non-negative".into()));
        }
        Ok(())
    }
}

/// Preset registry - loads named configurations from a directory
pub struct PresetRegistry {
    presets: HashMap<String, ForgeConfig>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        let mut presets = HashMap::new();
        let default = ForgeConfig::default();
        presets.insert(default.name.clone(), default);
        Self { presets }
    }

    /// Load every `*.json` preset in `dir`. Files that fail to read, parse
    /// or check are skipped.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    match ForgeConfig::load_from_file(&path) {
                        Ok(config) => registry.register(config),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "skipping preset");
                        }
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ForgeConfig> {
        self.presets.get(name)
    }

    pub fn list(&self) -> Vec<&ForgeConfig> {
        let mut presets: Vec<_> = self.presets.values().collect();
        presets.sort_by(|a, b| a.name.cmp(&b.name));
        presets
    }

    pub fn register(&mut self, config: ForgeConfig) {
        self.presets.insert(config.name.clone(), config);
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_canonical_constants() {
        let config = ForgeConfig::default();
        assert_eq!(config.cleanup.alpha_threshold, 30);
        assert_eq!(config.cleanup.background_tolerance, 45);
        assert_eq!(config.cleanup.key_color, [255, 0, 255]);
        assert_eq!(config.integrity.delta_threshold, 60);
        assert_eq!(config.integrity.pose_tolerance, 3.0);
        assert_eq!(config.post.snap_step, 5);
        assert_eq!(config.post.purify_threshold, 128);
        assert_eq!(config.post.outline_color, [0, 0, 0]);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ForgeConfig = serde_json::from_str(
            r#"{"name": "chunky", "post": {"snapStep": 10, "outlineColor": [20, 10, 40]}}"#,
        )
        .unwrap();
        assert_eq!(config.name, "chunky");
        assert_eq!(config.post.snap_step, 10);
        assert_eq!(config.post.outline_color, [20, 10, 40]);
        assert_eq!(config.post.purify_threshold, 128);
        assert_eq!(config.cleanup, CleanupConfig::default());
    }

    #[test]
    fn test_zero_snap_step_rejected() {
        let mut config = ForgeConfig::default();
        config.post.snap_step = 0;
        assert!(matches!(config.check(), Err(ForgeError::Config(_))));
    }

    #[test]
    fn test_registry_loads_dir_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("loose.json"), r#"{"name": "loose", "integrity": {"poseTolerance": 6}}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = PresetRegistry::load_from_dir(dir.path()).unwrap();
        let names: Vec<_> = registry.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["default", "loose"]);
        assert_eq!(registry.get("loose").unwrap().integrity.pose_tolerance, 6.0);
    }

    #[test]
    fn test_missing_dir_yields_default_only() {
        let registry = PresetRegistry::load_from_dir(Path::new("/definitely/not/here")).unwrap();
        assert_eq!(registry.list().len(), 1);
        assert!(registry.get("default").is_some());
    }
}
