//! Directive Builder - deterministic synthesis instructions
//!
//! Pure string assembly. The same parameters always yield the same text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveParams {
    pub outfit: String,
    pub class_type: String,
    pub theme: String,
}

/// Positive and negative instruction text handed to the synthesis executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub positive: String,
    pub negative: String,
}

impl Directive {
    pub fn build(params: &DirectiveParams) -> Self {
        Self {
            positive: build_prompt(params),
            negative: build_negative_prompt(),
        }
    }

    /// Positive then negative text, separated by one newline.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.positive, self.negative)
    }
}

const NEGATIVE_TERMS: &[&str] = &[
    "no anatomy change",
    "no body reshape",
    "no face change",
    "no eye change",
    "no hair change",
    "no pose change",
    "no silhouette change",
    "blur, low quality, artifacts, distorted pixels",
];

pub fn build_prompt(params: &DirectiveParams) -> String {
    [
        "You are a pixel art sprite surgeon.".to_string(),
        "Paint ONLY inside the mask.".to_string(),
        "Keep original palette and lighting direction.".to_string(),
        "Only repaint clothing and accessories.".to_string(),
        format!("Outfit specification: {}", params.outfit),
        format!("Character Class: {}", params.class_type),
        format!("Atmospheric Theme: {}", params.theme),
        "Style: Sharp 2D RPG pixel art, clean outlines.".to_string(),
    ]
    .join("\n")
}

pub fn build_negative_prompt() -> String {
    NEGATIVE_TERMS.join(",\n")
}
