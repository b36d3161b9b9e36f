//! The closed catalogue of AI effects and how each maps to an ImageKit
//! transformation fragment.
//!
//! Adding an effect means adding a variant here; every `match` below is
//! exhaustive, so the compiler points at each table that needs a new row.

pub mod stack;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use stack::{EffectStack, combined_locator};

/// A named, possibly prompt-driven image transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    #[serde(rename = "e-bgremove")]
    RemoveBackground,
    #[serde(rename = "e-changebg")]
    ChangeBackground,
    #[serde(rename = "e-edit")]
    Edit,
    #[serde(rename = "bg-genfill")]
    GenerativeFill,
    #[serde(rename = "e-dropshadow")]
    DropShadow,
    #[serde(rename = "e-retouch")]
    Retouch,
    #[serde(rename = "e-upscale")]
    Upscale,
    #[serde(rename = "e-genvar")]
    Variations,
    #[serde(rename = "e-crop-face")]
    FaceCrop,
    #[serde(rename = "e-crop-smart")]
    SmartCrop,
}

impl Effect {
    /// Every effect, in the order fragments are stacked.
    pub const ALL: [Effect; 10] = [
        Effect::RemoveBackground,
        Effect::ChangeBackground,
        Effect::Edit,
        Effect::GenerativeFill,
        Effect::DropShadow,
        Effect::Retouch,
        Effect::Upscale,
        Effect::Variations,
        Effect::FaceCrop,
        Effect::SmartCrop,
    ];

    /// Identifier as understood by the CDN.
    pub fn id(self) -> &'static str {
        match self {
            Effect::RemoveBackground => "e-bgremove",
            Effect::ChangeBackground => "e-changebg",
            Effect::Edit => "e-edit",
            Effect::GenerativeFill => "bg-genfill",
            Effect::DropShadow => "e-dropshadow",
            Effect::Retouch => "e-retouch",
            Effect::Upscale => "e-upscale",
            Effect::Variations => "e-genvar",
            Effect::FaceCrop => "e-crop-face",
            Effect::SmartCrop => "e-crop-smart",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Effect::RemoveBackground => "Remove Background",
            Effect::ChangeBackground => "Change Background",
            Effect::Edit => "AI Edit",
            Effect::GenerativeFill => "Generative Fill",
            Effect::DropShadow => "AI Drop Shadow",
            Effect::Retouch => "AI Retouch",
            Effect::Upscale => "AI Upscale 2x",
            Effect::Variations => "Generate Variations",
            Effect::FaceCrop => "Face Crop",
            Effect::SmartCrop => "Smart Crop",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Effect::RemoveBackground => "remove background with AI",
            Effect::ChangeBackground => "replace background with AI",
            Effect::Edit => "edit image with text prompts",
            Effect::GenerativeFill => "fill empty areas with AI",
            Effect::DropShadow => "add realistic shadows",
            Effect::Retouch => "enhance and retouch image",
            Effect::Upscale => "upscale image quality",
            Effect::Variations => "create image variations",
            Effect::FaceCrop => "smart face-focused cropping",
            Effect::SmartCrop => "AI-powered intelligent cropping",
        }
    }

    /// Whether a free-text prompt must be collected before the job starts.
    pub fn requires_prompt(self) -> bool {
        matches!(
            self,
            Effect::ChangeBackground | Effect::Edit | Effect::GenerativeFill | Effect::Variations
        )
    }

    /// Transformation fragment for this effect. A missing prompt falls back
    /// to the bare identifier.
    pub fn fragment(self, prompt: Option<&str>) -> String {
        let Some(prompt) = prompt.filter(|p| !p.is_empty()) else {
            return self.id().to_string();
        };
        let encoded = encode_component(prompt);
        match self {
            Effect::ChangeBackground => format!("e-changebg-prompt-{encoded}"),
            Effect::Edit | Effect::GenerativeFill | Effect::Variations => {
                format!("{}:{encoded}", self.id())
            }
            Effect::RemoveBackground
            | Effect::DropShadow
            | Effect::Retouch
            | Effect::Upscale
            | Effect::FaceCrop
            | Effect::SmartCrop => self.id().to_string(),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error for an identifier outside the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown effect: {0}")]
pub struct UnknownEffect(pub String);

impl FromStr for Effect {
    type Err = UnknownEffect;

    /// Accepts the full identifier (`e-bgremove`) or the short form without
    /// the `e-` prefix (`bgremove`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Effect::ALL
            .into_iter()
            .find(|effect| {
                let id = effect.id();
                id == wanted || id.strip_prefix("e-") == Some(wanted.as_str())
            })
            .ok_or_else(|| UnknownEffect(s.trim().to_string()))
    }
}

/// An effect bound to the prompt it was toggled on with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDescriptor {
    effect: Effect,
    prompt: Option<String>,
    fragment: String,
}

impl EffectDescriptor {
    pub fn new(effect: Effect, prompt: Option<String>) -> Self {
        let prompt = prompt.filter(|p| !p.is_empty());
        let fragment = effect.fragment(prompt.as_deref());
        Self {
            effect,
            prompt,
            fragment,
        }
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

/// Percent-encode a prompt the way `encodeURIComponent` does.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
