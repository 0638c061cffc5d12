use anyhow::{anyhow, Context};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color4 {
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn to_egui(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        )
    }
}

/// Committed circles and the circle being placed use separate ring colors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub center: Color4,
    pub committed_ring: Color4,
    pub pending_ring: Color4,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            center: Color4::rgb8(200, 200, 200),
            committed_ring: Color4::rgb8(0, 200, 200),
            pending_ring: Color4::rgb8(200, 0, 0),
        }
    }
}

// ── Key bindings ────────────────────────────────────────────────────────────

/// Key names as understood by `egui::Key::from_name` ("Z", "Escape", ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub undo: String,
    pub abort: String,
    pub next: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            undo: "Z".to_owned(),
            abort: "Escape".to_owned(),
            next: "N".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keys {
    pub undo: egui::Key,
    pub abort: egui::Key,
    pub next: egui::Key,
}

impl KeyBindings {
    pub fn resolve(&self) -> anyhow::Result<Keys> {
        let keys = Keys {
            undo: parse_key("undo", &self.undo)?,
            abort: parse_key("abort", &self.abort)?,
            next: parse_key("next", &self.next)?,
        };
        if keys.undo == keys.abort || keys.undo == keys.next || keys.abort == keys.next {
            return Err(anyhow!("key bindings must be distinct: {self:?}"));
        }
        Ok(keys)
    }
}

fn parse_key(action: &str, name: &str) -> anyhow::Result<egui::Key> {
    egui::Key::from_name(name).ok_or_else(|| anyhow!("unknown key {name:?} bound to {action}"))
}

// ── Annotator config ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Visit images in random order instead of by file name.
    pub shuffle: bool,
    /// Fixed seed for a reproducible shuffle.
    pub shuffle_seed: Option<u64>,
    pub keys: KeyBindings,
    pub palette: Palette,
    pub window_size: [f32; 2],
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            shuffle_seed: None,
            keys: KeyBindings::default(),
            palette: Palette::default(),
            window_size: [1200.0, 800.0],
        }
    }
}

impl AnnotatorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str::<AnnotatorConfig>(&data)
            .with_context(|| format!("invalid config {}", path.display()))?;
        log::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }
}
