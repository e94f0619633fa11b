//! Display styles for layer roles.
//!
//! A [`StyleTable`] carries the color/visibility of each [`LayerRole`], the
//! board background and an optional token vocabulary. The built-in table
//! mirrors KiCad's green-board look; a JSON style file can replace any part
//! of it. Style files are validated against `schema/styles.schema.json`
//! before they are deserialized so typos surface as schema errors instead of
//! silently ignored keys.

use crate::layers::{LayerKind, LayerRole, Side, Vocabulary};
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Version marker every style file must declare.
pub const STYLE_SCHEMA_VERSION: &str = "gerbv_vis_styles_v1";

const STYLE_SCHEMA: &str = include_str!("../schema/styles.schema.json");

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Channels scaled to gerbv's 16-bit range.
    pub fn gerbv_rgb(&self) -> [u32; 3] {
        [self.r, self.g, self.b].map(|c| u32::from(c) * 256)
    }

    pub fn gerbv_alpha(&self) -> u32 {
        u32::from(self.a) * 256
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerStyle {
    pub color: Rgba,
    pub inverted: bool,
    /// Whether the role is drawn by default; `--show-paste` overrides this
    /// for paste layers.
    pub visible: bool,
}

impl LayerStyle {
    pub const fn visible(color: Rgba) -> Self {
        Self {
            color,
            inverted: false,
            visible: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleTable {
    pub background: Rgba,
    roles: BTreeMap<LayerRole, LayerStyle>,
    vocabulary: Vocabulary,
}

impl Default for StyleTable {
    fn default() -> Self {
        let black = LayerStyle::visible(Rgba::opaque(0, 0, 0));
        let roles = BTreeMap::from([
            (LayerRole::Outline, black),
            (LayerRole::Drill, black),
            (
                LayerRole::Copper,
                LayerStyle::visible(Rgba::opaque(179, 156, 0)),
            ),
            (
                LayerRole::Soldermask,
                LayerStyle {
                    color: Rgba::new(20, 51, 36, 200),
                    inverted: true,
                    visible: true,
                },
            ),
            (
                LayerRole::Silkscreen,
                LayerStyle::visible(Rgba::opaque(230, 230, 230)),
            ),
            (
                LayerRole::Paste,
                LayerStyle {
                    color: Rgba::opaque(128, 128, 128),
                    inverted: false,
                    visible: false,
                },
            ),
            (
                LayerRole::Other,
                LayerStyle::visible(Rgba::new(160, 160, 160, 128)),
            ),
        ]);

        Self {
            background: Rgba::opaque(51, 43, 22),
            roles,
            vocabulary: Vocabulary::new(),
        }
    }
}

impl StyleTable {
    /// Built-in table, or the built-in table patched by `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Load a style file and apply it on top of the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading style file {}", path.display()))?;
        let value: Value = serde_json::from_str(&data)
            .with_context(|| format!("parsing style file {}", path.display()))?;
        Self::from_value(value).with_context(|| format!("loading style file {}", path.display()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        validate_against_schema(&value)?;
        let file: StyleFile =
            serde_json::from_value(value).context("decoding style overrides")?;
        if file.schema_version != STYLE_SCHEMA_VERSION {
            bail!(
                "unsupported style schema_version '{}', expected {}",
                file.schema_version,
                STYLE_SCHEMA_VERSION
            );
        }

        let mut table = Self::default();
        if let Some([r, g, b]) = file.background {
            table.background = Rgba::opaque(r, g, b);
        }
        for (role, patch) in file.roles {
            let role = LayerRole::try_from(role.as_str())?;
            let style = table
                .roles
                .entry(role)
                .or_insert(LayerStyle::visible(Rgba::opaque(0, 0, 0)));
            if let Some([r, g, b, a]) = patch.color {
                style.color = Rgba::new(r, g, b, a);
            }
            if let Some(inverted) = patch.inverted {
                style.inverted = inverted;
            }
            if let Some(visible) = patch.visible {
                style.visible = visible;
            }
            debug!(%role, ?style, "style override");
        }
        for (token, entry) in file.tokens {
            let role = LayerRole::try_from(entry.role.as_str())?;
            let side = entry.side.as_deref().map(parse_side).transpose()?;
            table.vocabulary.insert(token, LayerKind::new(role, side));
        }
        Ok(table)
    }

    pub fn style(&self, role: LayerRole) -> LayerStyle {
        self.roles
            .get(&role)
            .copied()
            .unwrap_or(LayerStyle::visible(Rgba::opaque(0, 0, 0)))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Whether a layer of `kind` is listed in descriptors.
    pub fn is_visible(&self, kind: &LayerKind, show_paste: bool) -> bool {
        if kind.role == LayerRole::Paste && show_paste {
            return true;
        }
        self.style(kind.role).visible
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleFile {
    schema_version: String,
    #[serde(default)]
    background: Option<[u8; 3]>,
    #[serde(default)]
    roles: BTreeMap<String, StylePatch>,
    #[serde(default)]
    tokens: BTreeMap<String, TokenEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StylePatch {
    #[serde(default)]
    color: Option<[u8; 4]>,
    #[serde(default)]
    inverted: Option<bool>,
    #[serde(default)]
    visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenEntry {
    role: String,
    #[serde(default)]
    side: Option<String>,
}

fn parse_side(raw: &str) -> Result<Side> {
    match raw {
        "top" => Ok(Side::Top),
        "bottom" => Ok(Side::Bottom),
        other => other
            .strip_prefix("in")
            .and_then(|n| n.parse::<u8>().ok())
            .map(Side::Inner)
            .ok_or_else(|| anyhow!("Unknown side: {other}")),
    }
}

fn validate_against_schema(value: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(STYLE_SCHEMA).context("parsing bundled style schema")?;
    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling bundled style schema: {err}"))?;
    if let Err(errors) = compiled.validate(value) {
        let details = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("\n");
        bail!("style file failed schema validation:\n{details}");
    }
    Ok(())
}
