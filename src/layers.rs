//! Layer token classification.
//!
//! Maps the `<layer>` part of a file name onto a fabrication role and board
//! side. KiCad's own tokens are recognized exactly; other tools' tokens fall
//! back to keyword matching, and anything left over becomes
//! [`LayerRole::Other`] so it can still be drawn with a neutral style.

use anyhow::{Result, bail};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Highest inner copper index considered for per-layer views (`In1_Cu`..`In30_Cu`).
pub const MAX_INNER_COPPER: u8 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerRole {
    Outline,
    Drill,
    Copper,
    Soldermask,
    Silkscreen,
    Paste,
    Other,
}

impl LayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerRole::Outline => "outline",
            LayerRole::Drill => "drill",
            LayerRole::Copper => "copper",
            LayerRole::Soldermask => "soldermask",
            LayerRole::Silkscreen => "silkscreen",
            LayerRole::Paste => "paste",
            LayerRole::Other => "other",
        }
    }
}

impl TryFrom<&str> for LayerRole {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "outline" => Ok(LayerRole::Outline),
            "drill" => Ok(LayerRole::Drill),
            "copper" => Ok(LayerRole::Copper),
            "soldermask" => Ok(LayerRole::Soldermask),
            "silkscreen" => Ok(LayerRole::Silkscreen),
            "paste" => Ok(LayerRole::Paste),
            "other" => Ok(LayerRole::Other),
            other => bail!("Unknown layer role: {other}"),
        }
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Top,
    /// Inner copper, numbered from 1 (`In1_Cu`).
    Inner(u8),
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerKind {
    pub role: LayerRole,
    pub side: Option<Side>,
}

impl LayerKind {
    pub const fn new(role: LayerRole, side: Option<Side>) -> Self {
        Self { role, side }
    }

    pub const fn other() -> Self {
        Self::new(LayerRole::Other, None)
    }

    /// Position in the drawing stack; gerbv paints index 0 above everything.
    ///
    /// Outline and drills sit on top, then the top side from paste down to
    /// copper, inner copper, and the bottom side mirrored back out to paste.
    pub fn stack_rank(&self) -> (u8, u8) {
        use LayerRole::*;
        match (self.role, self.side) {
            (Outline, _) => (0, 0),
            (Drill, _) => (1, 0),
            (Paste, Some(Side::Top)) => (2, 0),
            (Silkscreen, Some(Side::Top)) => (3, 0),
            (Soldermask, Some(Side::Top)) => (4, 0),
            (Copper, Some(Side::Top)) => (5, 0),
            (Copper, Some(Side::Inner(n))) => (6, n),
            (Copper, Some(Side::Bottom)) => (7, 0),
            (Soldermask, Some(Side::Bottom)) => (8, 0),
            (Silkscreen, Some(Side::Bottom)) => (9, 0),
            (Paste, Some(Side::Bottom)) => (10, 0),
            // Sideless or inner non-copper layers (e.g. a bare `Paste`).
            (Copper | Soldermask | Silkscreen | Paste, _) => (11, 0),
            (Other, _) => (12, 0),
        }
    }
}

/// Orders two classified layers by stacking rank, then token for ties.
pub fn stack_order(a: (&LayerKind, &str), b: (&LayerKind, &str)) -> Ordering {
    a.0.stack_rank()
        .cmp(&b.0.stack_rank())
        .then_with(|| drill_rank(a.1).cmp(&drill_rank(b.1)))
        .then_with(|| a.1.cmp(b.1))
}

// Plated holes are listed ahead of non-plated ones.
fn drill_rank(token: &str) -> u8 {
    if token.eq_ignore_ascii_case("NPTH") { 1 } else { 0 }
}

/// Explicit token -> kind overrides, consulted before any built-in rule.
pub type Vocabulary = BTreeMap<String, LayerKind>;

/// Classify a layer token, honoring `vocabulary` first.
pub fn classify(token: &str, vocabulary: &Vocabulary) -> LayerKind {
    if let Some(kind) = vocabulary.get(token) {
        return *kind;
    }
    classify_kicad(token)
        .or_else(|| classify_keywords(token))
        .unwrap_or_else(LayerKind::other)
}

fn classify_kicad(token: &str) -> Option<LayerKind> {
    use LayerRole::*;
    let kind = match token {
        "F_Cu" => LayerKind::new(Copper, Some(Side::Top)),
        "B_Cu" => LayerKind::new(Copper, Some(Side::Bottom)),
        "F_Mask" => LayerKind::new(Soldermask, Some(Side::Top)),
        "B_Mask" => LayerKind::new(Soldermask, Some(Side::Bottom)),
        "F_Silkscreen" | "F_SilkS" => LayerKind::new(Silkscreen, Some(Side::Top)),
        "B_Silkscreen" | "B_SilkS" => LayerKind::new(Silkscreen, Some(Side::Bottom)),
        "F_Paste" => LayerKind::new(Paste, Some(Side::Top)),
        "B_Paste" => LayerKind::new(Paste, Some(Side::Bottom)),
        "Edge_Cuts" => LayerKind::new(Outline, None),
        "PTH" | "NPTH" => LayerKind::new(Drill, None),
        other => {
            let index = inner_copper_index(other)?;
            LayerKind::new(Copper, Some(Side::Inner(index)))
        }
    };
    Some(kind)
}

/// `In<N>_Cu` -> `N`, for 1 <= N <= [`MAX_INNER_COPPER`].
pub fn inner_copper_index(token: &str) -> Option<u8> {
    let digits = token.strip_prefix("In")?.strip_suffix("_Cu")?;
    let index: u8 = digits.parse().ok()?;
    (1..=MAX_INNER_COPPER).contains(&index).then_some(index)
}

fn classify_keywords(token: &str) -> Option<LayerKind> {
    let lower = token.to_ascii_lowercase();
    let parts: Vec<&str> = lower.split('_').filter(|p| !p.is_empty()).collect();
    let has = |needle: &str| parts.iter().any(|p| p.contains(needle));
    let has_part = |needle: &str| parts.iter().any(|p| *p == needle);

    let role = if has("paste") {
        LayerRole::Paste
    } else if has("silk") || has("legend") {
        LayerRole::Silkscreen
    } else if has("mask") {
        LayerRole::Soldermask
    } else if has("edge") || has("outline") || has("profile") {
        LayerRole::Outline
    } else if has("drill") || has_part("pth") || has_part("npth") {
        LayerRole::Drill
    } else if has("copper") || has_part("cu") {
        LayerRole::Copper
    } else {
        return None;
    };

    let side = match role {
        LayerRole::Outline | LayerRole::Drill => None,
        _ => side_of(&parts),
    };
    Some(LayerKind::new(role, side))
}

fn side_of(parts: &[&str]) -> Option<Side> {
    let first = parts.first().copied();
    if first == Some("f") || parts.iter().any(|p| matches!(*p, "top" | "front")) {
        return Some(Side::Top);
    }
    if first == Some("b")
        || parts.iter().any(|p| matches!(*p, "bot" | "bottom" | "back"))
    {
        return Some(Side::Bottom);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(token: &str) -> LayerKind {
        classify(token, &Vocabulary::new())
    }

    #[test]
    fn kicad_tokens_classify_exactly() {
        assert_eq!(kind("F_Cu"), LayerKind::new(LayerRole::Copper, Some(Side::Top)));
        assert_eq!(kind("B_Mask"), LayerKind::new(LayerRole::Soldermask, Some(Side::Bottom)));
        assert_eq!(kind("F_SilkS"), LayerKind::new(LayerRole::Silkscreen, Some(Side::Top)));
        assert_eq!(kind("Edge_Cuts"), LayerKind::new(LayerRole::Outline, None));
        assert_eq!(kind("NPTH"), LayerKind::new(LayerRole::Drill, None));
        assert_eq!(kind("In4_Cu"), LayerKind::new(LayerRole::Copper, Some(Side::Inner(4))));
    }

    #[test]
    fn inner_copper_bounds() {
        assert_eq!(inner_copper_index("In1_Cu"), Some(1));
        assert_eq!(inner_copper_index("In30_Cu"), Some(30));
        assert_eq!(inner_copper_index("In0_Cu"), None);
        assert_eq!(inner_copper_index("In31_Cu"), None);
        assert_eq!(inner_copper_index("Inx_Cu"), None);
    }

    #[test]
    fn generic_tokens_fall_back_to_keywords() {
        assert_eq!(kind("paste_top"), LayerKind::new(LayerRole::Paste, Some(Side::Top)));
        assert_eq!(kind("SilkBottom_bot"), LayerKind::new(LayerRole::Silkscreen, Some(Side::Bottom)));
        assert_eq!(kind("top_copper"), LayerKind::new(LayerRole::Copper, Some(Side::Top)));
        assert_eq!(kind("drill"), LayerKind::new(LayerRole::Drill, None));
        assert_eq!(kind("outline"), LayerKind::new(LayerRole::Outline, None));
    }

    #[test]
    fn unknown_tokens_become_other() {
        assert_eq!(kind("User_Drawings"), LayerKind::other());
        assert_eq!(kind("F_Fab"), LayerKind::other());
    }

    #[test]
    fn vocabulary_overrides_builtin_rules() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.insert(
            "F_Fab".to_string(),
            LayerKind::new(LayerRole::Silkscreen, Some(Side::Top)),
        );
        vocabulary.insert("F_Cu".to_string(), LayerKind::other());
        assert_eq!(
            classify("F_Fab", &vocabulary),
            LayerKind::new(LayerRole::Silkscreen, Some(Side::Top))
        );
        assert_eq!(classify("F_Cu", &vocabulary), LayerKind::other());
    }

    #[test]
    fn stacking_puts_outline_first_and_bottom_paste_last() {
        let mut tokens = vec![
            "B_Paste", "F_Cu", "NPTH", "In2_Cu", "B_Cu", "Edge_Cuts", "PTH", "F_Mask",
            "In1_Cu", "User_Drawings", "F_Paste",
        ];
        let vocabulary = Vocabulary::new();
        tokens.sort_by(|a, b| {
            stack_order(
                (&classify(a, &vocabulary), a),
                (&classify(b, &vocabulary), b),
            )
        });
        assert_eq!(
            tokens,
            vec![
                "Edge_Cuts", "PTH", "NPTH", "F_Paste", "F_Mask", "F_Cu", "In1_Cu", "In2_Cu",
                "B_Cu", "B_Paste", "User_Drawings",
            ]
        );
    }
}
