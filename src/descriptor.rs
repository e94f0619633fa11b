//! gerbv project (`.gvp`) generation.
//!
//! A project is planned into one or more [`RenderTarget`]s: a single composite
//! image per board by default, or one image per copper layer when views are
//! requested. Each target owns the ordered, styled layer list that becomes a
//! gerbv project file. Rendering the text is pure; only
//! [`RenderTarget::verify_inputs`] touches the filesystem.

use crate::discovery::Project;
use crate::layers::{LayerKind, LayerRole, Side, classify, stack_order};
use crate::styles::{LayerStyle, Rgba, StyleTable};
use anyhow::{Result, bail};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Version string gerbv expects at the top of a project file.
pub const GERBV_FILE_VERSION: &str = "2.0A";

/// gerbv render type for high-quality cairo output.
const RENDER_TYPE_HIGH_QUALITY: u8 = 3;

/// Which image a target produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum View {
    /// Every visible layer of the board in one image.
    Composite,
    Top,
    Bottom,
    Inner(u8),
}

impl View {
    /// Suffix appended to the project name for per-layer views.
    pub fn suffix(&self) -> Option<String> {
        match self {
            View::Composite => None,
            View::Top => Some("top".to_string()),
            View::Bottom => Some("bot".to_string()),
            View::Inner(n) => Some(format!("in{n}")),
        }
    }

    fn copper_side(&self) -> Option<Side> {
        match self {
            View::Composite => None,
            View::Top => Some(Side::Top),
            View::Bottom => Some(Side::Bottom),
            View::Inner(n) => Some(Side::Inner(*n)),
        }
    }
}

/// Planning switches taken from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub show_paste: bool,
    pub views: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorLayer {
    pub token: String,
    pub path: PathBuf,
    pub kind: LayerKind,
    pub style: LayerStyle,
}

/// One gerbv project and the image it renders to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub project: String,
    pub view: View,
    pub background: Rgba,
    pub layers: Vec<DescriptorLayer>,
}

impl RenderTarget {
    /// File stem shared by the `.gvp` and the image: `board` or `board-top`.
    pub fn stem(&self) -> String {
        match self.view.suffix() {
            Some(suffix) => format!("{}-{suffix}", self.project),
            None => self.project.clone(),
        }
    }

    pub fn descriptor_name(&self) -> String {
        format!("{}.gvp", self.stem())
    }

    /// Fail if any listed layer file has disappeared since discovery.
    pub fn verify_inputs(&self) -> Result<()> {
        let missing: Vec<String> = self
            .layers
            .iter()
            .filter(|layer| !layer.path.is_file())
            .map(|layer| layer.path.display().to_string())
            .collect();
        if !missing.is_empty() {
            bail!(
                "layer file(s) missing for {}: {}",
                self.stem(),
                missing.join(", ")
            );
        }
        Ok(())
    }

    /// The project file text; identical inputs give identical bytes.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "(gerbv-file-version! \"{GERBV_FILE_VERSION}\")");

        for (idx, layer) in self.layers.iter().enumerate() {
            write_layer(&mut out, idx, &layer.path, &layer.style);
        }

        let [r, g, b] = self.background.gerbv_rgb();
        out.push_str("(define-layer! -1 (cons 'filename \"\")\n");
        let _ = writeln!(out, "\t(cons 'color #({r} {g} {b}))");
        out.push_str(")\n");
        let _ = writeln!(out, "(set-render-type! {RENDER_TYPE_HIGH_QUALITY})");
        out
    }
}

fn write_layer(out: &mut String, idx: usize, path: &Path, style: &LayerStyle) {
    let _ = writeln!(
        out,
        "(define-layer! {idx} (cons 'filename \"{}\")",
        scheme_escape(&path.to_string_lossy())
    );
    if style.inverted {
        out.push_str("\t(cons 'inverted #t)\n");
    }
    let [r, g, b] = style.color.gerbv_rgb();
    out.push_str("\t(cons 'visible #t)\n");
    let _ = writeln!(out, "\t(cons 'color #({r} {g} {b}))");
    let _ = writeln!(out, "\t(cons 'alpha #({}))", style.color.gerbv_alpha());
    out.push_str(")\n");
}

fn scheme_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Split a project into render targets.
///
/// Targets with nothing to draw are dropped; the caller decides whether that
/// deserves a warning.
pub fn plan_targets(project: &Project, styles: &StyleTable, options: PlanOptions) -> Vec<RenderTarget> {
    let mut layers: Vec<DescriptorLayer> = project
        .files()
        .map(|file| {
            let kind = classify(&file.layer, styles.vocabulary());
            DescriptorLayer {
                token: file.layer.clone(),
                path: file.path.clone(),
                kind,
                style: styles.style(kind.role),
            }
        })
        .filter(|layer| styles.is_visible(&layer.kind, options.show_paste))
        .collect();
    layers.sort_by(|a, b| stack_order((&a.kind, &a.token), (&b.kind, &b.token)));

    let views = if options.views {
        copper_views(&layers)
    } else {
        vec![View::Composite]
    };

    views
        .into_iter()
        .map(|view| RenderTarget {
            project: project.name.clone(),
            view,
            background: styles.background,
            layers: layers_for_view(&layers, view),
        })
        .filter(|target| !target.layers.is_empty())
        .collect()
}

fn copper_views(layers: &[DescriptorLayer]) -> Vec<View> {
    let mut views: Vec<View> = layers
        .iter()
        .filter(|layer| layer.kind.role == LayerRole::Copper)
        .filter_map(|layer| match layer.kind.side? {
            Side::Top => Some(View::Top),
            Side::Bottom => Some(View::Bottom),
            Side::Inner(n) => Some(View::Inner(n)),
        })
        .collect();
    views.sort();
    views.dedup();
    views
}

// A copper view shows the board outline and holes, the copper itself, and for
// outer layers the paste, silkscreen and mask of the same side.
fn layers_for_view(layers: &[DescriptorLayer], view: View) -> Vec<DescriptorLayer> {
    let Some(side) = view.copper_side() else {
        return layers.to_vec();
    };
    let outer = matches!(side, Side::Top | Side::Bottom);
    let mut copper_taken = false;

    let mut selected: Vec<DescriptorLayer> = layers
        .iter()
        .filter(|layer| match layer.kind.role {
            LayerRole::Outline | LayerRole::Drill => true,
            LayerRole::Paste | LayerRole::Silkscreen | LayerRole::Soldermask => {
                outer && layer.kind.side == Some(side)
            }
            LayerRole::Copper if layer.kind.side == Some(side) && !copper_taken => {
                copper_taken = true;
                true
            }
            LayerRole::Copper | LayerRole::Other => false,
        })
        .cloned()
        .collect();
    // Seen from its own side, so copper is always drawn last.
    selected.sort_by_key(|layer| view_rank(layer.kind.role));
    selected
}

fn view_rank(role: LayerRole) -> u8 {
    match role {
        LayerRole::Outline => 0,
        LayerRole::Drill => 1,
        LayerRole::Paste => 2,
        LayerRole::Silkscreen => 3,
        LayerRole::Soldermask => 4,
        LayerRole::Copper | LayerRole::Other => 5,
    }
}
