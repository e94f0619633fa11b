//! Render KiCad-style gerber/drill outputs to images through gerbv.
//!
//! The crate names files, it never parses them: [`discovery`] groups
//! `<project>-<layer>.<ext>` files, [`layers`] and [`styles`] decide how each
//! layer is drawn, [`descriptor`] writes gerbv project files and [`render`]
//! runs gerbv headlessly. [`pipeline`] ties the steps together for the
//! `gerbv-vis` binary.

pub mod cli;
pub mod descriptor;
pub mod discovery;
pub mod layers;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod styles;

pub use cli::Cli;
pub use descriptor::{DescriptorLayer, PlanOptions, RenderTarget, View, plan_targets};
pub use discovery::{GerberFile, Project, find_gerber_files, parse_file_name, require_gerber_files};
pub use layers::{LayerKind, LayerRole, Side, classify};
pub use pipeline::{RunConfig, RunReport, TargetOutcome, run};
pub use render::{CommandSpec, ExportFormat, ExportSettings};
pub use styles::{LayerStyle, Rgba, StyleTable};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// First executable named `name` on `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}
