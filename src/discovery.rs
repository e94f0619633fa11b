//! Gerber/drill file discovery.
//!
//! Files follow the `<project>-<layer>.<ext>` convention used by KiCad's
//! plotter (for example `board-F_Cu.gtl` or `board-PTH.drl`). Only the file
//! name is inspected; contents are never opened. Matches are grouped by
//! project so each board in a shared output directory renders on its own.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// A single layer file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GerberFile {
    pub project: String,
    pub layer: String,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub path: PathBuf,
}

impl GerberFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Layer files sharing one project name, keyed by layer token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub layers: BTreeMap<String, GerberFile>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: BTreeMap::new(),
        }
    }

    pub fn layer(&self, token: &str) -> Option<&GerberFile> {
        self.layers.get(token)
    }

    pub fn files(&self) -> impl Iterator<Item = &GerberFile> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn insert(&mut self, file: GerberFile) {
        if let Some(existing) = self.layers.get(&file.layer) {
            warn!(
                project = %self.name,
                layer = %file.layer,
                kept = %existing.file_name(),
                ignored = %file.file_name(),
                "duplicate layer token"
            );
            return;
        }
        self.layers.insert(file.layer.clone(), file);
    }
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+)-(\w+)\.(\w+)$").expect("file name pattern is valid")
    })
}

fn extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(gbr|drl|xln|gko|g[tb][opsl]|g\d+|gm\d+)$")
            .expect("extension pattern is valid")
    })
}

/// True when `ext` (any case) names a gerber or drill file.
pub fn is_gerber_extension(ext: &str) -> bool {
    extension_pattern().is_match(&ext.to_ascii_lowercase())
}

/// Decode `<project>-<layer>.<ext>` from a bare file name.
///
/// The project is the longest prefix before the last dash, so
/// `my-board-F_Cu.gtl` belongs to `my-board`.
pub fn parse_file_name(name: &str) -> Option<(String, String, String)> {
    let captures = file_name_pattern().captures(name)?;
    let project = captures.get(1)?.as_str().to_string();
    let layer = captures.get(2)?.as_str().to_string();
    let extension = captures.get(3)?.as_str().to_ascii_lowercase();
    if !is_gerber_extension(&extension) {
        return None;
    }
    Some((project, layer, extension))
}

/// Scan `dir` (non-recursively) and group matching files by project.
///
/// Entries are visited in file-name order so grouping, duplicate handling and
/// the printed `Found` lines are identical between runs.
pub fn find_gerber_files(dir: &Path) -> Result<BTreeMap<String, Project>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading gerber directory {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspecting {}", entry.path().display()))?;
        if file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!(name = ?raw, "skipping non UTF-8 file name"),
        }
    }
    names.sort();

    let mut projects: BTreeMap<String, Project> = BTreeMap::new();
    for name in names {
        let Some((project, layer, extension)) = parse_file_name(&name) else {
            debug!(file = %name, "ignoring file outside the naming convention");
            continue;
        };

        println!("Found '{name}'");
        let file = GerberFile {
            project: project.clone(),
            layer,
            extension,
            path: dir.join(&name),
        };
        projects
            .entry(project.clone())
            .or_insert_with(|| Project::new(project))
            .insert(file);
    }

    Ok(projects)
}

/// Like [`find_gerber_files`] but fails when nothing matched.
pub fn require_gerber_files(dir: &Path) -> Result<BTreeMap<String, Project>> {
    let projects = find_gerber_files(dir)?;
    if projects.is_empty() {
        bail!("no gerber files found in {}", dir.display());
    }
    Ok(projects)
}
