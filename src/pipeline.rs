//! End-to-end run: discover, plan, write project files, export.
//!
//! Targets render one after another. A failing target is reported and
//! skipped while the remaining targets still run; the run as a whole fails
//! afterwards with every failure listed.

use crate::descriptor::{PlanOptions, RenderTarget, plan_targets};
use crate::discovery::require_gerber_files;
use crate::render::{ExportSettings, gerbv_command, image_path, resolve_gerbv_binary, run_export};
use crate::styles::StyleTable;
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub gerber_dir: PathBuf,
    /// Defaults to `gerber_dir`.
    pub output_dir: Option<PathBuf>,
    pub gerbv: PathBuf,
    pub settings: ExportSettings,
    pub plan: PlanOptions,
    pub styles: Option<PathBuf>,
    pub keep_project: bool,
    pub dry_run: bool,
}

/// What happened to one render target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetOutcome {
    pub stem: String,
    pub image: PathBuf,
    /// Set when the project file was kept on disk.
    pub descriptor: Option<PathBuf>,
    pub rendered: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<TargetOutcome>,
}

pub fn run(config: &RunConfig) -> Result<RunReport> {
    let styles = StyleTable::resolve(config.styles.as_deref())?;
    let gerber_dir = fs::canonicalize(&config.gerber_dir)
        .with_context(|| format!("resolving gerber directory {}", config.gerber_dir.display()))?;
    if !gerber_dir.is_dir() {
        bail!("{} is not a directory", gerber_dir.display());
    }

    let projects = require_gerber_files(&gerber_dir)?;
    let gerbv = if config.dry_run {
        resolve_gerbv_binary(&config.gerbv).unwrap_or_else(|_| config.gerbv.clone())
    } else {
        resolve_gerbv_binary(&config.gerbv)?
    };

    let plans: Vec<_> = projects
        .values()
        .map(|project| (project, plan_targets(project, &styles, config.plan)))
        .collect();
    if plans.iter().all(|(_, targets)| targets.is_empty()) {
        bail!("nothing to render in {}", gerber_dir.display());
    }

    let output_dir = config.output_dir.clone().unwrap_or_else(|| gerber_dir.clone());
    // A dry run leaves the filesystem alone unless project files are kept.
    if !config.dry_run || config.keep_project {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    }

    let mut report = RunReport::default();
    let mut errors: Vec<String> = Vec::new();
    for (project, targets) in &plans {
        if targets.is_empty() {
            warn!(project = %project.name, "nothing to render");
            continue;
        }
        debug!(project = %project.name, targets = targets.len(), "planned");

        for target in targets {
            match render_target(target, &gerbv, &output_dir, config) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => {
                    let message = format!("{}: {err:#}", target.stem());
                    eprintln!("gerbv-vis: {message}");
                    errors.push(message);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(report)
    } else {
        bail!(
            "{} target(s) failed; see stderr for details:\n{}",
            errors.len(),
            errors.join("\n")
        )
    }
}

fn render_target(
    target: &RenderTarget,
    gerbv: &Path,
    output_dir: &Path,
    config: &RunConfig,
) -> Result<TargetOutcome> {
    target.verify_inputs()?;
    let text = target.render();
    let stem = target.stem();
    let image = image_path(output_dir, &stem, config.settings.format);

    let descriptor = ProjectFile::write(target, &text, output_dir, config.keep_project)?;
    if let Some(kept) = descriptor.kept() {
        println!("Writing '{}'", kept.display());
    }
    let spec = gerbv_command(gerbv, config.settings, descriptor.path(), &image);

    if config.dry_run {
        if descriptor.kept().is_none() {
            print!("{text}");
        }
        println!("{}", spec.display());
        return Ok(TargetOutcome {
            stem,
            image,
            descriptor: descriptor.kept(),
            rendered: false,
        });
    }

    let image_name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.display().to_string());
    println!("Generating '{image_name}' ...");
    run_export(&spec)?;

    Ok(TargetOutcome {
        stem,
        image,
        descriptor: descriptor.kept(),
        rendered: true,
    })
}

/// A written `.gvp`: either kept beside the images or a temp file removed on drop.
enum ProjectFile {
    Kept(PathBuf),
    Temporary(NamedTempFile),
}

impl ProjectFile {
    fn write(target: &RenderTarget, text: &str, output_dir: &Path, keep: bool) -> Result<Self> {
        if keep {
            let path = output_dir.join(target.descriptor_name());
            fs::write(&path, text)
                .with_context(|| format!("writing project file {}", path.display()))?;
            return Ok(ProjectFile::Kept(path));
        }

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", target.stem()))
            .suffix(".gvp")
            .tempfile()
            .context("creating temporary project file")?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("writing project file {}", file.path().display()))?;
        file.flush().context("flushing temporary project file")?;
        Ok(ProjectFile::Temporary(file))
    }

    fn path(&self) -> &Path {
        match self {
            ProjectFile::Kept(path) => path,
            ProjectFile::Temporary(file) => file.path(),
        }
    }

    fn kept(&self) -> Option<PathBuf> {
        match self {
            ProjectFile::Kept(path) => Some(path.clone()),
            ProjectFile::Temporary(_) => None,
        }
    }
}
