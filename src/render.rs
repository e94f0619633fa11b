//! gerbv invocation.
//!
//! Builds the headless export command for one project file and runs it. The
//! binary is resolved up front so a bad `--gerbv` path fails before any
//! project files are written, and gerbv's stderr is carried into the error
//! when an export fails.

use crate::{find_on_path, is_executable};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Install location used when `--gerbv` is not given.
pub const DEFAULT_GERBV: &str = "/usr/local/bin/gerbv";

pub const DEFAULT_DPI: u32 = 300;

/// Image formats gerbv can export headlessly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Png,
    Pdf,
    Ps,
    Svg,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Ps => "ps",
            ExportFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture settings shared by every target in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub dpi: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            dpi: DEFAULT_DPI,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    /// Shell-ish rendering for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Image path for a target stem: `<output_dir>/<stem>.<format>`.
pub fn image_path(output_dir: &Path, stem: &str, format: ExportFormat) -> PathBuf {
    output_dir.join(format!("{stem}.{}", format.as_str()))
}

/// The gerbv command line that exports `project_file` to `image`.
pub fn gerbv_command(
    gerbv: &Path,
    settings: ExportSettings,
    project_file: &Path,
    image: &Path,
) -> CommandSpec {
    let mut project_arg = OsString::from("--project=");
    project_arg.push(project_file);
    let mut output_arg = OsString::from("--output=");
    output_arg.push(image);

    CommandSpec {
        program: gerbv.as_os_str().to_os_string(),
        args: vec![
            OsString::from(format!("--dpi={}", settings.dpi)),
            OsString::from("--antialias"),
            OsString::from(format!("--export={}", settings.format)),
            project_arg,
            output_arg,
        ],
    }
}

/// Resolve `--gerbv` to an executable path.
///
/// Values containing a path separator are taken literally; bare names such as
/// `gerbv` are looked up on `PATH` only, the same way the export is spawned.
pub fn resolve_gerbv_binary(requested: &Path) -> Result<PathBuf> {
    let is_bare_name = requested.components().count() == 1 && !requested.is_absolute();
    let found = if is_bare_name {
        requested.to_str().and_then(find_on_path)
    } else {
        is_executable(requested).then(|| requested.to_path_buf())
    };

    found.with_context(|| {
        format!(
            "gerbv binary not found: {} (install gerbv or pass --gerbv <path>)",
            requested.display()
        )
    })
}

/// Run a gerbv export and fail unless it exits cleanly.
pub fn run_export(spec: &CommandSpec) -> Result<()> {
    debug!(command = %spec.display(), "invoking gerbv");
    let output = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| {
            format!(
                "rendering failed: unable to execute {}",
                Path::new(&spec.program).display()
            )
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let status = match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    };
    if stderr.is_empty() {
        bail!("rendering failed: gerbv terminated with {status}");
    }
    bail!("rendering failed: gerbv terminated with {status}: {stderr}")
}
