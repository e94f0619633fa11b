#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn gerbv_vis_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gerbv-vis"))
}

pub fn make_executable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute {:?}", cmd.get_program()))?;
    if !output.status.success() {
        bail!(
            "command {:?} failed with {:?}\nstdout: {}\nstderr: {}",
            cmd.get_program(),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

// A scratch directory of placeholder layer files.
pub struct GerberDir {
    temp: TempDir,
}

impl GerberDir {
    pub fn with_files(names: &[&str]) -> Result<Self> {
        let temp = TempDir::new().context("failed to allocate gerber dir")?;
        let dir = Self { temp };
        for name in names {
            dir.add(name)?;
        }
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn add(&self, name: &str) -> Result<()> {
        fs::write(self.path().join(name), "G04 fixture*\nM02*\n")
            .with_context(|| format!("failed to write fixture {name}"))
    }

    pub fn files_with_extension(&self, ext: &str) -> Vec<String> {
        list_with_extension(self.path(), ext)
    }
}

pub fn list_with_extension(dir: &Path, ext: &str) -> Vec<String> {
    let suffix = format!(".{ext}");
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(&suffix))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// Stand-in for gerbv: logs one argument per line, keeps a copy of every
// project file it is handed and touches the requested output image.
pub struct StubGerbv {
    temp: TempDir,
    pub binary: PathBuf,
}

impl StubGerbv {
    pub fn succeeding() -> Result<Self> {
        Self::install("exit 0\n")
    }

    pub fn failing(message: &str, code: i32) -> Result<Self> {
        Self::install(&format!("echo '{message}' >&2\nexit {code}\n"))
    }

    fn install(tail: &str) -> Result<Self> {
        let temp = TempDir::new().context("failed to allocate stub dir")?;
        let captures = temp.path().join("captures");
        fs::create_dir_all(&captures)?;
        let log = temp.path().join("args.log");
        let binary = temp.path().join("gerbv");
        let script = format!(
            r#"#!/bin/sh
for arg in "$@"; do
  printf '%s\n' "$arg" >> '{log}'
  case "$arg" in
    --project=*) cp "${{arg#--project=}}" '{captures}/' ;;
    --output=*) : > "${{arg#--output=}}" ;;
  esac
done
{tail}"#,
            log = log.display(),
            captures = captures.display(),
        );
        fs::write(&binary, script)?;
        make_executable(&binary)?;
        Ok(Self { temp, binary })
    }

    pub fn args(&self) -> Vec<String> {
        fs::read_to_string(self.temp.path().join("args.log"))
            .map(|raw| raw.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn invoked(&self) -> bool {
        self.temp.path().join("args.log").is_file()
    }

    /// Contents of every project file the stub was handed, by file name.
    pub fn projects(&self) -> Vec<String> {
        let captures = self.temp.path().join("captures");
        list_with_extension(&captures, "gvp")
            .into_iter()
            .filter_map(|name| fs::read_to_string(captures.join(name)).ok())
            .collect()
    }
}

/// File names listed by `define-layer!` entries, background excluded.
pub fn layer_files(project: &str) -> Vec<String> {
    project
        .lines()
        .filter(|line| line.starts_with("(define-layer! ") && !line.starts_with("(define-layer! -1"))
        .filter_map(|line| line.split('"').nth(1))
        .map(|path| {
            Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect()
}
