//! Command line surface of `gerbv-vis`.
//!
//! Everything here is validated by clap before the filesystem is touched: an
//! unknown `--format` or a non-numeric `--dpi` exits with a usage error.

use crate::descriptor::PlanOptions;
use crate::pipeline::RunConfig;
use crate::render::{DEFAULT_DPI, DEFAULT_GERBV, ExportFormat, ExportSettings};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gerbv-vis")]
#[command(about = "Render gerber/drill files of PCB projects to images with gerbv")]
pub struct Cli {
    /// Directory holding the `<project>-<layer>.<ext>` gerber and drill files.
    pub path: PathBuf,
    /// Export format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Png)]
    pub format: ExportFormat,
    /// Board resolution as DPI.
    #[arg(long, default_value_t = DEFAULT_DPI, value_parser = clap::value_parser!(u32).range(1..))]
    pub dpi: u32,
    /// Output directory (defaults to the gerber directory).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Path to the gerbv binary; a bare name is searched on PATH.
    #[arg(long, default_value = DEFAULT_GERBV)]
    pub gerbv: PathBuf,
    /// Draw paste layers.
    #[arg(long)]
    pub show_paste: bool,
    /// Render one image per copper layer (top, bot, inN) instead of one per project.
    #[arg(long)]
    pub views: bool,
    /// JSON file overriding layer colors, visibility and token vocabulary.
    #[arg(long, value_name = "FILE")]
    pub styles: Option<PathBuf>,
    /// Keep the generated .gvp project files next to the images.
    #[arg(long)]
    pub keep_project: bool,
    /// Write or print the project files without invoking gerbv.
    #[arg(long)]
    pub dry_run: bool,
    /// Log debug diagnostics to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        RunConfig {
            gerber_dir: self.path,
            output_dir: self.output,
            gerbv: self.gerbv,
            settings: ExportSettings {
                format: self.format,
                dpi: self.dpi,
            },
            plan: PlanOptions {
                show_paste: self.show_paste,
                views: self.views,
            },
            styles: self.styles,
            keep_project: self.keep_project,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["gerbv-vis", "gerbers"]).unwrap();
        assert_eq!(cli.format, ExportFormat::Png);
        assert_eq!(cli.dpi, 300);
        assert_eq!(cli.gerbv, PathBuf::from("/usr/local/bin/gerbv"));
        assert!(cli.output.is_none());
        assert!(!cli.show_paste);
    }

    #[test]
    fn parses_all_options() {
        let cli = Cli::try_parse_from([
            "gerbv-vis",
            "gerbers",
            "--format",
            "svg",
            "--dpi",
            "600",
            "--output",
            "out",
            "--gerbv",
            "gerbv",
            "--show-paste",
            "--views",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.settings.format, ExportFormat::Svg);
        assert_eq!(config.settings.dpi, 600);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(config.plan.show_paste);
        assert!(config.plan.views);
    }

    #[test]
    fn rejects_bad_format_and_dpi() {
        let err = Cli::try_parse_from(["gerbv-vis", "gerbers", "--format", "jpg"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);

        let err = Cli::try_parse_from(["gerbv-vis", "gerbers", "--dpi", "high"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["gerbv-vis", "gerbers", "--dpi", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn path_is_required() {
        let err = Cli::try_parse_from(["gerbv-vis"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
