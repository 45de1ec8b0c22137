//! Correct contours and convert outlines of OpenType font files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use outline_fix::{
    BatchPolicy, BatchReport, ContourOptions, ConversionOptions, OutlineFont, OutlineFormat,
    WindingSimplifier,
};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Write the fixed fonts to this directory instead of next to the input
    #[arg(long, short, global = true)]
    output_dir: Option<PathBuf>,
    /// Log every glyph that is modified
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Remove overlaps, fix contour direction and drop tiny contours
    FixContours {
        /// Contours with a smaller area are removed; 0 keeps every contour
        #[arg(long, default_value_t = 25)]
        min_area: u32,
        /// Keep TrueType instructions and hinting tables
        #[arg(long)]
        keep_hinting: bool,
        /// Leave failing glyphs unchanged instead of stopping
        #[arg(long)]
        ignore_errors: bool,
        /// Font files to fix (may use glob syntax)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Add points at the horizontal and vertical extremes of curves
    AddExtremes {
        /// Leave failing glyphs unchanged instead of stopping
        #[arg(long)]
        ignore_errors: bool,
        /// Font files to fix (may use glob syntax)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Report outline defects, and optionally fix them
    CheckOutlines {
        /// Contours with a smaller area are reported as too small
        #[arg(long, default_value_t = 25)]
        min_area: u32,
        /// Clean up the outlines and correct contours, then save the font
        #[arg(long)]
        fix: bool,
        /// Keep TrueType instructions and hinting tables when fixing
        #[arg(long)]
        keep_hinting: bool,
        /// Leave failing glyphs unchanged instead of stopping
        #[arg(long)]
        ignore_errors: bool,
        /// Font files to check (may use glob syntax)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Convert TrueType flavored fonts to CFF flavored fonts
    ToOtf {
        #[command(flatten)]
        conversion: ConversionArgs,
    },
    /// Convert CFF flavored fonts to TrueType flavored fonts
    ToTtf {
        #[command(flatten)]
        conversion: ConversionArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ConversionArgs {
    /// Maximum conversion error, in thousandths of an em
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,
    /// Skip contour correction of the converted outlines
    #[arg(long)]
    no_correct_contours: bool,
    /// Write failing glyphs without contours instead of stopping
    #[arg(long)]
    ignore_errors: bool,
    /// Font files to convert (may use glob syntax)
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl ConversionArgs {
    fn options(&self) -> ConversionOptions {
        ConversionOptions {
            tolerance: self.tolerance,
            correct_contours: !self.no_correct_contours,
            ignore_errors: self.ignore_errors,
        }
    }
}

/// What to do with each file.
#[derive(Clone, Debug)]
enum Task {
    FixContours(ContourOptions),
    AddExtremes(BatchPolicy),
    /// Report issues; with options, fix them too.
    CheckOutlines {
        min_area: u32,
        fix: Option<ContourOptions>,
    },
    ToOtf(ConversionOptions),
    ToTtf(ConversionOptions),
}

impl Task {
    /// The extension of the output file, or `None` to keep the input's.
    fn extension(&self) -> Option<&'static str> {
        match self {
            Task::FixContours(_) | Task::AddExtremes(_) | Task::CheckOutlines { .. } => None,
            Task::ToOtf(_) => Some("otf"),
            Task::ToTtf(_) => Some("ttf"),
        }
    }

    fn run(&self, font: &mut OutlineFont, path: &Path) -> Result<BatchReport, String> {
        let simplifier = WindingSimplifier::default();
        let result = match self {
            Task::FixContours(options) => font.correct_contours(options, &simplifier),
            Task::AddExtremes(policy) => font.add_extremes(*policy),
            Task::CheckOutlines { min_area, fix } => {
                let found = font
                    .check_outlines(*min_area, &simplifier)
                    .map_err(|error| error.to_string())?;
                for glyph in &found {
                    for issue in &glyph.issues {
                        log::warn!("{}: '{}' {issue}", path.display(), glyph.glyph);
                    }
                }
                match fix {
                    Some(options) if !found.is_empty() => font.fix_outlines(options, &simplifier),
                    _ => Ok(BatchReport::default()),
                }
            }
            Task::ToOtf(options) => {
                if font.format() == OutlineFormat::PostScript {
                    return Err("font already has CFF outlines".into());
                }
                font.to_cubic(options, &simplifier)
            }
            Task::ToTtf(options) => {
                if font.format() == OutlineFormat::TrueType {
                    return Err("font already has TrueType outlines".into());
                }
                font.to_quadratic(options, &simplifier)
            }
        };
        result.map_err(|error| error.to_string())
    }
}

fn main() {
    use clap::Parser as _;
    let args = Args::parse_from(wild::args());
    let level = match args.verbose {
        true => log::LevelFilter::Debug,
        false => log::LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let (task, files) = match args.command {
        Command::FixContours {
            min_area,
            keep_hinting,
            ignore_errors,
            files,
        } => {
            let options = ContourOptions {
                min_area,
                remove_hinting: !keep_hinting,
                ignore_errors,
                ..Default::default()
            };
            (Task::FixContours(options), files)
        }
        Command::AddExtremes {
            ignore_errors,
            files,
        } => (Task::AddExtremes(BatchPolicy { ignore_errors }), files),
        Command::CheckOutlines {
            min_area,
            fix,
            keep_hinting,
            ignore_errors,
            files,
        } => {
            let fix = fix.then(|| ContourOptions {
                min_area,
                remove_hinting: !keep_hinting,
                ignore_errors,
                ..Default::default()
            });
            (Task::CheckOutlines { min_area, fix }, files)
        }
        Command::ToOtf { conversion } => (Task::ToOtf(conversion.options()), conversion.files),
        Command::ToTtf { conversion } => (Task::ToTtf(conversion.options()), conversion.files),
    };

    if let Some(dir) = &args.output_dir {
        if let Err(error) = std::fs::create_dir_all(dir) {
            log::error!("cannot create {}: {error}", dir.display());
            std::process::exit(1);
        }
    }

    let ok = AtomicBool::new(true);
    files.par_iter().for_each(|path| {
        if let Err(error) = process_file(path, &task, args.output_dir.as_deref()) {
            log::error!("{}: {error}", path.display());
            ok.store(false, Ordering::Release);
        }
    });
    if !ok.load(Ordering::Acquire) {
        std::process::exit(1);
    }
}

fn process_file(path: &Path, task: &Task, output_dir: Option<&Path>) -> Result<(), String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    // the mapping is dropped before the output is written, which may
    // replace this same file
    let data = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| e.to_string())?;
    let mut font = OutlineFont::new(&data).map_err(|e| e.to_string())?;
    let report = task.run(&mut font, path)?;
    for (glyph, error) in report.failed() {
        log::warn!("{}: '{glyph}' left unchanged: {error}", path.display());
    }
    if !report.needs_save() {
        log::info!("{}: no glyphs were modified", path.display());
        return Ok(());
    }
    log::debug!(
        "{}: modified {}",
        path.display(),
        report
            .modified()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    let compiled = font.build(&data).map_err(|e| e.to_string())?;
    drop(data);

    let out_path = output_path(path, task.extension(), output_dir);
    std::fs::write(&out_path, compiled).map_err(|e| format!("{}: {e}", out_path.display()))?;
    log::info!(
        "{}: {} glyphs modified, saved to {}",
        path.display(),
        report.modified().len(),
        out_path.display()
    );
    Ok(())
}

fn output_path(input: &Path, extension: Option<&str>, output_dir: Option<&Path>) -> PathBuf {
    let mut path = match (output_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_owned(),
    };
    if let Some(extension) = extension {
        path.set_extension(extension);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        let input = Path::new("fonts/Sample-Regular.ttf");
        assert_eq!(output_path(input, None, None), input);
        assert_eq!(
            output_path(input, Some("otf"), None),
            Path::new("fonts/Sample-Regular.otf")
        );
        assert_eq!(
            output_path(input, Some("otf"), Some(Path::new("out"))),
            Path::new("out/Sample-Regular.otf")
        );
    }

    #[test]
    fn parse_arguments() {
        use clap::Parser as _;
        let args = Args::parse_from([
            "fontfix",
            "to-otf",
            "--tolerance",
            "0.5",
            "--no-correct-contours",
            "a.ttf",
            "b.ttf",
        ]);
        let Command::ToOtf { conversion } = args.command else {
            panic!("expected to-otf");
        };
        let options = conversion.options();
        assert_eq!(options.tolerance, 0.5);
        assert!(!options.correct_contours);
        assert_eq!(conversion.files.len(), 2);

        let args = Args::parse_from(["fontfix", "fix-contours", "--keep-hinting", "-v", "a.ttf"]);
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Command::FixContours {
                keep_hinting: true,
                min_area: 25,
                ..
            }
        ));

        let args = Args::parse_from(["fontfix", "add-extremes", "--ignore-errors", "a.otf"]);
        assert!(matches!(
            args.command,
            Command::AddExtremes {
                ignore_errors: true,
                ..
            }
        ));

        let args = Args::parse_from(["fontfix", "check-outlines", "--fix", "--min-area", "10", "a.otf"]);
        let Command::CheckOutlines {
            min_area,
            fix,
            keep_hinting,
            ..
        } = args.command
        else {
            panic!("expected check-outlines");
        };
        assert_eq!(min_area, 10);
        assert!(fix);
        assert!(!keep_hinting);
    }
}
