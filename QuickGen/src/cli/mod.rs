//! QuickGen CLI - batch conversion between CodeWalker XML and REL/YMT files

pub mod progress;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{ArgAction, Parser, ValueEnum};
use cwbridge::prelude::*;

use crate::config;
use crate::error::Error;
use crate::pipeline::{self, BatchReport, BatchRequest, JobEvent};
use progress::{GEAR, LINK, LOOKING_GLASS, converted_line, failed_line, print_done, print_step};

/// Exit code for a run that could not start because of how it was invoked.
pub const EXIT_USAGE: u8 = 2;
/// Exit code for a failed or partially failed run.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "quickgen", version)]
#[command(about = "QuickGen: CodeWalker XML to REL/YMT batch converter", long_about = None)]
pub struct Cli {
    /// File type - rel OR ymt
    #[arg(value_enum)]
    pub file_type: FileType,

    /// Target path - where *.rel (or *.ymt) files will get created
    pub target: PathBuf,

    /// Sources path - where *.rel.xml (or *.ymt.pso.xml) files are located
    pub source: PathBuf,

    /// Convert packed *.rel (or *.ymt) files back to XML instead
    #[arg(long)]
    pub to_xml: bool,

    /// CodeWalker directory (overrides the stored configuration for this run)
    #[arg(long, value_name = "DIR")]
    pub library: Option<PathBuf>,

    /// Only report failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Rel,
    Ymt,
}

impl From<FileType> for AssetFormat {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Rel => AssetFormat::Rel,
            FileType::Ymt => AssetFormat::Ymt,
        }
    }
}

impl Cli {
    /// The conversion this invocation asks for.
    #[must_use]
    pub fn conversion(&self) -> Conversion {
        let direction = if self.to_xml {
            Direction::ToXml
        } else {
            Direction::ToBinary
        };
        Conversion::new(self.file_type.into(), direction)
    }
}

/// Run the QuickGen CLI
pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            eprintln!("{} of {} files failed", report.failed.len(), report.total());
            ExitCode::from(EXIT_FAILURE)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            let usage = e.downcast_ref::<Error>().is_some_and(Error::is_usage);
            ExitCode::from(if usage { EXIT_USAGE } else { EXIT_FAILURE })
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: &Cli) -> anyhow::Result<BatchReport> {
    let started = Instant::now();
    let conversion = cli.conversion();
    let request = BatchRequest {
        conversion,
        source_dir: std::path::absolute(&cli.source)?,
        target_dir: std::path::absolute(&cli.target)?,
    };

    // Checked before prompting for anything or loading anything.
    if !request.source_dir.is_dir() {
        return Err(Error::SourceNotFound(request.source_dir).into());
    }

    if !cli.quiet {
        print_step(1, 3, &LINK, &format!("Loading {COMPONENT_NAME}..."));
    }
    let config_file = config::config_file_path()?;
    let library_root = config::resolve_library_path(
        &config_file,
        cli.library.as_deref(),
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )?;
    let bridge = LibraryBridge::open(&library_root)?;
    let codec = NativeCodec::bind(&bridge)?;

    if !cli.quiet {
        print_step(
            2,
            3,
            &LOOKING_GLASS,
            &format!("Scanning for *{} files...", conversion.source_suffix()),
        );
    }
    let bar = if cli.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        progress::simple_bar(0, "Converting")
    };

    let report = pipeline::run(&codec, &request, |event| match event {
        JobEvent::Planned { total } => {
            if !cli.quiet {
                bar.suspend(|| {
                    print_step(3, 3, &GEAR, &format!("Converting {total} files ({conversion})..."));
                });
            }
            bar.set_length(*total as u64);
        }
        JobEvent::Converted { job, .. } => {
            if !cli.quiet {
                bar.suspend(|| println!("{}", converted_line(&job.name)));
            }
            bar.inc(1);
        }
        JobEvent::Failed { job, error, .. } => {
            bar.suspend(|| println!("{}", failed_line(&job.name, &error.to_string())));
            bar.inc(1);
        }
    });
    bar.finish_and_clear();
    let report = report?;

    if !cli.quiet {
        print_done(started.elapsed());
    }
    Ok(report)
}
