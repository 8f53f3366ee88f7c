//! yokogaki - repair vertical-writing EPUBs for horizontal reading

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use yokogaki::{fix_batch_with, fix_file};

#[derive(Parser)]
#[command(name = "yokogaki")]
#[command(version, about = "Repair vertical-writing EPUBs for horizontal reading", long_about = None)]
#[command(after_help = "EXAMPLES:
    yokogaki book.epub -o fixed.epub      Fix one file to a new path
    yokogaki a.epub b.epub -d fixed/      Fix a batch into a directory
    yokogaki *.epub --overwrite           Fix files in place")]
struct Cli {
    /// Input EPUB files
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Output file (single input only)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output directory for fixed files
    #[arg(short = 'd', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Overwrite the input files in place
    #[arg(long)]
    overwrite: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(message) = validate(&cli) {
        eprintln!("error: {message}");
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &cli.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: cannot create {}: {e}", dir.display());
        return ExitCode::FAILURE;
    }

    if cli.files.len() == 1 {
        fix_single(&cli)
    } else {
        fix_many(&cli)
    }
}

/// Exactly one destination must be chosen before any file is touched.
fn validate(cli: &Cli) -> Result<(), String> {
    let destinations = [cli.output.is_some(), cli.output_dir.is_some(), cli.overwrite]
        .into_iter()
        .filter(|set| *set)
        .count();

    if destinations == 0 {
        return Err("one of --output, --output-dir or --overwrite is required".to_string());
    }
    if destinations > 1 {
        return Err("--output, --output-dir and --overwrite are mutually exclusive".to_string());
    }
    if cli.files.len() > 1 && cli.output.is_some() {
        return Err("--output only works with a single input; use --output-dir".to_string());
    }

    Ok(())
}

fn fix_single(cli: &Cli) -> ExitCode {
    let input = &cli.files[0];

    let output = cli.output.clone().or_else(|| {
        cli.output_dir
            .as_ref()
            .map(|dir| dir.join(input.file_name().unwrap_or(input.as_os_str())))
    });

    if !cli.quiet {
        println!("Fixing {}", input.display());
    }

    if fix_file(input, output.as_deref()) {
        if !cli.quiet {
            println!("Done.");
        }
        ExitCode::SUCCESS
    } else {
        eprintln!("error: failed to fix {}", input.display());
        ExitCode::FAILURE
    }
}

fn fix_many(cli: &Cli) -> ExitCode {
    let report = fix_batch_with(&cli.files, cli.output_dir.as_deref(), |path, done, total| {
        if !cli.quiet {
            println!("[{}/{}] {}", done + 1, total, path.display());
        }
    });

    if !cli.quiet {
        println!();
        println!("{} of {} fixed", report.succeeded, report.total);
    }

    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        for path in &report.failed {
            eprintln!("error: failed to fix {}", path.display());
        }
        ExitCode::FAILURE
    }
}
