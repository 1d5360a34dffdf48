//! Precompression CLI
//!
//! Walks a static-file tree and writes `.gz`/`.br` siblings for every file
//! worth compressing, printing a per-file report and an aggregate summary.
//! Individual files being skipped or failing never changes the exit code;
//! only a structural failure (such as a missing root) does.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use static_front::compress::{compress_tree, FileReport, Outcome};

#[derive(Parser)]
#[command(
    name = "static-compress",
    about = "Precompress a static file tree for serving"
)]
struct Args {
    /// Path containing static files to compress
    root: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let reports = compress_tree(&args.root)
        .with_context(|| format!("compression run failed for {}", args.root.display()))?;

    for report in &reports {
        print_report(report);
    }
    print_summary(&reports);

    Ok(())
}

fn print_report(report: &FileReport) {
    let path = report.path.display();
    match &report.outcome {
        Outcome::Written {
            algorithm,
            original,
            compressed,
        } => {
            let percent = percent_of(*compressed, *original);
            println!(
                "{path}: {} shrank by {} bytes to {percent}%",
                algorithm.name(),
                original - compressed
            );
        }
        Outcome::Skipped { algorithm } => {
            println!("{path}: {} skipped, not enough gain", algorithm.name());
        }
        Outcome::Failed { error } => {
            println!("{path}: failed: {error}");
        }
    }
}

fn print_summary(reports: &[FileReport]) {
    let written = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Written { .. }))
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Skipped { .. }))
        .count();
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
        .count();
    let saved: u64 = reports.iter().map(FileReport::bytes_saved).sum();

    println!("{written} variants written, {skipped} skipped, {failed} failed, {saved} bytes saved");
}

fn percent_of(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    part * 100 / whole
}
