//! Prints the structure of a PDF document.
//!
//! ```text
//! docreport curriculum.pdf
//! RUST_LOG=debug docreport curriculum.pdf --scan-pages 100
//! ```
//!
//! Exits 0 on success, 1 on any failure.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsu_ops::report::{self, ReportConfig};

#[derive(Debug, Parser)]
#[command(
    name = "docreport",
    version,
    about = "Print page count, metadata, sample text and achievement codes of a PDF"
)]
struct Cli {
    /// PDF file to analyse.
    #[arg(default_value = "document.pdf")]
    path: PathBuf,

    /// Characters of first-page text to print.
    #[arg(long, default_value_t = 800)]
    sample_chars: usize,

    /// Pages scanned for achievement codes.
    #[arg(long, default_value_t = 50)]
    scan_pages: usize,

    /// Unique achievement codes collected before the scan stops.
    #[arg(long, default_value_t = 10)]
    max_codes: usize,

    /// Pages listed in the text length table.
    #[arg(long, default_value_t = 10)]
    length_pages: usize,
}

impl Cli {
    fn config(&self) -> ReportConfig {
        ReportConfig {
            sample_chars: self.sample_chars,
            scan_pages: self.scan_pages,
            max_codes: self.max_codes,
            length_pages: self.length_pages,
        }
    }
}

fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries the report only.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut out = io::stdout().lock();

    match report::run(&cli.path, &cli.config(), &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("error: failed to analyse {}: {e}", cli.path.display());
            ExitCode::from(1)
        }
    }
}
