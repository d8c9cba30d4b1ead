//! `kbf-conformance` — checks the standard kind catalog for well-formedness.
//!
//! **Usage:**
//! ```text
//! kbf-conformance [--json]
//! ```
//!
//! Exits non-zero if any conformance check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use kbf_conformance::validate;
use kbf_kinds::KindRegistry;

/// Check the kind catalog.
#[derive(Parser)]
#[command(
    name = "kbf-conformance",
    about = "Validate the facade kind catalog",
    version
)]
struct Args {
    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let registry = KindRegistry::standard();
    let report = validate(&registry);

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        println!("Kind Catalog Conformance Report");
        println!("===============================");
        println!();
        for result in &report.results {
            println!("{result}");
        }
        println!();
        let failed = report.failure_count();
        let warned = report.warning_count();
        println!(
            "Summary: {} passed, {} warnings, {} failed",
            report.results.len() - failed - warned,
            warned,
            failed
        );
    }

    if !report.all_passed() {
        eprintln!(
            "Conformance FAILED: {} check(s) did not pass.",
            report.failure_count()
        );
        process::exit(1);
    }
    if !args.json {
        println!("Conformance PASSED.");
    }
    Ok(())
}
