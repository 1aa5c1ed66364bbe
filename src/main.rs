//! imflag CLI entry point
//!
//! Reads the unfiltered and imputed VCFs, writes the flagged VCF to stdout
//! and a run summary to stderr.

use clap::Parser;
use imflag::core::{flag_calls, io::open_variant_reader, io::DEFAULT_BUFFER_SIZE};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "imflag")]
#[command(about = "Flag imputed VCF genotypes against the unfiltered sequencing calls they replaced")]
#[command(version)]
#[command(author = "imflag Contributors")]
#[command(after_help = "Output VCF is written to stdout.")]
struct Cli {
    /// Unfiltered VCF with pre-GQ-filtering calls (plain, gzip or bzip2)
    unfiltered: PathBuf,

    /// Imputation-engine output VCF over the filtered sites (plain, gzip or bzip2)
    imputed: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let unfiltered = open_variant_reader(&cli.unfiltered)
        .map_err(|e| anyhow::anyhow!("Failed to open unfiltered VCF {:?}: {}", cli.unfiltered, e))?;
    let imputed = open_variant_reader(&cli.imputed)
        .map_err(|e| anyhow::anyhow!("Failed to open imputed VCF {:?}: {}", cli.imputed, e))?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, stdout.lock());

    // Flush whatever was produced before reporting an error: partial output
    // up to the failing site is kept on stdout.
    let result = flag_calls(unfiltered, imputed, &mut out);
    out.flush()?;
    let stats = result?;

    eprintln!("\n=== Merge Statistics ===");
    eprintln!("Sites written:   {}", stats.sites);
    eprintln!("Sites skipped:   {}", stats.skipped);
    eprintln!("IM=0 (original): {}", stats.flags[0]);
    eprintln!("IM=1 (imputed):  {}", stats.flags[1]);
    eprintln!("IM=2 (het):      {}", stats.flags[2]);
    eprintln!("IM=3 (hom):      {}", stats.flags[3]);
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
