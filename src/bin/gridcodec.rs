//! gridcodec command line tool
//!
//! Compresses a text grid (one row of integers per line) or restores one from
//! a container. The direction is picked from the input's magic bytes.
//!
//! ## Usage
//!
//! ```bash
//! # Compress with the default configuration
//! gridcodec data.txt data.grd
//!
//! # Decompress (detected automatically)
//! gridcodec data.grd data.txt
//!
//! # Pick a named profile, then override single settings
//! gridcodec data.txt data.grd --profile canonical_prefix --no-rle --verify
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use colored::*;

use gridcodec::bridge;
use gridcodec::config::{EntropyCoderKind, PredictorMode};
use gridcodec::observability::enable_verbose_logging;
use gridcodec::{CodecConfig, CodecError};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum CoderArg {
    Rice,
    Prefix,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PredictorArg {
    Delta1,
    Delta2,
    Neighbor,
}

#[derive(Parser, Debug)]
#[command(name = "gridcodec")]
#[command(version)]
#[command(about = "Lossless codec for row-structured integer grids", long_about = None)]
struct Args {
    /// Text grid or gridcodec container to read
    input: PathBuf,

    /// Where to write the result
    output: PathBuf,

    /// Decode the fresh output again and compare it with the input
    #[arg(long)]
    verify: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Named configuration profile (ignored when --config is given)
    #[arg(short, long)]
    profile: Option<String>,

    /// Entropy coder override
    #[arg(long, value_enum)]
    coder: Option<CoderArg>,

    /// Predictor override
    #[arg(long, value_enum)]
    predictor: Option<PredictorArg>,

    /// Disable run folding
    #[arg(long)]
    no_rle: bool,

    /// Enable info-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, requires = "verbose")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        if let Err(e) = enable_verbose_logging(args.log_file.as_deref()) {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CodecError> {
    let input = fs::read(&args.input)?;
    match bridge::detect_format(&input) {
        Some(format) => {
            println!("{} {} container", "Decompressing".cyan().bold(), format);
            decompress_file(args, &input)
        }
        None => {
            println!("{} text grid", "Compressing".cyan().bold());
            let config = build_config(args)?;
            compress_file(args, &input, &config)
        }
    }
}

/// A JSON file wins over a profile; individual flags override either.
fn build_config(args: &Args) -> Result<CodecConfig, CodecError> {
    let mut config = match (&args.config, &args.profile) {
        (Some(path), _) => CodecConfig::from_json_file(path)?,
        (None, Some(name)) => CodecConfig::profile(name)?,
        (None, None) => CodecConfig::default(),
    };
    if args.config.is_some() && args.profile.is_some() {
        log::warn!("--config takes precedence over --profile");
    }

    if let Some(coder) = args.coder {
        config.coder = match coder {
            CoderArg::Rice => EntropyCoderKind::GolombRice,
            CoderArg::Prefix => EntropyCoderKind::Prefix,
        };
    }
    if let Some(predictor) = args.predictor {
        config.predictor = match predictor {
            PredictorArg::Delta1 => PredictorMode::FirstOrderDelta,
            PredictorArg::Delta2 => PredictorMode::SecondOrderDelta,
            PredictorArg::Neighbor => PredictorMode::Neighbor2d,
        };
    }
    if args.no_rle {
        config.run_folding = None;
    }
    config.validate()?;
    Ok(config)
}

fn compress_file(args: &Args, input: &[u8], config: &CodecConfig) -> Result<(), CodecError> {
    let start = Instant::now();
    let grid = bridge::parse_rows(input)?;
    let bytes = bridge::compress(grid.samples(), grid.layout(), config)?;
    fs::write(&args.output, &bytes)?;
    let elapsed = start.elapsed().as_secs_f64();

    report(input.len(), bytes.len(), elapsed, true);

    if args.verify {
        let (samples, layout) = bridge::decompress(&bytes)?;
        let expected = bridge::format_rows(grid.samples(), grid.layout())?;
        let actual = bridge::format_rows(&samples, &layout)?;
        check_verification(expected == actual)?;
    }
    Ok(())
}

fn decompress_file(args: &Args, input: &[u8]) -> Result<(), CodecError> {
    let start = Instant::now();
    let (samples, layout) = bridge::decompress(input)?;
    let text = bridge::format_rows(&samples, &layout)?;
    fs::write(&args.output, text.as_bytes())?;
    let elapsed = start.elapsed().as_secs_f64();

    report(input.len(), text.len(), elapsed, false);

    if args.verify {
        let written = fs::read(&args.output)?;
        let reparsed = bridge::parse_rows(written.as_slice())?;
        check_verification(reparsed.samples() == samples && reparsed.layout() == &layout)?;
    }
    Ok(())
}

fn check_verification(matches: bool) -> Result<(), CodecError> {
    if matches {
        println!("{} output decodes back to the input", "Verified:".green().bold());
        Ok(())
    } else {
        Err(CodecError::ConsistencyError(
            "verification failed: round trip does not reproduce the input".to_string(),
        ))
    }
}

fn report(size_in: usize, size_out: usize, elapsed: f64, compressing: bool) {
    let kb = |bytes: usize| bytes as f64 / 1024.0;
    let speed = if elapsed > 0.0 { kb(size_in) / elapsed } else { f64::INFINITY };

    println!("{} {:.3} s", "- Time:".bold(), elapsed);
    println!("{} {:.2} kB", "- Input size:".bold(), kb(size_in));
    println!("{} {:.2} kB", "- Output size:".bold(), kb(size_out));
    if compressing {
        let ratio = if size_out == 0 {
            f64::INFINITY
        } else {
            size_in as f64 / size_out as f64
        };
        println!("{} {:.2}x", "- Ratio:".bold(), ratio);
    }
    println!("{} {:.2} kB/s", "- Speed:".bold(), speed);
}
