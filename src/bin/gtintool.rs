use clap::{Parser, Subcommand};
use gtin_scan::ScanConfig;
use gtin_scan::error::ToolError;
use gtin_scan::models::{Difficulty, Mode};
use gtin_scan::regions::regions_for;
use gtin_scan::tools::{
    load_config, load_rgba, preprocess_regions, sharpness, validate_code, write_regions,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gtintool", version, about = "GTIN acquisition diagnostics")]
struct Cli {
    /// JSON scan config (GTIN_* environment overrides still apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check format, checksum and GTIN-14 form of codes
    Validate {
        codes: Vec<String>,
        /// Print one JSON object per code
        #[arg(long)]
        json: bool,
    },
    /// Print the crop rectangles scheduled for a frame size
    Regions {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Difficulty level 0-2; all levels when omitted
        #[arg(long)]
        difficulty: Option<u8>,
    },
    /// Laplacian variance of the center crop and whether rescue would gate it
    Sharpness {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = 0)]
        difficulty: u8,
    },
    /// Preprocess every region of an image and write them as PNG
    Preprocess {
        #[arg(long)]
        image: PathBuf,
        /// none, enhance or cv
        #[arg(long)]
        mode: Mode,
        #[arg(long, default_value_t = 2)]
        difficulty: u8,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Validate { codes, json } => validate_cmd(&codes, json),
        Command::Regions {
            width,
            height,
            difficulty,
        } => {
            regions_cmd(width, height, difficulty, &config);
            Ok(true)
        }
        Command::Sharpness { image, difficulty } => sharpness_cmd(&image, difficulty, &config),
        Command::Preprocess {
            image,
            mode,
            difficulty,
            out,
        } => preprocess_cmd(&image, mode, difficulty, &out, &config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn validate_cmd(codes: &[String], json: bool) -> Result<bool, ToolError> {
    let mut all_valid = true;
    for code in codes {
        let report = validate_code(code);
        all_valid &= report.gtin14.is_some();
        if json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("Failed to encode report for {code}: {err}"),
            }
            continue;
        }
        match (&report.gtin14, &report.error) {
            (Some(gtin14), _) => println!("{}: valid (GTIN-14 {gtin14})", report.code),
            (None, Some(error)) => println!("{}: invalid ({error})", report.code),
            (None, None) => println!("{}: invalid", report.code),
        }
    }
    Ok(all_valid)
}

fn regions_cmd(width: u32, height: u32, difficulty: Option<u8>, config: &ScanConfig) {
    let levels: Vec<Difficulty> = match difficulty {
        Some(level) => vec![Difficulty::from_level(level)],
        None => vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
    };
    println!("Frame: {width}x{height}");
    for level in levels {
        let modes: Vec<&str> = level.modes().iter().map(Mode::name).collect();
        println!("Difficulty {level} (modes: {})", modes.join(", "));
        for region in regions_for(level, width, height, &config.regions) {
            let r = region.rect;
            let note = if r.is_empty() { " (skipped)" } else { "" };
            println!(
                "  {:<6} x={:<5} y={:<5} w={:<5} h={:<5} px={:<8}{note}",
                region.anchor.name(),
                r.x,
                r.y,
                r.w,
                r.h,
                r.area()
            );
        }
    }
}

fn sharpness_cmd(image: &Path, difficulty: u8, config: &ScanConfig) -> Result<bool, ToolError> {
    let frame = load_rgba(image)?;
    println!("Image: {} ({}x{})", image.display(), frame.width(), frame.height());
    let report = sharpness(&frame, Difficulty::from_level(difficulty), config)?;
    println!(
        "Center crop {}x{}: gray {}-{} (avg {})",
        report.width, report.height, report.gray.min, report.gray.max, report.gray.avg
    );
    println!(
        "Laplacian variance {:.1} (threshold {:.1}): rescue {}",
        report.variance,
        report.threshold,
        if report.gated { "would be skipped" } else { "would run" }
    );
    Ok(true)
}

fn preprocess_cmd(
    image: &Path,
    mode: Mode,
    difficulty: u8,
    out: &Path,
    config: &ScanConfig,
) -> Result<bool, ToolError> {
    let frame = load_rgba(image)?;
    let level = Difficulty::from_level(difficulty);
    let processed = preprocess_regions(&frame, mode, level, config)?;
    for p in &processed {
        println!("  {:<6} {:?}", p.region.anchor.name(), p.outcome);
    }
    let paths = write_regions(&processed, mode, out)?;
    info!("wrote {} regions to {}", paths.len(), out.display());
    Ok(true)
}
