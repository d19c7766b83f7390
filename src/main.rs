use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use flate2::read::GzDecoder;
use pressure_gait_rs::{AnalysisReport, BatchInput, Pipeline, PipelineConfig, RawData};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "pressure_analyzer")]
#[command(about = "Gait and balance analysis of pressure-mat recordings", long_about = None)]
struct Args {
    /// Recording to analyze (.csv or .csv.gz)
    #[arg(long, conflicts_with = "input_dir")]
    input: Option<PathBuf>,

    /// Directory of recordings to batch analyze (*.csv, *.csv.gz)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// JSON pipeline configuration; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the frame rate in Hz
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Serialize)]
struct Envelope {
    generated_at: String,
    reports: Vec<AnalysisReport>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.gait.sample_rate_hz = rate;
        config.validate()?;
    }
    let pipeline = Pipeline::new(config);

    let reports = match (&args.input, &args.input_dir) {
        (Some(path), _) => {
            let bytes = load_recording(path)?;
            let name = file_name(path);
            vec![pipeline.analyze(&RawData::Bytes(&bytes), Some(&name))]
        }
        (None, Some(dir)) => {
            let inputs = collect_dir(dir)?;
            if inputs.is_empty() {
                log::warn!("No recordings found in {}", dir.display());
            }
            pipeline.analyze_batch(&inputs)
        }
        (None, None) => bail!("either --input or --input-dir is required"),
    };

    let degraded = reports.iter().filter(|r| r.is_degraded()).count();
    log::info!("Analyzed {} recordings ({} degraded)", reports.len(), degraded);

    let envelope = Envelope {
        generated_at: Utc::now().to_rfc3339(),
        reports,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{}", json);
    Ok(())
}

fn load_recording(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bytes = Vec::new();
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        BufReader::new(GzDecoder::new(file)).read_to_end(&mut bytes)?;
    } else {
        BufReader::new(file).read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Recording name without the .gz suffix, so it still works as a hardware hint
fn file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(".gz").map(str::to_string).unwrap_or(name)
}

fn collect_dir(dir: &Path) -> Result<Vec<BatchInput>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = file_name(path);
            path.is_file() && name.ends_with(".csv")
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| Ok(BatchInput::new(file_name(path), load_recording(path)?)))
        .collect()
}
