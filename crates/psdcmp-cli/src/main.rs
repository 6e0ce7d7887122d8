use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use psdcmp_lib::{
    aggregate::average_channels,
    config::{read_config, to_toml, AnalysisConfig, FilterConfig, FrequencyBand},
    io::{
        openbci::{read_openbci_tsv, CYTON_SCALE_UV},
        table::{write_comparison_csv, write_psd_csv},
    },
    pipeline::{compare_files, recording_spectra},
    spectrum::periodogram_db,
    summary::summarize_csv,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "psdcmp",
    version,
    about = "Compare eyes-closed/eyes-open EEG spectra between two subjects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads a capture.
#[derive(Args, Clone, Debug)]
struct AnalysisArgs {
    /// TOML analysis configuration; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the sampling rate (Hz)
    #[arg(long)]
    fs: Option<f64>,
    /// Convert raw Cyton ADC counts to microvolts
    #[arg(long)]
    cyton: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FilterChoice {
    #[value(name = "none")]
    None,
    #[value(name = "low")]
    Low,
    #[value(name = "high")]
    High,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two captures under every configured filter and write the table
    Compare {
        #[arg(long)]
        a: PathBuf,
        #[arg(long)]
        b: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long)]
        band_lo: Option<f64>,
        #[arg(long)]
        band_hi: Option<f64>,
        #[arg(long)]
        name_a: Option<String>,
        #[arg(long)]
        name_b: Option<String>,
    },
    /// Per-condition Welch PSD of one capture as CSV
    Psd {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "none")]
        filter: FilterChoice,
        /// Cutoff in Hz; 30 for low-pass and 0.5 for high-pass when omitted
        #[arg(long)]
        cutoff: Option<f64>,
    },
    /// Whole-recording periodogram (dB) as JSON
    Periodogram {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Number of low-frequency bins to drop
        #[arg(long, default_value_t = 40)]
        skip_bins: usize,
    },
    /// Average every metric column of a comparison table, overall and per filter
    Summarize {
        #[arg(long)]
        table: PathBuf,
    },
    /// Print the default configuration as TOML
    Config,
}

#[derive(Serialize)]
struct PeriodogramOutput {
    fs: f64,
    skip_bins: usize,
    points: Vec<[f64; 2]>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare {
            a,
            b,
            out,
            analysis,
            band_lo,
            band_hi,
            name_a,
            name_b,
        } => {
            let mut config = load_config(&analysis)?;
            if band_lo.is_some() || band_hi.is_some() {
                config.band = FrequencyBand::new(
                    band_lo.unwrap_or(config.band.lo_hz),
                    band_hi.unwrap_or(config.band.hi_hz),
                );
            }
            if let Some(name) = name_a {
                config.subject_a = name;
            }
            if let Some(name) = name_b {
                config.subject_b = name;
            }
            cmd_compare(&a, &b, &out, &config)?
        }
        Commands::Psd {
            input,
            out,
            analysis,
            filter,
            cutoff,
        } => cmd_psd(&input, &out, &load_config(&analysis)?, filter, cutoff)?,
        Commands::Periodogram {
            input,
            analysis,
            skip_bins,
        } => cmd_periodogram(&input, &load_config(&analysis)?, skip_bins)?,
        Commands::Summarize { table } => cmd_summarize(&table)?,
        Commands::Config => cmd_config()?,
    }
    Ok(())
}

fn load_config(args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(fs) = args.fs {
        config.sampling_rate_hz = fs;
    }
    if args.cyton {
        config.scale = CYTON_SCALE_UV;
    }
    config.validate().context("invalid analysis configuration")?;
    Ok(config)
}

fn cmd_compare(a: &Path, b: &Path, out: &Path, config: &AnalysisConfig) -> Result<()> {
    let table = compare_files(a, b, config)?;
    write_comparison_csv(out, &table)?;
    info!("wrote {} rows to {}", table.rows.len(), out.display());
    for summary in &table.summaries {
        println!("{}", serde_json::to_string(summary)?);
    }
    Ok(())
}

fn cmd_psd(
    input: &Path,
    out: &Path,
    config: &AnalysisConfig,
    filter: FilterChoice,
    cutoff: Option<f64>,
) -> Result<()> {
    let filter = match filter {
        FilterChoice::None => FilterConfig::none(),
        FilterChoice::Low => FilterConfig::low_pass(cutoff.unwrap_or(30.0)),
        FilterChoice::High => FilterConfig::high_pass(cutoff.unwrap_or(0.5)),
    };
    let recording = read_openbci_tsv(input, config.has_header)?;
    let psd = recording_spectra(&recording, config, &filter)
        .with_context(|| format!("estimating spectra of {}", input.display()))?;
    write_psd_csv(out, &psd)?;
    Ok(())
}

fn cmd_periodogram(input: &Path, config: &AnalysisConfig, skip_bins: usize) -> Result<()> {
    let recording = read_openbci_tsv(input, config.has_header)?;
    let series = average_channels(
        &recording,
        &config.channels,
        config.sampling_rate_hz,
        config.scale,
    )
    .with_context(|| format!("aggregating channels of {}", input.display()))?;
    let curve = periodogram_db(&series, skip_bins);
    let output = PeriodogramOutput {
        fs: series.fs,
        skip_bins,
        points: curve.points(),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_summarize(table: &Path) -> Result<()> {
    let summary = summarize_csv(table)?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_config() -> Result<()> {
    print!("{}", to_toml(&AnalysisConfig::default())?);
    Ok(())
}
