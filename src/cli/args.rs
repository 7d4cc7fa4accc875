use crate::models::CleaningPolicy;
use crate::utils::Interval;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sensor-preprocessor")]
#[command(about = "Sensor.Community archive retrieval and air-quality time series preprocessing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file (TOML or JSON)")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download sensor files from the archive, optionally preprocessing each day
    Scrape {
        #[arg(short, long, value_delimiter = ',', default_value = "P1,P2")]
        measurements: Vec<String>,

        #[arg(long, help = "Sensor type substring, e.g. 'sds011'")]
        sensor_type: Option<String>,

        #[arg(long, help = "First day (YYYY-MM-DD)")]
        start_date: NaiveDate,

        #[arg(long, help = "Last day, inclusive (YYYY-MM-DD)")]
        end_date: NaiveDate,

        #[arg(long, help = "Only sensors cached at this location, e.g. 'Stuttgart_Germany'")]
        location: Option<String>,

        #[arg(long, value_delimiter = ',')]
        sensor_ids: Vec<String>,

        #[arg(long, help = "Keep indoor sensors")]
        keep_indoor: bool,

        #[arg(long, help = "Save downloaded files below this directory")]
        raw_dir: Option<PathBuf>,

        #[arg(long, help = "Preprocess each scraped day into --output-dir")]
        preprocess: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Preprocess archive files from a local folder
    Preprocess {
        #[arg(short, long, help = "Folder containing archive CSV files")]
        data_folder: PathBuf,

        #[arg(short, long, value_delimiter = ',', default_value = "P1,P2")]
        measurements: Vec<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Compute statistics over a preprocessed output directory
    Stats {
        #[arg(short, long, help = "Preprocessed output directory")]
        data_folder: PathBuf,

        #[arg(short, long, help = "Directory for statistics.json [default: data folder]")]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(short, long, default_value = "preprocessed")]
    pub output_dir: PathBuf,

    #[arg(long, help = "Combine all sensors of a location into one series")]
    pub combine: bool,

    #[arg(long, help = "Resample interval, e.g. '1h', '15min', '1D'")]
    pub resample: Option<Interval>,

    #[arg(long, help = "Add a stay-at-home lockdown flag column")]
    pub lockdown: bool,

    #[arg(long, value_enum, default_value_t = CleaningPolicy::Zscore)]
    pub cleaning: CleaningPolicy,

    #[arg(long, default_value_t = num_cpus::get())]
    pub max_workers: usize,
}
