use crate::analyzers::DataStatistics;
use crate::archive::{ArchiveClient, ArchiveFilter, ArchiveScraper, ScrapeSettings};
use crate::cache::{LocationCache, LockdownCache};
use crate::cli::args::{Cli, Commands, PipelineArgs};
use crate::config::AppConfig;
use crate::error::{ProcessingError, Result};
use crate::geocoding::GoogleGeocoder;
use crate::lockdown::OxcgrtPolicySource;
use crate::models::PipelineConfig;
use crate::processors::{Preprocessor, RunSummary};
use crate::readers::SensorReader;
use crate::utils::progress::ProgressReporter;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type SensorPreprocessor = Preprocessor<GoogleGeocoder, OxcgrtPolicySource>;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let app_config = AppConfig::load(cli.config.as_deref())?;
    if app_config.maps_api_key.is_none() {
        warn!("No maps API key configured; uncached sensor locations cannot be resolved");
    }

    // The pipeline and its HTTP clients are blocking
    tokio::task::spawn_blocking(move || execute(cli.command, &app_config)).await?
}

/// `debug` with `--verbose`, otherwise `RUST_LOG` or `info`
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };

    result.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}

fn execute(command: Commands, app_config: &AppConfig) -> Result<()> {
    match command {
        Commands::Scrape {
            measurements,
            sensor_type,
            start_date,
            end_date,
            location,
            sensor_ids,
            keep_indoor,
            raw_dir,
            preprocess,
            pipeline,
        } => {
            if !preprocess && raw_dir.is_none() {
                warn!("Neither --raw-dir nor --preprocess given; scraped data will be discarded");
            }

            let location_cache = LocationCache::load(&app_config.location_cache_path)?;
            let filter = ArchiveFilter::new()
                .with_sensor_type(sensor_type.as_deref())
                .with_sensor_ids(&sensor_ids)
                .with_location(location.as_deref(), &location_cache)
                .with_remove_indoor(!keep_indoor);

            let settings = ScrapeSettings {
                measurements: measurements.clone(),
                sensor_type,
                start_date,
                end_date,
                location,
                sensor_ids,
                remove_indoor: !keep_indoor,
            };

            println!("Scraping {} to {}", start_date, end_date);
            let client = ArchiveClient::new(&app_config.archive_url)?;
            let scraper = ArchiveScraper::new(client, settings, filter, pipeline.max_workers)?
                .with_raw_dir(raw_dir);

            let days = (end_date - start_date).num_days().max(0) as u64 + 1;
            let progress = ProgressReporter::new(days, "Scraping archive...", false);

            if preprocess {
                let config = pipeline_config(&pipeline, measurements);
                let mut preprocessor = build_preprocessor(app_config, config, location_cache)?;
                let mut total = RunSummary::default();

                let scraped = scraper.run(Some(&progress), |date, records| {
                    info!("Preprocessing {} records from {}", records.len(), date);
                    let summary = preprocessor.run(records, None)?;
                    total.rows_written += summary.rows_written;
                    total.unresolved_records += summary.unresolved_records;
                    total.skipped_records += summary.skipped_records;
                    Ok(())
                })?;
                preprocessor.finish()?;

                progress.finish_with_message(&format!(
                    "Scraped {} records, wrote {} rows",
                    scraped.records, total.rows_written
                ));
                print_summary(&total);
            } else {
                let scraped = scraper.run(Some(&progress), |_, _| Ok(()))?;
                progress.finish_with_message(&format!(
                    "Scraped {} records from {} files ({} days failed)",
                    scraped.records, scraped.files, scraped.failed_days
                ));
            }
        }

        Commands::Preprocess {
            data_folder,
            measurements,
            pipeline,
        } => {
            println!("Preprocessing sensor data...");
            println!("Input folder: {}", data_folder.display());
            println!("Output directory: {}", pipeline.output_dir.display());

            let records = SensorReader::new(measurements.clone()).read_folder(&data_folder)?;
            if records.is_empty() {
                println!("No sensor records found");
                return Ok(());
            }

            let location_cache = LocationCache::load(&app_config.location_cache_path)?;
            let config = pipeline_config(&pipeline, measurements);
            let mut preprocessor = build_preprocessor(app_config, config, location_cache)?;

            let progress = ProgressReporter::new_spinner("Preprocessing...", false);
            let summary = preprocessor.run(records, Some(&progress))?;
            preprocessor.finish()?;
            progress.finish_with_message(&format!(
                "Wrote {} locations",
                summary.locations_written
            ));

            print_summary(&summary);
        }

        Commands::Stats {
            data_folder,
            output_dir,
        } => {
            println!("Computing statistics for {}", data_folder.display());

            let statistics = DataStatistics::from_output_dir(&data_folder)?;
            let path = statistics.write(output_dir.as_deref().unwrap_or(&data_folder))?;

            println!(
                "Wrote statistics for {} locations to {}",
                statistics.location_statistics.location_count,
                path.display()
            );
        }
    }

    Ok(())
}

fn pipeline_config(args: &PipelineArgs, measurements: Vec<String>) -> PipelineConfig {
    PipelineConfig::new(&args.output_dir, measurements)
        .with_combine_by_location(args.combine)
        .with_resample_interval(args.resample.clone())
        .with_lockdown_info(args.lockdown)
        .with_cleaning_policy(args.cleaning)
        .with_max_workers(args.max_workers)
}

fn build_preprocessor(
    app_config: &AppConfig,
    config: PipelineConfig,
    location_cache: LocationCache,
) -> Result<SensorPreprocessor> {
    let geocoder = GoogleGeocoder::new(&app_config.geocode_url, app_config.maps_api_key.clone())
        .map_err(|e| ProcessingError::Config(format!("Failed to create geocoder: {}", e)))?;
    let policy = OxcgrtPolicySource::new(&app_config.policy_url)
        .map_err(|e| ProcessingError::Config(format!("Failed to create policy source: {}", e)))?;
    let lockdown_cache = LockdownCache::load(&app_config.lockdown_cache_path)?;

    Preprocessor::new(config, geocoder, location_cache, policy, lockdown_cache)
}

fn print_summary(summary: &RunSummary) {
    println!("\nRows written: {}", summary.rows_written);
    if summary.unresolved_records > 0 {
        println!(
            "Dropped {} records without a resolved location",
            summary.unresolved_records
        );
    }
    if summary.skipped_records > 0 {
        println!("Skipped {} unreadable records", summary.skipped_records);
    }
}
