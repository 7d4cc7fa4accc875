use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sensor_preprocessor::analyzers::DataStatistics;
use sensor_preprocessor::cache::{LocationCache, LockdownCache};
use sensor_preprocessor::error::Result;
use sensor_preprocessor::geocoding::{GeocodeError, Place, ReverseGeocoder};
use sensor_preprocessor::lockdown::{PolicyError, PolicySource};
use sensor_preprocessor::models::{CleaningPolicy, PipelineConfig, RawRecord, RawRow, RecordMeta};
use sensor_preprocessor::processors::{group_by_location, group_by_sensor, Preprocessor};
use sensor_preprocessor::readers::{SensorReader, SeriesReader};
use sensor_preprocessor::utils::{Interval, SETTINGS_FILE};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Places everything north of 50° in Berlin, the rest in Stuttgart
struct FakeGeocoder;

impl ReverseGeocoder for FakeGeocoder {
    fn reverse(&self, latitude: f64, _longitude: f64) -> std::result::Result<Option<Place>, GeocodeError> {
        let city = if latitude > 50.0 { "Berlin" } else { "Stuttgart" };
        Ok(Some(Place {
            city: city.to_string(),
            country: "Germany".to_string(),
        }))
    }
}

/// Fails for everything north of 50°, places the rest in Stuttgart
struct FlakyGeocoder;

impl ReverseGeocoder for FlakyGeocoder {
    fn reverse(&self, latitude: f64, _longitude: f64) -> std::result::Result<Option<Place>, GeocodeError> {
        if latitude > 50.0 {
            return Err(GeocodeError::Service {
                status: "OVER_QUERY_LIMIT".to_string(),
            });
        }
        Ok(Some(Place {
            city: "Stuttgart".to_string(),
            country: "Germany".to_string(),
        }))
    }
}

struct FakePolicy {
    level: Option<f64>,
}

impl PolicySource for FakePolicy {
    fn stay_at_home_level(
        &self,
        _date: NaiveDate,
        _alpha3: &str,
    ) -> std::result::Result<Option<f64>, PolicyError> {
        Ok(self.level)
    }
}

fn record(sensor_id: &str, date: NaiveDate, lat: f64, values: &[f64]) -> RawRecord {
    let file_name = format!("{}_sds011_sensor_{}.csv", date, sensor_id);
    let rows = values
        .iter()
        .enumerate()
        .map(|(i, &v)| RawRow {
            timestamp: format!("{}T{:02}:00:00", date, 8 + i),
            lat,
            lon: 9.18,
            location_id: "3710".to_string(),
            values: vec![v, v / 2.0],
        })
        .collect();

    RawRecord::new(
        RecordMeta::new(sensor_id, "sds011", date, &file_name),
        vec!["P1".to_string(), "P2".to_string()],
        rows,
    )
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config(output_dir: &Path) -> PipelineConfig {
    PipelineConfig::new(output_dir, vec!["P1".to_string(), "P2".to_string()]).with_max_workers(2)
}

fn empty_caches(dir: &Path) -> (LocationCache, LockdownCache) {
    (
        LocationCache::with_entries(&dir.join("location_cache.json"), std::iter::empty()),
        LockdownCache::with_entries(&dir.join("lockdown_cache.json"), std::iter::empty()),
    )
}

#[test]
fn test_two_days_combined_and_resampled_daily() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let (locations, lockdowns) = empty_caches(dir.path());

    let config = config(&out)
        .with_combine_by_location(true)
        .with_resample_interval(Some("1D".parse::<Interval>()?));
    let mut preprocessor = Preprocessor::new(
        config,
        FakeGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;

    let records = vec![
        record("101", day(2021, 3, 1), 48.78, &[10.0, 20.0]),
        record("101", day(2021, 3, 2), 48.78, &[30.0, 40.0]),
    ];
    let summary = preprocessor.run(records, None)?;

    assert_eq!(summary.records, 2);
    assert_eq!(summary.sensors, 1);
    assert_eq!(summary.locations_written, 1);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(preprocessor.resolver().geocoder_calls(), 1);

    let table = SeriesReader::new().read_file(&out.join("Stuttgart_Germany").join("Stuttgart_Germany.csv"))?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.column("P1").unwrap().values, vec![15.0, 35.0]);
    assert_eq!(table.column("P2").unwrap().values, vec![7.5, 17.5]);
    assert_eq!(
        table.timestamps()[1],
        day(2021, 3, 2).and_hms_opt(0, 0, 0).unwrap()
    );

    assert!(out.join(SETTINGS_FILE).is_file());
    preprocessor.finish()
}

#[test]
fn test_cached_location_skips_geocoder() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let locations = LocationCache::with_entries(
        &dir.path().join("location_cache.json"),
        [("101".to_string(), "Munich_Germany".to_string())],
    );
    let lockdowns = LockdownCache::with_entries(&dir.path().join("lockdown_cache.json"), std::iter::empty());

    let mut preprocessor = Preprocessor::new(
        config(&out),
        FakeGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;
    preprocessor.run(vec![record("101", day(2021, 3, 1), 48.78, &[10.0])], None)?;

    assert_eq!(preprocessor.resolver().geocoder_calls(), 0);
    assert!(out.join("Munich_Germany").join("2021-03-01_101_sds011.csv").is_file());
    preprocessor.finish()
}

#[test]
fn test_cached_lockdown_flags_every_row() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let locations = LocationCache::with_entries(&dir.path().join("location_cache.json"), std::iter::empty());
    let lockdowns = LockdownCache::with_entries(
        &dir.path().join("lockdown_cache.json"),
        [("2020-03-15_DEU".to_string(), true)],
    );

    // The policy would answer "no lockdown"; the cached value must win
    let mut preprocessor = Preprocessor::new(
        config(&out).with_lockdown_info(true),
        FakeGeocoder,
        locations,
        FakePolicy { level: Some(0.0) },
        lockdowns,
    )?;
    preprocessor.run(vec![record("101", day(2020, 3, 15), 48.78, &[10.0, 20.0, 30.0])], None)?;

    assert_eq!(preprocessor.annotator().policy_calls(), 0);

    let table = SeriesReader::new()
        .read_file(&out.join("Stuttgart_Germany").join("2020-03-15_101_sds011.csv"))?;
    assert_eq!(table.column("lockdown").unwrap().values, vec![1.0, 1.0, 1.0]);
    preprocessor.finish()
}

#[test]
fn test_dates_before_policy_data_are_not_looked_up() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let (locations, lockdowns) = empty_caches(dir.path());

    let mut preprocessor = Preprocessor::new(
        config(&out).with_lockdown_info(true),
        FakeGeocoder,
        locations,
        FakePolicy { level: Some(3.0) },
        lockdowns,
    )?;
    preprocessor.run(vec![record("101", day(2019, 12, 30), 48.78, &[10.0, 12.0])], None)?;

    assert_eq!(preprocessor.annotator().policy_calls(), 0);
    assert!(preprocessor.annotator().cache().is_empty());

    let table = SeriesReader::new()
        .read_file(&out.join("Stuttgart_Germany").join("2019-12-30_101_sds011.csv"))?;
    assert_eq!(table.column("lockdown").unwrap().values, vec![0.0, 0.0]);
    preprocessor.finish()
}

#[test]
fn test_invalid_coordinates_are_dropped_without_failing() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let (locations, lockdowns) = empty_caches(dir.path());

    let mut preprocessor = Preprocessor::new(
        config(&out),
        FakeGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;
    let summary = preprocessor.run(
        vec![
            record("101", day(2021, 3, 1), 48.78, &[10.0]),
            record("102", day(2021, 3, 1), f64::NAN, &[10.0]),
        ],
        None,
    )?;

    assert_eq!(summary.unresolved_records, 1);
    assert_eq!(summary.locations_written, 1);
    assert_eq!(preprocessor.resolver().geocoder_calls(), 1);
    assert!(!preprocessor.resolver().cache().contains_key("102"));
    preprocessor.finish()
}

#[test]
fn test_geocoder_failure_drops_only_that_sensor() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let cache_path = dir.path().join("location_cache.json");
    let (locations, lockdowns) = empty_caches(dir.path());

    let mut preprocessor = Preprocessor::new(
        config(&out),
        FlakyGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;
    let summary = preprocessor.run(
        vec![
            record("101", day(2021, 3, 1), 48.78, &[10.0, 11.0]),
            record("102", day(2021, 3, 1), 52.52, &[20.0]),
        ],
        None,
    )?;

    assert_eq!(summary.unresolved_records, 1);
    assert_eq!(summary.locations_written, 1);
    assert_eq!(preprocessor.resolver().geocoder_calls(), 2);
    assert!(out.join("Stuttgart_Germany").join("2021-03-01_101_sds011.csv").is_file());
    assert!(!preprocessor.resolver().cache().contains_key("102"));
    preprocessor.finish()?;

    let reloaded = LocationCache::load(&cache_path)?;
    assert!(reloaded.contains_key("101"));
    assert!(!reloaded.contains_key("102"));
    Ok(())
}

#[test]
fn test_repeated_runs_reuse_cache_and_append() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let cache_path = dir.path().join("location_cache.json");
    let (locations, lockdowns) = empty_caches(dir.path());

    let mut preprocessor = Preprocessor::new(
        config(&out),
        FakeGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;
    for _ in 0..2 {
        preprocessor.run(vec![record("101", day(2021, 3, 1), 48.78, &[10.0, 11.0])], None)?;
    }
    assert_eq!(preprocessor.resolver().geocoder_calls(), 1);
    preprocessor.finish()?;

    let text = fs::read_to_string(out.join("Stuttgart_Germany").join("2021-03-01_101_sds011.csv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines.iter().filter(|l| l.starts_with("timestamp")).count(), 1);

    let reloaded = LocationCache::load(&cache_path)?;
    assert_eq!(reloaded.get("101").map(String::as_str), Some("Stuttgart_Germany"));
    Ok(())
}

#[test]
fn test_grouping_keeps_every_record() {
    let records = vec![
        record("101", day(2021, 3, 1), 48.78, &[1.0]),
        record("102", day(2021, 3, 1), 52.52, &[1.0]),
        record("101", day(2021, 3, 2), 48.78, &[1.0]),
        record("103", day(2021, 3, 1), f64::NAN, &[1.0]),
    ];

    let by_sensor = group_by_sensor(records);
    assert_eq!(by_sensor.values().map(Vec::len).sum::<usize>(), 4);

    let locations = [
        ("101", "Stuttgart_Germany"),
        ("102", "Berlin_Germany"),
        ("103", ""),
    ]
    .into_iter()
    .map(|(id, name)| (id.to_string(), sensor_preprocessor::models::ResolvedLocation::new(name)))
    .collect();

    let groups = group_by_location(by_sensor, &locations);
    assert_eq!(groups.located.len(), 2);
    assert_eq!(groups.unresolved.len(), 1);
    assert_eq!(groups.record_count(), 4);
}

#[test]
fn test_folder_to_statistics() -> Result<()> {
    let dir = TempDir::new()?;
    let raw = dir.path().join("raw").join("2021-03-01");
    let out = dir.path().join("out");
    fs::create_dir_all(&raw)?;
    fs::write(
        raw.join("2021-03-01_sds011_sensor_101.csv"),
        "sensor_id;sensor_type;location;lat;lon;timestamp;P1;durP1;ratioP1;P2\n\
         101;SDS011;3710;48.78;9.18;2021-03-01T00:01:46;10.0;;;5.0\n\
         101;SDS011;3710;48.78;9.18;2021-03-01T00:04:12;12.0;;;6.0\n\
         101;SDS011;3710;48.78;9.18;2021-03-01T00:06:40;;;;7.0\n",
    )?;

    let records = SensorReader::new(vec!["P1".to_string(), "P2".to_string()])
        .read_folder(&dir.path().join("raw"))?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rows.len(), 2);

    let (locations, lockdowns) = empty_caches(dir.path());
    let mut preprocessor = Preprocessor::new(
        config(&out).with_cleaning_policy(CleaningPolicy::None),
        FakeGeocoder,
        locations,
        FakePolicy { level: None },
        lockdowns,
    )?;
    preprocessor.run(records, None)?;
    preprocessor.finish()?;

    let statistics = DataStatistics::from_output_dir(&out)?;
    let path = statistics.write(dir.path())?;
    assert!(path.is_file());
    assert_eq!(statistics.location_statistics.location_count, 1);
    assert_eq!(statistics.overall.time_frame, "2021-03-01 - 2021-03-01");
    assert_eq!(statistics.overall.measurements["P1"].count, 2);
    assert_eq!(statistics.overall.measurements["P1"].mean, Some(11.0));
    Ok(())
}
