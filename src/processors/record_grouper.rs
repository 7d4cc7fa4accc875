use crate::models::{RawRecord, ResolvedLocation};
use std::collections::{BTreeMap, HashMap};

/// Records keyed by sensor id; each list keeps input order
pub type SensorGroups = BTreeMap<String, Vec<RawRecord>>;

/// Result of grouping by resolved location.
///
/// Records of sensors without a resolved location land in `unresolved`;
/// every record appears in exactly one of the two.
#[derive(Debug, Default)]
pub struct LocationGroups {
    pub located: BTreeMap<ResolvedLocation, Vec<RawRecord>>,
    pub unresolved: Vec<RawRecord>,
}

impl LocationGroups {
    pub fn record_count(&self) -> usize {
        self.located.values().map(Vec::len).sum::<usize>() + self.unresolved.len()
    }
}

/// Partition records by sensor id. Records are never deduplicated.
pub fn group_by_sensor(records: Vec<RawRecord>) -> SensorGroups {
    let mut groups = SensorGroups::new();
    for record in records {
        groups
            .entry(record.sensor_id().to_string())
            .or_default()
            .push(record);
    }
    groups
}

/// Merge sensor groups that share a resolved location
pub fn group_by_location(
    sensor_groups: SensorGroups,
    locations: &HashMap<String, ResolvedLocation>,
) -> LocationGroups {
    let mut groups = LocationGroups::default();

    for (sensor_id, records) in sensor_groups {
        match locations.get(&sensor_id).filter(|l| l.is_resolved()) {
            Some(location) => groups
                .located
                .entry(location.clone())
                .or_default()
                .extend(records),
            None => groups.unresolved.extend(records),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRow, RecordMeta};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(sensor_id: &str, day: u32) -> RawRecord {
        let date = NaiveDate::from_ymd_opt(2021, 1, day).unwrap();
        let file_name = format!("{}_sds011_sensor_{}.csv", date, sensor_id);
        RawRecord::new(
            RecordMeta::new(sensor_id, "sds011", date, &file_name),
            vec!["P1".to_string()],
            vec![RawRow {
                timestamp: format!("{}T00:00:00", date),
                lat: 48.78,
                lon: 9.18,
                location_id: "1".to_string(),
                values: vec![1.0],
            }],
        )
    }

    #[test]
    fn test_group_by_sensor_keeps_order_and_duplicates() {
        let groups = group_by_sensor(vec![
            record("1", 2),
            record("2", 1),
            record("1", 1),
            record("1", 1),
        ]);

        assert_eq!(groups.len(), 2);
        let dates: Vec<u32> = groups["1"]
            .iter()
            .map(|r| chrono::Datelike::day(&r.meta.date))
            .collect();
        assert_eq!(dates, vec![2, 1, 1]);
    }

    #[test]
    fn test_group_by_location_is_complete() {
        let records = vec![record("1", 1), record("2", 1), record("3", 1), record("4", 1)];
        let total = records.len();
        let groups = group_by_sensor(records);

        let locations: HashMap<String, ResolvedLocation> = [
            ("1", ResolvedLocation::new("Stuttgart_Germany")),
            ("2", ResolvedLocation::new("Stuttgart_Germany")),
            ("3", ResolvedLocation::unresolved()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let grouped = group_by_location(groups, &locations);

        assert_eq!(grouped.record_count(), total);
        assert_eq!(grouped.located.len(), 1);
        assert_eq!(
            grouped.located[&ResolvedLocation::new("Stuttgart_Germany")].len(),
            2
        );
        let unresolved: Vec<&str> = grouped.unresolved.iter().map(|r| r.sensor_id()).collect();
        assert_eq!(unresolved, vec!["3", "4"]);
    }
}
