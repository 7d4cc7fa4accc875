use crate::cache::LockdownCache;
use crate::lockdown::PolicySource;
use crate::models::{ColumnKind, ResolvedLocation, Series};
use crate::utils::{country_alpha3, COL_LOCKDOWN, POLICY_START_DATE};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Adds a 0/1 `lockdown` column to series based on stay-at-home policy data
pub struct LockdownAnnotator<P> {
    source: P,
    cache: LockdownCache,
    policy_calls: usize,
}

impl<P: PolicySource> LockdownAnnotator<P> {
    pub fn new(source: P, cache: LockdownCache) -> Self {
        Self {
            source,
            cache,
            policy_calls: 0,
        }
    }

    /// Whether the country of `location` had any stay-at-home requirement on `date`.
    /// Unknown countries and failed lookups count as no lockdown.
    pub fn is_locked_down(&mut self, date: NaiveDate, location: &ResolvedLocation) -> bool {
        let alpha3 = location.country().and_then(country_alpha3);
        if alpha3.is_none() && date >= policy_start() {
            warn!("No country code for location {}", location);
        }
        self.locked_on(date, alpha3)
    }

    /// Set the lockdown flag on every row of each series, per series date
    pub fn annotate(&mut self, location: &ResolvedLocation, series: &mut [Series]) {
        let alpha3 = location.country().and_then(country_alpha3);
        if alpha3.is_none() {
            warn!(
                "No country code for location {}, marking all rows as not locked down",
                location
            );
        }

        for item in series.iter_mut() {
            let locked = self.locked_on(item.meta.date, alpha3);
            item.table
                .set_constant_column(COL_LOCKDOWN, ColumnKind::Flag, if locked { 1.0 } else { 0.0 });
        }
    }

    fn locked_on(&mut self, date: NaiveDate, alpha3: Option<&str>) -> bool {
        match alpha3 {
            Some(code) if date >= policy_start() => self.lookup(date, code),
            _ => false,
        }
    }

    fn lookup(&mut self, date: NaiveDate, alpha3: &str) -> bool {
        let key = format!("{}_{}", date, alpha3);
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }

        self.policy_calls += 1;
        match self.source.stay_at_home_level(date, alpha3) {
            Ok(Some(level)) => {
                let locked = level > 0.0;
                debug!("Policy level {} for {}", level, key);
                *self.cache.insert(&key, locked)
            }
            Ok(None) => {
                debug!("No policy value for {}", key);
                false
            }
            Err(e) => {
                warn!("Policy lookup for {} failed: {}", key, e);
                false
            }
        }
    }

    /// Number of policy source queries issued so far
    pub fn policy_calls(&self) -> usize {
        self.policy_calls
    }

    pub fn cache(&self) -> &LockdownCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LockdownCache {
        &mut self.cache
    }
}

fn policy_start() -> NaiveDate {
    let (year, month, day) = POLICY_START_DATE;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
