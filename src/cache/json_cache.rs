use crate::error::{ProcessingError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Sensor id to raw `"{city}_{country}"` value; empty means geocoding found nothing
pub type LocationCache = JsonCache<String>;

/// `"{date}_{alpha3}"` to lockdown state
pub type LockdownCache = JsonCache<bool>;

/// Persistent string-keyed map stored as a single JSON object.
///
/// Loaded once, mutated in memory and written back with [`JsonCache::flush`].
/// Entries are insert-only: a key that is present is never overwritten.
/// A cache with unsaved entries flushes itself when dropped.
#[derive(Debug)]
pub struct JsonCache<V>
where
    V: Serialize + DeserializeOwned,
{
    path: PathBuf,
    entries: BTreeMap<String, V>,
    dirty: bool,
}

impl<V> JsonCache<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Load the cache stored at `path`. A missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| ProcessingError::CacheFormat(path.to_path_buf(), e))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ProcessingError::CacheRead(path.to_path_buf(), e)),
        };

        debug!(path = %path.display(), entries = entries.len(), "Loaded cache");

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    /// Cache pre-populated with `entries`, e.g. for tests or seeding
    pub fn with_entries(path: &Path, entries: impl IntoIterator<Item = (String, V)>) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: entries.into_iter().collect(),
            dirty: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert `value` unless `key` is already present. Returns the stored value.
    pub fn insert(&mut self, key: &str, value: V) -> &V {
        if !self.entries.contains_key(key) {
            self.dirty = true;
        }
        self.entries.entry(key.to_string()).or_insert(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write all entries to disk. The file is replaced atomically.
    pub fn flush(&mut self) -> Result<()> {
        let write_error = |e: std::io::Error| ProcessingError::CacheWrite(self.path.clone(), e);

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(write_error)?;

        let mut temp = NamedTempFile::new_in(&parent).map_err(write_error)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.entries)
                .map_err(|e| write_error(e.into()))?;
            writer.flush().map_err(write_error)?;
        }
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed cache");
        self.dirty = false;
        Ok(())
    }
}

impl<V> Drop for JsonCache<V>
where
    V: Serialize + DeserializeOwned,
{
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                warn!("Failed to flush cache on drop: {}", e);
            }
        }
    }
}
