use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::error::CacheError;
use super::store::{CacheStore, Clock, SystemClock};

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    value: String,
    /// Unix seconds.
    expires_at: u64,
}

/// One JSON file per key under `dir`, so entries survive process restarts
/// and can be shared by several processes on the same host.
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    tmp_seq: AtomicU64,
}

impl FileStore {
    /// Opens (and creates if needed) the cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| CacheError::io(&dir, err))?;
        Ok(Self {
            dir,
            clock,
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn now_secs(&self) -> u64 {
        unix_secs(self.clock.now())
    }

    fn write_atomically(&self, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        {
            let mut f = fs::File::create(&tmp).map_err(|err| CacheError::io(&tmp, err))?;
            f.write_all(bytes).map_err(|err| CacheError::io(&tmp, err))?;
            f.sync_all().map_err(|err| CacheError::io(&tmp, err))?;
        }
        fs::rename(&tmp, path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            CacheError::io(path, err)
        })
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::io(&path, err)),
        };
        let entry: FileEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(source) => {
                discard(&path, "corrupt");
                return Err(CacheError::Decode {
                    key: key.to_string(),
                    source,
                });
            }
        };
        if entry.expires_at <= self.now_secs() {
            discard(&path, "expired");
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = FileEntry {
            value: value.to_string(),
            expires_at: self.now_secs().saturating_add(ttl.as_secs()),
        };
        let bytes = serde_json::to_vec(&entry).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.write_atomically(&self.path_for(key), &bytes)
    }
}

fn discard(path: &Path, why: &str) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %err, "could not remove {why} cache file");
        }
    }
}

fn unix_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
