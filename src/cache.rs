//! Filesystem key-value cache over `data/.localcache`.
//!
//! Holds intermediate results for notebooks and ad-hoc analysis code. Entries
//! are JSON envelopes with an expiry stamp; the pipeline stages never read or
//! write this folder. Oldest-expiring entries are pruned once the entry count
//! passes the threshold.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::LoomError;

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);
const DEFAULT_THRESHOLD: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    expires_at: u64,
    value: Value,
}

pub struct LocalCache {
    dir: PathBuf,
    default_ttl: Duration,
    threshold: usize,
}

impl LocalCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LoomError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            default_ttl: DEFAULT_TTL,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Store a value under `key` with the default TTL.
    pub fn set(&self, key: &str, value: &Value) -> Result<(), LoomError> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), LoomError> {
        let path = self.entry_path(key);
        let envelope = Envelope {
            key: key.to_string(),
            expires_at: unix_now() + ttl.as_secs(),
            value: value.clone(),
        };
        let body = serde_json::to_string(&envelope).map_err(|e| LoomError::Parse {
            path: path.clone(),
            cause: Box::new(e),
        })?;
        fs::write(&path, body)?;
        debug!(key, path = %path.display(), "Cached value");
        self.prune()?;
        Ok(())
    }

    /// Fetch the value under `key`, or `None` when absent or expired.
    /// Expired entries are removed on read.
    pub fn get(&self, key: &str) -> Result<Option<Value>, LoomError> {
        let path = self.entry_path(key);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| LoomError::Parse {
            path: path.clone(),
            cause: Box::new(e),
        })?;
        if envelope.expires_at <= unix_now() {
            debug!(key, "Cache entry expired, removing");
            fs::remove_file(&path)?;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), LoomError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Drop the oldest-expiring entries until the count is back under the
    /// threshold. Expired entries go first by construction.
    fn prune(&self) -> Result<(), LoomError> {
        let mut stamped: Vec<(u64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let expires_at = fs::read_to_string(&path)
                .ok()
                .and_then(|body| serde_json::from_str::<Envelope>(&body).ok())
                .map(|env| env.expires_at)
                .unwrap_or(0);
            stamped.push((expires_at, path));
        }
        if stamped.len() <= self.threshold {
            return Ok(());
        }
        stamped.sort();
        let excess = stamped.len() - self.threshold;
        for (_, path) in stamped.into_iter().take(excess) {
            debug!(path = %path.display(), "Pruning cache entry");
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
