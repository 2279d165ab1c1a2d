// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-backed artifact store and dedup cache
//!
//! Both stores sit on cacache content-addressed directories. Dedup entries
//! carry their own TTL and are checked for expiry on read, so a stale
//! fingerprint can never resurrect an evicted result.

use crate::store::{ArtifactStore, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Content fingerprint of the input bytes (SHA-256, hex).
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Dedup cache contract: fingerprint to previously computed artifact key.
pub trait DedupCache: Send + Sync {
    fn get(&self, hash: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, hash: &str, result_key: &str, ttl: Duration) -> Result<(), StoreError>;
}

/// Disk-backed artifact store.
#[derive(Debug, Clone)]
pub struct DiskArtifactStore {
    cache_dir: PathBuf,
}

impl DiskArtifactStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(err) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!(error = %err, path = %cache_dir.display(), "could not create artifact directory");
        }
        Self { cache_dir }
    }
}

impl ArtifactStore for DiskArtifactStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        cacache::write_sync(&self.cache_dir, key, data)
            .map_err(|err| StoreError::Cache(err.to_string()))?;
        tracing::debug!(key, size = data.len(), "stored artifact");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match cacache::read_sync(&self.cache_dir, key) {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(err) => Err(StoreError::Cache(err.to_string())),
        }
    }

    fn exists(&self, key: &str) -> bool {
        matches!(cacache::metadata_sync(&self.cache_dir, key), Ok(Some(_)))
    }

    fn presigned_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!("/api/v1/artifacts/{key}?expires={expires_at}"))
    }

    fn presigned_put(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!(
            "/api/v1/artifacts/{key}?expires={expires_at}&write=1"
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DedupEntry {
    result_key: String,
    stored_at: i64,
    ttl_secs: u64,
}

/// Disk-backed dedup cache with per-entry TTL.
#[derive(Debug, Clone)]
pub struct DiskDedupCache {
    cache_dir: PathBuf,
}

impl DiskDedupCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(err) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!(error = %err, path = %cache_dir.display(), "could not create dedup directory");
        }
        Self { cache_dir }
    }
}

impl DedupCache for DiskDedupCache {
    fn get(&self, hash: &str) -> Result<Option<String>, StoreError> {
        let data = match cacache::read_sync(&self.cache_dir, hash) {
            Ok(data) => data,
            Err(cacache::Error::EntryNotFound(_, _)) => return Ok(None),
            Err(err) => return Err(StoreError::Cache(err.to_string())),
        };

        let entry: DedupEntry = serde_json::from_slice(&data)
            .map_err(|err| StoreError::Cache(err.to_string()))?;

        let age = Utc::now().timestamp() - entry.stored_at;
        if age >= 0 && (age as u64) < entry.ttl_secs {
            Ok(Some(entry.result_key))
        } else {
            tracing::debug!(hash, age_secs = age, "dedup entry expired");
            let _ = cacache::remove_sync(&self.cache_dir, hash);
            Ok(None)
        }
    }

    fn set(&self, hash: &str, result_key: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = DedupEntry {
            result_key: result_key.to_string(),
            stored_at: Utc::now().timestamp(),
            ttl_secs: ttl.as_secs(),
        };
        let data =
            serde_json::to_vec(&entry).map_err(|err| StoreError::Cache(err.to_string()))?;
        cacache::write_sync(&self.cache_dir, hash, &data)
            .map_err(|err| StoreError::Cache(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint(b"plan"), fingerprint(b"plan"));
        assert_ne!(fingerprint(b"plan"), fingerprint(b"plan2"));
        assert_eq!(fingerprint(b"plan").len(), 64);
    }

    #[test]
    fn artifact_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskArtifactStore::new(dir.path());

        assert!(store.get("results/a").unwrap().is_none());
        assert!(!store.exists("results/a"));

        store.put("results/a", b"one").unwrap();
        assert_eq!(store.get("results/a").unwrap().unwrap(), b"one");
        assert!(store.exists("results/a"));

        // Idempotent overwrite keyed by the same id.
        store.put("results/a", b"two").unwrap();
        assert_eq!(store.get("results/a").unwrap().unwrap(), b"two");
    }

    #[test]
    fn presigned_urls_carry_an_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskArtifactStore::new(dir.path());
        let url = store
            .presigned_get("results/a/p1.png", Duration::from_secs(3600))
            .unwrap();
        assert!(url.starts_with("/api/v1/artifacts/results/a/p1.png?expires="));

        let upload = store
            .presigned_put("uploads/next", Duration::from_secs(3600))
            .unwrap();
        assert!(upload.contains("write=1"));
    }

    #[test]
    fn dedup_entries_round_trip_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskDedupCache::new(dir.path());

        assert!(cache.get("abc").unwrap().is_none());

        cache
            .set("abc", "results/j1/data.json", Duration::from_secs(3600))
            .unwrap();
        assert_eq!(
            cache.get("abc").unwrap().as_deref(),
            Some("results/j1/data.json")
        );

        // Zero TTL expires immediately.
        cache
            .set("abc", "results/j1/data.json", Duration::from_secs(0))
            .unwrap();
        assert!(cache.get("abc").unwrap().is_none());
    }
}
