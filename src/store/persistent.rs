//! Power-loss-safe calibration config.
//!
//! [`PersistentStore`] layers the typed [`PersistentConfig`] over any
//! [`StoragePort`] backend.  The whole record is one postcard blob under
//! `temp::cfg`; every mutation validates a candidate copy, writes it, and
//! only then replaces the cached view, so a rejected or failed write leaves
//! the store exactly as it was.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigStorePort, StorageError, StoragePort};
use crate::config::CONSOLE_PRECISION_RANGE;
use crate::identity::SensorIdentity;

const CONFIG_NAMESPACE: &str = "temp";
const CONFIG_KEY: &str = "cfg";

/// Largest blob we read back from storage.
const MAX_BLOB_SIZE: usize = 1024;

/// Cap on stored corrections; keeps the blob well under [`MAX_BLOB_SIZE`].
pub const MAX_STORED_OFFSETS: usize = 32;

/// Operator-owned settings that must survive power loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentConfig {
    /// Resolution applied on every cold boot.  `None` until first written.
    pub default_precision: Option<u8>,
    /// Corrections keyed by canonical identity string.
    pub offsets: BTreeMap<String, f32>,
}

impl PersistentConfig {
    /// Stored correction for `identity`, or 0.0.
    pub fn offset_for(&self, identity: &SensorIdentity) -> f32 {
        self.offsets
            .get(identity.key().as_str())
            .copied()
            .unwrap_or(0.0)
    }
}

fn validate_config(cfg: &PersistentConfig) -> Result<(), ConfigError> {
    if let Some(p) = cfg.default_precision {
        if !CONSOLE_PRECISION_RANGE.contains(&p) {
            return Err(ConfigError::ValidationFailed(
                "default_precision must be 8–12",
            ));
        }
    }
    if cfg.offsets.len() > MAX_STORED_OFFSETS {
        return Err(ConfigError::ValidationFailed("too many stored corrections"));
    }
    for (key, offset) in &cfg.offsets {
        if !offset.is_finite() {
            return Err(ConfigError::ValidationFailed("correction must be finite"));
        }
        match SensorIdentity::parse(key) {
            Ok(id) if id.key().as_str() == key => {}
            _ => {
                return Err(ConfigError::ValidationFailed(
                    "correction key must be a canonical sensor identity",
                ));
            }
        }
    }
    Ok(())
}

/// [`ConfigStorePort`] backed by a [`StoragePort`].
pub struct PersistentStore<S> {
    backend: S,
    cached: PersistentConfig,
}

impl<S: StoragePort> PersistentStore<S> {
    /// Load the stored config.  A missing record is not an error: the store
    /// starts empty and the record is created on the first write.  Any
    /// other read failure, or a record that does not decode, is returned
    /// and nothing is written: the stored corrections are never replaced
    /// by defaults.
    pub fn open(backend: S) -> Result<Self, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let cached = match backend.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg = postcard::from_bytes::<PersistentConfig>(&buf[..len]).map_err(|_| {
                    warn!("PersistentStore: stored config ({} bytes) does not decode", len);
                    ConfigError::Corrupted
                })?;
                info!(
                    "PersistentStore: loaded config ({} bytes, {} corrections)",
                    len,
                    cfg.offsets.len()
                );
                cfg
            }
            Err(StorageError::NotFound) => {
                info!("PersistentStore: no stored config, starting empty");
                PersistentConfig::default()
            }
            Err(e) => {
                warn!("PersistentStore: read error ({})", e);
                return Err(e.into());
            }
        };
        Ok(Self { backend, cached })
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    fn commit(&mut self, candidate: PersistentConfig) -> Result<(), ConfigError> {
        validate_config(&candidate)?;
        let bytes = postcard::to_allocvec(&candidate).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.backend.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        self.cached = candidate;
        Ok(())
    }
}

impl<S: StoragePort> ConfigStorePort for PersistentStore<S> {
    fn config(&self) -> &PersistentConfig {
        &self.cached
    }

    fn set_precision(&mut self, bits: u8) -> Result<(), ConfigError> {
        if self.cached.default_precision == Some(bits) {
            return Ok(());
        }
        let mut candidate = self.cached.clone();
        candidate.default_precision = Some(bits);
        self.commit(candidate)
    }

    fn set_offset(&mut self, key: &str, offset: f32) -> Result<(), ConfigError> {
        let mut candidate = self.cached.clone();
        candidate.offsets.insert(key.to_owned(), offset);
        self.commit(candidate)
    }

    fn remove_offset(&mut self, key: &str) -> Result<bool, ConfigError> {
        if !self.cached.offsets.contains_key(key) {
            return Ok(false);
        }
        let mut candidate = self.cached.clone();
        candidate.offsets.remove(key);
        self.commit(candidate)?;
        Ok(true)
    }
}
