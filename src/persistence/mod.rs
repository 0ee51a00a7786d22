//! Save/load persistence with integrity verification
//!
//! Features:
//! - Versioned JSON envelope
//! - SHA-256 integrity digest over the payload
//! - Backup rotation (tmp → save, old save → backup)
//! - Corruption detection and recovery

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::STARTING_BALANCE;

/// Current envelope format
pub const SAVE_VERSION: u32 = 1;

/// Player data that outlives a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub balance: f64,
    /// Opaque marker owned by the presentation layer (e.g. last daily reward date)
    #[serde(default)]
    pub last_played: Option<String>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            balance: STARTING_BALANCE,
            last_played: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("save i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save digest mismatch (expected {expected}, found {found})")]
    DigestMismatch { expected: String, found: String },
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
    #[error("save holds an invalid balance: {0}")]
    InvalidBalance(f64),
}

/// On-disk wrapper around a serialized `SaveData`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    digest: String,
    payload: String,
}

fn digest_hex(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Serialize a save into its envelope
pub fn encode(save: &SaveData) -> Result<String, PersistenceError> {
    let payload = serde_json::to_string(save)?;
    let envelope = Envelope {
        version: SAVE_VERSION,
        digest: digest_hex(&payload),
        payload,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Parse and verify an envelope
pub fn decode(json: &str) -> Result<SaveData, PersistenceError> {
    let envelope: Envelope = serde_json::from_str(json)?;
    if envelope.version != SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion(envelope.version));
    }
    let found = digest_hex(&envelope.payload);
    if found != envelope.digest {
        return Err(PersistenceError::DigestMismatch {
            expected: envelope.digest,
            found,
        });
    }
    let save: SaveData = serde_json::from_str(&envelope.payload)?;
    if !save.balance.is_finite() || save.balance < 0.0 {
        return Err(PersistenceError::InvalidBalance(save.balance));
    }
    Ok(save)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Sibling file holding the previous save
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

/// Write a save: tmp file first, then rotate the old save to the backup
pub fn save_to_file(path: &Path, save: &SaveData) -> Result<(), PersistenceError> {
    let json = encode(save)?;
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, json)?;
    if path.exists() {
        fs::rename(path, backup_path(path))?;
    }
    fs::rename(&tmp, path)?;
    log::info!("Saved balance {} to {}", save.balance, path.display());
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<SaveData, PersistenceError> {
    let json = fs::read_to_string(path)?;
    decode(&json)
}

/// Load the save, then the backup, then fall back to a fresh player
pub fn load_or_default(path: &Path) -> SaveData {
    match load_from_file(path) {
        Ok(save) => {
            log::info!("Loaded save from {}", path.display());
            return save;
        }
        Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No save at {}, starting fresh", path.display());
            return SaveData::default();
        }
        Err(e) => log::warn!("Save at {} is unusable: {}", path.display(), e),
    }

    let backup = backup_path(path);
    match load_from_file(&backup) {
        Ok(save) => {
            log::warn!("Recovered save from backup {}", backup.display());
            save
        }
        Err(e) => {
            log::warn!("Backup unusable ({}), starting fresh", e);
            SaveData::default()
        }
    }
}

/// LocalStorage key (used only in wasm32)
#[allow(dead_code)]
const STORAGE_KEY: &str = "wager_engine_save";

/// Load the save from LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn load_local() -> SaveData {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten();

    if let Some(storage) = storage {
        if let Ok(Some(json)) = storage.get_item(STORAGE_KEY) {
            match decode(&json) {
                Ok(save) => {
                    log::info!("Loaded save from LocalStorage");
                    return save;
                }
                Err(e) => log::warn!("Discarding corrupt save: {}", e),
            }
        }
    }

    log::info!("No save found, starting fresh");
    SaveData::default()
}

/// Save to LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn save_local(save: &SaveData) {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten();

    if let Some(storage) = storage {
        match encode(save) {
            Ok(json) => {
                let _ = storage.set_item(STORAGE_KEY, &json);
                log::info!("Save written ({})", save.balance);
            }
            Err(e) => log::warn!("Could not encode save: {}", e),
        }
    }
}
