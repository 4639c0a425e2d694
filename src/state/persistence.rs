//! Registry snapshots and their JSON file format
//!
//! The file is an array of bank objects, each mapping `fader{i}` to
//! `{"index": i, "current": 0.0-1.0, "isTouching": bool}`. Button state is
//! not part of the format. Reading is fail-open per bank: an entry that is not
//! an object, or holds a malformed fader record, is kept as `None` and the
//! registry rebuilds that bank from defaults.

use anyhow::{Context, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Persisted state of one fader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaderRecord {
    #[serde(deserialize_with = "index_from_number_or_string")]
    pub index: u8,
    pub current: f64,
    #[serde(rename = "isTouching")]
    pub is_touching: bool,
}

/// Persisted state of one bank, faders in strip order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BankSnapshot {
    pub faders: Vec<FaderRecord>,
}

/// Persisted state of the whole registry, banks in order
///
/// `None` marks a bank entry that could not be read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrySnapshot {
    pub banks: Vec<Option<BankSnapshot>>,
}

/// Older files store the index as a string ("3")
fn index_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIndex {
        Number(u8),
        Text(String),
    }

    match RawIndex::deserialize(deserializer)? {
        RawIndex::Number(n) => Ok(n),
        RawIndex::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

impl BankSnapshot {
    /// Read one bank entry; `None` when the entry is malformed
    ///
    /// Keys other than `fader{i}` (e.g. `buttons{i}`) are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let mut faders = Vec::new();
        for (key, entry) in object {
            let Some(number) = key.strip_prefix("fader").and_then(|s| s.parse::<u32>().ok())
            else {
                continue;
            };
            let Ok(strip) = u8::try_from(number) else {
                debug!("Fader key '{}' is out of range", key);
                return None;
            };

            let mut record: FaderRecord = match serde_json::from_value(entry.clone()) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Malformed fader record '{}': {}", key, e);
                    return None;
                }
            };
            if !record.current.is_finite() {
                return None;
            }
            // The key is authoritative for the strip position
            record.index = strip;
            faders.push(record);
        }

        faders.sort_by_key(|r| r.index);
        Some(Self { faders })
    }
}

impl Serialize for BankSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.faders.len()))?;
        for record in &self.faders {
            map.serialize_entry(&format!("fader{}", record.index), record)?;
        }
        map.end()
    }
}

impl Serialize for RegistrySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.banks.len()))?;
        for bank in &self.banks {
            seq.serialize_element(bank)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RegistrySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self {
            banks: entries.iter().map(BankSnapshot::from_value).collect(),
        })
    }
}

impl RegistrySnapshot {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize bank snapshot")
    }

    /// Parse from JSON; only a non-array document is an error
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse bank snapshot JSON")
    }

    /// Save snapshot to a JSON file
    ///
    /// Written to a sibling temp file first and renamed over the target, so
    /// a crash mid-write leaves the previous snapshot intact.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    /// Load snapshot from a JSON file; `Ok(None)` when the file does not exist
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read snapshot file {}", path.display()))
            }
        };

        let snapshot = Self::from_json(&json)?;
        let malformed = snapshot.banks.iter().filter(|b| b.is_none()).count();
        if malformed > 0 {
            warn!(
                "{} of {} banks in {} are malformed",
                malformed,
                snapshot.banks.len(),
                path.display()
            );
        }
        debug!("Snapshot loaded from {} ({} banks)", path.display(), snapshot.banks.len());

        Ok(Some(snapshot))
    }
}
