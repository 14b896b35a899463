//! Filesystem persistence for configuration documents.
//!
//! Every save writes a new file named `K_{caseFileId}_{timestamp}.json`;
//! stored files are never overwritten.

use crate::document::KpiConfiguration;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
const MAPPING_PREFIX: &str = "mapping-";

/// Where the store keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub config_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
        }
    }
}

impl StoreSettings {
    /// Path of an uploaded file inside the uploads directory.
    pub fn upload_path(&self, file_id: &str) -> Result<PathBuf, StoreError> {
        validate_id(file_id)?;
        Ok(self.uploads_dir.join(file_id))
    }
}

/// A stored configuration file as returned by [`ConfigStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Maps a system field onto a spreadsheet column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub system_field: String,
    pub excel_header: String,
}

#[derive(Serialize)]
struct MappingFile<'a> {
    mappings: &'a [FieldMapping],
}

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Opens the store, creating its directory when missing.
    pub fn open(settings: &StoreSettings) -> Result<Self, StoreError> {
        let dir = settings.config_dir.clone();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the configuration as a new file and returns its identifier.
    pub fn save(&self, config: &KpiConfiguration, now: DateTime<Utc>) -> Result<String, StoreError> {
        config.check()?;

        let id = format!(
            "K_{}_{}.json",
            config.case_file_id,
            now.format("%Y-%m-%dT%H%M%S%3fZ")
        );
        validate_id(&id)?;
        let json = serde_json::to_string_pretty(config).map_err(StoreError::Serialize)?;
        let path = self.dir.join(&id);
        write_new(&path, json.as_bytes())?;

        info!(%id, versions = config.versions.len(), "configuration saved");
        Ok(id)
    }

    /// Loads a stored configuration by identifier.
    pub fn load(&self, id: &str) -> Result<KpiConfiguration, StoreError> {
        validate_id(id)?;
        let path = self.dir.join(id);
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(KpiConfiguration::from_json(&json)?)
    }

    /// Lists stored configuration files, sorted by identifier.
    pub fn list(&self) -> Result<Vec<StoredConfig>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let mut configs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let id = entry.file_name().to_string_lossy().into_owned();
            if !id.ends_with(".json") || id.starts_with(MAPPING_PREFIX) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(%id, error = %e, "skipping unreadable configuration file");
                    continue;
                }
            };
            configs.push(StoredConfig {
                id,
                created_at: metadata.created().ok().map(DateTime::<Utc>::from),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(configs)
    }

    /// Stores the field mappings for an uploaded file as `mapping-{fileId}.json`,
    /// replacing any earlier mappings for that file.
    pub fn save_mapping(&self, file_id: &str, mappings: &[FieldMapping]) -> Result<PathBuf, StoreError> {
        let filename = format!("{}{}.json", MAPPING_PREFIX, file_id);
        validate_id(&filename)?;
        let json = serde_json::to_string_pretty(&MappingFile { mappings })
            .map_err(StoreError::Serialize)?;
        let path = self.dir.join(filename);
        fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
        info!(%file_id, mappings = mappings.len(), "field mapping saved");
        Ok(path)
    }
}

/// Identifiers are plain file names inside the store directory.
fn validate_id(id: &str) -> Result<(), StoreError> {
    let plain = !id.is_empty()
        && !id.contains(['/', '\\'])
        && !id.contains("..")
        && Path::new(id).file_name().is_some_and(|name| name == id);
    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(path, e))
}
