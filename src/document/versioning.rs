use super::model::{ConfigData, KpiConfiguration, KpiVersion, VersionStatus};
use crate::error::DocumentError;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Case file identifiers are limited to this many characters.
pub const MAX_IDENTIFIER_CHARS: usize = 10;
pub const INITIAL_VERSION: &str = "1.0";
pub const DEFAULT_AUTHOR: &str = "admin";

impl KpiConfiguration {
    /// Starts a configuration with a single current version `1.0`.
    ///
    /// The identifier is truncated to [`MAX_IDENTIFIER_CHARS`] characters.
    pub fn new(identifier: &str, data: ConfigData, now: DateTime<Utc>) -> Self {
        let case_file_id: String = identifier.trim().chars().take(MAX_IDENTIFIER_CHARS).collect();
        Self {
            case_file_id,
            created_on: now,
            created_by: DEFAULT_AUTHOR.to_string(),
            versions: vec![KpiVersion {
                version: INITIAL_VERSION.to_string(),
                saved_on: now,
                description: "Initial Save".to_string(),
                status: VersionStatus::Current,
                data,
            }],
        }
    }

    /// Parses a stored document and checks its version invariants.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Checks that the document names its case file and has exactly one current version.
    pub fn check(&self) -> Result<(), DocumentError> {
        if self.case_file_id.trim().is_empty() {
            return Err(DocumentError::MissingCaseFileId);
        }
        if self.versions.is_empty() {
            return Err(DocumentError::NoVersions(self.case_file_id.clone()));
        }
        self.current_version().map(|_| ())
    }

    /// The single version marked `Current`.
    pub fn current_version(&self) -> Result<&KpiVersion, DocumentError> {
        let mut current = self
            .versions
            .iter()
            .filter(|v| v.status == VersionStatus::Current);
        let first = current
            .next()
            .ok_or_else(|| DocumentError::NoCurrentVersion(self.case_file_id.clone()))?;
        let extra = current.count();
        if extra > 0 {
            return Err(DocumentError::MultipleCurrentVersions {
                case_file_id: self.case_file_id.clone(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// Appends `data` as the new current version.
    ///
    /// The version number is the last version's minor number plus one, and the
    /// previously current version becomes `Deprecated`.
    pub fn push_version(
        &mut self,
        data: ConfigData,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<&KpiVersion, DocumentError> {
        let last = self
            .versions
            .last()
            .ok_or_else(|| DocumentError::NoVersions(self.case_file_id.clone()))?;
        let version = next_version(&last.version)?;

        for existing in &mut self.versions {
            if existing.status == VersionStatus::Current {
                existing.status = VersionStatus::Deprecated;
            }
        }
        debug!(case_file_id = %self.case_file_id, %version, "configuration version added");
        self.versions.push(KpiVersion {
            version,
            saved_on: now,
            description: description.to_string(),
            status: VersionStatus::Current,
            data,
        });
        Ok(&self.versions[self.versions.len() - 1])
    }
}

/// Increments the minor part of a `<major>.<minor>` version number.
pub fn next_version(version: &str) -> Result<String, DocumentError> {
    let invalid = || DocumentError::InvalidVersionNumber(version.to_string());
    let (major, minor) = version.split_once('.').ok_or_else(invalid)?;
    let major: u32 = major.parse().map_err(|_| invalid())?;
    let minor: u32 = minor.parse().map_err(|_| invalid())?;
    Ok(format!("{}.{}", major, minor + 1))
}
