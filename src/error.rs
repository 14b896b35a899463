use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing or checking a configuration document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse configuration JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid configuration data: caseFileId is required")]
    MissingCaseFileId,

    #[error("Configuration '{0}' has no versions")]
    NoVersions(String),

    #[error("No current version found in configuration '{0}'")]
    NoCurrentVersion(String),

    #[error("Configuration '{case_file_id}' has {count} versions marked as current")]
    MultipleCurrentVersions { case_file_id: String, count: usize },

    #[error("Invalid version number '{0}', expected '<major>.<minor>'")]
    InvalidVersionNumber(String),
}

/// Errors raised by the configuration store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Configuration not found: '{0}'")]
    NotFound(String),

    #[error("Invalid configuration identifier: '{0}'")]
    InvalidId(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while reading column headers from an uploaded file.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Could not read file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse header row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("File '{0}' has no header row")]
    NoHeaders(String),

    #[error("Unsupported file type '{0}', expected .xlsx, .xls, .csv or .tsv")]
    UnsupportedFileType(String),

    #[error("File '{path}' is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },
}
