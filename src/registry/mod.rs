//! The uploaded files a configuration is built against, and their columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod headers;

pub use headers::{MAX_UPLOAD_BYTES, extract_headers, headers_from_reader, headers_from_workbook};

/// A file whose header row has been read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub columns: Vec<String>,
}

/// The role an uploaded file plays in a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// The primary transaction data; its columns are the base fields.
    Base,
    /// The credit hierarchy data.
    Hierarchy,
    /// Any number of files that lookup steps can target.
    Lookup,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCategory::Base => write!(f, "base"),
            FileCategory::Hierarchy => write!(f, "hierarchy"),
            FileCategory::Lookup => write!(f, "lookup"),
        }
    }
}

/// Maps file identifiers to their ordered column lists.
///
/// Serialized as the `uploadedFiles` object stored with each configuration version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRegistry {
    #[serde(default)]
    pub base: Option<UploadedFile>,
    #[serde(default)]
    pub hierarchy: Option<UploadedFile>,
    #[serde(default)]
    pub lookup: BTreeMap<String, UploadedFile>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file. Base and hierarchy files replace the previous one;
    /// lookup files are keyed by filename.
    pub fn register(&mut self, category: FileCategory, file: UploadedFile) {
        tracing::debug!(%category, filename = %file.filename, columns = file.columns.len(), "file registered");
        match category {
            FileCategory::Base => self.base = Some(file),
            FileCategory::Hierarchy => self.hierarchy = Some(file),
            FileCategory::Lookup => {
                self.lookup.insert(file.filename.clone(), file);
            }
        }
    }

    /// Removes an uploaded file. Base and hierarchy files are only removed when
    /// `filename` matches the registered one.
    pub fn unregister(&mut self, category: FileCategory, filename: &str) -> Option<UploadedFile> {
        let removed = match category {
            FileCategory::Base => self.base.take_if(|f| f.filename == filename),
            FileCategory::Hierarchy => self.hierarchy.take_if(|f| f.filename == filename),
            FileCategory::Lookup => self.lookup.remove(filename),
        };
        if removed.is_some() {
            tracing::debug!(%category, %filename, "file unregistered");
        }
        removed
    }

    pub fn with_file(mut self, category: FileCategory, file: UploadedFile) -> Self {
        self.register(category, file);
        self
    }

    /// Columns of the base file; empty when none was uploaded.
    pub fn base_columns(&self) -> &[String] {
        self.base.as_ref().map(|f| f.columns.as_slice()).unwrap_or(&[])
    }

    pub fn hierarchy_columns(&self) -> &[String] {
        self.hierarchy
            .as_ref()
            .map(|f| f.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Lookup file identifiers in sorted order.
    pub fn lookup_file_names(&self) -> Vec<String> {
        self.lookup.keys().cloned().collect()
    }

    pub fn lookup_columns(&self, file: &str) -> Option<&[String]> {
        self.lookup.get(file).map(|f| f.columns.as_slice())
    }

    pub fn has_lookup_file(&self, file: &str) -> bool {
        self.lookup.contains_key(file)
    }
}
