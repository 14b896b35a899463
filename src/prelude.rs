//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the kpimap crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use kpimap::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let store = ConfigStore::open(&StoreSettings::default())?;
//! let config = store.load("K_SALES01_2025-01-01T000000000Z.json")?;
//!
//! let current = config.current_version()?;
//! for rule in &current.data.adjustment_rules {
//!     if let Some(chain) = &rule.lookup_chain {
//!         println!("{}: complete = {}", rule.kpi_name, chain.is_complete());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Lookup chains and editing
pub use crate::chain::{
    ApplicationMode, CompletionIssue, LookupChain, LookupStep, StepEdit, StepField, StepId,
    StepPreview, ValidationErrors,
};
pub use crate::editor::ChainEditor;

// Uploaded files
pub use crate::registry::{FileCategory, FileRegistry, UploadedFile, extract_headers};

// Configuration documents
pub use crate::document::{
    AdjustmentRule, AdjustmentType, BaseDataMapping, ConfigData, CreditHierarchy, Direction,
    ExclusionRule, GlobalVariable, KpiConfiguration, KpiVersion, QualificationRule, RuleIssue,
    ValueType, VersionStatus,
};

// Persistence
pub use crate::store::{ConfigStore, FieldMapping, StoreSettings, StoredConfig};

// Error types
pub use crate::error::{DocumentError, RegistryError, StoreError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
