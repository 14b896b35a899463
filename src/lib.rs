//! # kpimap - KPI Configuration Capture
//!
//! **kpimap** captures KPI configurations: mapping rules built against the
//! columns of uploaded data files, persisted as versioned JSON documents.
//!
//! ## Core Workflow
//!
//! 1.  **Register Files**: Read the header row of each uploaded file into a `FileRegistry`
//!     (base data, credit hierarchy, and any number of lookup files).
//! 2.  **Build Lookup Chains**: Adjustment rules whose value comes from a lookup carry a
//!     `LookupChain`. Each step may key on the base fields and on the result variables of
//!     every earlier step; the last step names the returned column to apply and how.
//! 3.  **Validate**: `ConfigData::validate` runs the form-level checks of every section,
//!     including chain completeness.
//! 4.  **Persist**: Wrap the data in a `KpiConfiguration` and save it with a `ConfigStore`.
//!     Later edits are appended as new versions; exactly one version is current.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kpimap::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let registry = FileRegistry::new()
//!         .with_file(FileCategory::Base, UploadedFile {
//!             filename: "sales.csv".to_string(),
//!             columns: vec!["Agent".to_string(), "Region".to_string(), "Amount".to_string()],
//!         })
//!         .with_file(FileCategory::Lookup, UploadedFile {
//!             filename: "rates.csv".to_string(),
//!             columns: vec!["Region".to_string(), "Rate".to_string()],
//!         });
//!
//!     // Build a one-step chain: look up the region's rate and apply it as a percentage.
//!     let mut editor = ChainEditor::new(LookupChain::new(), registry.clone());
//!     editor.add_step();
//!     editor.set_field(1, StepEdit::SourceFields(vec!["Region".to_string()]));
//!     editor.set_field(1, StepEdit::TargetFile("rates.csv".to_string()));
//!     editor.set_field(1, StepEdit::TargetKeyFields(vec!["Region".to_string()]));
//!     editor.set_field(1, StepEdit::ReturnedFields(vec!["Rate".to_string()]));
//!     editor.set_field(1, StepEdit::FinalResultField(Some("Rate".to_string())));
//!     editor.set_field(1, StepEdit::ApplicationMode(Some(ApplicationMode::Percentage)));
//!     assert!(editor.is_ready());
//!
//!     let mut data = ConfigData::default();
//!     data.uploaded_files = registry;
//!     data.adjustment_rules.push(AdjustmentRule {
//!         id: "adj-1".to_string(),
//!         kpi_name: "RegionBonus".to_string(),
//!         description: String::new(),
//!         condition_field: "Region".to_string(),
//!         adjust_from: "Amount".to_string(),
//!         adjust_what: "ATAMT".to_string(),
//!         direction: Direction::Increase,
//!         adjustment_type: AdjustmentType::Percentage,
//!         value_type: ValueType::Lookup,
//!         value: None,
//!         lookup_chain: Some(editor.into_chain()),
//!     });
//!
//!     for issue in data.validate() {
//!         println!("{}", issue);
//!     }
//!
//!     let config = KpiConfiguration::new("SALES01", data, chrono::Utc::now());
//!     let store = ConfigStore::open(&StoreSettings::default())?;
//!     let id = store.save(&config, chrono::Utc::now())?;
//!     println!("Saved configuration '{}'", id);
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod document;
pub mod editor;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod store;
