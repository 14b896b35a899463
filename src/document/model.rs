use super::rules::{
    AdjustmentRule, BaseDataMapping, CreditHierarchy, ExclusionRule, GlobalVariable,
    QualificationRule, RuleIssue, default_global_variables,
};
use crate::registry::FileRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a stored version. Exactly one version is `Current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    Current,
    Previous,
    Deprecated,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStatus::Current => write!(f, "Current"),
            VersionStatus::Previous => write!(f, "Previous"),
            VersionStatus::Deprecated => write!(f, "Deprecated"),
        }
    }
}

/// The full rule set captured by one configuration version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigData {
    pub base_data_mapping: BaseDataMapping,
    pub global_variables: Vec<GlobalVariable>,
    pub qualification_rules: Vec<QualificationRule>,
    pub adjustment_rules: Vec<AdjustmentRule>,
    pub exclusion_rules: Vec<ExclusionRule>,
    pub credit_hierarchy: CreditHierarchy,
    pub uploaded_files: FileRegistry,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            base_data_mapping: BaseDataMapping::default(),
            global_variables: default_global_variables(),
            qualification_rules: Vec::new(),
            adjustment_rules: Vec::new(),
            exclusion_rules: Vec::new(),
            credit_hierarchy: CreditHierarchy::default(),
            uploaded_files: FileRegistry::default(),
        }
    }
}

impl ConfigData {
    /// Runs the form-level checks of every section against the uploaded files.
    pub fn validate(&self) -> Vec<RuleIssue> {
        use super::rules::*;

        let registry = &self.uploaded_files;
        let mut issues = Vec::new();
        validate_base_mapping(&self.base_data_mapping, registry, &mut issues);
        validate_global_variables(&self.global_variables, &mut issues);
        validate_qualification_rules(&self.qualification_rules, &mut issues);
        validate_adjustment_rules(&self.adjustment_rules, registry, &mut issues);
        validate_exclusion_rules(&self.exclusion_rules, &mut issues);
        validate_credit_hierarchy(&self.credit_hierarchy, registry, &mut issues);
        issues
    }

    /// Drops lookup chains from adjustment rules that use fixed values.
    pub fn normalize(&mut self) {
        self.adjustment_rules
            .iter_mut()
            .for_each(AdjustmentRule::normalize);
    }
}

/// One immutable, timestamped snapshot of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiVersion {
    pub version: String,
    pub saved_on: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub status: VersionStatus,
    pub data: ConfigData,
}

/// A versioned KPI configuration document, the unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiConfiguration {
    #[serde(default)]
    pub case_file_id: String,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub versions: Vec<KpiVersion>,
}
