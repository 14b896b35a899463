use crate::chain::LookupChain;
use crate::editor::ChainEditor;
use crate::registry::FileRegistry;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps the required transaction attributes onto base file columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseDataMapping {
    pub agent_field: String,
    pub txn_id_field: String,
    pub txn_date_field: String,
    pub amount_field: String,
}

impl BaseDataMapping {
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("agentField", self.agent_field.as_str()),
            ("txnIdField", self.txn_id_field.as_str()),
            ("txnDateField", self.txn_date_field.as_str()),
            ("amountField", self.amount_field.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Currency,
    String,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalVariable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_type: DataType,
}

/// The variables every new configuration starts with.
pub fn default_global_variables() -> Vec<GlobalVariable> {
    vec![
        GlobalVariable {
            name: "RTAMT".to_string(),
            description: "Row total".to_string(),
            data_type: DataType::Currency,
        },
        GlobalVariable {
            name: "ATAMT".to_string(),
            description: "Adjusted total".to_string(),
            data_type: DataType::Currency,
        },
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    Fixed,
    Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationLevel {
    #[serde(rename = "Per Record")]
    PerRecord,
    #[serde(rename = "Per Agent")]
    PerAgent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
    Sum,
    Average,
    Max,
    Min,
}

/// A single-step lookup used by qualification rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupTable {
    pub file: String,
    pub key_fields: Vec<String>,
    pub value_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationRule {
    pub id: String,
    #[serde(default)]
    pub kpi_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_field: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub evaluation_level: Option<EvaluationLevel>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_table: Option<LookupTable>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentType {
    #[default]
    Percentage,
    Absolute,
}

/// An adjustment to a KPI amount, either by a fixed value or by the result of a lookup chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRule {
    pub id: String,
    #[serde(default)]
    pub kpi_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub condition_field: String,
    #[serde(default)]
    pub adjust_from: String,
    #[serde(default)]
    pub adjust_what: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(rename = "type", default)]
    pub adjustment_type: AdjustmentType,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_chain: Option<LookupChain>,
}

impl AdjustmentRule {
    /// Opens an editing session on this rule's chain, starting empty when it has none.
    pub fn edit_chain(&self, registry: &FileRegistry) -> ChainEditor {
        let chain = self.lookup_chain.clone().unwrap_or_default();
        ChainEditor::new(chain, registry.clone())
    }

    /// Stores an edited chain back into the rule.
    pub fn set_lookup_chain(&mut self, chain: LookupChain) {
        self.lookup_chain = Some(chain);
    }

    /// Drops the chain from rules that do not use a lookup value.
    pub fn normalize(&mut self) {
        if self.value_type == ValueType::Fixed {
            self.lookup_chain = None;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExclusionRule {
    pub id: String,
    pub kpi_name: String,
    pub description: String,
    pub source_field: String,
    pub status_update: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditHierarchy {
    pub id: String,
    pub manager_field: String,
    pub valid_from_field: String,
    pub valid_to_field: String,
}

/// The section of a configuration a rule issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSection {
    BaseData,
    GlobalVariables,
    Qualification,
    Adjustment,
    Exclusion,
    CreditHierarchy,
}

impl fmt::Display for RuleSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleSection::BaseData => "base data",
            RuleSection::GlobalVariables => "global variable",
            RuleSection::Qualification => "qualification rule",
            RuleSection::Adjustment => "adjustment rule",
            RuleSection::Exclusion => "exclusion rule",
            RuleSection::CreditHierarchy => "credit hierarchy",
        };
        write!(f, "{}", name)
    }
}

/// A form-level validation message for one field of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub section: RuleSection,
    /// The rule's name, or its id when unnamed. Empty for single-record sections.
    pub rule: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rule.is_empty() {
            write!(f, "[{}] {}: {}", self.section, self.field, self.message)
        } else {
            write!(
                f,
                "[{} '{}'] {}: {}",
                self.section, self.rule, self.field, self.message
            )
        }
    }
}

/// Collects issues for one section and rule.
struct IssueSink<'a> {
    issues: &'a mut Vec<RuleIssue>,
    section: RuleSection,
    rule: String,
}

impl IssueSink<'_> {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(RuleIssue {
            section: self.section,
            rule: self.rule.clone(),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn require(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.push(field, message);
        }
    }
}

fn rule_label(name: &str, id: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

/// KPI names start with a capital letter and contain only ASCII letters and digits.
pub fn is_valid_kpi_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

pub(super) fn validate_base_mapping(
    mapping: &BaseDataMapping,
    registry: &FileRegistry,
    issues: &mut Vec<RuleIssue>,
) {
    let mut sink = IssueSink {
        issues,
        section: RuleSection::BaseData,
        rule: String::new(),
    };
    if registry.base.is_none() {
        sink.push("baseFile", "Upload a base data file");
    }
    let columns = registry.base_columns();
    let mut seen = AHashSet::new();
    for (field, value) in mapping.entries() {
        if value.is_empty() {
            sink.push(field, "Please select a column");
            continue;
        }
        if !columns.is_empty() && !columns.iter().any(|c| c == value) {
            sink.push(field, "Selected column is not available in the base file");
        }
        if !seen.insert(value) {
            sink.push(field, "Each field must map to a unique column");
        }
    }
}

pub(super) fn validate_global_variables(variables: &[GlobalVariable], issues: &mut Vec<RuleIssue>) {
    let mut seen = AHashSet::new();
    for variable in variables {
        let mut sink = IssueSink {
            issues: &mut *issues,
            section: RuleSection::GlobalVariables,
            rule: variable.name.clone(),
        };
        sink.require("name", &variable.name, "Variable name is required");
        sink.require("description", &variable.description, "Description is required");
        if !variable.name.is_empty() && !seen.insert(variable.name.as_str()) {
            sink.push("name", "A variable with this name already exists");
        }
    }
}

pub(super) fn validate_qualification_rules(rules: &[QualificationRule], issues: &mut Vec<RuleIssue>) {
    if rules.is_empty() {
        issues.push(RuleIssue {
            section: RuleSection::Qualification,
            rule: String::new(),
            field: "qualificationRules".to_string(),
            message: "Define at least one Qualification KPI".to_string(),
        });
    }
    let mut seen = AHashSet::new();
    for rule in rules {
        let mut sink = IssueSink {
            issues: &mut *issues,
            section: RuleSection::Qualification,
            rule: rule_label(&rule.kpi_name, &rule.id),
        };
        if rule.kpi_name.trim().is_empty() {
            sink.push("kpiName", "KPI name is required");
        } else if !is_valid_kpi_name(&rule.kpi_name) {
            sink.push(
                "kpiName",
                "KPI name must start with a capital letter and contain only letters and numbers",
            );
        } else if !seen.insert(rule.kpi_name.as_str()) {
            sink.push("kpiName", "A rule with this KPI name already exists");
        }
        sink.require("sourceField", &rule.source_field, "Source field is required");
        if rule.evaluation_level.is_none() {
            sink.push("evaluationLevel", "Evaluation level is required");
        }

        if rule.value_type == ValueType::Lookup {
            let table = rule.lookup_table.clone().unwrap_or_default();
            sink.require("lookupFile", &table.file, "Lookup file is required");
            if table.key_fields.is_empty() {
                sink.push("keyFields", "At least one key field is required");
            }
            sink.require("valueField", &table.value_field, "Value field is required");
        }
    }
}

pub(super) fn validate_adjustment_rules(
    rules: &[AdjustmentRule],
    registry: &FileRegistry,
    issues: &mut Vec<RuleIssue>,
) {
    for rule in rules {
        let mut sink = IssueSink {
            issues: &mut *issues,
            section: RuleSection::Adjustment,
            rule: rule_label(&rule.kpi_name, &rule.id),
        };
        sink.require("kpiName", &rule.kpi_name, "kpiName is required");
        sink.require("conditionField", &rule.condition_field, "conditionField is required");
        sink.require("adjustFrom", &rule.adjust_from, "adjustFrom is required");
        sink.require("adjustWhat", &rule.adjust_what, "adjustWhat is required");

        if rule.value_type != ValueType::Lookup {
            continue;
        }
        let Some(chain) = &rule.lookup_chain else {
            sink.push("lookupChain", "A lookup chain is required for lookup values");
            continue;
        };
        for (step_id, field, message) in chain.validate().iter() {
            sink.push("lookupChain", format!("Step {} {}: {}", step_id, field, message));
        }
        for issue in chain.completion_issues() {
            sink.push("lookupChain", issue.to_string());
        }
        for step in chain.steps() {
            if !step.target_file.is_empty() && !registry.has_lookup_file(&step.target_file) {
                sink.push(
                    "lookupChain",
                    format!(
                        "Step {} targets '{}', which is not an uploaded lookup file",
                        step.step_id, step.target_file
                    ),
                );
            }
        }
    }
}

pub(super) fn validate_exclusion_rules(rules: &[ExclusionRule], issues: &mut Vec<RuleIssue>) {
    for rule in rules {
        let mut sink = IssueSink {
            issues: &mut *issues,
            section: RuleSection::Exclusion,
            rule: rule_label(&rule.kpi_name, &rule.id),
        };
        sink.require("kpiName", &rule.kpi_name, "KPI name is required");
        sink.require("sourceField", &rule.source_field, "Source field is required");
        sink.require("statusUpdate", &rule.status_update, "Status update is required");
    }
}

pub(super) fn validate_credit_hierarchy(
    hierarchy: &CreditHierarchy,
    registry: &FileRegistry,
    issues: &mut Vec<RuleIssue>,
) {
    // Nothing to map against until a hierarchy file is uploaded.
    if registry.hierarchy.is_none() {
        return;
    }
    let columns = registry.hierarchy_columns();
    let mut sink = IssueSink {
        issues,
        section: RuleSection::CreditHierarchy,
        rule: String::new(),
    };
    for (field, value) in [
        ("managerField", &hierarchy.manager_field),
        ("validFromField", &hierarchy.valid_from_field),
        ("validToField", &hierarchy.valid_to_field),
    ] {
        if value.is_empty() {
            sink.push(field, format!("{} is required", field));
        } else if !columns.contains(value) {
            sink.push(field, "Selected column is not available in the hierarchy file");
        }
    }
}
