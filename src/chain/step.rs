use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a step within a chain. Always `1..=N`, dense and in order.
pub type StepId = u32;

/// How the value returned by the terminal step modifies the target KPI amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationMode {
    /// The looked-up value is applied as an absolute amount.
    Fixed,
    /// The looked-up value is applied as a percentage of the amount.
    Percentage,
}

impl fmt::Display for ApplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationMode::Fixed => write!(f, "Fixed"),
            ApplicationMode::Percentage => write!(f, "Percentage"),
        }
    }
}

/// A single lookup operation in a chain: look up `target_file` by
/// `target_key_fields`, keyed on `source_fields`, and bind the
/// `returned_fields` to `result_variable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupStep {
    pub step_id: StepId,
    #[serde(default)]
    pub source_fields: Vec<String>,
    #[serde(default)]
    pub target_file: String,
    #[serde(default)]
    pub target_key_fields: Vec<String>,
    #[serde(default)]
    pub returned_fields: Vec<String>,
    #[serde(default)]
    pub result_variable: String,
    /// Only meaningful on the last step of a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result_field: Option<String>,
    /// Only meaningful on the last step of a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_application_mode: Option<ApplicationMode>,
}

impl LookupStep {
    /// Creates an empty step carrying the default result variable name for `step_id`.
    pub fn new(step_id: StepId) -> Self {
        Self {
            step_id,
            source_fields: Vec::new(),
            target_file: String::new(),
            target_key_fields: Vec::new(),
            returned_fields: Vec::new(),
            result_variable: default_result_variable(step_id),
            final_result_field: None,
            lookup_application_mode: None,
        }
    }

    /// Whether the step carries either of the terminal-only attributes.
    pub fn has_terminal_fields(&self) -> bool {
        self.final_result_field.is_some() || self.lookup_application_mode.is_some()
    }

    pub(crate) fn strip_terminal_fields(&mut self) {
        self.final_result_field = None;
        self.lookup_application_mode = None;
    }
}

/// The default result variable name for a step, e.g. `step3_result`.
pub fn default_result_variable(step_id: StepId) -> String {
    format!("step{}_result", step_id)
}

/// One attribute edit applied to a step through `LookupChain::set_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEdit {
    SourceFields(Vec<String>),
    TargetFile(String),
    TargetKeyFields(Vec<String>),
    ReturnedFields(Vec<String>),
    ResultVariable(String),
    FinalResultField(Option<String>),
    ApplicationMode(Option<ApplicationMode>),
}

impl StepEdit {
    /// The step attribute this edit targets.
    pub fn field(&self) -> StepField {
        match self {
            StepEdit::SourceFields(_) => StepField::SourceFields,
            StepEdit::TargetFile(_) => StepField::TargetFile,
            StepEdit::TargetKeyFields(_) => StepField::TargetKeyFields,
            StepEdit::ReturnedFields(_) => StepField::ReturnedFields,
            StepEdit::ResultVariable(_) => StepField::ResultVariable,
            StepEdit::FinalResultField(_) => StepField::FinalResultField,
            StepEdit::ApplicationMode(_) => StepField::LookupApplicationMode,
        }
    }
}

/// Names the attributes of a `LookupStep`; used as keys of the error map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepField {
    SourceFields,
    TargetFile,
    TargetKeyFields,
    ReturnedFields,
    ResultVariable,
    FinalResultField,
    LookupApplicationMode,
}

impl fmt::Display for StepField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepField::SourceFields => "sourceFields",
            StepField::TargetFile => "targetFile",
            StepField::TargetKeyFields => "targetKeyFields",
            StepField::ReturnedFields => "returnedFields",
            StepField::ResultVariable => "resultVariable",
            StepField::FinalResultField => "finalResultField",
            StepField::LookupApplicationMode => "lookupApplicationMode",
        };
        write!(f, "{}", name)
    }
}
