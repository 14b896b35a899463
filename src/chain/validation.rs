use super::step::{StepField, StepId};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const RESULT_VARIABLE_REQUIRED: &str = "Result variable name is required";
pub const RESULT_VARIABLE_NOT_UNIQUE: &str = "Result variable name must be unique";

/// Field-level validation messages keyed by step and field.
///
/// Validation never rejects an edit; the map is consulted before a chain is
/// saved or applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: BTreeMap<StepId, BTreeMap<StepField, String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages across all steps.
    pub fn len(&self) -> usize {
        self.errors.values().map(BTreeMap::len).sum()
    }

    pub fn get(&self, step_id: StepId, field: StepField) -> Option<&str> {
        self.errors
            .get(&step_id)
            .and_then(|fields| fields.get(&field))
            .map(String::as_str)
    }

    /// All messages for one step.
    pub fn for_step(&self, step_id: StepId) -> Option<&BTreeMap<StepField, String>> {
        self.errors.get(&step_id)
    }

    /// Records `message` for the field, or clears the entry when `message` is `None`.
    pub fn set(&mut self, step_id: StepId, field: StepField, message: Option<String>) {
        match message {
            Some(message) => {
                self.errors
                    .entry(step_id)
                    .or_default()
                    .insert(field, message);
            }
            None => {
                if let Some(fields) = self.errors.get_mut(&step_id) {
                    fields.remove(&field);
                    if fields.is_empty() {
                        self.errors.remove(&step_id);
                    }
                }
            }
        }
    }

    pub fn remove_step(&mut self, step_id: StepId) {
        self.errors.remove(&step_id);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Iterates `(step_id, field, message)` in step order.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, StepField, &str)> {
        self.errors.iter().flat_map(|(step_id, fields)| {
            fields
                .iter()
                .map(move |(field, message)| (*step_id, *field, message.as_str()))
        })
    }
}

/// A terminal requirement the last step does not meet yet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionIssue {
    #[error("The chain has no steps")]
    EmptyChain,
    #[error("Step {0} has no source fields selected")]
    MissingSourceFields(StepId),
    #[error("Step {0} has no target file selected")]
    MissingTargetFile(StepId),
    #[error("Step {0} has no target key fields selected")]
    MissingTargetKeyFields(StepId),
    #[error("Step {0} returns no fields")]
    MissingReturnedFields(StepId),
    #[error("Step {0} has no result field to apply")]
    MissingFinalResultField(StepId),
    #[error("Step {0} has no application mode")]
    MissingApplicationMode(StepId),
}
