//! The lookup chain: an ordered sequence of dependent lookup steps.
//!
//! Each step may consume the base fields plus the result variables of every
//! earlier step. All operations are pure: they return a new chain and leave
//! the receiver untouched, so callers can keep previous values for undo or
//! change detection.

use ahash::AHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod preview;
mod step;
mod validation;

pub use preview::StepPreview;
pub use step::{ApplicationMode, LookupStep, StepEdit, StepField, StepId, default_result_variable};
pub use validation::{
    CompletionIssue, RESULT_VARIABLE_NOT_UNIQUE, RESULT_VARIABLE_REQUIRED, ValidationErrors,
};

/// An ordered list of lookup steps, serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupChain {
    steps: Vec<LookupStep>,
}

impl LookupChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing steps as-is, e.g. after loading a stored rule.
    pub fn from_steps(steps: Vec<LookupStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[LookupStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<LookupStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step_id: StepId) -> Option<&LookupStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn last(&self) -> Option<&LookupStep> {
        self.steps.last()
    }

    /// Position of the step with `step_id`, if present.
    pub fn position(&self, step_id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.step_id == step_id)
    }

    /// Appends an empty step, which becomes the new terminal step.
    ///
    /// The former last step loses its terminal-only attributes.
    #[must_use]
    pub fn add_step(&self) -> Self {
        let step_id = self.steps.iter().map(|s| s.step_id).max().unwrap_or(0) + 1;
        let mut steps = self.steps.clone();
        if let Some(previous_last) = steps.last_mut() {
            previous_last.strip_terminal_fields();
        }
        steps.push(LookupStep::new(step_id));
        debug!(step_id, len = steps.len(), "lookup step added");
        Self { steps }
    }

    /// Removes the step with `step_id` and renumbers the rest to `1..N`.
    ///
    /// Every remaining step gets its default result variable back, including
    /// steps whose position did not change, and source fields that are no
    /// longer legal at their position are dropped. Removing the only step
    /// leaves an empty chain.
    #[must_use]
    pub fn remove_step(&self, step_id: StepId, base_fields: &[String]) -> Self {
        if self.position(step_id).is_none() {
            debug!(step_id, "remove_step on unknown step ignored");
            return self.clone();
        }

        let steps = self
            .steps
            .iter()
            .filter(|s| s.step_id != step_id)
            .cloned()
            .enumerate()
            .map(|(index, mut step)| {
                let new_id = index as StepId + 1;
                step.step_id = new_id;
                step.result_variable = default_result_variable(new_id);
                step
            })
            .collect();

        let mut next = Self { steps };
        next.prune_source_fields(base_fields);
        debug!(step_id, len = next.len(), "lookup step removed");
        next
    }

    /// Applies one attribute edit to the step with `step_id`.
    ///
    /// Side effects keep the chain consistent:
    /// - a new target file clears key fields, returned fields and the final result field;
    /// - returned fields that no longer contain the final result field clear it;
    /// - source fields are limited to the fields available at the step's position;
    /// - a renamed result variable carries over to later steps that referenced
    ///   the old name, unless that name is still provided elsewhere;
    /// - terminal-only attributes are only accepted on the last step, and the
    ///   final result field only from the returned fields.
    ///
    /// Result variable names are always stored, even when blank or duplicated;
    /// see [`LookupChain::validate_result_variable`].
    #[must_use]
    pub fn set_field(&self, step_id: StepId, edit: StepEdit, base_fields: &[String]) -> Self {
        let Some(index) = self.position(step_id) else {
            debug!(step_id, field = %edit.field(), "set_field on unknown step ignored");
            return self.clone();
        };
        let is_last = index + 1 == self.steps.len();
        let field = edit.field();
        let mut next = self.clone();

        match edit {
            StepEdit::SourceFields(fields) => {
                let universe: AHashSet<String> = self
                    .available_source_fields(index, base_fields)
                    .into_iter()
                    .collect();
                let step = &mut next.steps[index];
                step.source_fields = fields
                    .into_iter()
                    .filter(|f| universe.contains(f))
                    .unique()
                    .collect();
            }
            StepEdit::TargetFile(file) => {
                let step = &mut next.steps[index];
                step.target_file = file;
                step.target_key_fields.clear();
                step.returned_fields.clear();
                step.final_result_field = None;
            }
            StepEdit::TargetKeyFields(fields) => {
                next.steps[index].target_key_fields = fields.into_iter().unique().collect();
            }
            StepEdit::ReturnedFields(fields) => {
                let step = &mut next.steps[index];
                let keeps_final = step
                    .final_result_field
                    .as_ref()
                    .is_none_or(|f| fields.contains(f));
                if !keeps_final {
                    step.final_result_field = None;
                }
                step.returned_fields = fields.into_iter().unique().collect();
            }
            StepEdit::ResultVariable(name) => {
                let old = std::mem::replace(&mut next.steps[index].result_variable, name);
                next.carry_over_rename(index, &old, base_fields);
            }
            StepEdit::FinalResultField(value) => {
                if !is_last {
                    debug!(step_id, "final result field ignored on non-terminal step");
                    return self.clone();
                }
                let step = &mut next.steps[index];
                match value.filter(|v| !v.is_empty()) {
                    None => step.final_result_field = None,
                    Some(value) if step.returned_fields.contains(&value) => {
                        step.final_result_field = Some(value);
                    }
                    Some(value) => {
                        debug!(step_id, %value, "final result field is not a returned field");
                        return self.clone();
                    }
                }
            }
            StepEdit::ApplicationMode(mode) => {
                if !is_last {
                    debug!(step_id, "application mode ignored on non-terminal step");
                    return self.clone();
                }
                next.steps[index].lookup_application_mode = mode;
            }
        }

        debug!(step_id, %field, "lookup step updated");
        next
    }

    /// Fields a step at `index` may use as lookup keys: the base fields followed
    /// by the non-empty result variables of every earlier step.
    pub fn available_source_fields(&self, index: usize, base_fields: &[String]) -> Vec<String> {
        base_fields
            .iter()
            .chain(
                self.steps
                    .iter()
                    .take(index)
                    .map(|s| &s.result_variable)
                    .filter(|v| !v.is_empty()),
            )
            .cloned()
            .collect()
    }

    /// Whether the chain can be saved and applied: it has steps and the last
    /// one is fully specified. Earlier steps are not inspected.
    pub fn is_complete(&self) -> bool {
        self.completion_issues().is_empty()
    }

    /// The terminal requirements that keep the chain from being complete.
    pub fn completion_issues(&self) -> Vec<CompletionIssue> {
        let Some(last) = self.steps.last() else {
            return vec![CompletionIssue::EmptyChain];
        };
        let id = last.step_id;
        let mut issues = Vec::new();
        if last.source_fields.is_empty() {
            issues.push(CompletionIssue::MissingSourceFields(id));
        }
        if last.target_file.is_empty() {
            issues.push(CompletionIssue::MissingTargetFile(id));
        }
        if last.target_key_fields.is_empty() {
            issues.push(CompletionIssue::MissingTargetKeyFields(id));
        }
        if last.returned_fields.is_empty() {
            issues.push(CompletionIssue::MissingReturnedFields(id));
        }
        if last.final_result_field.as_deref().is_none_or(str::is_empty) {
            issues.push(CompletionIssue::MissingFinalResultField(id));
        }
        if last.lookup_application_mode.is_none() {
            issues.push(CompletionIssue::MissingApplicationMode(id));
        }
        issues
    }

    /// Checks a candidate result variable name for the step with `step_id`.
    pub fn validate_result_variable(&self, step_id: StepId, value: &str) -> Option<&'static str> {
        if value.trim().is_empty() {
            return Some(RESULT_VARIABLE_REQUIRED);
        }
        let duplicate = self
            .steps
            .iter()
            .any(|s| s.step_id != step_id && s.result_variable == value);
        duplicate.then_some(RESULT_VARIABLE_NOT_UNIQUE)
    }

    /// Validates every step's result variable and collects the messages.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for step in &self.steps {
            let message = self.validate_result_variable(step.step_id, &step.result_variable);
            errors.set(
                step.step_id,
                StepField::ResultVariable,
                message.map(str::to_string),
            );
        }
        errors
    }

    /// Drops source fields that fall outside their position's universe.
    fn prune_source_fields(&mut self, base_fields: &[String]) {
        let universes: Vec<AHashSet<String>> = (0..self.steps.len())
            .map(|i| {
                self.available_source_fields(i, base_fields)
                    .into_iter()
                    .collect()
            })
            .collect();

        for (step, universe) in self.steps.iter_mut().zip(universes) {
            let before = step.source_fields.len();
            step.source_fields.retain(|f| universe.contains(f));
            let dropped = before - step.source_fields.len();
            if dropped > 0 {
                debug!(step_id = step.step_id, dropped, "pruned dangling source fields");
            }
        }
    }

    /// Rewrites references to a renamed result variable in the steps after `index`.
    fn carry_over_rename(&mut self, index: usize, old: &str, base_fields: &[String]) {
        let new = self.steps[index].result_variable.clone();
        if old == new || old.is_empty() {
            return;
        }

        for later in index + 1..self.steps.len() {
            if !self.steps[later].source_fields.iter().any(|f| f == old) {
                continue;
            }
            let still_provided = self
                .available_source_fields(later, base_fields)
                .iter()
                .any(|f| f == old);
            if still_provided {
                continue;
            }
            let step = &mut self.steps[later];
            step.source_fields = std::mem::take(&mut step.source_fields)
                .into_iter()
                .filter_map(|f| {
                    if f != old {
                        Some(f)
                    } else if new.is_empty() {
                        None
                    } else {
                        Some(new.clone())
                    }
                })
                .unique()
                .collect();
        }
    }
}
