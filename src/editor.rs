use crate::chain::{LookupChain, StepEdit, StepField, StepId, ValidationErrors};
use crate::registry::FileRegistry;
use std::collections::VecDeque;
use tracing::debug;

/// Number of earlier chain values kept for undo.
pub const MAX_UNDO_HISTORY: usize = 100;

/// References dropped when a step's result variable was cleared, kept so they
/// come back once the step is named again.
#[derive(Debug, Clone)]
struct ClearedName {
    step_id: StepId,
    name: String,
    references: Vec<(StepId, Vec<String>)>,
}

/// An editing session over one lookup chain.
///
/// Owns the chain value, the fields and files it is built against, and the
/// per-step error map, which is recomputed after every change. Every mutation
/// replaces the chain with a new value and keeps the previous one for undo.
#[derive(Debug, Clone)]
pub struct ChainEditor {
    chain: LookupChain,
    base_fields: Vec<String>,
    registry: FileRegistry,
    errors: ValidationErrors,
    undo_stack: VecDeque<LookupChain>,
    redo_stack: Vec<LookupChain>,
    cleared: Option<ClearedName>,
}

impl ChainEditor {
    /// Starts a session. The base fields are the base file's columns.
    pub fn new(chain: LookupChain, registry: FileRegistry) -> Self {
        let base_fields = registry.base_columns().to_vec();
        Self::with_base_fields(chain, base_fields, registry)
    }

    pub fn with_base_fields(
        chain: LookupChain,
        base_fields: Vec<String>,
        registry: FileRegistry,
    ) -> Self {
        let errors = chain.validate();
        Self {
            chain,
            base_fields,
            registry,
            errors,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            cleared: None,
        }
    }

    pub fn chain(&self) -> &LookupChain {
        &self.chain
    }

    pub fn into_chain(self) -> LookupChain {
        self.chain
    }

    pub fn base_fields(&self) -> &[String] {
        &self.base_fields
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn add_step(&mut self) {
        let next = self.chain.add_step();
        self.commit(next);
    }

    /// Removes a step. Removing the last remaining step is allowed.
    pub fn remove_step(&mut self, step_id: StepId) {
        let next = self.chain.remove_step(step_id, &self.base_fields);
        if next == self.chain {
            return;
        }
        self.cleared = None;
        self.commit(next);
    }

    /// Applies one edit. Result variable edits are always stored; a blank or
    /// duplicated name shows up in [`ChainEditor::errors`] for every step involved.
    ///
    /// Clearing a result variable drops later references to it. They are
    /// restored, under the new name, when the same step is named again.
    pub fn set_field(&mut self, step_id: StepId, edit: StepEdit) {
        let rename = match &edit {
            StepEdit::ResultVariable(name) => Some(name.clone()),
            _ => None,
        };
        let mut next = self.chain.set_field(step_id, edit, &self.base_fields);
        if let Some(name) = rename {
            next = self.track_rename(step_id, &name, next);
        }
        if next != self.chain {
            self.commit(next);
        }
    }

    /// The validation message currently shown for one field of a step.
    pub fn error_for(&self, step_id: StepId, field: StepField) -> Option<&str> {
        self.errors.get(step_id, field)
    }

    /// Restores the previous chain value. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        self.cleared = None;
        let current = std::mem::replace(&mut self.chain, previous);
        self.redo_stack.push(current);
        self.errors = self.chain.validate();
        debug!(len = self.chain.len(), "lookup chain edit undone");
        true
    }

    /// Re-applies an undone edit. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.cleared = None;
        let current = std::mem::replace(&mut self.chain, next);
        self.push_undo(current);
        self.errors = self.chain.validate();
        debug!(len = self.chain.len(), "lookup chain edit redone");
        true
    }

    /// Lookup files a step may target.
    pub fn available_files(&self) -> Vec<String> {
        self.registry.lookup_file_names()
    }

    /// Columns of the file the step currently targets; empty when none is chosen.
    pub fn columns_for(&self, step_id: StepId) -> &[String] {
        self.chain
            .get(step_id)
            .and_then(|step| self.registry.lookup_columns(&step.target_file))
            .unwrap_or(&[])
    }

    /// Source fields the step may choose from.
    pub fn available_source_fields(&self, step_id: StepId) -> Vec<String> {
        self.chain
            .position(step_id)
            .map(|index| self.chain.available_source_fields(index, &self.base_fields))
            .unwrap_or_default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Valid and complete: the chain may be saved into its rule.
    pub fn is_ready(&self) -> bool {
        self.is_valid() && self.chain.is_complete()
    }

    fn commit(&mut self, next: LookupChain) {
        let previous = std::mem::replace(&mut self.chain, next);
        self.push_undo(previous);
        self.redo_stack.clear();
        self.errors = self.chain.validate();
    }

    fn push_undo(&mut self, chain: LookupChain) {
        self.undo_stack.push_back(chain);
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.pop_front();
        }
    }

    /// Remembers references dropped by clearing a name, and restores them into
    /// `next` when the step gets a name again.
    fn track_rename(&mut self, step_id: StepId, name: &str, mut next: LookupChain) -> LookupChain {
        if name.is_empty() {
            let already_tracked = self.cleared.as_ref().is_some_and(|c| c.step_id == step_id);
            if !already_tracked {
                self.cleared = self.cleared_references(step_id);
            }
            return next;
        }

        let Some(cleared) = self.cleared.take_if(|c| c.step_id == step_id) else {
            return next;
        };
        for (later_id, saved) in cleared.references {
            let Some(current) = next.get(later_id) else {
                continue;
            };
            let restored: Vec<String> = saved
                .into_iter()
                .map(|f| if f == cleared.name { name.to_string() } else { f })
                .filter(|f| f == name || current.source_fields.contains(f))
                .chain(current.source_fields.iter().cloned())
                .collect();
            next = next.set_field(later_id, StepEdit::SourceFields(restored), &self.base_fields);
        }
        debug!(step_id, %name, "references restored after clearing result variable");
        next
    }

    fn cleared_references(&self, step_id: StepId) -> Option<ClearedName> {
        let index = self.chain.position(step_id)?;
        let name = self.chain.steps()[index].result_variable.clone();
        if name.is_empty() {
            return None;
        }
        let references: Vec<_> = self.chain.steps()[index + 1..]
            .iter()
            .filter(|s| s.source_fields.contains(&name))
            .map(|s| (s.step_id, s.source_fields.clone()))
            .collect();
        (!references.is_empty()).then_some(ClearedName {
            step_id,
            name,
            references,
        })
    }
}
