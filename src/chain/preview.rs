use super::step::LookupStep;
use itertools::Itertools;

/// Formats lookup steps into one-line, human-readable summaries.
pub struct StepPreview;

impl StepPreview {
    /// Summarizes a filled-in step, e.g.
    /// `Source: Region → Lookup File: rates.csv → Key: Code = {selected} → Returns: Rate`.
    ///
    /// Returns `None` until the step has source fields, a target file, key
    /// fields, returned fields and a result variable.
    pub fn format(step: &LookupStep) -> Option<String> {
        if step.source_fields.is_empty()
            || step.target_file.is_empty()
            || step.target_key_fields.is_empty()
            || step.returned_fields.is_empty()
            || step.result_variable.is_empty()
        {
            return None;
        }

        let keys = step
            .target_key_fields
            .iter()
            .map(|field| format!("{} = {{selected}}", field))
            .join(", ");
        let final_result = step
            .final_result_field
            .as_ref()
            .map(|field| format!(" → Final: {}", field))
            .unwrap_or_default();

        Some(format!(
            "Source: {} → Lookup File: {} → Key: {} → Returns: {}{}",
            step.source_fields.iter().join(", "),
            step.target_file,
            keys,
            step.returned_fields.iter().join(", "),
            final_result
        ))
    }
}
