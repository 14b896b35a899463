//! Tests for lookup chain operations and their consistency rules.
mod common;
use common::*;
use kpimap::prelude::*;

#[test]
fn test_add_step_to_empty_chain() {
    let chain = LookupChain::new().add_step();

    assert_eq!(chain.len(), 1);
    let step = &chain.steps()[0];
    assert_eq!(step.step_id, 1);
    assert_eq!(step.result_variable, "step1_result");
    assert!(step.source_fields.is_empty());
    assert!(step.target_file.is_empty());
    assert!(step.target_key_fields.is_empty());
    assert!(step.returned_fields.is_empty());
    assert_eq!(step.final_result_field, None);
    assert_eq!(step.lookup_application_mode, None);
}

#[test]
fn test_add_step_leaves_input_untouched() {
    let chain = LookupChain::new().add_step();
    let next = chain.add_step();

    assert_eq!(chain.len(), 1);
    assert_eq!(next.len(), 2);
    assert_eq!(next.last().map(|s| s.step_id), Some(2));
    assert_eq!(next.steps()[1].result_variable, "step2_result");
}

#[test]
fn test_add_step_strips_terminal_fields_from_previous_last() {
    let chain = create_complete_single_step_chain();
    assert!(chain.is_complete());

    let chain = chain.add_step();
    let first = &chain.steps()[0];
    assert_eq!(first.final_result_field, None);
    assert_eq!(first.lookup_application_mode, None);
    // Everything else survives.
    assert_eq!(first.target_file, "regions.csv");
    assert_eq!(first.returned_fields, strings(&["Tier"]));
    assert!(!chain.is_complete());
}

#[test]
fn test_remove_first_of_two_steps_renumbers_and_prunes() {
    let base = base_fields();
    let chain = create_complete_two_step_chain();

    let chain = chain.remove_step(1, &base);
    assert_eq!(chain.len(), 1);
    let step = &chain.steps()[0];
    assert_eq!(step.step_id, 1);
    assert_eq!(step.result_variable, "step1_result");
    // `step1_result` referred to the removed step; `Product` is a base field.
    assert_eq!(step.source_fields, strings(&["Product"]));
    assert_eq!(step.target_file, "rates.csv");
    assert_eq!(step.final_result_field.as_deref(), Some("Rate"));
}

#[test]
fn test_remove_resets_custom_result_variable_names() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step().add_step();
    let chain = chain
        .set_field(1, StepEdit::ResultVariable("tier".to_string()), &base)
        .set_field(2, StepEdit::ResultVariable("rate".to_string()), &base)
        .set_field(3, StepEdit::ResultVariable("cap".to_string()), &base);

    let chain = chain.remove_step(3, &base);
    let names: Vec<_> = chain.steps().iter().map(|s| s.result_variable.as_str()).collect();
    assert_eq!(names, vec!["step1_result", "step2_result"]);
}

#[test]
fn test_remove_middle_step_prunes_later_references() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step().add_step();
    let chain = chain
        .set_field(
            2,
            StepEdit::SourceFields(strings(&["Region", "step1_result"])),
            &base,
        )
        .set_field(
            3,
            StepEdit::SourceFields(strings(&["step1_result", "step2_result", "Agent"])),
            &base,
        );

    let chain = chain.remove_step(2, &base);
    let ids: Vec<_> = chain.steps().iter().map(|s| s.step_id).collect();
    assert_eq!(ids, vec![1, 2]);
    // Former step 3 is now step 2; `step2_result` is no longer an earlier result.
    assert_eq!(
        chain.steps()[1].source_fields,
        strings(&["step1_result", "Agent"])
    );
}

#[test]
fn test_remove_only_step_yields_empty_chain() {
    let chain = LookupChain::new().add_step();
    let chain = chain.remove_step(1, &base_fields());
    assert!(chain.is_empty());
    assert!(!chain.is_complete());
}

#[test]
fn test_unknown_step_id_is_a_no_op() {
    let base = base_fields();
    let chain = create_complete_two_step_chain();

    assert_eq!(chain.remove_step(7, &base), chain);
    assert_eq!(
        chain.set_field(7, StepEdit::TargetFile("rates.csv".to_string()), &base),
        chain
    );
}

#[test]
fn test_target_file_change_resets_dependent_fields() {
    let base = base_fields();
    let chain = create_complete_single_step_chain();

    let chain = chain.set_field(1, StepEdit::TargetFile("rates.csv".to_string()), &base);
    let step = &chain.steps()[0];
    assert_eq!(step.target_file, "rates.csv");
    assert!(step.target_key_fields.is_empty());
    assert!(step.returned_fields.is_empty());
    assert_eq!(step.final_result_field, None);
    // Source fields and application mode are not scoped to the file.
    assert_eq!(step.source_fields, strings(&["Region"]));
    assert_eq!(step.lookup_application_mode, Some(ApplicationMode::Fixed));
}

#[test]
fn test_returned_fields_change_clears_missing_final_field() {
    let base = base_fields();
    let chain = create_complete_two_step_chain();

    let kept = chain.set_field(2, StepEdit::ReturnedFields(strings(&["Cap", "Rate"])), &base);
    assert_eq!(kept.steps()[1].final_result_field.as_deref(), Some("Rate"));

    let cleared = chain.set_field(2, StepEdit::ReturnedFields(strings(&["Cap"])), &base);
    assert_eq!(cleared.steps()[1].final_result_field, None);
    assert!(!cleared.is_complete());
}

#[test]
fn test_duplicate_result_variable_is_stored_and_reported() {
    let base = base_fields();
    let chain = LookupChain::new().add_step();
    let chain = chain.set_field(1, StepEdit::ResultVariable("A".to_string()), &base);
    let chain = chain.add_step();
    assert_eq!(chain.steps()[1].result_variable, "step2_result");

    let chain = chain.set_field(2, StepEdit::ResultVariable("A".to_string()), &base);
    assert_eq!(chain.steps()[1].result_variable, "A");
    assert_eq!(
        chain.validate_result_variable(2, "A"),
        Some("Result variable name must be unique")
    );
    let errors = chain.validate();
    assert_eq!(
        errors.get(2, StepField::ResultVariable),
        Some("Result variable name must be unique")
    );
}

#[test]
fn test_blank_result_variable_is_required() {
    let base = base_fields();
    let chain = LookupChain::new()
        .add_step()
        .set_field(1, StepEdit::ResultVariable("   ".to_string()), &base);

    assert_eq!(chain.steps()[0].result_variable, "   ");
    assert_eq!(
        chain.validate().get(1, StepField::ResultVariable),
        Some("Result variable name is required")
    );
}

#[test]
fn test_available_source_fields_follow_step_order() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step().add_step();
    let chain = chain.set_field(2, StepEdit::ResultVariable(String::new()), &base);

    assert_eq!(chain.available_source_fields(0, &base), base);
    let mut expected = base.clone();
    expected.push("step1_result".to_string());
    // Step 2 has an empty result variable, so it contributes nothing.
    assert_eq!(chain.available_source_fields(2, &base), expected);
}

#[test]
fn test_source_fields_outside_universe_are_dropped() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step();

    let chain = chain.set_field(
        1,
        StepEdit::SourceFields(strings(&["Region", "step2_result", "Unknown", "Region"])),
        &base,
    );
    assert_eq!(chain.steps()[0].source_fields, strings(&["Region"]));
}

#[test]
fn test_unrelated_edit_keeps_downstream_references() {
    let base = base_fields();
    let chain = LookupChain::new()
        .add_step()
        .set_field(1, StepEdit::ResultVariable("X".to_string()), &base)
        .add_step()
        .set_field(2, StepEdit::SourceFields(strings(&["X"])), &base);

    let chain = chain.set_field(1, StepEdit::TargetFile("regions.csv".to_string()), &base);
    assert_eq!(chain.steps()[1].source_fields, strings(&["X"]));
}

#[test]
fn test_rename_carries_over_to_later_references() {
    let base = base_fields();
    let chain = LookupChain::new()
        .add_step()
        .add_step()
        .set_field(2, StepEdit::SourceFields(strings(&["step1_result", "Agent"])), &base);

    let renamed = chain.set_field(1, StepEdit::ResultVariable("tier".to_string()), &base);
    assert_eq!(renamed.steps()[1].source_fields, strings(&["tier", "Agent"]));

    let blanked = chain.set_field(1, StepEdit::ResultVariable(String::new()), &base);
    assert_eq!(blanked.steps()[1].source_fields, strings(&["Agent"]));
}

#[test]
fn test_rename_keeps_references_still_provided_elsewhere() {
    let base = base_fields();
    let chain = LookupChain::new()
        .add_step()
        .add_step()
        .add_step()
        .set_field(1, StepEdit::ResultVariable("A".to_string()), &base)
        .set_field(2, StepEdit::ResultVariable("A".to_string()), &base)
        .set_field(3, StepEdit::SourceFields(strings(&["A"])), &base);

    let chain = chain.set_field(2, StepEdit::ResultVariable("B".to_string()), &base);
    assert_eq!(chain.steps()[2].source_fields, strings(&["A"]));
}

#[test]
fn test_terminal_fields_only_on_last_step() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step();
    let chain = fill_step(&chain, 1, &["Region"], "regions.csv", &["Region"], &["Tier"]);

    let same = chain
        .set_field(1, StepEdit::FinalResultField(Some("Tier".to_string())), &base)
        .set_field(1, StepEdit::ApplicationMode(Some(ApplicationMode::Fixed)), &base);
    assert_eq!(same, chain);
}

#[test]
fn test_final_result_field_must_be_returned() {
    let base = base_fields();
    let chain = LookupChain::new().add_step();
    let chain = fill_step(&chain, 1, &["Region"], "regions.csv", &["Region"], &["Tier"]);

    let rejected = chain.set_field(1, StepEdit::FinalResultField(Some("Region".to_string())), &base);
    assert_eq!(rejected.steps()[0].final_result_field, None);

    let accepted = chain.set_field(1, StepEdit::FinalResultField(Some("Tier".to_string())), &base);
    assert_eq!(accepted.steps()[0].final_result_field.as_deref(), Some("Tier"));

    let cleared = accepted.set_field(1, StepEdit::FinalResultField(Some(String::new())), &base);
    assert_eq!(cleared.steps()[0].final_result_field, None);
}

#[test]
fn test_completion_requires_every_terminal_attribute() {
    assert!(!LookupChain::new().is_complete());
    assert_eq!(
        LookupChain::new().completion_issues(),
        vec![CompletionIssue::EmptyChain]
    );

    let base = base_fields();
    let complete = create_complete_single_step_chain();
    assert!(complete.is_complete());

    let missing_mode = complete.set_field(1, StepEdit::ApplicationMode(None), &base);
    assert_eq!(
        missing_mode.completion_issues(),
        vec![CompletionIssue::MissingApplicationMode(1)]
    );

    let missing_sources = complete.set_field(1, StepEdit::SourceFields(Vec::new()), &base);
    assert_eq!(
        missing_sources.completion_issues(),
        vec![CompletionIssue::MissingSourceFields(1)]
    );

    let missing_file = complete.set_field(1, StepEdit::TargetFile(String::new()), &base);
    assert_eq!(
        missing_file.completion_issues(),
        vec![
            CompletionIssue::MissingTargetFile(1),
            CompletionIssue::MissingTargetKeyFields(1),
            CompletionIssue::MissingReturnedFields(1),
            CompletionIssue::MissingFinalResultField(1),
        ]
    );
}

#[test]
fn test_completion_ignores_earlier_steps() {
    let base = base_fields();
    let chain = LookupChain::new().add_step().add_step();
    let chain = fill_step(&chain, 2, &["Region"], "regions.csv", &["Region"], &["Tier"]);
    let chain = finish_step(&chain, 2, "Tier", ApplicationMode::Percentage);

    assert!(chain.steps()[0].target_file.is_empty());
    assert!(chain.is_complete());
    assert!(chain.available_source_fields(1, &base).contains(&"step1_result".to_string()));
}

#[test]
fn test_chain_serializes_as_plain_array() {
    let chain = create_complete_single_step_chain().add_step();
    let json = serde_json::to_value(&chain).unwrap();

    let steps = json.as_array().expect("chain is an array");
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["stepId"], 1);
    assert_eq!(steps[0]["resultVariable"], "step1_result");
    assert_eq!(steps[0]["sourceFields"], serde_json::json!(["Region"]));
    // Terminal attributes are omitted when unset.
    assert!(steps[0].get("finalResultField").is_none());
    assert!(steps[1].get("lookupApplicationMode").is_none());
}

#[test]
fn test_chain_parses_stored_json() {
    let json = r#"[
        {"stepId": 1, "sourceFields": ["Region"], "targetFile": "regions.csv",
         "targetKeyFields": ["Region"], "returnedFields": ["Tier"], "resultVariable": "tier"},
        {"stepId": 2, "sourceFields": ["tier"], "targetFile": "rates.csv",
         "targetKeyFields": ["Tier"], "returnedFields": ["Rate"], "resultVariable": "rate",
         "finalResultField": "Rate", "lookupApplicationMode": "Percentage"}
    ]"#;
    let chain: LookupChain = serde_json::from_str(json).unwrap();

    assert_eq!(chain.len(), 2);
    assert!(chain.is_complete());
    assert!(chain.validate().is_empty());
    assert_eq!(
        chain.last().and_then(|s| s.lookup_application_mode),
        Some(ApplicationMode::Percentage)
    );
}

#[test]
fn test_step_preview() {
    let chain = create_complete_two_step_chain();
    assert_eq!(
        StepPreview::format(&chain.steps()[1]).as_deref(),
        Some(
            "Source: step1_result, Product → Lookup File: rates.csv → \
             Key: Tier = {selected}, Product = {selected} → Returns: Rate, Cap → Final: Rate"
        )
    );
    assert_eq!(
        StepPreview::format(&chain.steps()[0]).as_deref(),
        Some("Source: Region → Lookup File: regions.csv → Key: Region = {selected} → Returns: Tier")
    );

    let empty = LookupChain::new().add_step();
    assert_eq!(StepPreview::format(&empty.steps()[0]), None);
}
