//! Common test utilities for building registries, chains and configurations.
use kpimap::document::{Aggregation, EvaluationLevel};
use kpimap::prelude::*;

#[allow(dead_code)]
pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Columns of the base data file.
#[allow(dead_code)]
pub fn base_fields() -> Vec<String> {
    strings(&["Agent", "Region", "Product", "Amount"])
}

/// A registry with a base file, a hierarchy file and two lookup files.
#[allow(dead_code)]
pub fn create_registry() -> FileRegistry {
    FileRegistry::new()
        .with_file(
            FileCategory::Base,
            UploadedFile {
                filename: "sales.csv".to_string(),
                columns: base_fields(),
            },
        )
        .with_file(
            FileCategory::Hierarchy,
            UploadedFile {
                filename: "hierarchy.csv".to_string(),
                columns: strings(&["Manager", "ValidFrom", "ValidTo"]),
            },
        )
        .with_file(
            FileCategory::Lookup,
            UploadedFile {
                filename: "regions.csv".to_string(),
                columns: strings(&["Region", "Tier"]),
            },
        )
        .with_file(
            FileCategory::Lookup,
            UploadedFile {
                filename: "rates.csv".to_string(),
                columns: strings(&["Tier", "Product", "Rate", "Cap"]),
            },
        )
}

/// Fills in every non-terminal attribute of a step.
#[allow(dead_code)]
pub fn fill_step(
    chain: &LookupChain,
    step_id: StepId,
    source: &[&str],
    file: &str,
    keys: &[&str],
    returned: &[&str],
) -> LookupChain {
    let base = base_fields();
    chain
        .set_field(step_id, StepEdit::SourceFields(strings(source)), &base)
        .set_field(step_id, StepEdit::TargetFile(file.to_string()), &base)
        .set_field(step_id, StepEdit::TargetKeyFields(strings(keys)), &base)
        .set_field(step_id, StepEdit::ReturnedFields(strings(returned)), &base)
}

/// Sets the terminal attributes of a step.
#[allow(dead_code)]
pub fn finish_step(
    chain: &LookupChain,
    step_id: StepId,
    final_field: &str,
    mode: ApplicationMode,
) -> LookupChain {
    let base = base_fields();
    chain
        .set_field(
            step_id,
            StepEdit::FinalResultField(Some(final_field.to_string())),
            &base,
        )
        .set_field(step_id, StepEdit::ApplicationMode(Some(mode)), &base)
}

/// A single, fully specified step: Region -> regions.csv -> Tier.
#[allow(dead_code)]
pub fn create_complete_single_step_chain() -> LookupChain {
    let chain = LookupChain::new().add_step();
    let chain = fill_step(&chain, 1, &["Region"], "regions.csv", &["Region"], &["Tier"]);
    finish_step(&chain, 1, "Tier", ApplicationMode::Fixed)
}

/// Two complete steps: Region -> Tier, then (step1_result, Product) -> Rate.
#[allow(dead_code)]
pub fn create_complete_two_step_chain() -> LookupChain {
    let chain = LookupChain::new().add_step();
    let chain = fill_step(&chain, 1, &["Region"], "regions.csv", &["Region"], &["Tier"]);
    let chain = chain.add_step();
    let chain = fill_step(
        &chain,
        2,
        &["step1_result", "Product"],
        "rates.csv",
        &["Tier", "Product"],
        &["Rate", "Cap"],
    );
    finish_step(&chain, 2, "Rate", ApplicationMode::Percentage)
}

/// An adjustment rule whose value comes from `chain`.
#[allow(dead_code)]
pub fn create_lookup_rule(kpi_name: &str, chain: LookupChain) -> AdjustmentRule {
    AdjustmentRule {
        id: format!("id-{}", kpi_name),
        kpi_name: kpi_name.to_string(),
        description: "Regional rate".to_string(),
        condition_field: "Region".to_string(),
        adjust_from: "Amount".to_string(),
        adjust_what: "ATAMT".to_string(),
        direction: Direction::Increase,
        adjustment_type: AdjustmentType::Percentage,
        value_type: ValueType::Lookup,
        value: None,
        lookup_chain: Some(chain),
    }
}

/// A fixed-value qualification rule on the amount, summed per agent.
#[allow(dead_code)]
pub fn create_qualification_rule(kpi_name: &str) -> QualificationRule {
    QualificationRule {
        id: format!("id-{}", kpi_name),
        kpi_name: kpi_name.to_string(),
        description: "Minimum sales".to_string(),
        source_field: "Amount".to_string(),
        value_type: ValueType::Fixed,
        evaluation_level: Some(EvaluationLevel::PerAgent),
        aggregation: Aggregation::Sum,
        lookup_table: None,
    }
}

/// Configuration data that passes every rule check.
#[allow(dead_code)]
pub fn create_valid_config_data() -> ConfigData {
    ConfigData {
        base_data_mapping: BaseDataMapping {
            agent_field: "Agent".to_string(),
            txn_id_field: "Region".to_string(),
            txn_date_field: "Product".to_string(),
            amount_field: "Amount".to_string(),
        },
        qualification_rules: vec![create_qualification_rule("MinSales")],
        adjustment_rules: vec![create_lookup_rule(
            "RegionRate",
            create_complete_two_step_chain(),
        )],
        credit_hierarchy: CreditHierarchy {
            id: "h1".to_string(),
            manager_field: "Manager".to_string(),
            valid_from_field: "ValidFrom".to_string(),
            valid_to_field: "ValidTo".to_string(),
        },
        uploaded_files: create_registry(),
        ..ConfigData::default()
    }
}

#[allow(dead_code)]
pub fn fixed_time() -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc
        .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
        .single()
        .expect("valid timestamp")
}
