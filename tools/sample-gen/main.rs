use clap::Parser;
use kpimap::document::{Aggregation, EvaluationLevel};
use kpimap::prelude::*;
use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::IndexedRandom;
use std::fs;

const BASE_COLUMNS: &[&str] = &[
    "AgentId", "TxnId", "TxnDate", "Amount", "Region", "Product", "Channel",
];
const LOOKUP_KEYS: &[&str] = &["Region", "Product", "Channel", "Tier"];
const LOOKUP_VALUES: &[&str] = &["Rate", "Bonus", "Multiplier", "Tier", "Cap"];

/// A CLI tool to generate sample KPI configuration documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_config.json")]
    output: String,

    /// KPI identifier of the generated configuration
    #[arg(long, default_value = "SAMPLE")]
    identifier: String,

    /// Number of lookup files to generate
    #[arg(long, default_value_t = 3)]
    files: usize,

    /// The maximum number of steps in each lookup chain
    #[arg(long, default_value_t = 4)]
    max_steps: usize,

    /// Number of lookup-valued adjustment rules
    #[arg(long, default_value_t = 2)]
    rules: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if cli.files == 0 || cli.max_steps == 0 {
        eprintln!("Error: --files and --max-steps must be at least 1");
        std::process::exit(1);
    }

    println!(
        "Generating configuration '{}' ({} lookup files, up to {} steps per chain)...",
        cli.identifier, cli.files, cli.max_steps
    );

    let registry = generate_registry(&mut rng, cli.files);
    let adjustment_rules = (0..cli.rules)
        .map(|i| generate_rule(&mut rng, &registry, i + 1, cli.max_steps))
        .collect();

    let data = ConfigData {
        base_data_mapping: BaseDataMapping {
            agent_field: "AgentId".to_string(),
            txn_id_field: "TxnId".to_string(),
            txn_date_field: "TxnDate".to_string(),
            amount_field: "Amount".to_string(),
        },
        qualification_rules: vec![generate_qualification_rule(&mut rng)],
        adjustment_rules,
        uploaded_files: registry,
        ..ConfigData::default()
    };

    let config = KpiConfiguration::new(&cli.identifier, data, chrono::Utc::now());
    let json_output = serde_json::to_string_pretty(&config)?;
    fs::write(&cli.output, json_output)?;

    println!(
        "Successfully generated and saved configuration to '{}'",
        cli.output
    );
    Ok(())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn generate_registry(rng: &mut ThreadRng, files: usize) -> FileRegistry {
    let mut registry = FileRegistry::new().with_file(
        FileCategory::Base,
        UploadedFile {
            filename: "base_data.csv".to_string(),
            columns: strings(BASE_COLUMNS),
        },
    );
    for i in 1..=files {
        let key = *LOOKUP_KEYS.choose(rng).unwrap_or(&"Region");
        let mut columns = vec![key.to_string()];
        for value in LOOKUP_VALUES {
            if *value != key && rng.random_bool(0.6) {
                columns.push(value.to_string());
            }
        }
        if columns.len() == 1 {
            columns.push("Rate".to_string());
        }
        registry.register(
            FileCategory::Lookup,
            UploadedFile {
                filename: format!("lookup_{}.csv", i),
                columns,
            },
        );
    }
    registry
}

/// Builds a chain through the editor so every generated step is consistent.
fn generate_chain(rng: &mut ThreadRng, registry: &FileRegistry, max_steps: usize) -> LookupChain {
    let mut editor = ChainEditor::new(LookupChain::new(), registry.clone());
    let steps = rng.random_range(1..=max_steps);
    let files = registry.lookup_file_names();

    for _ in 0..steps {
        editor.add_step();
        let id = editor.chain().len() as StepId;

        let available = editor.available_source_fields(id);
        let source = available
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "Region".to_string());
        editor.set_field(id, StepEdit::SourceFields(vec![source]));

        let file = files.choose(rng).cloned().unwrap_or_default();
        editor.set_field(id, StepEdit::TargetFile(file));
        let columns = editor.columns_for(id).to_vec();
        let (key, returned) = columns.split_first().map_or((Vec::new(), Vec::new()), |(k, rest)| {
            (vec![k.clone()], rest.to_vec())
        });
        editor.set_field(id, StepEdit::TargetKeyFields(key));
        editor.set_field(id, StepEdit::ReturnedFields(returned));
    }

    let id = editor.chain().len() as StepId;
    let final_field = editor
        .chain()
        .last()
        .and_then(|step| step.returned_fields.choose(rng).cloned());
    let mode = if rng.random_bool(0.5) {
        ApplicationMode::Fixed
    } else {
        ApplicationMode::Percentage
    };
    editor.set_field(id, StepEdit::FinalResultField(final_field));
    editor.set_field(id, StepEdit::ApplicationMode(Some(mode)));
    editor.into_chain()
}

fn generate_qualification_rule(rng: &mut ThreadRng) -> QualificationRule {
    let (evaluation_level, aggregation) = if rng.random_bool(0.5) {
        (EvaluationLevel::PerRecord, Aggregation::NotApplicable)
    } else {
        (EvaluationLevel::PerAgent, Aggregation::Sum)
    };
    QualificationRule {
        id: "qual-1".to_string(),
        kpi_name: "MinimumAmount".to_string(),
        description: "Generated qualification".to_string(),
        source_field: "Amount".to_string(),
        value_type: ValueType::Fixed,
        evaluation_level: Some(evaluation_level),
        aggregation,
        lookup_table: None,
    }
}

fn generate_rule(
    rng: &mut ThreadRng,
    registry: &FileRegistry,
    index: usize,
    max_steps: usize,
) -> AdjustmentRule {
    AdjustmentRule {
        id: format!("adj-{}", index),
        kpi_name: format!("LookupAdjustment{}", index),
        description: "Generated lookup adjustment".to_string(),
        condition_field: "Region".to_string(),
        adjust_from: "Amount".to_string(),
        adjust_what: "ATAMT".to_string(),
        direction: if rng.random_bool(0.5) {
            Direction::Increase
        } else {
            Direction::Decrease
        },
        adjustment_type: AdjustmentType::Percentage,
        value_type: ValueType::Lookup,
        value: None,
        lookup_chain: Some(generate_chain(rng, registry, max_steps)),
    }
}
