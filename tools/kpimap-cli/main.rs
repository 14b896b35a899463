use clap::{Parser, Subcommand};
use kpimap::chain::default_result_variable;
use kpimap::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Capture, validate and version KPI configurations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding stored configuration documents
    #[arg(long, env = "KPIMAP_CONFIG_DIR", default_value = kpimap::store::DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Directory holding uploaded data files
    #[arg(long, env = "KPIMAP_UPLOADS_DIR", default_value = kpimap::store::DEFAULT_UPLOADS_DIR)]
    uploads_dir: PathBuf,

    /// Log filter, e.g. `info` or `kpimap=debug`
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the column headers of an uploaded file (path or upload identifier)
    Headers { file: String },

    /// Start a new configuration from uploaded files and store it
    New {
        /// KPI identifier, at most 10 characters
        identifier: String,
        /// Base data file
        #[arg(long)]
        base: String,
        /// Credit hierarchy file
        #[arg(long)]
        hierarchy: Option<String>,
        /// Lookup files, may be repeated
        #[arg(long)]
        lookup: Vec<String>,
    },

    /// Check a configuration document and report every rule issue
    Validate { document: PathBuf },

    /// Show the versions and lookup chains of a configuration document
    Show { document: PathBuf },

    /// List stored configurations
    List,

    /// Store a configuration document as a new file
    Save { document: PathBuf },

    /// Append the current data of a document as a new version and store it
    Bump {
        document: PathBuf,
        #[arg(short, long, default_value = "Updated configuration")]
        description: String,
    },

    /// Interactively edit the lookup chain of an adjustment rule
    Edit {
        document: PathBuf,
        /// KPI name of the adjustment rule
        #[arg(short, long)]
        rule: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = StoreSettings {
        config_dir: cli.config_dir,
        uploads_dir: cli.uploads_dir,
    };

    let outcome = match cli.command {
        Command::Headers { file } => run_headers(&settings, &file),
        Command::New {
            identifier,
            base,
            hierarchy,
            lookup,
        } => run_new(&settings, &identifier, &base, hierarchy.as_deref(), &lookup),
        Command::Validate { document } => run_validate(&document),
        Command::Show { document } => run_show(&document),
        Command::List => run_list(&settings),
        Command::Save { document } => run_save(&settings, &document),
        Command::Bump {
            document,
            description,
        } => run_bump(&settings, &document, &description),
        Command::Edit { document, rule } => run_edit(&settings, &document, &rule),
    };

    if let Err(e) = outcome {
        exit_with_error(&e.to_string());
    }
}

/// Accepts either a path on disk or an identifier inside the uploads directory.
fn resolve_upload(settings: &StoreSettings, file: &str) -> Result<PathBuf> {
    let path = Path::new(file);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    Ok(settings.upload_path(file)?)
}

fn load_document(path: &Path) -> Result<KpiConfiguration> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read configuration '{}': {}", path.display(), e))?;
    Ok(KpiConfiguration::from_json(&json)?)
}

fn run_headers(settings: &StoreSettings, file: &str) -> Result<()> {
    let path = resolve_upload(settings, file)?;
    let uploaded = extract_headers(&path)?;
    println!("{}", serde_json::to_string_pretty(&uploaded)?);
    Ok(())
}

fn run_new(
    settings: &StoreSettings,
    identifier: &str,
    base: &str,
    hierarchy: Option<&str>,
    lookup: &[String],
) -> Result<()> {
    let mut registry = FileRegistry::new();
    registry.register(
        FileCategory::Base,
        extract_headers(&resolve_upload(settings, base)?)?,
    );
    if let Some(hierarchy) = hierarchy {
        registry.register(
            FileCategory::Hierarchy,
            extract_headers(&resolve_upload(settings, hierarchy)?)?,
        );
    }
    for file in lookup {
        registry.register(
            FileCategory::Lookup,
            extract_headers(&resolve_upload(settings, file)?)?,
        );
    }

    let data = ConfigData {
        uploaded_files: registry,
        ..ConfigData::default()
    };
    let now = chrono::Utc::now();
    let config = KpiConfiguration::new(identifier, data, now);
    let store = ConfigStore::open(settings)?;
    let id = store.save(&config, now)?;
    println!("Created configuration '{}' as '{}'", config.case_file_id, id);
    Ok(())
}

fn run_validate(document: &Path) -> Result<()> {
    let config = load_document(document)?;
    let current = config.current_version()?;
    let issues = current.data.validate();

    println!(
        "Configuration '{}' version {} ({})",
        config.case_file_id, current.version, current.status
    );
    if issues.is_empty() {
        println!("  -> No issues found");
        return Ok(());
    }
    for issue in &issues {
        println!("  -> {}", issue);
    }
    Err(format!("{} issue(s) found", issues.len()).into())
}

fn run_show(document: &Path) -> Result<()> {
    let config = load_document(document)?;
    println!(
        "Configuration '{}' created {} by {}",
        config.case_file_id, config.created_on, config.created_by
    );
    for version in &config.versions {
        println!(
            "  Version {} [{}] saved {}: {}",
            version.version, version.status, version.saved_on, version.description
        );
    }

    let current = config.current_version()?;
    for rule in &current.data.adjustment_rules {
        let Some(chain) = &rule.lookup_chain else {
            continue;
        };
        println!("\nAdjustment '{}' lookup chain:", rule.kpi_name);
        print_chain(chain);
    }
    Ok(())
}

fn print_chain(chain: &LookupChain) {
    if chain.is_empty() {
        println!("  (no steps)");
    }
    for step in chain.steps() {
        match StepPreview::format(step) {
            Some(preview) => println!("  Step {} Preview: {}", step.step_id, preview),
            None => println!("  Step {}: incomplete ({})", step.step_id, step.result_variable),
        }
        if let Some(mode) = step.lookup_application_mode {
            println!("    applied as: {}", mode);
        }
    }
    let issues = chain.completion_issues();
    if issues.is_empty() {
        println!("  -> Chain complete");
    } else {
        for issue in issues {
            println!("  -> {}", issue);
        }
    }
}

fn run_list(settings: &StoreSettings) -> Result<()> {
    let store = ConfigStore::open(settings)?;
    let configs = store.list()?;
    if configs.is_empty() {
        println!("No configurations stored in '{}'", store.dir().display());
    }
    for config in configs {
        let modified = config
            .modified_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}  (modified {})", config.id, modified);
    }
    Ok(())
}

fn run_save(settings: &StoreSettings, document: &Path) -> Result<()> {
    let config = load_document(document)?;
    let store = ConfigStore::open(settings)?;
    let id = store.save(&config, chrono::Utc::now())?;
    println!("Configuration saved as '{}'", id);
    Ok(())
}

fn run_bump(settings: &StoreSettings, document: &Path, description: &str) -> Result<()> {
    let mut config = load_document(document)?;
    let mut data = config.current_version()?.data.clone();
    data.normalize();
    store_new_version(settings, &mut config, data, description)
}

fn store_new_version(
    settings: &StoreSettings,
    config: &mut KpiConfiguration,
    data: ConfigData,
    description: &str,
) -> Result<()> {
    let now = chrono::Utc::now();
    let version = config.push_version(data, description, now)?.version.clone();
    let store = ConfigStore::open(settings)?;
    let id = store.save(config, now)?;
    println!("Version {} saved as '{}'", version, id);
    Ok(())
}

fn run_edit(settings: &StoreSettings, document: &Path, kpi_name: &str) -> Result<()> {
    let mut config = load_document(document)?;
    let mut data = config.current_version()?.data.clone();
    let rule_index = data
        .adjustment_rules
        .iter()
        .position(|r| r.kpi_name == kpi_name)
        .ok_or_else(|| format!("No adjustment rule named '{}'", kpi_name))?;

    let mut editor = data.adjustment_rules[rule_index].edit_chain(&data.uploaded_files);
    if editor.chain().is_empty() {
        editor.add_step();
    }

    println!("--- Lookup Chain Editor: '{}' ---", kpi_name);
    print_help();
    loop {
        let line = prompt_for_input("chain")?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "help" => print_help(),
            "show" => print_editor(&editor),
            "add" => {
                editor.add_step();
                print_editor(&editor);
            }
            "remove" => match parse_step_id(&args) {
                Some(id) => {
                    editor.remove_step(id);
                    print_editor(&editor);
                }
                None => println!("Usage: remove <step>"),
            },
            "set" => match parse_edit(&args) {
                Some((id, edit)) => {
                    editor.set_field(id, edit);
                    print_editor(&editor);
                }
                None => println!("Usage: set <step> <field> [values...]"),
            },
            "fields" => match parse_step_id(&args) {
                Some(id) => {
                    println!("  source fields: {}", editor.available_source_fields(id).join(", "));
                    println!("  lookup files: {}", editor.available_files().join(", "));
                    println!("  target columns: {}", editor.columns_for(id).join(", "));
                }
                None => println!("Usage: fields <step>"),
            },
            "undo" => {
                if !editor.undo() {
                    println!("Nothing to undo");
                }
            }
            "redo" => {
                if !editor.redo() {
                    println!("Nothing to redo");
                }
            }
            "done" => {
                if !editor.is_ready() {
                    println!("The chain is not ready yet:");
                    print_editor(&editor);
                    continue;
                }
                let rule = &mut data.adjustment_rules[rule_index];
                rule.value_type = ValueType::Lookup;
                rule.set_lookup_chain(editor.into_chain());
                data.normalize();
                return store_new_version(settings, &mut config, data, "Updated lookup chain");
            }
            "quit" => {
                println!("Discarding changes");
                return Ok(());
            }
            other => println!("Unknown command '{}', type 'help'", other),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  show | add | remove <step> | fields <step> | undo | redo | done | quit");
    println!("  set <step> source <fields...>     set <step> file <name>");
    println!("  set <step> keys <columns...>      set <step> returns <columns...>");
    println!("  set <step> result <name>          set <step> final [column]");
    println!("  set <step> mode [fixed|percentage]");
}

fn print_editor(editor: &ChainEditor) {
    print_chain(editor.chain());
    for (step_id, field, message) in editor.errors().iter() {
        println!("  !! Step {} {}: {}", step_id, field, message);
    }
}

fn parse_step_id(args: &[&str]) -> Option<StepId> {
    args.first().and_then(|s| s.parse().ok())
}

fn parse_edit(args: &[&str]) -> Option<(StepId, StepEdit)> {
    let id = parse_step_id(args)?;
    let field = *args.get(1)?;
    let values: Vec<String> = args.iter().skip(2).map(|s| s.to_string()).collect();
    let single = values.first().cloned();

    let edit = match field {
        "source" => StepEdit::SourceFields(values),
        "file" => StepEdit::TargetFile(single.unwrap_or_default()),
        "keys" => StepEdit::TargetKeyFields(values),
        "returns" => StepEdit::ReturnedFields(values),
        "result" => StepEdit::ResultVariable(single.unwrap_or_else(|| default_result_variable(id))),
        "final" => StepEdit::FinalResultField(single),
        "mode" => StepEdit::ApplicationMode(match single.as_deref() {
            None => None,
            Some("fixed") => Some(ApplicationMode::Fixed),
            Some("percentage") => Some(ApplicationMode::Percentage),
            Some(_) => return None,
        }),
        _ => return None,
    };
    Some((id, edit))
}

/// A helper function to prompt the user and read a line of input.
/// End of input reads as `quit`.
fn prompt_for_input(prompt_text: &str) -> Result<String> {
    let mut line = String::new();

    print!("> {}: ", prompt_text);
    io::stdout().flush()?;

    if io::stdin().read_line(&mut line)? == 0 {
        return Ok("quit".to_string());
    }
    Ok(line.trim().to_string())
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
