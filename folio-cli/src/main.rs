use clap::{Parser, Subcommand, ValueEnum};
use folio::{validate_document, Document, DocumentSnapshot, Registry};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Folio CLI: inspect rulesets and structural documents from the command line
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Path to the ruleset YAML file
    #[arg(long)]
    ruleset: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List element types with anchor class, children and field cardinalities
    Types,

    /// Check a document snapshot against the ruleset
    Validate {
        /// Snapshot file (.yaml or .json)
        document: PathBuf,
    },

    /// Print the logical and physical trees of a document
    Tree {
        /// Snapshot file (.yaml or .json)
        document: PathBuf,
    },

    /// Print the anchor class chain of the logical tree
    Anchors {
        /// Snapshot file (.yaml or .json)
        document: PathBuf,
    },

    /// Print the part of a document stored in the record of one anchor class
    Split {
        /// Snapshot file (.yaml or .json)
        document: PathBuf,
        /// Anchor class of the record to produce
        #[arg(long)]
        anchor: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("ERROR:{e}");
            process::exit(1);
        }
    }
}

/// Returns false when the command ran but found problems.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = Arc::new(Registry::load(&cli.ruleset)?);

    match cli.command {
        Command::Types => {
            let types: Vec<_> = registry
                .element_types()
                .iter()
                .map(|t| {
                    let fields: serde_json::Map<String, serde_json::Value> = t
                        .fields
                        .iter()
                        .map(|slot| {
                            (
                                slot.type_name.clone(),
                                serde_json::Value::from(slot.rule.cardinality.code()),
                            )
                        })
                        .collect();
                    let groups: serde_json::Map<String, serde_json::Value> = t
                        .groups
                        .iter()
                        .map(|slot| {
                            (
                                slot.type_name.clone(),
                                serde_json::Value::from(slot.rule.cardinality.code()),
                            )
                        })
                        .collect();
                    serde_json::json!({
                        "name": t.name,
                        "anchor": t.anchor_class,
                        "topmost": t.topmost,
                        "file_set": t.has_file_set,
                        "children": t.allowed_children,
                        "fields": fields,
                        "groups": groups,
                    })
                })
                .collect();
            print_output(&serde_json::Value::Array(types), &cli.format)?;
        }

        Command::Validate { document } => {
            let doc = load_document(&registry, &document)?;
            let result = validate_document(&doc)?;
            print_output(
                &serde_json::json!({
                    "ok": result.is_ok(),
                    "errors": result.errors,
                    "warnings": result.warnings,
                }),
                &cli.format,
            )?;
            return Ok(result.is_ok());
        }

        Command::Tree { document } => {
            let doc = load_document(&registry, &document)?;
            let show = |root: Option<folio::NodeId>| root.map(|r| doc.display(r).to_string());
            print_output(
                &serde_json::json!({
                    "logical": show(doc.logical_root()),
                    "physical": show(doc.physical_root()),
                }),
                &cli.format,
            )?;
        }

        Command::Anchors { document } => {
            let doc = load_document(&registry, &document)?;
            let chain = match doc.logical_root() {
                Some(root) => doc.all_anchor_classes(root)?,
                None => Vec::new(),
            };
            print_output(&serde_json::json!({ "anchors": chain }), &cli.format)?;
        }

        Command::Split { document, anchor } => {
            let mut doc = load_document(&registry, &document)?;
            let root = doc
                .logical_root()
                .ok_or("Document has no logical tree")?;
            let record = doc.copy_truncated(root, &anchor)?;
            doc.set_logical_root(record)?;

            // The record of an anchor class carries no pagination.
            let mut snapshot = doc.to_snapshot()?;
            snapshot.physical = None;
            snapshot
                .edges
                .retain(|e| e.source.starts_with("logical:") && e.target.starts_with("logical:"));
            print_output(&serde_json::to_value(&snapshot)?, &cli.format)?;
        }
    }

    Ok(true)
}

fn load_document(registry: &Arc<Registry>, path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let snapshot = DocumentSnapshot::load(path)
        .map_err(|e| format!("Failed to read document '{}': {e}", path.display()))?;
    Ok(Document::from_snapshot(registry.clone(), &snapshot)?)
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}
