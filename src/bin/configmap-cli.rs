use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use configmap_provider::convert::{
    infer, AcceptedSnapshot, DataConverter, FlatSnapshot, KeyPathNormalizer, ReconcileMode,
    DEFAULT_KEY_DELIMITER,
};

#[derive(Parser)]
#[command(name = "configmap-cli")]
#[command(about = "Offline tools for ConfigMap configuration data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile ConfigMap data against a current snapshot
    Reconcile {
        /// Current snapshot (JSON object of path to string or null)
        #[arg(long)]
        current: PathBuf,
        /// Incoming ConfigMap data (JSON object of key to string)
        #[arg(long)]
        incoming: PathBuf,
        /// Skip updates whose type differs from the current value
        #[arg(long)]
        safe: bool,
        /// Key segment delimiter used in ConfigMap keys
        #[arg(long, default_value = DEFAULT_KEY_DELIMITER)]
        delimiter: String,
    },
    /// Show the primitive type inferred for a value
    Infer { value: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Reconcile {
            current,
            incoming,
            safe,
            delimiter,
        } => {
            let current: AcceptedSnapshot = read_json(&current)?;
            let incoming: FlatSnapshot = read_json(&incoming)?;
            let converter = DataConverter::new(
                ReconcileMode::from_safe_update(safe),
                KeyPathNormalizer::new(delimiter),
            );
            let reconciliation = converter.reconcile(&current, &incoming);

            let outcomes: Map<String, Value> = reconciliation
                .outcomes
                .iter()
                .map(|(path, outcome)| (path.clone(), Value::String(format!("{:?}", outcome))))
                .collect();
            let conflicts: Vec<Value> = reconciliation
                .conflicts
                .iter()
                .map(|conflict| {
                    json!({
                        "key": conflict.key,
                        "rejected": conflict.rejected,
                        "retained": conflict.retained,
                        "kind": conflict.kind.as_str(),
                    })
                })
                .collect();

            print_json(&json!({
                "snapshot": reconciliation.snapshot,
                "outcomes": outcomes,
                "conflicts": conflicts,
            }))?;
        }
        Commands::Infer { value } => {
            let inferred = infer(&value);
            print_json(&json!({
                "value": value,
                "kind": inferred.kind().as_str(),
                "parsed": format!("{:?}", inferred),
            }))?;
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;
    Ok(value)
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
