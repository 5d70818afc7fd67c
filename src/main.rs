//! botgen: generate typed client libraries from bot API descriptions
//!
//! Reads the raw type and method declarations of an RPC-style bot API,
//! resolves wrapper types, unions, method variations and fluent methods,
//! and renders a single Rust client module.

mod compact;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod fluent;
mod render;
mod resolve;
mod schema;
mod unions;
mod value_types;
mod variations;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing_subscriber::prelude::*;

/// Generate typed client libraries from bot API descriptions
#[derive(Parser)]
#[command(name = "botgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log resolution decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the client library as Rust source
    Generate {
        /// API model file (.json, or YAML otherwise)
        model: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep only the first sentence of each description
        #[arg(long)]
        compact: bool,
    },

    /// Print the resolved model: wrappers, unions, expanded and fluent methods
    Resolve {
        /// API model file (.json, or YAML otherwise)
        model: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml", value_enum)]
        format: OutputFormat,
    },

    /// Show which member of a union, or which event of the envelope, a JSON
    /// payload selects
    Select {
        /// API model file (.json, or YAML otherwise)
        model: PathBuf,

        /// Union or envelope type name
        union: String,

        /// JSON object to dispatch
        payload: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            model,
            out,
            compact,
        } => {
            let api = load_and_resolve(&model)?;

            eprintln!("  → Rendering...");
            let source = render::render(&api, render::RenderOptions { compact });

            match out {
                Some(path) => {
                    write_atomically(&path, &source)?;
                    eprintln!("  → Wrote {}", path.display());
                }
                None => io::stdout().lock().write_all(source.as_bytes())?,
            }
        }
        Commands::Resolve { model, format } => {
            let api = load_and_resolve(&model)?;
            output_resolved(&api, format)?;
        }
        Commands::Select {
            model,
            union,
            payload,
        } => {
            let api = load_and_resolve(&model)?;
            let content = fs::read_to_string(&payload)
                .with_context(|| format!("Failed to read payload {}", payload.display()))?;
            let payload: Map<String, Value> = serde_json::from_str(&content)
                .with_context(|| format!("Payload {} is not a JSON object", payload.display()))?;
            println!("{}", select_member(&api, &union, &payload)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_and_resolve(path: &Path) -> Result<resolve::ResolvedApi> {
    eprintln!("Loading API model: {}", path.display());
    let model = schema::ApiModel::load(path)?;
    eprintln!(
        "  → {} types, {} methods",
        model.types.len(),
        model.methods.len()
    );

    eprintln!("  → Resolving...");
    let api = resolve::resolve(model, &config::RuleSet::telegram())
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    eprintln!(
        "  → {} wrapper types, {} unions, {} methods, {} fluent methods",
        api.value_types.wrappers.len(),
        api.unions.hierarchies.len(),
        api.methods.len(),
        api.fluent.len()
    );

    Ok(api)
}

/// Name of the record a payload dispatches to.
fn select_member(
    api: &resolve::ResolvedApi,
    union: &str,
    payload: &Map<String, Value>,
) -> Result<String> {
    if let Some(envelope) = api.unions.envelope.as_ref().filter(|e| e.name == union) {
        let kind = envelope.select(payload)?;
        return Ok(format!("{} ({})", kind.sibling, kind.tag));
    }

    let Some(hierarchy) = api.unions.hierarchy(&schema::ElementName::new(union)) else {
        bail!("`{union}` is not a union of the model");
    };
    Ok(hierarchy.select(payload)?.to_string())
}

/// Write through a temporary file in the target directory, so a failed run
/// leaves any previous output untouched.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

fn output_resolved(api: &resolve::ResolvedApi, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(api)?;
            write!(handle, "{}", yaml)?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(api)?;
            writeln!(handle, "{}", json)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "botgen",
            "generate",
            "models/bot_api.yaml",
            "-o",
            "out/api.rs",
            "--compact",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                model,
                out,
                compact,
            } => {
                assert_eq!(model, PathBuf::from("models/bot_api.yaml"));
                assert_eq!(out, Some(PathBuf::from("out/api.rs")));
                assert!(compact);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["botgen", "resolve", "m.yaml", "--format", "toml"]).is_err());
    }

    #[test]
    fn test_load_and_resolve_bundled_model() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/bot_api.yaml");
        let api = load_and_resolve(&path).unwrap();

        assert_eq!(api.model, fixtures::model());
        assert!(api.method("editInlineMessageText").is_some());
    }

    #[test]
    fn test_select_member() {
        let api = resolve::resolve(fixtures::model(), &config::RuleSet::telegram()).unwrap();
        let payload = |value: Value| match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        };

        let update = payload(serde_json::json!({"update_id": 7, "edited_message": {}}));
        assert_eq!(
            select_member(&api, "Update", &update).unwrap(),
            "EditedMessageUpdate (EDITED_MESSAGE)"
        );

        let member = payload(serde_json::json!({"status": "kicked", "user": {}}));
        assert_eq!(
            select_member(&api, "ChatMember", &member).unwrap(),
            "ChatMemberBanned"
        );

        let content = payload(serde_json::json!({"phone_number": "+1", "first_name": "A"}));
        assert_eq!(
            select_member(&api, "InputMessageContent", &content).unwrap(),
            "InputContactMessageContent"
        );

        let err = select_member(&api, "Update", &payload(serde_json::json!({"update_id": 7})))
            .unwrap_err();
        assert!(err.to_string().contains("expected exactly one variant to match"));
        assert!(select_member(&api, "Message", &update).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = load_and_resolve(Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read model file"));
    }

    #[test]
    fn test_write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/api.rs");

        write_atomically(&path, "first").unwrap();
        write_atomically(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_resolution_errors_carry_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(
            &path,
            "types:\n  - name: Message\n    fields:\n      - { name: photo, wire_name: photo, type: PhotoSize }\n",
        )
        .unwrap();

        let err = load_and_resolve(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to resolve"));
        assert!(format!("{err:#}").contains("undeclared type `PhotoSize`"));
    }
}
