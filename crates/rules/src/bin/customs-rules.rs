//! customs-rules — create, edit and inspect rules documents.
//!
//! Documents live as `<service>.yml` files in the rules directory. `create`
//! and `edit` open the document in `$EDITOR`; the file is only rewritten when
//! the edited document validates.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use customs_rules::{
    template, EditorConfig, LoadStatus, RuleDocument, RuleStore, DEFAULT_SERVICE,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Manage customs rules documents.
#[derive(Parser, Debug)]
#[command(name = "customs-rules", version, about)]
struct Cli {
    /// Directory holding `<service>.yml` rules documents.
    #[arg(long, env = "CUSTOMS_RULES_DIR", default_value = "rules")]
    rules_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the default template.
    Template,
    /// Author a new document from the template in $EDITOR.
    Create {
        #[arg(default_value = DEFAULT_SERVICE)]
        service: String,
        /// Replace an existing document of the same name.
        #[arg(long)]
        force: bool,
    },
    /// Edit an existing document in $EDITOR.
    Edit { service: String },
    /// Print a document as YAML.
    Show { service: String },
    /// Print a document's content hash.
    Hash { service: String },
    /// Load every document in the rules directory and report the outcome.
    List,
    /// Delete a document.
    Delete { service: String },
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let store = RuleStore::new(&cli.rules_dir);
    let editor = EditorConfig::from_env();

    match cli.command {
        Command::Template => {
            print!("{}", template::render_template()?);
        }
        Command::Create { service, force } => {
            if store.exists(&service) && !force {
                bail!("rules for '{service}' already exist; use `edit` or pass --force");
            }
            let doc = RuleDocument::create(&service, &editor)
                .with_context(|| format!("failed to create rules for '{service}'"))?;
            let path = store.write(&doc)?;
            println!("{} {}", doc.content_hash()?, path.display());
        }
        Command::Edit { service } => {
            let mut doc = store
                .load(&service)
                .with_context(|| format!("failed to load rules for '{service}'"))?;
            let before = doc.content_hash()?;
            doc.edit(&editor)
                .with_context(|| format!("failed to edit rules for '{service}'"))?;
            let after = doc.content_hash()?;
            if after == before {
                info!(service = %service, "no changes");
                println!("{after} unchanged");
            } else {
                let path = store.write(&doc)?;
                println!("{after} {}", path.display());
            }
        }
        Command::Show { service } => {
            let doc = store.load(&service)?;
            print!("{}", doc.to_yaml()?);
        }
        Command::Hash { service } => {
            let doc = store.load(&service)?;
            println!("{}", doc.content_hash()?);
        }
        Command::List => {
            let mut failures = 0;
            for result in store.load_all()? {
                match result.status {
                    LoadStatus::Loaded { name, hash } => println!("{hash} {name}"),
                    LoadStatus::Failed { error } => {
                        failures += 1;
                        eprintln!("error {}: {error}", result.path.display());
                    }
                    LoadStatus::Skipped { .. } => {}
                }
            }
            if failures > 0 {
                bail!("{failures} rules file(s) failed to load");
            }
        }
        Command::Delete { service } => {
            store.delete(&service)?;
            println!("deleted {service}");
        }
    }

    Ok(())
}
