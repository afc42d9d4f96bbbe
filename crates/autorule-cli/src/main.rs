//! autorule CLI - manage Jira Automation rules from the command line.

mod export;

use std::path::{Path, PathBuf};

use anyhow::Context;
use autorule_codec::{AliasMap, BuildContext, Codec, WebhookCredentials};
use autorule_core::config::{Config, Credentials};
use autorule_core::{Outcome, Warning};
use autorule_engine::{Representation, RuleManager};
use autorule_jira::AutomationClient;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::export::{document_path, rule_id_from_url, sanitize, NameAllocator, RuleDocument};

#[derive(Parser)]
#[command(name = "autorule")]
#[command(author, version, about = "autorule - Jira Automation rules as code", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all automation rules
    List,

    /// Show a rule in canonical form
    Show {
        /// Rule UUID
        id: String,

        /// Parse trigger and components into the structured form
        #[arg(long)]
        structured: bool,
    },

    /// Write rule documents for existing rules
    Export {
        /// Output directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Only rules carrying this label
        #[arg(long)]
        label: Option<String>,

        /// A single rule by UUID
        #[arg(long, conflicts_with = "url")]
        id: Option<String>,

        /// A single rule by its Automation URL (`...#/rule/<uuid>`)
        #[arg(long)]
        url: Option<String>,
    },

    /// Create or update a rule from a rule document
    Apply {
        /// Rule document (JSON)
        file: PathBuf,

        /// Existing rule to update (overrides the document's `id`)
        #[arg(long)]
        id: Option<String>,

        /// Write the resulting rule id back into the document
        #[arg(long)]
        write_id: bool,
    },

    /// Disable a rule (the API cannot delete rules)
    Disable {
        /// Rule UUID
        id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a value (`jira.site_url`, `jira.email`, `jira.webhook_user`,
    /// `jira.timeout_secs`, `aliases.<name>`)
    Set { key: String, value: String },

    /// Print a value
    Get { key: String },

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::List) => list().await,
        Some(Commands::Show { id, structured }) => show(&id, structured).await,
        Some(Commands::Export {
            dir,
            label,
            id,
            url,
        }) => {
            let single = match (id, url) {
                (Some(id), _) => Some(id),
                (None, Some(url)) => Some(rule_id_from_url(&url)?),
                (None, None) => None,
            };
            export(&dir, label.as_deref(), single.as_deref()).await
        }
        Some(Commands::Apply { file, id, write_id }) => apply(&file, id, write_id).await,
        Some(Commands::Disable { id }) => disable(&id).await,
        Some(Commands::Config { command }) => config(command),
        None => {
            println!("autorule - Jira Automation rules as code");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

async fn connect() -> anyhow::Result<RuleManager<AutomationClient>> {
    let config = Config::load()?.apply_env();
    let connection = config.connection(Credentials::from_env())?;
    let client = AutomationClient::connect(&connection).await?;

    let mut context = BuildContext::new(client.cloud_id());
    if let (Some(user), Some(token)) = (&connection.webhook_user, &connection.webhook_token) {
        context = context.with_webhook(WebhookCredentials::new(user.clone(), token.clone()));
    }
    let aliases = AliasMap::new(connection.field_aliases.clone());

    Ok(RuleManager::new(client, Codec::new(context, aliases)))
}

fn report(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {}: {}", warning.summary, warning.detail);
    }
}

async fn list() -> anyhow::Result<()> {
    let manager = connect().await?;
    let rules = manager.list().await?;

    for rule in &rules {
        println!("{}  {:<8}  {}", rule.uuid, rule.state, rule.name);
    }
    tracing::info!("{} rules", rules.len());
    Ok(())
}

async fn show(id: &str, structured: bool) -> anyhow::Result<()> {
    let manager = connect().await?;
    let repr = if structured {
        Representation::STRUCTURED
    } else {
        Representation::RAW
    };
    let view = manager.read(id, repr).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn export(dir: &Path, label: Option<&str>, single: Option<&str>) -> anyhow::Result<()> {
    let manager = connect().await?;
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let ids: Vec<String> = match single {
        Some(id) => vec![id.to_string()],
        None => manager.list().await?.into_iter().map(|r| r.uuid).collect(),
    };
    if let Some(label) = label {
        tracing::info!(label = label, "Filtering by label");
    }

    let mut names = NameAllocator::default();
    let mut written = 0;
    for (i, id) in ids.iter().enumerate() {
        let view = match manager.import(id).await {
            Ok(view) => view,
            Err(e) if single.is_none() => {
                eprintln!("  [{}/{}] {} SKIP ({})", i + 1, ids.len(), id, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(label) = label {
            if !view.labels.iter().any(|l| l == label) {
                tracing::debug!(rule_id = id.as_str(), label = label, "Skipping rule without label");
                continue;
            }
        }

        let name = names.allocate(&sanitize(&view.name));
        let path = document_path(dir, &name);
        RuleDocument::from_view(&view).save(&path)?;
        println!("Generated {}", path.display());
        written += 1;
    }

    tracing::info!("Exported {} of {} rules", written, ids.len());
    Ok(())
}

async fn apply(file: &Path, id: Option<String>, write_id: bool) -> anyhow::Result<()> {
    let mut document = RuleDocument::load(file)?;
    let manager = connect().await?;

    let existing = id.or_else(|| document.id.clone());
    let Outcome { value, warnings } = manager.apply(existing.as_deref(), &document.spec).await?;
    report(&warnings);
    println!("{}  {}  {}", value.id, value.state, value.name);

    if write_id && document.id.as_deref() != Some(value.id.as_str()) {
        document.id = Some(value.id);
        document.save(file)?;
    }
    Ok(())
}

async fn disable(id: &str) -> anyhow::Result<()> {
    let manager = connect().await?;
    let outcome = manager.destroy(id).await?;
    report(&outcome.warnings);
    Ok(())
}

fn config(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {}", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load()?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Show => {
            let config = Config::load()?.apply_env();
            println!("Config file: {}", Config::config_path()?.display());
            print!("{}", toml::to_string_pretty(&config)?);
            let credentials = Credentials::from_env();
            println!(
                "API token: {}",
                if credentials.api_token.is_some() { "set" } else { "not set" }
            );
            println!(
                "Webhook token: {}",
                if credentials.webhook_token.is_some() { "set" } else { "not set" }
            );
        }
    }
    Ok(())
}
