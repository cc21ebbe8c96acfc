//! tasktank - command-line front end for the task store.
//!
//! Prints JSON results on stdout. Logs go to stderr (`RUST_LOG`, default `warn`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tasktank_core::app::{ListParams, TaskTools, TaskUpdateInput};
use tasktank_core::domain::{NewTaskInput, TaskPatchInput};
use tasktank_core::{StoreBuilder, StoreConfig};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "tasktank", version, about = "Track tasks in a JSON Lines file")]
struct Cli {
    /// Task file (overrides config and TASKTANK_TASKS_PATH).
    #[arg(long, global = true)]
    tasks_path: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true, env = "TASKTANK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a task.
    Add {
        description: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List tasks, optionally filtered.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    /// Claim the highest-priority todo task (marks it in-progress).
    Next,
    /// Mark a task done.
    Complete { id: String },
    /// Change fields of a task.
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// Remove the due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Show what a task depends on and what depends on it.
    Related { id: String },
    /// Remove a task.
    Delete { id: String },
}

#[derive(Debug, Args)]
struct FieldArgs {
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    /// RFC 3339 due date.
    #[arg(long)]
    due: Option<String>,
    /// Repeatable.
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Repeatable task id.
    #[arg(long = "depends-on")]
    depends_on: Vec<String>,
}

impl FieldArgs {
    fn tags(&self) -> Option<Vec<String>> {
        (!self.tags.is_empty()).then(|| self.tags.clone())
    }

    fn depends_on(&self) -> Option<Vec<String>> {
        (!self.depends_on.is_empty()).then(|| self.depends_on.clone())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    }
    .apply_env()?;
    if let Some(path) = &cli.tasks_path {
        config.tasks_path = Some(path.clone());
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(tools: &TaskTools, command: Command) -> Result<()> {
    match command {
        Command::Add {
            description,
            fields,
        } => {
            let input = NewTaskInput {
                description,
                status: fields.status.clone(),
                priority: fields.priority.clone(),
                due: fields.due.clone(),
                tags: fields.tags(),
                depends_on: fields.depends_on(),
            };
            let result = tools.create_many(vec![input]).await?;
            if let Some(error) = result.results.iter().find_map(|r| r.error.clone()) {
                anyhow::bail!(error);
            }
            print_json(&result)
        }
        Command::List { status, priority } => {
            print_json(&tools.list(ListParams { status, priority }).await?)
        }
        Command::Next => print_json(&tools.claim_next().await?),
        Command::Complete { id } => print_json(&tools.complete(&id).await?),
        Command::Update {
            id,
            description,
            clear_due,
            fields,
        } => {
            let update = TaskUpdateInput {
                id,
                patch: TaskPatchInput {
                    description,
                    status: fields.status.clone(),
                    priority: fields.priority.clone(),
                    due: if clear_due {
                        Some(None)
                    } else {
                        fields.due.clone().map(Some)
                    },
                    tags: fields.tags(),
                    depends_on: fields.depends_on(),
                },
            };
            let result = tools.update_many(vec![update]).await?;
            if let Some(error) = result.updates.iter().find_map(|u| u.error.clone()) {
                anyhow::bail!(error);
            }
            print_json(&result)
        }
        Command::Related { id } => print_json(&tools.related(&id).await?),
        Command::Delete { id } => {
            let id = tools.delete(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!(?config, "configuration loaded");

    let store = StoreBuilder::from_config(&config)?
        .open()
        .await
        .context("failed to open task store")?;
    let tools = TaskTools::new(store.clone());

    let outcome = run(&tools, cli.command).await;
    store
        .shutdown()
        .await
        .with_context(|| format!("failed to save tasks to {}", store.location()))?;
    outcome
}
