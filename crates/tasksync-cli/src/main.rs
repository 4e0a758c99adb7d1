use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tasksync_core::tracing_setup::init_tracing;
use tasksync_core::{Entity, EntityDraft, EntityPatch, HttpGateway, SyncClient, SyncConfig};

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(about = "Task list client backed by a remote document store")]
struct Cli {
    /// Base URL of the document store
    #[arg(long, default_value = "http://localhost:8787")]
    url: String,

    /// Collection (object type) to sync
    #[arg(long, default_value = "tasks")]
    collection: String,

    /// Bearer token for the store
    #[arg(long)]
    token: Option<String>,

    /// Restrict to one list
    #[arg(long)]
    list: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current task snapshot
    List,

    /// Add a task
    Add {
        title: String,
        /// Place the task in a list
        #[arg(long)]
        list: Option<String>,
    },

    /// Toggle a task's done flag
    Done {
        /// Durable task id
        id: String,
    },

    /// Rename a task
    Rename {
        id: String,
        title: String,
    },

    /// Delete a task
    Rm {
        id: String,
    },

    /// Poll for changes and print the snapshot whenever it moves
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

fn print_snapshot(entities: &[Entity]) {
    if entities.is_empty() {
        println!("(no tasks)");
        return;
    }
    for entity in entities {
        let mark = if entity.done { "x" } else { " " };
        let list = entity
            .list_id
            .as_deref()
            .map(|l| format!("  [{}]", l))
            .unwrap_or_default();
        println!("[{}] {}  {}{}", mark, entity.id, entity.title, list);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut gateway = HttpGateway::new(&cli.url, &cli.collection);
    if let Some(token) = &cli.token {
        gateway = gateway.with_token(token);
    }

    let config = SyncConfig {
        poll_interval: match &cli.command {
            Commands::Watch { interval_secs } => Duration::from_secs((*interval_secs).max(1)),
            _ => SyncConfig::default().poll_interval,
        },
        list_filter: cli.list.clone(),
        ..Default::default()
    };
    let client = SyncClient::new(Arc::new(gateway), config);

    client
        .refresh()
        .await
        .with_context(|| format!("failed to fetch tasks from {}", cli.url))?;

    match cli.command {
        Commands::List => {
            print_snapshot(&client.snapshot());
        }
        Commands::Add { title, list } => {
            let draft = EntityDraft {
                title,
                list_id: list,
                position: None,
            };
            let created = client.create(draft).await.context("create failed")?;
            println!("created {}", created.id);
        }
        Commands::Done { id } => {
            let updated = client
                .toggle_done(&id)
                .await
                .with_context(|| format!("toggle failed for {}", id))?;
            println!("{} done={}", updated.id, updated.done);
        }
        Commands::Rename { id, title } => {
            let patch = EntityPatch {
                title: Some(title),
                ..Default::default()
            };
            let updated = client
                .update(&id, patch)
                .await
                .with_context(|| format!("rename failed for {}", id))?;
            println!("{} renamed to {:?}", updated.id, updated.title);
        }
        Commands::Rm { id } => {
            client
                .delete(&id)
                .await
                .with_context(|| format!("delete failed for {}", id))?;
            println!("deleted {}", id);
        }
        Commands::Watch { .. } => {
            let mut changes = client.subscribe();
            print_snapshot(&client.snapshot());
            client.start_polling();
            tracing::info!("watching for changes, ctrl-c to exit");
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        println!("---");
                        print_snapshot(&client.snapshot());
                    }
                    _ = tokio::signal::ctrl_c() => {
                        client.stop_polling();
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
