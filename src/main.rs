use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

use roster::model::Status;
use roster::mutation::Mutation;
use roster::store::{GithubConfig, GithubStore};

#[derive(Parser)]
#[command(name = "roster")]
#[command(
    about = "Administer a live-synchronized list hosted as a JSON document in a GitHub repository",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admin server with live push updates
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,

        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Fetch and print the hosted document
    Show,

    /// Append a new active entry
    Add { identifier: String },

    /// Remove every entry with this identifier
    Delete { identifier: String },

    /// Mark every entry with this identifier as blocked
    Block { identifier: String },

    /// Change an entry's identifier
    Rename {
        old_identifier: String,
        new_identifier: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roster=info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Arc::new(GithubStore::new(GithubConfig::from_env()?)?);

    match cli.command {
        Commands::Serve { port, bind } => {
            let addr: SocketAddr = format!("{bind}:{port}").parse()?;
            roster::server::start(addr, store).await?;
        }

        Commands::Show => show(&store).await?,

        Commands::Add { identifier } => mutate(&store, Mutation::Add { identifier }).await?,

        Commands::Delete { identifier } => mutate(&store, Mutation::Delete { identifier }).await?,

        Commands::Block { identifier } => mutate(&store, Mutation::Block { identifier }).await?,

        Commands::Rename {
            old_identifier,
            new_identifier,
        } => {
            mutate(&store, Mutation::Rename {
                old_identifier,
                new_identifier,
            })
            .await?
        }
    }

    Ok(())
}

async fn show(store: &GithubStore) -> Result<()> {
    let document = store.read().await?;

    println!("{}", "Roster".cyan().bold());
    println!("{}", "═".repeat(48).bright_black());

    for entry in document.entries() {
        let status = match entry.status {
            Status::Active => "active ".green(),
            Status::Blocked => "blocked".red(),
        };
        println!("{} {}", status.bold(), entry.identifier.bright_white());
    }

    println!(
        "{}",
        format!("{} entries", document.len()).bright_black()
    );

    Ok(())
}

/// One-shot read-transform-write against the store. The server path runs the
/// same transforms through the mutation engine; a CLI process has no push
/// subscribers, so there is nothing to broadcast here.
async fn mutate(store: &GithubStore, mutation: Mutation) -> Result<()> {
    let current = store.read().await?;
    let next = mutation.apply(&current);
    let revision = store.write(&next, &mutation.commit_message()).await?;

    println!(
        "{} {} {}",
        "✓".green(),
        mutation.commit_message(),
        format!("(revision {revision})").bright_black()
    );

    Ok(())
}
