//! Sift - spam triage for a Gmail inbox
//!
//! Fetches the most recent messages, short-circuits the obvious ones with
//! local rules and asks a chat-completions model about the rest.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use triage::{GmailAuth, GmailCredentials, Settings};

mod app;
mod server;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Classify recent Gmail messages as spam or not spam")]
struct Cli {
    /// Keep the activity log in memory instead of the SQLite database
    #[arg(long, global = true)]
    no_db: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve classification results over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
    /// Classify the most recent messages once and print the results
    Classify {
        /// Number of messages to fetch (overrides SIFT_FETCH_LIMIT)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show the most recent activity log entries
    Log {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Authorize Gmail access and save the token
    Login {
        /// OAuth client secrets downloaded from Google Cloud Console
        #[arg(long, value_name = "FILE")]
        client_secrets: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        warn!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve { bind } => {
            let triage = app::build_triage(&settings, cli.no_db)?;
            server::serve(triage, bind).await
        }
        Commands::Classify { limit } => {
            let triage = app::build_triage(&settings, cli.no_db)?;
            let triage = match limit {
                Some(limit) => triage.with_options(triage::TriageOptions { limit }),
                None => triage,
            };

            let results = tokio::task::spawn_blocking(move || triage.fetch_and_classify_recent())
                .await
                .context("Classification task panicked")??;

            let output = serde_json::json!({ "classified_emails": results });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Log { limit } => {
            let log = app::open_activity_log(&settings, cli.no_db)?;
            for entry in log.recent(limit)?.iter().rev() {
                println!(
                    "{} [{}] {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.id,
                    entry.message
                );
            }
            Ok(())
        }
        Commands::Login { client_secrets } => {
            let credentials = match client_secrets {
                Some(path) => GmailCredentials::from_file(&path)?,
                None => GmailCredentials::load()?,
            };
            let token_path = settings.token_path.clone();

            let auth = tokio::task::spawn_blocking(move || {
                GmailAuth::login(&credentials, token_path)
            })
            .await
            .context("Login task panicked")??;

            info!("Saved Gmail token to {}", auth.token_path().display());
            Ok(())
        }
    }
}
