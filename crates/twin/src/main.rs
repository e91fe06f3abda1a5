//! Twin: personal digital-twin assistant
//!
//! Main binary with subcommands:
//! - `chat`: interactive request loop (default)
//! - `ask`: answer a single request and exit
//! - `history`: print the stored conversation for a lookup key

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twin_agent::Config;
use twin_store::LookupKey;

mod app;
mod history;
mod repl;

use app::{Settings, Twin};

#[derive(Parser)]
#[command(name = "twin")]
#[command(about = "Personal digital-twin assistant", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "TWIN_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    /// SQLite file mapping lookup keys to threads
    #[arg(long, env = "TWIN_THREADS_DB", global = true)]
    threads_db: Option<PathBuf>,

    /// Conversation to continue
    #[arg(long, default_value = "111", global = true)]
    lookup_key: String,

    /// Existing assistant to use (overrides the configuration file)
    #[arg(long, env = "TWIN_ASSISTANT_ID", global = true)]
    assistant_id: Option<String>,

    /// Knowledge file to attach when a new assistant is created (repeatable)
    #[arg(long = "file", global = true)]
    files: Vec<PathBuf>,

    /// Longest wait between run status checks, in seconds
    #[arg(long, default_value = "5", global = true)]
    poll_max_interval_secs: u64,

    /// Give up on a run after this many seconds
    #[arg(long, default_value = "900", global = true)]
    poll_timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read requests interactively until 'exit'
    Chat,

    /// Process one request and print the reply
    Ask {
        /// Request text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Print the conversation stored for the lookup key
    History,
}

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "twin=info,twin_agent=info,twin_openai=info,twin_store=info,twin_calendar=info";

fn default_threads_db() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("twin/threads.db"))
        .unwrap_or_else(|| PathBuf::from("threads.db"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    let threads_db = cli.threads_db.unwrap_or_else(default_threads_db);
    if let Some(parent) = threads_db.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| miette::miette!("failed to create {}: {}", parent.display(), e))?;
    }

    let settings = Settings {
        threads_db,
        lookup_key: LookupKey::from(cli.lookup_key),
        assistant_id: cli.assistant_id,
        files: cli.files,
        poll_max_interval: Duration::from_secs(cli.poll_max_interval_secs.max(1)),
        poll_timeout: Duration::from_secs(cli.poll_timeout_secs),
    };

    let twin = Twin::new(&config, &settings)
        .map_err(|e| miette::miette!("failed to open thread store: {}", e))?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            repl::run(&twin, stdin, &mut stdout)
                .await
                .map_err(|e| miette::miette!("{}", e))?;
        }
        Commands::Ask { text } => {
            let text = text.join(" ");
            match repl::ask(&twin, &text)
                .await
                .map_err(|e| miette::miette!("thread store failed: {}", e))?
            {
                Some(reply) => println!("Assistant: {reply}"),
                None => return Err(miette::miette!("request failed; see the log for details")),
            }
        }
        Commands::History => {
            let messages = twin
                .history()
                .await
                .map_err(|e| miette::miette!("{}", e))?;
            match messages {
                Some(messages) => {
                    for message in &messages {
                        println!("{}", history::format_message(message, twin.timezone()));
                    }
                }
                None => println!("{}", history::not_found(twin.key())),
            }
        }
    }

    Ok(())
}
