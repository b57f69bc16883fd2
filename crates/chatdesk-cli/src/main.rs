mod app;
mod chat;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatdesk_core::ProviderType;
use clap::{Parser, Subcommand};

use crate::app::App;

#[derive(Parser)]
#[command(name = "chatdesk", version, about = "Chat with Gemini or DeepSeek from the terminal")]
struct Cli {
    /// Directory holding settings, conversations and API keys
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Provider to use instead of the configured one (gemini or deepseek)
    #[arg(long, global = true)]
    provider: Option<ProviderType>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// List conversations, most recent first
    List,
    /// Start a new conversation
    New,
    /// Print a conversation (the most recent one if no id is given)
    Show { id: Option<String> },
    /// Rename a conversation
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
    /// Store the API key of the active provider
    SetKey { key: String },
    /// Send one message to the most recent conversation and print the reply
    Send {
        message: String,
        /// Files to attach
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with chat output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => chatdesk_core::settings::default_data_dir()
            .context("Failed to determine data directory")?,
    };

    let mut app = App::open(&data_dir, cli.provider).context("Failed to open chat data")?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat::run(&mut app).await?,
        Command::List => app.print_list(),
        Command::New => {
            let id = app.store.lock().create_conversation();
            println!("{}", id);
        }
        Command::Show { id } => app.print_conversation(id.as_deref())?,
        Command::Rename { id, title } => {
            if !app.store.lock().update_title(&id, title) {
                anyhow::bail!("Conversation not found: {}", id);
            }
        }
        Command::Delete { id } => {
            if !app.store.lock().delete_conversation(&id) {
                anyhow::bail!("Conversation not found: {}", id);
            }
        }
        Command::SetKey { key } => {
            app.credentials
                .set_credential(&key)
                .context("API key must not be empty")?;
            println!("API key saved for {}", app.settings.provider.display_name());
        }
        Command::Send { message, attach } => {
            for path in &attach {
                app.attach_file(path)?;
            }
            app.composer.set_draft(message);
            let result = app.send().await;
            app.print_notifications();
            let reply = result?;
            println!("{}", reply);
        }
    }

    Ok(())
}
