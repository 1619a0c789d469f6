//! CLI entry point for legal-eaze

mod tui;
mod welcome;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input};
use legal_eaze_chat::{open_session, ChatService, IgnoreReason, SendOutcome};
use legal_eaze_core::config::{Config, ConfigLoader};
use legal_eaze_core::logging::{init_logging, LogOutput};
use legal_eaze_core::session::{Role, SessionStore};
use legal_eaze_core::utils::expand_tilde;
use legal_eaze_transport::AskBotClient;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "legal-eaze")]
#[command(about = "AI legal research assistant chat client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file interactively
    Onboard,
    /// Launch the interactive chat
    Tui,
    /// Manage stored chats
    Chats {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Ask a question and print the reply
    Ask {
        /// Question to ask
        question: String,
        /// Chat to continue; a new chat is created when omitted
        #[arg(long)]
        chat: Option<String>,
    },
    /// Show configuration and storage status
    Status,
}

#[derive(Subcommand)]
enum ChatCommands {
    /// List chats
    List,
    /// Create an empty chat
    New,
    /// Delete a chat
    Delete { id: String },
    /// Print a chat's messages
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Onboard = cli.command {
        return run_onboard(&config_loader);
    }

    let config = config_loader.load()?;
    let output = match cli.command {
        Commands::Tui => LogOutput::FileOnly,
        _ => LogOutput::Console,
    };
    let _log_guard = init_logging(&config.logging, output);

    match cli.command {
        Commands::Onboard => {}
        Commands::Tui => {
            info!("Starting TUI");
            let service = build_service(&config);
            tui::run_tui(service, config.transport.url()).await?;
        }
        Commands::Chats { command } => {
            let mut session = open_session(&config.storage);
            match command {
                ChatCommands::List => run_chats_list(&session),
                ChatCommands::New => {
                    let id = session.create_conversation();
                    println!("{}", id);
                }
                ChatCommands::Delete { id } => {
                    if session.delete_conversation(&id) {
                        println!("Deleted {}", id);
                    } else {
                        anyhow::bail!("No chat with id {}", id);
                    }
                }
                ChatCommands::Show { id } => run_chats_show(&session, &id)?,
            }
        }
        Commands::Ask { question, chat } => {
            run_ask(&config, question, chat).await?;
        }
        Commands::Status => run_status(&config_loader, &config),
    }

    Ok(())
}

fn build_service(config: &Config) -> ChatService {
    let session = Arc::new(Mutex::new(open_session(&config.storage)));
    let transport = Arc::new(AskBotClient::from_config(&config.transport));
    ChatService::new(session, transport)
}

/// Run the onboard wizard
fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to Legal-Eaze!").bold().yellow());
    println!("Let's point the client at your answering service.\n");

    if loader.config_path().exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();
    config.transport.endpoint = Input::new()
        .with_prompt("Answering service URL")
        .default(config.transport.endpoint.clone())
        .interact_text()?;
    config.transport.timeout_secs = Input::new()
        .with_prompt("Request timeout in seconds (0 waits forever)")
        .default(config.transport.timeout_secs)
        .interact_text()?;

    legal_eaze_core::config::validate::validate_config(&config)?;
    loader.save(&config)?;
    println!(
        "{} {}",
        style("Saved").green(),
        loader.config_path().display()
    );
    Ok(())
}

fn run_chats_list(session: &SessionStore) {
    if session.is_empty() {
        println!("No chats yet. Create one with `legal-eaze chats new`.");
        return;
    }
    for conversation in session.conversations() {
        println!(
            "{}  {}  ({} messages)",
            style(&conversation.id).dim(),
            conversation.name,
            conversation.messages.len()
        );
    }
}

fn run_chats_show(session: &SessionStore, id: &str) -> Result<()> {
    let conversation = session
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("No chat with id {}", id))?;

    println!("{}", style(&conversation.name).bold().yellow());
    for message in &conversation.messages {
        let label = match message.role {
            Role::User => style("you").yellow().bold(),
            Role::Assistant => style("assistant").cyan().bold(),
        };
        println!("{}: {}", label, message.content);
    }
    Ok(())
}

async fn run_ask(config: &Config, question: String, chat: Option<String>) -> Result<()> {
    let service = build_service(config);
    let conversation_id = match chat {
        Some(id) => id,
        None => service.session().lock().create_conversation(),
    };

    match service.send_to(&conversation_id, &question).await {
        SendOutcome::Replied { reply, .. } => {
            println!("{}", reply);
            Ok(())
        }
        SendOutcome::Failed { detail, .. } => {
            warn!("Ask failed: {}", detail);
            anyhow::bail!("No reply: {}", detail)
        }
        SendOutcome::Dropped { conversation_id } => {
            anyhow::bail!("Chat {} was deleted before the reply arrived", conversation_id)
        }
        SendOutcome::Ignored(IgnoreReason::UnknownConversation) => {
            anyhow::bail!("No chat with id {}", conversation_id)
        }
        SendOutcome::Ignored(reason) => anyhow::bail!("Nothing sent: {:?}", reason),
    }
}

/// Show configuration and storage status
fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("Legal-Eaze Status").bold().yellow());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!("  Endpoint: {}", config.transport.url());
    let timeout = if config.transport.timeout_secs == 0 {
        "none".to_string()
    } else {
        format!("{}s", config.transport.timeout_secs)
    };
    println!("  Timeout: {}", timeout);
    println!();

    println!("{}", style("Storage:").bold());
    let dir = expand_tilde(&config.storage.dir);
    println!("  Origin directory: {}", dir.display());
    println!("  Key: {}", config.storage.key);
    let session = open_session(&config.storage);
    println!("  Chats: {}", session.len());
    let messages: usize = session
        .conversations()
        .iter()
        .map(|c| c.messages.len())
        .sum();
    println!("  Messages: {}", messages);
    println!(
        "  Checked at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}
