//! Aura Envelope - CLI
//!
//! Create rooms, log in with a passphrase and read/write sealed content in
//! a local JSON store.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use aura_envelope::{
    config::SchemeConfig, login, FileStore, NoDelivery, Passphrase, RoomDraft, RoomKeyError,
    RoomSession,
};

#[derive(Parser)]
#[command(name = "aura-envelope")]
#[command(version = aura_envelope::VERSION)]
#[command(about = "Aura - passphrase-unlocked encrypted chat rooms")]
struct Cli {
    /// Store file (overrides the config)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Scheme configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a room; prompts for each member's passphrase
    CreateRoom {
        /// Room name
        name: String,

        /// Member display name (repeat; the first is you)
        #[arg(short, long = "member", required = true)]
        members: Vec<String>,
    },

    /// Send a message
    Send {
        text: String,
    },

    /// Show the room history
    Read,

    /// Delete every message in the room
    Clear,

    /// Add an archive entry
    ArchiveAdd {
        content: String,

        /// Tag, e.g. Link, Photo, Note
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// List archive entries
    Archives,

    /// Remove an archive entry
    ArchiveRemove {
        id: Uuid,
    },

    /// Print the lookup fingerprint of a passphrase
    Fingerprint,

    /// Write a default configuration file
    InitConfig {
        path: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("AURA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<RoomKeyError>() {
            Some(inner) => {
                tracing::debug!(error = %inner, "command failed");
                eprintln!("Error: {}", inner.user_message());
            }
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn prompt_passphrase(prompt: &str) -> anyhow::Result<Passphrase> {
    let raw = rpassword::prompt_password(prompt).context("reading passphrase")?;
    Ok(Passphrase::new(raw)?)
}

fn unlock(store: &FileStore) -> anyhow::Result<RoomSession> {
    let passphrase = prompt_passphrase("Passphrase: ")?;
    Ok(login(store, &passphrase)?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SchemeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchemeConfig::default(),
    };

    if let Commands::InitConfig { path } = &cli.command {
        config.save(path)?;
        println!("Config written to: {}", path.display());
        return Ok(());
    }

    let store_path = match cli.store {
        Some(path) => path,
        None => config.store_path()?,
    };
    let store = FileStore::open(&store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;

    match cli.command {
        Commands::CreateRoom { name, members } => {
            let wrapper = config.wrapper()?;
            let mut draft = RoomDraft::new(name);
            for member in members {
                let passphrase = prompt_passphrase(&format!("Passphrase for {}: ", member))?;
                draft = draft.participant(member, passphrase);
            }
            let session = draft.create(&store, &wrapper)?;
            println!("Room created: {} ({})", session.room_name(), session.room_id());
            println!("Store: {}", store.path().display());
        }

        Commands::Send { text } => {
            let session = unlock(&store)?;
            let message = session.post_message(&store, &NoDelivery, &text)?;
            println!("Sent {}", message.id);
        }

        Commands::Read => {
            let session = unlock(&store)?;
            let history = session.history(&store)?;
            if history.is_empty() {
                println!("No messages in {}", session.room_name());
            }
            for (sender, text) in history {
                let marker = if sender == session.display_name() { ">" } else { " " };
                println!("{} {}: {}", marker, sender, text);
            }
        }

        Commands::Clear => {
            let session = unlock(&store)?;
            let removed = session.clear_history(&store)?;
            println!("Deleted {} messages", removed);
        }

        Commands::ArchiveAdd { content, tag } => {
            let session = unlock(&store)?;
            let item = session.add_archive(&store, &content, tag.as_deref())?;
            println!("Archived {} ({:?})", item.id, item.kind);
        }

        Commands::Archives => {
            let session = unlock(&store)?;
            let items = session.archives(&store)?;
            if items.is_empty() {
                println!("Archive is empty");
            }
            for (item, text) in items {
                println!(
                    "{} [{:?}] {} - {} ({})",
                    item.id,
                    item.kind,
                    item.created_by,
                    text,
                    item.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Commands::ArchiveRemove { id } => {
            let session = unlock(&store)?;
            if session.remove_archive(&store, id)? {
                println!("Removed {}", id);
            } else {
                println!("No archive entry {}", id);
            }
        }

        Commands::Fingerprint => {
            let passphrase = prompt_passphrase("Passphrase: ")?;
            println!("{}", passphrase.fingerprint());
        }

        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
