//! blobctl: thin CLI over the blobcas store.
//!
//! All storage semantics live in the library; this binary only parses
//! arguments, opens a store, and prints results.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blobcas::{BlobStore, ListQuery, StoreConfig, UploadOptions};

#[derive(Parser)]
#[command(name = "blobctl", about = "Content-addressable blob store CLI", version)]
struct Cli {
    /// Storage root (overrides config file and environment).
    #[arg(long, env = "BLOBCAS_PATH", global = true)]
    root: Option<PathBuf>,

    /// TOML config file with a [store] section.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and print its metadata record.
    Upload {
        /// File to upload.
        file: PathBuf,
        /// Tags to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// TTL hint in hours.
        #[arg(long)]
        ttl_hours: Option<u32>,
    },
    /// Print the metadata record for a blob.
    Info {
        /// Blob identifier (blob://...).
        id: String,
    },
    /// Write a blob's bytes to stdout.
    Cat { id: String },
    /// List blobs, optionally filtered.
    List {
        /// MIME filter: exact type/subtype or type/* wildcard.
        #[arg(long)]
        mime_type: Option<String>,
        /// Required tags (repeatable, AND semantics).
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Delete a blob (content and metadata together).
    Delete { id: String },
    /// Print the filesystem path of a blob's content.
    Path { id: String },
    /// Scan content against metadata and report (or repair) orphans.
    Fsck {
        /// Remove orphaned content, records, and stale dedup entries.
        #[arg(long)]
        repair: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(&cli)?;
    tracing::debug!(root = %store.config().storage_root.display(), "opened store");

    match cli.command {
        Command::Upload {
            file,
            tags,
            ttl_hours,
        } => {
            let data =
                fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let record = store.upload_with(&data, &filename, UploadOptions { tags, ttl_hours })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Info { id } => {
            let record = store.get_metadata(&id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Cat { id } => {
            use std::io::Write;
            let data = store.read(&id)?;
            std::io::stdout().write_all(&data)?;
        }
        Command::List {
            mime_type,
            tags,
            page,
            page_size,
        } => {
            let result = store.list(&ListQuery {
                mime_type,
                tags,
                page,
                page_size,
            })?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Delete { id } => {
            store.delete(&id)?;
            println!("deleted {id}");
        }
        Command::Path { id } => {
            println!("{}", store.resolve_path(&id)?.display());
        }
        Command::Fsck { repair } => {
            let report = store.reconcile(repair)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() && !report.repaired {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn open_store(cli: &Cli) -> Result<BlobStore> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::from_env(),
    };
    if let Some(root) = &cli.root {
        config.storage_root = root.clone();
    }
    Ok(BlobStore::new(config)?)
}
