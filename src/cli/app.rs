//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{inspect, values};
use crate::domain::SavePolicy;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "datasaver")]
#[command(author, version, about = "Inspect and edit persisted values")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Storage root directory
    #[arg(long, global = true, env = "DATASAVER_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "DATASAVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the storage root
    Init {
        /// Also record the root in the config file
        #[arg(long)]
        save_config: bool,
    },

    /// Print the value stored under a key
    Get {
        key: String,

        /// Print the record bytes as is instead of parsing them as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Store a JSON value under a key
    Set {
        key: String,

        /// JSON text, e.g. `42`, `"dark"` or `[1, 2]`
        value: String,

        /// Store the value as a JSON string without parsing it
        #[arg(long)]
        string: bool,

        /// Save policy (immediate, on_dispose); defaults to the configured one
        #[arg(long)]
        policy: Option<SavePolicy>,
    },

    /// Remove the value stored under a key
    Rm {
        key: String,
    },

    /// List stored values
    Ls,

    /// Show the key derived from an owner type and property name
    Key {
        /// Owner type name, e.g. `app::Settings`
        #[arg(long)]
        owner: Option<String>,

        /// Property name
        name: String,
    },

    /// Show the resolved configuration
    Config,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format);

    tracing::debug!("datasaver starting");

    match cli.command {
        Commands::Init { save_config } => {
            let session = Session::open(cli.root, cli.config.as_deref())?;
            init(&session, &output, save_config, cli.config)?
        }

        Commands::Get { key, raw } => {
            let session = Session::open(cli.root, cli.config.as_deref())?;
            values::get(&session, &output, &key, raw)?
        }
        Commands::Set { key, value, string, policy } => {
            let session = Session::open(cli.root, cli.config.as_deref())?;
            values::set(&session, &output, &key, &value, string, policy)?
        }
        Commands::Rm { key } => {
            let session = Session::open(cli.root, cli.config.as_deref())?;
            values::remove(&session, &output, &key)?
        }
        Commands::Ls => {
            let session = Session::open(cli.root, cli.config.as_deref())?;
            values::list(&session, &output)?
        }

        Commands::Key { owner, name } => inspect::key(&output, owner.as_deref(), &name)?,
        Commands::Config => inspect::config(&output, cli.root, cli.config.as_deref())?,
    }

    tracing::debug!("command completed");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };

    // Logs go to stderr so stdout stays parseable
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();
}

fn init(session: &Session, output: &Output, save_config: bool, config_path: Option<PathBuf>) -> Result<()> {
    let root = session.root();
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create storage root: {}", root.display()))?;

    if save_config {
        let path = config_path
            .or_else(Config::config_path)
            .context("Could not determine the config file location")?;

        let config = Config {
            root: Some(root.to_path_buf()),
            ..session.config().clone()
        };
        config.save_to(&path)?;
        tracing::debug!(path = %path.display(), "config written");
    }

    output.success(&format!("Initialized storage root at {}", root.display()));
    Ok(())
}
