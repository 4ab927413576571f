//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Serve command arguments.
#[derive(Debug, Default, Args)]
pub struct ServeCommand {
    /// Interface to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to serve static assets from
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Quote document to read and write
    #[arg(long, value_name = "FILE")]
    pub data_file: Option<PathBuf>,
}

impl ServeCommand {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            config.server.static_dir.clone_from(dir);
        }
        if let Some(file) = &self.data_file {
            config.storage.data_file = Some(file.clone());
        }
    }
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Quote document to render (defaults to the configured data file)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write the HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Validate command arguments.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Quote document to check (defaults to the configured data file)
    pub file: Option<PathBuf>,
}

/// Push command arguments.
#[derive(Debug, Args)]
pub struct PushCommand {
    /// Quote document to send
    pub file: PathBuf,

    /// Server base URL (overrides `client.server_url`)
    #[arg(short, long)]
    pub server: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Keep polling and report every change until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
