//! Command-line interface for quotesheet.
//!
//! This module provides the CLI structure and command handlers for the
//! `quotesheet` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, PushCommand, RenderCommand, ServeCommand, StatusCommand, ValidateCommand,
};

/// quotesheet - Author and serve a price quote
///
/// Serves the quote sheet and its editor over HTTP, and pushes or renders
/// quote documents from the command line.
#[derive(Debug, Parser)]
#[command(name = "quotesheet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the quote server
    Serve(ServeCommand),

    /// Render a quote document to HTML
    Render(RenderCommand),

    /// Check that a quote document parses and report its totals
    Validate(ValidateCommand),

    /// Send a quote document to the server, downloading it if that fails
    Push(PushCommand),

    /// Check whether the server is reachable
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand {
                watch: false,
                json: false,
            }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "quotesheet");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;
        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_with_overrides() {
        let args = vec![
            "quotesheet",
            "serve",
            "--port",
            "8080",
            "--static-dir",
            "site",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Serve(serve) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, Some(8080));
        assert_eq!(serve.static_dir, Some(PathBuf::from("site")));
        assert_eq!(serve.host, None);
    }

    #[test]
    fn test_parse_push_requires_file() {
        assert!(Cli::try_parse_from(vec!["quotesheet", "push"]).is_err());
        let cli = Cli::try_parse_from(vec![
            "quotesheet",
            "push",
            "quote.json",
            "--server",
            "http://10.0.0.2:3000",
        ])
        .unwrap();
        let Command::Push(push) = cli.command else {
            panic!("expected push");
        };
        assert_eq!(push.file, PathBuf::from("quote.json"));
        assert_eq!(push.server.as_deref(), Some("http://10.0.0.2:3000"));
    }

    #[test]
    fn test_parse_render() {
        let cli =
            Cli::try_parse_from(vec!["quotesheet", "render", "-i", "in.json", "-o", "out.html"])
                .unwrap();
        let Command::Render(render) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(render.input, Some(PathBuf::from("in.json")));
        assert_eq!(render.output, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn test_parse_status_watch() {
        let cli = Cli::try_parse_from(vec!["quotesheet", "status", "--watch"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Status(StatusCommand {
                watch: true,
                json: false
            })
        ));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(vec!["quotesheet", "config", "validate", "-f", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["quotesheet", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(vec!["quotesheet", "-vv", "validate"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(vec!["quotesheet", "-q", "validate"]).unwrap();
        assert!(cli.quiet);
    }
}
