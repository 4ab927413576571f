//! `quotesheet` - CLI for the quote-sheet editor
//!
//! This binary runs the quote server and provides command-line access to
//! rendering, validating and pushing quote documents.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use quotesheet::cli::{
    Cli, Command, ConfigCommand, PushCommand, RenderCommand, StatusCommand, ValidateCommand,
};
use quotesheet::render::{format_number, render_quote};
use quotesheet::{
    init_logging, server, Config, HttpTransport, Quote, SaveClient, SaveOutcome, SaveTransport,
    ServerStatus, StatusMonitor,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve(serve_cmd) => {
            serve_cmd.apply_to(&mut config);
            config.validate()?;
            runtime()?.block_on(server::serve(&config))?;
            Ok(())
        }
        Command::Render(render_cmd) => handle_render(&config, &render_cmd),
        Command::Validate(validate_cmd) => handle_validate(&config, &validate_cmd),
        Command::Push(push_cmd) => runtime()?.block_on(handle_push(&config, &push_cmd)),
        Command::Status(status_cmd) => runtime()?.block_on(handle_status(&config, &status_cmd)),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn read_quote(path: &Path) -> anyhow::Result<Quote> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Quote::from_json_slice(&bytes).with_context(|| format!("{} is not a quote", path.display()))
}

fn input_path(config: &Config, explicit: Option<&PathBuf>) -> PathBuf {
    explicit.cloned().unwrap_or_else(|| config.data_file())
}

fn handle_render(config: &Config, cmd: &RenderCommand) -> anyhow::Result<()> {
    let quote = read_quote(&input_path(config, cmd.input.as_ref()))?;
    let html = render_quote(&quote, &config.render);
    match &cmd.output {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn handle_validate(config: &Config, cmd: &ValidateCommand) -> anyhow::Result<()> {
    let path = input_path(config, cmd.file.as_ref());
    let quote = read_quote(&path)?;
    println!("{} is a valid quote", path.display());
    println!("  Groups: {}", quote.groups.len());
    println!("  Items:  {}", quote.item_count());
    for group in &quote.groups {
        println!("    {:<24} {}", group.label, format_number(group.subtotal()));
    }
    println!("  Total:  {}", format_number(quote.computed_total()));
    if let Some(stored) = quote.total {
        if (stored - quote.computed_total()).abs() > f64::EPSILON {
            println!(
                "  Stored total {} differs and will be replaced on save",
                format_number(stored)
            );
        }
    }
    Ok(())
}

async fn handle_push(config: &Config, cmd: &PushCommand) -> anyhow::Result<()> {
    let quote = read_quote(&cmd.file)?;
    let server_url = cmd.server.as_deref().unwrap_or(&config.client.server_url);
    let transport = HttpTransport::new(server_url, config.request_timeout())?;
    let admin_url = transport.admin_url();
    let client = SaveClient::new(transport, config.download_dir());

    let outcome = client.save(&quote).await?;
    println!("{}", outcome.message(&admin_url));
    if let SaveOutcome::Rejected { error } = outcome {
        bail!("server rejected the quote: {error}");
    }
    Ok(())
}

async fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(
        &config.client.server_url,
        config.request_timeout(),
    )?);
    let file_mode = transport.is_local_file();
    let admin_url = transport.admin_url();
    let report = |status: ServerStatus| -> anyhow::Result<()> {
        if cmd.json {
            let body = serde_json::json!({
                "server_url": config.client.server_url,
                "status": status,
                "admin_url": admin_url,
            });
            println!("{}", serde_json::to_string(&body)?);
        } else {
            println!("{}", status.describe(file_mode, &admin_url));
        }
        Ok(())
    };

    let (monitor, mut rx) = StatusMonitor::new(transport.clone(), config.poll_interval());
    if !cmd.watch {
        return report(monitor.check().await);
    }

    let handle = monitor.handle();
    let task = tokio::spawn(monitor.run());
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *rx.borrow_and_update();
                report(status)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.stop();
    task.await.context("status monitor panicked")?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_addr());
                println!(
                    "  Static directory:   {}",
                    config.server.static_dir.display()
                );
                println!("  Max body (bytes):   {}", config.server.max_body_bytes);
                println!();
                println!("[Storage]");
                println!("  Data file:          {}", config.data_file().display());
                println!();
                println!("[Client]");
                println!("  Server URL:         {}", config.client.server_url);
                println!("  Download dir:       {}", config.download_dir().display());
                println!("  Poll interval (ms): {}", config.client.poll_interval_ms);
                println!("  Timeout (ms):       {}", config.client.request_timeout_ms);
                println!();
                println!("[Render]");
                println!("  Language:           {}", config.render.lang);
                println!("  Direction:          {}", config.render.dir);
                println!("  Page title:         {}", config.render.page_title);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
