//! Pensum CLI entry point.

use anyhow::Result;
use clap::Parser;
use pensum::cli::{commands, Cli, Commands};
use pensum::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pensum={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Ingest { dir, clear } => {
            commands::run_ingest(dir.as_deref(), *clear, settings).await?;
        }

        Commands::Ask { question, rounds } => {
            commands::run_ask(question, *rounds, settings).await?;
        }

        Commands::Chat { rounds } => {
            commands::run_chat(*rounds, settings).await?;
        }

        Commands::Search {
            query,
            course,
            lesson,
        } => {
            commands::run_search(query, course.as_deref(), *lesson, settings).await?;
        }

        Commands::Outline { course } => {
            commands::run_outline(course, settings).await?;
        }

        Commands::Courses => {
            commands::run_courses(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
