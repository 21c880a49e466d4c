//! ticketq - console front-end for the priority-aware service desk

mod menu;
mod render;
mod script;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ticketq_core::application::constants::DEFAULT_LOG_FILTER;
use ticketq_core::application::ServiceDesk;

#[derive(Parser)]
#[command(name = "ticketq")]
#[command(about = "Priority-aware ticket queue for a service desk", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log output format (logs go to stderr)
    #[arg(long, env = "TICKETQ_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Disable coloured output
    #[arg(long, env = "TICKETQ_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (default)
    Interactive,

    /// Run a command script against a fresh queue
    Run {
        /// Script file, one command per line
        #[arg(short, long)]
        script: PathBuf,

        /// Print the final queue as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        // Production: JSON structured logging
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .init(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("ticketq v{} starting", ticketq_core::VERSION);
    let desk = ServiceDesk::new();

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            menu::Menu::new(&desk, stdin.lock(), stdout.lock()).run()?;
        }

        Commands::Run { script, json } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let commands = script::parse_script(&source)?;
            info!(path = %script.display(), commands = commands.len(), "Running script");

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            if !json {
                script::execute(&desk, &commands, &mut out)?;
            } else {
                script::execute(&desk, &commands, &mut io::sink())?;
            }
            script::write_summary(&desk, json, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}
