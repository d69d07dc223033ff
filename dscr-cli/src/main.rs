use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use dscr_cli::app::{self, SessionRequest};
use dscr_cli::logging;
use dscr_cli::output::{self, OutputFormat};
use dscr_cli::settings::{Overrides, Settings};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Debt service coverage ratio calculator.
///
/// Loads rate defaults and DSCR messages from the configured backend,
/// imports an optional shareable-link query, applies field edits and
/// prints the result or a new shareable link.
#[derive(Debug, Parser)]
#[command(name = "dscr", version)]
struct Cli {
    /// TOML settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Defaults backend (`builtin` or `file`).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Backend location; a directory for the `file` backend.
    #[arg(long, global = true)]
    defaults: Option<String>,

    /// Log filter, e.g. `debug` or `dscr_core=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate the DSCR and print the report.
    Calculate(SessionArgs),

    /// Print a shareable link for the resulting inputs.
    Share {
        #[command(flatten)]
        session: SessionArgs,

        /// Page the link points at; replaces `[share] base_url`.
        #[arg(long)]
        base_url: Option<String>,

        /// Also calculate and print the report.
        #[arg(long)]
        with_result: bool,
    },
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Shareable-link query string or full link to start from.
    #[arg(long)]
    query: Option<String>,

    /// Field edit as `key=value`, applied in order. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = app::parse_assignment)]
    edits: Vec<(String, String)>,
}

impl SessionArgs {
    fn into_request(self) -> SessionRequest {
        SessionRequest {
            query: self.query,
            edits: self.edits,
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_default_logging();

    let cli = Cli::parse();

    let base_url = match &cli.command {
        Command::Share { base_url, .. } => base_url.clone(),
        Command::Calculate(_) => None,
    };
    let settings = Settings::load_optional(cli.config.as_deref())
        .context("cannot load settings")?
        .with_overrides(Overrides {
            backend: cli.backend,
            location: cli.defaults,
            base_url,
            log_level: cli.log_level,
            log_file: cli.log_file,
        });

    if std::env::var_os("RUST_LOG").is_none() {
        logging::set_log_level(&settings.logging.level)?;
    }
    if let Some(path) = &settings.logging.file {
        logging::enable_file_logging(path)?;
    }
    debug!(?settings, "settings resolved");

    let registry = app::build_registry();
    let source = settings.defaults_source();

    match cli.command {
        Command::Calculate(args) => {
            let request = args.into_request();
            let mut session = app::prepare_session(&registry, &source, &request).await?;
            let result = session.calculate().clone();
            info!(
                dscr = %result.dscr_value,
                severity = result.message_severity.as_str(),
                "calculated"
            );
            println!("{}", output::render(cli.format, &session, &result)?);
        }
        Command::Share {
            session: args,
            with_result,
            ..
        } => {
            let request = args.into_request();
            let mut session = app::prepare_session(&registry, &source, &request).await?;
            let result = with_result.then(|| session.calculate().clone());
            session.share(&settings.share.base_url);

            match result {
                Some(result) => println!("{}", output::render(cli.format, &session, &result)?),
                None => {
                    if let Some(link) = session.shareable_link() {
                        println!("{link}");
                    }
                }
            }
        }
    }

    Ok(())
}
