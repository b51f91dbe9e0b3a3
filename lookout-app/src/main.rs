//! # Lookout CLI (`lookout`)
//!
//! Console assistant that answers each question from a fresh web search:
//! the top Serper hits are fetched, reduced to short excerpts and handed to
//! an OpenAI chat model whose reply streams back to the terminal.
//!
//! ```bash
//! # interactive (type `salir` to leave)
//! lookout --config ./lookout.yaml
//!
//! # one question, then exit
//! lookout ask "¿Quién ganó el Tour de Francia 2024?"
//! ```
//!
//! Credentials come from `SERPER_API_KEY` and `OPENAI_API_KEY`, read after an
//! optional `.env` file in the working directory.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lookout_app::repl;
use lookout_app::session::{Session, SessionOptions};
use lookout_common::observability::{LogConfig, LogFormat, init_logging};
use lookout_config::{LookoutConfig, LookoutConfigLoader};
use lookout_llm::openai::OpenAiClient;
use lookout_web::fetch::HttpPageFetcher;
use lookout_web::serper::SerperApi;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(
    name = "lookout",
    version,
    about = "Web-search augmented chat assistant for the terminal"
)]
struct Cli {
    /// YAML configuration file; skipped when absent.
    #[arg(long, short, global = true, env = "LOOKOUT_CONFIG", default_value = "lookout.yaml")]
    config: PathBuf,

    /// Override the completion model.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log encoding: `text` or `json`.
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Mirror logs to stderr.
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default).
    Chat,
    /// Answer a single question and exit.
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = LookoutConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(model) = cli.model {
        cfg.llm.model = model;
    }
    if let Some(format) = cli.log_format {
        cfg.logging.format = format;
    }

    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr || cli.log_stderr,
        format: cfg.logging.format,
        ..LogConfig::default()
    })?;
    tracing::info!(log_file = %log_path.display(), model = %cfg.llm.model, "app.start");

    let mut session = build_session(&cfg, std::io::stdout())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let stdin = BufReader::new(tokio::io::stdin());
            repl::run(stdin, &mut session, &cfg.session.exit_command).await?;
        }
        Commands::Ask { query } => {
            writeln!(session.output_mut(), "{}", repl::SEARCHING)?;
            session.run_turn(&query.join(" ")).await?;
        }
    }

    tracing::info!(session_id = %session.id(), turns = session.history().len() / 2, "app.stop");
    Ok(())
}

fn build_session<W: Write>(cfg: &LookoutConfig, out: W) -> Result<Session<W>> {
    let search = SerperApi::with_endpoint(&cfg.search.endpoint, cfg.search_api_key().to_string())?
        .with_max_results(cfg.search.max_results);

    let fetcher = HttpPageFetcher::new(Duration::from_secs(cfg.session.fetch_timeout_secs))?;

    let mut chat = OpenAiClient::with_base_url(
        &cfg.llm.base_url,
        cfg.llm_api_key().to_string(),
        cfg.llm.model.clone(),
    )?;
    if let Some(secs) = cfg.llm.request_timeout_secs {
        chat = chat.with_timeout(Duration::from_secs(secs));
    }

    Ok(Session::new(
        Arc::new(search),
        Arc::new(fetcher),
        Arc::new(chat),
        SessionOptions::from(cfg),
        out,
    ))
}
