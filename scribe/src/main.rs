//! Guardrailed blog writer.
//!
//! Asks one LLM agent (with web search) for a short blog post, retries until
//! the post passes the word-limit guardrail or the attempt budget is spent,
//! and prints the result as styled Markdown.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use tracing::info;

use scribe::app::{build_agent, write_post};
use scribe::core::types::ExhaustionPolicy;
use scribe::exit_codes;
use scribe::io::config::{Credentials, DEFAULT_CONFIG_PATH, ScribeConfig, load_config};
use scribe::logging;
use scribe::render::configure_color;
use scribe::runner::BudgetExhaustedError;
use scribe::task::TaskInput;

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    version,
    about = "Write a short blog post with an LLM agent, retrying until it passes the guardrails",
    after_help = "Logs go to stderr. Set RUST_LOG=scribe=info to see per-attempt word counts."
)]
struct Cli {
    /// Subject of the blog post.
    #[arg(short, long, default_value = "Climate Change")]
    topic: String,

    /// Year the post is written for (defaults to the current year).
    #[arg(short, long)]
    year: Option<i32>,

    /// Path to the TOML config file. Defaults apply when it is missing.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override `task.max_attempts`.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Fail with a non-zero exit code when every attempt is rejected.
    #[arg(long)]
    strict: bool,

    /// Do not offer the web search tool to the agent.
    #[arg(long)]
    no_search: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ScribeConfig) -> Result<()> {
        if let Some(max_attempts) = self.max_attempts {
            config.task.max_attempts = max_attempts;
        }
        if self.strict {
            config.task.exhaustion_policy = ExhaustionPolicy::Strict;
        }
        if self.no_search {
            config.search.enabled = false;
        }
        config.validate()
    }

    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| chrono::Local::now().year())
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            if let Some(exhausted) = err.downcast_ref::<BudgetExhaustedError>() {
                eprintln!("{exhausted}");
                exit_codes::EXHAUSTED
            } else {
                eprintln!("{:#}", err);
                exit_codes::FAILED
            }
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let credentials = Credentials::from_env();
    let mut config = load_config(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    cli.apply_overrides(&mut config)?;
    configure_color(config.render.force_color);

    let input = TaskInput::topic_year(cli.topic.clone(), cli.year());
    info!(topic = %cli.topic, year = cli.year(), "starting run");

    let agent = build_agent(&config, &credentials)?;
    let summary = write_post(&config, &agent, &input, &mut io::stdout().lock())?;
    info!(
        attempts = summary.result.attempts,
        accepted = summary.result.accepted,
        render = ?summary.render,
        "run finished"
    );
    Ok(())
}
