mod batch;
mod chat;
mod columns;
mod converters;
mod prune;
mod reply;
mod stats;
mod types;
mod workbook;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use chat::client::ChatClient;
use chat::config::{ChatConfig, DEFAULT_PRESET};
use converters::alpaca::AlpacaConverter;
use converters::sharegpt::ShareGptConverter;
use types::{Persona, DEFAULT_PERSONA};

const DEFAULT_INPUT_DIR: &str = "avatar training data";

/// Fine-tuning data preparation for a chat persona.
/// Converts exported chat-log workbooks into Alpaca or ShareGPT datasets,
/// prunes tiny logs, and talks to the fine-tuned model.
#[derive(Parser)]
#[command(name = "persona-dataset")]
#[command(version)]
#[command(about = "Chat-log workbooks to persona fine-tuning datasets")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert workbooks into Alpaca instruction/response records
    Alpaca {
        /// Directory of chat-log workbooks
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input_dir: PathBuf,

        /// Output JSON file
        #[arg(long, default_value = "alpaca_formatted_data.json")]
        output: PathBuf,

        /// Persona name whose rows have a blank speaker
        #[arg(long, default_value = DEFAULT_PERSONA)]
        persona: String,
    },
    /// Convert workbooks into ShareGPT multi-turn conversations
    #[command(name = "sharegpt")]
    ShareGpt {
        /// Directory of chat-log workbooks
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input_dir: PathBuf,

        /// Output JSON file
        #[arg(long, default_value = "all_conversations_sharegpt.json")]
        output: PathBuf,

        /// Persona name whose rows have a blank or matching speaker
        #[arg(long, default_value = DEFAULT_PERSONA)]
        persona: String,
    },
    /// Delete workbooks with too few rows to be useful
    Prune {
        /// Directory of chat-log workbooks
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input_dir: PathBuf,

        /// Minimum number of data rows to keep a workbook
        #[arg(long, default_value_t = prune::DEFAULT_MIN_ROWS)]
        min_rows: usize,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Print statistics for a produced dataset file
    Stats {
        /// Path to the JSON dataset file
        #[arg(long)]
        input: PathBuf,
    },
    /// Send one prompt to the fine-tuned model
    Ask {
        /// Model preset
        #[arg(long, default_value = DEFAULT_PRESET)]
        model: String,

        /// Persona name used in the system prompt
        #[arg(long, default_value = DEFAULT_PERSONA)]
        persona: String,

        prompt: String,
    },
    /// Chat with the fine-tuned model in the terminal
    Chat {
        /// Model preset
        #[arg(long, default_value = DEFAULT_PRESET)]
        model: String,

        /// Persona name used in the system prompt
        #[arg(long, default_value = DEFAULT_PERSONA)]
        persona: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Alpaca {
            input_dir,
            output,
            persona,
        } => {
            let converter = AlpacaConverter::new(&Persona::new(persona));
            batch::run(&converter, &input_dir, &output)?;
            Ok(())
        }
        Commands::ShareGpt {
            input_dir,
            output,
            persona,
        } => {
            let converter = ShareGptConverter::new(&Persona::new(persona));
            batch::run(&converter, &input_dir, &output)?;
            Ok(())
        }
        Commands::Prune {
            input_dir,
            min_rows,
            dry_run,
        } => {
            prune::prune(&input_dir, min_rows, dry_run)?;
            Ok(())
        }
        Commands::Stats { input } => run_stats(&input),
        Commands::Ask {
            model,
            persona,
            prompt,
        } => run_ask(&model, &Persona::new(persona), &prompt),
        Commands::Chat { model, persona } => run_chat(&model, &Persona::new(persona)),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_stats(input: &Path) -> Result<()> {
    let stats = stats::file_stats(input)?;
    stats::print_stats(&stats);
    Ok(())
}

fn run_ask(model: &str, persona: &Persona, prompt: &str) -> Result<()> {
    let config = ChatConfig::from_env()?;
    let preset = config.preset(model)?;
    let client = ChatClient::new(&config).context("creating HTTP client")?;

    let stdout = std::io::stdout();
    chat::ask(&client, preset, &persona.instruction(), prompt, &mut stdout.lock())
}

fn run_chat(model: &str, persona: &Persona) -> Result<()> {
    let config = ChatConfig::from_env()?;
    let client = ChatClient::new(&config).context("creating HTTP client")?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    chat::repl(
        &client,
        &config,
        model,
        &persona.instruction(),
        stdin.lock(),
        &mut stdout.lock(),
    )?;
    Ok(())
}
