//! `query-assist` — operator CLI for the completion engine.
//!
//! Subcommands exercise the pipeline one stage at a time (`context`,
//! `validate`, `complete`) or end to end against a catalog snapshot
//! (`suggest`). Stdout carries JSON only; logs go to stderr.

use anyhow::{Context as AnyhowContext, Result};
use assist_catalog::{Orchestrator, StaticCatalog};
use assist_grammar::Grammar;
use assist_protocol::{CompletionItem, ItemKind};
use assist_session::{apply_replacement, Phase, Session};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod config;

use config::AssistConfig;

#[derive(Parser)]
#[command(name = "query-assist")]
#[command(about = "Context-aware completion for metrics and logs queries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML file with engine tuning knobs
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GrammarArg {
    Metrics,
    Logs,
}

impl From<GrammarArg> for Grammar {
    fn from(arg: GrammarArg) -> Self {
        match arg {
            GrammarArg::Metrics => Grammar::Metrics,
            GrammarArg::Logs => Grammar::Logs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the grammatical slot under the cursor
    Context {
        /// Query text
        query: String,

        /// Cursor byte offset; defaults to end of query
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long, value_enum, default_value = "metrics")]
        grammar: GrammarArg,
    },

    /// Run one debounced suggestion round against a catalog snapshot
    Suggest {
        /// Query text
        query: String,

        /// Cursor byte offset; defaults to end of query
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long, value_enum, default_value = "metrics")]
        grammar: GrammarArg,

        /// JSON catalog snapshot to resolve candidates from
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Report non-blocking syntax warnings
    Validate {
        /// Query text
        query: String,

        #[arg(long, value_enum, default_value = "metrics")]
        grammar: GrammarArg,
    },

    /// Apply a selected suggestion and print the rewritten query
    Complete {
        /// Query text
        query: String,

        /// Cursor byte offset; defaults to end of query
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long, value_enum, default_value = "metrics")]
        grammar: GrammarArg,

        /// Text the selected suggestion inserts
        #[arg(long)]
        insert: String,

        /// Item kind of the selection (snake_case, e.g. `tag_key`)
        #[arg(long, default_value = "metric")]
        kind: String,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let config = AssistConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Context {
            query,
            cursor,
            grammar,
        } => {
            let offset = cursor.unwrap_or(query.len());
            let context = Grammar::from(grammar).parse(&query, offset);
            print_json(&context)
        }
        Commands::Suggest {
            query,
            cursor,
            grammar,
            catalog,
        } => {
            let offset = cursor.unwrap_or(query.len());
            run_suggest(Grammar::from(grammar), &query, offset, &catalog, &config).await
        }
        Commands::Validate { query, grammar } => {
            let warnings = Grammar::from(grammar).validate(&query);
            print_json(&json!({ "query": query, "warnings": warnings }))
        }
        Commands::Complete {
            query,
            cursor,
            grammar,
            insert,
            kind,
        } => {
            let offset = cursor.unwrap_or(query.len());
            let kind: ItemKind = serde_json::from_value(serde_json::Value::String(kind.clone()))
                .with_context(|| format!("unknown item kind `{kind}`"))?;
            let context = Grammar::from(grammar).parse(&query, offset);
            let item = CompletionItem::new(insert.clone(), kind).insert_text(insert);
            let replacement = apply_replacement(&query, offset, &item, &context);
            print_json(&replacement)
        }
        Commands::Config => print_json(&config),
    }
}

/// Drive a full session round: debounce, fetch, rank, group.
async fn run_suggest(
    grammar: Grammar,
    query: &str,
    offset: usize,
    catalog: &std::path::Path,
    config: &AssistConfig,
) -> Result<()> {
    let catalog = StaticCatalog::from_path(catalog)
        .with_context(|| format!("cannot load catalog {}", catalog.display()))?;
    let orchestrator = Arc::new(Orchestrator::new(Arc::new(catalog), config.orchestrator()));
    let mut handle = Session::spawn(grammar, orchestrator, config.session());

    handle.text_changed(query, offset);
    let state = tokio::time::timeout(Duration::from_secs(15), async {
        // Any post-keystroke publication of Idle is the empty-round
        // terminal state; intermediate phases keep waiting.
        loop {
            let state = handle.changed().await;
            match state.phase {
                Phase::Open | Phase::ErrorShown | Phase::Idle => return state,
                Phase::PendingDebounce | Phase::Loading => {}
            }
        }
    })
    .await
    .context("timed out waiting for the suggestion round")?;

    print_json(&json!({
        "context": grammar.parse(query, offset),
        "groups": state.groups,
        "error": state.error,
        "validation_warning": state.validation_warning,
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}
