//! Ensemble CLI: run a supervised multi-specialist analysis pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ensemble::core::stage::Stage;
use ensemble::exit_codes;
use ensemble::io::config::{API_KEY_VAR, MissingApiKey, load_config, load_credentials};
use ensemble::io::input::collect_query;
use ensemble::io::llm::OpenAiChat;
use ensemble::logging;
use ensemble::run::{PipelineEvent, RunStop, run_pipeline};

#[derive(Parser)]
#[command(
    name = "ensemble",
    version,
    about = "Supervised multi-specialist analysis pipeline"
)]
struct Cli {
    /// Path to the pipeline config file (missing file means defaults).
    #[arg(long, value_name = "PATH", default_value = "ensemble.toml", global = true)]
    config: PathBuf,

    /// Directory for generated documents and run records.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one analysis for the given query.
    Run {
        /// Analysis query text.
        #[arg(long)]
        query: String,
    },
    /// Collect a query interactively, then run the analysis.
    Ask,
    /// Validate configuration and credentials.
    Check,
}

fn main() {
    logging::init();
    match execute() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            if err.downcast_ref::<MissingApiKey>().is_some() {
                print_key_setup();
                std::process::exit(exit_codes::INVALID_CONFIG);
            }
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn execute() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { ref query } => run_analysis(&cli, query),
        Command::Ask => {
            print_welcome();
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            match collect_query(&mut input, &mut out)? {
                Some(query) => run_analysis(&cli, &query),
                None => {
                    writeln!(out, "Goodbye.")?;
                    Ok(exit_codes::OK)
                }
            }
        }
        Command::Check => check(&cli.config),
    }
}

fn run_analysis(cli: &Cli, query: &str) -> Result<i32> {
    let config = load_config(&cli.config)?;
    let credentials = load_credentials()?;
    let client = OpenAiChat::new(credentials, &config)?;

    println!("Model: {}", client.model());
    println!("Query: {query}");
    println!();

    let outcome = run_pipeline(query, &config, &client, &cli.output, |event| match event {
        PipelineEvent::Routed(stage) => println!("-> {stage} stage"),
        PipelineEvent::StageCompleted { message, .. } => println!("   {message}"),
        PipelineEvent::DocumentsSaved { dir } => {
            println!("   Documents saved to {}", dir.display());
        }
    })?;

    println!();
    match outcome.stop {
        RunStop::Complete => println!("Analysis complete."),
        RunStop::Declared => println!("Analysis finished without a document pass."),
        RunStop::IterationCeiling => {
            println!("Analysis stopped: iteration ceiling reached.");
        }
    }

    if !outcome.state.summary.is_empty() {
        println!();
        println!("Comprehensive analysis:");
        println!("{}", outcome.state.summary);
    }

    println!();
    println!("Execution statistics:");
    println!("  Iterations: {}", outcome.iterations);
    println!("  Stages completed: {}", outcome.state.results.len());
    println!("  Documents generated: {}", outcome.state.documents.len());
    println!("  Run record: {}", outcome.record_path.display());

    Ok(exit_codes::OK)
}

fn check(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)
        .with_context(|| format!("config file {}", config_path.display()))?;
    println!("Config: max_iterations={}, temperature={}, max_tokens={}",
        config.max_iterations, config.temperature, config.max_tokens);

    match load_credentials() {
        Ok(credentials) => {
            println!("Credentials: model={}, base_url={}", credentials.model, credentials.base_url);
            println!("Configuration OK.");
            Ok(exit_codes::OK)
        }
        Err(err) if err.downcast_ref::<MissingApiKey>().is_some() => {
            eprintln!("{err:#}");
            print_key_setup();
            Ok(exit_codes::INVALID_CONFIG)
        }
        Err(err) => Err(err),
    }
}

fn print_key_setup() {
    eprintln!();
    eprintln!("Setup:");
    eprintln!("  1. export {API_KEY_VAR}=<your key>");
    eprintln!("  2. optionally export ENSEMBLE_MODEL and ENSEMBLE_BASE_URL");
}

fn print_welcome() {
    println!("Ensemble: supervised multi-specialist analysis");
    println!("==============================================");
    println!();
    println!("Stages:");
    for stage in Stage::ALL {
        println!("  - {stage}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_query() {
        let cli = Cli::parse_from(["ensemble", "run", "--query", "analyze solar adoption"]);
        match cli.command {
            Command::Run { query } => assert_eq!(query, "analyze solar adoption"),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["ensemble", "check"]);
        assert_eq!(cli.config, PathBuf::from("ensemble.toml"));
        assert_eq!(cli.output, PathBuf::from("."));
        assert!(matches!(cli.command, Command::Check));
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ensemble", "ask", "--output", "/tmp/out"]);
        assert_eq!(cli.output, PathBuf::from("/tmp/out"));
        assert!(matches!(cli.command, Command::Ask));
    }
}
