use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `llm-guard` - Discord report escalation with an LLM moderation judge.
#[derive(Parser, Debug)]
#[command(name = "llm-guard")]
#[command(version)]
#[command(about = "Judge Discord reports with an LLM and ban, dismiss or escalate.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.llm-guard/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Connect to Discord and handle reports until Ctrl-C
    Run,

    /// Show the most recent reports
    Reports {
        /// Number of reports to show
        #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=200))]
        limit: u32,
    },

    /// Show bot liveness and database connectivity
    Status,
}
