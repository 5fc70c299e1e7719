use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "trolley",
    version,
    about = "Run trolley-problem batteries against LLMs and score them against human votes"
)]
pub struct Cli {
    /// SQLite database (defaults to TROLLEY_DB or .trolley/trolley.db)
    #[arg(long, global = true, env = "TROLLEY_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample problem set
    Init(InitArgs),
    /// Load problems (and voice providers) into the database
    Import(ImportArgs),
    /// Start an evaluation run for one model
    Run(RunArgs),
    /// Evaluate missing problems for every RUNNING or COMPLETED run
    Backfill(BackfillArgs),
    /// Show runs, or one run in detail
    Status(StatusArgs),
    /// Recompute the stored alignment score of a run
    Rescore(RescoreArgs),
    /// Delete a run and its votes
    Delete(DeleteArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LlmBackend {
    Openai,
    /// Offline canned responses
    Fake,
}

#[derive(clap::Args, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "problems.yaml")]
    pub problems: PathBuf,
}

#[derive(clap::Args, Clone)]
pub struct ImportArgs {
    #[arg(long, default_value = "problems.yaml")]
    pub problems: PathBuf,
}

#[derive(clap::Args, Clone)]
pub struct RunArgs {
    /// Model identifier sent to the provider
    #[arg(long)]
    pub model: String,

    /// Human-readable name (defaults to the model id)
    #[arg(long)]
    pub name: Option<String>,

    /// low|medium|high
    #[arg(long)]
    pub effort: Option<String>,

    /// Voice provider id for audio narration
    #[arg(long)]
    pub provider_id: Option<String>,

    #[arg(long, value_enum, default_value = "openai")]
    pub llm: LlmBackend,

    /// Progress poll interval while waiting
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

#[derive(clap::Args, Clone)]
pub struct BackfillArgs {
    /// Only this problem (defaults to every problem)
    #[arg(long)]
    pub problem: Option<String>,

    #[arg(long, value_enum, default_value = "openai")]
    pub llm: LlmBackend,
}

#[derive(clap::Args, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub run: Option<i64>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Clone)]
pub struct RescoreArgs {
    #[arg(long)]
    pub run: i64,
}

#[derive(clap::Args, Clone)]
pub struct DeleteArgs {
    #[arg(long)]
    pub run: i64,
}
