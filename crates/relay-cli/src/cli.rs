use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relay", version, about = "Dispatch client actions and download reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/relay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the download directory
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log relay at trace level instead of debug (-v)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch an action given as JSON, e.g. '{"type": "...", "data": {...}}'
    Dispatch(DispatchArgs),

    /// Download a report
    Download(DownloadArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct DispatchArgs {
    /// Action JSON
    pub action: String,

    /// Drop navigation history before executing
    #[arg(long)]
    pub clear_breadcrumbs: bool,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Write the default config file if none exists yet
    #[arg(long)]
    pub init: bool,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Report model, e.g. stock.report
    #[arg(long)]
    pub model: String,

    /// Output format requested from the server
    #[arg(long, default_value = "xlsx")]
    pub output_format: String,

    /// Report options as a JSON object
    #[arg(long)]
    pub options: Option<String>,

    /// Record the report is run for
    #[arg(long)]
    pub record_id: Option<i64>,
}
