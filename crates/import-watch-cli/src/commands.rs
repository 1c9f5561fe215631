use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "import-watch")]
#[command(about = "Import newly arrived files into the asset service as their owners", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import new files and annotate their containers
    Run(WindowArgs),
    /// List what `run` would do without contacting the service
    Scan(WindowArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct WindowArgs {
    /// Override the trailing window, in hours
    #[arg(long)]
    pub window_hours: Option<f64>,
}
