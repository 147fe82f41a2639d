//! hy3d: generate 3D models from a text prompt or a reference image.

mod commands;

use clap::{Parser, Subcommand};
use commands::config::ConfigCommands;
use hy3d_runtime::ConfigStore;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "hy3d")]
#[command(about = "Generate 3D models with the Hunyuan 3D API", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "HY3D_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a model from a text prompt
    Text {
        /// What to generate, e.g. "a red chair"
        prompt: String,
    },

    /// Generate a model from a PNG, JPEG or WEBP image (up to 5MB)
    Image {
        path: PathBuf,
    },

    /// View or change stored settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env is normal.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match cli.config {
        Some(path) => ConfigStore::at_path(path),
        None => ConfigStore::default_location()?,
    };

    match cli.command {
        Command::Text { prompt } => commands::generate::run_text(&store, prompt).await,
        Command::Image { path } => commands::generate::run_image(&store, &path).await,
        Command::Config(cmd) => {
            commands::config::run(&store, cmd)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
