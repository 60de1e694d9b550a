mod app;
mod commands;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use haven::config::Config;
use haven::logging;

#[derive(Parser, Debug)]
#[command(name = "haven")]
#[command(about = "Browse, favorite and manage rental listings from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/haven/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let app = app::App::new(&config)?;
  app.run(args.command).await?;

  Ok(())
}
