use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use timelinetui::post::Locale;
use timelinetui::{App, Config};

#[derive(Parser, Debug)]
#[command(name = "timelinetui")]
#[command(version = timelinetui::VERSION)]
#[command(about = "Read the public timeline of a Mastodon-compatible instance in your terminal")]
struct Cli {
    /// Path to a config file (default: <config dir>/timelinetui/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the instance, e.g. https://mastodon.social
    #[arg(short, long)]
    instance: Option<String>,

    /// Language used for relative times and notifications
    #[arg(short, long, value_enum)]
    locale: Option<Locale>,

    /// File that receives log output
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    // The terminal is in raw mode while the UI runs, so logs never go to stderr.
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }

    builder.try_init().context("Failed to initialize logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(instance) = cli.instance {
        config.instance_url = instance;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }

    init_logging(config.log_path().as_deref())?;
    log::info!("timelinetui {} starting", timelinetui::VERSION);

    let mut app = App::new(config);
    app.run().await
}
