use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendboard::app::AppContext;
use trendboard::cli::{commands, Cli, Commands};
use trendboard::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    let ctx = AppContext::new(config, None)?;

    match cli.command {
        Commands::Sources { category } => {
            commands::list_sources(&ctx, category)?;
        }
        Commands::Fetch { category, source } => {
            commands::fetch_news(&ctx, category, source).await?;
        }
        Commands::Load { category } => {
            commands::load_news(&ctx, category).await?;
        }
        Commands::Refresh { category } => {
            commands::refresh_news(&ctx, category).await?;
        }
        Commands::Watch { category, interval } => {
            commands::watch_news(&ctx, category, interval).await?;
        }
        Commands::Status => {
            commands::show_status(&ctx)?;
        }
    }

    Ok(())
}
