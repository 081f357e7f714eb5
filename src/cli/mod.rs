pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Category;

#[derive(Parser)]
#[command(name = "trendboard")]
#[command(about = "Trending news from many sources in one list", long_about = None)]
pub struct Cli {
    /// Number of sources fetched at once (overrides the config file)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Path to an alternative config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured sources
    Sources {
        /// Only show sources in this category (tech, academic, general, dev)
        #[arg(long)]
        category: Option<Category>,
    },
    /// Fetch straight from the network, bypassing the cache
    Fetch {
        /// Only fetch sources in this category
        #[arg(long, conflicts_with = "source")]
        category: Option<Category>,

        /// Fetch a single source by id
        #[arg(long)]
        source: Option<String>,
    },
    /// Show news, served from the cache while it is fresh
    Load {
        #[arg(long)]
        category: Option<Category>,
    },
    /// Discard the cached batch and fetch again
    Refresh {
        #[arg(long)]
        category: Option<Category>,
    },
    /// Keep reloading in the foreground until Ctrl-C
    Watch {
        #[arg(long)]
        category: Option<Category>,

        /// Reload interval (e.g., "30s", "5m", "1h"); defaults to the config value
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Show the age of every cached batch
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_source() {
        let cli = Cli::parse_from(["trendboard", "fetch", "--source", "hackernews"]);
        match cli.command {
            Commands::Fetch { category, source } => {
                assert!(category.is_none());
                assert_eq!(source.as_deref(), Some("hackernews"));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_parse_category_and_global_workers() {
        let cli = Cli::parse_from(["trendboard", "load", "--category", "dev", "-w", "4"]);
        assert_eq!(cli.workers, Some(4));
        match cli.command {
            Commands::Load { category } => assert_eq!(category, Some(Category::Dev)),
            _ => panic!("expected load"),
        }
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["trendboard", "load", "--category", "sports"]).is_err());
    }

    #[test]
    fn test_fetch_category_conflicts_with_source() {
        assert!(Cli::try_parse_from([
            "trendboard",
            "fetch",
            "--category",
            "tech",
            "--source",
            "v2ex"
        ])
        .is_err());
    }
}
