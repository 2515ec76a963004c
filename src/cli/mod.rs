pub mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::CONFIG;
use crate::database::DatabaseManager;
use crate::services::build_geocoder;

#[derive(Parser)]
#[command(name = "bootcamp-seed")]
#[command(about = "Load or wipe Bootcamp API sample data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Import users, bootcamps, courses and reviews JSON files")]
    Import {
        #[arg(long, help = "Directory holding the seed JSON files", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp, course and review")]
    Destroy,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect().await?;
    DatabaseManager::migrate(&pool).await?;

    match cli.command {
        Commands::Import { dir } => {
            seed::check_dir(&dir)?;
            let geocoder = build_geocoder(&CONFIG.geocoder);
            let report = seed::import(&pool, geocoder.as_ref(), &dir).await?;
            info!(
                "Data imported: {} users, {} bootcamps, {} courses, {} reviews",
                report.users, report.bootcamps, report.courses, report.reviews
            );
        }
        Commands::Destroy => {
            let report = seed::destroy(&pool).await?;
            info!(
                "Data destroyed: {} users, {} bootcamps, {} courses, {} reviews",
                report.users, report.bootcamps, report.courses, report.reviews
            );
        }
    }

    Ok(())
}
