use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cbr::backup::Backup;
use cbr::cognito;
use cbr::config::{Config, MAX_PAGE_SIZE};
use cbr::restore::Restore;
use cbr::storage;

#[derive(Parser)]
#[command(
    name = "cbr",
    version,
    about = "Backup and restore AWS Cognito user pool configuration",
    long_about = "cbr snapshots a Cognito user pool's configuration (settings, \
                  users, groups, resource servers, app clients, identity \
                  providers) into a JSON artifact, and restores such an \
                  artifact into a target pool. Artifacts can live on the local \
                  filesystem or in S3 (s3://bucket/prefix)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a user pool into a backup artifact
    Backup {
        /// Source user pool ID
        #[arg(long)]
        pool: String,

        /// AWS region
        #[arg(long)]
        region: String,

        /// Directory or s3://bucket/prefix to write the artifact to
        #[arg(long)]
        backup_path: String,

        /// Page size for list calls; values outside 1..=50 fall back to 50
        #[arg(long, default_value_t = MAX_PAGE_SIZE)]
        max_results: i32,
    },

    /// Rebuild a user pool from a backup artifact
    Restore {
        /// Target user pool ID; a new pool is created if it does not exist
        #[arg(long)]
        pool: String,

        /// AWS region
        #[arg(long)]
        region: String,

        /// Backup artifact: a local file or s3://bucket/prefix/file
        #[arg(long)]
        backup_path: String,

        /// Restore only groups and users
        #[arg(long)]
        users_only: bool,

        /// Temporary password for provisioned accounts; required whenever
        /// the snapshot contains a non-SSO user
        #[arg(long)]
        default_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backup {
            pool,
            region,
            backup_path,
            max_results,
        } => {
            let config = Config {
                pool_id: pool,
                region,
                backup_path,
                users_only: false,
                max_results,
                default_password: None,
            };

            let client = cognito::connect(&config.region).await;
            let store = storage::for_path(&config.backup_path).await?;

            let path = Backup::new(&client, store.as_ref(), &config)
                .execute()
                .await?;
            println!("Backup written to {}", path);
        }
        Commands::Restore {
            pool,
            region,
            backup_path,
            users_only,
            default_password,
        } => {
            let config = Config {
                pool_id: pool,
                region,
                backup_path,
                users_only,
                max_results: MAX_PAGE_SIZE,
                default_password,
            };

            let client = cognito::connect(&config.region).await;
            let store = storage::for_path(&config.backup_path).await?;

            Restore::new(&client, store.as_ref(), &config)
                .execute()
                .await?;
            println!("Restored pool {}", config.pool_id);
        }
    }

    Ok(())
}
