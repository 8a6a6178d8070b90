use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use fias_loader::sync::{load_complete_data, update_data, Strategy, TableLoader};
use fias_loader::table::TableName;
use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "fias-loader")]
#[command(about = "Fill or update a FIAS address database")]
struct Cli {
    /// SQLite database to write to
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Truncate the tables and load this directory or file into them
    #[arg(long, value_name = "PATH")]
    load: Option<PathBuf>,

    /// Then update the database from this directory or file
    #[arg(long, value_name = "PATH")]
    update: Option<PathBuf>,

    /// Classify a whole batch as new or existing with one query instead of
    /// looking up every record
    #[arg(long)]
    partitioned: bool,

    /// Records per batch
    #[arg(long, env = "FIAS_BATCH_LIMIT", default_value_t = 10_000,
          value_parser = clap::value_parser!(u64).range(1..))]
    limit: u64,

    /// Tables to process
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = TableName::ALL.to_vec())]
    tables: Vec<TableName>,

    /// Reference date for record validity, defaults to today
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let pool = connect(&cli.database_url).await?;
    let mut conn = pool.acquire().await?;

    if let Some(path) = &cli.load {
        let loader = TableLoader::new(cli.limit, today, Strategy::InsertOnly);
        let start = Instant::now();
        info!("Loading started at {}", Local::now());
        load_complete_data(&mut conn, &loader, path, &cli.tables).await?;
        info!("Loading ended at {}", Local::now());
        info!("Estimated time: {:?}", start.elapsed());
    }

    if let Some(path) = &cli.update {
        let strategy = if cli.partitioned {
            Strategy::Partitioned
        } else {
            Strategy::CheckThenAct
        };
        let loader = TableLoader::new(cli.limit, today, strategy);
        let start = Instant::now();
        info!("Updating started at {} ({:?})", Local::now(), loader.strategy());
        update_data(&mut conn, &loader, path, &cli.tables).await?;
        info!("Updating ended at {}", Local::now());
        info!("Estimated time: {:?}", start.elapsed());
    }

    Ok(())
}

async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1) // the loader runs on a single connection
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(
            SqliteConnectOptions::from_str(database_url)
                .context("Failed to parse SQLite path")?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(5))
                .foreign_keys(true)
                .auto_vacuum(SqliteAutoVacuum::Incremental)
                .pragma("cache_size", "-20000")
                .pragma("temp_store", "MEMORY"),
        )
        .await
        .context("Failed to connect to SQLite")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}
