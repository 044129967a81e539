// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Copies the legacy `date` of each workout log into `completed_date`
//! where it is missing. Safe to run repeatedly.

use anyhow::Result;
use clap::Parser;
use strength_analytics::{config::RunnerConfig, database::Database, logging};
use tracing::info;

#[derive(Parser)]
#[command(name = "backfill-completed-date")]
#[command(about = "Backfill completed_date from the legacy date field")]
pub struct Args {
    /// SQLite database URL; defaults to DATABASE_URL
    #[arg(short, long)]
    database_url: Option<String>,

    /// Rows per page; defaults to BACKFILL_BATCH_SIZE
    #[arg(short, long)]
    batch_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let args = Args::parse();
    let runner_config = RunnerConfig::from_env()?;

    let database_url = args.database_url.unwrap_or(runner_config.database_url);
    let batch_size = args.batch_size.unwrap_or(runner_config.backfill_batch_size);

    info!("Starting completed_date backfill on {} ({} per page)", database_url, batch_size);
    let database = Database::new(&database_url).await?;
    let summary = database.backfill_completed_date(batch_size).await?;

    info!(
        "Backfill complete: {} processed, {} updated",
        summary.documents_processed, summary.documents_updated
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
