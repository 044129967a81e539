// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Analytics Runner Binary
//!
//! Recomputes every user's strength analytics from their finished workout
//! logs and writes the results back to the store.

use anyhow::Result;
use clap::Parser;
use strength_analytics::{
    analytics::AnalyticsEngine,
    config::{AnalyticsConfig, RunnerConfig},
    logging,
    storage::open_store,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "strength-analytics")]
#[command(about = "Recompute strength analytics from finished workout logs")]
pub struct Args {
    /// Store URL (`sqlite:<path>` or `memory`); defaults to DATABASE_URL
    #[arg(short, long)]
    database_url: Option<String>,

    /// Analytics configuration file; defaults to ANALYTICS_CONFIG_PATH
    #[arg(short, long)]
    config: Option<String>,

    /// Compute and print the summary without writing anything
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let args = Args::parse();
    let runner_config = RunnerConfig::from_env()?;
    info!("{}", runner_config.summary());

    let database_url = args.database_url.unwrap_or(runner_config.database_url);
    let config_path = args.config.or(runner_config.analytics_config_path);
    let config = AnalyticsConfig::load(config_path.as_deref())?;

    let store = open_store(&database_url).await?;
    info!("Store opened: {}", database_url);

    let engine = AnalyticsEngine::new(store.as_ref(), &config);
    let summary = if args.dry_run {
        info!("Dry run, nothing will be written");
        engine.compute().await?.summary
    } else {
        match engine.run().await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Analytics run failed: {:#}", e);
                return Err(e);
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.failed_users.is_empty() {
        return Err(anyhow::anyhow!(
            "{} user batch(es) failed to write",
            summary.failed_users.len()
        ));
    }

    Ok(())
}
