use std::path::Path;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::{CONFIG_FILE_NAME, FileConfig};
use crate::service::RetentionSweeper;

use super::init_store;

/// Runs one retention sweep against the data directory and prints the report.
pub fn run_sweep(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let file = FileConfig::read(&Path::new(&data_dir).join(CONFIG_FILE_NAME))?;

    let sweeper = RetentionSweeper::new(store, Arc::new(SystemClock), file.sweeper.log_detailed);
    let report = sweeper.run_once();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("Purged {} rows", report.total_purged());
        println!("  keys:        {}", report.keys_purged);
        println!("  namespaces:  {}", report.namespaces_purged);
        println!("  users:       {}", report.users_purged);
        println!("  API keys:    {}", report.credentials_purged);
        if !report.users_skipped.is_empty() {
            println!(
                "Kept {} deleted user(s) that still own a namespace",
                report.users_skipped.len()
            );
        }
        for failure in &report.failures {
            println!("Step '{}' failed: {}", failure.step, failure.error);
        }
        println!();
    }

    if !report.is_clean() {
        anyhow::bail!("Sweep finished with {} failed step(s)", report.failures.len());
    }

    Ok(())
}
