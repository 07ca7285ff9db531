use sparkscope_core::SparkscopeConfig;
use sparkscope_fetcher::{Orchestrator, SyncMode};

use super::open_store;

pub async fn fetch(config: &SparkscopeConfig, test_mode: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let orchestrator = Orchestrator::new(store, config)?;
    let mode = if test_mode {
        SyncMode::Test
    } else {
        SyncMode::Incremental
    };

    let report = orchestrator.run(mode).await?;
    if report.app_ids.is_empty() {
        println!("No new applications ({:.1?})", report.elapsed);
        return Ok(());
    }
    println!(
        "✓ Ingested {} applications, {} rows in {:.1?}",
        report.app_ids.len(),
        report.rows,
        report.elapsed
    );
    for app_id in &report.app_ids {
        println!("  {app_id}");
    }
    Ok(())
}
