use anyhow::Context;
use sparkscope_analyzer::{AppSummary, ConfigSnapshot, Diagnostics, Report};
use sparkscope_core::SparkscopeConfig;

use super::open_store;
use crate::OutputFormat;

pub fn analyze(config: &SparkscopeConfig, app_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let app = store
        .get_application(app_id)?
        .with_context(|| format!("application {app_id} is not in the store"))?;

    let thresholds = &config.thresholds;
    let diagnostics = Diagnostics::run(&store, app_id, thresholds)?;
    let summary = AppSummary::compute(&store, app_id)?;
    let snapshot = ConfigSnapshot::of(&app, &thresholds.app_config);
    let report = Report::new(&diagnostics, &summary, &snapshot);

    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print!("{}", report.to_text()),
    }
    Ok(())
}
