use sparkscope_analyzer::Diagnostics;
use sparkscope_core::SparkscopeConfig;
use sparkscope_core::units::fmt_time;

use super::open_store;

/// Newest first, one line per application.
pub fn apps(config: &SparkscopeConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let apps = store.list_applications()?;
    if apps.is_empty() {
        println!("No applications stored. Run `sparkscope fetch` first.");
        return Ok(());
    }

    println!(
        "{:<32} {:<24} {:<20} {:>12}  SEVERITY",
        "APP ID", "NAME", "ENDED (UTC)", "DURATION"
    );
    for app in &apps {
        let diagnostics = Diagnostics::run(&store, &app.app_id, &config.thresholds)?;
        println!(
            "{:<32} {:<24} {:<20} {:>12}  {}",
            app.app_id,
            truncate(&app.name, 24),
            app.end_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            fmt_time(app.duration as f64 / 1000.0),
            diagnostics.severity
        );
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}
