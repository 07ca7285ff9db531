//! Analyzers, one per telemetry area. Each reads one application's rows and
//! returns `None` for every check that found nothing.

pub mod app_config;
pub mod executor;
pub mod job;
pub mod stage;

pub use app_config::AppConfigAnalyzer;
pub use executor::ExecutorAnalyzer;
pub use job::JobAnalyzer;
pub use stage::StageAnalyzer;
