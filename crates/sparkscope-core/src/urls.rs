//! History server REST URL shapes.

/// Quantiles requested for stage task summaries. Downstream code indexes
/// into these by position, so the set is fixed.
pub const TASK_QUANTILES: [f64; 5] = [0.001, 0.25, 0.5, 0.75, 0.999];
pub const MEDIAN: usize = 2;
pub const MAXIMUM: usize = 4;

const QUANTILES_PARAM: &str = "0.001,0.25,0.5,0.75,0.999";

/// Only the first attempt of a stage is ever requested.
const STAGE_ATTEMPT: u32 = 0;

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: String,
}

impl UrlBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Completed applications ending at or after `watermark`.
    pub fn applications_since(&self, watermark: &str) -> String {
        format!("{}?status=completed&minEndDate={watermark}", self.base)
    }

    /// At most `limit` completed applications, newest first.
    pub fn applications_limited(&self, limit: u32) -> String {
        format!("{}?status=completed&limit={limit}", self.base)
    }

    /// Cluster-mode applications expose their environment under the attempt.
    pub fn environment(&self, app_id: &str, attempt_id: Option<&str>) -> String {
        match attempt_id {
            Some(attempt) => format!("{}/{app_id}/{attempt}/environment", self.base),
            None => format!("{}/{app_id}/environment", self.base),
        }
    }

    pub fn executors(&self, app_id: &str) -> String {
        format!("{}/{app_id}/allexecutors", self.base)
    }

    pub fn jobs(&self, app_id: &str) -> String {
        format!("{}/{app_id}/jobs", self.base)
    }

    pub fn stages(&self, app_id: &str) -> String {
        format!("{}/{app_id}/stages", self.base)
    }

    pub fn stage_detail(&self, app_id: &str, stage_id: u64) -> String {
        format!("{}/{app_id}/stages/{stage_id}/{STAGE_ATTEMPT}", self.base)
    }

    pub fn task_summary(&self, app_id: &str, stage_id: u64) -> String {
        format!(
            "{}/taskSummary?quantiles={QUANTILES_PARAM}",
            self.stage_detail(app_id, stage_id)
        )
    }

    /// Longest-running tasks first, so a `limit` cut keeps the expensive ones.
    pub fn task_list(&self, app_id: &str, stage_id: u64, limit: u64) -> String {
        format!(
            "{}/taskList?length={limit}&sortBy=-runtime",
            self.stage_detail(app_id, stage_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyCodec;

    const BASE: &str = "https://shs:18488/api/v1/applications";

    #[test]
    fn application_listing() {
        let urls = UrlBuilder::new(BASE);
        assert_eq!(
            urls.applications_since("1970-01-01T00:00:00.001GMT"),
            format!("{BASE}?status=completed&minEndDate=1970-01-01T00:00:00.001GMT")
        );
        assert_eq!(
            urls.applications_limited(10),
            format!("{BASE}?status=completed&limit=10")
        );
    }

    #[test]
    fn environment_depends_on_mode() {
        let urls = UrlBuilder::new(&format!("{BASE}/"));
        assert_eq!(urls.environment("app-1", None), format!("{BASE}/app-1/environment"));
        assert_eq!(
            urls.environment("app-1", Some("1")),
            format!("{BASE}/app-1/1/environment")
        );
    }

    #[test]
    fn stage_level_urls() {
        let urls = UrlBuilder::new(BASE);
        assert_eq!(urls.stage_detail("a", 3), format!("{BASE}/a/stages/3/0"));
        assert_eq!(
            urls.task_summary("a", 3),
            format!("{BASE}/a/stages/3/0/taskSummary?quantiles=0.001,0.25,0.5,0.75,0.999")
        );
        assert_eq!(
            urls.task_list("a", 3, 100),
            format!("{BASE}/a/stages/3/0/taskList?length=100&sortBy=-runtime")
        );
    }

    #[test]
    fn quantile_param_matches_constant() {
        let rendered: Vec<String> = TASK_QUANTILES.iter().map(|q| q.to_string()).collect();
        assert_eq!(rendered.join(","), QUANTILES_PARAM);
        assert_eq!(TASK_QUANTILES[MEDIAN], 0.5);
        assert_eq!(TASK_QUANTILES[MAXIMUM], 0.999);
    }

    #[test]
    fn built_urls_decode_back_to_keys() {
        let urls = UrlBuilder::new(BASE);
        let codec = KeyCodec::new(BASE).unwrap();
        let app = "application_1602836119886_0201";
        assert_eq!(codec.app_id_from_url(&urls.executors(app)).as_deref(), Some(app));
        assert_eq!(
            codec.app_id_from_url(&urls.environment(app, Some("1"))).as_deref(),
            Some(app)
        );
        assert_eq!(
            codec.stage_key_from_url(&urls.task_list(app, 12, 5)).as_deref(),
            Some("application_1602836119886_0201_12")
        );
    }
}
