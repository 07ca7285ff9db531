//! Composite resource keys.
//!
//! Every stored entity is addressed by a string key built from its parent's
//! key and its own id, joined with [`KEY_SEPARATOR`]:
//!
//! ```text
//! app_id                      application
//! app_id_exec                 executor
//! app_id_job                  job
//! app_id_stage                stage, stage statistics
//! app_id_stage_exec           stage executor
//! app_id_stage_task           task
//! ```
//!
//! Application ids may themselves contain `_`, so keys are only ever
//! parsed from the right (see [`app_id_from_stage_key`]).

use regex::Regex;

pub const KEY_SEPARATOR: char = '_';

/// Join a parent key and a local id.
pub fn composite_key(parent: &str, id: impl std::fmt::Display) -> String {
    format!("{parent}{KEY_SEPARATOR}{id}")
}

/// Recover the application id from `app_id_stageId`.
pub fn app_id_from_stage_key(stage_key: &str) -> Option<String> {
    let (app_id, stage_id) = stage_key.rsplit_once(KEY_SEPARATOR)?;
    let well_formed = !app_id.is_empty()
        && !stage_id.is_empty()
        && stage_id.bytes().all(|b| b.is_ascii_digit())
        && app_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    well_formed.then(|| app_id.to_string())
}

/// Derives keys from history server URLs under a fixed API root.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    app_re: Regex,
    stage_re: Regex,
}

impl KeyCodec {
    pub fn new(base_url: &str) -> Result<Self, regex::Error> {
        let root = regex::escape(base_url.trim_end_matches('/'));
        Ok(Self {
            app_re: Regex::new(&format!(r"^{root}/([A-Za-z0-9\-_]+)(?:[/?].*)?$"))?,
            stage_re: Regex::new(&format!(
                r"^{root}/([A-Za-z0-9\-_]+)/stages/([0-9]+)(?:[/?].*)?$"
            ))?,
        })
    }

    /// The first path segment after the API root.
    pub fn app_id_from_url(&self, url: &str) -> Option<String> {
        let caps = self.app_re.captures(url.trim_end_matches('/'))?;
        Some(caps[1].to_string())
    }

    /// `{root}/{app}/stages/{n}...` becomes `app_n`.
    pub fn stage_key_from_url(&self, url: &str) -> Option<String> {
        let caps = self.stage_re.captures(url.trim_end_matches('/'))?;
        Some(composite_key(&caps[1], &caps[2]))
    }
}
