use std::fmt;

use serde::{Deserialize, Serialize};

/// How concerning a finding is. Ordered `None < Low < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    None,
    Low,
    High,
}

impl Severity {
    /// Highest severity in `items`, `None` when empty.
    pub fn max_of(items: impl IntoIterator<Item = Severity>) -> Severity {
        items.into_iter().max().unwrap_or_default()
    }

    pub fn is_issue(self) -> bool {
        self > Severity::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
