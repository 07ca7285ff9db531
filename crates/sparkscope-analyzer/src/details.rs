//! Evidence behind a metric, ranked worst-first and capped for display.

use serde::Serialize;
use sparkscope_core::config::ListLimit;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDetails {
    /// Stage, job or executor the line is about, when there is one.
    pub entity_id: Option<String>,
    pub detail: String,
    /// How bad this record is; ranking order comes from the list.
    pub sort_key: f64,
    pub subdetails: Vec<String>,
}

impl MetricDetails {
    pub fn new(entity_id: impl Into<String>, detail: impl Into<String>, sort_key: f64) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            detail: detail.into(),
            sort_key,
            subdetails: Vec::new(),
        }
    }

    /// A line not tied to any one entity.
    pub fn note(detail: impl Into<String>) -> Self {
        Self {
            entity_id: None,
            detail: detail.into(),
            sort_key: 0.0,
            subdetails: Vec::new(),
        }
    }

    pub fn with_subdetails(mut self, subdetails: Vec<String>) -> Self {
        self.subdetails = subdetails;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    LargestFirst,
    SmallestFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsList {
    ranking: Ranking,
    items: Vec<MetricDetails>,
}

impl DetailsList {
    pub fn new(ranking: Ranking) -> Self {
        Self {
            ranking,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, details: MetricDetails) {
        self.items.push(details);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `limit` worst records in ranking order. Ties keep insertion order.
    pub fn top(&self, limit: ListLimit) -> Vec<&MetricDetails> {
        let mut ranked: Vec<&MetricDetails> = self.items.iter().collect();
        ranked.sort_by(|a, b| {
            let order = a.sort_key.total_cmp(&b.sort_key);
            match self.ranking {
                Ranking::LargestFirst => order.reverse(),
                Ranking::SmallestFirst => order,
            }
        });
        if let ListLimit::Top(n) = limit {
            ranked.truncate(n);
        }
        ranked
    }
}

impl Default for DetailsList {
    fn default() -> Self {
        Self::new(Ranking::LargestFirst)
    }
}
