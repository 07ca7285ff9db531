//! Threshold shapes shared by every analyzer.

use sparkscope_core::config::{Bounds, ByteBounds, IntervalBounds};

use crate::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Larger values are worse.
    Ascending,
    /// Smaller values are worse.
    Descending,
}

/// A one-sided threshold pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
    pub direction: Direction,
}

impl Thresholds {
    pub fn ascending(bounds: Bounds) -> Self {
        Self {
            low: bounds.low,
            high: bounds.high,
            direction: Direction::Ascending,
        }
    }

    pub fn descending(bounds: Bounds) -> Self {
        Self {
            low: bounds.low,
            high: bounds.high,
            direction: Direction::Descending,
        }
    }

    /// Ascending thresholds over byte sizes.
    pub fn bytes(bounds: ByteBounds) -> Self {
        Self::ascending(Bounds::new(
            bounds.low.bytes() as f64,
            bounds.high.bytes() as f64,
        ))
    }

    pub fn severity_of(&self, value: f64) -> Severity {
        let (past_high, past_low) = match self.direction {
            Direction::Ascending => (value > self.high, value > self.low),
            Direction::Descending => (value < self.high, value < self.low),
        };
        if past_high {
            Severity::High
        } else if past_low {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

/// Acceptable band with a tolerated margin on both sides.
///
/// `[lower_low, upper_low]` is fine, `[lower_high, upper_high]` is LOW,
/// anything outside is HIGH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalThresholds {
    pub lower_high: f64,
    pub lower_low: f64,
    pub upper_low: f64,
    pub upper_high: f64,
}

impl IntervalThresholds {
    pub fn severity_of(&self, value: f64) -> Severity {
        if (self.lower_low..=self.upper_low).contains(&value) {
            Severity::None
        } else if (self.lower_high..=self.upper_high).contains(&value) {
            Severity::Low
        } else {
            Severity::High
        }
    }
}

impl From<IntervalBounds> for IntervalThresholds {
    fn from(bounds: IntervalBounds) -> Self {
        Self {
            lower_high: bounds.lower_high,
            lower_low: bounds.lower_low,
            upper_low: bounds.upper_low,
            upper_high: bounds.upper_high,
        }
    }
}
