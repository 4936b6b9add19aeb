//! Change detection and message composition.

use crate::currency::format_usd;

/// Subject used when the change stays below the threshold.
pub const STABLE_SUBJECT: &str = "TVL Update: No Significant Change";

/// Percentage change from `previous` to `current`.
///
/// Returns 0 when there is no previous value to compare against.
pub fn change_pct(previous: f64, current: f64) -> f64 {
    if previous != 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Direction of a significant change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increased,
    Decreased,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Increased => "increased",
            Direction::Decreased => "decreased",
        }
    }

    fn capitalized(&self) -> &'static str {
        match self {
            Direction::Increased => "Increased",
            Direction::Decreased => "Decreased",
        }
    }
}

/// Classification of one observed change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeKind {
    /// `|change| >= threshold`.
    Significant(Direction),
    Stable,
}

impl ChangeKind {
    /// Classify a percentage change. The threshold is inclusive.
    pub fn classify(change_pct: f64, threshold: f64) -> Self {
        if change_pct.abs() >= threshold {
            let direction = if change_pct > 0.0 {
                Direction::Increased
            } else {
                Direction::Decreased
            };
            ChangeKind::Significant(direction)
        } else {
            ChangeKind::Stable
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, ChangeKind::Significant(_))
    }
}

/// Result of comparing a fresh observation against the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub previous: f64,
    pub current: f64,
    pub change_pct: f64,
    pub kind: ChangeKind,
}

impl Assessment {
    pub fn new(previous: f64, current: f64, threshold: f64) -> Self {
        let change_pct = change_pct(previous, current);
        Self {
            previous,
            current,
            change_pct,
            kind: ChangeKind::classify(change_pct, threshold),
        }
    }

    /// Compose the email for this assessment.
    pub fn notification(&self) -> Notification {
        let previous = format_usd(self.previous);
        let current = format_usd(self.current);
        let magnitude = self.change_pct.abs();

        match self.kind {
            ChangeKind::Significant(direction) => Notification {
                subject: format!(
                    "TVL Alert: {} by {:.2}%",
                    direction.capitalized(),
                    magnitude
                ),
                body: format!(
                    "The Total Value Locked (TVL) has {} by {:.2}%.\n\
                     Previous TVL: {}\n\
                     Current TVL: {}\n",
                    direction.as_str(),
                    magnitude,
                    previous,
                    current
                ),
            },
            ChangeKind::Stable => Notification {
                subject: STABLE_SUBJECT.to_string(),
                body: format!(
                    "The Total Value Locked (TVL) is stable at {}.\n\
                     No significant change from the previous value of {}.\n",
                    current, previous
                ),
            },
        }
    }
}

/// Subject and plain-text body of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}
