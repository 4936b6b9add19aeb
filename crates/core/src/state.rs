//! Persisted monitor state.

use serde::{Deserialize, Serialize};

/// Default percentage magnitude above which a change is significant.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// One entry of the message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub content: String,
}

impl MessageRecord {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Singleton state carried through every cycle and persisted after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    /// Message log, oldest first.
    pub messages: Vec<MessageRecord>,
    /// Last observed TVL.
    pub tvl: f64,
    /// Percentage magnitude that classifies a change as an alert.
    pub threshold: f64,
    /// Set after any cycle that reached notification dispatch.
    pub alert_sent: bool,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            tvl: 0.0,
            threshold: DEFAULT_THRESHOLD,
            alert_sent: false,
        }
    }
}

impl MonitorState {
    /// Append a record to the message log.
    ///
    /// With `cap` set, the oldest records are dropped so the log never
    /// holds more than `cap` entries.
    pub fn push_message(&mut self, content: impl Into<String>, cap: Option<usize>) {
        self.messages.push(MessageRecord::new(content));
        if let Some(cap) = cap {
            if self.messages.len() > cap {
                let excess = self.messages.len() - cap;
                self.messages.drain(..excess);
            }
        }
    }

    /// Content of the most recent message, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}
