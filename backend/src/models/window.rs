use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeliveryError, DeliveryResult};

/// The half-open span `[start, end)` a delivery query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DeliveryWindow {
    /// Build a window; `end` before `start` is rejected.
    ///
    /// An empty window (`start == end`) is accepted here and delivers nothing.
    /// Query entry points reject it separately via [`DeliveryWindow::require_non_empty`].
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DeliveryResult<Self> {
        if end < start {
            return Err(DeliveryError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Reject windows whose end is not strictly after their start.
    pub fn require_non_empty(&self) -> DeliveryResult<()> {
        if self.is_empty() {
            return Err(DeliveryError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
