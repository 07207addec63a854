use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::DiscardReason;

/// Keep/discard counters for one normalized batch.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub kept: usize,

    // discard reasons
    pub not_an_object: usize,
    pub non_positive_speed: usize,
    pub invalid_coordinate: usize,
    pub invalid_capture_time: usize,

    // kept records without a server timestamp
    pub without_delay: usize,
}

impl BatchStats {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    pub fn record_kept(&mut self, has_delay: bool) {
        self.total += 1;
        self.kept += 1;
        if !has_delay {
            self.without_delay += 1;
        }
    }

    pub fn record_discard(&mut self, reason: &DiscardReason) {
        self.total += 1;
        match reason {
            DiscardReason::NotAnObject => self.not_an_object += 1,
            DiscardReason::NonPositiveSpeed => self.non_positive_speed += 1,
            DiscardReason::InvalidCoordinate { .. } => self.invalid_coordinate += 1,
            DiscardReason::InvalidCaptureTime | DiscardReason::CaptureTimeOutOfRange(_) => {
                self.invalid_capture_time += 1
            }
        }
    }

    pub fn discarded(&self) -> usize {
        self.total - self.kept
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn kept_pct(&self) -> f64 {
        Self::pct(self.kept, self.total)
    }
}
