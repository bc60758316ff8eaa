// ============================================================================
// INTERVAL EDGE DETECTION
// ============================================================================
// Each tracker watches one boolean condition. An interval opens on the
// false→true edge and closes on the true→false edge; anything still open
// when the stream ends is closed at the last observed time.
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sample::Sample;

// ----------------------------------------------------------------------------
// 3.1 Categories & Intervals
// ----------------------------------------------------------------------------

/// The condition an interval highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntervalCategory {
    ActivityPaused,
    Paused,
    LowMemory,
    ServiceCrashed,
    AllocFailed,
}

impl IntervalCategory {
    /// Tracker order, which is also the order open intervals are closed in.
    pub const ALL: [IntervalCategory; 5] = [
        IntervalCategory::ActivityPaused,
        IntervalCategory::Paused,
        IntervalCategory::LowMemory,
        IntervalCategory::ServiceCrashed,
        IntervalCategory::AllocFailed,
    ];

    /// Band fill used by the dashboard.
    pub fn highlight_color(&self) -> &'static str {
        match self {
            IntervalCategory::ActivityPaused => "lightgrey",
            IntervalCategory::Paused => "yellow",
            IntervalCategory::LowMemory => "pink",
            IntervalCategory::ServiceCrashed => "cyan",
            IntervalCategory::AllocFailed => "lightblue",
        }
    }

    /// Reading of this condition for one sample. `None` leaves the tracker
    /// as it is; only the activity lifecycle flag is ever unreported.
    pub fn observe(&self, sample: &Sample) -> Option<bool> {
        match self {
            IntervalCategory::ActivityPaused => sample.flags.activity_paused,
            IntervalCategory::Paused => Some(sample.flags.paused),
            IntervalCategory::LowMemory => {
                Some(sample.metrics.as_ref().map_or(false, |m| m.low_memory))
            }
            IntervalCategory::ServiceCrashed => Some(sample.flags.service_crashed),
            IntervalCategory::AllocFailed => Some(sample.flags.any_alloc_failure()),
        }
    }
}

/// A contiguous time range during which a condition held. Serialized with
/// the band fill of its category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", into = "HighlightBand")]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub category: IntervalCategory,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HighlightBand {
    start: f64,
    end: f64,
    category: IntervalCategory,
    color: &'static str,
}

impl From<Interval> for HighlightBand {
    fn from(interval: Interval) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
            category: interval.category,
            color: interval.category.highlight_color(),
        }
    }
}

// ----------------------------------------------------------------------------
// 3.2 Single Tracker
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTracker {
    category: IntervalCategory,
    open_since: Option<f64>,
}

impl IntervalTracker {
    pub const fn new(category: IntervalCategory) -> Self {
        Self {
            category,
            open_since: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open_since.is_some()
    }

    /// Feed one reading; returns the interval closed by a falling edge.
    pub fn observe(&mut self, active: Option<bool>, time: f64) -> Option<Interval> {
        match (active?, self.open_since) {
            (true, None) => {
                self.open_since = Some(time);
                None
            }
            (false, Some(start)) => {
                self.open_since = None;
                Some(Interval {
                    start,
                    end: time,
                    category: self.category,
                })
            }
            _ => None,
        }
    }

    /// Close at end of stream.
    pub fn close(self, time: f64) -> Option<Interval> {
        self.open_since.map(|start| Interval {
            start,
            end: time,
            category: self.category,
        })
    }
}

// ----------------------------------------------------------------------------
// 3.3 Tracker Set
// ----------------------------------------------------------------------------

/// The five trackers the chart highlights.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTrackers {
    trackers: [IntervalTracker; 5],
}

impl Default for IntervalTrackers {
    fn default() -> Self {
        Self {
            trackers: IntervalCategory::ALL.map(IntervalTracker::new),
        }
    }
}

impl IntervalTrackers {
    /// Update every tracker from `sample`, appending closed intervals.
    pub fn observe(&mut self, sample: &Sample, time: f64, out: &mut Vec<Interval>) {
        for tracker in &mut self.trackers {
            let reading = tracker.category.observe(sample);
            if let Some(interval) = tracker.observe(reading, time) {
                debug!(
                    category = ?interval.category,
                    start = interval.start,
                    end = interval.end,
                    "Interval closed"
                );
                out.push(interval);
            }
        }
    }

    /// Close everything still open at `time`, in tracker order.
    pub fn close_all(self, time: f64, out: &mut Vec<Interval>) {
        out.extend(self.trackers.into_iter().filter_map(|t| t.close(time)));
    }

    pub fn open_count(&self) -> usize {
        self.trackers.iter().filter(|t| t.is_open()).count()
    }
}
