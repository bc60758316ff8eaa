// ============================================================================
// ANNOTATIONS
// ============================================================================

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::sample::Sample;
use crate::{APPLICATION_ALLOCATED, NATIVE_ALLOCATED};

/// A labeled point marker tied to a series and a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Seconds since the baseline
    pub time: f64,
    pub series: CompactString,
    pub short_text: String,
    pub text: String,
}

impl Annotation {
    pub fn new(
        time: f64,
        series: &str,
        short_text: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            time,
            series: CompactString::from(series),
            short_text: short_text.into(),
            text: text.into(),
        }
    }
}

/// Annotations emitted for one sample. Rarely more than a couple.
pub type AnnotationBatch = SmallVec<[Annotation; 4]>;

/// Human name of an Android `onTrimMemory` level.
pub fn trim_level_name(level: i64) -> Option<&'static str> {
    let name = match level {
        0 => "UNKNOWN",
        5 => "RUNNING_MODERATE",
        10 => "RUNNING_LOW",
        15 => "RUNNING_CRITICAL",
        20 => "UI_HIDDEN",
        40 => "BACKGROUND",
        60 => "MODERATE",
        80 => "COMPLETE",
        _ => return None,
    };
    Some(name)
}

/// Name for a raw trim code. Only whole codes are looked up.
fn trim_level_text(level: f64) -> Option<&'static str> {
    if level.fract() != 0.0 || level.abs() > i64::MAX as f64 {
        return None;
    }
    trim_level_name(level as i64)
}

/// Every annotation a sample contributes at `time`, in a fixed order:
/// exiting, onDestroy, trim level, map tester, red warnings, log lines.
pub fn annotate(sample: &Sample, time: f64) -> AnnotationBatch {
    let mut batch = AnnotationBatch::new();

    if sample.flags.exiting {
        batch.push(Annotation::new(time, APPLICATION_ALLOCATED, "E", "Exiting"));
    }
    if sample.flags.on_destroy {
        batch.push(Annotation::new(time, APPLICATION_ALLOCATED, "D", "onDestroy"));
    }

    if let Some(metrics) = &sample.metrics {
        if let Some(level) = metrics.on_trim {
            let code = level.to_string();
            let text = trim_level_text(level).map_or_else(|| code.clone(), str::to_string);
            batch.push(Annotation::new(time, APPLICATION_ALLOCATED, code, text));
        }
        if metrics.map_tester {
            batch.push(Annotation::new(time, NATIVE_ALLOCATED, "M", "M"));
        }
    }

    if let Some(advice) = &sample.advice {
        for key in advice.red_warning_keys() {
            batch.push(Annotation::new(time, APPLICATION_ALLOCATED, key.as_str(), key.as_str()));
        }
    }

    if let Some(first) = sample.critical_log_lines.first() {
        batch.push(Annotation::new(time, APPLICATION_ALLOCATED, "L", first.as_str()));
    }

    batch
}
