// ============================================================================
// SAMPLE MODEL
// ============================================================================
// One decoded telemetry record as written by the stress tester. Decoding is
// total: any shape problem inside a record degrades to "field absent", so
// a `Sample` can always be built from a JSON value.
// ============================================================================

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use ahash::AHashSet;
use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

// ----------------------------------------------------------------------------
// 1.1 Timestamp
// ----------------------------------------------------------------------------

/// Wall-clock timestamp in milliseconds, as reported by the device.
/// Fractional milliseconds are kept; ordering is total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    #[inline]
    pub fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    #[inline]
    pub const fn as_millis(&self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `baseline`; negative when this precedes it.
    #[inline]
    pub fn seconds_since(&self, baseline: Timestamp) -> f64 {
        (self.0 - baseline.0) / crate::MILLIS_PER_SECOND
    }

    fn from_json(value: &JsonValue) -> Option<Self> {
        value.as_f64().filter(|v| v.is_finite()).map(Self)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// ----------------------------------------------------------------------------
// 1.2 Metrics Flattening
// ----------------------------------------------------------------------------

/// Keys that never name a metric. Skipped, with their subtrees, at every
/// nesting level while flattening.
pub const NON_METRIC_KEYS: [&str; 4] = ["meta", "_meta", "time", "onTrim"];

/// Flatten a nested metrics object into `(path, value)` pairs in document
/// order. Paths join nested keys with `/`; only JSON numbers are kept.
pub fn flatten_metrics(object: &JsonMap<String, JsonValue>) -> Vec<(CompactString, f64)> {
    let mut out = Vec::new();
    flatten_into(object, "", &mut out);
    out
}

fn flatten_into(
    object: &JsonMap<String, JsonValue>,
    prefix: &str,
    out: &mut Vec<(CompactString, f64)>,
) {
    for (key, value) in object {
        if NON_METRIC_KEYS.contains(&key.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            CompactString::from(key.as_str())
        } else {
            format_compact!("{}/{}", prefix, key)
        };
        match value {
            JsonValue::Number(number) => {
                if let Some(v) = number.as_f64() {
                    out.push((path, v));
                }
            }
            JsonValue::Object(nested) => flatten_into(nested, &path, out),
            _ => {}
        }
    }
}

/// JavaScript truthiness, which is how the producers' flags were read.
pub(crate) fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map_or(false, |v| v != 0.0 && !v.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn numeric_entries(object: &JsonMap<String, JsonValue>) -> Vec<(CompactString, f64)> {
    object
        .iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (CompactString::from(key.as_str()), v)))
        .collect()
}

// ----------------------------------------------------------------------------
// 1.3 Metrics Payload
// ----------------------------------------------------------------------------

/// The interpretable part of a record's `metrics` object.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsPayload {
    /// When the metrics were taken
    pub time: Timestamp,
    /// Flattened numeric fields, in document order
    pub values: Vec<(CompactString, f64)>,
    /// Highest `onTrimMemory` level seen since the previous report, as sent
    pub on_trim: Option<f64>,
    /// The map tester raised a warning
    pub map_tester: bool,
    /// `MemoryInfo.lowMemory` was reported
    pub low_memory: bool,
}

impl MetricsPayload {
    /// Decode a metrics object. `None` unless it is an object carrying a
    /// numeric `meta.time` (or a top-level `time` from older producers).
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        let time = object
            .get("meta")
            .and_then(|meta| meta.get("time"))
            .and_then(Timestamp::from_json)
            .or_else(|| object.get("time").and_then(Timestamp::from_json))?;

        Some(Self {
            time,
            values: flatten_metrics(object),
            on_trim: object.get("onTrim").and_then(JsonValue::as_f64),
            map_tester: object.contains_key("mapTester"),
            low_memory: object
                .get("MemoryInfo")
                .and_then(|info| info.get("lowMemory"))
                .map_or(false, truthy),
        })
    }

    /// A payload carrying only a time.
    pub fn at(time: Timestamp) -> Self {
        Self {
            time,
            values: Vec::new(),
            on_trim: None,
            map_tester: false,
            low_memory: false,
        }
    }
}

// ----------------------------------------------------------------------------
// 1.4 Advice
// ----------------------------------------------------------------------------

/// A single advisor warning: a level plus the heuristics that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub level: Option<CompactString>,
    /// Every key of the warning record except `level`
    pub keys: Vec<CompactString>,
}

impl Warning {
    fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            level: object
                .get("level")
                .and_then(JsonValue::as_str)
                .map(CompactString::from),
            keys: object
                .keys()
                .filter(|key| key.as_str() != "level")
                .map(|key| CompactString::from(key.as_str()))
                .collect(),
        })
    }

    pub fn is_red(&self) -> bool {
        self.level.as_deref() == Some("red")
    }
}

/// Advisor output attached to a record. Malformed pieces are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advice {
    /// Predicted headroom deltas per field; `None` when absent or malformed
    pub predictions: Option<Vec<(CompactString, f64)>>,
    pub warnings: Vec<Warning>,
    /// How long the advisor took to produce this advice
    pub duration: Option<f64>,
}

impl Advice {
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            predictions: object
                .get("predictions")
                .and_then(JsonValue::as_object)
                .map(numeric_entries),
            warnings: object
                .get("warnings")
                .and_then(JsonValue::as_array)
                .map(|warnings| warnings.iter().filter_map(Warning::from_json).collect())
                .unwrap_or_default(),
            duration: object
                .get("meta")
                .and_then(|meta| meta.get("duration"))
                .and_then(JsonValue::as_f64),
        })
    }

    /// Keys of every red warning, in record order.
    pub fn red_warning_keys(&self) -> impl Iterator<Item = &CompactString> + '_ {
        self.warnings
            .iter()
            .filter(|w| w.is_red())
            .flat_map(|w| w.keys.iter())
    }
}

// ----------------------------------------------------------------------------
// 1.5 Flags
// ----------------------------------------------------------------------------

/// Boolean and event flags of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleFlags {
    pub paused: bool,
    pub service_crashed: bool,
    pub alloc_failed: bool,
    pub mmap_anon_failed: bool,
    pub mmap_file_failed: bool,
    /// Only reported on activity lifecycle changes; `None` means unchanged
    pub activity_paused: Option<bool>,
    pub exiting: bool,
    pub on_destroy: bool,
}

impl SampleFlags {
    fn from_json(object: &JsonMap<String, JsonValue>) -> Self {
        let flag = |key: &str| object.get(key).map_or(false, truthy);
        Self {
            paused: flag("paused"),
            service_crashed: flag("serviceCrashed"),
            alloc_failed: flag("allocFailed"),
            mmap_anon_failed: flag("mmapAnonFailed"),
            mmap_file_failed: flag("mmapFileFailed"),
            activity_paused: object.get("activityPaused").map(truthy),
            exiting: object.contains_key("exiting"),
            on_destroy: object.contains_key("onDestroy"),
        }
    }

    /// Any of the three allocation failure flags.
    pub fn any_alloc_failure(&self) -> bool {
        self.alloc_failed || self.mmap_anon_failed || self.mmap_file_failed
    }
}

// ----------------------------------------------------------------------------
// 1.6 Sample
// ----------------------------------------------------------------------------

/// One telemetry record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "JsonValue")]
pub struct Sample {
    /// `None` when the record has no usable metrics payload
    pub metrics: Option<MetricsPayload>,
    /// Bytes allocated by the test itself, per allocator
    pub test_metrics: Option<Vec<(CompactString, f64)>>,
    pub advice: Option<Advice>,
    pub flags: SampleFlags,
    pub critical_log_lines: Vec<String>,
    pub device_info: Option<Box<DeviceInfo>>,
}

impl Sample {
    /// A sample carrying only a metrics payload, as used for baselines.
    pub fn from_metrics(metrics: MetricsPayload) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::default()
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let advice_value = object.get("advice");
        let metrics = object
            .get("metrics")
            .or_else(|| advice_value.and_then(|advice| advice.get("metrics")))
            .and_then(MetricsPayload::from_json);

        Self {
            metrics,
            test_metrics: object
                .get("testMetrics")
                .and_then(JsonValue::as_object)
                .map(numeric_entries),
            advice: advice_value.and_then(Advice::from_json),
            flags: SampleFlags::from_json(object),
            critical_log_lines: object
                .get("criticalLogLines")
                .and_then(JsonValue::as_array)
                .map(|lines| {
                    lines
                        .iter()
                        .map(|line| match line {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            device_info: object
                .get("deviceInfo")
                .and_then(DeviceInfo::from_json)
                .map(Box::new),
        }
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.metrics.as_ref().map(|m| m.time)
    }

    /// Sum of all test-allocated bytes, when the record reports them.
    pub fn application_allocated(&self) -> Option<f64> {
        self.test_metrics
            .as_ref()
            .map(|metrics| metrics.iter().map(|(_, v)| v).sum())
    }
}

impl From<JsonValue> for Sample {
    fn from(value: JsonValue) -> Self {
        Self::from_json(&value)
    }
}

impl From<&JsonValue> for Sample {
    fn from(value: &JsonValue) -> Self {
        Self::from_json(value)
    }
}

// ----------------------------------------------------------------------------
// 1.7 Device Info
// ----------------------------------------------------------------------------

/// Per-run device description: the zero-point sample and emphasis hints.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub baseline: Sample,
    /// Field names drawn with emphasis
    pub heuristics: AHashSet<CompactString>,
}

impl DeviceInfo {
    /// Decode a `deviceInfo` record. `None` unless its baseline has a time.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let baseline = value.get("baseline").and_then(MetricsPayload::from_json)?;
        let heuristics = match value.get("params").and_then(|p| p.get("heuristics")) {
            Some(JsonValue::Object(object)) => object
                .keys()
                .map(|key| CompactString::from(key.as_str()))
                .collect(),
            Some(JsonValue::Array(names)) => names
                .iter()
                .filter_map(JsonValue::as_str)
                .map(CompactString::from)
                .collect(),
            _ => AHashSet::new(),
        };
        Some(Self {
            baseline: Sample::from_metrics(baseline),
            heuristics,
        })
    }
}
