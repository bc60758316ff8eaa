// ============================================================================
// SERIES EXTRACTOR
// ============================================================================
// A single forward pass over the samples, written as a fold: every step
// takes the accumulator by value and hands back the updated one, so a step
// can be exercised on its own and nothing outlives the pass.
// ============================================================================

use ahash::{AHashMap, AHashSet};
use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::annotation::{annotate, Annotation};
use crate::error::ExtractError;
use crate::interval::{Interval, IntervalTrackers};
use crate::sample::{DeviceInfo, Sample, Timestamp};
use crate::series::{Series, SeriesTable};
use crate::{
    APPLICATION_ALLOCATED, BYTES_PER_MEGABYTE, OOM_SCORE_FIELD, PREDICTION_PREFIX, TIME_FIELD,
};

// ----------------------------------------------------------------------------
// 4.1 Field Merging
// ----------------------------------------------------------------------------

/// Insertion-ordered field map; re-inserting a name replaces the value but
/// keeps its first position.
#[derive(Debug, Default)]
struct MergedFields {
    entries: Vec<(CompactString, f64)>,
    positions: AHashMap<CompactString, usize>,
}

impl MergedFields {
    fn insert(&mut self, name: &str, value: f64) {
        match self.positions.get(name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                let name = CompactString::from(name);
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }
}

/// `prediction_<field> = max(0, allocated + delta)`, ordered by field name.
pub fn derive_predictions(
    application_allocated: f64,
    predictions: &[(CompactString, f64)],
) -> Vec<(CompactString, f64)> {
    let mut sorted: Vec<_> = predictions.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .into_iter()
        .map(|(field, delta)| {
            (
                format_compact!("{}{}", PREDICTION_PREFIX, field),
                (application_allocated + delta).max(0.0),
            )
        })
        .collect()
}

/// All numeric fields a sample contributes, in discovery order:
/// the application allocation, the flattened metrics, then predictions.
pub fn merge_fields(sample: &Sample) -> Vec<(CompactString, f64)> {
    let mut merged = MergedFields::default();
    let allocated = sample.application_allocated();

    if let Some(allocated) = allocated {
        merged.insert(APPLICATION_ALLOCATED, allocated);
    }
    if let Some(metrics) = &sample.metrics {
        for (name, value) in &metrics.values {
            merged.insert(name, *value);
        }
    }

    let predictions = sample.advice.as_ref().and_then(|a| a.predictions.as_deref());
    if let (Some(allocated), Some(predictions)) = (allocated, predictions) {
        for (name, value) in derive_predictions(allocated, predictions) {
            merged.insert(&name, value);
        }
    }

    merged.entries
}

/// Row value for a raw field value: bytes become MB, the OOM score is
/// already in its own units.
#[inline]
pub fn to_row_value(name: &str, value: f64) -> f64 {
    if name == OOM_SCORE_FIELD {
        value
    } else {
        value / BYTES_PER_MEGABYTE
    }
}

// ----------------------------------------------------------------------------
// 4.2 Accumulator
// ----------------------------------------------------------------------------

/// Everything the pass carries from one sample to the next.
#[derive(Debug, Clone)]
pub struct ExtractState {
    baseline: Timestamp,
    table: SeriesTable,
    rows: Vec<Vec<f64>>,
    annotations: Vec<Annotation>,
    intervals: Vec<Interval>,
    trackers: IntervalTrackers,
    last_time: Option<f64>,
    skipped: usize,
}

impl ExtractState {
    pub fn new(baseline: Timestamp, heuristics: AHashSet<CompactString>) -> Self {
        Self {
            baseline,
            table: SeriesTable::new(heuristics),
            rows: Vec::new(),
            annotations: Vec::new(),
            intervals: Vec::new(),
            trackers: IntervalTrackers::default(),
            last_time: None,
            skipped: 0,
        }
    }

    /// Fold one sample into the state.
    pub fn step(mut self, sample: &Sample) -> Self {
        let Some(metrics) = &sample.metrics else {
            trace!("Skipping sample without a usable metrics payload");
            self.skipped += 1;
            return self;
        };
        let time = metrics.time.seconds_since(self.baseline);
        let merged = merge_fields(sample);

        for (name, _) in &merged {
            let (column, is_new) = self.table.register(name);
            if is_new {
                debug!(field = %name, column, "Registered series");
                for row in &mut self.rows {
                    row.push(0.0);
                }
            }
        }

        let mut row = vec![0.0; self.table.len() + 1];
        row[0] = time;
        for (name, value) in &merged {
            if let Some(column) = self.table.column(name) {
                row[column] = to_row_value(name, *value);
            }
        }
        self.rows.push(row);

        self.annotations.extend(annotate(sample, time));
        self.trackers.observe(sample, time, &mut self.intervals);
        self.last_time = Some(time);
        self
    }

    pub fn series_count(&self) -> usize {
        self.table.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Close open intervals, apply final styling and snapshot the result.
    pub fn finish(self) -> Extraction {
        let mut intervals = self.intervals;
        if let Some(time) = self.last_time {
            debug!(open = self.trackers.open_count(), time, "Closing open intervals");
            self.trackers.close_all(time, &mut intervals);
        }

        let mut table = self.table;
        if table.is_empty() {
            debug!("No numeric series discovered");
        }
        table.apply_final_styling();

        let fields = std::iter::once(TIME_FIELD.to_string())
            .chain(table.iter().map(|s| s.name.to_string()))
            .collect();

        Extraction {
            fields,
            series: table.into_series(),
            rows: self.rows,
            annotations: self.annotations,
            intervals,
            skipped_samples: self.skipped,
        }
    }
}

// ----------------------------------------------------------------------------
// 4.3 Extraction Result
// ----------------------------------------------------------------------------

/// Chart-ready snapshot of a sample sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Column labels; `fields[0]` is the time column
    pub fields: Vec<String>,
    /// One entry per column after time, in the same order
    pub series: Vec<Series>,
    pub rows: Vec<Vec<f64>>,
    pub annotations: Vec<Annotation>,
    pub intervals: Vec<Interval>,
    #[serde(default)]
    pub skipped_samples: usize,
}

impl Extraction {
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Row index of `name`'s values, counting the time column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

// ----------------------------------------------------------------------------
// 4.4 Extractor
// ----------------------------------------------------------------------------

/// Turns samples into series, rows, annotations and intervals.
#[derive(Debug, Clone, Default)]
pub struct SeriesExtractor {
    heuristics: AHashSet<CompactString>,
}

impl SeriesExtractor {
    pub fn new(heuristics: AHashSet<CompactString>) -> Self {
        Self { heuristics }
    }

    pub fn for_device(device_info: &DeviceInfo) -> Self {
        Self::new(device_info.heuristics.clone())
    }

    /// Run the pass. `samples` must be non-empty and `baseline` must have a
    /// time; samples without usable metrics are skipped.
    #[instrument(skip_all, fields(samples = samples.len()))]
    pub fn extract(&self, samples: &[Sample], baseline: &Sample) -> Result<Extraction, ExtractError> {
        if samples.is_empty() {
            return Err(ExtractError::EmptyInput);
        }
        let baseline = baseline.time().ok_or(ExtractError::BaselineWithoutTime)?;

        let extraction = samples
            .iter()
            .fold(ExtractState::new(baseline, self.heuristics.clone()), ExtractState::step)
            .finish();

        debug!(
            series = extraction.series.len(),
            rows = extraction.rows.len(),
            annotations = extraction.annotations.len(),
            intervals = extraction.intervals.len(),
            skipped = extraction.skipped_samples,
            "Extraction complete"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::IntervalCategory;
    use crate::series::Axis;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::{json, Value as JsonValue};

    fn baseline(time: i64) -> Sample {
        Sample::from(json!({"metrics": {"meta": {"time": time}}}))
    }

    fn at(time: i64, extra: JsonValue) -> Sample {
        let mut record = json!({"metrics": {"meta": {"time": time}}});
        if let (Some(record), Some(extra)) = (record.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                if key == "metrics" {
                    let metrics = record
                        .get_mut("metrics")
                        .and_then(JsonValue::as_object_mut)
                        .unwrap();
                    for (k, v) in value.as_object().unwrap() {
                        metrics.insert(k.clone(), v.clone());
                    }
                } else {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        Sample::from(record)
    }

    fn extract(samples: &[Sample]) -> Extraction {
        SeriesExtractor::default().extract(samples, &baseline(0)).unwrap()
    }

    #[test]
    fn test_trim_scenario() {
        let samples = vec![at(1000, json!({"metrics": {"onTrim": 60}}))];
        let extraction = SeriesExtractor::default()
            .extract(&samples, &baseline(1000))
            .unwrap();

        assert_eq!(extraction.rows, vec![vec![0.0]]);
        assert_eq!(extraction.fields, vec![TIME_FIELD]);
        assert_eq!(
            extraction.annotations,
            vec![Annotation::new(0.0, APPLICATION_ALLOCATED, "60", "MODERATE")]
        );
    }

    #[test]
    fn test_fractional_and_extreme_times() {
        let samples = vec![Sample::from(json!({"metrics": {"meta": {"time": 1000.4}}}))];
        let extraction = extract(&samples);
        assert!((extraction.rows[0][0] - 1.0004).abs() < 1e-12);

        let samples = vec![Sample::from(json!({"metrics": {"meta": {"time": i64::MAX}}}))];
        let extraction = SeriesExtractor::default()
            .extract(&samples, &baseline(-10))
            .unwrap();
        assert!(extraction.rows[0][0].is_finite());
    }

    #[test]
    fn test_unit_conversion() {
        let samples = vec![at(
            0,
            json!({"metrics": {"summary": {"total-pss": 2097152}, "proc": {"oom_score": 500}}}),
        )];
        let extraction = extract(&samples);
        assert_eq!(extraction.fields, vec![TIME_FIELD, "summary/total-pss", OOM_SCORE_FIELD]);
        assert_eq!(extraction.rows, vec![vec![0.0, 2.0, 500.0]]);
        assert_eq!(extraction.series(OOM_SCORE_FIELD).unwrap().axis, Some(Axis::Y2));
    }

    #[test]
    fn test_prediction_derivation() {
        let predictions = vec![
            (CompactString::from("b"), 5.0),
            (CompactString::from("a"), -15.0),
        ];
        assert_eq!(
            derive_predictions(10.0, &predictions),
            vec![
                (CompactString::from("prediction_a"), 0.0),
                (CompactString::from("prediction_b"), 15.0),
            ]
        );
    }

    #[test]
    fn test_predictions_need_application_allocated() {
        let with = at(
            0,
            json!({"testMetrics": {"x": 4, "y": 6}, "advice": {"predictions": {"b": 5, "a": -15}}}),
        );
        let names: Vec<_> = merge_fields(&with).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![APPLICATION_ALLOCATED, "prediction_a", "prediction_b"]);

        let without = at(0, json!({"advice": {"predictions": {"a": 1}}}));
        assert!(merge_fields(&without).is_empty());
    }

    #[test]
    fn test_rows_are_back_filled() {
        let samples = vec![
            at(0, json!({"metrics": {"a": 1048576}})),
            at(1000, json!({"metrics": {"b": 2097152}})),
            at(2000, json!({"metrics": {"a": 3145728, "c": 0}})),
        ];
        let extraction = extract(&samples);
        assert_eq!(extraction.fields, vec![TIME_FIELD, "a", "b", "c"]);
        assert_eq!(
            extraction.rows,
            vec![
                vec![0.0, 1.0, 0.0, 0.0],
                vec![1.0, 0.0, 2.0, 0.0],
                vec![2.0, 3.0, 0.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_samples_without_metrics_are_inert() {
        let samples = vec![
            at(0, json!({"metrics": {"a": 1}})),
            Sample::from(json!({"paused": true, "exiting": true, "testMetrics": {"x": 1}})),
            at(1000, json!({})),
        ];
        let extraction = extract(&samples);
        assert_eq!(extraction.rows.len(), 2);
        assert_eq!(extraction.skipped_samples, 1);
        assert!(extraction.annotations.is_empty());
        assert!(extraction.intervals.is_empty());
        assert_eq!(extraction.fields, vec![TIME_FIELD, "a"]);
    }

    #[test]
    fn test_paused_interval_stream() {
        let samples: Vec<_> = [false, false, true, true, false]
            .iter()
            .enumerate()
            .map(|(i, &paused)| at(i as i64 * 1000, json!({"paused": paused})))
            .collect();
        let extraction = extract(&samples);
        assert_eq!(
            extraction.intervals,
            vec![Interval {
                start: 2.0,
                end: 4.0,
                category: IntervalCategory::Paused
            }]
        );
    }

    #[test]
    fn test_open_interval_closes_at_last_usable_time() {
        let samples = vec![
            at(0, json!({"serviceCrashed": true})),
            at(1500, json!({"serviceCrashed": true})),
            Sample::from(json!({"serviceCrashed": false})),
        ];
        let extraction = extract(&samples);
        assert_eq!(extraction.intervals.len(), 1);
        assert_eq!(extraction.intervals[0].end, 1.5);
    }

    #[test]
    fn test_application_allocated_styling() {
        let heuristics: AHashSet<CompactString> = [CompactString::from("a")].into_iter().collect();
        let samples = vec![at(0, json!({"testMetrics": {"x": 1}, "metrics": {"a": 1}}))];
        let extraction = SeriesExtractor::new(heuristics)
            .extract(&samples, &baseline(0))
            .unwrap();

        let primary = extraction.series(APPLICATION_ALLOCATED).unwrap();
        assert_eq!(primary.color, crate::PRIMARY_COLOR);
        assert_eq!(primary.stroke_width, Some(crate::PRIMARY_STROKE_WIDTH));
        assert_eq!(
            extraction.series("a").unwrap().stroke_width,
            Some(crate::HEURISTIC_STROKE_WIDTH)
        );
        assert_eq!(extraction.column("a"), Some(2));
    }

    #[test]
    fn test_preconditions() {
        let extractor = SeriesExtractor::default();
        assert_eq!(
            extractor.extract(&[], &baseline(0)),
            Err(ExtractError::EmptyInput)
        );
        assert_eq!(
            extractor.extract(&[baseline(0)], &Sample::default()),
            Err(ExtractError::BaselineWithoutTime)
        );
    }

    #[test]
    fn test_step_is_usable_on_its_own() {
        let state = ExtractState::new(Timestamp::from_millis(0.0), AHashSet::new());
        let state = state.step(&at(0, json!({"metrics": {"a": 1}})));
        assert_eq!(state.series_count(), 1);
        let state = state.step(&at(1000, json!({"metrics": {"b": 1}})));
        assert_eq!(state.series_count(), 2);
        assert!(state.rows().iter().all(|row| row.len() == 3));
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    const FIELD_POOL: [&str; 5] = ["a", "b/c", "b/d", "proc/oom_score", "e/f/g"];

    fn arb_record() -> impl Strategy<Value = (u16, Option<Vec<(usize, u32)>>, bool, bool)> {
        (
            0u16..5000,
            prop::option::weighted(0.85, prop::collection::vec((0usize..5, 0u32..u32::MAX), 0..5)),
            any::<bool>(),
            any::<bool>(),
        )
    }

    fn build(records: &[(u16, Option<Vec<(usize, u32)>>, bool, bool)]) -> Vec<Sample> {
        let mut time = 0i64;
        records
            .iter()
            .map(|(delta, fields, paused, crashed)| {
                time += i64::from(*delta);
                let mut record = json!({"paused": paused, "serviceCrashed": crashed});
                if let Some(fields) = fields {
                    let mut metrics = json!({"meta": {"time": time}});
                    for (i, value) in fields {
                        let mut slot = &mut metrics;
                        let parts: Vec<_> = FIELD_POOL[*i].split('/').collect();
                        for part in &parts[..parts.len() - 1] {
                            if !slot.get(*part).map_or(false, JsonValue::is_object) {
                                slot[*part] = json!({});
                            }
                            slot = &mut slot[*part];
                        }
                        slot[parts[parts.len() - 1]] = json!(value);
                    }
                    record["metrics"] = metrics;
                }
                Sample::from(record)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_rows_match_fields(records in prop::collection::vec(arb_record(), 1..40)) {
            let samples = build(&records);
            let extraction = extract(&samples);
            let usable = samples.iter().filter(|s| s.metrics.is_some()).count();

            prop_assert_eq!(extraction.rows.len(), usable);
            prop_assert_eq!(extraction.fields.len(), extraction.series.len() + 1);
            for row in &extraction.rows {
                prop_assert_eq!(row.len(), extraction.fields.len());
            }
        }

        #[test]
        fn prop_extraction_is_deterministic(records in prop::collection::vec(arb_record(), 1..40)) {
            let samples = build(&records);
            let first = serde_json::to_string(&extract(&samples)).unwrap();
            let second = serde_json::to_string(&extract(&samples)).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_intervals_ordered_per_category(records in prop::collection::vec(arb_record(), 1..40)) {
            let extraction = extract(&build(&records));
            for category in IntervalCategory::ALL {
                let mut previous_end = f64::NEG_INFINITY;
                for interval in extraction.intervals.iter().filter(|i| i.category == category) {
                    prop_assert!(interval.start <= interval.end);
                    prop_assert!(interval.start >= previous_end);
                    previous_end = interval.end;
                }
            }
        }
    }
}
