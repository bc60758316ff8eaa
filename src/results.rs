// ============================================================================
// RESULT STREAMS
// ============================================================================
// A stress-test run is saved either as a JSON array of records or as one
// JSON record per line. One record carries `deviceInfo`; the rest are
// samples, not necessarily in time order.
// ============================================================================

use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{CollateResult, InputError};
use crate::sample::{DeviceInfo, Sample};

/// Parse a results document. A leading `[` selects array mode, anything
/// else is read as JSON-lines with blank lines ignored.
pub fn parse_results(text: &str) -> Result<Vec<JsonValue>, InputError> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).map_err(|e| InputError::malformed(e.line(), e.to_string()));
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| InputError::malformed(i + 1, e.to_string()))
        })
        .collect()
}

/// Decoded samples of one run plus its device description.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub samples: Vec<Sample>,
    pub device_info: Option<DeviceInfo>,
}

impl ResultSet {
    /// Decode records. The first record carrying a usable `deviceInfo`
    /// supplies the device description.
    pub fn from_records(records: &[JsonValue]) -> Self {
        let samples: Vec<Sample> = records.iter().map(Sample::from_json).collect();
        let device_info = samples
            .iter()
            .find_map(|sample| sample.device_info.as_deref().cloned());
        if device_info.is_none() {
            warn!(records = records.len(), "No usable deviceInfo record in results");
        }
        Self {
            samples,
            device_info,
        }
    }

    /// Read, parse and decode a results file.
    pub fn load<P: AsRef<Path>>(path: P, sort_by_time: bool) -> CollateResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let records = parse_results(&text)?;
        if records.is_empty() {
            return Err(InputError::Empty.into());
        }
        debug!(path = %path.display(), records = records.len(), "Loaded results");

        let mut set = Self::from_records(&records);
        if sort_by_time {
            set.sort_by_time();
        }
        Ok(set)
    }

    /// Stable sort by sample time; samples without a time go first.
    pub fn sort_by_time(&mut self) {
        self.samples.sort_by_key(Sample::time);
    }

    pub fn require_device_info(&self) -> Result<&DeviceInfo, InputError> {
        self.device_info.as_ref().ok_or(InputError::MissingDeviceInfo)
    }

    /// Mean advisor duration over samples with usable metrics.
    pub fn average_advice_duration(&self) -> Option<f64> {
        let durations: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.metrics.is_some())
            .filter_map(|s| s.advice.as_ref().and_then(|a| a.duration))
            .collect();
        if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Timestamp;
    use crate::CollateError;
    use std::io::Write;

    const LINES: &str = r#"
{"deviceInfo": {"baseline": {"meta": {"time": 100}}, "params": {"heuristics": {"try": 1}}}}
{"metrics": {"meta": {"time": 300}}, "advice": {"meta": {"duration": 4}}}

{"metrics": {"meta": {"time": 200}}, "advice": {"meta": {"duration": 2}}}
"#;

    #[test]
    fn test_lines_and_array_decode_identically() {
        let lines = parse_results(LINES).unwrap();
        let array_text = format!(
            "[{}]",
            LINES.lines().filter(|l| !l.trim().is_empty()).collect::<Vec<_>>().join(",")
        );
        let array = parse_results(&array_text).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines, array);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse_results("{\"a\": 1}\n{oops\n").unwrap_err();
        match err {
            InputError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_device_info_and_sorting() {
        let mut set = ResultSet::from_records(&parse_results(LINES).unwrap());
        let info = set.require_device_info().unwrap();
        assert_eq!(info.baseline.time(), Some(Timestamp::from_millis(100.0)));
        assert!(info.heuristics.contains("try"));

        set.sort_by_time();
        let times: Vec<_> = set.samples.iter().map(Sample::time).collect();
        assert_eq!(
            times,
            vec![
                None,
                Some(Timestamp::from_millis(200.0)),
                Some(Timestamp::from_millis(300.0))
            ]
        );
        assert_eq!(set.average_advice_duration(), Some(3.0));
    }

    #[test]
    fn test_missing_device_info() {
        let set = ResultSet::from_records(&parse_results("{\"metrics\": {\"time\": 1}}").unwrap());
        assert!(matches!(
            set.require_device_info(),
            Err(InputError::MissingDeviceInfo)
        ));
        assert_eq!(set.average_advice_duration(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LINES.as_bytes()).unwrap();
        let set = ResultSet::load(file.path(), true).unwrap();
        assert_eq!(set.samples.len(), 3);
        assert_eq!(set.samples[2].time(), Some(Timestamp::from_millis(300.0)));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ResultSet::load(empty.path(), true),
            Err(CollateError::Input(InputError::Empty))
        ));
    }
}
