// ============================================================================
// CHART REPORT
// ============================================================================
// What the rendering layer receives: the extraction plus the series
// grouping used for the visibility form and the advisor timing summary.
// ============================================================================

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::extract::Extraction;
use crate::results::ResultSet;

/// One entry of a series group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub field: CompactString,
    pub label: CompactString,
}

/// Series sharing a path prefix, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesGroup {
    pub prefix: CompactString,
    pub members: Vec<GroupMember>,
}

/// Group an extraction's series by prefix. Groups appear in the order their
/// first member was discovered.
pub fn group_series(extraction: &Extraction) -> Vec<SeriesGroup> {
    let mut groups: Vec<SeriesGroup> = Vec::new();
    for series in &extraction.series {
        let member = GroupMember {
            field: series.name.clone(),
            label: CompactString::from(series.label()),
        };
        match groups.iter_mut().find(|g| g.prefix == series.prefix()) {
            Some(group) => group.members.push(member),
            None => groups.push(SeriesGroup {
                prefix: CompactString::from(series.prefix()),
                members: vec![member],
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartReport {
    #[serde(flatten)]
    pub extraction: Extraction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<SeriesGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_advice_duration: Option<f64>,
}

impl ChartReport {
    pub fn build(results: &ResultSet, extraction: Extraction, include_groups: bool) -> Self {
        let groups = if include_groups {
            group_series(&extraction)
        } else {
            Vec::new()
        };
        Self {
            groups,
            average_advice_duration: results.average_advice_duration(),
            extraction,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SeriesExtractor;
    use crate::results::parse_results;
    use pretty_assertions::assert_eq;

    const RUN: &str = r#"
{"deviceInfo": {"baseline": {"meta": {"time": 1000}}, "params": {"heuristics": {}}}}
{"metrics": {"meta": {"time": 2000}, "proc": {"oom_score": 10}, "summary": {"java-heap": 1, "native-heap": 2}}, "testMetrics": {"x": 1}, "advice": {"meta": {"duration": 5}}, "paused": true}
"#;

    fn report(include_groups: bool) -> ChartReport {
        let results = ResultSet::from_records(&parse_results(RUN).unwrap());
        let info = results.require_device_info().unwrap();
        let extraction = SeriesExtractor::for_device(info)
            .extract(&results.samples, &info.baseline)
            .unwrap();
        ChartReport::build(&results, extraction, include_groups)
    }

    #[test]
    fn test_groups_follow_field_order() {
        let report = report(true);
        let prefixes: Vec<_> = report.groups.iter().map(|g| g.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["root", "proc", "summary"]);

        let summary: Vec<_> = report.groups[2].members.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(summary, vec!["java-heap", "native-heap"]);
        assert_eq!(report.average_advice_duration, Some(5.0));
    }

    #[test]
    fn test_serialized_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&report(false).to_json(false).unwrap()).unwrap();
        assert_eq!(json["fields"][0], "Time");
        assert_eq!(json["rows"][0][0], 1.0);
        assert_eq!(json["series"][1]["axis"], "y2");
        assert_eq!(json["averageAdviceDuration"], 5.0);
        assert_eq!(json["intervals"][0]["category"], "paused");
        assert_eq!(json["intervals"][0]["color"], "yellow");
        assert!(json.get("groups").is_none());
    }
}
