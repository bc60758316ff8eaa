// ============================================================================
// SERIES REGISTRY
// ============================================================================
// Series are discovered as samples expose new numeric fields. Discovery
// order is column order, and a series is never removed once registered.
// ============================================================================

use ahash::{AHashMap, AHashSet};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    APPLICATION_ALLOCATED, HEURISTIC_STROKE_WIDTH, OOM_SCORE_FIELD, PRIMARY_COLOR,
    PRIMARY_STROKE_WIDTH,
};

// ----------------------------------------------------------------------------
// 2.1 Series
// ----------------------------------------------------------------------------

/// Y axis a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Y,
    Y2,
}

/// A named numeric column with its display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: CompactString,
    /// CSS color
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
}

impl Series {
    pub fn new(name: impl Into<CompactString>) -> Self {
        let name = name.into();
        Self {
            color: hue_color(hue_of(&name)),
            name,
            stroke_width: None,
            axis: None,
        }
    }

    /// Position before the last `/`, or `root` for top-level fields.
    pub fn prefix(&self) -> &str {
        self.name.rsplit_once('/').map_or("root", |(prefix, _)| prefix)
    }

    /// Name after the last `/`.
    pub fn label(&self) -> &str {
        self.name.rsplit_once('/').map_or(self.name.as_str(), |(_, suffix)| suffix)
    }
}

/// Deterministic hue in `0..360` for a field name.
pub fn hue_of(name: &str) -> u16 {
    (xxh3_64(name.as_bytes()) % 360) as u16
}

fn hue_color(hue: u16) -> String {
    format!("hsl({}, 100%, 30%)", hue)
}

// ----------------------------------------------------------------------------
// 2.2 Series Table
// ----------------------------------------------------------------------------

/// Discovery-ordered set of series with name lookup.
#[derive(Debug, Clone, Default)]
pub struct SeriesTable {
    series: Vec<Series>,
    index: AHashMap<CompactString, usize>,
    heuristics: AHashSet<CompactString>,
}

impl SeriesTable {
    /// Fields named in `heuristics` are registered with a wider stroke.
    pub fn new(heuristics: AHashSet<CompactString>) -> Self {
        Self {
            series: Vec::new(),
            index: AHashMap::new(),
            heuristics,
        }
    }

    /// Row column of `name`. Column 0 is time, so series `i` is column `i + 1`.
    #[inline]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|i| i + 1)
    }

    /// Register `name` if unseen. Returns the column and whether it was new.
    pub fn register(&mut self, name: &str) -> (usize, bool) {
        if let Some(column) = self.column(name) {
            return (column, false);
        }
        let mut series = Series::new(name);
        if self.heuristics.contains(name) {
            series.stroke_width = Some(HEURISTIC_STROKE_WIDTH);
        }
        self.index.insert(series.name.clone(), self.series.len());
        self.series.push(series);
        (self.series.len(), true)
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.index.get(name).map(|&i| &self.series[i])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    /// Emphasis applied once all samples are seen: the application
    /// allocation line is drawn black and thick, the OOM score goes on the
    /// secondary axis.
    pub fn apply_final_styling(&mut self) {
        if let Some(&i) = self.index.get(APPLICATION_ALLOCATED) {
            let series = &mut self.series[i];
            series.color = PRIMARY_COLOR.to_string();
            series.stroke_width = Some(PRIMARY_STROKE_WIDTH);
        }
        if let Some(&i) = self.index.get(OOM_SCORE_FIELD) {
            self.series[i].axis = Some(Axis::Y2);
        }
    }

    pub fn into_series(self) -> Vec<Series> {
        self.series
    }
}
