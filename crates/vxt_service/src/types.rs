//! Wire types exchanged with the data service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Annotation suffix placeholder for sequences without an annotation file.
pub const UNDEFINED_SUFFIX: &str = "Undefined";

fn default_suffix() -> String {
    UNDEFINED_SUFFIX.to_string()
}

/// One videoset/camera pairing and the annotation file variant in use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub videoset: String,
    pub camera: String,
    #[serde(default = "default_suffix")]
    pub annotation_suffix: String,
}

impl Sequence {
    pub fn new(
        videoset: impl Into<String>,
        camera: impl Into<String>,
        annotation_suffix: impl Into<String>,
    ) -> Self {
        Self {
            videoset: videoset.into(),
            camera: camera.into(),
            annotation_suffix: annotation_suffix.into(),
        }
    }

    /// Unique identifier for the sequence.
    pub fn sequence_id(&self) -> String {
        format!("{}_{}", self.videoset, self.camera)
    }

    /// Whether an annotation file variant is selected.
    pub fn has_annotation_suffix(&self) -> bool {
        !self.annotation_suffix.is_empty() && self.annotation_suffix != UNDEFINED_SUFFIX
    }
}

/// Cameras available for one videoset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideosetEntry {
    #[serde(default)]
    pub cameras: Vec<String>,
}

/// All videosets known to the service, keyed by name.
pub type VideosetIndex = BTreeMap<String, VideosetEntry>;

/// A free-form row of a timeseries or annotation table.
pub type Row = serde_json::Map<String, Value>;

/// Read a numeric field from a row. Numeric strings are accepted.
pub fn row_number(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a field from a row as text. Numbers and booleans are stringified.
pub fn row_string(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Which timeseries and columns to project for the plot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesQuery {
    pub timeseries: String,
    pub y_column: Option<String>,
    pub z_column: Option<String>,
}

/// Column-oriented `{x, y, z}` projection of a table.
///
/// `x` is always the timestamp. `y` and `z` are absent when no column was
/// chosen, and individual entries are `None` where the table holds no value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XyzSeries {
    #[serde(alias = "X")]
    pub x: Vec<f64>,
    #[serde(default, alias = "Y")]
    pub y: Vec<Option<f64>>,
    #[serde(default, alias = "Z")]
    pub z: Vec<Option<f64>>,
}

impl XyzSeries {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Native pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// One editable annotation as sent to the service, in frame-native pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub id: String,
    pub timestamp: f64,
    pub bbox_x: f32,
    pub bbox_y: f32,
    pub bbox_w: f32,
    pub bbox_h: f32,
    pub label: String,
}

/// Outcome of a full-replace annotation save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub kept: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_missing_suffix_is_undefined() {
        let seq: Sequence =
            serde_json::from_str(r#"{"videoset": "heath_0705", "camera": "visual/cam1"}"#)
                .unwrap();
        assert_eq!(seq.annotation_suffix, UNDEFINED_SUFFIX);
        assert!(!seq.has_annotation_suffix());
        assert_eq!(seq.sequence_id(), "heath_0705_visual/cam1");
    }

    #[test]
    fn test_empty_suffix_is_not_set() {
        let seq = Sequence::new("a", "b", "");
        assert!(!seq.has_annotation_suffix());
        assert!(Sequence::new("a", "b", "corrected").has_annotation_suffix());
    }

    #[test]
    fn test_xyz_series_with_nulls_and_uppercase_keys() {
        let series: XyzSeries =
            serde_json::from_str(r#"{"X": [1.0, 2.0], "Y": [0.5, null], "Z": []}"#).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.y, vec![Some(0.5), None]);
        assert!(series.z.is_empty());
    }

    #[test]
    fn test_xyz_series_without_optional_columns() {
        let series: XyzSeries = serde_json::from_str(r#"{"x": [10.0]}"#).unwrap();
        assert!(series.y.is_empty());
        assert!(series.z.is_empty());
    }

    #[test]
    fn test_row_accessors() {
        let row: Row = serde_json::from_str(
            r#"{"bbox_x": 12.5, "bbox_y": "7", "label": 3, "flag": true, "none": null}"#,
        )
        .unwrap();
        assert_eq!(row_number(&row, "bbox_x"), Some(12.5));
        assert_eq!(row_number(&row, "bbox_y"), Some(7.0));
        assert_eq!(row_number(&row, "none"), None);
        assert_eq!(row_string(&row, "label").as_deref(), Some("3"));
        assert_eq!(row_string(&row, "flag").as_deref(), Some("true"));
        assert_eq!(row_string(&row, "missing"), None);
    }
}
