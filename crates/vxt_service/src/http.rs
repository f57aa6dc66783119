//! Blocking HTTP implementation of [`DataService`].
//!
//! Meant to run on the service worker thread, never on the UI thread.

use reqwest::{StatusCode, Url};
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::service::DataService;
use crate::types::{
    AnnotationRow, FrameSize, Row, SaveSummary, Sequence, SeriesQuery, VideosetEntry,
    VideosetIndex, XyzSeries,
};

/// Camera names contain `/`, which the service expects as `___` in path segments.
fn encode_camera(camera: &str) -> String {
    camera.replace('/', "___")
}

/// Decode a JSON body, mapping failures to [`ServiceError::MalformedResponse`].
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> ServiceResult<T> {
    Ok(serde_json::from_str(body)?)
}

/// Decode a list that may arrive bare (`[...]`) or wrapped (`{"<key>": [...]}`).
pub(crate) fn decode_list<T: DeserializeOwned>(body: &str, key: &str) -> ServiceResult<Vec<T>> {
    match decode::<Value>(body)? {
        list @ Value::Array(_) => Ok(serde_json::from_value(list)?),
        Value::Object(mut map) => match map.remove(key) {
            Some(list) => Ok(serde_json::from_value(list)?),
            None => Err(ServiceError::malformed(format!(
                "expected a list or an object with '{key}'"
            ))),
        },
        other => Err(ServiceError::malformed(format!(
            "expected a list, got {other}"
        ))),
    }
}

/// Decode table rows: a list of objects, a wrapper object, or one bare row.
pub(crate) fn decode_rows(body: &str) -> ServiceResult<Vec<Row>> {
    rows_from_value(decode(body)?)
}

fn rows_from_value(value: Value) -> ServiceResult<Vec<Row>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(ServiceError::malformed(format!(
                    "expected a row object, got {other}"
                ))),
            })
            .collect(),
        Value::Object(mut map) => {
            for key in ["detections", "rows", "annotations"] {
                if let Some(inner) = map.remove(key) {
                    return rows_from_value(inner);
                }
            }
            Ok(vec![map])
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ServiceError::malformed(format!(
            "expected rows, got {other}"
        ))),
    }
}

/// Decode the videoset listing. Accepts `{name: {cameras: [..]}}`,
/// `{name: [..]}` and either of those wrapped in `{"videosets": ..}`.
pub(crate) fn decode_videosets(body: &str) -> ServiceResult<VideosetIndex> {
    let value = match decode::<Value>(body)? {
        Value::Object(mut map) if map.contains_key("videosets") => {
            map.remove("videosets").unwrap_or(Value::Null)
        }
        other => other,
    };
    let Value::Object(map) = value else {
        return Err(ServiceError::malformed("expected a videoset object"));
    };

    map.into_iter()
        .map(|(name, entry)| {
            let entry = match entry {
                Value::Array(_) => VideosetEntry {
                    cameras: serde_json::from_value(entry)?,
                },
                other => serde_json::from_value(other)?,
            };
            Ok((name, entry))
        })
        .collect()
}

/// HTTP client for the data service.
pub struct HttpDataService {
    config: ServiceConfig,
    client: Client,
}

impl HttpDataService {
    /// Build a client for the service described by `config`.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::network(format!("failed to build HTTP client: {e}")))?;
        log::info!("Data service client targeting {}", config.base_url);
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn sequence_query(sequence: &Sequence) -> Vec<(&'static str, String)> {
        vec![
            ("videoset_name", sequence.videoset.clone()),
            ("camera", sequence.camera.clone()),
        ]
    }

    fn checked(response: Response, url: &Url) -> ServiceResult<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::not_found(url.to_string()));
        }
        if !status.is_success() {
            return Err(ServiceError::network(format!("{url} returned {status}")));
        }
        Ok(response)
    }

    fn get_text(&self, path: &[&str], query: &[(&str, String)]) -> ServiceResult<String> {
        let url = self.config.url(path)?;
        log::trace!("GET {url} {query:?}");
        let response = self.client.get(url.clone()).query(query).send()?;
        Ok(Self::checked(response, &url)?.text()?)
    }

    fn post_text<B: Serialize>(&self, path: &[&str], body: &B) -> ServiceResult<String> {
        let url = self.config.url(path)?;
        log::trace!("POST {url}");
        let response = self.client.post(url.clone()).json(body).send()?;
        Ok(Self::checked(response, &url)?.text()?)
    }
}

impl DataService for HttpDataService {
    fn list_subsets(&self) -> ServiceResult<Vec<String>> {
        decode_list(&self.get_text(&["subsets"], &[])?, "subsets")
    }

    fn load_subset(&self, name: &str) -> ServiceResult<Vec<Sequence>> {
        decode_list(&self.get_text(&["subset", name], &[])?, "data")
    }

    fn save_subset(&self, name: &str, sequences: &[Sequence]) -> ServiceResult<()> {
        self.post_text(&["subset"], &json!({ "name": name, "data": sequences }))?;
        Ok(())
    }

    fn list_videosets(&self) -> ServiceResult<VideosetIndex> {
        decode_videosets(&self.get_text(&["videosets"], &[])?)
    }

    fn annotation_options(&self, videoset: &str, camera: &str) -> ServiceResult<Vec<String>> {
        let camera = encode_camera(camera);
        let path = ["annotations", "options", videoset, camera.as_str()];
        decode_list(&self.get_text(&path, &[])?, "options")
    }

    fn timestamps(&self, sequence: &Sequence) -> ServiceResult<Vec<f64>> {
        let body = self.get_text(&["timestamps"], &Self::sequence_query(sequence))?;
        decode_list(&body, "timestamps")
    }

    fn timeseries_options(&self, sequence: &Sequence) -> ServiceResult<Vec<String>> {
        let body = self.get_text(&["timeseries_options"], &Self::sequence_query(sequence))?;
        decode_list(&body, "options")
    }

    fn column_options(&self, sequence: &Sequence, timeseries: &str) -> ServiceResult<Vec<String>> {
        let mut query = Self::sequence_query(sequence);
        query.push(("timeseries_name", timeseries.to_string()));
        decode_list(&self.get_text(&["column_options"], &query)?, "columns")
    }

    fn timeseries_data(
        &self,
        sequence: &Sequence,
        query: &SeriesQuery,
    ) -> ServiceResult<XyzSeries> {
        let mut params = Self::sequence_query(sequence);
        params.push(("timeseries_name", query.timeseries.clone()));
        if let Some(y) = &query.y_column {
            params.push(("y_column", y.clone()));
        }
        if let Some(z) = &query.z_column {
            params.push(("z_column", z.clone()));
        }
        decode(&self.get_text(&["timeseries_data"], &params)?)
    }

    fn timeseries_at(
        &self,
        sequence: &Sequence,
        timeseries: &str,
        timestamp: f64,
    ) -> ServiceResult<Vec<Row>> {
        let mut query = Self::sequence_query(sequence);
        query.push(("timeseries_name", timeseries.to_string()));
        query.push(("timestamp", timestamp.to_string()));
        decode_rows(&self.get_text(&["timeseries_at_timestamp"], &query)?)
    }

    fn annotation_points(&self, sequence: &Sequence) -> ServiceResult<XyzSeries> {
        let mut query = Self::sequence_query(sequence);
        query.push(("annotation_suffix", sequence.annotation_suffix.clone()));
        decode(&self.get_text(&["annotations"], &query)?)
    }

    fn annotations_at(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<Vec<Row>> {
        let mut query = Self::sequence_query(sequence);
        query.push(("annotation_suffix", sequence.annotation_suffix.clone()));
        query.push(("timestamp", timestamp.to_string()));
        decode_rows(&self.get_text(&["annotations_at_timestamp"], &query)?)
    }

    fn frame_size(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<FrameSize> {
        let query = [
            ("videoset", sequence.videoset.clone()),
            ("camera", sequence.camera.clone()),
            ("timestamp", timestamp.to_string()),
        ];
        decode(&self.get_text(&["frame_size"], &query)?)
    }

    fn frame_image(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<Vec<u8>> {
        let camera = encode_camera(&sequence.camera);
        let timestamp = timestamp.to_string();
        let url = self
            .config
            .url(&["frame", sequence.videoset.as_str(), camera.as_str(), timestamp.as_str()])?;
        log::trace!("GET {url}");
        let response = self.client.get(url.clone()).send()?;
        Ok(Self::checked(response, &url)?.bytes()?.to_vec())
    }

    fn save_annotations(
        &self,
        sequence: &Sequence,
        timestamp: f64,
        rows: &[AnnotationRow],
    ) -> ServiceResult<SaveSummary> {
        let body = json!({
            "videoset": sequence.videoset,
            "camera": sequence.camera,
            "annotation_suffix": sequence.annotation_suffix,
            "timestamp": timestamp,
            "rows": rows,
        });
        decode(&self.post_text(&["annotations", "save"], &body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_camera() {
        assert_eq!(encode_camera("visual_halfres/CPFS7_0310"), "visual_halfres___CPFS7_0310");
    }

    #[test]
    fn test_camera_stays_one_segment() {
        let config = ServiceConfig::default();
        let camera = encode_camera("visual/cam 1");
        let url = config.url(&["annotations", "options", "heath#1", camera.as_str()]).unwrap();
        assert_eq!(url.path(), "/annotations/options/heath%231/visual___cam%201");
    }

    #[test]
    fn test_decode_list_bare_and_wrapped() {
        let bare: Vec<f64> = decode_list("[1.5, 2.5]", "timestamps").unwrap();
        let wrapped: Vec<f64> = decode_list(r#"{"timestamps": [1.5, 2.5]}"#, "timestamps").unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn test_decode_list_wrong_key_is_malformed() {
        let result: ServiceResult<Vec<String>> = decode_list(r#"{"cols": []}"#, "columns");
        assert!(matches!(result, Err(ServiceError::MalformedResponse(_))));
    }

    #[test]
    fn test_decode_rows_shapes() {
        let list = decode_rows(r#"[{"bbox_x": 1}, {"bbox_x": 2}]"#).unwrap();
        assert_eq!(list.len(), 2);

        let wrapped = decode_rows(r#"{"detections": [{"bbox_x": 1}]}"#).unwrap();
        assert_eq!(wrapped.len(), 1);

        let single = decode_rows(r#"{"detections": {"bbox_x": 1}}"#).unwrap();
        assert_eq!(single.len(), 1);

        assert!(decode_rows("[1, 2]").is_err());
        assert!(decode_rows("null").unwrap().is_empty());
    }

    #[test]
    fn test_decode_videosets_shapes() {
        let plain = decode_videosets(r#"{"heath": {"cameras": ["a", "b"]}}"#).unwrap();
        assert_eq!(plain["heath"].cameras, vec!["a", "b"]);

        let wrapped = decode_videosets(r#"{"videosets": {"heath": ["a"]}}"#).unwrap();
        assert_eq!(wrapped["heath"].cameras, vec!["a"]);

        assert!(decode_videosets("[]").is_err());
    }

    #[test]
    fn test_save_summary_decoding() {
        let summary: SaveSummary = decode(r#"{"created": 2, "kept": 5}"#).unwrap();
        assert_eq!(summary, SaveSummary { created: 2, kept: 5 });
    }
}
