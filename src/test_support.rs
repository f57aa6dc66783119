//! In-memory data service and helpers shared by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use vxt_service::{
    AnnotationRow, DataService, FrameSize, Row, SaveSummary, Sequence, SeriesQuery, ServiceError,
    ServiceResult, VideosetIndex, XyzSeries,
};

use crate::annotation::SaveBatch;
use crate::request::{ServiceResponse, TicketedRequest, respond};

/// Canned data service. Writes are recorded in shared logs so a clone moved
/// onto a worker thread can still be inspected.
#[derive(Debug, Clone, Default)]
pub struct MockService {
    pub subsets: BTreeMap<String, Vec<Sequence>>,
    pub videosets: VideosetIndex,
    pub annotation_options: HashMap<(String, String), Vec<String>>,
    pub timestamps: Vec<f64>,
    pub timeseries_options: Vec<String>,
    pub columns: Vec<String>,
    pub series: XyzSeries,
    pub points: XyzSeries,
    pub detections: Vec<Row>,
    pub annotations: Vec<Row>,
    pub frame_png: Vec<u8>,
    /// Returned by every operation when set
    pub fail: Option<ServiceError>,
    pub saves: Arc<Mutex<Vec<SaveBatch>>>,
    pub saved_subsets: Arc<Mutex<Vec<(String, Vec<Sequence>)>>>,
}

impl MockService {
    fn check(&self) -> ServiceResult<()> {
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    pub fn saved_batches(&self) -> Vec<SaveBatch> {
        self.saves.lock().unwrap().clone()
    }

    /// Answer a batch of requests synchronously, in order.
    pub fn answer_all(&self, requests: Vec<TicketedRequest>) -> Vec<ServiceResponse> {
        requests.into_iter().map(|r| respond(self, r)).collect()
    }
}

impl DataService for MockService {
    fn list_subsets(&self) -> ServiceResult<Vec<String>> {
        self.check()?;
        Ok(self.subsets.keys().cloned().collect())
    }

    fn load_subset(&self, name: &str) -> ServiceResult<Vec<Sequence>> {
        self.check()?;
        self.subsets
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("subset {name}")))
    }

    fn save_subset(&self, name: &str, sequences: &[Sequence]) -> ServiceResult<()> {
        self.check()?;
        self.saved_subsets
            .lock()
            .unwrap()
            .push((name.to_string(), sequences.to_vec()));
        Ok(())
    }

    fn list_videosets(&self) -> ServiceResult<VideosetIndex> {
        self.check()?;
        Ok(self.videosets.clone())
    }

    fn annotation_options(&self, videoset: &str, camera: &str) -> ServiceResult<Vec<String>> {
        self.check()?;
        Ok(self
            .annotation_options
            .get(&(videoset.to_string(), camera.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn timestamps(&self, _sequence: &Sequence) -> ServiceResult<Vec<f64>> {
        self.check()?;
        Ok(self.timestamps.clone())
    }

    fn timeseries_options(&self, _sequence: &Sequence) -> ServiceResult<Vec<String>> {
        self.check()?;
        Ok(self.timeseries_options.clone())
    }

    fn column_options(&self, _sequence: &Sequence, _timeseries: &str) -> ServiceResult<Vec<String>> {
        self.check()?;
        Ok(self.columns.clone())
    }

    fn timeseries_data(&self, _sequence: &Sequence, _query: &SeriesQuery) -> ServiceResult<XyzSeries> {
        self.check()?;
        Ok(self.series.clone())
    }

    fn timeseries_at(&self, _sequence: &Sequence, _timeseries: &str, _timestamp: f64) -> ServiceResult<Vec<Row>> {
        self.check()?;
        Ok(self.detections.clone())
    }

    fn annotation_points(&self, _sequence: &Sequence) -> ServiceResult<XyzSeries> {
        self.check()?;
        Ok(self.points.clone())
    }

    fn annotations_at(&self, _sequence: &Sequence, _timestamp: f64) -> ServiceResult<Vec<Row>> {
        self.check()?;
        Ok(self.annotations.clone())
    }

    fn frame_size(&self, _sequence: &Sequence, _timestamp: f64) -> ServiceResult<FrameSize> {
        self.check()?;
        Ok(FrameSize {
            width: 1920,
            height: 1080,
        })
    }

    fn frame_image(&self, _sequence: &Sequence, _timestamp: f64) -> ServiceResult<Vec<u8>> {
        self.check()?;
        Ok(self.frame_png.clone())
    }

    fn save_annotations(
        &self,
        sequence: &Sequence,
        timestamp: f64,
        rows: &[AnnotationRow],
    ) -> ServiceResult<SaveSummary> {
        self.check()?;
        self.saves.lock().unwrap().push(SaveBatch {
            sequence: sequence.clone(),
            timestamp,
            rows: rows.to_vec(),
        });
        Ok(SaveSummary {
            created: rows.len(),
            kept: 0,
        })
    }
}

/// A solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Parse a JSON array of row objects.
pub fn rows(json: &str) -> Vec<Row> {
    serde_json::from_str(json).unwrap()
}
