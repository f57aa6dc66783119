//! The data-service contract consumed by the review core.

use crate::error::ServiceResult;
use crate::types::{
    AnnotationRow, FrameSize, Row, SaveSummary, Sequence, SeriesQuery, VideosetIndex, XyzSeries,
};

/// Request/response operations offered by the data service.
///
/// Every operation is an idempotent read except [`save_annotations`] and
/// [`save_subset`], which replace stored state. Implementations are moved
/// onto the service worker thread, hence the `Send` bound.
///
/// [`save_annotations`]: DataService::save_annotations
/// [`save_subset`]: DataService::save_subset
pub trait DataService: Send {
    /// Names of all saved subsets.
    fn list_subsets(&self) -> ServiceResult<Vec<String>>;

    /// Ordered sequences of a named subset.
    fn load_subset(&self, name: &str) -> ServiceResult<Vec<Sequence>>;

    /// Store a subset under `name`, replacing any previous one.
    fn save_subset(&self, name: &str, sequences: &[Sequence]) -> ServiceResult<()>;

    /// All videosets and their cameras.
    fn list_videosets(&self) -> ServiceResult<VideosetIndex>;

    /// Annotation file variants available for one videoset/camera.
    fn annotation_options(&self, videoset: &str, camera: &str) -> ServiceResult<Vec<String>>;

    /// Frame timestamps of a sequence, ascending.
    fn timestamps(&self, sequence: &Sequence) -> ServiceResult<Vec<f64>>;

    /// Names of the timeseries tables recorded for a sequence.
    fn timeseries_options(&self, sequence: &Sequence) -> ServiceResult<Vec<String>>;

    /// Column names of one timeseries.
    fn column_options(&self, sequence: &Sequence, timeseries: &str) -> ServiceResult<Vec<String>>;

    /// Timeseries projected to `{timestamp, y, z}`.
    fn timeseries_data(&self, sequence: &Sequence, query: &SeriesQuery)
    -> ServiceResult<XyzSeries>;

    /// Timeseries rows recorded at `timestamp`.
    fn timeseries_at(
        &self,
        sequence: &Sequence,
        timeseries: &str,
        timestamp: f64,
    ) -> ServiceResult<Vec<Row>>;

    /// Annotation points of the sequence's active annotation file.
    fn annotation_points(&self, sequence: &Sequence) -> ServiceResult<XyzSeries>;

    /// Annotation rows of the sequence's active annotation file at `timestamp`.
    fn annotations_at(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<Vec<Row>>;

    /// Native pixel dimensions of the frame nearest to `timestamp`.
    fn frame_size(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<FrameSize>;

    /// Encoded (JPEG) frame nearest to `timestamp`.
    fn frame_image(&self, sequence: &Sequence, timestamp: f64) -> ServiceResult<Vec<u8>>;

    /// Replace the editable annotation rows of `sequence` at `timestamp`.
    fn save_annotations(
        &self,
        sequence: &Sequence,
        timestamp: f64,
        rows: &[AnnotationRow],
    ) -> ServiceResult<SaveSummary>;
}
