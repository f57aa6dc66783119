//! Timestamp selection and cross-view synchronization.
//!
//! The [`SyncController`] owns the selected (sequence, timestamp) and the
//! timeseries/column choice. Every change issues fresh ticketed requests for
//! the data derived from it; responses are applied only while their ticket is
//! current and the request still matches the selection.

use vxt_service::{Sequence, SeriesQuery, ServiceError};

use crate::annotation::{BoxScope, DetectionBox, EditableBox, annotations_from_rows, detections_from_rows};
use crate::frame_cache::{FrameImage, FrameKey};
use crate::plot::PlotState;
use crate::request::{
    Channel, RequestTracker, ServicePayload, ServiceRequest, ServiceResponse, TicketedRequest,
};
use crate::status::Widget;
use crate::transform::FrameGeometry;

/// Channels whose data belongs to one selected timestamp.
const TIMESTAMP_CHANNELS: [Channel; 4] = [
    Channel::FrameSize,
    Channel::FrameImage,
    Channel::Detections,
    Channel::Annotations,
];

/// Channels whose data belongs to one sequence.
const SEQUENCE_CHANNELS: [Channel; 5] = [
    Channel::Timestamps,
    Channel::TimeseriesOptions,
    Channel::Columns,
    Channel::Plot,
    Channel::AnnotationPoints,
];

/// State changes the session must apply to other components.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Boxes now belong to this scope
    ScopeChanged(Option<BoxScope>),
    Geometry(FrameGeometry),
    Frame { key: FrameKey, image: FrameImage },
    Detections(Vec<DetectionBox>),
    Annotations(Vec<EditableBox>),
    ClearAnnotations,
    Loaded { widget: Widget, detail: String },
    Failed { widget: Widget, error: ServiceError },
}

/// Requests to dispatch and events to apply after one controller call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncOutput {
    pub requests: Vec<TicketedRequest>,
    pub events: Vec<SyncEvent>,
}

impl SyncOutput {
    fn extend(&mut self, other: SyncOutput) {
        self.requests.extend(other.requests);
        self.events.extend(other.events);
    }
}

#[derive(Debug)]
pub struct SyncController {
    tracker: RequestTracker,
    sequence: Option<Sequence>,
    timestamps: Vec<f64>,
    selected: Option<f64>,
    timeseries: Option<String>,
    y_column: Option<String>,
    z_column: Option<String>,
    show_annotations: bool,
    timeseries_options: Vec<String>,
    columns: Vec<String>,
    plot: PlotState,
}

impl SyncController {
    /// Create a controller with the initial timeseries/column choice.
    pub fn new(
        timeseries: Option<String>,
        y_column: Option<String>,
        z_column: Option<String>,
        show_annotations: bool,
    ) -> Self {
        Self {
            tracker: RequestTracker::new(),
            sequence: None,
            timestamps: Vec::new(),
            selected: None,
            timeseries,
            y_column,
            z_column,
            show_annotations,
            timeseries_options: Vec::new(),
            columns: Vec::new(),
            plot: PlotState::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn selected_timestamp(&self) -> Option<f64> {
        self.selected
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn timeseries(&self) -> Option<&str> {
        self.timeseries.as_deref()
    }

    pub fn y_column(&self) -> Option<&str> {
        self.y_column.as_deref()
    }

    pub fn z_column(&self) -> Option<&str> {
        self.z_column.as_deref()
    }

    pub fn show_annotations(&self) -> bool {
        self.show_annotations
    }

    pub fn timeseries_options(&self) -> &[String] {
        &self.timeseries_options
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn plot(&self) -> &PlotState {
        &self.plot
    }

    /// Scope of the boxes shown for the current selection.
    pub fn scope(&self) -> Option<BoxScope> {
        Some(BoxScope::new(self.sequence.clone()?, self.selected?))
    }

    fn query(&self) -> Option<SeriesQuery> {
        Some(SeriesQuery {
            timeseries: self.timeseries.clone()?,
            y_column: self.y_column.clone(),
            z_column: self.z_column.clone(),
        })
    }

    fn annotations_wanted(&self) -> bool {
        self.show_annotations
            && self
                .sequence
                .as_ref()
                .is_some_and(Sequence::has_annotation_suffix)
    }

    fn issue(&mut self, out: &mut SyncOutput, request: ServiceRequest) {
        out.requests
            .push(TicketedRequest::issue(&mut self.tracker, request));
    }

    // ------------------------------------------------------------------------
    // Selection changes
    // ------------------------------------------------------------------------

    /// Adopt a new sequence (or none). Per-sequence data is dropped and
    /// re-requested; the first frame timestamp becomes the selection once the
    /// timestamp list arrives.
    pub fn set_sequence(&mut self, sequence: Option<Sequence>) -> SyncOutput {
        log::info!(
            "Selecting sequence {:?}",
            sequence.as_ref().map(Sequence::sequence_id)
        );
        for channel in SEQUENCE_CHANNELS.into_iter().chain(TIMESTAMP_CHANNELS) {
            self.tracker.invalidate(channel);
        }
        self.sequence = sequence;
        self.timestamps.clear();
        self.selected = None;
        self.timeseries_options.clear();
        self.columns.clear();
        self.plot.clear_data();
        self.plot.unhover();

        let mut out = SyncOutput::default();
        out.events.push(SyncEvent::ScopeChanged(None));
        out.events.push(SyncEvent::Geometry(FrameGeometry::default()));
        let Some(sequence) = self.sequence.clone() else {
            return out;
        };

        self.issue(&mut out, ServiceRequest::Timestamps(sequence.clone()));
        self.issue(&mut out, ServiceRequest::TimeseriesOptions(sequence.clone()));
        if let Some(timeseries) = self.timeseries.clone() {
            self.issue(&mut out, ServiceRequest::Columns {
                sequence: sequence.clone(),
                timeseries,
            });
        }
        if let Some(query) = self.query() {
            self.issue(&mut out, ServiceRequest::Plot {
                sequence: sequence.clone(),
                query,
            });
        }
        if self.annotations_wanted() {
            self.issue(&mut out, ServiceRequest::AnnotationPoints(sequence));
        }
        out
    }

    /// Select a timestamp and request everything derived from it.
    pub fn select_timestamp(&mut self, timestamp: f64) -> SyncOutput {
        let mut out = SyncOutput::default();
        let Some(sequence) = self.sequence.clone() else {
            log::debug!("Ignoring timestamp {timestamp} without a sequence");
            return out;
        };
        if !timestamp.is_finite() {
            return out;
        }
        log::debug!("Selecting timestamp {timestamp}");
        self.selected = Some(timestamp);
        self.plot.select(timestamp);
        out.events.push(SyncEvent::ScopeChanged(self.scope()));

        self.issue(&mut out, ServiceRequest::FrameSize {
            sequence: sequence.clone(),
            timestamp,
        });
        self.issue(&mut out, ServiceRequest::FrameImage {
            sequence: sequence.clone(),
            timestamp,
        });
        out.extend(self.request_detections());
        out.extend(self.request_annotations());
        out
    }

    fn request_detections(&mut self) -> SyncOutput {
        let mut out = SyncOutput::default();
        match (self.sequence.clone(), self.timeseries.clone(), self.selected) {
            (Some(sequence), Some(timeseries), Some(timestamp)) => {
                self.issue(&mut out, ServiceRequest::Detections {
                    sequence,
                    timeseries,
                    timestamp,
                });
            }
            _ => {
                self.tracker.invalidate(Channel::Detections);
                out.events.push(SyncEvent::Detections(Vec::new()));
            }
        }
        out
    }

    fn request_annotations(&mut self) -> SyncOutput {
        let mut out = SyncOutput::default();
        match (self.sequence.clone(), self.selected) {
            (Some(sequence), Some(timestamp)) if self.annotations_wanted() => {
                self.issue(&mut out, ServiceRequest::Annotations {
                    sequence,
                    timestamp,
                });
            }
            _ => {
                self.tracker.invalidate(Channel::Annotations);
                out.events.push(SyncEvent::ClearAnnotations);
            }
        }
        out
    }

    fn request_series(&mut self) -> SyncOutput {
        let mut out = SyncOutput::default();
        match (self.sequence.clone(), self.query()) {
            (Some(sequence), Some(query)) => {
                self.issue(&mut out, ServiceRequest::Plot { sequence, query });
            }
            _ => {
                self.tracker.invalidate(Channel::Plot);
                self.plot.set_series(&Default::default());
            }
        }
        out.extend(self.request_detections());
        out
    }

    /// Choose the timeseries that feeds the plot and the detection boxes.
    pub fn set_timeseries(&mut self, timeseries: Option<String>) -> SyncOutput {
        if timeseries == self.timeseries {
            return SyncOutput::default();
        }
        log::debug!("Timeseries -> {timeseries:?}");
        self.timeseries = timeseries;
        self.columns.clear();

        let mut out = SyncOutput::default();
        match (self.sequence.clone(), self.timeseries.clone()) {
            (Some(sequence), Some(timeseries)) => {
                self.issue(&mut out, ServiceRequest::Columns {
                    sequence,
                    timeseries,
                });
            }
            _ => self.tracker.invalidate(Channel::Columns),
        }
        out.extend(self.request_series());
        out
    }

    /// Choose the y and z columns of the plot projection.
    pub fn set_columns(&mut self, y_column: Option<String>, z_column: Option<String>) -> SyncOutput {
        if y_column == self.y_column && z_column == self.z_column {
            return SyncOutput::default();
        }
        log::debug!("Columns -> y={y_column:?} z={z_column:?}");
        self.y_column = y_column;
        self.z_column = z_column;
        self.request_series()
    }

    /// Show or hide annotation boxes and annotation points.
    pub fn set_show_annotations(&mut self, show: bool) -> SyncOutput {
        if show == self.show_annotations {
            return SyncOutput::default();
        }
        self.show_annotations = show;
        let mut out = self.refresh_annotation_points();
        out.extend(self.request_annotations());
        out
    }

    /// Re-fetch the annotation-point overlay, e.g. after a save.
    pub fn refresh_annotation_points(&mut self) -> SyncOutput {
        let mut out = SyncOutput::default();
        match self.sequence.clone() {
            Some(sequence) if self.annotations_wanted() => {
                self.issue(&mut out, ServiceRequest::AnnotationPoints(sequence));
            }
            _ => {
                self.tracker.invalidate(Channel::AnnotationPoints);
                self.plot.set_annotation_points(&Default::default());
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Plot coupling
    // ------------------------------------------------------------------------

    /// Pointer over the plot at data-x `x`. Never changes the selection.
    pub fn plot_hover(&mut self, x: f64) {
        self.plot.hover(x);
    }

    pub fn plot_unhover(&mut self) {
        self.plot.unhover();
    }

    /// Click on the plot at data-x `x`.
    pub fn plot_click(&mut self, x: f64) -> SyncOutput {
        self.select_timestamp(x)
    }

    /// Step to the neighbouring frame timestamp. Clamped at either end.
    pub fn step_frame(&mut self, forward: bool) -> SyncOutput {
        let target = match self.selected {
            None => self.timestamps.first().copied(),
            Some(current) if forward => self.timestamps.iter().copied().find(|t| *t > current),
            Some(current) => self.timestamps.iter().rev().copied().find(|t| *t < current),
        };
        match target {
            Some(t) => self.select_timestamp(t),
            None => SyncOutput::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Responses
    // ------------------------------------------------------------------------

    fn is_current_sequence(&self, sequence: &Sequence) -> bool {
        self.sequence.as_ref() == Some(sequence)
    }

    fn is_current_timestamp(&self, sequence: &Sequence, timestamp: f64) -> bool {
        self.is_current_sequence(sequence) && self.selected == Some(timestamp)
    }

    /// Whether the request echoed by a response still matches the selection.
    fn matches_selection(&self, request: &ServiceRequest) -> bool {
        match request {
            ServiceRequest::Timestamps(sequence)
            | ServiceRequest::TimeseriesOptions(sequence)
            | ServiceRequest::AnnotationPoints(sequence) => self.is_current_sequence(sequence),
            ServiceRequest::Columns {
                sequence,
                timeseries,
            } => self.is_current_sequence(sequence) && self.timeseries.as_ref() == Some(timeseries),
            ServiceRequest::Plot { sequence, query } => {
                self.is_current_sequence(sequence) && self.query().as_ref() == Some(query)
            }
            ServiceRequest::FrameSize {
                sequence,
                timestamp,
            }
            | ServiceRequest::FrameImage {
                sequence,
                timestamp,
            }
            | ServiceRequest::Annotations {
                sequence,
                timestamp,
            } => self.is_current_timestamp(sequence, *timestamp),
            ServiceRequest::Detections {
                sequence,
                timeseries,
                timestamp,
            } => {
                self.is_current_timestamp(sequence, *timestamp)
                    && self.timeseries.as_ref() == Some(timeseries)
            }
            _ => false,
        }
    }

    /// Whether this controller consumes responses on `channel`.
    pub fn handles(channel: Channel) -> bool {
        SEQUENCE_CHANNELS.contains(&channel) || TIMESTAMP_CHANNELS.contains(&channel)
    }

    /// Apply a service response. Stale responses are dropped.
    pub fn apply(&mut self, response: ServiceResponse) -> SyncOutput {
        let ServiceResponse {
            ticket,
            request,
            result,
        } = response;
        if !Self::handles(ticket.channel) {
            return SyncOutput::default();
        }
        if !self.tracker.is_current(ticket) || !self.matches_selection(&request) {
            log::debug!("Discarding stale {:?} response", ticket.channel);
            return SyncOutput::default();
        }

        let mut out = SyncOutput::default();
        match (request, result) {
            (ServiceRequest::Timestamps(_), Ok(ServicePayload::Timestamps(timestamps))) => {
                log::info!("Loaded {} frame timestamps", timestamps.len());
                self.timestamps = timestamps;
                if self.timestamps.is_empty() {
                    out.events.push(SyncEvent::Loaded {
                        widget: Widget::Timestamps,
                        detail: "no frames in this sequence".to_string(),
                    });
                } else if self.selected.is_none() {
                    out.extend(self.step_frame(true));
                }
            }
            (ServiceRequest::TimeseriesOptions(_), Ok(ServicePayload::TimeseriesOptions(options))) => {
                self.timeseries_options = options;
                let keep = self
                    .timeseries
                    .as_ref()
                    .is_some_and(|t| self.timeseries_options.contains(t));
                if !keep {
                    let fallback = self.timeseries_options.first().cloned();
                    out.extend(self.set_timeseries(fallback));
                }
            }
            (ServiceRequest::Columns { .. }, Ok(ServicePayload::Columns(columns))) => {
                self.columns = columns;
                let valid = |c: &Option<String>| c.clone().filter(|c| self.columns.contains(c));
                let (y, z) = (valid(&self.y_column), valid(&self.z_column));
                out.events.push(SyncEvent::Loaded {
                    widget: Widget::Columns,
                    detail: format!("{} columns", self.columns.len()),
                });
                out.extend(self.set_columns(y, z));
            }
            (ServiceRequest::Plot { .. }, Ok(ServicePayload::Plot(series))) => {
                self.plot.set_series(&series);
            }
            (ServiceRequest::AnnotationPoints(_), Ok(ServicePayload::AnnotationPoints(points))) => {
                self.plot.set_annotation_points(&points);
            }
            (ServiceRequest::FrameSize { .. }, Ok(ServicePayload::FrameSize(size))) => {
                out.events.push(SyncEvent::Geometry(size.into()));
            }
            (
                ServiceRequest::FrameImage {
                    sequence,
                    timestamp,
                },
                Ok(ServicePayload::FrameImage(image)),
            ) => {
                out.events.push(SyncEvent::Frame {
                    key: FrameKey::new(&sequence, timestamp),
                    image,
                });
            }
            (ServiceRequest::Detections { .. }, Ok(ServicePayload::Detections(rows))) => {
                let boxes = detections_from_rows(&rows, self.z_column.as_deref());
                out.events.push(SyncEvent::Detections(boxes));
            }
            (ServiceRequest::Annotations { .. }, Ok(ServicePayload::Annotations(rows))) => {
                out.events.push(SyncEvent::Annotations(annotations_from_rows(&rows)));
            }
            (request, Err(error)) => out.extend(self.fallback(&request, error)),
            (request, Ok(payload)) => {
                log::warn!("Unexpected payload {payload:?} for {request:?}");
            }
        }
        out
    }

    /// Fall back to an empty or previous-safe value after a failed request.
    fn fallback(&mut self, request: &ServiceRequest, error: ServiceError) -> SyncOutput {
        let mut out = SyncOutput::default();
        let widget = match request {
            ServiceRequest::Timestamps(_) => {
                self.timestamps.clear();
                Widget::Timestamps
            }
            ServiceRequest::TimeseriesOptions(_) => {
                self.timeseries_options.clear();
                Widget::Timeseries
            }
            ServiceRequest::Columns { .. } => {
                self.columns.clear();
                Widget::Columns
            }
            ServiceRequest::Plot { .. } => {
                self.plot.set_series(&Default::default());
                Widget::Plot
            }
            ServiceRequest::AnnotationPoints(_) => {
                self.plot.set_annotation_points(&Default::default());
                if matches!(error, ServiceError::NotFound(_)) {
                    log::debug!("No annotation points for this sequence");
                    return out;
                }
                Widget::Annotations
            }
            // Geometry and frame keep their previous values
            ServiceRequest::FrameSize { .. } | ServiceRequest::FrameImage { .. } => Widget::Frame,
            ServiceRequest::Detections { .. } => {
                out.events.push(SyncEvent::Detections(Vec::new()));
                Widget::Detections
            }
            ServiceRequest::Annotations { .. } => {
                out.events.push(SyncEvent::ClearAnnotations);
                Widget::Annotations
            }
            _ => return out,
        };
        out.events.push(SyncEvent::Failed { widget, error });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockService, png_bytes, rows};

    fn seq() -> Sequence {
        Sequence::new("heath", "visual/cam1", "corrected")
    }

    fn controller() -> SyncController {
        SyncController::new(
            Some("yolo".to_string()),
            Some("confidence".to_string()),
            Some("confidence".to_string()),
            true,
        )
    }

    fn service() -> MockService {
        MockService {
            timestamps: vec![10.0, 20.0, 30.0],
            timeseries_options: vec!["yolo".to_string(), "gps".to_string()],
            columns: vec!["confidence".to_string(), "speed".to_string()],
            detections: rows(
                r#"[{"bbox_x": 1, "bbox_y": 2, "bbox_w": 3, "bbox_h": 4, "label": "car", "confidence": 0.7}]"#,
            ),
            frame_png: png_bytes(2, 2),
            ..MockService::default()
        }
    }

    /// Answer every request until nothing new is issued, collecting events.
    fn settle(sync: &mut SyncController, service: &MockService, out: SyncOutput) -> Vec<SyncEvent> {
        let mut events = out.events;
        let mut pending = out.requests;
        while !pending.is_empty() {
            let mut next = Vec::new();
            for response in service.answer_all(std::mem::take(&mut pending)) {
                let applied = sync.apply(response);
                events.extend(applied.events);
                next.extend(applied.requests);
            }
            pending = next;
        }
        events
    }

    fn channels(out: &SyncOutput) -> Vec<Channel> {
        out.requests.iter().map(|r| r.ticket.channel).collect()
    }

    #[test]
    fn test_sequence_load_selects_first_timestamp() {
        let mut sync = controller();
        let service = service();
        let out = sync.set_sequence(Some(seq()));
        assert_eq!(
            channels(&out),
            vec![
                Channel::Timestamps,
                Channel::TimeseriesOptions,
                Channel::Columns,
                Channel::Plot,
                Channel::AnnotationPoints
            ]
        );

        let events = settle(&mut sync, &service, out);
        assert_eq!(sync.selected_timestamp(), Some(10.0));
        assert_eq!(sync.columns().len(), 2);
        assert!(events.iter().any(|e| matches!(e, SyncEvent::Geometry(g) if g.is_known())));
        assert!(events.iter().any(|e| matches!(e, SyncEvent::Frame { .. })));
        let detections = events.iter().find_map(|e| match e {
            SyncEvent::Detections(d) if !d.is_empty() => Some(d.clone()),
            _ => None,
        });
        assert_eq!(detections.unwrap()[0].z(), Some(0.7));
    }

    #[test]
    fn test_stale_detections_are_discarded() {
        let mut sync = controller();
        let service = service();
        let out = sync.set_sequence(Some(seq()));
        settle(&mut sync, &service, out);

        let t1 = sync.select_timestamp(20.0);
        let t2 = sync.select_timestamp(30.0);

        // t2 resolves first, then the late t1 response arrives
        let mut t2_service = service.clone();
        t2_service.detections = rows(r#"[{"bbox_x": 9, "bbox_y": 9, "bbox_w": 9, "bbox_h": 9, "label": "t2"}]"#);
        let t2_events = settle(&mut sync, &t2_service, t2);
        let t1_events = settle(&mut sync, &service, t1);

        assert!(t2_events.iter().any(|e| matches!(e, SyncEvent::Detections(d) if d[0].label() == "t2")));
        assert!(t1_events
            .iter()
            .all(|e| !matches!(e, SyncEvent::Detections(_) | SyncEvent::Frame { .. } | SyncEvent::Geometry(_))));
    }

    #[test]
    fn test_responses_for_previous_sequence_are_discarded() {
        let mut sync = controller();
        let out = sync.set_sequence(Some(seq()));
        sync.set_sequence(Some(Sequence::new("other", "cam", "Undefined")));
        let late = SyncOutput {
            events: Vec::new(),
            ..out
        };
        let events = settle(&mut sync, &service(), late);
        assert!(events.is_empty());
        assert!(sync.timestamps().is_empty());
    }

    #[test]
    fn test_hover_does_not_select() {
        let mut sync = controller();
        let out = sync_sequence(&mut sync);
        settle(&mut sync, &service(), out);
        sync.plot_hover(25.0);
        assert_eq!(sync.selected_timestamp(), Some(10.0));
        assert_eq!(sync.plot().hovered(), Some(25.0));

        let out = sync.plot_click(25.0);
        assert_eq!(sync.selected_timestamp(), Some(25.0));
        assert_eq!(sync.plot().selected(), Some(25.0));
        assert!(channels(&out).contains(&Channel::Detections));
    }

    fn sync_sequence(sync: &mut SyncController) -> SyncOutput {
        sync.set_sequence(Some(seq()))
    }

    #[test]
    fn test_step_frame_clamps() {
        let mut sync = controller();
        let out = sync_sequence(&mut sync);
        settle(&mut sync, &service(), out);
        sync.step_frame(true);
        sync.step_frame(true);
        assert_eq!(sync.selected_timestamp(), Some(30.0));
        assert!(sync.step_frame(true).requests.is_empty());
        sync.step_frame(false);
        assert_eq!(sync.selected_timestamp(), Some(20.0));
    }

    #[test]
    fn test_hiding_annotations_clears_and_drops_in_flight() {
        let mut sync = controller();
        let service = service();
        let out = sync_sequence(&mut sync);
        settle(&mut sync, &service, out);

        let out = sync.select_timestamp(20.0);
        let hide = sync.set_show_annotations(false);
        assert!(hide.events.contains(&SyncEvent::ClearAnnotations));

        let events = settle(&mut sync, &service, out);
        assert!(events.iter().all(|e| !matches!(e, SyncEvent::Annotations(_))));
    }

    #[test]
    fn test_undefined_suffix_skips_annotations() {
        let mut sync = controller();
        let out = sync.set_sequence(Some(Sequence::new("vs", "cam", "Undefined")));
        assert!(!channels(&out).contains(&Channel::AnnotationPoints));
        let events = settle(&mut sync, &service(), out);
        assert!(events.contains(&SyncEvent::ClearAnnotations));
    }

    #[test]
    fn test_failed_columns_fall_back_and_report() {
        let mut sync = controller();
        let failing = MockService {
            fail: Some(ServiceError::network("down")),
            ..MockService::default()
        };
        let out = sync_sequence(&mut sync);
        let events = settle(&mut sync, &failing, out);
        assert!(events.contains(&SyncEvent::Failed {
            widget: Widget::Columns,
            error: ServiceError::network("down"),
        }));
        assert!(sync.columns().is_empty());
        assert_eq!(sync.selected_timestamp(), None);
    }

    #[test]
    fn test_unknown_timeseries_falls_back_to_first_option() {
        let mut sync = SyncController::new(Some("missing".to_string()), None, None, false);
        let out = sync_sequence(&mut sync);
        settle(&mut sync, &service(), out);
        assert_eq!(sync.timeseries(), Some("yolo"));
    }

    #[test]
    fn test_columns_not_offered_are_dropped() {
        let mut sync = SyncController::new(
            Some("yolo".to_string()),
            Some("altitude".to_string()),
            Some("speed".to_string()),
            false,
        );
        let out = sync_sequence(&mut sync);
        settle(&mut sync, &service(), out);
        assert_eq!(sync.y_column(), None);
        assert_eq!(sync.z_column(), Some("speed"));
    }
}
