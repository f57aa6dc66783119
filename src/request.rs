//! Ticketed service requests and responses.
//!
//! Controllers never call the data service directly. They issue a
//! [`TicketedRequest`] through a dispatcher and later receive a
//! [`ServiceResponse`] carrying the same ticket. Each [`Channel`] keeps a
//! generation counter; a response whose generation is older than the latest
//! issued on its channel is stale and must be dropped.

use std::collections::HashMap;

use vxt_service::{
    DataService, FrameSize, Row, SaveSummary, Sequence, SeriesQuery, ServiceError, VideosetIndex,
    XyzSeries,
};

use crate::annotation::SaveBatch;
use crate::frame_cache::FrameImage;

/// Independent request streams. Only the newest response per channel is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    SubsetList,
    Subset,
    SaveSubset,
    Videosets,
    AnnotationOptions,
    Timestamps,
    TimeseriesOptions,
    Columns,
    Plot,
    AnnotationPoints,
    FrameSize,
    FrameImage,
    Detections,
    Annotations,
    SaveAnnotations,
}

impl Channel {
    /// Whether a newer request makes older in-flight responses obsolete.
    ///
    /// Annotation-option lookups fan out one per sequence and saves each
    /// report their own outcome, so every response on those is applied.
    pub fn supersedes(self) -> bool {
        !matches!(self, Channel::AnnotationOptions | Channel::SaveAnnotations)
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub channel: Channel,
    pub generation: u64,
}

/// Per-channel generation counters.
#[derive(Debug, Default, Clone)]
pub struct RequestTracker {
    latest: HashMap<Channel, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket on `channel`, superseding earlier ones.
    pub fn issue(&mut self, channel: Channel) -> Ticket {
        let generation = self.latest.entry(channel).or_insert(0);
        *generation += 1;
        Ticket {
            channel,
            generation: *generation,
        }
    }

    /// Whether a response for `ticket` should still be applied.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        if !ticket.channel.supersedes() {
            return true;
        }
        self.latest.get(&ticket.channel) == Some(&ticket.generation)
    }

    /// Make every outstanding ticket on `channel` stale.
    pub fn invalidate(&mut self, channel: Channel) {
        *self.latest.entry(channel).or_insert(0) += 1;
    }
}

/// One data-service operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    ListSubsets,
    LoadSubset { name: String },
    SaveSubset { name: String, sequences: Vec<Sequence> },
    ListVideosets,
    AnnotationOptions { videoset: String, camera: String },
    Timestamps(Sequence),
    TimeseriesOptions(Sequence),
    Columns { sequence: Sequence, timeseries: String },
    Plot { sequence: Sequence, query: SeriesQuery },
    AnnotationPoints(Sequence),
    FrameSize { sequence: Sequence, timestamp: f64 },
    FrameImage { sequence: Sequence, timestamp: f64 },
    Detections { sequence: Sequence, timeseries: String, timestamp: f64 },
    Annotations { sequence: Sequence, timestamp: f64 },
    SaveAnnotations(SaveBatch),
}

impl ServiceRequest {
    pub fn channel(&self) -> Channel {
        match self {
            ServiceRequest::ListSubsets => Channel::SubsetList,
            ServiceRequest::LoadSubset { .. } => Channel::Subset,
            ServiceRequest::SaveSubset { .. } => Channel::SaveSubset,
            ServiceRequest::ListVideosets => Channel::Videosets,
            ServiceRequest::AnnotationOptions { .. } => Channel::AnnotationOptions,
            ServiceRequest::Timestamps(_) => Channel::Timestamps,
            ServiceRequest::TimeseriesOptions(_) => Channel::TimeseriesOptions,
            ServiceRequest::Columns { .. } => Channel::Columns,
            ServiceRequest::Plot { .. } => Channel::Plot,
            ServiceRequest::AnnotationPoints(_) => Channel::AnnotationPoints,
            ServiceRequest::FrameSize { .. } => Channel::FrameSize,
            ServiceRequest::FrameImage { .. } => Channel::FrameImage,
            ServiceRequest::Detections { .. } => Channel::Detections,
            ServiceRequest::Annotations { .. } => Channel::Annotations,
            ServiceRequest::SaveAnnotations(_) => Channel::SaveAnnotations,
        }
    }
}

/// A request paired with the ticket it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketedRequest {
    pub ticket: Ticket,
    pub request: ServiceRequest,
}

impl TicketedRequest {
    /// Issue a ticket for `request` on its channel.
    pub fn issue(tracker: &mut RequestTracker, request: ServiceRequest) -> Self {
        Self {
            ticket: tracker.issue(request.channel()),
            request,
        }
    }
}

/// Successful result of a [`ServiceRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServicePayload {
    Subsets(Vec<String>),
    Subset(Vec<Sequence>),
    SubsetSaved,
    Videosets(VideosetIndex),
    AnnotationOptions(Vec<String>),
    Timestamps(Vec<f64>),
    TimeseriesOptions(Vec<String>),
    Columns(Vec<String>),
    Plot(XyzSeries),
    AnnotationPoints(XyzSeries),
    FrameSize(FrameSize),
    FrameImage(FrameImage),
    Detections(Vec<Row>),
    Annotations(Vec<Row>),
    Saved(SaveSummary),
}

/// Outcome of a ticketed request. The original request is echoed back so
/// handlers know which sequence and timestamp the payload belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub ticket: Ticket,
    pub request: ServiceRequest,
    pub result: Result<ServicePayload, ServiceError>,
}

/// Run one request against a data service.
pub fn execute(
    service: &dyn DataService,
    request: &ServiceRequest,
) -> Result<ServicePayload, ServiceError> {
    Ok(match request {
        ServiceRequest::ListSubsets => ServicePayload::Subsets(service.list_subsets()?),
        ServiceRequest::LoadSubset { name } => ServicePayload::Subset(service.load_subset(name)?),
        ServiceRequest::SaveSubset { name, sequences } => {
            service.save_subset(name, sequences)?;
            ServicePayload::SubsetSaved
        }
        ServiceRequest::ListVideosets => ServicePayload::Videosets(service.list_videosets()?),
        ServiceRequest::AnnotationOptions { videoset, camera } => {
            ServicePayload::AnnotationOptions(service.annotation_options(videoset, camera)?)
        }
        ServiceRequest::Timestamps(sequence) => {
            ServicePayload::Timestamps(service.timestamps(sequence)?)
        }
        ServiceRequest::TimeseriesOptions(sequence) => {
            ServicePayload::TimeseriesOptions(service.timeseries_options(sequence)?)
        }
        ServiceRequest::Columns {
            sequence,
            timeseries,
        } => ServicePayload::Columns(service.column_options(sequence, timeseries)?),
        ServiceRequest::Plot { sequence, query } => {
            ServicePayload::Plot(service.timeseries_data(sequence, query)?)
        }
        ServiceRequest::AnnotationPoints(sequence) => {
            ServicePayload::AnnotationPoints(service.annotation_points(sequence)?)
        }
        ServiceRequest::FrameSize {
            sequence,
            timestamp,
        } => ServicePayload::FrameSize(service.frame_size(sequence, *timestamp)?),
        ServiceRequest::FrameImage {
            sequence,
            timestamp,
        } => {
            let bytes = service.frame_image(sequence, *timestamp)?;
            let frame = FrameImage::decode(&bytes)
                .map_err(|e| ServiceError::malformed(format!("frame image: {e}")))?;
            ServicePayload::FrameImage(frame)
        }
        ServiceRequest::Detections {
            sequence,
            timeseries,
            timestamp,
        } => ServicePayload::Detections(service.timeseries_at(sequence, timeseries, *timestamp)?),
        ServiceRequest::Annotations {
            sequence,
            timestamp,
        } => ServicePayload::Annotations(service.annotations_at(sequence, *timestamp)?),
        ServiceRequest::SaveAnnotations(batch) => ServicePayload::Saved(service.save_annotations(
            &batch.sequence,
            batch.timestamp,
            &batch.rows,
        )?),
    })
}

/// Execute a ticketed request, producing its response.
pub fn respond(service: &dyn DataService, ticketed: TicketedRequest) -> ServiceResponse {
    let result = execute(service, &ticketed.request);
    if let Err(e) = &result {
        log::warn!("{:?} request failed: {}", ticketed.ticket.channel, e);
    }
    ServiceResponse {
        ticket: ticketed.ticket,
        request: ticketed.request,
        result,
    }
}
