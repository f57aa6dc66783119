//! VXT data-service contract.
//!
//! Defines the request/response surface the review core consumes: the
//! [`DataService`] trait, the wire types it exchanges, the [`ServiceError`]
//! taxonomy, and [`HttpDataService`], a blocking HTTP implementation.

mod config;
mod error;
mod http;
mod service;
mod types;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use http::HttpDataService;
pub use service::DataService;
pub use types::{
    AnnotationRow, FrameSize, Row, SaveSummary, Sequence, SeriesQuery, UNDEFINED_SUFFIX,
    VideosetEntry, VideosetIndex, XyzSeries, row_number, row_string,
};
