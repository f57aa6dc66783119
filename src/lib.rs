//! VXT - Video and Timeseries review core
//!
//! Headless state for reviewing video frames next to a timeseries plot,
//! overlaying detection boxes and editing annotation boxes. All data comes
//! from a remote data service through ticketed, stale-safe requests.

pub mod annotation;
pub mod color_map;
pub mod config;
pub mod constants;
pub mod frame_cache;
pub mod keybindings;
pub mod message;
pub mod navigator;
pub mod plot;
pub mod request;
pub mod session;
pub mod status;
pub mod subset;
pub mod sync;
pub mod transform;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use message::Message;
pub use session::ReviewSession;
pub use worker::{Dispatcher, ServiceWorker};

pub use vxt_service as service;
