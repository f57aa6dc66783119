//! Global constants for the VXT review core

/// Viewport zoom limits and step.
pub mod zoom {
    /// Minimum zoom (whole frame visible)
    pub const MIN: f32 = 1.0;
    /// Maximum zoom
    pub const MAX: f32 = 5.0;
    /// Zoom factor applied per wheel notch
    pub const WHEEL_FACTOR: f32 = 1.1;
}

/// Smallest drag, in display pixels, that commits a drawn box.
pub const MIN_BOX_DISPLAY_SIZE: f32 = 5.0;

/// Number of decoded frames kept in memory.
pub const DEFAULT_FRAME_CACHE_SIZE: usize = 100;

/// Status messages older than this are no longer shown.
pub const STATUS_MESSAGE_SECS: u64 = 6;

/// Label given to new boxes when no label list is configured.
pub const DEFAULT_LABEL: &str = "object";

/// Fallback colors (RGBA, 0-1) for entities without a z value.
pub mod colors {
    /// Detection boxes and plot markers without z
    pub const DETECTION: [f32; 4] = [0.95, 0.3, 0.25, 1.0];
    /// Boxes loaded from the annotation file
    pub const ANNOTATION: [f32; 4] = [0.2, 0.85, 0.35, 1.0];
    /// Boxes drawn in this session
    pub const MANUAL: [f32; 4] = [1.0, 0.65, 0.0, 1.0];
    /// Annotation points on the plot
    pub const ANNOTATION_POINT: [f32; 4] = [0.2, 0.85, 0.35, 1.0];
}
