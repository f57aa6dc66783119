//! Message types for the review session.
//!
//! All UI events and actions are represented as messages in the Elm architecture style.

use crate::keybindings::KeyCode;

/// Mouse button of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Messages that can be sent to update session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Image view. Coordinates are display pixels relative to the container
    /// Button pressed over the image
    ImagePointerDown { x: f32, y: f32, button: PointerButton },
    /// Pointer moved over the image
    ImagePointerMove { x: f32, y: f32 },
    /// Button released over the image
    ImagePointerUp { x: f32, y: f32, button: PointerButton },
    /// Pointer left the image
    ImagePointerLeave { x: f32, y: f32 },
    /// Wheel scrolled over the image, positive notches zoom in
    ImageWheel { x: f32, y: f32, notches: f32 },
    /// Double-click resets the view
    ImageDoubleClick,
    /// Image container resized
    ContainerResized { width: f32, height: f32 },

    // Plot
    PlotHover(f64),
    PlotUnhover,
    PlotClick(f64),

    // Keyboard
    KeyPressed(KeyCode),

    // Sequence navigation
    RefreshSubsets,
    LoadSubset(String),
    NextSequence,
    PreviousSequence,
    SelectSequence(usize),

    // Review controls
    SetTimeseries(Option<String>),
    SetColumns { y: Option<String>, z: Option<String> },
    SetShowAnnotations(bool),
    SetAutosave(bool),
    SelectLabel(usize),
    DeleteLastBox,
    RemoveBox(String),
    ResetView,

    // Subset builder
    RefreshVideosets,
    FindMatching { videoset_pattern: String, camera_pattern: String },
    FetchAnnotationOptions,
    ApplySuffix(String),
    RemoveUndefined,
    ClearBuiltSubset,
    SaveBuiltSubset(String),
    /// Review the built list without saving it
    ReviewBuiltSubset(String),
}
