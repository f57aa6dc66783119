//! Bounding boxes and the box-editing state machine.
//!
//! Boxes come from three origins:
//! - detections: machine output, read-only, never persisted
//! - annotations: rows of the active annotation file, editable
//! - manual: drawn in this session, editable
//!
//! Detections are a separate type without any mutation or removal API, so
//! they cannot reach the persistence path. Editable boxes are scoped to the
//! (sequence, timestamp) they were loaded or drawn at.

use std::collections::HashMap;

use uuid::Uuid;
use vxt_service::{AnnotationRow, Row, Sequence, row_number, row_string};

use crate::color_map::{Color, ZDomain, color_in};
use crate::constants::{DEFAULT_LABEL, MIN_BOX_DISPLAY_SIZE, colors};
use crate::transform::{CoordinateTransform, FramePoint, LayerRect, ScreenPoint};

/// Unique identifier for a box.
pub type BoxId = String;

// ============================================================================
// Geometry
// ============================================================================

/// An axis-aligned box in frame-native pixels. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a box from a corner and a signed size, flipping the corner
    /// where the size is negative.
    pub fn from_signed(x: f32, y: f32, width: f32, height: f32) -> Self {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 { (y + height, -height) } else { (y, height) };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, p: FramePoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Read `bbox_x, bbox_y, bbox_w, bbox_h` from a row.
    fn from_row(row: &Row) -> Option<Self> {
        let field = |key: &str| row_number(row, key).map(|v| v as f32);
        Some(Self::from_signed(
            field("bbox_x")?,
            field("bbox_y")?,
            field("bbox_w")?,
            field("bbox_h")?,
        ))
    }
}

// ============================================================================
// Box Types
// ============================================================================

/// Where a box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxOrigin {
    Detection,
    Annotation,
    Manual,
}

impl BoxOrigin {
    /// Whether boxes of this origin can be removed and persisted.
    pub fn is_editable(self) -> bool {
        !matches!(self, BoxOrigin::Detection)
    }

    pub fn name(self) -> &'static str {
        match self {
            BoxOrigin::Detection => "detection",
            BoxOrigin::Annotation => "annotation",
            BoxOrigin::Manual => "manual",
        }
    }
}

/// Origin of an editable box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableOrigin {
    Annotation,
    Manual,
}

impl From<EditableOrigin> for BoxOrigin {
    fn from(origin: EditableOrigin) -> Self {
        match origin {
            EditableOrigin::Annotation => BoxOrigin::Annotation,
            EditableOrigin::Manual => BoxOrigin::Manual,
        }
    }
}

/// A machine detection. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
    id: BoxId,
    bbox: BoundingBox,
    label: String,
    z: Option<f64>,
}

impl DetectionBox {
    pub fn new(id: impl Into<BoxId>, bbox: BoundingBox, label: impl Into<String>, z: Option<f64>) -> Self {
        Self {
            id: id.into(),
            bbox,
            label: label.into(),
            z,
        }
    }

    /// Build a detection from a timeseries row. `index` names rows without an id;
    /// `z_column` picks the value used for coloring.
    pub fn from_row(row: &Row, index: usize, z_column: Option<&str>) -> Option<Self> {
        let bbox = BoundingBox::from_row(row)?;
        let label = row_string(row, "label")?;
        let id = row_string(row, "id").unwrap_or_else(|| format!("det-{index}"));
        let z = z_column.and_then(|column| row_number(row, column));
        Some(Self::new(id, bbox, label, z))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn z(&self) -> Option<f64> {
        self.z
    }
}

/// Convert detection rows, skipping rows that lack a bbox field or label.
pub fn detections_from_rows(rows: &[Row], z_column: Option<&str>) -> Vec<DetectionBox> {
    let boxes: Vec<_> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| DetectionBox::from_row(row, i, z_column))
        .collect();
    if boxes.len() < rows.len() {
        log::warn!(
            "Skipped {} detection rows without bbox_x/bbox_y/bbox_w/bbox_h/label",
            rows.len() - boxes.len()
        );
    }
    boxes
}

/// An annotation or manual box.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableBox {
    pub id: BoxId,
    pub bbox: BoundingBox,
    pub label: String,
    pub origin: EditableOrigin,
    /// Insertion order within the editor, used by "delete last" and hit testing
    order: u64,
}

impl EditableBox {
    pub fn new(id: impl Into<BoxId>, bbox: BoundingBox, label: impl Into<String>, origin: EditableOrigin) -> Self {
        Self {
            id: id.into(),
            bbox,
            label: label.into(),
            origin,
            order: 0,
        }
    }

    /// Build an annotation box from an annotation row. Rows without an id get a fresh one.
    pub fn from_annotation_row(row: &Row) -> Option<Self> {
        let bbox = BoundingBox::from_row(row)?;
        let label = row_string(row, "label")?;
        let id = row_string(row, "id").unwrap_or_else(fresh_id);
        Some(Self::new(id, bbox, label, EditableOrigin::Annotation))
    }

    /// Wire representation for a save.
    pub fn to_row(&self, timestamp: f64) -> AnnotationRow {
        AnnotationRow {
            id: self.id.clone(),
            timestamp,
            bbox_x: self.bbox.x,
            bbox_y: self.bbox.y,
            bbox_w: self.bbox.width,
            bbox_h: self.bbox.height,
            label: self.label.clone(),
        }
    }
}

/// Convert annotation rows, skipping rows that lack a bbox field or label.
pub fn annotations_from_rows(rows: &[Row]) -> Vec<EditableBox> {
    let boxes: Vec<_> = rows.iter().filter_map(EditableBox::from_annotation_row).collect();
    if boxes.len() < rows.len() {
        log::warn!(
            "Skipped {} annotation rows without bbox_x/bbox_y/bbox_w/bbox_h/label",
            rows.len() - boxes.len()
        );
    }
    boxes
}

fn fresh_id() -> BoxId {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Scope and Persistence
// ============================================================================

/// The sequence and timestamp a set of editable boxes belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScope {
    pub sequence: Sequence,
    pub timestamp: f64,
}

impl BoxScope {
    pub fn new(sequence: Sequence, timestamp: f64) -> Self {
        Self {
            sequence,
            timestamp,
        }
    }

    fn key(&self) -> ScopeKey {
        ScopeKey {
            sequence_id: self.sequence.sequence_id(),
            suffix: self.sequence.annotation_suffix.clone(),
            timestamp_bits: self.timestamp.to_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScopeKey {
    sequence_id: String,
    suffix: String,
    timestamp_bits: u64,
}

/// A full replacement set of editable rows for one scope, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveBatch {
    pub sequence: Sequence,
    pub timestamp: f64,
    pub rows: Vec<AnnotationRow>,
}

// ============================================================================
// Drawing State Machine
// ============================================================================

/// An in-progress freehand box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draft {
    origin_screen: ScreenPoint,
    current_screen: ScreenPoint,
    origin_frame: FramePoint,
    /// Signed frame-space size, `current - origin`
    width: f32,
    height: f32,
}

impl Draft {
    fn update(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) {
        let frame = transform.screen_to_frame(screen);
        self.current_screen = screen;
        self.width = frame.x - self.origin_frame.x;
        self.height = frame.y - self.origin_frame.y;
    }

    /// Size of the drag in display pixels.
    fn display_size(&self) -> (f32, f32) {
        (
            (self.current_screen.x - self.origin_screen.x).abs(),
            (self.current_screen.y - self.origin_screen.y).abs(),
        )
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox::from_signed(self.origin_frame.x, self.origin_frame.y, self.width, self.height)
    }
}

/// Drawing state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing(Draft),
}

/// Result of feeding a pointer event to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// Event did not apply in the current state
    Ignored,
    /// Editing is locked until the scope's annotations have loaded
    Locked,
    /// A draft box was started
    Started,
    /// The draft box was resized
    Updated,
    /// The drag was too small and produced no box
    Discarded,
    /// A manual box was added; `save` holds the new editable set
    Committed { id: BoxId, save: SaveBatch },
}

/// A box prepared for drawing on the overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBox {
    pub id: BoxId,
    pub origin: BoxOrigin,
    pub label: String,
    pub rect: LayerRect,
    pub color: Color,
    /// Whether the box reacts to the remove gesture
    pub removable: bool,
}

/// Owns every box shown on the current frame and all user edits.
#[derive(Debug, Clone)]
pub struct BoxEditor {
    scope: Option<BoxScope>,
    detections: Vec<DetectionBox>,
    annotations: Vec<EditableBox>,
    annotations_loaded: bool,
    manual: HashMap<ScopeKey, Vec<EditableBox>>,
    draw: DrawState,
    label: String,
    next_order: u64,
}

impl Default for BoxEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxEditor {
    pub fn new() -> Self {
        Self {
            scope: None,
            detections: Vec::new(),
            annotations: Vec::new(),
            annotations_loaded: false,
            manual: HashMap::new(),
            draw: DrawState::Idle,
            label: DEFAULT_LABEL.to_string(),
            next_order: 0,
        }
    }

    pub fn scope(&self) -> Option<&BoxScope> {
        self.scope.as_ref()
    }

    /// Switch to another (sequence, timestamp). Detection and annotation sets
    /// belong to the old scope and are dropped; manual boxes stay stored
    /// under their own scope.
    pub fn set_scope(&mut self, scope: Option<BoxScope>) {
        let changed = match (&self.scope, &scope) {
            (Some(old), Some(new)) => old.key() != new.key(),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return;
        }
        log::debug!(
            "Box scope -> {:?}",
            scope.as_ref().map(|s| (s.sequence.sequence_id(), s.timestamp))
        );
        self.scope = scope;
        self.detections.clear();
        self.annotations.clear();
        self.annotations_loaded = false;
        self.draw = DrawState::Idle;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label given to the next committed box.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn draw_state(&self) -> DrawState {
        self.draw
    }

    fn take_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    // ------------------------------------------------------------------------
    // Reload replacement
    // ------------------------------------------------------------------------

    /// Replace the detection set wholesale.
    pub fn replace_detections(&mut self, detections: Vec<DetectionBox>) {
        log::debug!("Replacing detections: {} boxes", detections.len());
        self.detections = detections;
    }

    /// Replace the annotation set wholesale. Manual boxes are untouched; an
    /// incoming row sharing an id with a manual box of this scope is dropped.
    pub fn replace_annotations(&mut self, annotations: Vec<EditableBox>) {
        let manual_ids: Vec<BoxId> = self.manual_in_scope().iter().map(|b| b.id.clone()).collect();
        let mut replaced = Vec::with_capacity(annotations.len());
        for mut annotation in annotations {
            if manual_ids.contains(&annotation.id) {
                continue;
            }
            annotation.origin = EditableOrigin::Annotation;
            annotation.order = self.take_order();
            replaced.push(annotation);
        }
        log::debug!("Replacing annotations: {} boxes", replaced.len());
        self.annotations = replaced;
        self.annotations_loaded = true;
    }

    /// Drop the annotation set (annotations hidden or unavailable). Editing
    /// stays locked until the next successful reload.
    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
        self.annotations_loaded = false;
        self.draw = DrawState::Idle;
    }

    /// Whether boxes of the current scope may be drawn or removed. Every edit
    /// replaces the stored rows of the scope, so the stored rows must be known.
    pub fn is_editable(&self) -> bool {
        self.scope.is_some() && self.annotations_loaded
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn detections(&self) -> &[DetectionBox] {
        &self.detections
    }

    fn manual_in_scope(&self) -> &[EditableBox] {
        self.scope
            .as_ref()
            .and_then(|scope| self.manual.get(&scope.key()))
            .map_or(&[], Vec::as_slice)
    }

    /// Annotation and manual boxes of the current scope. Stored annotations
    /// come first, then manual boxes in the order they were drawn.
    pub fn editable_boxes(&self) -> Vec<&EditableBox> {
        let mut boxes: Vec<&EditableBox> =
            self.annotations.iter().chain(self.manual_in_scope()).collect();
        boxes.sort_by_key(|b| (b.origin == EditableOrigin::Manual, b.order));
        boxes
    }

    /// Total number of manual boxes across all scopes.
    pub fn manual_count(&self) -> usize {
        self.manual.values().map(Vec::len).sum()
    }

    /// The full editable set of the current scope as a save batch. `None`
    /// while the scope's annotations are not loaded, so a save never replaces
    /// stored rows it has not seen.
    pub fn save_batch(&self) -> Option<SaveBatch> {
        let scope = self.scope.as_ref()?;
        if !self.annotations_loaded {
            log::debug!("No save batch: annotations of the current scope are not loaded");
            return None;
        }
        Some(SaveBatch {
            sequence: scope.sequence.clone(),
            timestamp: scope.timestamp,
            rows: self
                .editable_boxes()
                .into_iter()
                .map(|b| b.to_row(scope.timestamp))
                .collect(),
        })
    }

    // ------------------------------------------------------------------------
    // Pointer gestures
    // ------------------------------------------------------------------------

    /// Primary button pressed on the image.
    pub fn pointer_down(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) -> DrawOutcome {
        if self.scope.is_none() || matches!(self.draw, DrawState::Drawing(_)) {
            return DrawOutcome::Ignored;
        }
        if !self.annotations_loaded {
            return DrawOutcome::Locked;
        }
        let frame = transform.screen_to_frame(screen);
        self.draw = DrawState::Drawing(Draft {
            origin_screen: screen,
            current_screen: screen,
            origin_frame: frame,
            width: 0.0,
            height: 0.0,
        });
        log::trace!("Drawing started at frame ({:.1}, {:.1})", frame.x, frame.y);
        DrawOutcome::Started
    }

    /// Pointer moved over the image.
    pub fn pointer_move(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) -> DrawOutcome {
        match &mut self.draw {
            DrawState::Drawing(draft) => {
                draft.update(screen, transform);
                DrawOutcome::Updated
            }
            DrawState::Idle => DrawOutcome::Ignored,
        }
    }

    /// Primary button released (pointer-leave is handled identically).
    pub fn pointer_up(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) -> DrawOutcome {
        let DrawState::Drawing(mut draft) = self.draw else {
            return DrawOutcome::Ignored;
        };
        self.draw = DrawState::Idle;
        draft.update(screen, transform);

        let (display_w, display_h) = draft.display_size();
        if display_w < MIN_BOX_DISPLAY_SIZE || display_h < MIN_BOX_DISPLAY_SIZE {
            log::debug!("Discarded {display_w:.1}x{display_h:.1}px drag");
            return DrawOutcome::Discarded;
        }

        let Some(key) = self.scope.as_ref().map(BoxScope::key) else {
            return DrawOutcome::Discarded;
        };
        let mut manual = EditableBox::new(fresh_id(), draft.bbox(), self.label.clone(), EditableOrigin::Manual);
        manual.order = self.take_order();
        let id = manual.id.clone();
        log::debug!("Committed manual box {} {:?}", id, manual.bbox);
        self.manual.entry(key).or_default().push(manual);

        match self.save_batch() {
            Some(save) => DrawOutcome::Committed { id, save },
            None => DrawOutcome::Discarded,
        }
    }

    /// Pointer left the image while drawing.
    pub fn pointer_leave(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) -> DrawOutcome {
        self.pointer_up(screen, transform)
    }

    /// Abandon the current draft without committing.
    pub fn cancel_drawing(&mut self) {
        self.draw = DrawState::Idle;
    }

    /// The draft box on the overlay layer, normalized.
    pub fn draft_rect(&self, transform: &CoordinateTransform) -> Option<LayerRect> {
        match self.draw {
            DrawState::Drawing(draft) => {
                let b = draft.bbox();
                Some(transform.frame_rect_to_layer(b.x, b.y, b.width, b.height))
            }
            DrawState::Idle => None,
        }
    }

    // ------------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------------

    /// Right-click on the image: remove the topmost editable box under the
    /// pointer. Detection boxes do not react.
    pub fn context_click(&mut self, screen: ScreenPoint, transform: &CoordinateTransform) -> Option<SaveBatch> {
        let point = transform.screen_to_frame(screen);
        let hit = self
            .editable_boxes()
            .into_iter()
            .rev()
            .find(|b| b.bbox.contains(point))
            .map(|b| b.id.clone());
        match hit {
            Some(id) => self.remove(&id),
            None => {
                if self.detections.iter().any(|d| d.bbox.contains(point)) {
                    log::debug!("Right-click on a detection box ignored");
                }
                None
            }
        }
    }

    /// Remove an editable box by id. Unknown ids (including detection ids) are
    /// ignored, and nothing is removed while editing is locked.
    pub fn remove(&mut self, id: &str) -> Option<SaveBatch> {
        if !self.is_editable() {
            log::debug!("Not removing {id}: annotations of the current scope are not loaded");
            return None;
        }
        let before = self.annotations.len();
        self.annotations.retain(|b| b.id != id);
        let mut removed = self.annotations.len() != before;

        if !removed {
            if let Some(key) = self.scope.as_ref().map(BoxScope::key) {
                if let Some(boxes) = self.manual.get_mut(&key) {
                    let before = boxes.len();
                    boxes.retain(|b| b.id != id);
                    removed = boxes.len() != before;
                }
            }
        }

        if !removed {
            return None;
        }
        log::debug!("Removed box {id}");
        self.save_batch()
    }

    /// Remove the most recently added editable box of the current scope.
    pub fn delete_last(&mut self) -> Option<SaveBatch> {
        let id = self.editable_boxes().last().map(|b| b.id.clone())?;
        self.remove(&id)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// All boxes of the current scope in overlay-layer coordinates.
    /// Detections are colored by z within `domain`.
    pub fn render(&self, transform: &CoordinateTransform, domain: Option<ZDomain>) -> Vec<RenderedBox> {
        let detection_fallback = Color::from_array(colors::DETECTION);
        let detections = self.detections.iter().map(|d| RenderedBox {
            id: d.id.clone(),
            origin: BoxOrigin::Detection,
            label: d.label.clone(),
            rect: transform.frame_rect_to_layer(d.bbox.x, d.bbox.y, d.bbox.width, d.bbox.height),
            color: color_in(domain, d.z, detection_fallback),
            removable: false,
        });
        let editable = self.editable_boxes().into_iter().map(|b| RenderedBox {
            id: b.id.clone(),
            origin: b.origin.into(),
            label: b.label.clone(),
            rect: transform.frame_rect_to_layer(b.bbox.x, b.bbox.y, b.bbox.width, b.bbox.height),
            color: Color::from_array(match b.origin {
                EditableOrigin::Annotation => colors::ANNOTATION,
                EditableOrigin::Manual => colors::MANUAL,
            }),
            removable: true,
        });
        detections.chain(editable).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ContainerSize, FrameGeometry, Viewport};

    fn seq() -> Sequence {
        Sequence::new("heath_0705", "visual/cam1", "corrected")
    }

    /// 960x540 container showing a 1920x1080 frame: frame = 2 * screen.
    fn half_scale() -> CoordinateTransform {
        CoordinateTransform::new(
            ContainerSize::new(960.0, 540.0),
            FrameGeometry::new(1920.0, 1080.0),
            Viewport::identity(),
        )
    }

    /// Editor on a scope whose (empty) annotation set has loaded.
    fn editor_at(timestamp: f64) -> BoxEditor {
        let mut editor = BoxEditor::new();
        editor.set_scope(Some(BoxScope::new(seq(), timestamp)));
        editor.replace_annotations(Vec::new());
        editor
    }

    fn drag(editor: &mut BoxEditor, t: &CoordinateTransform, from: (f32, f32), to: (f32, f32)) -> DrawOutcome {
        editor.pointer_down(ScreenPoint::new(from.0, from.1), t);
        editor.pointer_move(ScreenPoint::new(to.0, to.1), t);
        editor.pointer_up(ScreenPoint::new(to.0, to.1), t)
    }

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    fn detection(id: &str, x: f32) -> DetectionBox {
        DetectionBox::new(id, BoundingBox::from_signed(x, 0.0, 100.0, 100.0), "car", Some(0.5))
    }

    #[test]
    fn test_small_drag_is_discarded() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        assert_eq!(drag(&mut editor, &t, (100.0, 100.0), (104.0, 104.0)), DrawOutcome::Discarded);
        assert!(editor.editable_boxes().is_empty());
        assert_eq!(editor.draw_state(), DrawState::Idle);
    }

    #[test]
    fn test_drag_commits_in_frame_coordinates() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.set_label("person");

        let outcome = drag(&mut editor, &t, (100.0, 100.0), (200.0, 150.0));
        let DrawOutcome::Committed { id, save } = outcome else {
            panic!("expected commit, got {outcome:?}");
        };

        assert_eq!(save.rows.len(), 1);
        let row = &save.rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.label, "person");
        assert_eq!((row.bbox_x, row.bbox_y, row.bbox_w, row.bbox_h), (200.0, 200.0, 200.0, 100.0));
        assert_eq!(row.timestamp, 1.0);
        assert_eq!(save.sequence, seq());
    }

    #[test]
    fn test_reverse_drag_is_normalized() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        let DrawOutcome::Committed { save, .. } = drag(&mut editor, &t, (200.0, 150.0), (100.0, 100.0)) else {
            panic!("expected commit");
        };
        let row = &save.rows[0];
        assert_eq!((row.bbox_x, row.bbox_y, row.bbox_w, row.bbox_h), (200.0, 200.0, 200.0, 100.0));
    }

    #[test]
    fn test_size_threshold_uses_display_pixels() {
        // At zoom 5 a 6px drag is ~2.4 frame px at this letterbox, still committed
        let t = CoordinateTransform::new(
            ContainerSize::new(800.0, 600.0),
            FrameGeometry::new(1920.0, 1080.0),
            Viewport::new(5.0, 0.0, 0.0),
        );
        let mut editor = editor_at(1.0);
        assert!(matches!(
            drag(&mut editor, &t, (300.0, 300.0), (306.0, 306.0)),
            DrawOutcome::Committed { .. }
        ));
    }

    #[test]
    fn test_pointer_leave_commits_like_pointer_up() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.pointer_down(ScreenPoint::new(10.0, 10.0), &t);
        editor.pointer_move(ScreenPoint::new(60.0, 40.0), &t);
        assert!(matches!(
            editor.pointer_leave(ScreenPoint::new(80.0, 50.0), &t),
            DrawOutcome::Committed { .. }
        ));
        assert_eq!(editor.pointer_up(ScreenPoint::new(0.0, 0.0), &t), DrawOutcome::Ignored);
    }

    #[test]
    fn test_draft_keeps_sign_until_release() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.pointer_down(ScreenPoint::new(100.0, 100.0), &t);
        editor.pointer_move(ScreenPoint::new(50.0, 80.0), &t);
        let DrawState::Drawing(draft) = editor.draw_state() else {
            panic!("expected drawing");
        };
        assert_eq!((draft.width, draft.height), (-100.0, -40.0));

        let rect = editor.draft_rect(&t).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (50.0, 80.0, 50.0, 20.0));
    }

    #[test]
    fn test_no_drawing_without_scope() {
        let t = half_scale();
        let mut editor = BoxEditor::new();
        assert_eq!(editor.pointer_down(ScreenPoint::new(1.0, 1.0), &t), DrawOutcome::Ignored);
    }

    #[test]
    fn test_detections_never_persisted_and_ignore_right_click() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.replace_detections(vec![detection("d1", 0.0)]);

        // Right-click inside the detection (frame 50,50 = screen 25,25)
        assert_eq!(editor.context_click(ScreenPoint::new(25.0, 25.0), &t), None);
        assert_eq!(editor.remove("d1"), None);
        assert_eq!(editor.detections().len(), 1);

        let DrawOutcome::Committed { save, .. } = drag(&mut editor, &t, (300.0, 300.0), (400.0, 400.0)) else {
            panic!("expected commit");
        };
        assert!(save.rows.iter().all(|r| r.id != "d1"));
        assert_eq!(save.rows.len(), 1);
    }

    #[test]
    fn test_right_click_removes_topmost_editable() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.replace_annotations(annotations_from_rows(&[row(
            r#"{"id": "a1", "bbox_x": 0, "bbox_y": 0, "bbox_w": 400, "bbox_h": 400, "label": "car"}"#,
        )]));
        let DrawOutcome::Committed { id: manual_id, .. } =
            drag(&mut editor, &t, (50.0, 50.0), (150.0, 150.0))
        else {
            panic!("expected commit");
        };

        // Both boxes contain screen (60,60); the manual box was added last
        let save = editor.context_click(ScreenPoint::new(60.0, 60.0), &t).unwrap();
        assert_eq!(save.rows.len(), 1);
        assert_eq!(save.rows[0].id, "a1");
        assert!(editor.editable_boxes().iter().all(|b| b.id != manual_id));

        let save = editor.context_click(ScreenPoint::new(60.0, 60.0), &t).unwrap();
        assert!(save.rows.is_empty());
        assert_eq!(editor.context_click(ScreenPoint::new(60.0, 60.0), &t), None);
    }

    #[test]
    fn test_delete_last_removes_latest_drawn_box() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        let DrawOutcome::Committed { id: first, .. } = drag(&mut editor, &t, (10.0, 10.0), (60.0, 60.0)) else {
            panic!("expected commit");
        };
        let DrawOutcome::Committed { id: second, .. } = drag(&mut editor, &t, (100.0, 10.0), (160.0, 60.0)) else {
            panic!("expected commit");
        };

        // Leave the timestamp and come back; the reload still sorts before drawn boxes
        editor.set_scope(Some(BoxScope::new(seq(), 2.0)));
        editor.set_scope(Some(BoxScope::new(seq(), 1.0)));
        editor.replace_annotations(annotations_from_rows(&[row(
            r#"{"id": "a1", "bbox_x": 0, "bbox_y": 0, "bbox_w": 10, "bbox_h": 10, "label": "car"}"#,
        )]));

        let save = editor.delete_last().unwrap();
        let ids: Vec<&str> = save.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", first.as_str()]);
        assert!(editor.editable_boxes().iter().all(|b| b.id != second));

        editor.delete_last();
        let save = editor.delete_last().unwrap();
        assert!(save.rows.is_empty());
        assert_eq!(editor.delete_last(), None);
    }

    #[test]
    fn test_reload_replaces_annotations_but_keeps_manual() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.replace_annotations(annotations_from_rows(&[row(
            r#"{"id": "a1", "bbox_x": 0, "bbox_y": 0, "bbox_w": 10, "bbox_h": 10, "label": "car"}"#,
        )]));
        let DrawOutcome::Committed { id: manual_id, .. } =
            drag(&mut editor, &t, (100.0, 100.0), (200.0, 200.0))
        else {
            panic!("expected commit");
        };

        // Reload returns the saved manual box as an annotation row plus a new row
        let reloaded = format!(
            r#"[{{"id": "{manual_id}", "bbox_x": 200, "bbox_y": 200, "bbox_w": 200, "bbox_h": 200, "label": "object"}},
                {{"id": "a2", "bbox_x": 5, "bbox_y": 5, "bbox_w": 10, "bbox_h": 10, "label": "bus"}}]"#
        );
        let rows: Vec<Row> = serde_json::from_str(&reloaded).unwrap();
        editor.replace_annotations(annotations_from_rows(&rows));

        let boxes = editor.editable_boxes();
        assert_eq!(boxes.len(), 2);
        assert!(boxes.iter().any(|b| b.id == manual_id && b.origin == EditableOrigin::Manual));
        assert!(boxes.iter().any(|b| b.id == "a2"));
        assert!(boxes.iter().all(|b| b.id != "a1"));
    }

    #[test]
    fn test_manual_boxes_stay_with_their_timestamp() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        let DrawOutcome::Committed { id, .. } = drag(&mut editor, &t, (10.0, 10.0), (60.0, 60.0)) else {
            panic!("expected commit");
        };
        editor.replace_detections(vec![detection("d1", 0.0)]);

        editor.set_scope(Some(BoxScope::new(seq(), 2.0)));
        assert!(editor.editable_boxes().is_empty());
        assert!(editor.detections().is_empty());
        assert_eq!(editor.manual_count(), 1);

        editor.set_scope(Some(BoxScope::new(seq(), 1.0)));
        assert_eq!(editor.editable_boxes()[0].id, id);
    }

    #[test]
    fn test_save_batch_requires_loaded_annotations() {
        let mut editor = BoxEditor::new();
        editor.set_scope(Some(BoxScope::new(seq(), 1.0)));
        assert_eq!(editor.save_batch(), None);

        editor.replace_annotations(Vec::new());
        let batch = editor.save_batch().unwrap();
        assert!(batch.rows.is_empty());

        editor.clear_annotations();
        assert_eq!(editor.save_batch(), None);
    }

    #[test]
    fn test_editing_locked_until_annotations_load() {
        let t = half_scale();
        let mut editor = BoxEditor::new();
        editor.set_scope(Some(BoxScope::new(seq(), 1.0)));
        assert!(!editor.is_editable());
        assert_eq!(editor.pointer_down(ScreenPoint::new(100.0, 100.0), &t), DrawOutcome::Locked);
        assert_eq!(editor.draw_state(), DrawState::Idle);

        editor.replace_annotations(annotations_from_rows(&[row(
            r#"{"id": "a1", "bbox_x": 0, "bbox_y": 0, "bbox_w": 10, "bbox_h": 10, "label": "car"}"#,
        )]));
        let DrawOutcome::Committed { id, save } = drag(&mut editor, &t, (100.0, 100.0), (150.0, 150.0)) else {
            panic!("expected commit");
        };
        assert_eq!(save.rows.len(), 2);

        // Hidden annotations lock removal of manual boxes too
        editor.clear_annotations();
        assert_eq!(editor.remove(&id), None);
        assert_eq!(editor.delete_last(), None);
        assert_eq!(editor.editable_boxes().len(), 1);
    }

    #[test]
    fn test_clearing_annotations_cancels_draft() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.pointer_down(ScreenPoint::new(10.0, 10.0), &t);
        editor.pointer_move(ScreenPoint::new(60.0, 60.0), &t);
        editor.clear_annotations();
        assert_eq!(editor.pointer_up(ScreenPoint::new(60.0, 60.0), &t), DrawOutcome::Ignored);
        assert_eq!(editor.manual_count(), 0);
    }

    #[test]
    fn test_rows_without_bbox_fields_are_skipped() {
        let rows = vec![
            row(r#"{"bbox_x": 1, "bbox_y": 2, "bbox_w": 3, "bbox_h": 4, "label": "car", "confidence": 0.8}"#),
            row(r#"{"bbox_x": 1, "bbox_y": 2, "label": "car"}"#),
            row(r#"{"bbox_x": 1, "bbox_y": 2, "bbox_w": -3, "bbox_h": 4, "label": 7}"#),
        ];
        let boxes = detections_from_rows(&rows, Some("confidence"));
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].id(), "det-0");
        assert_eq!(boxes[0].z(), Some(0.8));
        assert_eq!(boxes[1].z(), None);
        assert_eq!(boxes[1].label(), "7");
        assert_eq!(boxes[1].bbox(), BoundingBox::from_signed(-2.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_render_colors_and_permissions() {
        let t = half_scale();
        let mut editor = editor_at(1.0);
        editor.replace_detections(vec![
            detection("low", 0.0),
            DetectionBox::new("high", BoundingBox::from_signed(0.0, 0.0, 1.0, 1.0), "car", Some(0.9)),
            DetectionBox::new("none", BoundingBox::from_signed(0.0, 0.0, 1.0, 1.0), "car", None),
        ]);
        editor.replace_annotations(annotations_from_rows(&[row(
            r#"{"id": "a1", "bbox_x": 0, "bbox_y": 0, "bbox_w": 10, "bbox_h": 10, "label": "car"}"#,
        )]));
        let domain = ZDomain::from_values(editor.detections().iter().map(DetectionBox::z));
        let rendered = editor.render(&t, domain);

        assert_eq!(rendered.len(), 4);
        assert_ne!(rendered[0].color, rendered[1].color);
        assert_eq!(rendered[2].color, Color::from_array(colors::DETECTION));
        assert!(!rendered[0].removable);
        assert!(rendered[3].removable);
        assert_eq!(rendered[0].rect.width, 50.0);
    }
}
