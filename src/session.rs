//! The review session: one place that owns every component and routes
//! messages and service responses between them.
//!
//! The session never talks to the data service itself. Requests go out
//! through a [`Dispatcher`] and come back through [`ReviewSession::apply`].

use std::time::Duration;

use vxt_service::Sequence;

use crate::annotation::{BoxEditor, DrawOutcome, RenderedBox, SaveBatch};
use crate::color_map::ZDomain;
use crate::config::AppConfig;
use crate::constants::DEFAULT_LABEL;
use crate::frame_cache::{FrameCache, FrameImage, FrameKey};
use crate::keybindings::{Action, KeyBindings};
use crate::message::{Message, PointerButton};
use crate::navigator::{Navigation, SequenceNavigator};
use crate::plot::{MarkerLine, PlotPoint};
use crate::request::{
    RequestTracker, ServicePayload, ServiceRequest, ServiceResponse, TicketedRequest,
};
use crate::status::{StatusBoard, Widget};
use crate::subset::SubsetBuilder;
use crate::sync::{SyncController, SyncEvent, SyncOutput};
use crate::transform::{ContainerSize, CoordinateTransform, LayerRect, LayerTransform, ScreenPoint};
use crate::worker::Dispatcher;

pub struct ReviewSession<D: Dispatcher> {
    dispatcher: D,
    /// Tickets for subset and builder channels; the sync controller keeps its own
    tracker: RequestTracker,
    navigator: SequenceNavigator,
    sync: SyncController,
    editor: BoxEditor,
    transform: CoordinateTransform,
    frames: FrameCache,
    current_frame: Option<FrameKey>,
    subsets: Vec<String>,
    builder: SubsetBuilder,
    status: StatusBoard,
    keybindings: KeyBindings,
    labels: Vec<String>,
    /// Last pointer position of an active middle-button pan
    pan_anchor: Option<ScreenPoint>,
}

impl<D: Dispatcher> ReviewSession<D> {
    pub fn new(config: &AppConfig, dispatcher: D) -> Self {
        let prefs = &config.preferences;
        let labels = if prefs.labels.is_empty() {
            vec![DEFAULT_LABEL.to_string()]
        } else {
            prefs.labels.clone()
        };
        let mut editor = BoxEditor::new();
        editor.set_label(labels[0].clone());

        Self {
            dispatcher,
            tracker: RequestTracker::new(),
            navigator: SequenceNavigator::new(prefs.autosave),
            sync: SyncController::new(
                prefs.detection_timeseries.clone(),
                prefs.y_column.clone(),
                prefs.z_column.clone(),
                prefs.show_annotations,
            ),
            editor,
            transform: CoordinateTransform::default(),
            frames: FrameCache::new(prefs.frame_cache_size),
            current_frame: None,
            subsets: Vec::new(),
            builder: SubsetBuilder::new(),
            status: StatusBoard::new(Duration::from_secs(prefs.status_message_secs)),
            keybindings: config.keybindings.clone(),
            labels,
            pan_anchor: None,
        }
    }

    /// Request the subset names and the videoset index.
    pub fn start(&mut self) {
        self.issue(ServiceRequest::ListSubsets);
        self.issue(ServiceRequest::ListVideosets);
    }

    fn issue(&mut self, request: ServiceRequest) {
        let ticketed = TicketedRequest::issue(&mut self.tracker, request);
        self.dispatcher.dispatch(ticketed);
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn update(&mut self, message: Message) {
        match message {
            Message::ImagePointerDown { x, y, button } => {
                let p = ScreenPoint::new(x, y);
                match button {
                    PointerButton::Primary => {
                        if self.editor.pointer_down(p, &self.transform) == DrawOutcome::Locked {
                            self.report_locked();
                        }
                    }
                    PointerButton::Middle => self.pan_anchor = Some(p),
                    PointerButton::Secondary => {
                        if !self.editor.is_editable() {
                            self.report_locked();
                        } else if let Some(batch) = self.editor.context_click(p, &self.transform) {
                            self.persist(batch);
                        }
                    }
                }
            }
            Message::ImagePointerMove { x, y } => {
                let p = ScreenPoint::new(x, y);
                if let Some(anchor) = self.pan_anchor {
                    self.transform.on_pan(p.x - anchor.x, p.y - anchor.y);
                    self.pan_anchor = Some(p);
                } else {
                    self.editor.pointer_move(p, &self.transform);
                }
            }
            Message::ImagePointerUp { x, y, button } => match button {
                PointerButton::Primary => {
                    let outcome = self.editor.pointer_up(ScreenPoint::new(x, y), &self.transform);
                    self.handle_draw(outcome);
                }
                PointerButton::Middle => self.pan_anchor = None,
                PointerButton::Secondary => {}
            },
            Message::ImagePointerLeave { x, y } => {
                self.pan_anchor = None;
                let outcome = self.editor.pointer_leave(ScreenPoint::new(x, y), &self.transform);
                self.handle_draw(outcome);
            }
            Message::ImageWheel { x, y, notches } => {
                self.transform.on_wheel(ScreenPoint::new(x, y), notches);
            }
            Message::ImageDoubleClick | Message::ResetView => self.transform.reset_viewport(),
            Message::ContainerResized { width, height } => {
                self.transform.set_container(ContainerSize::new(width, height));
            }

            Message::PlotHover(x) => self.sync.plot_hover(x),
            Message::PlotUnhover => self.sync.plot_unhover(),
            Message::PlotClick(x) => {
                let out = self.sync.plot_click(x);
                self.handle_sync(out);
            }

            Message::KeyPressed(key) => {
                if let Some(action) = self.keybindings.action_for_key(key) {
                    self.perform(action);
                }
            }

            Message::RefreshSubsets => self.issue(ServiceRequest::ListSubsets),
            Message::LoadSubset(name) => self.issue(ServiceRequest::LoadSubset { name }),
            Message::NextSequence => {
                if let Some(navigation) = self.navigator.next() {
                    self.navigate(navigation);
                }
            }
            Message::PreviousSequence => {
                if let Some(navigation) = self.navigator.previous() {
                    self.navigate(navigation);
                }
            }
            Message::SelectSequence(index) => {
                if let Some(navigation) = self.navigator.set_index(index) {
                    self.navigate(navigation);
                }
            }

            Message::SetTimeseries(timeseries) => {
                let out = self.sync.set_timeseries(timeseries);
                self.handle_sync(out);
            }
            Message::SetColumns { y, z } => {
                let out = self.sync.set_columns(y, z);
                self.handle_sync(out);
            }
            Message::SetShowAnnotations(show) => {
                let out = self.sync.set_show_annotations(show);
                self.handle_sync(out);
            }
            Message::SetAutosave(enabled) => self.navigator.set_autosave(enabled),
            Message::SelectLabel(index) => match self.labels.get(index) {
                Some(label) => self.editor.set_label(label.clone()),
                None => log::debug!("No label at index {index}"),
            },
            Message::DeleteLastBox => {
                if !self.editor.is_editable() {
                    self.report_locked();
                } else if let Some(batch) = self.editor.delete_last() {
                    self.persist(batch);
                }
            }
            Message::RemoveBox(id) => {
                if !self.editor.is_editable() {
                    self.report_locked();
                } else if let Some(batch) = self.editor.remove(&id) {
                    self.persist(batch);
                }
            }

            Message::RefreshVideosets => self.issue(ServiceRequest::ListVideosets),
            Message::FindMatching {
                videoset_pattern,
                camera_pattern,
            } => {
                let found = self.builder.find_matching(&videoset_pattern, &camera_pattern);
                self.status.info(Widget::Subset, format!("{found} sequences match"));
            }
            Message::FetchAnnotationOptions => {
                for request in self.builder.option_requests() {
                    self.issue(request);
                }
            }
            Message::ApplySuffix(suffix) => {
                let updated = self.builder.apply_suffix(&suffix);
                self.status
                    .info(Widget::Subset, format!("'{suffix}' applied to {updated} sequences"));
            }
            Message::RemoveUndefined => {
                let removed = self.builder.remove_undefined();
                self.status
                    .info(Widget::Subset, format!("removed {removed} sequences without annotations"));
            }
            Message::ClearBuiltSubset => self.builder.clear(),
            Message::SaveBuiltSubset(name) => match self.builder.save_request(&name) {
                Some(request) => self.issue(request),
                None => self.status.error(Widget::Subset, "nothing to save"),
            },
            Message::ReviewBuiltSubset(name) => {
                let sequences = self.builder.sequences().to_vec();
                self.adopt_subset(name, sequences);
            }
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::DeleteLastBox => self.update(Message::DeleteLastBox),
            Action::ToggleAnnotations => {
                let show = !self.sync.show_annotations();
                self.update(Message::SetShowAnnotations(show));
            }
            Action::PreviousSequence => self.update(Message::PreviousSequence),
            Action::NextSequence => self.update(Message::NextSequence),
            Action::PreviousFrame => {
                let out = self.sync.step_frame(false);
                self.handle_sync(out);
            }
            Action::NextFrame => {
                let out = self.sync.step_frame(true);
                self.handle_sync(out);
            }
            Action::ResetView => self.transform.reset_viewport(),
            Action::CancelDrawing => self.editor.cancel_drawing(),
            Action::Label(index) => self.update(Message::SelectLabel(index)),
        }
    }

    fn handle_draw(&mut self, outcome: DrawOutcome) {
        if let DrawOutcome::Committed { id, save } = outcome {
            log::info!("Added box {id}");
            self.persist(save);
        }
    }

    /// Tell the user why a box edit was refused.
    fn report_locked(&mut self) {
        let Some(scope) = self.editor.scope() else {
            return;
        };
        let text = if !scope.sequence.has_annotation_suffix() {
            "no annotation file for this sequence"
        } else if !self.sync.show_annotations() {
            "show annotations to edit boxes"
        } else {
            "annotations not loaded, editing is disabled"
        };
        log::debug!("Box edit refused: {text}");
        self.status.error(Widget::Annotations, text);
    }

    /// Write the full editable set of one scope back to its annotation file.
    fn persist(&mut self, batch: SaveBatch) {
        if !batch.sequence.has_annotation_suffix() {
            self.status
                .error(Widget::Save, "sequence has no annotation file to save to");
            return;
        }
        log::debug!(
            "Saving {} boxes for {} @ {}",
            batch.rows.len(),
            batch.sequence.sequence_id(),
            batch.timestamp
        );
        self.issue(ServiceRequest::SaveAnnotations(batch));
    }

    fn adopt_subset(&mut self, name: String, sequences: Vec<Sequence>) {
        let count = sequences.len();
        match self.navigator.adopt_subset(name.clone(), sequences) {
            Some(navigation) => {
                self.status
                    .info(Widget::Subset, format!("'{name}': {count} sequences"));
                self.navigate(navigation);
            }
            None => self.status.error(Widget::Subset, format!("subset '{name}' is empty")),
        }
    }

    /// Switch sequences. The outgoing scope is saved before anything is
    /// requested for the incoming one.
    fn navigate(&mut self, navigation: Navigation) {
        if navigation.autosave {
            match self.editor.save_batch() {
                Some(batch) => self.persist(batch),
                None => log::debug!("Nothing to autosave"),
            }
        }
        self.current_frame = None;
        let out = self.sync.set_sequence(navigation.incoming);
        self.handle_sync(out);
    }

    /// Apply controller events, then send its requests. A frame already in
    /// the cache is shown directly instead of being fetched again.
    fn handle_sync(&mut self, out: SyncOutput) {
        for event in out.events {
            self.apply_event(event);
        }
        for request in out.requests {
            if let ServiceRequest::FrameImage { sequence, timestamp } = &request.request {
                let key = FrameKey::new(sequence, *timestamp);
                if self.frames.contains(&key) {
                    log::trace!("Frame {key:?} served from cache");
                    self.current_frame = Some(key);
                    continue;
                }
            }
            self.dispatcher.dispatch(request);
        }
    }

    fn apply_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::ScopeChanged(scope) => self.editor.set_scope(scope),
            SyncEvent::Geometry(geometry) => self.transform.set_frame(geometry),
            SyncEvent::Frame { key, .. } => self.current_frame = Some(key),
            SyncEvent::Detections(boxes) => self.editor.replace_detections(boxes),
            SyncEvent::Annotations(boxes) => self.editor.replace_annotations(boxes),
            SyncEvent::ClearAnnotations => self.editor.clear_annotations(),
            SyncEvent::Loaded { widget, detail } => self.status.info(widget, detail),
            SyncEvent::Failed { widget, error } => self.status.failure(widget, &error),
        }
    }

    // ========================================================================
    // Responses
    // ========================================================================

    /// Apply one service response. Stale responses are dropped; decoded
    /// frames are cached even when stale.
    pub fn apply(&mut self, response: ServiceResponse) {
        if let (ServiceRequest::FrameImage { sequence, timestamp }, Ok(ServicePayload::FrameImage(image))) =
            (&response.request, &response.result)
        {
            self.frames.insert(FrameKey::new(sequence, *timestamp), image.clone());
        }

        if SyncController::handles(response.ticket.channel) {
            let out = self.sync.apply(response);
            self.handle_sync(out);
            return;
        }
        if !self.tracker.is_current(response.ticket) {
            log::debug!("Discarding stale {:?} response", response.ticket.channel);
            return;
        }

        match (response.request, response.result) {
            (ServiceRequest::ListSubsets, Ok(ServicePayload::Subsets(names))) => {
                log::info!("{} subsets available", names.len());
                self.subsets = names;
            }
            (ServiceRequest::LoadSubset { name }, Ok(ServicePayload::Subset(sequences))) => {
                self.builder.load(sequences.clone());
                self.adopt_subset(name, sequences);
            }
            (ServiceRequest::SaveSubset { name, sequences }, Ok(ServicePayload::SubsetSaved)) => {
                self.status.info(
                    Widget::Subset,
                    format!("saved subset '{name}' ({} sequences)", sequences.len()),
                );
                if !self.subsets.contains(&name) {
                    self.subsets.push(name);
                }
            }
            (ServiceRequest::ListVideosets, Ok(ServicePayload::Videosets(index))) => {
                self.builder.set_videosets(index);
            }
            (
                ServiceRequest::AnnotationOptions { videoset, camera },
                Ok(ServicePayload::AnnotationOptions(options)),
            ) => {
                self.builder.record_annotation_options(&videoset, &camera, &options);
            }
            (ServiceRequest::SaveAnnotations(batch), Ok(ServicePayload::Saved(summary))) => {
                log::info!(
                    "Saved {} boxes for {} ({} new, {} kept)",
                    batch.rows.len(),
                    batch.sequence.sequence_id(),
                    summary.created,
                    summary.kept
                );
                self.status
                    .info(Widget::Save, format!("saved {} boxes", batch.rows.len()));
                if self.sync.sequence() == Some(&batch.sequence) {
                    let out = self.sync.refresh_annotation_points();
                    self.handle_sync(out);
                }
            }
            (request, Err(error)) => {
                let widget = match request {
                    ServiceRequest::SaveAnnotations(_) => Widget::Save,
                    _ => Widget::Subset,
                };
                self.status.failure(widget, &error);
            }
            (request, Ok(payload)) => {
                log::warn!("Unexpected payload {payload:?} for {request:?}");
            }
        }
    }

    // ========================================================================
    // Render state
    // ========================================================================

    /// Color domain shared by plot markers and detection boxes.
    pub fn z_domain(&self) -> Option<ZDomain> {
        ZDomain::from_values(
            self.sync
                .plot()
                .z_values()
                .chain(self.editor.detections().iter().map(|d| d.z())),
        )
    }

    /// Boxes of the current frame in overlay-layer coordinates.
    pub fn boxes(&self) -> Vec<RenderedBox> {
        self.editor.render(&self.transform, self.z_domain())
    }

    pub fn plot_points(&self) -> Vec<PlotPoint> {
        self.sync.plot().points(self.z_domain())
    }

    pub fn plot_annotation_dots(&self) -> Vec<PlotPoint> {
        self.sync.plot().annotation_dots()
    }

    pub fn plot_markers(&self) -> Vec<MarkerLine> {
        self.sync.plot().markers()
    }

    /// Transform applied to the frame and overlay layers together.
    pub fn layer_transform(&self) -> LayerTransform {
        self.transform.layer_transform()
    }

    pub fn draft_rect(&self) -> Option<LayerRect> {
        self.editor.draft_rect(&self.transform)
    }

    pub fn current_frame(&self) -> Option<&FrameImage> {
        self.frames.get(self.current_frame.as_ref()?)
    }

    pub fn subsets(&self) -> &[String] {
        &self.subsets
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Drop expired status messages.
    pub fn prune_status(&mut self) {
        self.status.prune();
    }

    pub fn navigator(&self) -> &SequenceNavigator {
        &self.navigator
    }

    pub fn builder(&self) -> &SubsetBuilder {
        &self.builder
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn editor(&self) -> &BoxEditor {
        &self.editor
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }
}
