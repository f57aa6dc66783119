//! Inline status text shown next to the widget it concerns.
//!
//! Service failures never interrupt the session; they end up here as a
//! short message that disappears after a while.

use std::collections::HashMap;
use std::time::Duration;

use vxt_service::ServiceError;
use web_time::Instant;

use crate::constants::STATUS_MESSAGE_SECS;

/// Widgets that can carry a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Widget {
    Subset,
    Timestamps,
    Timeseries,
    Columns,
    Plot,
    Frame,
    Detections,
    Annotations,
    Save,
}

impl Widget {
    /// What the widget loads, for "failed to load ..." text.
    pub fn subject(self) -> &'static str {
        match self {
            Widget::Subset => "subset",
            Widget::Timestamps => "frame timestamps",
            Widget::Timeseries => "timeseries",
            Widget::Columns => "columns",
            Widget::Plot => "plot data",
            Widget::Frame => "frame",
            Widget::Detections => "detections",
            Widget::Annotations => "annotations",
            Widget::Save => "annotations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    created: Instant,
}

/// Latest status message per widget.
#[derive(Debug)]
pub struct StatusBoard {
    messages: HashMap<Widget, StatusMessage>,
    max_age: Duration,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(STATUS_MESSAGE_SECS))
    }
}

impl StatusBoard {
    pub fn new(max_age: Duration) -> Self {
        Self {
            messages: HashMap::new(),
            max_age,
        }
    }

    fn set(&mut self, widget: Widget, level: StatusLevel, text: String) {
        self.messages.insert(
            widget,
            StatusMessage {
                level,
                text,
                created: Instant::now(),
            },
        );
    }

    pub fn info(&mut self, widget: Widget, text: impl Into<String>) {
        self.set(widget, StatusLevel::Info, text.into());
    }

    pub fn error(&mut self, widget: Widget, text: impl Into<String>) {
        self.set(widget, StatusLevel::Error, text.into());
    }

    /// Record a failed request for `widget`.
    pub fn failure(&mut self, widget: Widget, err: &ServiceError) {
        let verb = if widget == Widget::Save { "save" } else { "load" };
        self.error(widget, format!("failed to {verb} {}: {}", widget.subject(), err.kind()));
    }

    pub fn clear(&mut self, widget: Widget) {
        self.messages.remove(&widget);
    }

    /// Current message for `widget`, unless it has expired.
    pub fn get(&self, widget: Widget) -> Option<&StatusMessage> {
        self.messages
            .get(&widget)
            .filter(|m| m.created.elapsed() <= self.max_age)
    }

    /// Text of the current message for `widget`.
    pub fn text(&self, widget: Widget) -> Option<&str> {
        self.get(widget).map(|m| m.text.as_str())
    }

    /// Drop expired messages.
    pub fn prune(&mut self) {
        let max_age = self.max_age;
        self.messages.retain(|_, m| m.created.elapsed() <= max_age);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_text() {
        let mut board = StatusBoard::default();
        board.failure(Widget::Columns, &ServiceError::network("timeout"));
        assert_eq!(
            board.text(Widget::Columns),
            Some("failed to load columns: network failure")
        );
        board.failure(Widget::Save, &ServiceError::not_found("x"));
        assert_eq!(board.text(Widget::Save), Some("failed to save annotations: not found"));
        assert_eq!(board.get(Widget::Save).map(|m| m.level), Some(StatusLevel::Error));
    }

    #[test]
    fn test_latest_message_wins() {
        let mut board = StatusBoard::default();
        board.error(Widget::Frame, "bad");
        board.info(Widget::Frame, "ok");
        assert_eq!(board.text(Widget::Frame), Some("ok"));
        assert_eq!(board.len(), 1);
        board.clear(Widget::Frame);
        assert!(board.is_empty());
    }

    #[test]
    fn test_messages_expire() {
        let mut board = StatusBoard::new(Duration::ZERO);
        board.info(Widget::Plot, "loaded");
        std::thread::sleep(Duration::from_millis(5));
        assert!(board.get(Widget::Plot).is_none());
        board.prune();
        assert!(board.is_empty());
    }
}
