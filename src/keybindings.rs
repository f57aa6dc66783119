//! Customizable keybindings for the review session.
//!
//! Bindings are stored in the configuration file, so keys serialize by name.

use serde::{Deserialize, Serialize};

/// Keys that can be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    H,
    J,
    K,
    L,
    N,
    P,
    Q,
    R,
    S,
    W,
    X,
    Z,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Left,
    Right,
    Up,
    Down,
    Delete,
    Backspace,
    Escape,
    Space,
}

/// Something a key press can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    DeleteLastBox,
    ToggleAnnotations,
    PreviousSequence,
    NextSequence,
    PreviousFrame,
    NextFrame,
    ResetView,
    CancelDrawing,
    /// Select the label at this index (0-based)
    Label(usize),
}

/// Maximum number of labels that can have hotkeys (1-9, 0).
pub const MAX_LABEL_HOTKEYS: usize = 10;

/// Keybinding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub delete_last_box: KeyCode,
    pub toggle_annotations: KeyCode,
    pub previous_sequence: KeyCode,
    pub next_sequence: KeyCode,
    pub previous_frame: KeyCode,
    pub next_frame: KeyCode,
    pub reset_view: KeyCode,
    pub cancel_drawing: KeyCode,
    /// Hotkeys for label selection; index 0 is the first label
    pub label_hotkeys: [Option<KeyCode>; MAX_LABEL_HOTKEYS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            delete_last_box: KeyCode::Delete,
            toggle_annotations: KeyCode::A,
            previous_sequence: KeyCode::Up,
            next_sequence: KeyCode::Down,
            previous_frame: KeyCode::Left,
            next_frame: KeyCode::Right,
            reset_view: KeyCode::R,
            cancel_drawing: KeyCode::Escape,
            label_hotkeys: [
                Some(KeyCode::Key1),
                Some(KeyCode::Key2),
                Some(KeyCode::Key3),
                Some(KeyCode::Key4),
                Some(KeyCode::Key5),
                Some(KeyCode::Key6),
                Some(KeyCode::Key7),
                Some(KeyCode::Key8),
                Some(KeyCode::Key9),
                Some(KeyCode::Key0),
            ],
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn fixed(&self) -> [(KeyCode, Action); 8] {
        [
            (self.delete_last_box, Action::DeleteLastBox),
            (self.toggle_annotations, Action::ToggleAnnotations),
            (self.previous_sequence, Action::PreviousSequence),
            (self.next_sequence, Action::NextSequence),
            (self.previous_frame, Action::PreviousFrame),
            (self.next_frame, Action::NextFrame),
            (self.reset_view, Action::ResetView),
            (self.cancel_drawing, Action::CancelDrawing),
        ]
    }

    /// The action bound to `key`, if any.
    pub fn action_for_key(&self, key: KeyCode) -> Option<Action> {
        self.fixed()
            .into_iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, action)| action)
            .or_else(|| self.label_index_for_key(key).map(Action::Label))
    }

    /// The label index (0-based) bound to `key`, if any.
    pub fn label_index_for_key(&self, key: KeyCode) -> Option<usize> {
        self.label_hotkeys.iter().position(|hotkey| *hotkey == Some(key))
    }

    /// Set or clear the hotkey of a label slot.
    pub fn set_label_key(&mut self, index: usize, key: Option<KeyCode>) {
        if index < MAX_LABEL_HOTKEYS {
            self.label_hotkeys[index] = key;
        }
    }

    /// Keys bound more than once.
    pub fn conflicts(&self) -> Vec<KeyCode> {
        let mut keys: Vec<KeyCode> = self.fixed().iter().map(|(k, _)| *k).collect();
        keys.extend(self.label_hotkeys.iter().flatten());
        let mut conflicts = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) && !conflicts.contains(key) {
                conflicts.push(*key);
            }
        }
        conflicts
    }
}
