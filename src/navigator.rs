//! Which subset and which sequence of it is active.

use vxt_service::Sequence;

/// A change of the active sequence.
///
/// When `autosave` is set, the session saves `outgoing` before requesting
/// anything for `incoming`.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub outgoing: Option<Sequence>,
    pub autosave: bool,
    pub incoming: Option<Sequence>,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceNavigator {
    subset_name: Option<String>,
    sequences: Vec<Sequence>,
    index: Option<usize>,
    autosave: bool,
}

impl SequenceNavigator {
    pub fn new(autosave: bool) -> Self {
        Self {
            autosave,
            ..Self::default()
        }
    }

    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn set_autosave(&mut self, autosave: bool) {
        self.autosave = autosave;
    }

    pub fn subset_name(&self) -> Option<&str> {
        self.subset_name.as_deref()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn current(&self) -> Option<&Sequence> {
        self.sequences.get(self.index?)
    }

    fn transition(&self, outgoing: Option<Sequence>) -> Navigation {
        let autosave = self.autosave
            && outgoing
                .as_ref()
                .is_some_and(Sequence::has_annotation_suffix);
        Navigation {
            outgoing,
            autosave,
            incoming: self.current().cloned(),
        }
    }

    /// Jump to `index`. Out-of-range requests and the current index are no-ops.
    pub fn set_index(&mut self, index: usize) -> Option<Navigation> {
        if index >= self.sequences.len() || self.index == Some(index) {
            return None;
        }
        let outgoing = self.current().cloned();
        self.index = Some(index);
        log::info!("Sequence {}/{}", index + 1, self.sequences.len());
        Some(self.transition(outgoing))
    }

    /// Move to the next sequence, stopping at the last one.
    pub fn next(&mut self) -> Option<Navigation> {
        let target = self.index.map_or(0, |i| i + 1);
        self.set_index(target.min(self.sequences.len().saturating_sub(1)))
    }

    /// Move to the previous sequence, stopping at the first one.
    pub fn previous(&mut self) -> Option<Navigation> {
        let target = self.index.map_or(0, |i| i.saturating_sub(1));
        self.set_index(target)
    }

    /// Replace the active subset. An empty subset is rejected and the
    /// previous one stays active.
    pub fn adopt_subset(&mut self, name: impl Into<String>, sequences: Vec<Sequence>) -> Option<Navigation> {
        let name = name.into();
        if sequences.is_empty() {
            log::warn!("Subset '{name}' is empty, keeping the current subset");
            return None;
        }
        let outgoing = self.current().cloned();
        log::info!("Loaded subset '{name}' with {} sequences", sequences.len());
        self.subset_name = Some(name);
        self.sequences = sequences;
        self.index = Some(0);
        Some(self.transition(outgoing))
    }
}
