//! Building named subsets from videoset/camera patterns.

use std::collections::BTreeMap;

use glob::Pattern;
use vxt_service::{Sequence, UNDEFINED_SUFFIX, VideosetIndex};

use crate::request::ServiceRequest;

/// Shell-style pattern match: `*` matches any run, `?` one character,
/// `[abc]`/`[a-z]` a set and `[!abc]` its complement. A pattern that does
/// not compile (e.g. an unclosed `[`) only matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    // `**` is a path wildcard to the glob crate; here it is just `*`
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if !(c == '*' && collapsed.ends_with('*')) {
            collapsed.push(c);
        }
    }
    match Pattern::new(&collapsed) {
        Ok(compiled) => compiled.matches(text),
        Err(e) => {
            log::debug!("Pattern '{pattern}' taken literally: {e}");
            pattern == text
        }
    }
}

/// Counts shown for the subset being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetSummary {
    pub total: usize,
    pub with_annotations: usize,
}

/// The subset being assembled, plus the annotation suffixes each of its
/// sequences offers.
#[derive(Debug, Clone, Default)]
pub struct SubsetBuilder {
    videosets: VideosetIndex,
    sequences: Vec<Sequence>,
    /// Suffix -> ids of the sequences offering it
    sequences_per_suffix: BTreeMap<String, Vec<String>>,
}

impl SubsetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_videosets(&mut self, videosets: VideosetIndex) {
        log::info!("{} videosets available", videosets.len());
        self.videosets = videosets;
    }

    pub fn videosets(&self) -> &VideosetIndex {
        &self.videosets
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn sequences_per_suffix(&self) -> &BTreeMap<String, Vec<String>> {
        &self.sequences_per_suffix
    }

    /// Replace the list with every videoset/camera pair matching the
    /// patterns. Returns the number found.
    pub fn find_matching(&mut self, videoset_pattern: &str, camera_pattern: &str) -> usize {
        self.sequences_per_suffix.clear();
        self.sequences = self
            .videosets
            .iter()
            .filter(|(videoset, _)| glob_match(videoset_pattern, videoset))
            .flat_map(|(videoset, entry)| {
                entry
                    .cameras
                    .iter()
                    .filter(move |camera| glob_match(camera_pattern, camera))
                    .map(move |camera| Sequence::new(videoset.clone(), camera.clone(), UNDEFINED_SUFFIX))
            })
            .collect();
        log::info!(
            "Patterns '{videoset_pattern}'/'{camera_pattern}' matched {} sequences",
            self.sequences.len()
        );
        self.sequences.len()
    }

    /// One annotation-option lookup per sequence in the list.
    pub fn option_requests(&mut self) -> Vec<ServiceRequest> {
        self.sequences_per_suffix.clear();
        self.sequences
            .iter()
            .map(|s| ServiceRequest::AnnotationOptions {
                videoset: s.videoset.clone(),
                camera: s.camera.clone(),
            })
            .collect()
    }

    /// Record the suffixes offered by one videoset/camera pair.
    pub fn record_annotation_options(&mut self, videoset: &str, camera: &str, options: &[String]) {
        let id = Sequence::new(videoset, camera, UNDEFINED_SUFFIX).sequence_id();
        if !self.sequences.iter().any(|s| s.sequence_id() == id) {
            return;
        }
        for option in options {
            let ids = self.sequences_per_suffix.entry(option.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }
    }

    /// Set `suffix` on every sequence that offers it. Returns how many changed.
    pub fn apply_suffix(&mut self, suffix: &str) -> usize {
        let Some(ids) = self.sequences_per_suffix.get(suffix) else {
            log::warn!("No sequences offer annotation suffix '{suffix}'");
            return 0;
        };
        let mut updated = 0;
        for sequence in &mut self.sequences {
            if ids.contains(&sequence.sequence_id()) {
                sequence.annotation_suffix = suffix.to_string();
                updated += 1;
            }
        }
        log::info!("Applied suffix '{suffix}' to {updated} sequences");
        updated
    }

    /// Drop sequences without an annotation suffix. Returns how many were removed.
    pub fn remove_undefined(&mut self) -> usize {
        let before = self.sequences.len();
        self.sequences.retain(Sequence::has_annotation_suffix);
        before - self.sequences.len()
    }

    /// Replace the list with a loaded subset.
    pub fn load(&mut self, sequences: Vec<Sequence>) {
        self.sequences = sequences;
        self.sequences_per_suffix.clear();
    }

    pub fn clear(&mut self) {
        self.sequences.clear();
        self.sequences_per_suffix.clear();
    }

    pub fn summary(&self) -> SubsetSummary {
        SubsetSummary {
            total: self.sequences.len(),
            with_annotations: self
                .sequences
                .iter()
                .filter(|s| s.has_annotation_suffix())
                .count(),
        }
    }

    /// Request storing the current list under `name`.
    pub fn save_request(&self, name: &str) -> Option<ServiceRequest> {
        if name.trim().is_empty() || self.sequences.is_empty() {
            return None;
        }
        Some(ServiceRequest::SaveSubset {
            name: name.trim().to_string(),
            sequences: self.sequences.clone(),
        })
    }
}
