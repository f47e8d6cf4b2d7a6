// THEORY:
// The `AnnotationBuffer` is the ground truth of a session: one behavior label per
// video frame, pre-filled with "no activity". It never grows, shrinks or reorders.
// The playback state machine overwrites single cells as frames are shown with the
// pen down; a seek may revisit a cell, in which case the last write wins.

use crate::core_modules::action_catalog::Behavior;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationBuffer {
    labels: Vec<Behavior>,
}

impl AnnotationBuffer {
    /// A buffer of `frame_count` cells, all holding `default`.
    pub fn new(frame_count: usize, default: &Behavior) -> Self {
        Self {
            labels: vec![default.clone(); frame_count],
        }
    }

    pub fn from_labels(labels: Vec<Behavior>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&Behavior> {
        self.labels.get(frame)
    }

    /// Labels `frame`. Returns `false`, leaving the buffer untouched, if `frame` is out of range.
    pub fn set(&mut self, frame: usize, behavior: &Behavior) -> bool {
        match self.labels.get_mut(frame) {
            Some(cell) => {
                if !std::sync::Arc::ptr_eq(cell, behavior) {
                    *cell = behavior.clone();
                }
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[Behavior] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<Behavior> {
        self.labels
    }
}
