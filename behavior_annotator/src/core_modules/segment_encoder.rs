// THEORY:
// At the end of a session the dense per-frame buffer is run-length encoded into the
// canonical annotation log: one `(behavior, start_ms)` entry wherever the label
// changes, followed by a `VIDEO_END` sentinel stamped with the total duration.
//
// Because every frame carries exactly one label (the default included), the log
// covers `[0, duration)` without gaps, and start times are strictly increasing.
// Expanding a log back to frames, holding each behavior until the next start,
// reproduces the buffer exactly.

use crate::core_modules::action_catalog::Behavior;
use crate::core_modules::annotation_buffer::AnnotationBuffer;
use std::collections::BTreeMap;
use std::fmt;

pub const VIDEO_END: &str = "VIDEO_END";

/// What a log entry marks the start of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentTag {
    Behavior(Behavior),
    /// Terminal sentinel; its start time is the video duration.
    VideoEnd,
}

impl SegmentTag {
    pub fn name(&self) -> &str {
        match self {
            SegmentTag::Behavior(behavior) => &**behavior,
            SegmentTag::VideoEnd => VIDEO_END,
        }
    }
}

impl fmt::Display for SegmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub tag: SegmentTag,
    pub start_ms: f64,
}

/// A behavior with the time it was active.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBehavior {
    pub name: String,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// The ordered segment list handed to persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationLog {
    segments: Vec<Segment>,
}

impl AnnotationLog {
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Start time of the sentinel, if the log has one.
    pub fn duration_ms(&self) -> Option<f64> {
        self.segments
            .last()
            .filter(|segment| segment.tag == SegmentTag::VideoEnd)
            .map(|segment| segment.start_ms)
    }

    /// Each behavior entry paired with the time until the next entry.
    pub fn timed_behaviors(&self) -> Vec<TimedBehavior> {
        self.segments
            .windows(2)
            .filter_map(|pair| match &pair[0].tag {
                SegmentTag::Behavior(behavior) => Some(TimedBehavior {
                    name: behavior.to_string(),
                    start_ms: pair[0].start_ms,
                    duration_ms: pair[1].start_ms - pair[0].start_ms,
                }),
                SegmentTag::VideoEnd => None,
            })
            .collect()
    }

    /// Accumulated milliseconds per behavior.
    pub fn totals_ms(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for timed in self.timed_behaviors() {
            *totals.entry(timed.name).or_insert(0.0) += timed.duration_ms;
        }
        totals
    }

    /// Re-expands the log to one label per frame.
    ///
    /// Frame `i` takes the behavior of the last entry starting at or before
    /// `frame_to_time(i)`. Frames before the first entry, which a well-formed log never
    /// has, take the first behavior.
    pub fn expand(&self, frame_count: usize, frame_to_time: impl Fn(usize) -> f64) -> Vec<Behavior> {
        let behaviors: Vec<(&Behavior, f64)> = self
            .segments
            .iter()
            .filter_map(|segment| match &segment.tag {
                SegmentTag::Behavior(behavior) => Some((behavior, segment.start_ms)),
                SegmentTag::VideoEnd => None,
            })
            .collect();
        let Some(&(first, _)) = behaviors.first() else {
            return Vec::new();
        };

        let mut labels = Vec::with_capacity(frame_count);
        let mut current = first;
        let mut next = 0;
        for frame in 0..frame_count {
            let time = frame_to_time(frame);
            while next < behaviors.len() && behaviors[next].1 <= time {
                current = behaviors[next].0;
                next += 1;
            }
            labels.push(current.clone());
        }
        labels
    }
}

/// Run-length encodes `buffer`, consuming it.
pub fn encode(buffer: AnnotationBuffer, frame_to_time: impl Fn(usize) -> f64) -> AnnotationLog {
    let frame_count = buffer.len();
    let labels = buffer.into_labels();
    let mut segments = Vec::new();

    let mut previous: Option<&Behavior> = None;
    for (frame, label) in labels.iter().enumerate() {
        if previous != Some(label) {
            segments.push(Segment {
                tag: SegmentTag::Behavior(label.clone()),
                start_ms: frame_to_time(frame),
            });
        }
        previous = Some(label);
    }

    segments.push(Segment {
        tag: SegmentTag::VideoEnd,
        start_ms: frame_to_time(frame_count),
    });
    AnnotationLog { segments }
}
