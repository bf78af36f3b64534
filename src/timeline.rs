use crate::knob::Knob;
use fnv::FnvBuildHasher;
use hashbrown::HashMap;

/// A single timestamped knob reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    ticks: u64,
    value: u64,
}

impl Sample {
    pub fn new(ticks: u64, value: u64) -> Sample {
        Sample { ticks, value }
    }

    /// Measurement-clock tick count at which the value was read.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// The ordered sample history for one (CPU, knob) pair.
///
/// Append-only: insertion order is temporal order.  Written exclusively by
/// the owning sampler thread; once that thread has been joined the timeline
/// is immutable and safe to read from anywhere.
#[derive(Debug, Default)]
pub struct Timeline {
    samples: Vec<Sample>,
}

impl Timeline {
    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

/// Per-CPU mapping from knob to its timeline.
///
/// Owned by the sampler loop thread while sampling and handed back, whole,
/// through the thread join when the sampler stops.
#[derive(Debug, Default)]
pub(crate) struct TimelineStore {
    timelines: HashMap<Knob, Timeline, FnvBuildHasher>,
}

impl TimelineStore {
    /// Ensures a timeline exists for the knob.
    pub(crate) fn track(&mut self, knob: Knob) {
        self.timelines.entry(knob).or_default();
    }

    pub(crate) fn append(&mut self, knob: &Knob, sample: Sample) {
        if let Some(timeline) = self.timelines.get_mut(knob) {
            timeline.push(sample);
        }
    }

    pub(crate) fn get(&self, knob: &Knob) -> Option<&Timeline> {
        self.timelines.get(knob)
    }
}
