//! knobtap samples per-CPU hardware knobs in the background and records
//! them as timestamped time series for a host measurement framework.
//!
//! Reading a hardware knob has to happen on the CPU it describes, so each
//! monitored CPU gets its own sampling thread, pinned there for the life of
//! the measurement.  Each thread polls its device at a fixed interval and
//! appends readings to private timelines; stopping the thread is also the
//! handoff point that makes those timelines safe to read.

mod affinity;
mod clock;
mod configuration;
mod directory;
mod error;
mod knob;
mod plugin;
mod registry;
mod sampler;
mod timeline;

pub use self::{
    affinity::{current_cpu, CpuMask},
    clock::{ClockSource, Mock, Monotonic},
    configuration::Configuration,
    error::Error,
    knob::{Device, Knob, KnobAccess, MetricProperties, SampleMode, ValueKind},
    plugin::{Cursor, Plugin},
    timeline::{Sample, Timeline},
};
