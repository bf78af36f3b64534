use crate::error::Error;
use std::{io, sync::Arc};

/// A resolved hardware knob: one named, readable value exposed by a CPU's
/// monitoring device.
///
/// Knobs are produced by [`KnobAccess::lookup`] and are immutable from then
/// on.  The handle is cheap to clone and usable as a map key; the plugin
/// holds copies in its name cache, observation list, and timeline stores.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Knob {
    name: Arc<str>,
    description: Arc<str>,
}

impl Knob {
    pub fn new<N: Into<Arc<str>>, D: Into<Arc<str>>>(name: N, description: D) -> Knob {
        Knob {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Access to the hardware-knob library.
///
/// Implementations resolve knob names to handles and hand out per-CPU
/// devices.  The plugin calls `lookup` at most once per unique name and
/// `device` at most once per CPU.
pub trait KnobAccess {
    type Device: Device;

    /// Resolves a knob name to its handle.
    fn lookup(&self, name: &str) -> Result<Knob, Error>;

    /// Opens the device bound to a specific CPU.
    fn device(&self, cpu: usize) -> Result<Self::Device, Error>;
}

/// A handle for reading knobs from one CPU's monitoring device.
///
/// The device is owned by exactly one sampler and moves onto its loop
/// thread, so reads always happen on the CPU the device represents.
pub trait Device: Send + 'static {
    /// Reads the current value of a knob.
    ///
    /// Hardware or permission failures surface as `io::Error` and terminate
    /// the sampling loop for this device.
    fn read(&mut self, knob: &Knob) -> io::Result<u64>;
}

/// How successive values of a metric relate to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleMode {
    /// Each sample is a self-contained point-in-time reading.
    AbsolutePoint,
    /// Samples accumulate since measurement start and must be differenced.
    Accumulated,
}

/// The value representation a metric reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Unsigned,
    Signed,
    Double,
}

/// Declared properties of a knob metric, as reported to the host framework
/// during discovery.
///
/// Knob metrics are always absolute, point-sampled, unsigned, and unit-less.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricProperties {
    pub name: String,
    pub description: String,
    pub unit: &'static str,
    pub mode: SampleMode,
    pub value: ValueKind,
}

impl MetricProperties {
    pub(crate) fn for_knob(knob: &Knob) -> MetricProperties {
        MetricProperties {
            name: knob.name().to_string(),
            description: knob.description().to_string(),
            unit: "#",
            mode: SampleMode::AbsolutePoint,
            value: ValueKind::Unsigned,
        }
    }
}
