use crate::{clock::ClockSource, knob::KnobAccess, plugin::Plugin};
use std::time::Duration;

/// A configuration builder for `Plugin`.
#[derive(Clone)]
pub struct Configuration {
    pub(crate) interval: Duration,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            interval: Duration::from_millis(50),
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration {
        Default::default()
    }

    /// Sets the polling interval.
    ///
    /// Defaults to `50ms`.
    ///
    /// Every sampler sleeps for this long between sweeps over its knob set.
    /// The interval bounds both the staleness of the recorded series and the
    /// overhead a sampling thread puts on its CPU: knobs are ordinary
    /// hardware state rather than events, so sampling faster only buys
    /// resolution at the price of more device reads.
    ///
    /// It also bounds how long `stop` can block, since a loop notices the
    /// cleared continue-flag at its next wake-up.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Creates a `Plugin` based on this configuration.
    ///
    /// `clock` should be the host framework's measurement clock so recorded
    /// ticks stay comparable with the host's own timestamps.
    pub fn build<A, C>(self, access: A, clock: C) -> Plugin<A, C>
    where
        A: KnobAccess,
        C: ClockSource + Send + Sync + 'static,
    {
        Plugin::from_config(self, access, clock)
    }
}
