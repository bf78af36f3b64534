use crate::{
    affinity::{self, CpuMask},
    clock::{ClockSource, Monotonic},
    configuration::Configuration,
    directory::Directory,
    error::Error,
    knob::{Knob, KnobAccess, MetricProperties},
    registry::{CpuSlot, Registry},
    sampler::Sampler,
    timeline::Sample,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

/// Sink for streaming a recorded timeline back to the host framework.
pub trait Cursor {
    fn record(&mut self, sample: Sample);
}

impl Cursor for Vec<Sample> {
    fn record(&mut self, sample: Sample) {
        self.push(sample);
    }
}

struct Inner {
    directory: Directory,
    registry: Registry,
}

/// The component the host measurement framework talks to.
///
/// The plugin resolves knob names into metrics and spins up one pinned
/// background sampler per CPU that registers a knob; each observation's
/// recorded timeline is later streamed into a [`Cursor`].  All of its methods
/// take `&self`; the host may call them from any number of threads.
///
/// Registration is per-thread by design: a knob is always bound to the CPU
/// the registering thread is pinned to, which is why [`Plugin::add_metric`]
/// insists on a single-CPU affinity mask.
pub struct Plugin<A: KnobAccess, C: ClockSource + Send + Sync + 'static> {
    access: A,
    clock: Arc<C>,
    interval: Duration,
    inner: Mutex<Inner>,
}

impl<A: KnobAccess> Plugin<A, Monotonic> {
    /// Creates a plugin with the default configuration and a stand-alone
    /// monotonic clock.
    pub fn new(access: A) -> Plugin<A, Monotonic> {
        Configuration::default().build(access, Monotonic::new())
    }
}

impl<A, C> Plugin<A, C>
where
    A: KnobAccess,
    C: ClockSource + Send + Sync + 'static,
{
    /// Gets a builder to configure a `Plugin` instance with.
    pub fn builder() -> Configuration {
        Configuration::default()
    }

    pub(crate) fn from_config(conf: Configuration, access: A, clock: C) -> Plugin<A, C> {
        info!("plugin loaded");

        Plugin {
            access,
            clock: Arc::new(clock),
            interval: conf.interval,
            inner: Mutex::new(Inner {
                directory: Directory::default(),
                registry: Registry::default(),
            }),
        }
    }

    /// Metric discovery: resolves a knob name and returns the metric
    /// properties declared for it.
    ///
    /// The resolved handle is cached, so the access library sees at most one
    /// lookup per unique name no matter how many CPUs register it later.
    pub fn get_metric_properties(&self, name: &str) -> Result<MetricProperties, Error> {
        let mut inner = self.inner.lock();
        let knob = self.resolve(&mut inner, name)?;

        info!("added new metric for knob '{}'", name);

        Ok(MetricProperties::for_knob(&knob))
    }

    fn resolve(&self, inner: &mut Inner, name: &str) -> Result<Knob, Error> {
        let access = &self.access;
        inner
            .directory
            .resolve_with(name, |n| access.lookup(n))
            .map_err(|e| {
                warn!("failed to resolve knob '{}': {}", name, e);
                e
            })
    }

    /// Registers a knob for sampling on the calling thread's CPU and
    /// returns the observation id to retrieve its timeline with.
    ///
    /// The calling thread must be pinned to exactly one CPU.  The first
    /// registration for a CPU creates and starts that CPU's sampler;
    /// sampling begins immediately, not at a session start signal.
    pub fn add_metric(&self, name: &str) -> Result<usize, Error> {
        if !CpuMask::current()?.is_pinned() {
            warn!("refusing to register '{}': thread is not pinned to one CPU", name);
            return Err(Error::NotPinned);
        }

        let cpu = affinity::current_cpu()?;

        let mut inner = self.inner.lock();
        let knob = self.resolve(&mut inner, name)?;

        let needs_sampler = match inner.registry.slot(cpu) {
            None => true,
            Some(CpuSlot::Running(sampler)) => {
                sampler.track(knob.clone());
                false
            },
            Some(CpuSlot::Stopped(_)) => {
                warn!("refusing to register '{}': sampler for CPU #{} already stopped", name, cpu);
                return Err(Error::SamplerStopped(cpu));
            },
        };

        if needs_sampler {
            debug!("creating data structures for sampling on CPU #{}", cpu);
            let device = self.access.device(cpu)?;
            let sampler = Sampler::start(cpu, device, self.interval, Arc::clone(&self.clock))?;
            sampler.track(knob.clone());
            inner.registry.insert_running(cpu, sampler);
        }

        let id = inner.directory.observe(knob, cpu);
        debug!("used id: {}", id);

        Ok(id)
    }

    /// Session-start hook.
    ///
    /// A no-op: not every host thread calls this, so it is not a usable
    /// place to start samplers.  Samplers are started on `add_metric` and
    /// stopped on `get_all_values` instead; the host filters out any
    /// samples stamped outside its measurement epoch.
    pub fn start(&self) {}

    /// Session-stop hook.  A no-op, see [`Plugin::start`].
    pub fn stop(&self) {}

    /// Streams the full recorded timeline for an observation id, in
    /// temporal order, into `cursor`.
    ///
    /// The first call for a CPU stops its sampler and blocks until the
    /// sampling thread has exited; from then on the CPU's timelines are
    /// immutable.  Calling this again for the same observation re-emits the
    /// same contents.
    pub fn get_all_values<S: Cursor>(&self, id: usize, cursor: &mut S) -> Result<(), Error> {
        debug!("get_all_values called for id: {}", id);

        let mut inner = self.inner.lock();
        let observation = inner.directory.observation(id).cloned().ok_or_else(|| {
            warn!("get_all_values called with unknown observation id {}", id);
            Error::InvalidObservation(id)
        })?;

        debug!(
            "collecting values on CPU #{} for knob '{}'",
            observation.cpu,
            observation.knob.name()
        );

        let report = match inner.registry.seal(observation.cpu) {
            Some(report) => report,
            None => return Err(Error::InvalidObservation(id)),
        };

        if let Some(fault) = &report.fault {
            warn!(
                "timeline for CPU #{} stopped early on a device fault: {}",
                observation.cpu, fault
            );
        }

        if let Some(timeline) = report.timelines.get(&observation.knob) {
            for sample in timeline.iter() {
                cursor.record(*sample);
            }
        }

        Ok(())
    }

    /// The device fault that terminated an observation's sampler early, if
    /// any.
    ///
    /// `None` while the sampler is still running, and for samplers that
    /// stopped cleanly.  A truncated timeline is otherwise indistinguishable
    /// from a short one; this is the only place the loss is recorded.
    pub fn last_error(&self, id: usize) -> Result<Option<String>, Error> {
        let inner = self.inner.lock();
        let observation = inner
            .directory
            .observation(id)
            .ok_or(Error::InvalidObservation(id))?;

        match inner.registry.slot(observation.cpu) {
            Some(CpuSlot::Stopped(report)) => Ok(report.fault.clone()),
            _ => Ok(None),
        }
    }
}

impl<A: KnobAccess, C: ClockSource + Send + Sync + 'static> Drop for Plugin<A, C> {
    fn drop(&mut self) {
        // Samplers still running at teardown are stopped and joined here so
        // no sampling thread outlives the plugin.
        self.inner.lock().registry.seal_all();
    }
}
