use crate::{
    affinity::CpuMask,
    clock::ClockSource,
    error::Error,
    knob::{Device, Knob},
    timeline::{Sample, TimelineStore},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Everything a sampler thread hands back when it is joined: the sealed
/// timelines, and the device fault that ended the loop early, if any.
pub(crate) struct SamplerReport {
    pub(crate) timelines: TimelineStore,
    pub(crate) fault: Option<String>,
}

/// Background polling unit for one CPU.
///
/// A sampler owns one device binding and one OS thread pinned to the CPU
/// the device represents.  The loop thread owns the timeline store outright
/// while it runs; `stop` recovers the store through the join, so every
/// write happens-before any read of the returned timelines.
///
/// Samplers are single-use: `stop` consumes the sampler, and a stopped
/// sampler is never restarted.
pub(crate) struct Sampler {
    cpu: usize,
    looping: Arc<AtomicBool>,
    knob_tx: Sender<Knob>,
    thread: thread::JoinHandle<SamplerReport>,
}

impl Sampler {
    /// Spawns the sampling thread for a CPU.
    ///
    /// The caller must already be pinned to `cpu`; its affinity mask is
    /// captured here and handed to the loop thread by value, which
    /// re-applies it before sampling.
    pub(crate) fn start<D, C>(
        cpu: usize,
        device: D,
        interval: Duration,
        clock: Arc<C>,
    ) -> Result<Sampler, Error>
    where
        D: Device,
        C: ClockSource + Send + Sync + 'static,
    {
        let mask = CpuMask::current()?;
        let looping = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&looping);
        let (knob_tx, knob_rx) = unbounded();

        debug!("starting sampling thread for CPU #{}", cpu);
        let thread = thread::Builder::new()
            .name(format!("knobtap-cpu{}", cpu))
            .spawn(move || sample_loop(cpu, device, mask, interval, clock, knob_rx, flag))
            .map_err(Error::Spawn)?;

        Ok(Sampler {
            cpu,
            looping,
            knob_tx,
            thread,
        })
    }

    /// Adds a knob to the running loop's active set.
    ///
    /// If the loop has already exited on a device fault the send fails;
    /// the timeline simply stops growing, matching the fault semantics of
    /// the loop itself.
    pub(crate) fn track(&self, knob: Knob) {
        if self.knob_tx.send(knob).is_err() {
            debug!("sampler for CPU #{} is no longer accepting knobs", self.cpu);
        }
    }

    /// Stops the loop and recovers its timelines.
    ///
    /// Blocks until the loop thread has exited.  The Release store pairs
    /// with the loop's Acquire load, and the join is the synchronization
    /// point that makes the returned timelines safe to read unsynchronized.
    pub(crate) fn stop(self) -> SamplerReport {
        self.looping.store(false, Ordering::Release);
        match self.thread.join() {
            Ok(report) => report,
            Err(_) => {
                error!("sampling thread for CPU #{} panicked", self.cpu);
                SamplerReport {
                    timelines: TimelineStore::default(),
                    fault: Some(format!("sampling thread for CPU #{} panicked", self.cpu)),
                }
            },
        }
    }
}

fn sample_loop<D, C>(
    cpu: usize,
    mut device: D,
    mask: CpuMask,
    interval: Duration,
    clock: Arc<C>,
    knob_rx: Receiver<Knob>,
    looping: Arc<AtomicBool>,
) -> SamplerReport
where
    D: Device,
    C: ClockSource + Send + Sync + 'static,
{
    // The spawning thread was pinned when the mask was captured, but its
    // affinity may change later; re-applying the mask here keeps the loop
    // on the device's CPU no matter what.
    if let Err(e) = mask.apply() {
        warn!("failed to apply affinity mask on CPU #{}: {}", cpu, e);
    }

    debug!("entered sampling loop on CPU #{}", cpu);

    let mut knobs: Vec<Knob> = Vec::new();
    let mut timelines = TimelineStore::default();
    let mut fault = None;

    'sampling: while looping.load(Ordering::Acquire) {
        while let Ok(knob) = knob_rx.try_recv() {
            if !knobs.contains(&knob) {
                timelines.track(knob.clone());
                knobs.push(knob);
            }
        }

        for knob in &knobs {
            match device.read(knob) {
                Ok(value) => timelines.append(knob, Sample::new(clock.now(), value)),
                Err(e) => {
                    error!("read of knob '{}' failed on CPU #{}: {}", knob.name(), cpu, e);
                    fault = Some(format!("read of knob '{}' failed: {}", knob.name(), e));
                    break 'sampling;
                },
            }
        }

        thread::sleep(interval);
    }

    debug!("leaving sampling loop on CPU #{}", cpu);

    SamplerReport { timelines, fault }
}

#[cfg(test)]
mod tests {
    use super::Sampler;
    use crate::{
        clock::Monotonic,
        knob::{Device, Knob},
    };
    use std::{io, sync::Arc, thread, time::Duration};

    struct CountingDevice {
        next: u64,
    }

    impl Device for CountingDevice {
        fn read(&mut self, _knob: &Knob) -> io::Result<u64> {
            self.next += 1;
            Ok(self.next)
        }
    }

    struct FailingDevice {
        reads_left: u32,
    }

    impl Device for FailingDevice {
        fn read(&mut self, _knob: &Knob) -> io::Result<u64> {
            if self.reads_left == 0 {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "msr gone"));
            }
            self.reads_left -= 1;
            Ok(7)
        }
    }

    #[test]
    fn test_sampler_collects_and_stops() {
        let device = CountingDevice { next: 0 };
        let clock = Arc::new(Monotonic::new());
        let knob = Knob::new("k", "a knob");

        let sampler =
            Sampler::start(0, device, Duration::from_millis(10), clock).unwrap();
        sampler.track(knob.clone());

        thread::sleep(Duration::from_millis(55));
        let report = sampler.stop();

        assert!(report.fault.is_none());
        let timeline = report.timelines.get(&knob).unwrap();
        assert!(timeline.len() >= 2, "expected at least 2 samples, got {}", timeline.len());

        let ticks: Vec<u64> = timeline.iter().map(|s| s.ticks()).collect();
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));

        let values: Vec<u64> = timeline.iter().map(|s| s.value()).collect();
        let expected: Vec<u64> = (1..=values.len() as u64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_duplicate_track_shares_one_timeline() {
        let device = CountingDevice { next: 0 };
        let clock = Arc::new(Monotonic::new());
        let knob = Knob::new("k", "a knob");

        let sampler =
            Sampler::start(0, device, Duration::from_millis(10), clock).unwrap();
        sampler.track(knob.clone());
        sampler.track(knob.clone());

        thread::sleep(Duration::from_millis(35));
        let report = sampler.stop();

        let timeline = report.timelines.get(&knob).unwrap();
        // One read per iteration: values stay consecutive when the knob is
        // tracked once despite the duplicate registration.
        let values: Vec<u64> = timeline.iter().map(|s| s.value()).collect();
        let expected: Vec<u64> = (1..=values.len() as u64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_device_fault_truncates_but_keeps_samples() {
        let device = FailingDevice { reads_left: 2 };
        let clock = Arc::new(Monotonic::new());
        let knob = Knob::new("k", "a knob");

        let sampler =
            Sampler::start(0, device, Duration::from_millis(5), clock).unwrap();
        sampler.track(knob.clone());

        thread::sleep(Duration::from_millis(60));
        let report = sampler.stop();

        assert!(report.fault.is_some());
        let timeline = report.timelines.get(&knob).unwrap();
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_stop_without_knobs_returns_empty_store() {
        let device = CountingDevice { next: 0 };
        let clock = Arc::new(Monotonic::new());

        let sampler =
            Sampler::start(0, device, Duration::from_millis(5), clock).unwrap();
        let report = sampler.stop();

        assert!(report.fault.is_none());
        let knob = Knob::new("k", "a knob");
        assert!(report.timelines.get(&knob).is_none());
    }
}
