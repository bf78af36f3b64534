use crate::sampler::{Sampler, SamplerReport};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;

/// Lifecycle slot for one CPU's sampler.
///
/// A slot only ever moves `Running -> Stopped`; there is no way back.
pub(crate) enum CpuSlot {
    Running(Sampler),
    Stopped(SamplerReport),
}

/// CPU id -> sampler slot.
///
/// At most one sampler exists per CPU.  The registry itself is not
/// synchronized; the plugin guards it (together with the metric directory)
/// behind one coarse lock, since registration and retrieval are infrequent.
#[derive(Default)]
pub(crate) struct Registry {
    cpus: HashMap<usize, CpuSlot, FnvBuildHasher>,
}

impl Registry {
    pub(crate) fn slot(&self, cpu: usize) -> Option<&CpuSlot> {
        self.cpus.get(&cpu)
    }

    /// Records a freshly started sampler for a CPU with no slot yet.
    pub(crate) fn insert_running(&mut self, cpu: usize, sampler: Sampler) {
        self.cpus.insert(cpu, CpuSlot::Running(sampler));
    }

    /// Stops the CPU's sampler if it is still running and returns the
    /// sealed report.
    ///
    /// Sealing an already-sealed CPU is a no-op that returns the same
    /// report, which is what makes retrieval idempotent.  Returns `None`
    /// for a CPU that never had a sampler.
    pub(crate) fn seal(&mut self, cpu: usize) -> Option<&SamplerReport> {
        match self.cpus.remove(&cpu) {
            Some(CpuSlot::Running(sampler)) => {
                self.cpus.insert(cpu, CpuSlot::Stopped(sampler.stop()));
            },
            Some(slot) => {
                self.cpus.insert(cpu, slot);
            },
            None => return None,
        }

        match self.cpus.get(&cpu) {
            Some(CpuSlot::Stopped(report)) => Some(report),
            _ => None,
        }
    }

    /// Seals every CPU that still has a running sampler.
    pub(crate) fn seal_all(&mut self) {
        let running: Vec<usize> = self
            .cpus
            .iter()
            .filter_map(|(cpu, slot)| match slot {
                CpuSlot::Running(_) => Some(*cpu),
                CpuSlot::Stopped(_) => None,
            })
            .collect();

        for cpu in running {
            self.seal(cpu);
        }
    }
}
