use crate::error::Error;
use std::{io, mem};

/// A CPU affinity mask for the calling thread.
///
/// Thin wrapper over `cpu_set_t`.  Masks are plain data: a captured mask can
/// be handed to a spawned thread by value and applied there, which is how the
/// sampler pins its loop thread to the CPU it was registered on.
#[derive(Clone, Copy)]
pub struct CpuMask(libc::cpu_set_t);

impl CpuMask {
    /// An empty mask with no CPUs set.
    pub fn empty() -> CpuMask {
        CpuMask(unsafe { mem::zeroed() })
    }

    /// The affinity mask of the calling thread.
    pub fn current() -> Result<CpuMask, Error> {
        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        let rc = unsafe { libc::sched_getaffinity(0, mem::size_of::<libc::cpu_set_t>(), &mut set) };
        if rc != 0 {
            return Err(Error::Affinity(io::Error::last_os_error()));
        }
        Ok(CpuMask(set))
    }

    /// Applies this mask to the calling thread.
    pub fn apply(&self) -> Result<(), Error> {
        let rc = unsafe { libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &self.0) };
        if rc != 0 {
            return Err(Error::Affinity(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Adds a CPU to the mask.
    pub fn set(&mut self, cpu: usize) {
        unsafe { libc::CPU_SET(cpu, &mut self.0) }
    }

    /// Whether a CPU is part of the mask.
    pub fn is_set(&self, cpu: usize) -> bool {
        unsafe { libc::CPU_ISSET(cpu, &self.0) }
    }

    /// Number of CPUs in the mask.
    pub fn count(&self) -> usize {
        unsafe { libc::CPU_COUNT(&self.0) as usize }
    }

    /// Whether the mask restricts its thread to exactly one CPU.
    pub fn is_pinned(&self) -> bool {
        self.count() == 1
    }

    /// Iterates over the CPU ids present in the mask.
    pub fn cpus(&self) -> impl Iterator<Item = usize> + '_ {
        (0..libc::CPU_SETSIZE as usize).filter(move |&cpu| self.is_set(cpu))
    }
}

/// The CPU the calling thread is currently running on.
pub fn current_cpu() -> Result<usize, Error> {
    let rc = unsafe { libc::sched_getcpu() };
    if rc < 0 {
        return Err(Error::CpuUnavailable(io::Error::last_os_error()));
    }
    Ok(rc as usize)
}
