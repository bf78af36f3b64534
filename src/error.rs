use std::{error, fmt, io};

/// Errors surfaced by the plugin and its sampling machinery.
#[derive(Debug)]
pub enum Error {
    /// The access library does not recognize the knob name.
    UnknownKnob(String),

    /// Registration was attempted from a thread whose affinity mask spans
    /// more than one CPU.
    NotPinned,

    /// The OS could not report which CPU the calling thread runs on.
    CpuUnavailable(io::Error),

    /// Reading or applying a thread affinity mask failed.
    Affinity(io::Error),

    /// The OS refused to spawn a sampling thread.
    Spawn(io::Error),

    /// The access library could not open a device for the given CPU.
    Device { cpu: usize, source: io::Error },

    /// Registration targeted a CPU whose sampler has already been stopped.
    /// Samplers are single-use; a stopped sampler is never restarted.
    SamplerStopped(usize),

    /// Retrieval was called with an id that was never handed out.
    InvalidObservation(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownKnob(name) => write!(f, "unknown knob name '{}'", name),
            Error::NotPinned => write!(f, "calling thread is not pinned to a single CPU"),
            Error::CpuUnavailable(e) => write!(f, "failed to get current CPU: {}", e),
            Error::Affinity(e) => write!(f, "affinity mask operation failed: {}", e),
            Error::Spawn(e) => write!(f, "failed to spawn sampling thread: {}", e),
            Error::Device { cpu, source } => {
                write!(f, "failed to open device for CPU #{}: {}", cpu, source)
            },
            Error::SamplerStopped(cpu) => {
                write!(f, "sampler for CPU #{} has already been stopped", cpu)
            },
            Error::InvalidObservation(id) => write!(f, "invalid observation id {}", id),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::CpuUnavailable(e) | Error::Affinity(e) | Error::Spawn(e) => Some(e),
            Error::Device { source, .. } => Some(source),
            _ => None,
        }
    }
}
