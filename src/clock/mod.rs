use std::sync::Arc;

mod monotonic;
pub use self::monotonic::Monotonic;
mod mock;
pub use self::mock::Mock;

/// A source of measurement timestamps.
///
/// Samplers stamp every reading with `now()`.  The host framework supplies
/// its own measurement clock here so recorded ticks stay comparable with the
/// host's own timestamps; `Monotonic` is the stand-alone default.
pub trait ClockSource {
    fn now(&self) -> u64;
}

impl<T: ClockSource> ClockSource for Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
