use crate::clock::ClockSource;

/// Monotonic nanosecond tick source, backed by `CLOCK_MONOTONIC`.
#[derive(Clone, Copy, Default)]
pub struct Monotonic;

impl Monotonic {
    pub fn new() -> Monotonic {
        Monotonic
    }
}

impl ClockSource for Monotonic {
    fn now(&self) -> u64 {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        (ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64
    }
}
