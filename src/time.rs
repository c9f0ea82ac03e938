use {
    std::{
        cmp::Ordering,
        fmt::{Debug, Formatter},
        ops::Sub,
        time::Duration,
    },
    uapi::c,
};

/// A point on the monotonic clock.
#[derive(Copy, Clone)]
pub struct Time(pub c::timespec);

impl Debug for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Time")
            .field("tv_sec", &self.0.tv_sec)
            .field("tv_nsec", &self.0.tv_nsec)
            .finish()
    }
}

impl Time {
    pub fn now_unchecked() -> Time {
        let mut time = uapi::pod_zeroed();
        let _ = uapi::clock_gettime(c::CLOCK_MONOTONIC, &mut time);
        Self(time)
    }

    pub fn usec(self) -> u64 {
        let sec = self.0.tv_sec as u64 * 1_000_000;
        let nsec = self.0.tv_nsec as u64 / 1_000;
        sec + nsec
    }

    pub fn msec(self) -> u64 {
        let sec = self.0.tv_sec as u64 * 1_000;
        let nsec = self.0.tv_nsec as u64 / 1_000_000;
        sec + nsec
    }

    pub fn elapsed(self) -> Duration {
        Self::now_unchecked() - self
    }
}

impl Eq for Time {}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.0.tv_sec == other.0.tv_sec && self.0.tv_nsec == other.0.tv_nsec
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .tv_sec
            .cmp(&other.0.tv_sec)
            .then_with(|| self.0.tv_nsec.cmp(&other.0.tv_nsec))
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Self::Output {
        let sec = self.0.tv_sec as i64 - rhs.0.tv_sec as i64;
        let nsec = self.0.tv_nsec as i64 - rhs.0.tv_nsec as i64;
        Duration::from_nanos((sec * 1_000_000_000 + nsec).max(0) as u64)
    }
}
