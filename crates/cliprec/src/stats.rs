use std::fmt;
use std::time::Duration;

/// Running count/total/max for one timed operation, with a soft limit used
/// to count slow samples.
#[derive(Debug, Clone)]
pub struct TimingStat {
    name: &'static str,
    count: u64,
    total: Duration,
    max: Duration,
    over_limit: u64,
    soft_limit: Duration,
}

impl TimingStat {
    pub fn new(name: &'static str, soft_limit: Duration) -> Self {
        Self {
            name,
            count: 0,
            total: Duration::ZERO,
            max: Duration::ZERO,
            over_limit: 0,
            soft_limit,
        }
    }

    pub fn add(&mut self, sample: Duration) {
        self.count += 1;
        self.total += sample;
        self.max = self.max.max(sample);
        if sample > self.soft_limit {
            self.over_limit += 1;
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.total = Duration::ZERO;
        self.max = Duration::ZERO;
        self.over_limit = 0;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn over_limit(&self) -> u64 {
        self.over_limit
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            let nanos = self.total.as_nanos() / u128::from(self.count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }
}

impl fmt::Display for TimingStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: n={} mean={:.1}ms max={:.1}ms over {:?}={}",
            self.name,
            self.count,
            self.mean().as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
            self.soft_limit,
            self.over_limit
        )
    }
}
