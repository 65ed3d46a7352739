use std::time::{Duration, Instant};

/// Wall-clock budget tracker for one invocation.
///
/// The guard is consulted before every document, so it must stay a plain time
/// read with no locking or syscall-heavy bookkeeping. The start timestamp is
/// captured once and never persisted: a fresh invocation always starts from
/// zero.
#[derive(Debug, Clone, Copy)]
pub struct ElapsedGuard {
    started_at: Instant,
    budget: Duration,
}

impl ElapsedGuard {
    pub fn start(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_over_budget(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_guard_is_under_budget() {
        let guard = ElapsedGuard::start(Duration::from_secs(60));
        assert!(!guard.is_over_budget());
    }

    #[test]
    fn zero_budget_trips_immediately_and_stays_tripped() {
        let guard = ElapsedGuard::start(Duration::ZERO);
        assert!(guard.is_over_budget());
        assert!(guard.is_over_budget());
    }

    #[test]
    fn elapsed_is_monotonic() {
        let guard = ElapsedGuard::start(Duration::from_secs(60));
        let first = guard.elapsed();
        let second = guard.elapsed();
        assert!(second >= first);
    }
}
