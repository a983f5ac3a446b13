//! # ETA Estimator
//!
//! Linear extrapolation of a running batch's completion time from the
//! throughput observed so far. Recomputed on every progress report, never
//! on a polling cadence, so the estimate is exactly as fresh as the
//! counts it derives from.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct EtaEstimator;

impl EtaEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate the completion time of a running batch.
    ///
    /// `accounted_items` counts terminal outcomes (success + failure);
    /// items still queued for retry do not count. Before the first item
    /// is accounted, no estimate is produced - extrapolating from zero
    /// throughput would be meaningless.
    pub fn estimate(
        &self,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
        total_items: u32,
        accounted_items: u32,
    ) -> Option<DateTime<Utc>> {
        if accounted_items == 0 || total_items == 0 {
            return None;
        }

        let elapsed_ms = (now - started_at).num_milliseconds().max(0);
        let projected_ms =
            elapsed_ms * i64::from(total_items) / i64::from(accounted_items.max(1));
        Some(started_at + Duration::milliseconds(projected_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_estimate_before_first_completion() {
        let estimator = EtaEstimator::new();
        let started = Utc::now();
        assert!(estimator.estimate(started, started, 10, 0).is_none());
    }

    #[test]
    fn test_linear_extrapolation() {
        let estimator = EtaEstimator::new();
        let started = Utc::now();
        let now = started + Duration::seconds(10);

        // 2 of 10 items in 10s -> 50s projected total
        let eta = estimator.estimate(started, now, 10, 2).unwrap();
        assert_eq!(eta, started + Duration::seconds(50));
    }

    #[test]
    fn test_estimate_converges_for_constant_throughput() {
        let estimator = EtaEstimator::new();
        let started = Utc::now();

        // one item per second, 8 items total
        let mut previous: Option<DateTime<Utc>> = None;
        for accounted in 1..=8u32 {
            let now = started + Duration::seconds(i64::from(accounted));
            let eta = estimator.estimate(started, now, 8, accounted).unwrap();
            assert_eq!(eta, started + Duration::seconds(8));
            if let Some(prev) = previous {
                assert_eq!(eta, prev);
            }
            previous = Some(eta);
        }
    }

    #[test]
    fn test_all_accounted_estimates_now() {
        let estimator = EtaEstimator::new();
        let started = Utc::now();
        let now = started + Duration::seconds(30);
        let eta = estimator.estimate(started, now, 5, 5).unwrap();
        assert_eq!(eta, now);
    }
}
