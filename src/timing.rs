//! Human-paced delays and batch scheduling. Short uniform pauses between
//! individual actions, long uniform pauses between batches, and a lightly
//! randomized split of a daily total across batches.

use crate::config::TimingConfig;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Samples and applies the configured delay ranges.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    action_delay_secs: (f64, f64),
    batch_delay_secs: (f64, f64),
}

impl TimingPolicy {
    pub fn from_config(config: &TimingConfig) -> Self {
        Self {
            action_delay_secs: config.action_delay_secs,
            batch_delay_secs: config.batch_delay_secs,
        }
    }

    /// Suspend for a short random interval between individual actions.
    pub async fn between_actions(&self) {
        let delay = sample(self.action_delay_secs, &mut rand::rng());
        debug!("pausing {:.1}s between actions", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }

    /// Suspend for a long random interval between batches.
    pub async fn between_batches(&self) {
        let delay = sample(self.batch_delay_secs, &mut rand::rng());
        debug!("pausing {:.0}s between batches", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

fn sample((min, max): (f64, f64), rng: &mut impl Rng) -> Duration {
    if max <= min {
        return Duration::from_secs_f64(min.max(0.0));
    }
    Duration::from_secs_f64(rng.random_range(min..=max))
}

/// Distribute `total` actions across `batches` batches: even split, remainder
/// to randomly chosen batches, then a ±1 rebalancing between adjacent batches.
/// The result always sums to `total` and every entry is non-negative.
pub fn batch_schedule(total: u32, batches: usize) -> Vec<u32> {
    batch_schedule_with(total, batches, &mut rand::rng())
}

/// Seedable variant of [`batch_schedule`].
pub fn batch_schedule_with(total: u32, batches: usize, rng: &mut impl Rng) -> Vec<u32> {
    if batches == 0 {
        return Vec::new();
    }

    let base = total / batches as u32;
    let remainder = total % batches as u32;
    let mut schedule = vec![base; batches];

    for _ in 0..remainder {
        let idx = rng.random_range(0..batches);
        schedule[idx] += 1;
    }

    // Cosmetic jitter: shift a single action between neighbors, but never
    // below zero on either side.
    for i in 0..batches.saturating_sub(1) {
        if schedule[i] <= 2 {
            continue;
        }
        match rng.random_range(-1i32..=1) {
            1 if schedule[i + 1] > 0 => {
                schedule[i] += 1;
                schedule[i + 1] -= 1;
            }
            -1 => {
                schedule[i] -= 1;
                schedule[i + 1] += 1;
            }
            _ => {}
        }
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_schedule_sums_to_total() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let schedule = batch_schedule_with(10, 3, &mut rng);
            assert_eq!(schedule.len(), 3);
            assert_eq!(schedule.iter().sum::<u32>(), 10, "seed {}", seed);
        }
    }

    #[test]
    fn test_schedule_entries_non_negative_under_skew() {
        // A total smaller than the batch count concentrates the remainder on
        // a few batches; jitter must not push the empty ones below zero.
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let schedule = batch_schedule_with(3, 4, &mut rng);
            assert_eq!(schedule.iter().sum::<u32>(), 3, "seed {}", seed);
        }
    }

    #[test]
    fn test_schedule_even_split_unchanged() {
        let mut rng = StdRng::seed_from_u64(7);
        let schedule = batch_schedule_with(10, 5, &mut rng);
        // Base of 2 per batch is below the jitter threshold.
        assert_eq!(schedule, vec![2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_schedule_zero_batches() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(batch_schedule_with(10, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_schedule_zero_total() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(batch_schedule_with(0, 3, &mut rng), vec![0, 0, 0]);
    }

    #[test]
    fn test_sample_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample((0.0, 0.0), &mut rng), Duration::ZERO);
        assert_eq!(sample((2.0, 2.0), &mut rng), Duration::from_secs(2));
    }

    #[test]
    fn test_sample_within_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let d = sample((3.0, 7.0), &mut rng).as_secs_f64();
            assert!((3.0..=7.0).contains(&d));
        }
    }
}
