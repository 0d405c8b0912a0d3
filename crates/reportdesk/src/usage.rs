//! Running usage statistics for a template family

use serde::{Deserialize, Serialize};

use crate::error::{ReportdeskError, Result};

/// Usage count and mean completion time (seconds) of a template
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default)]
    pub usage_count: u64,

    #[serde(default)]
    pub average_completion_time: f64,
}

/// A change to apply to [`UsageStats`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsageUpdate {
    /// A report was started from the template
    Increment,
    /// A report was completed in the given number of seconds
    Completion(f64),
}

impl UsageUpdate {
    /// Reject completion times the running mean cannot absorb
    pub fn check(&self) -> Result<()> {
        match *self {
            UsageUpdate::Increment => Ok(()),
            UsageUpdate::Completion(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(()),
            UsageUpdate::Completion(seconds) => Err(ReportdeskError::InvalidCompletionTime(seconds)),
        }
    }
}

impl UsageStats {
    /// Compute the statistics after an update without mutating `self`.
    ///
    /// A completion counts as a use: the count is incremented first and the
    /// mean is then updated incrementally against the new count. The update
    /// `avg + (t - avg) / n` equals `(avg * (n - 1) + t) / n` but stays finite
    /// for any finite inputs.
    pub fn apply(&self, update: UsageUpdate) -> Result<UsageStats> {
        update.check()?;
        let usage_count = self.usage_count.saturating_add(1);

        let average_completion_time = match update {
            UsageUpdate::Increment => self.average_completion_time,
            UsageUpdate::Completion(seconds) if usage_count <= 1 => seconds,
            UsageUpdate::Completion(seconds) => {
                let n = usage_count as f64;
                let avg = self.average_completion_time;
                avg + (seconds - avg) / n
            }
        };

        Ok(UsageStats {
            usage_count,
            average_completion_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_n_times_adds_n() {
        let mut stats = UsageStats::default();
        for _ in 0..7 {
            stats = stats.apply(UsageUpdate::Increment).unwrap();
        }
        assert_eq!(stats.usage_count, 7);
        assert_eq!(stats.average_completion_time, 0.0);
    }

    #[test]
    fn test_first_completion_sets_average() {
        let stats = UsageStats::default()
            .apply(UsageUpdate::Completion(42.5))
            .unwrap();
        assert_eq!(stats.usage_count, 1);
        assert_eq!(stats.average_completion_time, 42.5);
    }

    #[test]
    fn test_completions_keep_running_mean() {
        let stats = UsageStats::default()
            .apply(UsageUpdate::Completion(10.0))
            .unwrap()
            .apply(UsageUpdate::Completion(20.0))
            .unwrap();
        assert_eq!(stats.usage_count, 2);
        assert_eq!(stats.average_completion_time, 15.0);

        let stats = stats.apply(UsageUpdate::Completion(45.0)).unwrap();
        assert_eq!(stats.usage_count, 3);
        assert_eq!(stats.average_completion_time, 25.0);
    }

    #[test]
    fn test_huge_completion_times_stay_finite() {
        let stats = UsageStats::default()
            .apply(UsageUpdate::Completion(1e308))
            .unwrap()
            .apply(UsageUpdate::Completion(1e308))
            .unwrap()
            .apply(UsageUpdate::Completion(f64::MAX))
            .unwrap();
        assert_eq!(stats.usage_count, 3);
        assert!(stats.average_completion_time.is_finite());
        assert!(stats.average_completion_time >= 1e308);

        let json = serde_json::to_string(&stats).unwrap();
        let restored: UsageStats = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.usage_count, 3);
        assert!(restored.average_completion_time.is_finite());
    }

    #[test]
    fn test_completion_after_plain_uses() {
        let stats = UsageStats {
            usage_count: 3,
            average_completion_time: 0.0,
        };
        let stats = stats.apply(UsageUpdate::Completion(10.0)).unwrap();
        assert_eq!(stats.usage_count, 4);
        assert_eq!(stats.average_completion_time, 2.5);
    }

    #[test]
    fn test_invalid_completion_times_are_rejected() {
        let stats = UsageStats {
            usage_count: 3,
            average_completion_time: 12.0,
        };
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                stats.apply(UsageUpdate::Completion(bad)),
                Err(ReportdeskError::InvalidCompletionTime(_))
            ));
        }
    }
}
