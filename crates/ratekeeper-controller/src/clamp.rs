//! Clamp engine
//!
//! Bounds a candidate rate in two stages:
//! 1. Rate of change around the previous stored rate: the intersection of
//!    `[prev - maxDecrease, prev + maxIncrease]` and
//!    `[prev * (1 - maxPercentDecrease), prev * (1 + maxPercentIncrease)]`.
//!    Skipped when there is no previous rate.
//! 2. Absolute bounds `[min, max]`, which always win.

use ratekeeper_common::{apply_bps, ConfigError, RateConfig};
use serde::{Deserialize, Serialize};

/// The bound that determined a clamped rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClampBound {
    MaxIncrease,
    MaxDecrease,
    MaxPercentIncrease,
    MaxPercentDecrease,
    Max,
    Min,
}

/// Result of clamping a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampOutcome {
    /// Rate after all bounds
    pub rate: u128,
    /// Last bound that moved the candidate, `None` if it passed untouched
    pub bound: Option<ClampBound>,
}

impl ClampOutcome {
    pub fn is_clamped(&self) -> bool {
        self.bound.is_some()
    }
}

/// Stateless clamp engine
pub struct ClampEngine;

impl ClampEngine {
    /// Clamp `candidate` against `config` and the previous stored rate
    pub fn clamp(
        config: &RateConfig,
        previous: Option<u128>,
        candidate: u128,
    ) -> Result<ClampOutcome, ConfigError> {
        if config.min > config.max {
            return Err(ConfigError::MinAboveMax {
                min: config.min,
                max: config.max,
            });
        }

        let mut rate = candidate;
        let mut bound = None;

        if let Some(previous) = previous {
            let (upper, upper_bound) = Self::upper_change_limit(config, previous);
            let (lower, lower_bound) = Self::lower_change_limit(config, previous);

            if rate > upper {
                rate = upper;
                bound = Some(upper_bound);
            } else if rate < lower {
                rate = lower;
                bound = Some(lower_bound);
            }
        }

        if rate > config.max {
            rate = config.max;
            bound = Some(ClampBound::Max);
        } else if rate < config.min {
            rate = config.min;
            bound = Some(ClampBound::Min);
        }

        Ok(ClampOutcome { rate, bound })
    }

    /// Tightest upper limit on the next rate, and which bound sets it
    pub fn upper_change_limit(config: &RateConfig, previous: u128) -> (u128, ClampBound) {
        let absolute = previous.saturating_add(config.max_increase);
        let percent = previous.saturating_add(apply_bps(previous, config.max_percent_increase));

        if percent < absolute {
            (percent, ClampBound::MaxPercentIncrease)
        } else {
            (absolute, ClampBound::MaxIncrease)
        }
    }

    /// Tightest lower limit on the next rate, and which bound sets it
    pub fn lower_change_limit(config: &RateConfig, previous: u128) -> (u128, ClampBound) {
        let absolute = previous.saturating_sub(config.max_decrease);
        let percent = previous.saturating_sub(apply_bps(previous, config.max_percent_decrease));

        if percent > absolute {
            (percent, ClampBound::MaxPercentDecrease)
        } else {
            (absolute, ClampBound::MaxDecrease)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> RateConfig {
        RateConfig {
            max: 1_000_000_000_000_000_000,
            min: 0,
            max_increase: 20_000_000_000_000_000,
            max_decrease: 10_000_000_000_000_000,
            max_percent_increase: 10_000,
            max_percent_decrease: 10_000,
            base: 600_000_000_000_000_000,
            components: vec![],
        }
    }

    #[test]
    fn test_first_observation_only_absolute_bounds() {
        let outcome = ClampEngine::clamp(&config(), None, 600_000_000_000_000_000).unwrap();
        assert_eq!(outcome.rate, 600_000_000_000_000_000);
        assert!(!outcome.is_clamped());

        let outcome = ClampEngine::clamp(&config(), None, 2_000_000_000_000_000_000).unwrap();
        assert_eq!(outcome.rate, 1_000_000_000_000_000_000);
        assert_eq!(outcome.bound, Some(ClampBound::Max));
    }

    #[test]
    fn test_absolute_increase() {
        let outcome = ClampEngine::clamp(
            &config(),
            Some(600_000_000_000_000_000),
            900_000_000_000_000_000,
        )
        .unwrap();
        assert_eq!(outcome.rate, 620_000_000_000_000_000);
        assert_eq!(outcome.bound, Some(ClampBound::MaxIncrease));
    }

    #[test]
    fn test_absolute_decrease() {
        let outcome = ClampEngine::clamp(&config(), Some(600_000_000_000_000_000), 0).unwrap();
        assert_eq!(outcome.rate, 590_000_000_000_000_000);
        assert_eq!(outcome.bound, Some(ClampBound::MaxDecrease));
    }

    #[test]
    fn test_percent_bound_tighter() {
        let mut cfg = config();
        cfg.max_percent_increase = 100; // 1%
        cfg.max_percent_decrease = 50; // 0.5%

        let up = ClampEngine::clamp(&cfg, Some(1_000), 5_000).unwrap();
        assert_eq!(up.rate, 1_010);
        assert_eq!(up.bound, Some(ClampBound::MaxPercentIncrease));

        let down = ClampEngine::clamp(&cfg, Some(1_000), 0).unwrap();
        assert_eq!(down.rate, 995);
        assert_eq!(down.bound, Some(ClampBound::MaxPercentDecrease));
    }

    #[test]
    fn test_zero_previous_with_percent_limit_is_stuck() {
        let mut cfg = config();
        cfg.max_percent_increase = 1_000;
        let outcome = ClampEngine::clamp(&cfg, Some(0), 500).unwrap();
        assert_eq!(outcome.rate, 0);
    }

    #[test]
    fn test_absolute_bounds_win_over_change_window() {
        let mut cfg = config();
        cfg.min = 800_000_000_000_000_000;
        // previous is far below the new floor; the floor still holds
        let outcome = ClampEngine::clamp(
            &cfg,
            Some(100_000_000_000_000_000),
            900_000_000_000_000_000,
        )
        .unwrap();
        assert_eq!(outcome.rate, 800_000_000_000_000_000);
        assert_eq!(outcome.bound, Some(ClampBound::Min));
    }

    #[test]
    fn test_min_above_max_is_config_error() {
        let mut cfg = config();
        cfg.min = cfg.max + 1;
        assert!(matches!(
            ClampEngine::clamp(&cfg, None, 1),
            Err(ConfigError::MinAboveMax { .. })
        ));
    }

    #[test]
    fn test_unbounded_change_near_max() {
        let cfg = RateConfig::fixed(0);
        let outcome = ClampEngine::clamp(&cfg, Some(u128::MAX - 1), u128::MAX).unwrap();
        assert_eq!(outcome.rate, u128::MAX);
        assert!(!outcome.is_clamped());
    }

    proptest! {
        #[test]
        fn prop_result_within_all_bounds(
            min in 0u128..1_000_000,
            span in 0u128..1_000_000,
            max_increase in 0u128..100_000,
            max_decrease in 0u128..100_000,
            pct_increase in 0u32..20_000,
            pct_decrease in 0u32..=10_000,
            previous_offset in 0u128..1_000_000,
            candidate in 0u128..3_000_000,
        ) {
            let cfg = RateConfig {
                max: min + span,
                min,
                max_increase,
                max_decrease,
                max_percent_increase: pct_increase,
                max_percent_decrease: pct_decrease,
                base: 0,
                components: vec![],
            };
            // previous inside [min, max], as it is after any clamped update
            let previous = min + previous_offset % (span + 1);
            let outcome = ClampEngine::clamp(&cfg, Some(previous), candidate).unwrap();

            prop_assert!(outcome.rate >= cfg.min && outcome.rate <= cfg.max);
            if outcome.rate > previous {
                prop_assert!(outcome.rate - previous <= max_increase);
                prop_assert!(outcome.rate - previous <= apply_bps(previous, pct_increase));
            } else {
                prop_assert!(previous - outcome.rate <= max_decrease);
                prop_assert!(previous - outcome.rate <= apply_bps(previous, pct_decrease));
            }
        }
    }
}
