//! Property tests for the bounded rate invariants

use std::sync::Arc;

use proptest::prelude::*;
use ratekeeper_common::apply_bps;
use ratekeeper_controller::{
    Address, AuthorizationPolicy, ControllerSettings, ManualClock, RateConfig, RateController,
    SourceRegistry,
};

const PERIOD: u64 = 60;

fn owner() -> Address {
    Address::repeat_byte(0xaa)
}

fn token() -> Address {
    Address::repeat_byte(0x01)
}

fn controller(clock: Arc<ManualClock>, capacity: usize) -> RateController {
    RateController::new(
        ControllerSettings::default()
            .with_period_secs(PERIOD)
            .with_initial_capacity(capacity),
        AuthorizationPolicy::self_managed(owner()),
        SourceRegistry::new(),
    )
    .unwrap()
    .with_clock(clock)
}

prop_compose! {
    fn bounded_config()(
        min in 0u128..1_000_000,
        span in 0u128..1_000_000,
        max_increase in 0u128..50_000,
        max_decrease in 0u128..50_000,
        max_percent_increase in 0u32..5_000,
        max_percent_decrease in 0u32..=10_000,
    ) -> RateConfig {
        RateConfig {
            max: min + span,
            min,
            max_increase,
            max_decrease,
            max_percent_increase,
            max_percent_decrease,
            base: 0,
            components: vec![],
        }
    }
}

proptest! {
    #[test]
    fn prop_rates_stay_bounded(
        config in bounded_config(),
        bases in proptest::collection::vec(0u128..3_000_000, 1..20),
    ) {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut controller = controller(clock.clone(), 4);
        let mut previous: Option<u128> = None;

        for base in bases {
            let mut next = config.clone();
            next.base = base;
            controller.set_config(owner(), token(), next).unwrap();
            controller.update(owner(), token()).unwrap();

            let rate = controller.compute_rate(token()).unwrap();
            prop_assert!(rate >= config.min && rate <= config.max);

            if let Some(prev) = previous {
                if rate >= prev {
                    prop_assert!(rate - prev <= config.max_increase);
                    prop_assert!(rate - prev <= apply_bps(prev, config.max_percent_increase));
                } else {
                    prop_assert!(prev - rate <= config.max_decrease);
                    prop_assert!(prev - rate <= apply_bps(prev, config.max_percent_decrease));
                }
            }

            previous = Some(rate);
            clock.advance(PERIOD);
        }
    }

    #[test]
    fn prop_capacity_never_decreases(
        initial in 1usize..64,
        requests in proptest::collection::vec(0usize..128, 1..20),
    ) {
        let clock = Arc::new(ManualClock::new(0));
        let mut controller = controller(clock, initial);
        controller.set_config(owner(), token(), RateConfig::fixed(1)).unwrap();

        let mut capacity = initial;
        for requested in requests {
            let result = controller.set_rates_capacity(owner(), token(), requested);
            if requested < capacity {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
                capacity = requested;
            }
            prop_assert_eq!(controller.rates_capacity(token()).unwrap(), capacity);
        }
    }
}
