use proptest::prelude::*;
use queue_channel::{
    binary_entropy, capacity_curve, capacity_deterministic_service, capacity_random_service,
    flip_probability, run, ChannelError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn flip_probability_bounded_and_monotone(
        wait in 0.0f64..100.0,
        delta in 0.001f64..10.0,
        kappa in 0.001f64..10.0,
    ) {
        let p = flip_probability(wait, kappa);
        prop_assert!((0.0..=0.5).contains(&p));
        prop_assert!(flip_probability(wait + delta, kappa) >= p);
        prop_assert!(flip_probability(wait, kappa + delta) >= p);
    }

    #[test]
    fn binary_entropy_in_unit_interval(p in -1.0f64..2.0) {
        let h = binary_entropy(p);
        prop_assert!((0.0..=1.0).contains(&h));
    }

    #[test]
    fn capacity_non_increasing_in_kappa(
        lambda in 0.01f64..0.99,
        kappa in 0.0f64..10.0,
        dk in 0.0f64..10.0,
    ) {
        prop_assert!(
            capacity_random_service(lambda, kappa) + 1e-12
                >= capacity_random_service(lambda, kappa + dk)
        );
        prop_assert!(
            capacity_deterministic_service(lambda, kappa) + 1e-12
                >= capacity_deterministic_service(lambda, kappa + dk)
        );
    }

    #[test]
    fn capacity_bounded_by_arrival_rate(lambda in 0.0f64..0.999, kappa in 0.001f64..20.0) {
        for c in [
            capacity_random_service(lambda, kappa),
            capacity_deterministic_service(lambda, kappa),
        ] {
            prop_assert!(c >= 0.0);
            prop_assert!(c <= lambda + 1e-12);
        }
    }

    #[test]
    fn capacity_zero_when_unstable(lambda in 1.0f64..100.0, kappa in 0.001f64..20.0) {
        prop_assert_eq!(capacity_random_service(lambda, kappa), 0.0);
        prop_assert_eq!(capacity_deterministic_service(lambda, kappa), 0.0);
    }

    #[test]
    fn curve_matches_scalar_functions(kappa in 0.01f64..5.0, step in 0.005f64..0.2) {
        let curve = capacity_curve(kappa, 0.0, 0.99, step).unwrap();
        for point in &curve {
            prop_assert_eq!(point.random_service, capacity_random_service(point.lambda, kappa));
            prop_assert_eq!(
                point.deterministic_service,
                capacity_deterministic_service(point.lambda, kappa)
            );
        }
    }

    #[test]
    fn unstable_runs_fail(lambda in 1.0f64..5.0, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let err = run("payload", lambda, 1.0, &mut rng).unwrap_err();
        let is_unstable = matches!(err, ChannelError::UnstableQueue { .. });
        prop_assert!(is_unstable);
    }

    #[test]
    fn stable_runs_stay_in_range(
        lambda in 0.0f64..0.95,
        kappa in 0.001f64..20.0,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = run("proptest payload", lambda, kappa, &mut rng).unwrap();
        prop_assert_eq!(result.symbols, 16);
        prop_assert_eq!(result.received_text.chars().count(), 16);
        prop_assert!((0.0..=1.0).contains(&result.empirical_bit_error_rate));
        prop_assert!(result.estimated_capacity >= 0.0);
        prop_assert!(result.estimated_capacity <= lambda + 1e-12);
        prop_assert!(result.diagnostic_log.len() <= 64);
    }
}
