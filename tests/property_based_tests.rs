mod common;

use bridge_resilience::config::RecoveryConfig;
use bridge_resilience::errors::{RecoveryStrategy, ResilienceError};
use bridge_resilience::monitoring::{Aggregations, MetricSeries, MetricValue};
use bridge_resilience::recovery::{AttemptStatus, RecoveryManager, SessionStatus};
use bridge_resilience::resilience::{CircuitBreakerStateManager, CircuitState};
use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn fail(manager: &CircuitBreakerStateManager) {
    assert!(manager.try_acquire());
    manager.record_failure(Duration::from_millis(1), Some("connection refused"));
}

fn succeed(manager: &CircuitBreakerStateManager) {
    assert!(manager.try_acquire());
    manager.record_success(Duration::from_millis(1));
}

proptest! {
    /// Property: a closed breaker opens exactly at the configured number of consecutive failures
    #[test]
    fn breaker_opens_at_failure_threshold(threshold in failure_threshold_strategy()) {
        let manager = CircuitBreakerStateManager::new(bridge_resilience::CircuitBreakerConfig {
            failure_threshold: threshold,
            ..test_breaker_config("network")
        });

        for _ in 1..threshold {
            fail(&manager);
            prop_assert_eq!(manager.state(), CircuitState::Closed);
        }
        fail(&manager);
        prop_assert_eq!(manager.state(), CircuitState::Open);
        prop_assert!(!manager.can_execute());
    }

    /// Property: any failure in half-open reopens, whatever successes came before it
    #[test]
    fn half_open_failure_reopens(
        (success_threshold, successes) in success_threshold_strategy()
            .prop_flat_map(|s| (Just(s), 0..s))
    ) {
        let manager = CircuitBreakerStateManager::new(bridge_resilience::CircuitBreakerConfig {
            success_threshold,
            ..test_breaker_config("telegram")
        });
        manager.force_state(CircuitState::HalfOpen, "probe");

        for _ in 0..successes {
            succeed(&manager);
            prop_assert_eq!(manager.state(), CircuitState::HalfOpen);
        }
        fail(&manager);
        prop_assert_eq!(manager.state(), CircuitState::Open);
        prop_assert_eq!(manager.metrics().consecutive_successes, 0);
    }

    /// Property: cached aggregations always match a recomputation over the retained samples
    #[test]
    fn aggregations_match_retained_samples(samples in metric_samples_strategy()) {
        let now = Utc::now();
        let mut series = MetricSeries::new("app.response_time", Duration::from_secs(3_600));
        for (offset, value) in &samples {
            series.record(MetricValue::new(*value, now - ChronoDuration::seconds(*offset)));
        }

        let removed = series.cleanup(now);
        let expected_kept = samples.iter().filter(|(offset, _)| *offset <= 3_600).count();
        prop_assert_eq!(series.len(), expected_kept);
        prop_assert_eq!(removed, samples.len() - expected_kept);

        let cached = series.aggregations();
        let recomputed = Aggregations::compute(series.values());
        prop_assert_eq!(cached.count, recomputed.count);
        prop_assert!((cached.sum - recomputed.sum).abs() < 1e-6);
        prop_assert!((cached.avg - recomputed.avg).abs() < 1e-6);
        prop_assert_eq!(cached.min, recomputed.min);
        prop_assert_eq!(cached.max, recomputed.max);

        let timestamps: Vec<_> = series.values().map(|v| v.timestamp).collect();
        prop_assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    /// Property: every strategy reaches manual within six escalations and stays there
    #[test]
    fn escalation_chain_ends_in_manual(start in recovery_strategy_strategy()) {
        let mut strategy = start;
        for _ in 0..6 {
            strategy = strategy.escalate();
            prop_assert!(RecoveryStrategy::ALL.contains(&strategy));
        }
        prop_assert_eq!(strategy, RecoveryStrategy::Manual);
        prop_assert_eq!(strategy.escalate(), RecoveryStrategy::Manual);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: primary attempts never exceed the bound and only move along the chain
    #[test]
    fn sessions_respect_attempt_bound(
        category in error_category_strategy(),
        severity in error_severity_strategy(),
        max_attempts in 1u32..=6,
        escalation_threshold in 1u32..=3,
    ) {
        let config = RecoveryConfig {
            recovery_delay_ms: 0,
            escalation_threshold,
            ..recovery_config(max_attempts, Vec::new())
        };
        let manager = RecoveryManager::new(config)
            .with_actions(Arc::new(FailingActions::default()));
        let error = ResilienceError::new("GENERATED", "generated failure", category, severity);

        let session = tokio_test::block_on(manager.initiate_recovery(error));
        let strategies: Vec<_> = session.primary_attempts().map(|a| a.strategy).collect();

        prop_assert!(!strategies.is_empty());
        prop_assert!(strategies.len() <= max_attempts as usize);
        prop_assert!(strategies
            .windows(2)
            .all(|pair| pair[1] == pair[0] || pair[1] == pair[0].escalate()));
        prop_assert!(session.escalation_level < max_attempts);

        match session.status {
            SessionStatus::Escalated => prop_assert_eq!(strategies.len(), max_attempts as usize),
            SessionStatus::Succeeded => {
                prop_assert!(session
                    .attempts
                    .last()
                    .is_some_and(|a| a.status == AttemptStatus::Succeeded))
            }
            other => prop_assert!(false, "unexpected terminal status {}", other),
        }
    }
}
