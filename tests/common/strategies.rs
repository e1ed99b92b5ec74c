use bridge_resilience::errors::{ErrorCategory, ErrorSeverity, RecoveryStrategy};
use proptest::prelude::*;
use proptest::sample::select;

/// Any recovery strategy
pub fn recovery_strategy_strategy() -> impl Strategy<Value = RecoveryStrategy> {
    select(RecoveryStrategy::ALL.to_vec())
}

pub fn error_severity_strategy() -> impl Strategy<Value = ErrorSeverity> {
    prop_oneof![
        Just(ErrorSeverity::Low),
        Just(ErrorSeverity::Medium),
        Just(ErrorSeverity::High),
        Just(ErrorSeverity::Critical),
    ]
}

/// Categories whose default strategy can be exercised without side effects
pub fn error_category_strategy() -> impl Strategy<Value = ErrorCategory> {
    prop_oneof![
        Just(ErrorCategory::Network),
        Just(ErrorCategory::Timeout),
        Just(ErrorCategory::RateLimit),
        Just(ErrorCategory::Telegram),
        Just(ErrorCategory::Filesystem),
        Just(ErrorCategory::Unknown),
    ]
}

/// Breaker thresholds in the range real configurations use
pub fn failure_threshold_strategy() -> impl Strategy<Value = u32> {
    1u32..=20
}

pub fn success_threshold_strategy() -> impl Strategy<Value = u32> {
    2u32..=8
}

/// Samples as (offset in seconds before now, value)
pub fn metric_samples_strategy() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..7_200, -1_000.0f64..1_000.0), 0..60)
}
