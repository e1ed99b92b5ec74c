//! # Circuit Breaker Manager
//!
//! Registry of breakers keyed by dependency name. Each breaker is created on
//! first use from the dependency's block in [`ResilienceConfig`]; unknown
//! names use the network block.

use crate::config::ResilienceConfig;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerCallbacks, CircuitBreakerSnapshot, CircuitState,
    SystemCircuitBreakerMetrics,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Manager for multiple circuit breakers across bridge dependencies
#[derive(Debug)]
pub struct CircuitBreakerManager {
    /// Collection of circuit breakers by component name
    circuit_breakers: Arc<RwLock<HashMap<String, Arc<CircuitBreaker>>>>,

    config: Arc<ResilienceConfig>,

    /// Applied to every breaker the registry creates
    callbacks: CircuitBreakerCallbacks,
}

impl CircuitBreakerManager {
    pub fn from_config(config: Arc<ResilienceConfig>) -> Self {
        info!("Initializing circuit breaker manager");

        Self {
            circuit_breakers: Arc::new(RwLock::new(HashMap::new())),
            config,
            callbacks: CircuitBreakerCallbacks::default(),
        }
    }

    /// Attach callbacks shared by all breakers created from now on
    pub fn with_callbacks(mut self, callbacks: CircuitBreakerCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Get or create circuit breaker for a component
    pub async fn get_circuit_breaker(&self, component_name: &str) -> Arc<CircuitBreaker> {
        {
            let breakers = self.circuit_breakers.read().await;
            if let Some(breaker) = breakers.get(component_name) {
                return Arc::clone(breaker);
            }
        }

        let mut breakers = self.circuit_breakers.write().await;

        // Double-check: another task may have created it between the locks
        if let Some(breaker) = breakers.get(component_name) {
            return Arc::clone(breaker);
        }

        let component_config = self
            .config
            .operation_circuit_breaker(component_name)
            .unwrap_or_else(|| self.config.circuit_breaker_for(component_name));

        let breaker = Arc::new(CircuitBreaker::with_callbacks(
            component_config,
            self.callbacks.clone(),
        ));
        breakers.insert(component_name.to_string(), Arc::clone(&breaker));

        info!(
            component = component_name,
            total_circuit_breakers = breakers.len(),
            "Created new circuit breaker"
        );

        breaker
    }

    /// Existing breaker for a component, without creating one
    pub async fn find(&self, component_name: &str) -> Option<Arc<CircuitBreaker>> {
        self.circuit_breakers
            .read()
            .await
            .get(component_name)
            .map(Arc::clone)
    }

    /// Get all circuit breaker names
    pub async fn list_components(&self) -> Vec<String> {
        let breakers = self.circuit_breakers.read().await;
        breakers.keys().cloned().collect()
    }

    /// Get snapshot for a specific circuit breaker
    pub async fn get_component_snapshot(&self, component_name: &str) -> Option<CircuitBreakerSnapshot> {
        let breakers = self.circuit_breakers.read().await;
        breakers.get(component_name).map(|breaker| breaker.snapshot())
    }

    /// Get system-wide circuit breaker metrics
    pub async fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();

        let breakers = self.circuit_breakers.read().await;
        for breaker in breakers.values() {
            system_metrics.add_circuit_breaker(breaker.snapshot());
        }

        system_metrics
    }

    /// Force open all circuit breakers (emergency stop)
    pub async fn force_open_all(&self) {
        warn!("🚨 Forcing all circuit breakers open (emergency stop)");

        let breakers = self.circuit_breakers.read().await;
        for breaker in breakers.values() {
            breaker.force_open();
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub async fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed (emergency recovery)");

        let breakers = self.circuit_breakers.read().await;
        for breaker in breakers.values() {
            breaker.force_closed();
        }
    }

    /// Remove circuit breaker for a component
    pub async fn remove_circuit_breaker(&self, component_name: &str) -> bool {
        let mut breakers = self.circuit_breakers.write().await;
        if breakers.remove(component_name).is_some() {
            info!(
                component = component_name,
                remaining_count = breakers.len(),
                "🗑️ Removed circuit breaker"
            );
            true
        } else {
            false
        }
    }

    /// Get count of circuit breakers by state
    pub async fn get_state_summary(&self) -> HashMap<CircuitState, usize> {
        self.get_system_metrics().await.count_by_state()
    }

    /// Overall health based on circuit breaker states (0.0 to 1.0)
    pub async fn system_health_score(&self) -> f64 {
        self.get_system_metrics().await.health_score()
    }
}

impl Clone for CircuitBreakerManager {
    fn clone(&self) -> Self {
        Self {
            circuit_breakers: Arc::clone(&self.circuit_breakers),
            config: Arc::clone(&self.config),
            callbacks: self.callbacks.clone(),
        }
    }
}
