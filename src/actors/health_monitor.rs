use actix::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::CarrierClient;
use crate::metrics::Metrics;
use crate::utils::CircuitState;

// ============================================================================
// Health Monitor Actor - Aggregates component health
// ============================================================================
//
// Responsibilities:
// - Track the last reported status of each background component
// - Watch the carrier circuit breaker and mirror it into metrics
// - Aggregate a system-wide status for the coordinator
//
// ============================================================================

const CARRIER_CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    carrier: Arc<dyn CarrierClient>,
    metrics: Arc<Metrics>,
}

impl HealthMonitorActor {
    pub fn new(carrier: Arc<dyn CarrierClient>, metrics: Arc<Metrics>) -> Self {
        Self {
            components: HashMap::new(),
            carrier,
            metrics,
        }
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut has_degraded = false;
        let mut unhealthy_components = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => {
                    unhealthy_components.push(format!("{}: {}", name, msg));
                }
                HealthStatus::Degraded(_) => {
                    has_degraded = true;
                }
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy_components.is_empty() {
            unhealthy_components.sort();
            HealthStatus::Unhealthy(unhealthy_components.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }

    fn record(&mut self, component: String, status: HealthStatus, details: Option<String>) {
        tracing::debug!(component = %component, status = ?status, "Updated component health");

        self.components.insert(
            component.clone(),
            ComponentHealth {
                name: component,
                status,
                last_check: Utc::now(),
                details,
            },
        );
    }

    fn check_carrier(&mut self) {
        let state = self.carrier.circuit_state();
        self.metrics.update_carrier_circuit_state(state.as_gauge());

        let status = match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("Circuit breaker half-open".to_string()),
            CircuitState::Open => HealthStatus::Unhealthy("Circuit breaker open".to_string()),
        };
        self.record("carrier".to_string(), status, None);
    }
}

impl Actor for HealthMonitorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor started");
        self.check_carrier();

        ctx.run_interval(CARRIER_CHECK_INTERVAL, |act, _ctx| act.check_carrier());
    }
}

impl Handler<UpdateHealth> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        self.record(msg.component, msg.status, msg.details);
    }
}

impl Handler<GetSystemHealth> for HealthMonitorActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        let overall_status = self.compute_overall_status();

        MessageResult(SystemHealth {
            overall_status,
            components: self.components.clone(),
            check_time: Utc::now(),
        })
    }
}
