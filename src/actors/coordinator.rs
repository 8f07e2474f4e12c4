use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use super::health_monitor::{GetSystemHealth, HealthMonitorActor, HealthStatus, UpdateHealth};
use super::payment_reconciler::PaymentReconciler;
use super::tracking_poller::TrackingPoller;
use crate::clients::CarrierClient;
use crate::metrics::Metrics;
use crate::services::{PaymentService, ShipmentService};

// ============================================================================
// Coordinator Actor - Orchestrates the background actors
// ============================================================================
//
// Responsibilities:
// - Starts the health monitor and both periodic sweeps
// - Logs aggregated system health
// - Stops its children on shutdown
//
// Actor Hierarchy:
//   CoordinatorActor
//   ├── HealthMonitorActor
//   ├── TrackingPoller
//   └── PaymentReconciler
//
// ============================================================================

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// How often each sweep runs
#[derive(Debug, Clone, Copy)]
pub struct SweepSchedule {
    pub tracking_interval: Duration,
    pub reconcile_interval: Duration,
}

pub struct CoordinatorActor {
    shipments: Arc<ShipmentService>,
    payments: Arc<PaymentService>,
    carrier: Arc<dyn CarrierClient>,
    metrics: Arc<Metrics>,
    schedule: SweepSchedule,
    health_monitor: Option<Addr<HealthMonitorActor>>,
    tracking_poller: Option<Addr<TrackingPoller>>,
    payment_reconciler: Option<Addr<PaymentReconciler>>,
}

impl CoordinatorActor {
    pub fn new(
        shipments: Arc<ShipmentService>,
        payments: Arc<PaymentService>,
        carrier: Arc<dyn CarrierClient>,
        metrics: Arc<Metrics>,
        schedule: SweepSchedule,
    ) -> Self {
        Self {
            shipments,
            payments,
            carrier,
            metrics,
            schedule,
            health_monitor: None,
            tracking_poller: None,
            payment_reconciler: None,
        }
    }

    fn start_child_actors(&mut self) {
        tracing::info!("Starting background actors");

        let health_monitor = HealthMonitorActor::new(self.carrier.clone(), self.metrics.clone()).start();
        self.health_monitor = Some(health_monitor.clone());

        let tracking_poller = TrackingPoller::new(
            self.shipments.clone(),
            self.metrics.clone(),
            self.schedule.tracking_interval,
        )
        .with_health(health_monitor.clone())
        .start();
        self.tracking_poller = Some(tracking_poller);

        health_monitor.do_send(UpdateHealth {
            component: "tracking_poller".to_string(),
            status: HealthStatus::Healthy,
            details: Some("Tracking poller started".to_string()),
        });

        let payment_reconciler = PaymentReconciler::new(
            self.payments.clone(),
            self.metrics.clone(),
            self.schedule.reconcile_interval,
        )
        .with_health(health_monitor.clone())
        .start();
        self.payment_reconciler = Some(payment_reconciler);

        health_monitor.do_send(UpdateHealth {
            component: "payment_reconciler".to_string(),
            status: HealthStatus::Healthy,
            details: Some("Payment reconciler started".to_string()),
        });

        tracing::info!("✅ All background actors started");
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🎯 CoordinatorActor started");
        self.start_child_actors();

        ctx.run_interval(HEALTH_LOG_INTERVAL, |act, _ctx| {
            if let Some(ref health_monitor) = act.health_monitor {
                let health_monitor = health_monitor.clone();
                actix::spawn(async move {
                    match health_monitor.send(GetSystemHealth).await {
                        Ok(health) => match health.overall_status {
                            HealthStatus::Healthy => {
                                tracing::debug!("System health check: Healthy");
                            }
                            HealthStatus::Degraded(ref msg) => {
                                tracing::warn!("System health check: Degraded - {}", msg);
                            }
                            HealthStatus::Unhealthy(ref msg) => {
                                tracing::error!("System health check: Unhealthy - {}", msg);
                            }
                        },
                        Err(e) => {
                            tracing::error!("Failed to get system health: {}", e);
                        }
                    }
                });
            }
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("🛑 CoordinatorActor stopping - initiating graceful shutdown");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 CoordinatorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

impl Handler<Shutdown> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) {
        tracing::info!("Received shutdown signal");

        if let Some(ref tracking_poller) = self.tracking_poller {
            tracking_poller.do_send(StopActor);
        }
        if let Some(ref payment_reconciler) = self.payment_reconciler {
            payment_reconciler.do_send(StopActor);
        }
        if let Some(ref health_monitor) = self.health_monitor {
            health_monitor.do_send(StopActor);
        }

        ctx.stop();
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for TrackingPoller {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

impl Handler<StopActor> for PaymentReconciler {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

impl Handler<StopActor> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor received stop signal");
        ctx.stop();
    }
}

#[derive(Message)]
#[rtype(result = "Option<Addr<HealthMonitorActor>>")]
pub struct GetHealthMonitor;

impl Handler<GetHealthMonitor> for CoordinatorActor {
    type Result = Option<Addr<HealthMonitorActor>>;

    fn handle(&mut self, _: GetHealthMonitor, _: &mut Self::Context) -> Self::Result {
        self.health_monitor.clone()
    }
}
