use actix::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::health_monitor::{HealthMonitorActor, HealthStatus, UpdateHealth};
use crate::metrics::Metrics;
use crate::services::{PaymentService, ReconcileReport};
use crate::utils::SweepGuard;

// ============================================================================
// Payment Reconciler Actor - Links late payments to their orders
// ============================================================================
//
// Covers the case where an order was saved before its payment existed: each
// tick attaches unlinked payments to the order carrying the same gateway
// order id. Same non-overlap rule as the tracking poller.
//
// ============================================================================

const COMPONENT: &str = "payment_reconciler";

pub struct PaymentReconciler {
    payments: Arc<PaymentService>,
    metrics: Arc<Metrics>,
    interval: Duration,
    guard: SweepGuard,
    health: Option<Addr<HealthMonitorActor>>,
}

#[derive(Message)]
#[rtype(result = "Option<ReconcileReport>")]
pub struct RunReconciliation;

impl PaymentReconciler {
    pub fn new(payments: Arc<PaymentService>, metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self {
            payments,
            metrics,
            interval,
            guard: SweepGuard::new(),
            health: None,
        }
    }

    pub fn with_health(mut self, health: Addr<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    fn reconcile(&self) -> Option<impl std::future::Future<Output = Option<ReconcileReport>>> {
        let permit = self.guard.try_acquire()?;
        let payments = self.payments.clone();
        let metrics = self.metrics.clone();
        let health = self.health.clone();

        Some(async move {
            let _permit = permit;
            let started = Instant::now();
            let result = payments.reconcile_unlinked().await;
            metrics.observe_sweep(COMPONENT, started.elapsed().as_secs_f64());

            let (status, report) = match result {
                Ok(report) => {
                    if report.linked > 0 {
                        tracing::info!(
                            checked = report.checked,
                            linked = report.linked,
                            waiting = report.waiting,
                            "💳 Payment reconciliation linked payments"
                        );
                    } else {
                        tracing::debug!(checked = report.checked, "Payment reconciliation found nothing to link");
                    }
                    (HealthStatus::Healthy, Some(report))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Payment reconciliation failed");
                    (HealthStatus::Unhealthy(e.to_string()), None)
                }
            };

            if let Some(health) = health {
                health.do_send(UpdateHealth {
                    component: COMPONENT.to_string(),
                    status,
                    details: None,
                });
            }
            report
        })
    }
}

impl Actor for PaymentReconciler {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(interval_secs = self.interval.as_secs(), "PaymentReconciler started");

        ctx.run_interval(self.interval, |act, _ctx| match act.reconcile() {
            Some(run) => {
                actix::spawn(async move {
                    run.await;
                });
            }
            None => tracing::debug!("Previous reconciliation still running, skipping tick"),
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("PaymentReconciler stopped");
    }
}

impl Handler<RunReconciliation> for PaymentReconciler {
    type Result = ResponseFuture<Option<ReconcileReport>>;

    fn handle(&mut self, _: RunReconciliation, _: &mut Self::Context) -> Self::Result {
        match self.reconcile() {
            Some(run) => Box::pin(run),
            None => Box::pin(async { None }),
        }
    }
}
