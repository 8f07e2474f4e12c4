use actix::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::health_monitor::{HealthMonitorActor, HealthStatus, UpdateHealth};
use crate::metrics::Metrics;
use crate::services::{ShipmentService, SweepReport};
use crate::utils::SweepGuard;

// ============================================================================
// Tracking Poller Actor - Periodic carrier status sweep
// ============================================================================
//
// Every tick runs `ShipmentService::sync_tracking` in the background. A tick
// that arrives while the previous sweep is still running is skipped, so
// sweeps never overlap. Per-order failures are handled inside the sweep; the
// actor only reports the outcome.
//
// ============================================================================

const COMPONENT: &str = "tracking_poller";

pub struct TrackingPoller {
    shipments: Arc<ShipmentService>,
    metrics: Arc<Metrics>,
    interval: Duration,
    guard: SweepGuard,
    health: Option<Addr<HealthMonitorActor>>,
}

/// Run one sweep now. Resolves to `None` when a sweep is already running.
#[derive(Message)]
#[rtype(result = "Option<SweepReport>")]
pub struct RunTrackingSweep;

impl TrackingPoller {
    pub fn new(shipments: Arc<ShipmentService>, metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self {
            shipments,
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

    /// The sweep future, or `None` if the previous one has not finished
    fn sweep(&self) -> Option<impl std::future::Future<Output = Option<SweepReport>>> {
        let permit = self.guard.try_acquire()?;
        let shipments = self.shipments.clone();
        let metrics = self.metrics.clone();
        let health = self.health.clone();

        Some(async move {
            let _permit = permit;
            let started = Instant::now();
            let result = shipments.sync_tracking().await;
            metrics.observe_sweep(COMPONENT, started.elapsed().as_secs_f64());

            let (status, report) = match result {
                Ok(report) => {
                    tracing::info!(
                        checked = report.checked,
                        updated = report.updated,
                        unchanged = report.unchanged,
                        failed = report.failed,
                        "📡 Tracking sweep finished"
                    );
                    let status = if report.failed > 0 {
                        HealthStatus::Degraded(format!("{} of {} polls failed", report.failed, report.checked))
                    } else {
                        HealthStatus::Healthy
                    };
                    (status, Some(report))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Tracking sweep aborted");
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

impl Actor for TrackingPoller {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(interval_secs = self.interval.as_secs(), "TrackingPoller started");

        ctx.run_interval(self.interval, |act, _ctx| match act.sweep() {
            Some(sweep) => {
                actix::spawn(async move {
                    sweep.await;
                });
            }
            None => tracing::debug!("Previous tracking sweep still running, skipping tick"),
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("TrackingPoller stopped");
    }
}

impl Handler<RunTrackingSweep> for TrackingPoller {
    type Result = ResponseFuture<Option<SweepReport>>;

    fn handle(&mut self, _: RunTrackingSweep, _: &mut Self::Context) -> Self::Result {
        match self.sweep() {
            Some(sweep) => Box::pin(sweep),
            None => Box::pin(async { None }),
        }
    }
}
