// ============================================================================
// Actors Module
// ============================================================================
//
// Background work that runs beside the HTTP server.
//
// Structure:
// - health_monitor     - Component health aggregation, carrier breaker watch
// - tracking_poller    - Periodic carrier tracking sweep
// - payment_reconciler - Periodic payment-to-order linking
// - coordinator        - Starts and stops the others
//
// Note: Request handling never goes through actors; services are called
//       directly. Actors only own schedules.
//
// ============================================================================

mod coordinator;
mod health_monitor;
mod payment_reconciler;
mod tracking_poller;

pub use coordinator::{CoordinatorActor, GetHealthMonitor, Shutdown, SweepSchedule};
pub use health_monitor::{GetSystemHealth, HealthMonitorActor, HealthStatus, SystemHealth};
pub use payment_reconciler::{PaymentReconciler, RunReconciliation};
pub use tracking_poller::{RunTrackingSweep, TrackingPoller};
