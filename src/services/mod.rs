// ============================================================================
// Application Services
// ============================================================================
//
// - files:     file removal guarded by print job references
// - orders:    order placement, lifecycle and invoice grouping
// - payments:  gateway orders, webhooks, order linkage and reports
// - shipments: carrier booking, tracking queries and the tracking sweep
//
// Services hold repository trait objects and return `AppError`.
//
// ============================================================================

pub mod files;
pub mod orders;
pub mod payments;
pub mod shipments;

pub use files::FileService;
pub use orders::{InvoiceBlock, OrderService};
pub use payments::{LinkOutcome, PaymentService, ReconcileReport, WebhookOutcome};
pub use shipments::{ShipmentService, ShipmentView, SweepReport};
