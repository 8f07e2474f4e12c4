// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure business rules for the print-order backend. Nothing in here talks to
// the database or a remote API; services in `crate::services` orchestrate
// repositories and clients around these types.
//
// - catalog:   print attributes, price combinations, discounts, bindings
// - print_job: typed print options and the print job lifecycle
// - order:     order aggregate, status machine, invoice grouping
// - payment:   gateway payments, webhook payloads, signature checks
// - shipment:  carrier requests, tracking snapshots, status translation
//
// ============================================================================

pub mod catalog;
pub mod print_job;
pub mod order;
pub mod payment;
pub mod shipment;

/// Monetary amounts (INR, two decimal places)
pub type Money = rust_decimal::Decimal;
