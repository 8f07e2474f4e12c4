// ============================================================================
// Order Domain
// ============================================================================
//
// - value_objects: status machine, delivery info, shipment tracking fields
// - commands:      the place-order request and its validation
// - errors:        order rule violations
// - aggregate:     the Order itself
// - invoice:       grouping of print jobs into invoice blocks
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod invoice;

pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use invoice::*;
