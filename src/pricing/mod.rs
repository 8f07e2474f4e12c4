// ============================================================================
// Pricing Engine
// ============================================================================
//
// Print cost = (cost_per_page - best discount) x pages
// Binding cost = max(per_page_price x pages, min_price)
//
// Unknown combinations or binding types are errors, never a zero price.
//
// ============================================================================

pub mod engine;
pub mod errors;
pub mod quote;

pub use engine::{select_discount, PricingEngine};
pub use errors::PricingError;
pub use quote::{FileQuoteSpec, PrintCost, QuoteBreakdown, QuoteLine};
