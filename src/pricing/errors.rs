use crate::domain::catalog::CatalogKey;
use crate::domain::Money;

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("No price configured for {0}")]
    CombinationNotFound(CatalogKey),

    #[error("Unknown binding type '{0}'")]
    BindingNotFound(String),

    #[error("Discount {amount_off} is not valid against per-page price {cost_per_page} for {key}")]
    InvalidDiscount {
        key: CatalogKey,
        amount_off: Money,
        cost_per_page: Money,
    },

    #[error("File {index}: {source}")]
    InBatch {
        index: usize,
        source: Box<PricingError>,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PricingError {
    /// Innermost error, unwrapping batch context
    pub fn root(&self) -> &PricingError {
        match self {
            PricingError::InBatch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Label for metrics
    pub fn kind(&self) -> &'static str {
        match self.root() {
            PricingError::CombinationNotFound(_) => "combination_not_found",
            PricingError::BindingNotFound(_) => "binding_not_found",
            PricingError::InvalidDiscount { .. } => "invalid_discount",
            PricingError::Storage(_) => "storage",
            PricingError::InBatch { .. } => "batch",
        }
    }
}
