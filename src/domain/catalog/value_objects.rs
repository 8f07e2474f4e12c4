use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attributes::{ColorMode, PaperQuality, PaperSize, PrintSide};
use super::errors::CatalogError;
use crate::domain::Money;

// ============================================================================
// Catalog Value Objects
// ============================================================================

/// Lookup key of a priced combination. Exact match only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogKey {
    pub color: ColorMode,
    pub paper_size: PaperSize,
    pub paper_quality: PaperQuality,
    pub side: PrintSide,
}

impl CatalogKey {
    pub fn new(
        color: ColorMode,
        paper_size: PaperSize,
        paper_quality: PaperQuality,
        side: PrintSide,
    ) -> Self {
        Self {
            color,
            paper_size,
            paper_quality,
            side,
        }
    }
}

impl std::fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.color, self.paper_size, self.paper_quality, self.side
        )
    }
}

/// Price per page for one attribute combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCombination {
    pub id: Uuid,
    pub key: CatalogKey,
    pub cost_per_page: Money,
}

impl ServiceCombination {
    pub fn new(key: CatalogKey, cost_per_page: Money) -> Result<Self, CatalogError> {
        non_negative("cost_per_page", cost_per_page)?;
        Ok(Self {
            id: Uuid::now_v7(),
            key,
            cost_per_page,
        })
    }
}

/// Per-page amount off once an order reaches `min_pages`.
///
/// `position` is the admin-defined ordering used to break ties between rules
/// sharing the same threshold (lowest position wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRule {
    pub id: Uuid,
    pub key: CatalogKey,
    pub min_pages: u32,
    pub amount_off: Money,
    pub position: i32,
}

impl DiscountRule {
    pub fn new(
        key: CatalogKey,
        min_pages: u32,
        amount_off: Money,
        position: i32,
    ) -> Result<Self, CatalogError> {
        non_negative("amount_off", amount_off)?;
        Ok(Self {
            id: Uuid::now_v7(),
            key,
            min_pages,
            amount_off,
            position,
        })
    }

    pub fn applies_to(&self, pages: u32) -> bool {
        self.min_pages <= pages
    }
}

/// Binding price: per page with a floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingOption {
    pub id: Uuid,
    pub binding_type: String,
    pub per_page_price: Money,
    pub min_price: Money,
}

impl BindingOption {
    pub fn new(
        binding_type: impl Into<String>,
        per_page_price: Money,
        min_price: Money,
    ) -> Result<Self, CatalogError> {
        let binding_type = binding_type.into();
        if binding_type.trim().is_empty() {
            return Err(CatalogError::EmptyBindingType);
        }
        non_negative("per_page_price", per_page_price)?;
        non_negative("min_price", min_price)?;

        Ok(Self {
            id: Uuid::now_v7(),
            binding_type,
            per_page_price,
            min_price,
        })
    }

    /// max(per_page_price × pages, min_price)
    pub fn cost_for(&self, pages: u32) -> Money {
        let per_page_total = self.per_page_price * Decimal::from(pages);
        per_page_total.max(self.min_price)
    }
}

fn non_negative(field: &'static str, value: Money) -> Result<(), CatalogError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CatalogError::NegativePrice { field, value });
    }
    Ok(())
}
