use std::sync::Arc;

use rust_decimal::Decimal;

use super::errors::PricingError;
use super::quote::{FileQuoteSpec, PrintCost, QuoteBreakdown, QuoteLine};
use crate::domain::catalog::{CatalogKey, DiscountRule, ServiceCombination};
use crate::domain::Money;
use crate::store::CatalogRepository;

/// Best qualifying rule: highest `min_pages` not above `pages`, ties going to
/// the lowest admin position, then to the first rule seen.
pub fn select_discount(rules: &[DiscountRule], pages: u32) -> Option<&DiscountRule> {
    rules
        .iter()
        .filter(|r| r.applies_to(pages))
        .fold(None, |best: Option<&DiscountRule>, rule| match best {
            Some(b)
                if rule.min_pages < b.min_pages
                    || (rule.min_pages == b.min_pages && rule.position >= b.position) =>
            {
                Some(b)
            }
            _ => Some(rule),
        })
}

fn discounted_unit_price(
    combination: &ServiceCombination,
    rule: Option<&DiscountRule>,
) -> Result<(Money, Money), PricingError> {
    let amount_off = rule.map(|r| r.amount_off).unwrap_or(Decimal::ZERO);

    if (amount_off.is_sign_negative() && !amount_off.is_zero()) || amount_off > combination.cost_per_page {
        return Err(PricingError::InvalidDiscount {
            key: combination.key,
            amount_off,
            cost_per_page: combination.cost_per_page,
        });
    }

    Ok((combination.cost_per_page - amount_off, amount_off))
}

#[derive(Clone)]
pub struct PricingEngine {
    catalog: Arc<dyn CatalogRepository>,
}

impl PricingEngine {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub async fn calculate_print_cost(&self, key: &CatalogKey, pages: u32) -> Result<Money, PricingError> {
        Ok(self.print_cost(key, pages).await?.total)
    }

    /// Print cost with its per-page breakdown
    pub async fn print_cost(&self, key: &CatalogKey, pages: u32) -> Result<PrintCost, PricingError> {
        let combination = self
            .catalog
            .find_combination(key)
            .await?
            .ok_or(PricingError::CombinationNotFound(*key))?;

        let rules = self.catalog.qualifying_discounts(key, pages).await?;
        let rule = select_discount(&rules, pages);
        let (unit_price, discount_per_page) = discounted_unit_price(&combination, rule)?;

        if let Some(rule) = rule {
            tracing::trace!(
                key = %key,
                pages = pages,
                min_pages = rule.min_pages,
                amount_off = %rule.amount_off,
                "Discount applied"
            );
        }

        Ok(PrintCost {
            cost_per_page: combination.cost_per_page,
            discount_per_page,
            total: unit_price * Decimal::from(pages),
        })
    }

    pub async fn calculate_binding_cost(&self, binding_type: &str, pages: u32) -> Result<Money, PricingError> {
        let binding = self
            .catalog
            .find_binding(binding_type)
            .await?
            .ok_or_else(|| PricingError::BindingNotFound(binding_type.to_string()))?;

        Ok(binding.cost_for(pages))
    }

    pub async fn quote_file(&self, spec: &FileQuoteSpec) -> Result<QuoteLine, PricingError> {
        let print = self.print_cost(&spec.options.catalog_key(), spec.pages).await?;

        let binding_cost = match spec.options.binding_type() {
            Some(binding_type) => self.calculate_binding_cost(binding_type, spec.pages).await?,
            None => Decimal::ZERO,
        };

        Ok(QuoteLine {
            file_id: spec.file_id,
            pages: spec.pages,
            print_cost: print.total,
            binding_cost,
            total: print.total + binding_cost,
            print,
        })
    }

    /// Quote every file, keeping request order. The first failing file
    /// fails the whole batch, tagged with its index.
    pub async fn quote_batch(&self, specs: &[FileQuoteSpec]) -> Result<QuoteBreakdown, PricingError> {
        let mut lines = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let line = self
                .quote_file(spec)
                .await
                .map_err(|source| PricingError::InBatch {
                    index,
                    source: Box::new(source),
                })?;
            lines.push(line);
        }

        Ok(QuoteBreakdown::from_lines(lines))
    }
}
