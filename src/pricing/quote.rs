use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::print_job::PrintOptions;
use crate::domain::Money;

/// One file in a cart quote
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuoteSpec {
    /// Echoed back so the client can match lines to files
    #[serde(default)]
    pub file_id: Option<Uuid>,
    pub pages: u32,
    pub options: PrintOptions,
}

/// Print cost with the discount that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintCost {
    pub cost_per_page: Money,
    /// Per-page amount taken off, zero without a qualifying rule
    pub discount_per_page: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub file_id: Option<Uuid>,
    pub pages: u32,
    pub print: PrintCost,
    pub print_cost: Money,
    pub binding_cost: Money,
    pub total: Money,
}

/// Cart quote; `lines` follow the request order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBreakdown {
    pub lines: Vec<QuoteLine>,
    pub print_total: Money,
    pub binding_total: Money,
    pub total: Money,
}

impl QuoteBreakdown {
    pub fn from_lines(lines: Vec<QuoteLine>) -> Self {
        let print_total = lines.iter().map(|l| l.print_cost).sum();
        let binding_total = lines.iter().map(|l| l.binding_cost).sum();
        let total = lines.iter().map(|l| l.total).sum();

        Self {
            lines,
            print_total,
            binding_total,
            total,
        }
    }
}
