use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::{to_i32, to_u32, PgStore};
use crate::domain::catalog::{BindingOption, CatalogKey, DiscountRule, ServiceCombination};
use crate::domain::Money;
use crate::store::CatalogRepository;

#[derive(sqlx::FromRow)]
struct CombinationRow {
    id: Uuid,
    color: String,
    paper_size: String,
    paper_quality: String,
    side: String,
    cost_per_page: Money,
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    color: String,
    paper_size: String,
    paper_quality: String,
    side: String,
    min_pages: i32,
    amount_off: Money,
    position: i32,
}

#[derive(sqlx::FromRow)]
struct BindingRow {
    id: Uuid,
    binding_type: String,
    per_page_price: Money,
    min_price: Money,
}

fn parse_key(color: &str, paper_size: &str, paper_quality: &str, side: &str) -> Result<CatalogKey> {
    Ok(CatalogKey::new(
        color.parse()?,
        paper_size.parse()?,
        paper_quality.parse()?,
        side.parse()?,
    ))
}

impl TryFrom<CombinationRow> for ServiceCombination {
    type Error = anyhow::Error;

    fn try_from(row: CombinationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            key: parse_key(&row.color, &row.paper_size, &row.paper_quality, &row.side)?,
            cost_per_page: row.cost_per_page,
        })
    }
}

impl TryFrom<DiscountRow> for DiscountRule {
    type Error = anyhow::Error;

    fn try_from(row: DiscountRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            key: parse_key(&row.color, &row.paper_size, &row.paper_quality, &row.side)?,
            min_pages: to_u32(row.min_pages, "min_pages")?,
            amount_off: row.amount_off,
            position: row.position,
        })
    }
}

impl From<BindingRow> for BindingOption {
    fn from(row: BindingRow) -> Self {
        Self {
            id: row.id,
            binding_type: row.binding_type,
            per_page_price: row.per_page_price,
            min_price: row.min_price,
        }
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn find_combination(&self, key: &CatalogKey) -> Result<Option<ServiceCombination>> {
        let row = sqlx::query_as::<_, CombinationRow>(
            "SELECT id, color, paper_size, paper_quality, side, cost_per_page
             FROM service_combinations
             WHERE color = $1 AND paper_size = $2 AND paper_quality = $3 AND side = $4",
        )
        .bind(key.color.as_str())
        .bind(key.paper_size.as_str())
        .bind(key.paper_quality.as_str())
        .bind(key.side.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ServiceCombination::try_from).transpose()
    }

    async fn qualifying_discounts(&self, key: &CatalogKey, pages: u32) -> Result<Vec<DiscountRule>> {
        let rows = sqlx::query_as::<_, DiscountRow>(
            "SELECT id, color, paper_size, paper_quality, side, min_pages, amount_off, position
             FROM discount_rules
             WHERE color = $1 AND paper_size = $2 AND paper_quality = $3 AND side = $4
               AND min_pages <= $5
             ORDER BY min_pages DESC, position ASC, id ASC",
        )
        .bind(key.color.as_str())
        .bind(key.paper_size.as_str())
        .bind(key.paper_quality.as_str())
        .bind(key.side.as_str())
        .bind(to_i32(pages, "pages")?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DiscountRule::try_from).collect()
    }

    async fn find_binding(&self, binding_type: &str) -> Result<Option<BindingOption>> {
        let row = sqlx::query_as::<_, BindingRow>(
            "SELECT id, binding_type, per_page_price, min_price
             FROM binding_options
             WHERE UPPER(binding_type) = UPPER($1)",
        )
        .bind(binding_type.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BindingOption::from))
    }

    async fn save_combination(&self, combination: &ServiceCombination) -> Result<()> {
        let key = &combination.key;
        sqlx::query(
            "INSERT INTO service_combinations
                (id, color, paper_size, paper_quality, side, cost_per_page)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (color, paper_size, paper_quality, side)
             DO UPDATE SET cost_per_page = EXCLUDED.cost_per_page",
        )
        .bind(combination.id)
        .bind(key.color.as_str())
        .bind(key.paper_size.as_str())
        .bind(key.paper_quality.as_str())
        .bind(key.side.as_str())
        .bind(combination.cost_per_page)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_discount(&self, rule: &DiscountRule) -> Result<()> {
        let key = &rule.key;
        sqlx::query(
            "INSERT INTO discount_rules
                (id, color, paper_size, paper_quality, side, min_pages, amount_off, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id)
             DO UPDATE SET min_pages = EXCLUDED.min_pages,
                           amount_off = EXCLUDED.amount_off,
                           position = EXCLUDED.position",
        )
        .bind(rule.id)
        .bind(key.color.as_str())
        .bind(key.paper_size.as_str())
        .bind(key.paper_quality.as_str())
        .bind(key.side.as_str())
        .bind(to_i32(rule.min_pages, "min_pages")?)
        .bind(rule.amount_off)
        .bind(rule.position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_binding(&self, binding: &BindingOption) -> Result<()> {
        sqlx::query(
            "INSERT INTO binding_options (id, binding_type, per_page_price, min_price)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (binding_type)
             DO UPDATE SET per_page_price = EXCLUDED.per_page_price,
                           min_price = EXCLUDED.min_price",
        )
        .bind(binding.id)
        .bind(binding.binding_type.trim().to_ascii_uppercase())
        .bind(binding.per_page_price)
        .bind(binding.min_price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
