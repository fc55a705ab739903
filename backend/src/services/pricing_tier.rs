//! Weight pricing tier management and the tier provider for the calculator
//!
//! Tiers are never hard-deleted: deleting sets `deleted_at`, and every query
//! here ignores deleted rows. Writes that affect the active set re-run
//! [`shared::validate_tier_set`] over the company's active tiers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::parse_status;
use shared::{validate_tier_set, TierStatus, WeightPricingTier};

#[derive(Clone)]
pub struct PricingTierService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct TierRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    min_weight: Decimal,
    max_weight: Option<Decimal>,
    base_price: Decimal,
    per_kg_rate: Option<Decimal>,
    status: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A tier as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct PricingTier {
    #[serde(flatten)]
    pub tier: WeightPricingTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TierRow> for PricingTier {
    type Error = AppError;

    fn try_from(row: TierRow) -> AppResult<Self> {
        Ok(PricingTier {
            tier: WeightPricingTier {
                id: row.id,
                company_id: row.company_id,
                name: row.name,
                min_weight: row.min_weight,
                max_weight: row.max_weight,
                base_price: row.base_price,
                per_kg_rate: row.per_kg_rate,
                status: parse_status("weight_pricing_tiers.status", &row.status, TierStatus::from_str)?,
                sort_order: row.sort_order,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTierInput {
    #[validate(length(min = 1, max = 100, message = "Tier name is required"))]
    pub name: String,
    #[validate(custom = "shared::check_non_negative")]
    pub min_weight: Decimal,
    #[validate(custom = "shared::check_non_negative")]
    pub max_weight: Option<Decimal>,
    #[validate(custom = "shared::check_non_negative")]
    pub base_price: Decimal,
    #[validate(custom = "shared::check_non_negative")]
    pub per_kg_rate: Option<Decimal>,
    #[serde(default)]
    pub status: TierStatus,
    #[serde(default)]
    pub sort_order: i32,
}

/// Partial update; `clear_max_weight` / `clear_per_kg_rate` null out the optional bounds
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTierInput {
    #[validate(length(min = 1, max = 100, message = "Tier name is required"))]
    pub name: Option<String>,
    #[validate(custom = "shared::check_non_negative")]
    pub min_weight: Option<Decimal>,
    #[validate(custom = "shared::check_non_negative")]
    pub max_weight: Option<Decimal>,
    #[serde(default)]
    pub clear_max_weight: bool,
    #[validate(custom = "shared::check_non_negative")]
    pub base_price: Option<Decimal>,
    #[validate(custom = "shared::check_non_negative")]
    pub per_kg_rate: Option<Decimal>,
    #[serde(default)]
    pub clear_per_kg_rate: bool,
    pub sort_order: Option<i32>,
}

impl UpdateTierInput {
    /// Apply this update to a copy of `tier`
    fn apply_to(self, tier: &WeightPricingTier) -> WeightPricingTier {
        WeightPricingTier {
            name: self.name.unwrap_or_else(|| tier.name.clone()),
            min_weight: self.min_weight.unwrap_or(tier.min_weight),
            max_weight: if self.clear_max_weight {
                None
            } else {
                self.max_weight.or(tier.max_weight)
            },
            base_price: self.base_price.unwrap_or(tier.base_price),
            per_kg_rate: if self.clear_per_kg_rate {
                None
            } else {
                self.per_kg_rate.or(tier.per_kg_rate)
            },
            sort_order: self.sort_order.unwrap_or(tier.sort_order),
            ..tier.clone()
        }
    }
}

/// Replace (or add) `candidate` in the active set and check the result
fn check_with_candidate(
    mut active: Vec<WeightPricingTier>,
    candidate: &WeightPricingTier,
) -> AppResult<()> {
    active.retain(|t| t.id != candidate.id);
    active.push(candidate.clone());
    validate_tier_set(&active)?;
    Ok(())
}

const TIER_COLUMNS: &str = "id, company_id, name, min_weight, max_weight, base_price, \
     per_kg_rate, status, sort_order, created_at, updated_at";

impl PricingTierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active tiers of a company in evaluation order
    pub async fn active_tiers(&self, company_id: Uuid) -> AppResult<Vec<WeightPricingTier>> {
        let rows = sqlx::query_as::<_, TierRow>(&format!(
            "SELECT {TIER_COLUMNS} FROM weight_pricing_tiers \
             WHERE company_id = $1 AND status = 'active' AND deleted_at IS NULL \
             ORDER BY sort_order ASC, min_weight ASC"
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| PricingTier::try_from(row).map(|t| t.tier))
            .collect()
    }

    /// All non-deleted tiers of a company, in evaluation order
    pub async fn list_tiers(&self, company_id: Uuid) -> AppResult<Vec<PricingTier>> {
        let rows = sqlx::query_as::<_, TierRow>(&format!(
            "SELECT {TIER_COLUMNS} FROM weight_pricing_tiers \
             WHERE company_id = $1 AND deleted_at IS NULL \
             ORDER BY sort_order ASC, min_weight ASC"
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(PricingTier::try_from).collect()
    }

    pub async fn get_tier(&self, company_id: Uuid, tier_id: Uuid) -> AppResult<PricingTier> {
        let row = sqlx::query_as::<_, TierRow>(&format!(
            "SELECT {TIER_COLUMNS} FROM weight_pricing_tiers \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(tier_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pricing tier".to_string()))?;

        row.try_into()
    }

    pub async fn create_tier(
        &self,
        company_id: Uuid,
        input: CreateTierInput,
    ) -> AppResult<PricingTier> {
        input.validate()?;

        let candidate = WeightPricingTier {
            id: Uuid::new_v4(),
            company_id,
            name: input.name.trim().to_string(),
            min_weight: input.min_weight,
            max_weight: input.max_weight,
            base_price: input.base_price,
            per_kg_rate: input.per_kg_rate,
            status: input.status,
            sort_order: input.sort_order,
        };
        check_with_candidate(self.active_tiers(company_id).await?, &candidate)?;

        let row = sqlx::query_as::<_, TierRow>(&format!(
            "INSERT INTO weight_pricing_tiers \
             (id, company_id, name, min_weight, max_weight, base_price, per_kg_rate, status, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {TIER_COLUMNS}"
        ))
        .bind(candidate.id)
        .bind(company_id)
        .bind(&candidate.name)
        .bind(candidate.min_weight)
        .bind(candidate.max_weight)
        .bind(candidate.base_price)
        .bind(candidate.per_kg_rate)
        .bind(candidate.status.as_str())
        .bind(candidate.sort_order)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, tier = %candidate, "Pricing tier created");

        row.try_into()
    }

    pub async fn update_tier(
        &self,
        company_id: Uuid,
        tier_id: Uuid,
        input: UpdateTierInput,
    ) -> AppResult<PricingTier> {
        input.validate()?;
        let existing = self.get_tier(company_id, tier_id).await?;
        let updated = input.apply_to(&existing.tier);

        check_with_candidate(self.active_tiers(company_id).await?, &updated)?;

        let row = sqlx::query_as::<_, TierRow>(&format!(
            "UPDATE weight_pricing_tiers SET name = $1, min_weight = $2, max_weight = $3, \
             base_price = $4, per_kg_rate = $5, sort_order = $6, updated_at = NOW() \
             WHERE id = $7 AND company_id = $8 AND deleted_at IS NULL RETURNING {TIER_COLUMNS}"
        ))
        .bind(&updated.name)
        .bind(updated.min_weight)
        .bind(updated.max_weight)
        .bind(updated.base_price)
        .bind(updated.per_kg_rate)
        .bind(updated.sort_order)
        .bind(tier_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, tier = %updated, "Pricing tier updated");

        row.try_into()
    }

    /// Flip a tier between active and inactive
    pub async fn toggle_status(&self, company_id: Uuid, tier_id: Uuid) -> AppResult<PricingTier> {
        let existing = self.get_tier(company_id, tier_id).await?;
        let next = existing.tier.status.toggled();

        if next == TierStatus::Active {
            let candidate = WeightPricingTier {
                status: next,
                ..existing.tier.clone()
            };
            check_with_candidate(self.active_tiers(company_id).await?, &candidate)?;
        }

        let row = sqlx::query_as::<_, TierRow>(&format!(
            "UPDATE weight_pricing_tiers SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND company_id = $3 AND deleted_at IS NULL RETURNING {TIER_COLUMNS}"
        ))
        .bind(next.as_str())
        .bind(tier_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, %tier_id, status = next.as_str(), "Pricing tier status changed");

        row.try_into()
    }

    /// Soft delete
    pub async fn delete_tier(&self, company_id: Uuid, tier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE weight_pricing_tiers
            SET deleted_at = NOW(), status = 'inactive', updated_at = NOW()
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(tier_id)
        .bind(company_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Pricing tier".to_string()));
        }

        tracing::info!(%company_id, %tier_id, "Pricing tier deleted");
        Ok(())
    }
}
