//! Delivery quotes from a company's weight pricing tiers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::PricingTierService;
use shared::{calculate_delivery_charge, DeliveryQuote, WeightUnit};

#[derive(Clone)]
pub struct DeliveryService {
    tiers: PricingTierService,
}

/// Request body for a delivery quote
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub weight: Decimal,
    #[serde(default)]
    pub unit: WeightUnit,
}

/// Delivery quote as returned by the API; the charge is rounded to cents
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub weight_kg: Decimal,
    pub delivery_charge: Decimal,
    pub tier_id: Option<Uuid>,
    pub tier_name: Option<String>,
}

impl From<DeliveryQuote> for QuoteResponse {
    fn from(quote: DeliveryQuote) -> Self {
        let quote = quote.rounded();
        QuoteResponse {
            tier_id: quote.tier_id(),
            tier_name: quote.tier_name().map(str::to_string),
            weight_kg: quote.weight_kg,
            delivery_charge: quote.delivery_charge,
        }
    }
}

impl DeliveryService {
    pub fn new(db: PgPool) -> Self {
        Self {
            tiers: PricingTierService::new(db),
        }
    }

    pub async fn quote(&self, company_id: Uuid, request: QuoteRequest) -> AppResult<QuoteResponse> {
        let tiers = self.tiers.active_tiers(company_id).await?;
        let quote = calculate_delivery_charge(request.weight, request.unit, &tiers)?;

        if quote.tier.is_none() {
            tracing::debug!(
                %company_id,
                weight_kg = %quote.weight_kg,
                tiers = tiers.len(),
                "No pricing tier covers weight; delivery is free"
            );
        }

        Ok(quote.into())
    }
}
