//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PricingError;
use crate::pricing::WeightPricingTier;
use crate::totals::{compose_line_total, DeliveryCalculation, LineItemInput};
use crate::weight::WeightUnit;

/// A sellable product with the data needed to price a line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub weight_per_unit: Decimal,
    pub weight_unit: WeightUnit,
    /// Percentage, 0-100
    pub tax_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn line_input(&self, quantity: Decimal) -> LineItemInput {
        LineItemInput {
            unit_price: self.base_price,
            quantity,
            weight_per_unit: self.weight_per_unit,
            weight_unit: self.weight_unit,
            tax_rate: self.tax_rate,
        }
    }

    /// Price `quantity` units of this product, delivery and tax included
    pub fn price(
        &self,
        quantity: Decimal,
        tiers: &[WeightPricingTier],
    ) -> Result<DeliveryCalculation, PricingError> {
        compose_line_total(&self.line_input(quantity), tiers)
    }
}
