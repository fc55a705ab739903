//! Line-item total composition: price × quantity, delivery, tax

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::pricing::{calculate_delivery_charge, round_money, TierSummary, WeightPricingTier};
use crate::weight::WeightUnit;

/// What a line needs to be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub weight_per_unit: Decimal,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    /// Percentage, 0-100
    pub tax_rate: Decimal,
}

impl LineItemInput {
    fn validate(&self) -> Result<(), PricingError> {
        if self.quantity <= Decimal::ZERO {
            return Err(PricingError::NonPositiveQuantity(self.quantity));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(PricingError::NegativeAmount {
                field: "unit_price",
                value: self.unit_price,
            });
        }
        if self.weight_per_unit < Decimal::ZERO {
            return Err(PricingError::NegativeWeight(self.weight_per_unit));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(PricingError::TaxRateOutOfRange(self.tax_rate));
        }
        Ok(())
    }
}

/// Priced line; ephemeral, computed per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCalculation {
    pub base_price: Decimal,
    /// Total weight in the line's own unit
    pub total_weight: Decimal,
    pub weight_unit: WeightUnit,
    pub total_weight_kg: Decimal,
    pub tax_amount: Decimal,
    pub delivery_charge: Decimal,
    pub tier_used: Option<TierSummary>,
    pub total_amount: Decimal,
}

impl DeliveryCalculation {
    /// Copy with every monetary field rounded to cents.
    ///
    /// Weights keep their full precision.
    pub fn rounded(&self) -> Self {
        Self {
            base_price: round_money(self.base_price),
            tax_amount: round_money(self.tax_amount),
            delivery_charge: round_money(self.delivery_charge),
            total_amount: round_money(self.total_amount),
            ..self.clone()
        }
    }
}

/// Compose subtotal, delivery charge and tax for one line.
pub fn compose_line_total(
    input: &LineItemInput,
    tiers: &[WeightPricingTier],
) -> Result<DeliveryCalculation, PricingError> {
    input.validate()?;

    let base_price = input
        .unit_price
        .checked_mul(input.quantity)
        .ok_or(PricingError::AmountOutOfRange("base_price"))?;
    let total_weight = input
        .weight_per_unit
        .checked_mul(input.quantity)
        .ok_or(PricingError::AmountOutOfRange("total_weight"))?;
    let quote = calculate_delivery_charge(total_weight, input.weight_unit, tiers)?;

    let taxable = base_price
        .checked_add(quote.delivery_charge)
        .ok_or(PricingError::AmountOutOfRange("total_amount"))?;
    let tax_amount = taxable
        .checked_mul(input.tax_rate)
        .and_then(|tax| tax.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(PricingError::AmountOutOfRange("tax_amount"))?;
    let total_amount = taxable
        .checked_add(tax_amount)
        .ok_or(PricingError::AmountOutOfRange("total_amount"))?;

    Ok(DeliveryCalculation {
        base_price,
        total_weight,
        weight_unit: input.weight_unit,
        total_weight_kg: quote.weight_kg,
        tax_amount,
        delivery_charge: quote.delivery_charge,
        tier_used: quote.tier,
        total_amount,
    })
}

/// Summed monetary totals of several priced lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub delivery_total: Decimal,
    pub tax_total: Decimal,
    pub total_amount: Decimal,
    pub total_weight_kg: Decimal,
}

impl DocumentTotals {
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_money(self.subtotal),
            delivery_total: round_money(self.delivery_total),
            tax_total: round_money(self.tax_total),
            total_amount: round_money(self.total_amount),
            total_weight_kg: self.total_weight_kg,
        }
    }
}

/// Add up lines as each is presented, i.e. rounded to cents, so the document
/// equals the sum of its printed lines. Weights are summed at full precision.
pub fn sum_lines<'a>(
    lines: impl IntoIterator<Item = &'a DeliveryCalculation>,
) -> Result<DocumentTotals, PricingError> {
    fn add(acc: Decimal, value: Decimal, field: &'static str) -> Result<Decimal, PricingError> {
        acc.checked_add(value).ok_or(PricingError::AmountOutOfRange(field))
    }

    lines
        .into_iter()
        .try_fold(DocumentTotals::default(), |acc, line| {
            let line = line.rounded();
            Ok(DocumentTotals {
                subtotal: add(acc.subtotal, line.base_price, "subtotal")?,
                delivery_total: add(acc.delivery_total, line.delivery_charge, "delivery_total")?,
                tax_total: add(acc.tax_total, line.tax_amount, "tax_total")?,
                total_amount: add(acc.total_amount, line.total_amount, "total_amount")?,
                total_weight_kg: add(acc.total_weight_kg, line.total_weight_kg, "total_weight")?,
            })
        })
}
