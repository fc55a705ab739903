//! Weight-based delivery pricing
//!
//! A company configures a handful of weight tiers. Each tier covers an
//! inclusive `[min_weight, max_weight]` range in kilograms (an absent
//! `max_weight` is unbounded) and charges `base_price + per_kg_rate * kg`.
//!
//! Tier selection is first-match-wins over the order the caller supplies;
//! the calculator never re-sorts. The backend loads tiers ordered by
//! `sort_order, min_weight`, so on a shared boundary (lower tier `max == 5`,
//! upper tier `min == 5`) the lower tier wins.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PricingError;
use crate::weight::{to_kilograms, WeightUnit};

/// Whether a tier takes part in pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    #[default]
    Active,
    Inactive,
}

impl TierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierStatus::Active => "active",
            TierStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TierStatus::Active),
            "inactive" => Some(TierStatus::Inactive),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            TierStatus::Active => TierStatus::Inactive,
            TierStatus::Inactive => TierStatus::Active,
        }
    }
}

/// A weight range with its delivery charge, owned by one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPricingTier {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// Inclusive lower bound in kilograms
    pub min_weight: Decimal,
    /// Inclusive upper bound in kilograms, `None` for an open-ended tier
    pub max_weight: Option<Decimal>,
    pub base_price: Decimal,
    pub per_kg_rate: Option<Decimal>,
    #[serde(default)]
    pub status: TierStatus,
    #[serde(default)]
    pub sort_order: i32,
}

impl WeightPricingTier {
    pub fn is_active(&self) -> bool {
        self.status == TierStatus::Active
    }

    /// Whether a kilogram weight falls inside this tier's inclusive range
    pub fn contains(&self, weight_kg: Decimal) -> bool {
        weight_kg >= self.min_weight && self.max_weight.map_or(true, |max| weight_kg <= max)
    }

    /// Delivery charge for a kilogram weight priced by this tier
    pub fn charge_for(&self, weight_kg: Decimal) -> Result<Decimal, PricingError> {
        self.per_kg_rate
            .unwrap_or(Decimal::ZERO)
            .checked_mul(weight_kg)
            .and_then(|weighted| self.base_price.checked_add(weighted))
            .ok_or(PricingError::AmountOutOfRange("delivery_charge"))
    }

    pub fn summary(&self) -> TierSummary {
        TierSummary {
            id: self.id,
            name: self.name.clone(),
            min_weight: self.min_weight,
            max_weight: self.max_weight,
            base_price: self.base_price,
            per_kg_rate: self.per_kg_rate,
        }
    }
}

impl fmt::Display for WeightPricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_weight {
            Some(max) => write!(f, "{} ({}-{} kg)", self.name, self.min_weight, max),
            None => write!(f, "{} ({}+ kg)", self.name, self.min_weight),
        }
    }
}

/// The tier that priced a quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub id: Uuid,
    pub name: String,
    pub min_weight: Decimal,
    pub max_weight: Option<Decimal>,
    pub base_price: Decimal,
    pub per_kg_rate: Option<Decimal>,
}

/// Outcome of a delivery pricing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub weight_kg: Decimal,
    pub delivery_charge: Decimal,
    /// `None` when no tier covers the weight; the charge is then zero
    pub tier: Option<TierSummary>,
}

impl DeliveryQuote {
    pub fn tier_id(&self) -> Option<Uuid> {
        self.tier.as_ref().map(|t| t.id)
    }

    pub fn tier_name(&self) -> Option<&str> {
        self.tier.as_ref().map(|t| t.name.as_str())
    }

    /// Same quote with the charge rounded to cents for display
    pub fn rounded(&self) -> Self {
        Self {
            delivery_charge: round_money(self.delivery_charge),
            ..self.clone()
        }
    }
}

/// Round a monetary amount to 2 decimal places, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pick the first active tier whose range contains `weight_kg`.
pub fn find_tier(tiers: &[WeightPricingTier], weight_kg: Decimal) -> Option<&WeightPricingTier> {
    tiers
        .iter()
        .filter(|tier| tier.is_active())
        .find(|tier| tier.contains(weight_kg))
}

/// Compute the delivery charge for a weight against a company's tiers.
///
/// `tiers` must already be in the order the company wants them evaluated.
/// A weight outside every tier yields a zero charge with no tier.
pub fn calculate_delivery_charge(
    weight: Decimal,
    unit: WeightUnit,
    tiers: &[WeightPricingTier],
) -> Result<DeliveryQuote, PricingError> {
    let weight_kg = to_kilograms(weight, unit)?;

    let quote = match find_tier(tiers, weight_kg) {
        Some(tier) => DeliveryQuote {
            weight_kg,
            delivery_charge: tier.charge_for(weight_kg)?,
            tier: Some(tier.summary()),
        },
        None => DeliveryQuote {
            weight_kg,
            delivery_charge: Decimal::ZERO,
            tier: None,
        },
    };

    Ok(quote)
}

/// Check a single tier's own fields.
pub fn validate_tier(tier: &WeightPricingTier) -> Result<(), PricingError> {
    let invalid = |reason: &str| PricingError::InvalidTier {
        tier: tier.name.clone(),
        reason: reason.to_string(),
    };

    if tier.name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if tier.min_weight < Decimal::ZERO {
        return Err(invalid("min_weight must not be negative"));
    }
    if let Some(max) = tier.max_weight {
        if max < tier.min_weight {
            return Err(invalid("max_weight must not be below min_weight"));
        }
    }
    if tier.base_price < Decimal::ZERO {
        return Err(invalid("base_price must not be negative"));
    }
    if tier.per_kg_rate.is_some_and(|rate| rate < Decimal::ZERO) {
        return Err(invalid("per_kg_rate must not be negative"));
    }
    Ok(())
}

/// Check that a company's active tiers do not overlap.
///
/// Adjacent tiers may share one boundary point (`lower.max == upper.min`);
/// anything wider is rejected. Only the highest tier may be open-ended.
pub fn validate_tier_set(tiers: &[WeightPricingTier]) -> Result<(), PricingError> {
    for tier in tiers {
        validate_tier(tier)?;
    }

    let mut active: Vec<&WeightPricingTier> = tiers.iter().filter(|t| t.is_active()).collect();
    active.sort_by(|a, b| a.min_weight.cmp(&b.min_weight));

    for pair in active.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        let overlaps = match lower.max_weight {
            None => true,
            Some(max) => max > upper.min_weight,
        };
        if overlaps {
            return Err(PricingError::OverlappingTiers {
                first: lower.to_string(),
                second: upper.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(name: &str, min: Decimal, max: Option<Decimal>, base: Decimal, rate: Decimal) -> WeightPricingTier {
        WeightPricingTier {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: name.to_string(),
            min_weight: min,
            max_weight: max,
            base_price: base,
            per_kg_rate: Some(rate),
            status: TierStatus::Active,
            sort_order: 0,
        }
    }

    fn standard_tiers() -> Vec<WeightPricingTier> {
        vec![
            tier("Small", dec!(0), Some(dec!(5)), dec!(100), dec!(0)),
            tier("Medium", dec!(5), Some(dec!(20)), dec!(150), dec!(10)),
            tier("Heavy", dec!(20), None, dec!(300), dec!(15)),
        ]
    }

    fn charge(weight: Decimal, unit: WeightUnit) -> Decimal {
        calculate_delivery_charge(weight, unit, &standard_tiers())
            .unwrap()
            .delivery_charge
    }

    #[test]
    fn prices_each_tier() {
        assert_eq!(charge(dec!(3), WeightUnit::Kg), dec!(100));
        assert_eq!(charge(dec!(10), WeightUnit::Kg), dec!(250));
        assert_eq!(charge(dec!(25), WeightUnit::Kg), dec!(675));
    }

    #[test]
    fn shared_boundary_goes_to_first_tier() {
        let quote = calculate_delivery_charge(dec!(5), WeightUnit::Kg, &standard_tiers()).unwrap();
        assert_eq!(quote.delivery_charge, dec!(100));
        assert_eq!(quote.tier_name(), Some("Small"));
    }

    #[test]
    fn grams_are_normalised_before_lookup() {
        let quote = calculate_delivery_charge(dec!(500), WeightUnit::G, &standard_tiers()).unwrap();
        assert_eq!(quote.weight_kg, dec!(0.5));
        assert_eq!(quote.tier_name(), Some("Small"));
        assert_eq!(quote.delivery_charge, dec!(100));
    }

    #[test]
    fn no_tiers_means_free_delivery() {
        let quote = calculate_delivery_charge(dec!(12), WeightUnit::Kg, &[]).unwrap();
        assert_eq!(quote.delivery_charge, Decimal::ZERO);
        assert!(quote.tier.is_none());
    }

    #[test]
    fn weight_outside_all_tiers_is_not_an_error() {
        let tiers = vec![tier("Mid", dec!(10), Some(dec!(20)), dec!(50), dec!(1))];
        let quote = calculate_delivery_charge(dec!(2), WeightUnit::Kg, &tiers).unwrap();
        assert_eq!(quote.delivery_charge, Decimal::ZERO);
        assert!(quote.tier.is_none());
    }

    #[test]
    fn inactive_tiers_are_skipped() {
        let mut tiers = standard_tiers();
        tiers[0].status = TierStatus::Inactive;
        let quote = calculate_delivery_charge(dec!(3), WeightUnit::Kg, &tiers).unwrap();
        assert!(quote.tier.is_none());

        let quote = calculate_delivery_charge(dec!(5), WeightUnit::Kg, &tiers).unwrap();
        assert_eq!(quote.tier_name(), Some("Medium"));
        assert_eq!(quote.delivery_charge, dec!(200));
    }

    #[test]
    fn missing_rate_charges_base_only() {
        let mut tiers = standard_tiers();
        tiers[1].per_kg_rate = None;
        assert_eq!(
            calculate_delivery_charge(dec!(10), WeightUnit::Kg, &tiers).unwrap().delivery_charge,
            dec!(150)
        );
    }

    #[test]
    fn supplied_order_is_respected() {
        let mut tiers = standard_tiers();
        tiers.swap(0, 1);
        let quote = calculate_delivery_charge(dec!(5), WeightUnit::Kg, &tiers).unwrap();
        assert_eq!(quote.tier_name(), Some("Medium"));
    }

    #[test]
    fn negative_weight_fails_fast() {
        assert_eq!(
            calculate_delivery_charge(dec!(-0.1), WeightUnit::Kg, &standard_tiers()),
            Err(PricingError::NegativeWeight(dec!(-0.1)))
        );
    }

    #[test]
    fn rounded_quote_keeps_tier() {
        let tiers = vec![tier("Tiny", dec!(0), None, dec!(1), dec!(0.333))];
        let quote = calculate_delivery_charge(dec!(1), WeightUnit::Kg, &tiers).unwrap();
        assert_eq!(quote.delivery_charge, dec!(1.333));
        let rounded = quote.rounded();
        assert_eq!(rounded.delivery_charge, dec!(1.33));
        assert_eq!(rounded.tier_name(), Some("Tiny"));
    }

    #[test]
    fn round_money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn contiguous_tiers_are_valid() {
        assert!(validate_tier_set(&standard_tiers()).is_ok());
    }

    #[test]
    fn overlapping_tiers_are_rejected() {
        let tiers = vec![
            tier("A", dec!(0), Some(dec!(6)), dec!(100), dec!(0)),
            tier("B", dec!(5), Some(dec!(20)), dec!(150), dec!(10)),
        ];
        assert!(matches!(
            validate_tier_set(&tiers),
            Err(PricingError::OverlappingTiers { .. })
        ));
    }

    #[test]
    fn open_ended_tier_must_be_last() {
        let tiers = vec![
            tier("Open", dec!(0), None, dec!(100), dec!(0)),
            tier("Later", dec!(50), Some(dec!(60)), dec!(150), dec!(10)),
        ];
        assert!(validate_tier_set(&tiers).is_err());
    }

    #[test]
    fn inactive_tiers_do_not_count_as_overlap() {
        let mut tiers = vec![
            tier("A", dec!(0), Some(dec!(10)), dec!(100), dec!(0)),
            tier("B", dec!(5), Some(dec!(20)), dec!(150), dec!(10)),
        ];
        tiers[1].status = TierStatus::Inactive;
        assert!(validate_tier_set(&tiers).is_ok());
    }

    #[test]
    fn inverted_range_is_invalid() {
        let bad = tier("Bad", dec!(10), Some(dec!(5)), dec!(1), dec!(0));
        assert!(matches!(validate_tier(&bad), Err(PricingError::InvalidTier { .. })));
    }

    #[test]
    fn charge_beyond_decimal_range_is_an_error() {
        let err = calculate_delivery_charge(dec!(10000000000000000000000000000), WeightUnit::Kg, &standard_tiers())
            .unwrap_err();
        assert_eq!(err, PricingError::AmountOutOfRange("delivery_charge"));
        assert_eq!(err.field(), Some("delivery_charge"));
    }

    #[test]
    fn very_heavy_weight_without_rate_still_prices() {
        let flat = vec![tier("Flat", dec!(0), None, dec!(99), dec!(0))];
        let quote = calculate_delivery_charge(dec!(10000000000000000000000000000), WeightUnit::Kg, &flat).unwrap();
        assert_eq!(quote.delivery_charge, dec!(99));
    }
}
