//! Weight units and normalisation to kilograms

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Grams per kilogram
pub const GRAMS_PER_KG: Decimal = dec!(1000);

/// Kilograms per pound
pub const KG_PER_POUND: Decimal = dec!(0.453592);

/// Kilograms per ounce
pub const KG_PER_OUNCE: Decimal = dec!(0.0283495);

/// Units a product weight or a shipment weight can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    G,
    Lb,
    Oz,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::G => "g",
            WeightUnit::Lb => "lb",
            WeightUnit::Oz => "oz",
        }
    }

    /// Convert `weight` expressed in this unit to kilograms.
    pub fn to_kilograms(&self, weight: Decimal) -> Decimal {
        match self {
            WeightUnit::Kg => weight,
            WeightUnit::G => weight / GRAMS_PER_KG,
            WeightUnit::Lb => weight * KG_PER_POUND,
            WeightUnit::Oz => weight * KG_PER_OUNCE,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "g" => Ok(WeightUnit::G),
            "lb" => Ok(WeightUnit::Lb),
            "oz" => Ok(WeightUnit::Oz),
            other => Err(PricingError::UnknownUnit(other.to_string())),
        }
    }
}

impl TryFrom<String> for WeightUnit {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Normalise a weight to kilograms, rejecting negative input.
pub fn to_kilograms(weight: Decimal, unit: WeightUnit) -> Result<Decimal, PricingError> {
    if weight.is_sign_negative() && !weight.is_zero() {
        return Err(PricingError::NegativeWeight(weight));
    }
    Ok(unit.to_kilograms(weight))
}
