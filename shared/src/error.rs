//! Error types for the pure domain rules

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by weight normalisation, delivery pricing and line totals.
///
/// Every variant is an invalid-argument kind: nothing here is transient and
/// nothing is retried. A weight that matches no tier is *not* an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("weight must not be negative, got {0}")]
    NegativeWeight(Decimal),

    #[error("weight is not a finite number")]
    NonFiniteWeight,

    #[error("unknown weight unit: {0}")]
    UnknownUnit(String),

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("tax rate must be between 0 and 100, got {0}")]
    TaxRateOutOfRange(Decimal),

    #[error("invalid tier {tier}: {reason}")]
    InvalidTier { tier: String, reason: String },

    #[error("tiers {first} and {second} overlap")]
    OverlappingTiers { first: String, second: String },

    #[error("{0} is too large to compute")]
    AmountOutOfRange(&'static str),
}

impl PricingError {
    /// Name of the request field the error refers to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PricingError::NegativeWeight(_) | PricingError::NonFiniteWeight => Some("weight"),
            PricingError::UnknownUnit(_) => Some("unit"),
            PricingError::NonPositiveQuantity(_) => Some("quantity"),
            PricingError::NegativeAmount { field, .. } => Some(field),
            PricingError::TaxRateOutOfRange(_) => Some("tax_rate"),
            PricingError::AmountOutOfRange(field) => Some(field),
            PricingError::InvalidTier { .. } | PricingError::OverlappingTiers { .. } => {
                Some("min_weight/max_weight")
            }
        }
    }
}

/// A workflow action that is not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} {entity} in status {from}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub action: String,
    pub from: String,
}

impl TransitionError {
    pub fn new(entity: &'static str, action: impl ToString, from: impl ToString) -> Self {
        Self {
            entity,
            action: action.to_string(),
            from: from.to_string(),
        }
    }
}
