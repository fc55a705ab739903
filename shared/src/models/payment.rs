//! Payment verification models
//!
//! A customer claims a bank transfer against an invoice; staff confirm or
//! reject the claim by hand. Only a verified claim becomes an invoice payment.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransitionError;

/// Manual confirmation state of a claimed payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VerificationStatus::Pending),
            "verified" => Some(VerificationStatus::Verified),
            "rejected" => Some(VerificationStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }

    pub fn verify(&self) -> Result<Self, TransitionError> {
        match self {
            VerificationStatus::Pending => Ok(VerificationStatus::Verified),
            other => Err(TransitionError::new("payment verification", "verify", other)),
        }
    }

    pub fn reject(&self) -> Result<Self, TransitionError> {
        match self {
            VerificationStatus::Pending => Ok(VerificationStatus::Rejected),
            other => Err(TransitionError::new("payment verification", "reject", other)),
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A claimed bank payment awaiting confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub id: Uuid,
    pub company_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub bank_name: String,
    pub reference: String,
    pub transferred_at: DateTime<Utc>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub invoice_payment_id: Option<Uuid>,
    pub submitted_by: Option<Uuid>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_verified_or_rejected() {
        assert_eq!(VerificationStatus::Pending.verify().unwrap(), VerificationStatus::Verified);
        assert_eq!(VerificationStatus::Pending.reject().unwrap(), VerificationStatus::Rejected);
    }

    #[test]
    fn final_states_do_not_move() {
        for status in [VerificationStatus::Verified, VerificationStatus::Rejected] {
            assert!(status.is_final());
            assert!(status.verify().is_err());
            assert!(status.reject().is_err());
        }
    }

    #[test]
    fn error_names_the_current_status() {
        let err = VerificationStatus::Rejected.verify().unwrap_err();
        assert_eq!(err.to_string(), "cannot verify payment verification in status rejected");
    }
}
