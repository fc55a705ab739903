//! Database models for the Print Shop ERP
//!
//! Re-exports the domain models from the shared crate. Services read rows
//! with `sqlx::FromRow` structs and convert them with the helpers below,
//! since status columns are stored as text.

pub use shared::models::*;

use crate::error::{AppError, AppResult};

/// Parse a text status column into its enum
pub fn parse_status<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> AppResult<T> {
    parse(value).ok_or_else(|| {
        AppError::Internal(format!("Unknown value '{}' in column {}", value, column))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_status_parses() {
        let status = parse_status("invoices.status", "issued", InvoiceStatus::from_str).unwrap();
        assert_eq!(status, InvoiceStatus::Issued);
    }

    #[test]
    fn unknown_status_is_internal_error() {
        let err = parse_status("invoices.status", "archived", InvoiceStatus::from_str).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
