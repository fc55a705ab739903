//! Validation utilities for the Print Shop ERP

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

// ============================================================================
// Pricing Validations
// ============================================================================

/// Validate a tax rate percentage (0-100)
pub fn validate_tax_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err("Tax rate must be between 0 and 100");
    }
    Ok(())
}

/// Validate a monetary amount that may be zero but not negative
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate a payment amount (strictly positive, at most 2 decimal places)
pub fn validate_payment_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Payment amount must be positive");
    }
    if amount.normalize().scale() > 2 {
        return Err("Payment amount cannot have more than 2 decimal places");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate company code format (3-10 uppercase alphanumeric)
pub fn validate_company_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 3 {
        return Err("Company code must be at least 3 characters");
    }
    if code.len() > 10 {
        return Err("Company code must be at most 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Company code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate SKU format (letters, digits, dash, underscore; 1-40 chars)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() || sku.len() > 40 {
        return Err("SKU must be between 1 and 40 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("SKU may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate phone number: 7-15 digits, optional leading '+', spaces and dashes allowed
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err("Phone number may only contain digits, spaces and dashes");
    }
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

// ============================================================================
// `validator` custom rules
// ============================================================================

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn check_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    validate_tax_rate(*rate).map_err(|m| invalid("tax_rate", m))
}

pub fn check_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative_amount(*amount).map_err(|m| invalid("non_negative", m))
}

pub fn check_payment_amount(amount: &Decimal) -> Result<(), ValidationError> {
    validate_payment_amount(*amount).map_err(|m| invalid("payment_amount", m))
}

pub fn check_company_code(code: &str) -> Result<(), ValidationError> {
    validate_company_code(code).map_err(|m| invalid("company_code", m))
}

pub fn check_sku(sku: &str) -> Result<(), ValidationError> {
    validate_sku(sku).map_err(|m| invalid("sku", m))
}

pub fn check_password(password: &str) -> Result<(), ValidationError> {
    validate_password(password).map_err(|m| invalid("password", m))
}

pub fn check_phone(phone: &str) -> Result<(), ValidationError> {
    validate_phone(phone).map_err(|m| invalid("phone", m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tax_rate_bounds() {
        assert!(validate_tax_rate(dec!(0)).is_ok());
        assert!(validate_tax_rate(dec!(100)).is_ok());
        assert!(validate_tax_rate(dec!(-0.01)).is_err());
        assert!(validate_tax_rate(dec!(100.01)).is_err());
    }

    #[test]
    fn payment_amount_precision() {
        assert!(validate_payment_amount(dec!(10.50)).is_ok());
        assert!(validate_payment_amount(dec!(10.500)).is_ok());
        assert!(validate_payment_amount(dec!(10.505)).is_err());
        assert!(validate_payment_amount(dec!(0)).is_err());
    }

    #[test]
    fn company_codes() {
        assert!(validate_company_code("PRN").is_ok());
        assert!(validate_company_code("SHOP2024").is_ok());
        assert!(validate_company_code("AB").is_err());
        assert!(validate_company_code("abc").is_err());
        assert!(validate_company_code("AB-C").is_err());
    }

    #[test]
    fn skus() {
        assert!(validate_sku("BC-100_matte").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
    }

    #[test]
    fn validator_rules_carry_messages() {
        let err = check_tax_rate(&dec!(120)).unwrap_err();
        assert_eq!(err.code, "tax_rate");
        assert_eq!(err.message.as_deref(), Some("Tax rate must be between 0 and 100"));
        assert!(check_non_negative(&dec!(0)).is_ok());
        assert!(check_sku("A-1").is_ok());
    }

    #[test]
    fn phones() {
        assert!(validate_phone("+44 20 7946 0958").is_ok());
        assert!(validate_phone("081-234-5678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
    }
}
