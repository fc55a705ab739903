//! Invoice lifecycle, payment rollup and payment verification tests

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    format_invoice_number, rollup_payment_status, InvoiceStatus, PaymentStatus, VerificationStatus,
};

fn money() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

// ============================================================================
// Payment status rollup
// ============================================================================

#[test]
fn nothing_paid_is_unpaid() {
    assert_eq!(rollup_payment_status(dec!(150.00), Decimal::ZERO), PaymentStatus::Unpaid);
}

#[test]
fn part_paid_is_partially_paid() {
    assert_eq!(rollup_payment_status(dec!(150.00), dec!(0.01)), PaymentStatus::PartiallyPaid);
    assert_eq!(rollup_payment_status(dec!(150.00), dec!(149.99)), PaymentStatus::PartiallyPaid);
}

#[test]
fn exact_and_over_payment_are_paid() {
    assert_eq!(rollup_payment_status(dec!(150.00), dec!(150)), PaymentStatus::Paid);
    assert_eq!(rollup_payment_status(dec!(150.00), dec!(200)), PaymentStatus::Paid);
}

#[test]
fn zero_total_with_nothing_paid_stays_unpaid() {
    assert_eq!(rollup_payment_status(Decimal::ZERO, Decimal::ZERO), PaymentStatus::Unpaid);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Paying more never moves the status backwards
    #[test]
    fn rollup_is_monotonic_in_amount_paid(total in money(), a in money(), b in money()) {
        let rank = |s: PaymentStatus| match s {
            PaymentStatus::Unpaid => 0,
            PaymentStatus::PartiallyPaid => 1,
            PaymentStatus::Paid => 2,
        };
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(rollup_payment_status(total, low)) <= rank(rollup_payment_status(total, high)));
    }

    /// Splitting a full payment into instalments ends paid, with every
    /// intermediate state partially paid
    #[test]
    fn instalments_end_paid(total in money(), parts in 2u32..6) {
        let share = (total / Decimal::from(parts)).round_dp(2);
        let mut paid = Decimal::ZERO;
        for _ in 1..parts {
            paid += share;
            if paid > Decimal::ZERO && paid < total {
                prop_assert_eq!(rollup_payment_status(total, paid), PaymentStatus::PartiallyPaid);
            }
        }
        paid += (total - paid).max(Decimal::ZERO);
        prop_assert_eq!(rollup_payment_status(total, paid), PaymentStatus::Paid);
    }
}

// ============================================================================
// Invoice lifecycle
// ============================================================================

#[test]
fn draft_issue_cancel() {
    assert_eq!(InvoiceStatus::Draft.issue().unwrap(), InvoiceStatus::Issued);
    assert_eq!(InvoiceStatus::Issued.cancel().unwrap(), InvoiceStatus::Cancelled);
    assert_eq!(InvoiceStatus::Draft.cancel().unwrap(), InvoiceStatus::Cancelled);
}

#[test]
fn issued_and_cancelled_cannot_be_issued_again() {
    assert!(InvoiceStatus::Issued.issue().is_err());
    assert!(InvoiceStatus::Cancelled.issue().is_err());
    assert!(InvoiceStatus::Cancelled.cancel().is_err());
}

#[test]
fn only_issued_invoices_accept_payments() {
    assert!(InvoiceStatus::Issued.ensure_accepts_payment().is_ok());
    assert!(InvoiceStatus::Draft.ensure_accepts_payment().is_err());

    let err = InvoiceStatus::Cancelled.ensure_accepts_payment().unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[test]
fn invoice_numbers_are_zero_padded_per_year() {
    assert_eq!(format_invoice_number(2026, 1), "INV-2026-00001");
    assert_eq!(format_invoice_number(2026, 12345), "INV-2026-12345");
}

proptest! {
    /// Numbers sort in sequence order within a year
    #[test]
    fn invoice_numbers_sort_by_sequence(a in 1i32..99_999, b in 1i32..99_999) {
        let (na, nb) = (format_invoice_number(2026, a), format_invoice_number(2026, b));
        prop_assert_eq!(a.cmp(&b), na.cmp(&nb));
    }
}

// ============================================================================
// Payment verification
// ============================================================================

#[test]
fn pending_claim_can_be_verified_or_rejected() {
    assert_eq!(VerificationStatus::Pending.verify().unwrap(), VerificationStatus::Verified);
    assert_eq!(VerificationStatus::Pending.reject().unwrap(), VerificationStatus::Rejected);
}

#[test]
fn decided_claims_are_final() {
    for status in [VerificationStatus::Verified, VerificationStatus::Rejected] {
        assert!(status.is_final());
        assert!(status.verify().is_err());
        assert!(status.reject().is_err());
    }
    assert!(!VerificationStatus::Pending.is_final());
}
