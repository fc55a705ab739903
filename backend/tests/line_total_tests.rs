//! Line total composition tests
//!
//! base = price × quantity, delivery from the tier table on the line's total
//! weight, tax on base plus delivery, rounding only at presentation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    compose_line_total, round_money, sum_lines, LineItemInput, PricingError, TierStatus,
    WeightPricingTier, WeightUnit,
};
use uuid::Uuid;

fn tiers() -> Vec<WeightPricingTier> {
    vec![
        WeightPricingTier {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "Courier".into(),
            min_weight: dec!(0),
            max_weight: Some(dec!(10)),
            base_price: dec!(40),
            per_kg_rate: Some(dec!(2.5)),
            status: TierStatus::Active,
            sort_order: 0,
        },
        WeightPricingTier {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "Freight".into(),
            min_weight: dec!(10),
            max_weight: None,
            base_price: dec!(120),
            per_kg_rate: None,
            status: TierStatus::Active,
            sort_order: 1,
        },
    ]
}

fn line(unit_price: Decimal, quantity: Decimal, weight: Decimal, unit: WeightUnit, tax: Decimal) -> LineItemInput {
    LineItemInput {
        unit_price,
        quantity,
        weight_per_unit: weight,
        weight_unit: unit,
        tax_rate: tax,
    }
}

#[test]
fn flyers_with_courier_delivery() {
    // 500 flyers at 0.25, 8 g each = 4 kg
    let calc = compose_line_total(&line(dec!(0.25), dec!(500), dec!(8), WeightUnit::G, dec!(7)), &tiers()).unwrap();
    assert_eq!(calc.base_price, dec!(125));
    assert_eq!(calc.total_weight, dec!(4000));
    assert_eq!(calc.total_weight_kg, dec!(4));
    assert_eq!(calc.delivery_charge, dec!(50));
    assert_eq!(calc.tax_amount, dec!(12.25));
    assert_eq!(calc.total_amount, dec!(187.25));
    assert_eq!(calc.tier_used.map(|t| t.name), Some("Courier".to_string()));
}

#[test]
fn weightless_service_line_has_zero_delivery_without_tiers() {
    let calc = compose_line_total(&line(dec!(80), dec!(1), dec!(0), WeightUnit::Kg, dec!(0)), &[]).unwrap();
    assert_eq!(calc.delivery_charge, Decimal::ZERO);
    assert!(calc.tier_used.is_none());
    assert_eq!(calc.total_amount, dec!(80));
}

#[test]
fn rounding_happens_only_on_presentation() {
    let calc = compose_line_total(&line(dec!(0.333), dec!(3), dec!(0), WeightUnit::Kg, dec!(7.5)), &[]).unwrap();
    assert_eq!(calc.base_price, dec!(0.999));
    assert_eq!(calc.rounded().base_price, dec!(1.00));
    assert_eq!(round_money(dec!(0.125)), dec!(0.13));
}

#[test]
fn invalid_lines_are_rejected() {
    let t = tiers();
    assert!(matches!(
        compose_line_total(&line(dec!(1), dec!(0), dec!(1), WeightUnit::Kg, dec!(0)), &t),
        Err(PricingError::NonPositiveQuantity(_))
    ));
    assert!(matches!(
        compose_line_total(&line(dec!(-1), dec!(1), dec!(1), WeightUnit::Kg, dec!(0)), &t),
        Err(PricingError::NegativeAmount { .. })
    ));
    assert!(matches!(
        compose_line_total(&line(dec!(1), dec!(1), dec!(1), WeightUnit::Kg, dec!(101)), &t),
        Err(PricingError::TaxRateOutOfRange(_))
    ));
}

#[test]
fn document_totals_sum_printed_lines() {
    let t = tiers();
    let lines = [
        compose_line_total(&line(dec!(0.335), dec!(1), dec!(0), WeightUnit::Kg, dec!(0)), &t).unwrap(),
        compose_line_total(&line(dec!(0.335), dec!(1), dec!(0), WeightUnit::Kg, dec!(0)), &t).unwrap(),
    ];
    let totals = sum_lines(&lines).unwrap();
    // 0.34 + 0.34, as printed on the two lines
    assert_eq!(totals.subtotal, dec!(0.68));
    assert_eq!(totals.delivery_total, dec!(80));
    let printed: Decimal = lines.iter().map(|l| l.rounded().total_amount).sum();
    assert_eq!(totals.total_amount, printed);
}

fn money() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// total = base + delivery + tax, and tax = (base + delivery) × rate / 100
    #[test]
    fn total_is_sum_of_parts(
        price in money(),
        qty in 1i64..10_000,
        weight in 0i64..50_000,
        tax in 0u32..=100,
    ) {
        let input = line(price, Decimal::from(qty), Decimal::new(weight, 3), WeightUnit::Kg, Decimal::from(tax));
        let calc = compose_line_total(&input, &tiers()).unwrap();

        prop_assert_eq!(calc.base_price, price * Decimal::from(qty));
        prop_assert_eq!(
            calc.tax_amount,
            (calc.base_price + calc.delivery_charge) * Decimal::from(tax) / Decimal::ONE_HUNDRED
        );
        prop_assert_eq!(calc.total_amount, calc.base_price + calc.delivery_charge + calc.tax_amount);
    }

    /// Rounded figures are within half a cent of the exact ones
    #[test]
    fn rounding_stays_within_half_a_cent(price in money(), qty in 1i64..1000, tax in 0u32..=100) {
        let input = line(price, Decimal::from(qty), Decimal::ZERO, WeightUnit::Kg, Decimal::from(tax));
        let calc = compose_line_total(&input, &[]).unwrap();
        let rounded = calc.rounded();
        prop_assert!((rounded.total_amount - calc.total_amount).abs() <= dec!(0.005));
        prop_assert!(rounded.total_amount.scale() <= 2);
    }
}
