//! Delivery pricing tests for the Print Shop ERP
//!
//! Weight normalisation, tier matching and the documented pricing scenarios.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    calculate_delivery_charge, find_tier, to_kilograms, validate_tier_set, PricingError,
    TierStatus, WeightPricingTier, WeightUnit,
};
use uuid::Uuid;

fn tier(name: &str, min: Decimal, max: Option<Decimal>, base: Decimal, rate: Option<Decimal>) -> WeightPricingTier {
    WeightPricingTier {
        id: Uuid::new_v4(),
        company_id: Uuid::nil(),
        name: name.to_string(),
        min_weight: min,
        max_weight: max,
        base_price: base,
        per_kg_rate: rate,
        status: TierStatus::Active,
        sort_order: 0,
    }
}

/// Small 0-5 kg flat 100, medium 5-20 kg 150 + 10/kg, heavy 20+ kg 300 + 15/kg
fn standard_tiers() -> Vec<WeightPricingTier> {
    vec![
        tier("Small", dec!(0), Some(dec!(5)), dec!(100), Some(dec!(0))),
        tier("Medium", dec!(5), Some(dec!(20)), dec!(150), Some(dec!(10))),
        tier("Heavy", dec!(20), None, dec!(300), Some(dec!(15))),
    ]
}

fn unit_strategy() -> impl Strategy<Value = WeightUnit> {
    prop_oneof![
        Just(WeightUnit::Kg),
        Just(WeightUnit::G),
        Just(WeightUnit::Lb),
        Just(WeightUnit::Oz),
    ]
}

/// Weights with up to three decimal places, 0 to 100000
fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (0u64..100_000_000).prop_map(|milli| Decimal::new(milli as i64, 3))
}

/// Disjoint ascending tiers built from sorted, deduplicated cut points
fn disjoint_tiers_strategy() -> impl Strategy<Value = Vec<WeightPricingTier>> {
    prop::collection::btree_set(1u32..500, 1..8).prop_map(|cuts| {
        let cuts: Vec<u32> = cuts.into_iter().collect();
        cuts.windows(2)
            .enumerate()
            .map(|(i, w)| {
                // [lower, upper - 0.001] keeps neighbours strictly apart
                tier(
                    &format!("T{}", i),
                    Decimal::from(w[0]),
                    Some(Decimal::from(w[1]) - dec!(0.001)),
                    Decimal::from(i as u32 * 10),
                    None,
                )
            })
            .collect()
    })
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_three_kilograms_is_small() {
    let quote = calculate_delivery_charge(dec!(3), WeightUnit::Kg, &standard_tiers()).unwrap();
    assert_eq!(quote.delivery_charge, dec!(100));
    assert_eq!(quote.tier_name(), Some("Small"));
}

#[test]
fn scenario_shared_boundary_goes_to_first_tier() {
    let quote = calculate_delivery_charge(dec!(5), WeightUnit::Kg, &standard_tiers()).unwrap();
    assert_eq!(quote.delivery_charge, dec!(100));
    assert_eq!(quote.tier_name(), Some("Small"));
}

#[test]
fn scenario_ten_kilograms_is_medium() {
    let quote = calculate_delivery_charge(dec!(10), WeightUnit::Kg, &standard_tiers()).unwrap();
    assert_eq!(quote.delivery_charge, dec!(250));
    assert_eq!(quote.tier_name(), Some("Medium"));
}

#[test]
fn scenario_open_ended_heavy_tier() {
    let quote = calculate_delivery_charge(dec!(25), WeightUnit::Kg, &standard_tiers()).unwrap();
    assert_eq!(quote.delivery_charge, dec!(675));
    assert_eq!(quote.tier_name(), Some("Heavy"));
}

#[test]
fn scenario_grams_are_normalised() {
    let quote = calculate_delivery_charge(dec!(500), WeightUnit::G, &standard_tiers()).unwrap();
    assert_eq!(quote.weight_kg, dec!(0.5));
    assert_eq!(quote.tier_name(), Some("Small"));
}

#[test]
fn scenario_no_tiers_is_free() {
    let quote = calculate_delivery_charge(dec!(12), WeightUnit::Kg, &[]).unwrap();
    assert_eq!(quote.delivery_charge, Decimal::ZERO);
    assert!(quote.tier.is_none());
}

#[test]
fn gap_between_tiers_is_free() {
    let tiers = vec![
        tier("Light", dec!(0), Some(dec!(1)), dec!(20), None),
        tier("Bulk", dec!(10), None, dec!(90), None),
    ];
    let quote = calculate_delivery_charge(dec!(4), WeightUnit::Kg, &tiers).unwrap();
    assert_eq!(quote.delivery_charge, Decimal::ZERO);
    assert!(quote.tier.is_none());
}

#[test]
fn inactive_tiers_are_skipped() {
    let mut tiers = standard_tiers();
    tiers[0].status = TierStatus::Inactive;
    let quote = calculate_delivery_charge(dec!(3), WeightUnit::Kg, &tiers).unwrap();
    assert!(quote.tier.is_none());
}

#[test]
fn negative_weight_is_invalid_argument() {
    let err = calculate_delivery_charge(dec!(-0.5), WeightUnit::Kg, &standard_tiers()).unwrap_err();
    assert_eq!(err, PricingError::NegativeWeight(dec!(-0.5)));
    assert_eq!(err.field(), Some("weight"));
}

#[test]
fn unknown_unit_is_rejected() {
    assert!(matches!("stone".parse::<WeightUnit>(), Err(PricingError::UnknownUnit(_))));
}

#[test]
fn standard_tiers_are_a_valid_set() {
    assert!(validate_tier_set(&standard_tiers()).is_ok());
}

#[test]
fn overlapping_tiers_are_rejected() {
    let tiers = vec![
        tier("A", dec!(0), Some(dec!(10)), dec!(10), None),
        tier("B", dec!(5), Some(dec!(20)), dec!(20), None),
    ];
    assert!(matches!(validate_tier_set(&tiers), Err(PricingError::OverlappingTiers { .. })));
}

#[test]
fn two_open_ended_tiers_are_rejected() {
    let tiers = vec![
        tier("A", dec!(0), None, dec!(10), None),
        tier("B", dec!(50), None, dec!(20), None),
    ];
    assert!(validate_tier_set(&tiers).is_err());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Normalised kilograms never decrease as the weight grows
    #[test]
    fn normalisation_is_monotonic(a in weight_strategy(), b in weight_strategy(), unit in unit_strategy()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_kg = to_kilograms(low, unit).unwrap();
        let high_kg = to_kilograms(high, unit).unwrap();
        prop_assert!(low_kg <= high_kg, "{} {} -> {} kg, {} -> {} kg", unit, low, low_kg, high, high_kg);
    }

    /// Over disjoint tiers at most one tier contains a weight, and it is the one picked
    #[test]
    fn disjoint_tiers_match_at_most_once(tiers in disjoint_tiers_strategy(), weight in weight_strategy()) {
        let weight = weight / dec!(100);
        let containing: Vec<_> = tiers.iter().filter(|t| t.contains(weight)).collect();
        prop_assert!(containing.len() <= 1);

        let picked = find_tier(&tiers, weight);
        prop_assert_eq!(picked.map(|t| t.id), containing.first().map(|t| t.id));
    }

    /// Same input, same quote
    #[test]
    fn pricing_is_idempotent(weight in weight_strategy(), unit in unit_strategy()) {
        let tiers = standard_tiers();
        let first = calculate_delivery_charge(weight, unit, &tiers).unwrap();
        let second = calculate_delivery_charge(weight, unit, &tiers).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Both ends of a tier's range belong to it
    #[test]
    fn tier_bounds_are_inclusive(min in 0u32..1000, width in 1u32..1000) {
        let min = Decimal::from(min);
        let max = min + Decimal::from(width);
        let tiers = vec![tier("Only", min, Some(max), dec!(5), None)];

        for weight in [min, max] {
            let quote = calculate_delivery_charge(weight, WeightUnit::Kg, &tiers).unwrap();
            prop_assert_eq!(quote.tier_name(), Some("Only"));
        }
        let above = calculate_delivery_charge(max + dec!(0.0001), WeightUnit::Kg, &tiers).unwrap();
        prop_assert!(above.tier.is_none());
    }

    /// A matched charge is base price plus rate times kilograms
    #[test]
    fn charge_follows_tier_formula(weight in weight_strategy()) {
        let quote = calculate_delivery_charge(weight, WeightUnit::Kg, &standard_tiers()).unwrap();
        let tier = quote.tier.clone().expect("standard tiers cover every non-negative weight");
        let expected = tier.base_price + tier.per_kg_rate.unwrap_or(Decimal::ZERO) * quote.weight_kg;
        prop_assert_eq!(quote.delivery_charge, expected);
    }
}
