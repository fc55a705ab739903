//! WebAssembly module for the Print Shop ERP
//!
//! Provides client-side computation for:
//! - Delivery charge quotes against a tier table
//! - Line total previews on the invoice form
//! - Payment status rollup

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::pricing::*;
pub use shared::totals::*;
pub use shared::weight::*;

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&format!("{}: {}", context, err)).into()
}

fn to_decimal(value: f64) -> Result<Decimal, JsValue> {
    Decimal::try_from(value).map_err(|_| js_error("Invalid weight", shared::PricingError::NonFiniteWeight))
}

/// Quote a delivery charge. `tiers_json` is the company's tier list in
/// evaluation order; the result is the rounded `DeliveryQuote` as JSON.
#[wasm_bindgen]
pub fn calculate_delivery_charge(weight: f64, unit: &str, tiers_json: &str) -> Result<String, JsValue> {
    let unit: WeightUnit = unit.parse().map_err(|e| js_error("Invalid unit", e))?;
    let tiers: Vec<WeightPricingTier> =
        serde_json::from_str(tiers_json).map_err(|e| js_error("Invalid tiers JSON", e))?;

    let quote = shared::calculate_delivery_charge(to_decimal(weight)?, unit, &tiers)
        .map_err(|e| js_error("Pricing failed", e))?;

    serde_json::to_string(&quote.rounded()).map_err(|e| js_error("Serialization failed", e))
}

/// Price one line. `input_json` holds `{ line, tiers }` where `line` is a
/// `LineItemInput`; the result is the rounded `DeliveryCalculation`.
#[wasm_bindgen]
pub fn calculate_line_total(input_json: &str) -> Result<String, JsValue> {
    #[derive(serde::Deserialize)]
    struct Request {
        line: LineItemInput,
        #[serde(default)]
        tiers: Vec<WeightPricingTier>,
    }

    let request: Request =
        serde_json::from_str(input_json).map_err(|e| js_error("Invalid line JSON", e))?;
    let calculation = compose_line_total(&request.line, &request.tiers)
        .map_err(|e| js_error("Pricing failed", e))?;

    serde_json::to_string(&calculation.rounded()).map_err(|e| js_error("Serialization failed", e))
}

/// Payment status for an invoice total and the amount paid so far
#[wasm_bindgen]
pub fn payment_status(total_amount: &str, amount_paid: &str) -> Result<String, JsValue> {
    let total: Decimal = total_amount.parse().map_err(|e| js_error("Invalid total", e))?;
    let paid: Decimal = amount_paid.parse().map_err(|e| js_error("Invalid amount paid", e))?;
    Ok(rollup_payment_status(total, paid).as_str().to_string())
}
