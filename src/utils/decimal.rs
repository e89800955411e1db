use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Render a reading the way it reads back: always with a fractional
/// part, or with a signed two-digit exponent (`150.0`, `-10.5`, `1e+30`,
/// `1.5e-05`).
pub fn format_reading(value: f64) -> String {
    let text = format!("{:?}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// Convert a finite float into an exact decimal using its shortest
/// round-trip text, so `150.0` persists as `150.0` and `0.1` as `0.1`.
pub fn exact_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }

    let text = format!("{:?}", value);
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| Decimal::from_f64(value))
}
