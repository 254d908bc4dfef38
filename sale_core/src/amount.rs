use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;

fn scale(decimals: u8) -> U256 {
    (0..decimals).fold(U256::from(1u8), |acc, _| acc * U256::from(10u8))
}

/// Render a smallest-unit integer as a decimal string using integer division only.
///
/// Trailing zeros are trimmed but at least one fractional digit is kept (`1.0`, `2.5`).
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let unit = scale(decimals);
    let whole = amount / unit;
    let fraction = amount % unit;

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

/// Exact `Decimal` for a smallest-unit amount, `None` if it exceeds `Decimal`'s 28 digits
pub fn to_decimal(amount: U256, decimals: u8) -> Option<Decimal> {
    Decimal::from_str(&format_units(amount, decimals)).ok()
}

/// Serialize a `U256` as a plain decimal string instead of the default hex form
pub fn serialize_decimal_string<S>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&amount.to_string())
}
