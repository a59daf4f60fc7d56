//! Arithmetic on counters the server sends as decimal strings.

use std::str::FromStr;

use num_bigint::BigInt;

/// Increment a decimal-string counter by one.
///
/// Integer strings of any length are exact. Anything else (exponents,
/// fractions, garbage) goes through `f64` instead, with unparseable input
/// counting as zero.
pub fn bump_view_count(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "1".to_string();
    }
    match BigInt::from_str(raw) {
        Ok(count) => (count + 1u32).to_string(),
        Err(_) => {
            let value = raw.parse::<f64>().ok().filter(|v| !v.is_nan()).unwrap_or(0.0);
            (value + 1.0).to_string()
        }
    }
}
