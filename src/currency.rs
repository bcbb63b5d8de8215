//! Amount formatting shared by the PDF layout and the command line.
//!
//! Amounts are rounded half away from zero to two decimal places and grouped with `,` every three
//! integer digits. No currency symbol is embedded; callers prefix one with [`format_with_symbol`].

use rust_decimal::{Decimal, RoundingStrategy};

const FRACTION_DIGITS: u32 = 2;
const GROUP_SEPARATOR: char = ',';

/// Formats `amount` as `"425,000.00"`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut formatted = String::with_capacity(plain.len() + integer.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        formatted.push('-');
    }
    formatted.push_str(&group_digits(integer));
    formatted.push('.');
    formatted.push_str(fraction);
    formatted
}

/// Formats `amount` with `symbol` in front, separated by a space (`"₦ 618,000.00"`).
///
/// An empty symbol yields the bare amount.
pub fn format_with_symbol(symbol: &str, amount: Decimal) -> String {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        format_amount(amount)
    } else {
        format!("{} {}", symbol, format_amount(amount))
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }
    grouped
}
