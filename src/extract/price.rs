//! Display price parsing

use lazy_static::lazy_static;
use regex::Regex;

/// The currency marker a price text must carry to be accepted
pub const CURRENCY_MARKER: char = '$';

lazy_static! {
    /// Optional `$` followed by a run of digits, thousands separators and a decimal point
    static ref PRICE_PATTERN: Regex =
        Regex::new(r"\$?([0-9,]+\.?[0-9]*)").expect("price pattern is a valid regex");
}

/// A numeric price read from display text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    /// The parsed amount with thousands separators removed
    pub amount: f64,

    /// Whether the source text carried the currency marker
    pub has_currency_marker: bool,
}

/// Parses the first price-looking run out of a display string
///
/// Returns None when the text has no digits, or when the matched run does not
/// parse as a number (for example a lone `,`).
///
/// # Examples
///
/// ```
/// use catalog_harvest::extract::parse_price;
///
/// let price = parse_price("$5,120.96").unwrap();
/// assert_eq!(price.amount, 5120.96);
/// assert!(price.has_currency_marker);
/// assert!(parse_price("Contact us").is_none());
/// ```
pub fn parse_price(text: &str) -> Option<Price> {
    let captures = PRICE_PATTERN.captures(text)?;
    let numeral = captures.get(1)?.as_str().replace(',', "");
    let amount = numeral.parse::<f64>().ok()?;

    Some(Price {
        amount,
        has_currency_marker: has_currency_marker(text),
    })
}

/// Returns true if the text contains the currency marker
pub fn has_currency_marker(text: &str) -> bool {
    text.contains(CURRENCY_MARKER)
}

/// Keeps a raw price text only if it is non-blank and carries the currency marker
///
/// This is the gate that keeps `priceNumeric` derived from an accepted
/// `price`: callers parse the returned text, never the raw input.
pub fn accept_price_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty() && has_currency_marker(t))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dollar_price() {
        let price = parse_price("$5,120.96").unwrap();
        assert_eq!(price.amount, 5120.96);
        assert!(price.has_currency_marker);
    }

    #[test]
    fn test_parse_plain_number() {
        let price = parse_price("39.99").unwrap();
        assert_eq!(price.amount, 39.99);
        assert!(!price.has_currency_marker);
    }

    #[test]
    fn test_parse_first_run_wins() {
        let price = parse_price("As low as $36.45 (was $41.00)").unwrap();
        assert_eq!(price.amount, 36.45);
    }

    #[test]
    fn test_parse_whole_dollars() {
        assert_eq!(parse_price("$2,400").unwrap().amount, 2400.0);
    }

    #[test]
    fn test_parse_without_digits() {
        assert!(parse_price("Contact us").is_none());
        assert!(parse_price("").is_none());
    }

    #[test]
    fn test_parse_lone_separator() {
        assert!(parse_price("Gold, silver").is_none());
    }

    #[test]
    fn test_missing_text_yields_none() {
        let text: Option<&str> = None;
        assert!(text.and_then(parse_price).is_none());
    }

    #[test]
    fn test_accept_price_text() {
        assert_eq!(
            accept_price_text(Some("  $44.10 ")),
            Some("$44.10".to_string())
        );
        assert_eq!(accept_price_text(Some("44.10")), None);
        assert_eq!(accept_price_text(Some("   ")), None);
        assert_eq!(accept_price_text(None), None);
    }
}
