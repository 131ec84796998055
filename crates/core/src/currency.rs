use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;

// Shorthand patterns, most specific first. Single-letter suffixes (L, k) only
// match when glued to the digits, so the letter L in ordinary words never
// triggers a rewrite. Word forms tolerate a space ("2 lakh", "1 crore").
static CRORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:,\d+)*(?:\.\d+)?)\s*(?:crores?|cr)\b").expect("valid crore pattern")
});
static LAKH_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:,\d+)*(?:\.\d+)?)\s*(?:lakhs?|lacs?)\b").expect("valid lakh pattern")
});
static LAKH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:,\d+)*(?:\.\d+)?)l\b").expect("valid lakh suffix pattern")
});
static THOUSAND_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:,\d+)*(?:\.\d+)?)k\b").expect("valid thousand suffix pattern")
});
static GROUPED_DIGITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,3}(?:,\d{2,3})+(?:\.\d+)?\b").expect("valid grouped digits pattern")
});

const CRORE_FACTOR: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
const LAKH_FACTOR: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
const THOUSAND_FACTOR: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// Rewrites Indian currency shorthand ("3L", "20k", "2 crore", "1,00,000")
/// into canonical digit form, leaving everything else untouched. Each
/// occurrence is rewritten independently, left to right; a suffix without a
/// parseable number in front of it stays as-is.
pub fn normalize_currency(text: &str) -> String {
    let text = CRORE.replace_all(text, |caps: &Captures| scale(caps, CRORE_FACTOR));
    let text = LAKH_WORD.replace_all(&text, |caps: &Captures| scale(caps, LAKH_FACTOR));
    let text = LAKH_SUFFIX.replace_all(&text, |caps: &Captures| scale(caps, LAKH_FACTOR));
    let text = THOUSAND_SUFFIX.replace_all(&text, |caps: &Captures| scale(caps, THOUSAND_FACTOR));
    let text = GROUPED_DIGITS.replace_all(&text, |caps: &Captures| caps[0].replace(',', ""));
    text.into_owned()
}

fn scale(caps: &Captures, factor: Decimal) -> String {
    match caps[1].replace(',', "").parse::<Decimal>() {
        Ok(number) => (number * factor).normalize().to_string(),
        Err(_) => caps[0].to_string(),
    }
}
