use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{ExtractedEntities, SpendCategory};

static POINT_QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:points?|miles?|pts)\b")
        .expect("valid point quantity pattern")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));

// Keyword vocabulary per category. The earliest hit in the text wins, so
// "50000 on dining and 30000 on travel" resolves to dining, matching the
// first captured amount.
const CATEGORY_KEYWORDS: &[(SpendCategory, &[&str])] = &[
    (
        SpendCategory::Travel,
        &[
            "travel", "hotel", "hotels", "flight", "flights", "airfare", "airline", "airlines",
            "holiday",
        ],
    ),
    (
        SpendCategory::Dining,
        &["dining", "dine", "restaurant", "restaurants", "food", "eating out"],
    ),
    (SpendCategory::Grocery, &["grocery", "groceries", "supermarket"]),
    (
        SpendCategory::Utility,
        &["utility", "utilities", "electricity", "broadband"],
    ),
    (SpendCategory::Fuel, &["fuel", "petrol", "diesel"]),
    (
        SpendCategory::Education,
        &["education", "tuition", "school", "college", "university"],
    ),
    (SpendCategory::Insurance, &["insurance", "premium", "premiums"]),
    (
        SpendCategory::Government,
        &["government", "govt", "tax", "taxes"],
    ),
    (SpendCategory::Rent, &["rent"]),
    (SpendCategory::Wallet, &["wallet", "upi"]),
    (SpendCategory::Jewellery, &["jewellery", "jewelry", "gold"]),
    (SpendCategory::General, &["general"]),
];

/// Pulls amount, category and point quantity out of currency-normalized text,
/// attaches the referenced card ids, and backfills anything still unset from
/// the previous turn.
pub fn extract_entities(
    normalized: &str,
    referenced_cards: &[String],
    prior: Option<&ExtractedEntities>,
) -> ExtractedEntities {
    let lower = normalized.to_lowercase();

    let point_capture = POINT_QUANTITY.captures(&lower);
    let points = point_capture
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<Decimal>().ok());
    let points_span = point_capture
        .as_ref()
        .and_then(|caps| caps.get(1))
        .map(|m| (m.start(), m.end()));

    // First standalone number is the spend amount; the point quantity's own
    // digits do not count. Later numbers in multi-amount queries are dropped.
    let mut amount = None;
    for found in NUMBER.find_iter(&lower) {
        if points_span == Some((found.start(), found.end())) {
            continue;
        }
        amount = found.as_str().parse::<Decimal>().ok();
        break;
    }

    let entities = ExtractedEntities {
        amount,
        category: match_category(&lower),
        points,
        cards: referenced_cards.to_vec(),
    };

    match prior {
        Some(prior) => entities.backfill(prior),
        None => entities,
    }
}

/// Earliest category keyword in the text wins; no match leaves the category
/// unset so the general rate applies downstream.
pub fn match_category(lower: &str) -> Option<SpendCategory> {
    let mut best: Option<(usize, SpendCategory)> = None;
    for (category, keywords) in CATEGORY_KEYWORDS {
        for keyword in *keywords {
            if let Some(at) = keyword_position(lower, keyword) {
                if best.map_or(true, |(seen, _)| at < seen) {
                    best = Some((at, *category));
                }
            }
        }
    }
    best.map(|(_, category)| category)
}

fn keyword_position(lower: &str, keyword: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(idx) = lower[from..].find(keyword) {
        let at = from + idx;
        let end = at + keyword.len();
        let bounded_before = at == 0
            || !lower[..at]
                .chars()
                .next_back()
                .is_some_and(|ch| ch.is_alphanumeric());
        let bounded_after = end == lower.len()
            || !lower[end..]
                .chars()
                .next()
                .is_some_and(|ch| ch.is_alphanumeric());
        if bounded_before && bounded_after {
            return Some(at);
        }
        from = end;
    }
    None
}
