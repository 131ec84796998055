use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::extract::match_category;
use crate::models::{Card, Intent};

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Classification output: the winning intent plus the card ids the query
/// referenced (0, 1 or 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedQuery {
    pub intent: Intent,
    pub cards: Vec<String>,
}

// Pattern groups in priority order. Redemption and comparison wording are
// higher-precision signals that can co-occur with generic spend phrasing
// ("compare rewards if I spend 50k"), so they are checked first.
const REDEMPTION_KEYWORDS: &[&str] = &[
    "redeem",
    "redeeming",
    "redemption",
    "points for",
    "convert points",
];

const COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "comparison",
    "vs",
    "versus",
    "better",
    "which card",
];

const CALCULATION_KEYWORDS: &[&str] = &[
    "earn", "earns", "earned", "earning", "spend", "spends", "spent", "spending",
];

const DUAL_CARD_PHRASES: &[&str] = &["both cards", "both the cards", "either card", "which card"];

pub fn classify_query(text: &str, cards: &[Card]) -> ClassifiedQuery {
    let lower = text.to_lowercase();
    let words: HashSet<&str> = lower.unicode_words().collect();

    let mut referenced: Vec<String> = cards
        .iter()
        .filter(|card| card.matches_alias(&lower))
        .map(|card| card.id.clone())
        .collect();

    if referenced.is_empty()
        && DUAL_CARD_PHRASES
            .iter()
            .any(|phrase| lower.contains(phrase))
    {
        referenced = cards.iter().map(|card| card.id.clone()).collect();
    }

    if has_any_keyword(&lower, &words, REDEMPTION_KEYWORDS) {
        return ClassifiedQuery {
            intent: Intent::RedemptionQuery,
            cards: referenced,
        };
    }

    if has_any_keyword(&lower, &words, COMPARISON_KEYWORDS) {
        // A comparison needs two sides; with one or zero cards named, the
        // rest of the deck is implied ("is atlas better?").
        if referenced.len() < 2 {
            referenced = cards.iter().map(|card| card.id.clone()).collect();
        }
        return ClassifiedQuery {
            intent: Intent::FeatureComparison,
            cards: referenced,
        };
    }

    let has_amount = lower.chars().any(|ch| ch.is_ascii_digit());
    if has_any_keyword(&lower, &words, CALCULATION_KEYWORDS)
        || (has_amount && match_category(&lower).is_some())
    {
        return ClassifiedQuery {
            intent: Intent::RewardCalculation,
            cards: referenced,
        };
    }

    ClassifiedQuery {
        intent: Intent::GeneralQuery,
        cards: referenced,
    }
}

fn has_any_keyword(lower: &str, words: &HashSet<&str>, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        if keyword.contains(' ') {
            lower.contains(keyword)
        } else {
            words.contains(keyword)
        }
    })
}
