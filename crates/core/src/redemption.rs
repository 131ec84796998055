use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::models::{Card, RedemptionValuation};

// Channel vocabulary the extractor understands. A detected phrase maps to the
// slug used in card value tables; a slug the card does not price is an
// UnknownChannel, not a silent fallback.
const CHANNEL_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "travel_portal",
        &["travel portal", "flight booking", "hotel booking", "travel bookings"],
    ),
    (
        "partner_transfer",
        &["partner transfer", "transfer to partners", "miles transfer"],
    ),
    ("vouchers", &["voucher", "vouchers", "gift card", "gift cards"]),
    ("cashback", &["cashback", "cash back", "statement credit"]),
];

pub fn detect_channel(lower_text: &str) -> Option<&'static str> {
    CHANNEL_VOCABULARY
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| lower_text.contains(phrase)))
        .map(|(slug, _)| *slug)
}

/// Values a point balance against the card's redemption table: one channel if
/// named, otherwise every channel so the phrasing layer can present the best
/// option.
pub fn value_points(
    card: &Card,
    points: Decimal,
    channel: Option<&str>,
) -> Result<RedemptionValuation, EngineError> {
    if points <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(points));
    }

    let channel_values: BTreeMap<String, Decimal> = match channel {
        Some(name) => {
            let rate = card
                .value_per_point
                .get(name)
                .ok_or_else(|| EngineError::UnknownChannel {
                    card_id: card.id.clone(),
                    channel: name.to_string(),
                })?;
            BTreeMap::from([(name.to_string(), points * *rate)])
        }
        None => card
            .value_per_point
            .iter()
            .map(|(name, rate)| (name.clone(), points * *rate))
            .collect(),
    };

    let best = channel_values
        .iter()
        .max_by(|a, b| a.1.cmp(b.1))
        .map(|(name, value)| (name.clone(), *value));

    Ok(RedemptionValuation {
        card_id: card.id.clone(),
        points,
        channel_values,
        best_channel: best.as_ref().map(|(name, _)| name.clone()),
        best_value: best.map(|(_, value)| value),
    })
}
