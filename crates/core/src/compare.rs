use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CardComputation, RedemptionValuation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub winner: Option<String>,
    pub margin: Decimal,
}

/// Earning comparison: strictly greater units win, ties have no winner.
pub fn compare_rewards(a: &CardComputation, b: &CardComputation) -> ComparisonOutcome {
    decide(&a.card_id, a.earned_units, &b.card_id, b.earned_units)
}

/// Redemption comparison. A point is not a valid cross-card unit (per-point
/// value differs), so this compares the best channel's currency value.
pub fn compare_redemptions(
    a: &RedemptionValuation,
    b: &RedemptionValuation,
) -> ComparisonOutcome {
    decide(
        &a.card_id,
        a.best_value.unwrap_or_default(),
        &b.card_id,
        b.best_value.unwrap_or_default(),
    )
}

fn decide(a_id: &str, a_value: Decimal, b_id: &str, b_value: Decimal) -> ComparisonOutcome {
    if a_value > b_value {
        ComparisonOutcome {
            winner: Some(a_id.to_string()),
            margin: a_value - b_value,
        }
    } else if b_value > a_value {
        ComparisonOutcome {
            winner: Some(b_id.to_string()),
            margin: b_value - a_value,
        }
    } else {
        ComparisonOutcome {
            winner: None,
            margin: Decimal::ZERO,
        }
    }
}
