use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::SpendCategory;

/// Recoverable per-query conditions. The orchestrator converts each of these
/// into a structured clarification instead of failing the turn.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("spend amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("no earning rate defined for category '{}' and the card has no general rate", .0.as_label())]
    UnresolvedCategory(SpendCategory),

    #[error("redemption channel '{channel}' is not defined for card '{card_id}'")]
    UnknownChannel { card_id: String, channel: String },

    #[error("could not determine which card the query refers to")]
    AmbiguousCardReference,
}
