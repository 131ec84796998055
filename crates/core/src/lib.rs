pub mod compare;
pub mod currency;
pub mod error;
pub mod extract;
pub mod intent;
pub mod models;
pub mod redemption;
pub mod reward;

pub use compare::{compare_redemptions, compare_rewards, ComparisonOutcome};
pub use currency::normalize_currency;
pub use error::EngineError;
pub use extract::extract_entities;
pub use intent::{classify_query, normalize_text, ClassifiedQuery};
pub use models::*;
pub use redemption::{detect_channel, value_points};
pub use reward::compute_reward;
