use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Spend categories the reward engine understands. Anything that does not
/// match a category keyword stays unset and later falls back to the card's
/// general rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendCategory {
    Travel,
    Dining,
    Grocery,
    Utility,
    Fuel,
    Education,
    Insurance,
    Government,
    Rent,
    Wallet,
    Jewellery,
    General,
}

impl SpendCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "travel" | "hotel" | "flight" => Some(Self::Travel),
            "dining" | "restaurant" | "food" => Some(Self::Dining),
            "grocery" | "groceries" => Some(Self::Grocery),
            "utility" | "utilities" => Some(Self::Utility),
            "fuel" | "petrol" | "diesel" => Some(Self::Fuel),
            "education" | "tuition" => Some(Self::Education),
            "insurance" => Some(Self::Insurance),
            "government" | "govt" | "tax" => Some(Self::Government),
            "rent" => Some(Self::Rent),
            "wallet" | "upi" => Some(Self::Wallet),
            "jewellery" | "jewelry" | "gold" => Some(Self::Jewellery),
            "general" | "other" => Some(Self::General),
            _ => None,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::Dining => "dining",
            Self::Grocery => "grocery",
            Self::Utility => "utility",
            Self::Fuel => "fuel",
            Self::Education => "education",
            Self::Insurance => "insurance",
            Self::Government => "government",
            Self::Rent => "rent",
            Self::Wallet => "wallet",
            Self::Jewellery => "jewellery",
            Self::General => "general",
        }
    }
}

/// Earning rate expressed the way issuers publish it: N points per ₹M spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnRate {
    pub points: Decimal,
    pub per_spend: Decimal,
}

impl EarnRate {
    pub fn units_for(&self, amount: Decimal) -> Decimal {
        amount / self.per_spend * self.points
    }
}

/// One spend band `[floor, ceiling)` within a category. `ceiling: None` means
/// the band is unbounded, i.e. the rate keeps applying past the last
/// threshold. A bounded final band means spend beyond it earns nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub category: SpendCategory,
    pub floor: Decimal,
    pub ceiling: Option<Decimal>,
    pub rate: EarnRate,
}

/// Per-statement-cycle ceiling on reward units for a category, applied after
/// tier computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapRule {
    pub max_units: Decimal,
}

/// Spend-threshold bonus (e.g. a voucher at ₹4L annual spend). Every
/// milestone whose threshold the amount meets is reported alongside regular
/// earning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRule {
    pub threshold: Decimal,
    pub description: String,
    pub value: Decimal,
}

/// Immutable card definition. Built once at repository load and shared
/// read-only across all queries. Fields the engine never touches (fees,
/// welcome benefits, lounge text) ride along in `extra` for the phrasing
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub reward_currency: String,
    pub rate_general: Option<EarnRate>,
    #[serde(default)]
    pub rate_tiers: Vec<RateTier>,
    #[serde(default)]
    pub accrual_exclusions: HashSet<SpendCategory>,
    #[serde(default)]
    pub category_caps: BTreeMap<SpendCategory, CapRule>,
    #[serde(default)]
    pub value_per_point: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub milestones: Vec<MilestoneRule>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Card {
    pub fn tiers_for(&self, category: SpendCategory) -> Vec<&RateTier> {
        self.rate_tiers
            .iter()
            .filter(|tier| tier.category == category)
            .collect()
    }

    pub fn matches_alias(&self, lower_text: &str) -> bool {
        self.aliases
            .iter()
            .any(|alias| lower_text.contains(&alias.to_lowercase()))
    }
}

/// Query intents, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RedemptionQuery,
    FeatureComparison,
    RewardCalculation,
    GeneralQuery,
}

/// Entities pulled out of a single turn. Unset fields are backfilled from the
/// immediately preceding turn, never from deeper history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub amount: Option<Decimal>,
    pub category: Option<SpendCategory>,
    pub points: Option<Decimal>,
    #[serde(default)]
    pub cards: Vec<String>,
}

impl ExtractedEntities {
    pub fn backfill(mut self, prior: &ExtractedEntities) -> Self {
        if self.amount.is_none() {
            self.amount = prior.amount;
        }
        if self.category.is_none() {
            self.category = prior.category;
        }
        if self.points.is_none() {
            self.points = prior.points;
        }
        if self.cards.is_empty() {
            self.cards = prior.cards.clone();
        }
        self
    }
}

/// How much of the amount landed in one tier and what it earned there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub floor: Decimal,
    pub ceiling: Option<Decimal>,
    pub amount_in_tier: Decimal,
    pub units: Decimal,
}

/// Reward computation for a single card. `earned_units` is floored to a whole
/// unit at the end; the breakdown keeps exact decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardComputation {
    pub card_id: String,
    pub category: SpendCategory,
    pub amount: Decimal,
    pub earned_units: Decimal,
    pub applied_cap: bool,
    pub applied_exclusion: bool,
    pub tier_breakdown: Vec<TierBreakdown>,
    pub milestones: Vec<MilestoneRule>,
    pub redemption_value: Option<Decimal>,
}

/// Point valuation for a single card across redemption channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionValuation {
    pub card_id: String,
    pub points: Decimal,
    pub channel_values: BTreeMap<String, Decimal>,
    pub best_channel: Option<String>,
    pub best_value: Option<Decimal>,
}

/// The sole computation artifact handed to the phrasing layer. Never mutated
/// after construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputationResult {
    #[serde(default)]
    pub rewards: Vec<CardComputation>,
    #[serde(default)]
    pub redemptions: Vec<RedemptionValuation>,
    pub winner: Option<String>,
    pub margin: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEntity {
    SpendAmount,
    SpendCategory,
    CardReference,
    PointQuantity,
    RedemptionChannel,
}

/// Structured "ask the user" result produced when a recoverable condition
/// blocks computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clarification {
    pub missing: MissingEntity,
    pub prompt: String,
}

/// Structured reply for one turn: the classified intent, the entities as
/// understood, the computation (when one ran), and the raw card records the
/// phrasing collaborator needs for fields the engine does not touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReply {
    pub query_id: String,
    pub intent: Intent,
    pub entities: ExtractedEntities,
    pub computation: Option<ComputationResult>,
    pub clarification: Option<Clarification>,
    pub card_context: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_synonyms() {
        assert_eq!(SpendCategory::parse("Hotel"), Some(SpendCategory::Travel));
        assert_eq!(SpendCategory::parse("govt"), Some(SpendCategory::Government));
        assert_eq!(SpendCategory::parse("crypto"), None);
    }

    #[test]
    fn earn_rate_is_exact() {
        let rate = EarnRate {
            points: Decimal::from(5),
            per_spend: Decimal::from(100),
        };
        assert_eq!(rate.units_for(Decimal::from(200_000)), Decimal::from(10_000));
    }

    #[test]
    fn backfill_only_fills_gaps() {
        let prior = ExtractedEntities {
            amount: Some(Decimal::from(50_000)),
            category: Some(SpendCategory::Dining),
            points: None,
            cards: vec!["axis-atlas".to_string()],
        };
        let current = ExtractedEntities {
            amount: None,
            category: None,
            points: None,
            cards: vec!["icici-epm".to_string()],
        };

        let merged = current.backfill(&prior);
        assert_eq!(merged.amount, Some(Decimal::from(50_000)));
        assert_eq!(merged.category, Some(SpendCategory::Dining));
        assert_eq!(merged.cards, vec!["icici-epm".to_string()]);
    }
}
