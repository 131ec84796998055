use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use cardwise_core::models::{Card, SpendCategory};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

/// Configuration defects in card definitions. These are rejected once at
/// repository build, before any query runs; they never surface as per-query
/// conditions.
#[derive(Debug, Error, PartialEq)]
pub enum CardDataError {
    #[error("card '{0}' defines no aliases")]
    MissingAliases(String),

    #[error("duplicate card id '{0}'")]
    DuplicateCardId(String),

    #[error("card '{card_id}': first tier for '{category}' must start at zero")]
    TierFloorNotZero { card_id: String, category: &'static str },

    #[error("card '{card_id}': tiers for '{category}' overlap or leave a gap at {at}")]
    NonContiguousTiers {
        card_id: String,
        category: &'static str,
        at: Decimal,
    },

    #[error("card '{card_id}': tier defined after an unbounded tier for '{category}'")]
    TierAfterUnbounded { card_id: String, category: &'static str },

    #[error("card '{card_id}': tier for '{category}' has ceiling at or below its floor")]
    EmptyTier { card_id: String, category: &'static str },
}

#[derive(Debug, Clone)]
pub struct RepositoryStats {
    pub cards_loaded: usize,
}

/// Read-only table of card definitions, built once at process start and
/// shared across all queries. Alongside each parsed `Card` it keeps the raw
/// JSON record for the phrasing layer's pass-through fields.
pub struct CardRepository {
    cards: Vec<Card>,
    raw: HashMap<String, Value>,
}

impl CardRepository {
    pub fn from_data_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut cards = Vec::new();
        let mut raw_records = Vec::new();

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some("json")
            })
        {
            let path = entry.path();
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed reading card definition: {}", path.display()))?;
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("card definition is not valid JSON: {}", path.display()))?;
            let card: Card = serde_json::from_value(value.clone())
                .with_context(|| format!("card definition has invalid schema: {}", path.display()))?;

            raw_records.push((card.id.clone(), value));
            cards.push(card);
        }

        Self::build(cards, raw_records)
    }

    /// Builds a repository from already-parsed cards; used with synthetic
    /// fixtures in tests.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self> {
        let raw = cards
            .iter()
            .map(|card| {
                let value = serde_json::to_value(card)
                    .with_context(|| format!("failed serializing card '{}'", card.id))?;
                Ok((card.id.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::build(cards, raw)
    }

    fn build(cards: Vec<Card>, raw_records: Vec<(String, Value)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for card in &cards {
            if !seen.insert(card.id.clone()) {
                return Err(CardDataError::DuplicateCardId(card.id.clone()).into());
            }
            validate_card(card)?;
        }

        Ok(Self {
            cards,
            raw: raw_records.into_iter().collect(),
        })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn raw_record(&self, id: &str) -> Option<&Value> {
        self.raw.get(id)
    }

    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            cards_loaded: self.cards.len(),
        }
    }
}

/// Tier invariant per category: ordered by floor ascending, contiguous from
/// zero, non-overlapping, nothing after an unbounded band.
pub fn validate_card(card: &Card) -> Result<(), CardDataError> {
    if card.aliases.is_empty() {
        return Err(CardDataError::MissingAliases(card.id.clone()));
    }

    let mut categories: Vec<SpendCategory> = Vec::new();
    for tier in &card.rate_tiers {
        if !categories.contains(&tier.category) {
            categories.push(tier.category);
        }
    }

    for category in categories {
        let tiers = card.tiers_for(category);
        let mut previous_ceiling: Option<Decimal> = Some(Decimal::ZERO);

        for (index, tier) in tiers.iter().enumerate() {
            let Some(expected_floor) = previous_ceiling else {
                return Err(CardDataError::TierAfterUnbounded {
                    card_id: card.id.clone(),
                    category: category.as_label(),
                });
            };

            if index == 0 && tier.floor != Decimal::ZERO {
                return Err(CardDataError::TierFloorNotZero {
                    card_id: card.id.clone(),
                    category: category.as_label(),
                });
            }
            if tier.floor != expected_floor {
                return Err(CardDataError::NonContiguousTiers {
                    card_id: card.id.clone(),
                    category: category.as_label(),
                    at: tier.floor,
                });
            }
            if let Some(ceiling) = tier.ceiling {
                if ceiling <= tier.floor {
                    return Err(CardDataError::EmptyTier {
                        card_id: card.id.clone(),
                        category: category.as_label(),
                    });
                }
            }
            previous_ceiling = tier.ceiling;
        }
    }

    Ok(())
}
