use std::sync::Arc;
use std::time::Instant;

use cardwise_cards::CardRepository;
use cardwise_core::{
    classify_query, compare_redemptions, compare_rewards, compute_reward, detect_channel,
    extract_entities, normalize_currency, normalize_text, value_points, Clarification,
    ComputationResult, EngineError, EngineReply, ExtractedEntities, Intent, MissingEntity,
};
use cardwise_observability::AppMetrics;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryInput {
    pub text: String,
    #[serde(default)]
    pub prior_entities: Option<ExtractedEntities>,
}

/// Sequences one turn: normalize → classify → extract → compute → assemble.
/// Stateless; carry-over entities are owned by the caller and passed in per
/// turn. Every recoverable condition becomes a clarification in the reply,
/// never an error to the caller.
#[derive(Clone)]
pub struct QueryOrchestrator {
    repository: Arc<CardRepository>,
    metrics: Arc<AppMetrics>,
}

impl QueryOrchestrator {
    pub fn new(repository: Arc<CardRepository>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            repository,
            metrics,
        }
    }

    pub fn repository(&self) -> &CardRepository {
        &self.repository
    }

    #[instrument(skip(self, input))]
    pub fn handle_query(&self, input: QueryInput) -> EngineReply {
        let started = Instant::now();
        self.metrics.inc_query();

        let normalized = normalize_currency(&normalize_text(&input.text));
        let classified = classify_query(&normalized, self.repository.cards());
        let mut entities = extract_entities(
            &normalized,
            &classified.cards,
            input.prior_entities.as_ref(),
        );

        // A stale carry-over id must not crash the turn.
        entities
            .cards
            .retain(|id| self.repository.get(id).is_some());

        // A follow-up like "what about ICICI?" has no intent keywords of its
        // own; once the prior turn's entities are merged in, a computable
        // context upgrades the default intent.
        let mut intent = classified.intent;
        if intent == Intent::GeneralQuery
            && input.prior_entities.is_some()
            && !entities.cards.is_empty()
        {
            if entities.points.is_some() {
                intent = Intent::RedemptionQuery;
            } else if entities.amount.is_some() {
                intent = Intent::RewardCalculation;
            }
        }

        let lower = normalized.to_lowercase();
        let (computation, clarification) = match intent {
            Intent::GeneralQuery => (None, None),
            Intent::RewardCalculation => self.run_reward(&entities),
            Intent::RedemptionQuery => self.run_redemption(&entities, &lower),
            Intent::FeatureComparison => self.run_comparison(&entities, &lower),
        };

        if clarification.is_some() {
            self.metrics.inc_clarification();
        }
        if computation
            .as_ref()
            .is_some_and(|c| c.rewards.iter().any(|r| r.applied_exclusion))
        {
            self.metrics.inc_exclusion_hit();
        }

        let context_ids: Vec<&str> = if entities.cards.is_empty() {
            self.repository
                .cards()
                .iter()
                .map(|card| card.id.as_str())
                .collect()
        } else {
            entities.cards.iter().map(String::as_str).collect()
        };
        let card_context = context_ids
            .iter()
            .filter_map(|id| self.repository.raw_record(id))
            .cloned()
            .collect();

        let reply = EngineReply {
            query_id: Uuid::new_v4().to_string(),
            intent,
            entities,
            computation,
            clarification,
            card_context,
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            query_id = %reply.query_id,
            intent = ?reply.intent,
            cards = reply.entities.cards.len(),
            clarified = reply.clarification.is_some(),
            "query handled"
        );

        reply
    }

    fn run_reward(
        &self,
        entities: &ExtractedEntities,
    ) -> (Option<ComputationResult>, Option<Clarification>) {
        if entities.cards.is_empty() {
            return (
                None,
                Some(self.clarification_for(&EngineError::AmbiguousCardReference)),
            );
        }
        let Some(amount) = entities.amount else {
            return (
                None,
                Some(Clarification {
                    missing: MissingEntity::SpendAmount,
                    prompt: "How much do you plan to spend?".to_string(),
                }),
            );
        };

        let mut rewards = Vec::new();
        for id in &entities.cards {
            let Some(card) = self.repository.get(id) else {
                continue;
            };
            match compute_reward(card, entities.category, amount) {
                Ok(result) => rewards.push(result),
                Err(error) => return (None, Some(self.clarification_for(&error))),
            }
        }

        let mut result = ComputationResult {
            rewards,
            ..Default::default()
        };
        if result.rewards.len() == 2 {
            let outcome = compare_rewards(&result.rewards[0], &result.rewards[1]);
            result.winner = outcome.winner;
            result.margin = Some(outcome.margin);
        }

        (Some(result), None)
    }

    fn run_redemption(
        &self,
        entities: &ExtractedEntities,
        lower: &str,
    ) -> (Option<ComputationResult>, Option<Clarification>) {
        if entities.cards.is_empty() {
            return (
                None,
                Some(self.clarification_for(&EngineError::AmbiguousCardReference)),
            );
        }
        let Some(points) = entities.points else {
            return (
                None,
                Some(Clarification {
                    missing: MissingEntity::PointQuantity,
                    prompt: "How many points or miles do you want to redeem?".to_string(),
                }),
            );
        };

        let channel = detect_channel(lower);
        let mut redemptions = Vec::new();
        for id in &entities.cards {
            let Some(card) = self.repository.get(id) else {
                continue;
            };
            match value_points(card, points, channel) {
                Ok(valuation) => redemptions.push(valuation),
                Err(error) => return (None, Some(self.clarification_for(&error))),
            }
        }

        let mut result = ComputationResult {
            redemptions,
            ..Default::default()
        };
        if result.redemptions.len() == 2 {
            let outcome = compare_redemptions(&result.redemptions[0], &result.redemptions[1]);
            result.winner = outcome.winner;
            result.margin = Some(outcome.margin);
        }

        (Some(result), None)
    }

    fn run_comparison(
        &self,
        entities: &ExtractedEntities,
        lower: &str,
    ) -> (Option<ComputationResult>, Option<Clarification>) {
        self.metrics.inc_comparison();

        let mut both = entities.clone();
        if both.cards.len() < 2 {
            both.cards = self
                .repository
                .cards()
                .iter()
                .map(|card| card.id.clone())
                .collect();
        }

        // Redemption-flavored comparisons carry a point quantity instead of a
        // spend amount and are settled in currency, not points.
        if both.points.is_some() {
            return self.run_redemption(&both, lower);
        }

        if both.amount.is_none() {
            return (
                None,
                Some(Clarification {
                    missing: MissingEntity::SpendAmount,
                    prompt: "What spend amount should the comparison use?".to_string(),
                }),
            );
        }

        self.run_reward(&both)
    }

    fn card_clarification(&self) -> Clarification {
        Clarification {
            missing: MissingEntity::CardReference,
            prompt: format!("Which card is this about — {}?", self.card_names().join(" or ")),
        }
    }

    fn clarification_for(&self, error: &EngineError) -> Clarification {
        match error {
            EngineError::InvalidAmount(_) => Clarification {
                missing: MissingEntity::SpendAmount,
                prompt: "The spend amount must be a positive number. How much do you plan to spend?"
                    .to_string(),
            },
            EngineError::UnresolvedCategory(_) => Clarification {
                missing: MissingEntity::SpendCategory,
                prompt: "Which spending category is this for (travel, dining, grocery, ...)?"
                    .to_string(),
            },
            EngineError::UnknownChannel { channel, .. } => Clarification {
                missing: MissingEntity::RedemptionChannel,
                prompt: format!(
                    "That card does not offer '{}' redemption. Which channel should I use?",
                    channel
                ),
            },
            EngineError::AmbiguousCardReference => self.card_clarification(),
        }
    }

    fn card_names(&self) -> Vec<String> {
        self.repository
            .cards()
            .iter()
            .map(|card| card.display_name.clone())
            .collect()
    }
}
