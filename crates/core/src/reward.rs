use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::models::{
    Card, CardComputation, MilestoneRule, RateTier, SpendCategory, TierBreakdown,
};

/// Computes reward units for one card. Order of operations: exclusion
/// short-circuit, tier walk, cap clamp, milestone check. All arithmetic stays
/// exact; the total is floored to a whole unit only at the end.
pub fn compute_reward(
    card: &Card,
    category: Option<SpendCategory>,
    amount: Decimal,
) -> Result<CardComputation, EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(amount));
    }

    let category = category.unwrap_or(SpendCategory::General);

    if card.accrual_exclusions.contains(&category) {
        return Ok(CardComputation {
            card_id: card.id.clone(),
            category,
            amount,
            earned_units: Decimal::ZERO,
            applied_cap: false,
            applied_exclusion: true,
            tier_breakdown: Vec::new(),
            milestones: Vec::new(),
            redemption_value: None,
        });
    }

    let schedule = resolve_schedule(card, category)?;
    let (raw_units, tier_breakdown) = walk_tiers(&schedule, amount);

    let mut units = raw_units;
    let mut applied_cap = false;
    if let Some(cap) = card.category_caps.get(&category) {
        if units > cap.max_units {
            units = cap.max_units;
            applied_cap = true;
        }
    }

    let earned_units = units.floor();
    let milestones: Vec<MilestoneRule> = card
        .milestones
        .iter()
        .filter(|milestone| amount >= milestone.threshold)
        .cloned()
        .collect();

    Ok(CardComputation {
        card_id: card.id.clone(),
        category,
        amount,
        earned_units,
        applied_cap,
        applied_exclusion: false,
        tier_breakdown,
        milestones,
        redemption_value: best_channel_value(card, earned_units),
    })
}

/// Category-specific tiers if defined, else the card's general tier list,
/// else the flat general rate as a single unbounded band. A card with none of
/// these cannot price the category.
fn resolve_schedule(card: &Card, category: SpendCategory) -> Result<Vec<RateTier>, EngineError> {
    let specific = card.tiers_for(category);
    if !specific.is_empty() {
        return Ok(specific.into_iter().cloned().collect());
    }

    if category != SpendCategory::General {
        let general = card.tiers_for(SpendCategory::General);
        if !general.is_empty() {
            return Ok(general.into_iter().cloned().collect());
        }
    }

    match &card.rate_general {
        Some(rate) => Ok(vec![RateTier {
            category,
            floor: Decimal::ZERO,
            ceiling: None,
            rate: rate.clone(),
        }]),
        None => Err(EngineError::UnresolvedCategory(category)),
    }
}

// Tiers are validated at repository build: ascending, contiguous from zero,
// nothing after an unbounded band. Spend past a bounded final band earns
// nothing more.
fn walk_tiers(tiers: &[RateTier], amount: Decimal) -> (Decimal, Vec<TierBreakdown>) {
    let mut total = Decimal::ZERO;
    let mut breakdown = Vec::new();

    for tier in tiers {
        if amount <= tier.floor {
            break;
        }
        let upper = tier.ceiling.map_or(amount, |ceiling| ceiling.min(amount));
        let amount_in_tier = upper - tier.floor;
        if amount_in_tier <= Decimal::ZERO {
            continue;
        }
        let units = tier.rate.units_for(amount_in_tier);
        total += units;
        breakdown.push(TierBreakdown {
            floor: tier.floor,
            ceiling: tier.ceiling,
            amount_in_tier,
            units,
        });
    }

    (total, breakdown)
}

fn best_channel_value(card: &Card, units: Decimal) -> Option<Decimal> {
    card.value_per_point
        .values()
        .max()
        .map(|rate| units * *rate)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::EarnRate;

    fn rate(points: i64, per_spend: i64) -> EarnRate {
        EarnRate {
            points: Decimal::from(points),
            per_spend: Decimal::from(per_spend),
        }
    }

    fn tier(category: SpendCategory, floor: i64, ceiling: Option<i64>, earn: EarnRate) -> RateTier {
        RateTier {
            category,
            floor: Decimal::from(floor),
            ceiling: ceiling.map(Decimal::from),
            rate: earn,
        }
    }

    fn miles_card() -> Card {
        Card {
            id: "atlas".to_string(),
            display_name: "Atlas".to_string(),
            aliases: vec!["atlas".to_string()],
            reward_currency: "miles".to_string(),
            rate_general: Some(rate(2, 100)),
            rate_tiers: vec![
                tier(SpendCategory::Travel, 0, Some(200_000), rate(5, 100)),
                tier(SpendCategory::Travel, 200_000, None, rate(2, 100)),
            ],
            accrual_exclusions: [SpendCategory::Rent].into_iter().collect(),
            category_caps: BTreeMap::new(),
            value_per_point: BTreeMap::new(),
            milestones: Vec::new(),
            extra: Default::default(),
        }
    }

    fn capped_card() -> Card {
        Card {
            id: "epm".to_string(),
            display_name: "EPM".to_string(),
            aliases: vec!["epm".to_string()],
            reward_currency: "points".to_string(),
            rate_general: Some(rate(3, 100)),
            rate_tiers: Vec::new(),
            accrual_exclusions: Default::default(),
            category_caps: BTreeMap::from([(
                SpendCategory::Utility,
                crate::models::CapRule {
                    max_units: Decimal::from(1_000),
                },
            )]),
            value_per_point: BTreeMap::new(),
            milestones: Vec::new(),
            extra: Default::default(),
        }
    }

    #[test]
    fn tiered_travel_spend_rolls_over() {
        let result =
            compute_reward(&miles_card(), Some(SpendCategory::Travel), Decimal::from(300_000))
                .unwrap();
        assert_eq!(result.earned_units, Decimal::from(12_000));
        assert_eq!(result.tier_breakdown.len(), 2);
        assert_eq!(result.tier_breakdown[0].units, Decimal::from(10_000));
        assert_eq!(result.tier_breakdown[1].units, Decimal::from(2_000));
        assert!(!result.applied_cap);
    }

    #[test]
    fn earning_is_monotonic_across_the_tier_boundary() {
        let card = miles_card();
        let at_boundary =
            compute_reward(&card, Some(SpendCategory::Travel), Decimal::from(200_000)).unwrap();
        let past_boundary =
            compute_reward(&card, Some(SpendCategory::Travel), Decimal::from(250_000)).unwrap();
        assert_eq!(at_boundary.earned_units, Decimal::from(10_000));
        assert_eq!(past_boundary.earned_units, Decimal::from(11_000));
    }

    #[test]
    fn bounded_final_tier_stops_earning() {
        let mut card = miles_card();
        card.rate_tiers = vec![tier(SpendCategory::Travel, 0, Some(100_000), rate(5, 100))];
        let result =
            compute_reward(&card, Some(SpendCategory::Travel), Decimal::from(150_000)).unwrap();
        assert_eq!(result.earned_units, Decimal::from(5_000));
    }

    #[test]
    fn cap_clamps_and_is_idempotent() {
        let card = capped_card();
        let first =
            compute_reward(&card, Some(SpendCategory::Utility), Decimal::from(50_000)).unwrap();
        assert_eq!(first.earned_units, Decimal::from(1_000));
        assert!(first.applied_cap);

        let larger =
            compute_reward(&card, Some(SpendCategory::Utility), Decimal::from(500_000)).unwrap();
        assert_eq!(larger.earned_units, first.earned_units);
    }

    #[test]
    fn excluded_category_earns_nothing() {
        let result =
            compute_reward(&miles_card(), Some(SpendCategory::Rent), Decimal::from(10_000_000))
                .unwrap();
        assert_eq!(result.earned_units, Decimal::ZERO);
        assert!(result.applied_exclusion);
        assert!(result.tier_breakdown.is_empty());
    }

    #[test]
    fn unknown_category_falls_back_to_general_rate() {
        let result = compute_reward(&miles_card(), None, Decimal::from(10_000)).unwrap();
        assert_eq!(result.earned_units, Decimal::from(200));
    }

    #[test]
    fn fractional_units_floor_only_at_the_end() {
        let result = compute_reward(&capped_card(), None, Decimal::from(150)).unwrap();
        // 150 / 100 * 3 = 4.5, floored once at output
        assert_eq!(result.earned_units, Decimal::from(4));
        assert_eq!(
            result.tier_breakdown[0].units,
            "4.5".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = compute_reward(&miles_card(), None, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn category_without_any_rate_is_rejected() {
        let mut card = miles_card();
        card.rate_general = None;
        let err = compute_reward(&card, Some(SpendCategory::Dining), Decimal::from(1_000))
            .unwrap_err();
        assert_eq!(err, EngineError::UnresolvedCategory(SpendCategory::Dining));
    }

    #[test]
    fn milestones_report_every_threshold_met() {
        let mut card = capped_card();
        card.milestones = vec![
            MilestoneRule {
                threshold: Decimal::from(400_000),
                description: "voucher at 4L".to_string(),
                value: Decimal::from(3_000),
            },
            MilestoneRule {
                threshold: Decimal::from(800_000),
                description: "voucher at 8L".to_string(),
                value: Decimal::from(3_000),
            },
        ];
        let result = compute_reward(&card, None, Decimal::from(800_000)).unwrap();
        assert_eq!(result.milestones.len(), 2);

        let halfway = compute_reward(&card, None, Decimal::from(500_000)).unwrap();
        assert_eq!(halfway.milestones.len(), 1);
    }
}
