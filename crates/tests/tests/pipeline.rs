use std::path::PathBuf;
use std::sync::Arc;

use cardwise_cards::CardRepository;
use cardwise_core::{Card, EarnRate, EngineReply, Intent};
use cardwise_engine::{QueryInput, QueryOrchestrator};
use cardwise_observability::AppMetrics;
use rust_decimal::Decimal;

fn engine() -> QueryOrchestrator {
    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data");
    let repository =
        Arc::new(CardRepository::from_data_dir(data_dir).expect("bundled data should load"));
    QueryOrchestrator::new(repository, AppMetrics::shared())
}

fn ask(engine: &QueryOrchestrator, text: &str) -> EngineReply {
    engine.handle_query(QueryInput {
        text: text.to_string(),
        prior_entities: None,
    })
}

#[test]
fn shorthand_amounts_survive_the_whole_pipeline() {
    let engine = engine();
    let reply = ask(
        &engine,
        "how many points do I earn if I spend 2.5L on groceries with icici?",
    );

    assert_eq!(reply.entities.amount, Some(Decimal::from(250_000)));
    let computation = reply.computation.expect("computation should run");
    // 250000 / 200 * 6 = 7500, clamped by the 1000-point grocery cap
    assert_eq!(computation.rewards[0].earned_units, Decimal::from(1_000));
    assert!(computation.rewards[0].applied_cap);
}

#[test]
fn earning_is_non_decreasing_in_amount() {
    let engine = engine();
    let mut previous = Decimal::ZERO;

    for amount in [50_000, 150_000, 200_000, 250_000, 400_000] {
        let reply = ask(
            &engine,
            &format!("miles earned for {amount} travel spend on atlas"),
        );
        let units = reply.computation.expect("computation should run").rewards[0].earned_units;
        assert!(
            units >= previous,
            "earning dropped from {previous} to {units} at amount {amount}"
        );
        previous = units;
    }
}

#[test]
fn exclusions_hold_regardless_of_magnitude() {
    let engine = engine();
    let reply = ask(&engine, "if I spend 1cr on rent with atlas");

    assert_eq!(reply.entities.amount, Some(Decimal::from(10_000_000)));
    let computation = reply.computation.expect("computation should run");
    assert_eq!(computation.rewards[0].earned_units, Decimal::ZERO);
    assert!(computation.rewards[0].applied_exclusion);
}

#[test]
fn regular_points_and_milestones_report_together() {
    let engine = engine();
    let reply = ask(&engine, "what do I get if I spend 8L on icici epm?");

    let computation = reply.computation.expect("computation should run");
    assert_eq!(computation.rewards[0].earned_units, Decimal::from(24_000));

    let milestone_value: Decimal = computation.rewards[0]
        .milestones
        .iter()
        .map(|m| m.value)
        .sum();
    assert_eq!(milestone_value, Decimal::from(6_000));
}

#[test]
fn redemption_comparison_settles_in_currency_not_points() {
    let engine = engine();
    let reply = ask(&engine, "which card gives better value if I redeem 10000 points?");

    // "redeem" outranks the comparison keywords, but both cards are still in
    // play via the dual-card phrasing.
    assert_eq!(reply.intent, Intent::RedemptionQuery);
    let computation = reply.computation.expect("computation should run");
    assert_eq!(computation.redemptions.len(), 2);
    // Atlas best channel: partner transfer at ₹2/mile = 20000;
    // EPM best channel: travel portal at ₹1/point = 10000.
    assert_eq!(computation.winner.as_deref(), Some("axis-atlas"));
    assert_eq!(computation.margin, Some(Decimal::from(10_000)));
}

#[test]
fn identical_cards_tie_with_no_winner() {
    fn clone_with_id(id: &str, alias: &str) -> Card {
        Card {
            id: id.to_string(),
            display_name: id.to_string(),
            aliases: vec![alias.to_string()],
            reward_currency: "points".to_string(),
            rate_general: Some(EarnRate {
                points: Decimal::from(2),
                per_spend: Decimal::from(100),
            }),
            rate_tiers: Vec::new(),
            accrual_exclusions: Default::default(),
            category_caps: Default::default(),
            value_per_point: Default::default(),
            milestones: Vec::new(),
            extra: Default::default(),
        }
    }

    let repository = Arc::new(
        CardRepository::from_cards(vec![
            clone_with_id("card-alpha", "alpha"),
            clone_with_id("card-beta", "beta"),
        ])
        .expect("synthetic cards should validate"),
    );
    let engine = QueryOrchestrator::new(repository, AppMetrics::shared());

    let reply = ask(&engine, "which card is better if I spend 50000 on dining?");
    let computation = reply.computation.expect("computation should run");
    assert_eq!(computation.winner, None);
    assert_eq!(computation.margin, Some(Decimal::ZERO));
}

#[test]
fn clarification_flow_recovers_on_the_next_turn() {
    let engine = engine();

    let first = ask(&engine, "how many miles will I earn on atlas?");
    assert!(first.clarification.is_some());
    assert!(first.computation.is_none());

    let second = engine.handle_query(QueryInput {
        text: "around 2L on flights".to_string(),
        prior_entities: Some(first.entities.clone()),
    });

    let computation = second.computation.expect("follow-up should compute");
    assert_eq!(computation.rewards[0].card_id, "axis-atlas");
    assert_eq!(computation.rewards[0].earned_units, Decimal::from(10_000));
}
