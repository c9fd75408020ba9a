//! End-to-end properties of the engine through its public API

use parimutuel::config::{KellyFraction, MultiRaceSettings, RiskStyle};
use parimutuel::core::combinatorics::{combinations, guarded_combinations, BetType, WagerKind};
use parimutuel::core::instruction::{render_instruction, InstructionParser};
use parimutuel::core::kelly::{size, KellySizer};
use parimutuel::models::ValuePlay;
use parimutuel::multirace::{
    build_best_tickets, build_tickets_for_bankroll, construct_ticket, find_opportunities,
    fit_to_budget, LegStrategy, Quality, SequenceType,
};
use parimutuel::{
    BankrollState, EngineConfig, HorseCandidate, KellySettings, RaceAnalysis, RaceCard,
    RecommendationGenerator, ValueAnalysis, Verdict,
};

fn horse(no: u8, odds: f64, prob: f64, score: f64) -> HorseCandidate {
    HorseCandidate::new(no, &format!("Runner {}", no), odds, prob, score)
}

fn race(number: u8, value: Option<(u8, f64, Verdict)>) -> RaceAnalysis {
    RaceAnalysis {
        race_number: number,
        horses: vec![
            horse(1, 2.5, 0.30, 85.0),
            horse(2, 4.0, 0.22, 74.0),
            horse(3, 6.0, 0.16, 66.0),
            horse(4, 7.0, 0.12, 58.0),
            horse(5, 9.0, 0.10, 50.0),
            horse(6, 14.0, 0.06, 35.0),
            horse(7, 20.0, 0.04, 20.0),
        ],
        value: value.map(|(program_number, edge_percent, verdict)| ValueAnalysis {
            has_value_play: true,
            primary: Some(ValuePlay {
                program_number,
                edge_percent,
            }),
            verdict,
        }),
    }
}

fn card() -> RaceCard {
    RaceCard {
        track: Some("Test Downs".to_string()),
        races: vec![
            race(1, None),
            race(2, Some((3, 35.0, Verdict::Bet))),
            race(3, None),
            race(4, Some((4, 18.0, Verdict::Caution))),
            race(5, Some((2, 28.0, Verdict::Bet))),
            race(6, None),
        ],
    }
}

#[test]
fn test_kelly_reference_cases() {
    let full = size(0.25, 6.0, 1000.0, KellyFraction::Full, 0.2, 0.05);
    assert!((full.full_kelly_fraction - 0.10).abs() < 0.0001);
    assert_eq!(full.optimal_bet_size, 100.0);

    let quarter = size(0.25, 6.0, 1000.0, KellyFraction::Quarter, 0.2, 0.05);
    assert_eq!(quarter.optimal_bet_size, 25.0);

    let refused = size(0.15, 6.0, 1000.0, KellyFraction::Quarter, 0.2, 0.05);
    assert!(!refused.should_bet);
    assert_eq!(refused.optimal_bet_size, 0.0);
}

#[test]
fn test_kelly_monotone_and_capped() {
    let sizer = KellySizer::new(KellySettings {
        fraction: KellyFraction::Full,
        ..KellySettings::default()
    });
    let mut previous = 0.0;
    for step in 1..99 {
        let p = step as f64 / 100.0;
        let result = sizer.size(p, 4.0, 500.0);
        assert!(result.optimal_bet_size >= previous, "p = {}", p);
        assert!(result.optimal_bet_size <= 0.10 * 500.0 + 1e-9, "p = {}", p);
        previous = result.optimal_bet_size;
    }
}

#[test]
fn test_kelly_invalid_inputs_never_bet() {
    let sizer = KellySizer::default();
    for (p, odds, bankroll) in [
        (f64::NAN, 5.0, 100.0),
        (0.0, 5.0, 100.0),
        (1.0, 5.0, 100.0),
        (0.3, 1.0, 100.0),
        (0.3, f64::INFINITY, 100.0),
        (0.3, 5.0, -10.0),
    ] {
        let result = sizer.size(p, odds, bankroll);
        assert!(!result.should_bet);
        assert!(result.reason.is_some());
    }
}

#[test]
fn test_combination_table() {
    let exacta_box = BetType::boxed(WagerKind::Exacta);
    assert_eq!(combinations(exacta_box, 4), Some(12));
    assert_eq!(combinations(exacta_box, 5), Some(20));
    assert_eq!(combinations(exacta_box, 6), Some(30));

    let trifecta_box = BetType::boxed(WagerKind::Trifecta);
    assert_eq!(combinations(trifecta_box, 5), Some(60));
    assert_eq!(combinations(trifecta_box, 6), Some(120));
    assert_eq!(combinations(BetType::boxed(WagerKind::Superfecta), 6), Some(360));

    assert_eq!(combinations(BetType::wheel(WagerKind::Exacta), 8), Some(7));
    assert_eq!(combinations(BetType::wheel(WagerKind::Trifecta), 8), Some(42));
    assert_eq!(combinations(BetType::wheel(WagerKind::Superfecta), 8), Some(210));
}

#[test]
fn test_field_size_guard() {
    assert!(guarded_combinations(BetType::boxed(WagerKind::Exacta), 6, 5).is_err());
    assert!(guarded_combinations(BetType::boxed(WagerKind::Trifecta), 5, 4).is_err());
    assert_eq!(
        guarded_combinations(BetType::boxed(WagerKind::Trifecta), 4, 4),
        Ok(24)
    );
}

#[test]
fn test_instruction_round_trip() {
    let parser = InstructionParser::new();
    let bet = BetType::key(WagerKind::Trifecta);
    let rendered = render_instruction(bet, &[3, 5, 7, 8], 1.0);
    assert_eq!(rendered, "$1 TRIFECTA KEY 3 WITH 5, 7, 8");
    let parsed = parser.parse(&rendered).unwrap();
    assert_eq!(parsed.horses, vec![3, 5, 7, 8]);
    assert_eq!(parsed.bet_type, bet);
}

#[test]
fn test_recommendations_from_json_card() {
    let json = serde_json::to_string(&card()).unwrap();
    let card: RaceCard = serde_json::from_str(&json).unwrap();
    let race = card.race(2).unwrap();

    let generator = RecommendationGenerator::new(EngineConfig::default(), 1000.0);
    let recs = generator.generate_race(race);
    assert_eq!(recs.race_number, Some(2));
    assert!(!recs.is_empty());

    let parser = InstructionParser::new();
    for bet in recs.all_bets() {
        assert!(bet.total_cost > 0.0);
        assert!(bet.potential_return.low <= bet.potential_return.high);
        let parsed = parser.parse(&bet.instruction).unwrap();
        assert_eq!(parsed.horses, bet.horses);
    }
}

#[test]
fn test_prime_beats_overlapping_good_of_same_type() {
    let card = card();
    let opportunities = find_opportunities(&card, &MultiRaceSettings::default()).unwrap();

    for bet_type in SequenceType::all() {
        let same: Vec<_> = opportunities
            .iter()
            .filter(|o| o.bet_type == bet_type)
            .collect();
        for (i, a) in same.iter().enumerate() {
            for b in &same[i + 1..] {
                assert!(
                    a.races.iter().all(|r| !b.races.contains(r)),
                    "{:?} windows overlap",
                    bet_type
                );
            }
        }
    }

    // Pick 3 over races 1-3 is GOOD, 2-4 onward are PRIME; only the earliest PRIME survives
    let pick3s: Vec<_> = opportunities
        .iter()
        .filter(|o| o.bet_type == SequenceType::Pick3)
        .collect();
    assert_eq!(pick3s.len(), 1);
    assert_eq!(pick3s[0].quality, Quality::Prime);
    assert_eq!(pick3s[0].races, vec![2, 3, 4]);
    assert!(opportunities.iter().all(|o| o.quality != Quality::Marginal));
}

#[test]
fn test_budget_fitting_invariants() {
    let card = card();
    let settings = MultiRaceSettings::default();
    let opportunities = find_opportunities(&card, &settings).unwrap();

    for style in [RiskStyle::Safe, RiskStyle::Balanced, RiskStyle::Aggressive] {
        for opp in &opportunities {
            let ticket = construct_ticket(opp, &card, style, &settings).unwrap();
            for budget in [0.0, 0.5, 5.0, 20.0, 1000.0] {
                let fitted = fit_to_budget(&ticket, budget, &settings);

                let product: u64 = fitted.legs.iter().map(|l| l.size() as u64).product();
                assert_eq!(fitted.total_combinations, product);
                let cost = product as f64 * fitted.cost_per_combination;
                assert!((fitted.total_cost - cost).abs() < 0.01);

                let spreads_exhausted = fitted
                    .legs
                    .iter()
                    .all(|l| l.strategy == LegStrategy::Single || l.size() == 1);
                assert!(fitted.total_cost <= budget || spreads_exhausted);
                assert_eq!(fitted.is_valid, fitted.total_cost <= budget);

                for (before, after) in ticket.legs.iter().zip(&fitted.legs) {
                    assert!(after.size() >= 1);
                    if before.strategy == LegStrategy::Single {
                        assert_eq!(after.size(), 1);
                        assert_eq!(before, after);
                    }
                }

                let total: usize = ticket.legs.iter().map(|l| l.size()).sum();
                assert!(fitted.trim_steps <= total);
            }
        }
    }
}

#[test]
fn test_spent_daily_budget_exhausts_spreads() {
    let state = BankrollState {
        current_bankroll: 1000.0,
        daily_budget: 100.0,
        committed_today: 100.0,
        risk_tolerance: RiskStyle::Balanced,
        kelly: KellySettings::default(),
    };
    assert_eq!(state.available_budget(), 0.0);

    let tickets =
        build_tickets_for_bankroll(&card(), &state, &MultiRaceSettings::default()).unwrap();
    assert!(!tickets.is_empty());
    for ticket in &tickets {
        assert!(!ticket.is_valid);
        assert!(ticket.legs.iter().all(|l| l.size() == 1));
        assert_eq!(ticket.total_combinations, 1);
    }
}

#[test]
fn test_kelly_rejects_bad_cap_and_edge_floor() {
    for (cap, min_edge) in [(f64::NAN, 0.05), (-0.1, 0.05), (0.2, f64::NAN), (0.2, -0.01)] {
        let result = size(0.4, 10.0, 1000.0, KellyFraction::Full, cap, min_edge);
        assert!(!result.should_bet, "cap {} min_edge {}", cap, min_edge);
        assert_eq!(result.optimal_bet_size, 0.0);
        assert!(result.reason.is_some());
    }
}

#[test]
fn test_card_with_display_odds_only() {
    let json = r#"{
        "races": [{
            "race_number": 1,
            "horses": [
                {"program_number": 1, "name": "A", "odds_display": "9-5", "win_probability": 0.35, "score": 80},
                {"program_number": 2, "name": "B", "odds_display": "7-2", "win_probability": 0.25, "score": 70},
                {"program_number": 3, "name": "C", "odds_display": "12-1", "win_probability": 0.10, "score": 40}
            ]
        }]
    }"#;
    let card: RaceCard = serde_json::from_str(json).unwrap();
    let odds: Vec<f64> = card.races[0].horses.iter().map(|h| h.decimal_odds).collect();
    assert!((odds[0] - 2.8).abs() < 1e-9);
    assert_eq!(odds[1], 4.5);
    assert_eq!(odds[2], 13.0);
}

#[test]
fn test_pipeline_is_deterministic() {
    let a = build_best_tickets(&card(), 25.0, RiskStyle::Balanced, &MultiRaceSettings::default());
    let b = build_best_tickets(&card(), 25.0, RiskStyle::Balanced, &MultiRaceSettings::default());
    assert_eq!(a, b);
    assert!(!a.unwrap().is_empty());
}

#[test]
fn test_config_from_partial_json() {
    let config =
        EngineConfig::from_json_str(r#"{"kelly": {"fraction": "half"}, "multi_race": {"expert_mode": true}}"#)
            .unwrap();
    assert_eq!(config.kelly.fraction, KellyFraction::Half);
    assert!(config.multi_race.expert_mode);
    assert_eq!(config.tiers.base_stakes, [10.0, 5.0, 2.0]);
}
