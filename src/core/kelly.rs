//! Win-bet stakes from a model probability and the posted odds
//!
//! A stake is the full Kelly fraction `(b*p - q) / b` (with `b = odds - 1` and
//! odds quoted decimal, 6.0 being "5-1") scaled by the configured multiplier,
//! then held under `max_bet_percent * bankroll`, raised to the minimum bet and
//! rounded to whole units without crossing the cap again.
//!
//! Sizing never fails. Invalid probabilities, odds, bankrolls, caps or edge
//! floors, underlays and tiny edges all come back as a `KellyResult` with
//! `should_bet == false` and a reason.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{KellyFraction, KellySettings};
use crate::error::{
    validate_bankroll, validate_max_bet_percent, validate_min_edge, validate_odds,
    validate_probability, EngineError,
};

/// Advisory, non-fatal notes attached to a sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KellyWarning {
    /// Full Kelly asks for more than the aggressiveness threshold
    AggressiveKelly { full_fraction: f64 },
    /// Positive but thin edge
    MarginalEdge { edge_percent: f64 },
    /// The max-bet cap bound the stake
    BetCapped { cap: f64 },
}

impl KellyWarning {
    pub fn message(&self) -> String {
        match self {
            KellyWarning::AggressiveKelly { full_fraction } => format!(
                "full Kelly suggests {:.1}% of bankroll; estimate may be overconfident",
                full_fraction * 100.0
            ),
            KellyWarning::MarginalEdge { edge_percent } => {
                format!("edge of {:.1}% is marginal", edge_percent)
            }
            KellyWarning::BetCapped { cap } => format!("bet capped at ${:.0}", cap),
        }
    }
}

/// Immutable sizing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyInput {
    pub probability: f64,
    pub decimal_odds: f64,
    pub bankroll: f64,
    pub fraction: KellyFraction,
    pub max_bet_percent: f64,
    pub min_edge_required: f64,
    pub min_bet: f64,
    pub aggressive_threshold: f64,
    pub marginal_edge_threshold: f64,
}

impl KellyInput {
    pub fn new(
        probability: f64,
        decimal_odds: f64,
        bankroll: f64,
        settings: &KellySettings,
    ) -> Self {
        Self {
            probability,
            decimal_odds,
            bankroll,
            fraction: settings.fraction,
            max_bet_percent: settings.max_bet_percent,
            min_edge_required: settings.min_edge_required,
            min_bet: settings.min_bet,
            aggressive_threshold: settings.aggressive_threshold,
            marginal_edge_threshold: settings.marginal_edge_threshold,
        }
    }
}

/// Bet sizing recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyResult {
    pub probability: f64,
    pub decimal_odds: f64,
    /// Full Kelly (can be negative for underlays)
    pub full_kelly_fraction: f64,
    /// Fraction of bankroll actually staked after multiplier, cap, floor and rounding
    pub adjusted_fraction: f64,
    pub optimal_bet_size: f64,
    /// (b*p - q) * 100
    pub edge_percent: f64,
    pub implied_probability: f64,
    pub overlay_percent: f64,
    pub should_bet: bool,
    pub was_capped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub warnings: Vec<KellyWarning>,
    /// Expected log growth per bet at the adjusted fraction (diagnostic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_growth: Option<f64>,
}

impl KellyResult {
    fn refused(input: &KellyInput, reason: EngineError) -> Self {
        debug!(
            probability = input.probability,
            odds = input.decimal_odds,
            %reason,
            "kelly refused"
        );
        Self {
            probability: input.probability,
            decimal_odds: input.decimal_odds,
            full_kelly_fraction: 0.0,
            adjusted_fraction: 0.0,
            optimal_bet_size: 0.0,
            edge_percent: 0.0,
            implied_probability: 0.0,
            overlay_percent: 0.0,
            should_bet: false,
            was_capped: false,
            reason: Some(reason.to_string()),
            warnings: Vec::new(),
            expected_growth: None,
        }
    }

    /// Refusal that still reports the edge metrics that were computed
    fn refused_with_metrics(
        input: &KellyInput,
        reason: EngineError,
        full_kelly: f64,
        edge_percent: f64,
        implied: f64,
        overlay_percent: f64,
    ) -> Self {
        Self {
            full_kelly_fraction: full_kelly,
            edge_percent,
            implied_probability: implied,
            overlay_percent,
            ..Self::refused(input, reason)
        }
    }
}

/// Calculate Kelly fraction for a single bet
///
/// # Arguments
/// * `probability` - Estimated probability of winning (0-1)
/// * `odds` - Decimal odds (e.g., 6.0 = 5-1)
///
/// # Returns
/// Kelly fraction (can be negative if the bet is an underlay)
///
/// # Examples
/// ```
/// use parimutuel::core::kelly::calculate_kelly_fraction;
/// let kelly = calculate_kelly_fraction(0.25, 6.0);
/// assert!((kelly - 0.10).abs() < 0.0001);
/// ```
pub fn calculate_kelly_fraction(probability: f64, odds: f64) -> f64 {
    if odds <= 1.0 {
        return 0.0;
    }

    let b = odds - 1.0;
    let q = 1.0 - probability;
    (b * probability - q) / b
}

/// Expected log growth `p*ln(1+b*f) + q*ln(1-f)` for a bankroll fraction `f`
pub fn expected_log_growth(probability: f64, odds: f64, fraction: f64) -> Option<f64> {
    if !(0.0..1.0).contains(&fraction) || odds <= 1.0 {
        return None;
    }
    let b = odds - 1.0;
    let q = 1.0 - probability;
    Some(probability * (1.0 + b * fraction).ln() + q * (1.0 - fraction).ln())
}

/// Size a single bet with the default floor and warning thresholds
pub fn size(
    probability: f64,
    decimal_odds: f64,
    bankroll: f64,
    fraction: KellyFraction,
    max_bet_percent: f64,
    min_edge_required: f64,
) -> KellyResult {
    let settings = KellySettings {
        fraction,
        max_bet_percent,
        min_edge_required,
        ..KellySettings::default()
    };
    size_input(&KellyInput::new(
        probability,
        decimal_odds,
        bankroll,
        &settings,
    ))
}

/// Size a single bet from a full input
pub fn size_input(input: &KellyInput) -> KellyResult {
    let checks = validate_probability(input.probability)
        .and_then(|_| validate_odds(input.decimal_odds))
        .and_then(|_| validate_bankroll(input.bankroll))
        .and_then(|_| validate_max_bet_percent(input.max_bet_percent))
        .and_then(|_| validate_min_edge(input.min_edge_required));
    if let Err(e) = checks {
        return KellyResult::refused(input, e);
    }

    let p = input.probability;
    let b = input.decimal_odds - 1.0;
    let q = 1.0 - p;
    let edge = b * p - q;
    let full_kelly = edge / b;

    let edge_percent = edge * 100.0;
    let implied = 1.0 / input.decimal_odds;
    let overlay_percent = (p - implied) / implied * 100.0;

    let refuse = |reason: EngineError| {
        KellyResult::refused_with_metrics(
            input,
            reason,
            full_kelly,
            edge_percent,
            implied,
            overlay_percent,
        )
    };

    if full_kelly <= 0.0 {
        return refuse(EngineError::NegativeEdge);
    }

    if edge < input.min_edge_required {
        return refuse(EngineError::EdgeTooSmall);
    }

    let cap = input.max_bet_percent * input.bankroll;
    if input.bankroll < input.min_bet || cap < input.min_bet {
        return refuse(EngineError::BankrollTooSmall);
    }

    let raw = full_kelly * input.fraction.multiplier() * input.bankroll;

    let mut bet = raw;
    let mut was_capped = false;
    if bet > cap {
        bet = cap;
        was_capped = true;
    }
    if bet < input.min_bet {
        bet = input.min_bet;
    }

    // Whole currency units, never above the cap
    bet = bet.round();
    if bet > cap {
        bet = cap.floor();
    }

    let mut warnings = Vec::new();
    if full_kelly > input.aggressive_threshold {
        warnings.push(KellyWarning::AggressiveKelly {
            full_fraction: full_kelly,
        });
    }
    if edge < input.marginal_edge_threshold {
        warnings.push(KellyWarning::MarginalEdge { edge_percent });
    }
    if was_capped {
        warnings.push(KellyWarning::BetCapped { cap });
    }

    let adjusted_fraction = bet / input.bankroll;

    KellyResult {
        probability: p,
        decimal_odds: input.decimal_odds,
        full_kelly_fraction: full_kelly,
        adjusted_fraction,
        optimal_bet_size: bet,
        edge_percent,
        implied_probability: implied,
        overlay_percent,
        should_bet: true,
        was_capped,
        reason: None,
        warnings,
        expected_growth: expected_log_growth(p, input.decimal_odds, adjusted_fraction),
    }
}

/// Independent sizing of several bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyBatch {
    pub results: Vec<KellyResult>,
    /// Sum of accepted bet sizes
    pub total_bet: f64,
    /// Total as a fraction of bankroll
    pub exposure_fraction: f64,
    /// Total exceeds the configured exposure limit (advisory only)
    pub over_exposed: bool,
}

/// Sizes stakes against one set of [`KellySettings`]
///
/// Refuses underlays and edges under `min_edge_required`, and refuses outright
/// when the cap leaves no room for the minimum bet.
#[derive(Debug, Clone, Default)]
pub struct KellySizer {
    pub settings: KellySettings,
}

impl KellySizer {
    pub fn new(settings: KellySettings) -> Self {
        Self { settings }
    }

    /// Calculate bet sizing for a single bet
    pub fn size(&self, probability: f64, decimal_odds: f64, bankroll: f64) -> KellyResult {
        size_input(&KellyInput::new(
            probability,
            decimal_odds,
            bankroll,
            &self.settings,
        ))
    }

    /// Calculate bet sizing for multiple bets
    ///
    /// Each bet is sized on its own against the full bankroll; there is no
    /// covariance or rescaling between them.
    pub fn size_batch(&self, bets: &[(f64, f64)], bankroll: f64) -> KellyBatch {
        let results: Vec<KellyResult> = bets
            .iter()
            .map(|(p, o)| self.size(*p, *o, bankroll))
            .collect();

        let total_bet: f64 = results
            .iter()
            .filter(|r| r.should_bet)
            .map(|r| r.optimal_bet_size)
            .sum();

        let exposure_fraction = if bankroll > 0.0 && bankroll.is_finite() {
            total_bet / bankroll
        } else {
            0.0
        };

        KellyBatch {
            results,
            total_bet,
            exposure_fraction,
            over_exposed: exposure_fraction > self.settings.max_total_exposure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelly_fraction_positive_edge() {
        // b = 5, edge = 5 * 0.25 - 0.75 = 0.5
        let kelly = calculate_kelly_fraction(0.25, 6.0);
        assert!((kelly - 0.10).abs() < 0.0001);
    }

    #[test]
    fn test_kelly_fraction_negative_edge() {
        let kelly = calculate_kelly_fraction(0.10, 5.0);
        assert!(kelly < 0.0);
    }

    #[test]
    fn test_kelly_fraction_even_odds() {
        assert_eq!(calculate_kelly_fraction(0.25, 1.0), 0.0);
    }

    #[test]
    fn test_full_kelly_reference_case() {
        let result = size(0.25, 6.0, 1000.0, KellyFraction::Full, 0.2, 0.05);
        assert!(result.should_bet);
        assert!((result.full_kelly_fraction - 0.10).abs() < 1e-9);
        assert_eq!(result.optimal_bet_size, 100.0);
        assert!(!result.was_capped);
        assert!((result.edge_percent - 50.0).abs() < 1e-9);
        assert!((result.overlay_percent - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_quarter_kelly_reference_case() {
        let result = size(0.25, 6.0, 1000.0, KellyFraction::Quarter, 0.2, 0.05);
        assert!(result.should_bet);
        assert_eq!(result.optimal_bet_size, 25.0);
        assert!((result.adjusted_fraction - 0.025).abs() < 1e-9);
    }

    #[test]
    fn test_underlay_refused() {
        let result = size(0.15, 6.0, 1000.0, KellyFraction::Quarter, 0.1, 0.05);
        assert!(!result.should_bet);
        assert_eq!(result.optimal_bet_size, 0.0);
        assert_eq!(result.reason.as_deref(), Some("negative edge / underlay"));
        assert!(result.full_kelly_fraction < 0.0);
        assert!((result.implied_probability - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_edge_refused() {
        // edge = 5 * 0.17 - 0.83 = 0.02
        let result = size(0.17, 6.0, 1000.0, KellyFraction::Full, 0.2, 0.05);
        assert!(result.full_kelly_fraction > 0.0);
        assert!(!result.should_bet);
        assert_eq!(result.reason.as_deref(), Some("edge too small"));
    }

    #[test]
    fn test_invalid_inputs_degrade() {
        for (p, o, bank) in [
            (0.0, 6.0, 1000.0),
            (1.0, 6.0, 1000.0),
            (f64::NAN, 6.0, 1000.0),
            (0.3, 1.0, 1000.0),
            (0.3, 6.0, -10.0),
        ] {
            let result = size(p, o, bank, KellyFraction::Full, 0.2, 0.05);
            assert!(!result.should_bet);
            assert_eq!(result.optimal_bet_size, 0.0);
            assert!(result.reason.is_some());
        }
    }

    #[test]
    fn test_bad_cap_refused() {
        let result = size(0.4, 10.0, 1000.0, KellyFraction::Full, f64::NAN, 0.05);
        assert!(!result.should_bet);
        assert_eq!(result.optimal_bet_size, 0.0);

        let result = size(0.4, 10.0, 1000.0, KellyFraction::Full, -0.1, 0.05);
        assert!(!result.should_bet);
        assert_eq!(
            result.reason,
            Some(EngineError::InvalidMaxBetPercent(-0.1).to_string())
        );

        let result = size(0.4, 10.0, 1000.0, KellyFraction::Full, 1.5, 0.05);
        assert!(!result.should_bet);
    }

    #[test]
    fn test_bad_min_edge_refused() {
        // edge = 5 * 0.17 - 0.83 = 0.02, would pass a NaN comparison
        let result = size(0.17, 6.0, 1000.0, KellyFraction::Full, 0.2, f64::NAN);
        assert!(!result.should_bet);
        assert_eq!(result.optimal_bet_size, 0.0);
        assert!(result.reason.unwrap().starts_with("invalid minimum edge"));

        let result = size(0.25, 6.0, 1000.0, KellyFraction::Full, 0.2, -0.05);
        assert!(!result.should_bet);
    }

    #[test]
    fn test_bankroll_too_small() {
        let result = size(0.25, 6.0, 1.5, KellyFraction::Full, 0.2, 0.05);
        assert!(!result.should_bet);
        assert_eq!(result.reason.as_deref(), Some("bankroll too small"));
    }

    #[test]
    fn test_cap_applied() {
        // full kelly = (9 * 0.4 - 0.6) / 9 = 0.333
        let result = size(0.4, 10.0, 1000.0, KellyFraction::Full, 0.1, 0.05);
        assert!(result.should_bet);
        assert!(result.was_capped);
        assert_eq!(result.optimal_bet_size, 100.0);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, KellyWarning::BetCapped { .. })));
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, KellyWarning::AggressiveKelly { .. })));
    }

    #[test]
    fn test_min_bet_floor() {
        // eighth kelly of 0.10 on $100 = $1.25, floored to the $2 minimum
        let result = size(0.25, 6.0, 100.0, KellyFraction::Eighth, 0.2, 0.05);
        assert!(result.should_bet);
        assert_eq!(result.optimal_bet_size, 2.0);
    }

    #[test]
    fn test_marginal_edge_warning() {
        // edge = 5 * 0.18 - 0.82 = 0.08
        let result = size(0.18, 6.0, 1000.0, KellyFraction::Full, 0.2, 0.05);
        assert!(result.should_bet);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, KellyWarning::MarginalEdge { .. })));
    }

    #[test]
    fn test_monotone_in_probability() {
        let mut previous = 0.0;
        for step in 1..99 {
            let p = step as f64 / 100.0;
            let result = size(p, 6.0, 1000.0, KellyFraction::Half, 0.15, 0.05);
            assert!(result.optimal_bet_size >= previous, "p = {}", p);
            assert!(result.optimal_bet_size <= 150.0);
            previous = result.optimal_bet_size;
        }
    }

    #[test]
    fn test_expected_growth_positive_for_fractional_kelly() {
        let result = size(0.25, 6.0, 1000.0, KellyFraction::Quarter, 0.2, 0.05);
        let growth = result.expected_growth.unwrap();
        assert!(growth > 0.0);
    }

    #[test]
    fn test_idempotent() {
        let a = size(0.3, 4.5, 800.0, KellyFraction::Half, 0.1, 0.05);
        let b = size(0.3, 4.5, 800.0, KellyFraction::Half, 0.1, 0.05);
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_sums_accepted_only() {
        let sizer = KellySizer::new(KellySettings {
            fraction: KellyFraction::Full,
            max_bet_percent: 0.2,
            ..KellySettings::default()
        });
        let batch = sizer.size_batch(&[(0.25, 6.0), (0.15, 6.0), (0.25, 6.0)], 1000.0);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.total_bet, 200.0);
        assert!((batch.exposure_fraction - 0.2).abs() < 1e-9);
        assert!(!batch.over_exposed);
    }

    #[test]
    fn test_batch_over_exposed() {
        let sizer = KellySizer::new(KellySettings {
            fraction: KellyFraction::Full,
            max_bet_percent: 0.2,
            max_total_exposure: 0.3,
            ..KellySettings::default()
        });
        let batch = sizer.size_batch(&[(0.25, 6.0); 4], 1000.0);
        assert_eq!(batch.total_bet, 400.0);
        assert!(batch.over_exposed);
    }

    #[test]
    fn test_batch_empty() {
        let sizer = KellySizer::default();
        let batch = sizer.size_batch(&[], 1000.0);
        assert!(batch.results.is_empty());
        assert_eq!(batch.total_bet, 0.0);
    }
}
