use serde::{Deserialize, Serialize};

use crate::config::{KellySettings, RiskStyle};

/// Value tier assigned from the scorer's confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    One,
    Two,
    Three,
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            3 => Ok(Tier::Three),
            other => Err(format!("tier must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.number()
    }
}

impl Tier {
    pub fn number(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::One => "Top contenders",
            Tier::Two => "Value contenders",
            Tier::Three => "Longshots",
        }
    }

    pub fn all() -> [Tier; 3] {
        [Tier::One, Tier::Two, Tier::Three]
    }

    fn index(self) -> usize {
        (self.number() - 1) as usize
    }

    /// Pick this tier's entry out of a per-tier table
    pub fn pick<T: Copy>(self, table: [T; 3]) -> T {
        table[self.index()]
    }
}

/// Scored horse supplied by the external scoring collaborator
///
/// On input `decimal_odds` may be left out, in which case it is read from
/// `odds_display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HorseRecord")]
pub struct HorseCandidate {
    pub program_number: u8,
    pub name: String,
    /// Posted odds as shown on the tote board, e.g. "5-1"
    pub odds_display: String,
    pub decimal_odds: f64,
    /// Model-estimated win probability (0-1)
    pub win_probability: f64,
    /// Confidence score (0-100)
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub scratched: bool,
}

impl HorseCandidate {
    pub fn new(
        program_number: u8,
        name: &str,
        decimal_odds: f64,
        win_probability: f64,
        score: f64,
    ) -> Self {
        Self {
            program_number,
            name: name.to_string(),
            odds_display: format_odds_display(decimal_odds),
            decimal_odds,
            win_probability,
            score,
            tier: None,
            scratched: false,
        }
    }

    pub fn scratched(mut self) -> Self {
        self.scratched = true;
        self
    }

    /// Probability implied by the posted odds (0.0 when odds are unusable)
    pub fn implied_probability(&self) -> f64 {
        if self.decimal_odds > 1.0 && self.decimal_odds.is_finite() {
            1.0 / self.decimal_odds
        } else {
            0.0
        }
    }

    /// Expected profit per unit staked: b*p - q
    pub fn edge(&self) -> f64 {
        let b = self.decimal_odds - 1.0;
        b * self.win_probability - (1.0 - self.win_probability)
    }

    pub fn edge_percent(&self) -> f64 {
        self.edge() * 100.0
    }

    pub fn overlay_percent(&self) -> f64 {
        let implied = self.implied_probability();
        if implied <= 0.0 {
            return 0.0;
        }
        (self.win_probability - implied) / implied * 100.0
    }

    pub fn is_longshot(&self, longshot_odds: f64) -> bool {
        self.decimal_odds >= longshot_odds
    }
}

/// Wire shape of a horse, before odds are settled
#[derive(Deserialize)]
struct HorseRecord {
    program_number: u8,
    #[serde(default)]
    name: String,
    #[serde(default)]
    odds_display: String,
    #[serde(default)]
    decimal_odds: Option<f64>,
    win_probability: f64,
    score: f64,
    #[serde(default)]
    tier: Option<Tier>,
    #[serde(default)]
    scratched: bool,
}

impl TryFrom<HorseRecord> for HorseCandidate {
    type Error = String;

    fn try_from(record: HorseRecord) -> Result<Self, Self::Error> {
        let decimal_odds = match record.decimal_odds {
            Some(odds) => odds,
            None => parse_odds_display(&record.odds_display).ok_or_else(|| {
                format!(
                    "horse {}: no decimal_odds and unreadable odds_display {:?}",
                    record.program_number, record.odds_display
                )
            })?,
        };
        let odds_display = if record.odds_display.is_empty() {
            format_odds_display(decimal_odds)
        } else {
            record.odds_display
        };

        Ok(Self {
            program_number: record.program_number,
            name: record.name,
            odds_display,
            decimal_odds,
            win_probability: record.win_probability,
            score: record.score,
            tier: record.tier,
            scratched: record.scratched,
        })
    }
}

/// Parse tote-board odds ("5-1", "5/2", "EVEN", "9-5") into decimal odds
pub fn parse_odds_display(display: &str) -> Option<f64> {
    let trimmed = display.trim();
    if trimmed.eq_ignore_ascii_case("even") || trimmed.eq_ignore_ascii_case("evn") {
        return Some(2.0);
    }

    let parts: Vec<&str> = trimmed.split(['-', '/', ':']).collect();
    if parts.len() != 2 {
        return None;
    }

    let num = parts[0].trim().parse::<f64>().ok()?;
    let den = parts[1].trim().parse::<f64>().ok()?;
    if num < 0.0 || den <= 0.0 {
        return None;
    }

    Some(num / den + 1.0)
}

/// Render decimal odds back to "N-1" style (or "N/2" for halves)
pub fn format_odds_display(decimal_odds: f64) -> String {
    let fractional = decimal_odds - 1.0;
    if fractional <= 0.0 || !fractional.is_finite() {
        return "-".to_string();
    }
    if (fractional - 1.0).abs() < 1e-9 {
        return "EVEN".to_string();
    }
    let doubled = fractional * 2.0;
    if (fractional - fractional.round()).abs() < 1e-9 {
        format!("{}-1", fractional.round() as i64)
    } else if (doubled - doubled.round()).abs() < 1e-9 {
        format!("{}/2", doubled.round() as i64)
    } else {
        format!("{:.1}-1", fractional)
    }
}

/// Verdict from the external value-analysis collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Bet,
    Caution,
    Pass,
}

/// The race's headline overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePlay {
    pub program_number: u8,
    pub edge_percent: f64,
}

/// Per-race value signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAnalysis {
    pub has_value_play: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ValuePlay>,
    pub verdict: Verdict,
}

impl ValueAnalysis {
    /// Derive a value analysis from the horses alone, using the best positive edge
    ///
    /// Used when no analysis collaborator supplied one.
    pub fn derive(horses: &[HorseCandidate], min_edge_percent: f64) -> Self {
        let best = horses
            .iter()
            .filter(|h| !h.scratched && h.decimal_odds > 1.0)
            .map(|h| (h.program_number, h.edge_percent()))
            .filter(|(_, edge)| edge.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));

        match best {
            Some((program_number, edge_percent)) if edge_percent > 0.0 => {
                let verdict = if edge_percent >= min_edge_percent {
                    Verdict::Bet
                } else {
                    Verdict::Caution
                };
                Self {
                    has_value_play: edge_percent >= min_edge_percent,
                    primary: Some(ValuePlay {
                        program_number,
                        edge_percent,
                    }),
                    verdict,
                }
            }
            _ => Self {
                has_value_play: false,
                primary: None,
                verdict: Verdict::Pass,
            },
        }
    }
}

/// One race on the card with its scored field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceAnalysis {
    pub race_number: u8,
    pub horses: Vec<HorseCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueAnalysis>,
}

impl RaceAnalysis {
    pub fn starters(&self) -> impl Iterator<Item = &HorseCandidate> {
        self.horses.iter().filter(|h| !h.scratched)
    }

    pub fn starter_count(&self) -> usize {
        self.starters().count()
    }

    /// Starters ordered best-first by win probability (program number breaks ties)
    pub fn ranked_starters(&self) -> Vec<&HorseCandidate> {
        let mut ranked: Vec<&HorseCandidate> = self.starters().collect();
        ranked.sort_by(|a, b| {
            b.win_probability
                .total_cmp(&a.win_probability)
                .then(a.program_number.cmp(&b.program_number))
        });
        ranked
    }

    pub fn horse(&self, program_number: u8) -> Option<&HorseCandidate> {
        self.horses.iter().find(|h| h.program_number == program_number)
    }

    /// The supplied value analysis, or one derived from the field
    pub fn value_analysis(&self, min_edge_percent: f64) -> ValueAnalysis {
        self.value
            .clone()
            .unwrap_or_else(|| ValueAnalysis::derive(&self.horses, min_edge_percent))
    }
}

/// A day's card, races in running order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RaceCard {
    #[serde(default)]
    pub track: Option<String>,
    pub races: Vec<RaceAnalysis>,
}

impl RaceCard {
    pub fn race(&self, race_number: u8) -> Option<&RaceAnalysis> {
        self.races.iter().find(|r| r.race_number == race_number)
    }
}

/// Bankroll and budget state from the session collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollState {
    pub current_bankroll: f64,
    pub daily_budget: f64,
    #[serde(default)]
    pub committed_today: f64,
    #[serde(default)]
    pub risk_tolerance: RiskStyle,
    #[serde(default)]
    pub kelly: KellySettings,
}

impl BankrollState {
    /// What is left to spend today, never more than the bankroll itself
    pub fn available_budget(&self) -> f64 {
        let remaining = (self.daily_budget - self.committed_today).max(0.0);
        remaining.min(self.current_bankroll.max(0.0))
    }
}

/// Estimated payout range. Always a heuristic, never a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ReturnRange {
    pub low: f64,
    pub high: f64,
}

impl ReturnRange {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            low: round_cents(a.min(b)),
            high: round_cents(a.max(b)),
        }
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.low * factor, self.high * factor)
    }

    pub fn add(self, other: ReturnRange) -> Self {
        Self::new(self.low + other.low, self.high + other.high)
    }
}

/// Round a currency amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horse(no: u8, odds: f64, prob: f64) -> HorseCandidate {
        HorseCandidate::new(no, &format!("Horse {}", no), odds, prob, 70.0)
    }

    #[test]
    fn test_parse_odds_display() {
        assert_eq!(parse_odds_display("5-1"), Some(6.0));
        assert_eq!(parse_odds_display("5/2"), Some(3.5));
        assert_eq!(parse_odds_display("EVEN"), Some(2.0));
        assert!((parse_odds_display("9-5").unwrap() - 2.8).abs() < 1e-9);
        assert_eq!(parse_odds_display("abc"), None);
        assert_eq!(parse_odds_display("5-0"), None);
    }

    #[test]
    fn test_horse_odds_from_display_only() {
        let h: HorseCandidate = serde_json::from_str(
            r#"{"program_number": 4, "name": "Pacer", "odds_display": "5/2", "win_probability": 0.3, "score": 72}"#,
        )
        .unwrap();
        assert_eq!(h.decimal_odds, 3.5);
        assert_eq!(h.odds_display, "5/2");

        let h: HorseCandidate = serde_json::from_str(
            r#"{"program_number": 5, "decimal_odds": 6.0, "win_probability": 0.2, "score": 60}"#,
        )
        .unwrap();
        assert_eq!(h.odds_display, "5-1");

        let bad = serde_json::from_str::<HorseCandidate>(
            r#"{"program_number": 6, "odds_display": "n/a", "win_probability": 0.2, "score": 60}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_format_odds_display() {
        assert_eq!(format_odds_display(6.0), "5-1");
        assert_eq!(format_odds_display(3.5), "5/2");
        assert_eq!(format_odds_display(2.0), "EVEN");
        assert_eq!(format_odds_display(1.0), "-");
    }

    #[test]
    fn test_edge_and_overlay() {
        let h = horse(1, 6.0, 0.25);
        assert!((h.edge() - 0.5).abs() < 1e-9);
        assert!((h.implied_probability() - 1.0 / 6.0).abs() < 1e-9);
        assert!((h.overlay_percent() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_value_analysis_derive_picks_best_edge() {
        let horses = vec![horse(1, 3.0, 0.30), horse(2, 8.0, 0.20), horse(3, 5.0, 0.10)];
        let analysis = ValueAnalysis::derive(&horses, 10.0);
        assert!(analysis.has_value_play);
        assert_eq!(analysis.verdict, Verdict::Bet);
        let primary = analysis.primary.unwrap();
        assert_eq!(primary.program_number, 2);
        assert!((primary.edge_percent - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_value_analysis_derive_no_edge() {
        let horses = vec![horse(1, 2.0, 0.30), horse(2, 3.0, 0.20)];
        let analysis = ValueAnalysis::derive(&horses, 10.0);
        assert!(!analysis.has_value_play);
        assert_eq!(analysis.verdict, Verdict::Pass);
        assert!(analysis.primary.is_none());
    }

    #[test]
    fn test_ranked_starters_skip_scratches() {
        let race = RaceAnalysis {
            race_number: 1,
            horses: vec![
                horse(1, 4.0, 0.20),
                horse(2, 3.0, 0.35).scratched(),
                horse(3, 5.0, 0.25),
            ],
            value: None,
        };
        let ranked: Vec<u8> = race.ranked_starters().iter().map(|h| h.program_number).collect();
        assert_eq!(ranked, vec![3, 1]);
        assert_eq!(race.starter_count(), 2);
    }

    #[test]
    fn test_available_budget() {
        let state = BankrollState {
            current_bankroll: 500.0,
            daily_budget: 100.0,
            committed_today: 30.0,
            risk_tolerance: RiskStyle::Balanced,
            kelly: KellySettings::default(),
        };
        assert!((state.available_budget() - 70.0).abs() < 1e-9);

        let broke = BankrollState {
            current_bankroll: 20.0,
            ..state.clone()
        };
        assert!((broke.available_budget() - 20.0).abs() < 1e-9);

        let spent = BankrollState {
            committed_today: 150.0,
            ..state
        };
        assert_eq!(spent.available_budget(), 0.0);
    }

    #[test]
    fn test_tier_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Tier::Two).unwrap(), "2");
        let tier: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, Tier::Three);
        assert!(serde_json::from_str::<Tier>("4").is_err());
    }

    #[test]
    fn test_return_range_orders_bounds() {
        let range = ReturnRange::new(50.0, 10.0);
        assert_eq!(range.low, 10.0);
        assert_eq!(range.high, 50.0);
    }
}
