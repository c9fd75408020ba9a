//! Window instructions
//!
//! Renders bets in the phrasing a mutuel clerk expects, and parses that phrasing
//! back. The rendered strings are copied verbatim by collaborators, so the format
//! is stable:
//!
//! ```text
//! $10 TO WIN ON #3
//! $1 EXACTA 3-5
//! $1 EXACTA BOX 3, 5, 7
//! $1 TRIFECTA KEY 3 WITH 5, 7, 8
//! $1 TRIFECTA 3 WITH ALL WITH ALL
//! RACE 4, $0.10 SUPERFECTA BOX 1, 2, 3, 4
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::combinatorics::{BetType, Structure, WagerKind};

/// Format a dollar amount: whole dollars without cents, otherwise two decimals
pub fn format_money(amount: f64) -> String {
    let cents = (amount * 100.0).round();
    if cents % 100.0 == 0.0 {
        format!("${}", (cents / 100.0) as i64)
    } else {
        format!("${:.2}", cents / 100.0)
    }
}

fn join_horses(horses: &[u8], separator: &str) -> String {
    horses
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render a bet as a window instruction
///
/// For keys the first horse is the key; for wheels `horses` holds only the key
/// horses, in finishing-position order.
pub fn render_instruction(bet_type: BetType, horses: &[u8], unit_stake: f64) -> String {
    let money = format_money(unit_stake);
    let kind = bet_type.kind.window_name();

    match (bet_type.kind.positions(), bet_type.structure) {
        (1, _) => {
            let horse = horses.first().copied().unwrap_or_default();
            format!("{} TO {} ON #{}", money, kind, horse)
        }
        (_, Structure::Straight) => format!("{} {} {}", money, kind, join_horses(horses, "-")),
        (_, Structure::Box) => format!("{} {} BOX {}", money, kind, join_horses(horses, ", ")),
        (_, Structure::Key) => {
            let (key, rest) = horses.split_first().map_or((0, &[][..]), |(k, r)| (*k, r));
            format!(
                "{} {} KEY {} WITH {}",
                money,
                kind,
                key,
                join_horses(rest, ", ")
            )
        }
        (positions, Structure::Wheel { keys }) => {
            let mut parts: Vec<String> = horses.iter().take(keys).map(|h| h.to_string()).collect();
            for _ in keys..positions {
                parts.push("ALL".to_string());
            }
            format!("{} {} {}", money, kind, parts.join(" WITH "))
        }
    }
}

/// Render with a leading race number
pub fn render_race_instruction(
    race_number: u8,
    bet_type: BetType,
    horses: &[u8],
    unit_stake: f64,
) -> String {
    format!(
        "RACE {}, {}",
        race_number,
        render_instruction(bet_type, horses, unit_stake)
    )
}

/// A window instruction read back into its parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInstruction {
    pub race_number: Option<u8>,
    pub unit_stake: f64,
    pub bet_type: BetType,
    pub horses: Vec<u8>,
}

/// Parser for rendered window instructions
pub struct InstructionParser {
    single_pattern: Regex,
    exotic_pattern: Regex,
}

impl InstructionParser {
    pub fn new() -> Self {
        Self {
            single_pattern: Regex::new(
                r"^(?:RACE (\d+), )?\$(\d+(?:\.\d{2})?) TO (WIN|PLACE|SHOW) ON #(\d+)$",
            )
            .expect("single-race instruction pattern"),
            exotic_pattern: Regex::new(
                r"^(?:RACE (\d+), )?\$(\d+(?:\.\d{2})?) (EXACTA|QUINELLA|TRIFECTA|SUPERFECTA) (.+)$",
            )
            .expect("exotic instruction pattern"),
        }
    }

    pub fn parse(&self, instruction: &str) -> Option<ParsedInstruction> {
        let instruction = instruction.trim();

        if let Some(caps) = self.single_pattern.captures(instruction) {
            let race_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let unit_stake = caps[2].parse().ok()?;
            let kind = WagerKind::from_window_name(&caps[3])?;
            let horse = caps[4].parse().ok()?;
            return Some(ParsedInstruction {
                race_number,
                unit_stake,
                bet_type: BetType::straight(kind),
                horses: vec![horse],
            });
        }

        let caps = self.exotic_pattern.captures(instruction)?;
        let race_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let unit_stake = caps[2].parse().ok()?;
        let kind = WagerKind::from_window_name(&caps[3])?;
        let body = &caps[4];

        let (structure, horses) = if let Some(list) = body.strip_prefix("BOX ") {
            (Structure::Box, parse_list(list, ",")?)
        } else if let Some(rest) = body.strip_prefix("KEY ") {
            let (key, others) = rest.split_once(" WITH ")?;
            let mut horses = vec![key.trim().parse().ok()?];
            horses.extend(parse_list(others, ",")?);
            (Structure::Key, horses)
        } else if body.contains(" WITH ") {
            let parts: Vec<&str> = body.split(" WITH ").map(str::trim).collect();
            let keys: Vec<u8> = parts
                .iter()
                .take_while(|p| **p != "ALL")
                .map(|p| p.parse().ok())
                .collect::<Option<_>>()?;
            // ALL may only fill the trailing positions
            if parts[keys.len()..].iter().any(|p| *p != "ALL") || parts.len() != kind.positions() {
                return None;
            }
            (Structure::Wheel { keys: keys.len() }, keys)
        } else {
            (Structure::Straight, parse_list(body, "-")?)
        };

        let bet_type = BetType::new(kind, structure);
        if !bet_type.is_supported() {
            return None;
        }

        Some(ParsedInstruction {
            race_number,
            unit_stake,
            bet_type,
            horses,
        })
    }
}

impl Default for InstructionParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one instruction without keeping a parser around
pub fn parse_instruction(instruction: &str) -> Option<ParsedInstruction> {
    InstructionParser::new().parse(instruction)
}

fn parse_list(list: &str, separator: &str) -> Option<Vec<u8>> {
    list.split(separator)
        .map(|h| h.trim().parse::<u8>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(2.0), "$2");
        assert_eq!(format_money(0.1), "$0.10");
        assert_eq!(format_money(1.5), "$1.50");
        assert_eq!(format_money(12.000000000000002), "$12");
    }

    #[test]
    fn test_render_win_place_show() {
        assert_eq!(
            render_instruction(BetType::straight(WagerKind::Win), &[3], 10.0),
            "$10 TO WIN ON #3"
        );
        assert_eq!(
            render_instruction(BetType::straight(WagerKind::Show), &[8], 2.0),
            "$2 TO SHOW ON #8"
        );
    }

    #[test]
    fn test_render_exotics() {
        assert_eq!(
            render_instruction(BetType::straight(WagerKind::Exacta), &[3, 5], 1.0),
            "$1 EXACTA 3-5"
        );
        assert_eq!(
            render_instruction(BetType::boxed(WagerKind::Exacta), &[3, 5, 7], 1.0),
            "$1 EXACTA BOX 3, 5, 7"
        );
        assert_eq!(
            render_instruction(BetType::key(WagerKind::Trifecta), &[3, 5, 7, 8], 1.0),
            "$1 TRIFECTA KEY 3 WITH 5, 7, 8"
        );
        assert_eq!(
            render_instruction(BetType::boxed(WagerKind::Superfecta), &[1, 2, 3, 4], 0.10),
            "$0.10 SUPERFECTA BOX 1, 2, 3, 4"
        );
    }

    #[test]
    fn test_render_wheels_repeat_with_all() {
        assert_eq!(
            render_instruction(BetType::wheel(WagerKind::Exacta), &[4], 1.0),
            "$1 EXACTA 4 WITH ALL"
        );
        assert_eq!(
            render_instruction(BetType::wheel(WagerKind::Trifecta), &[3], 1.0),
            "$1 TRIFECTA 3 WITH ALL WITH ALL"
        );
        assert_eq!(
            render_instruction(BetType::wheel(WagerKind::Superfecta), &[2], 0.10),
            "$0.10 SUPERFECTA 2 WITH ALL WITH ALL WITH ALL"
        );
        let two_key = BetType::new(WagerKind::Trifecta, Structure::Wheel { keys: 2 });
        assert_eq!(
            render_instruction(two_key, &[3, 5], 1.0),
            "$1 TRIFECTA 3 WITH 5 WITH ALL"
        );
    }

    #[test]
    fn test_render_with_race() {
        assert_eq!(
            render_race_instruction(4, BetType::boxed(WagerKind::Quinella), &[1, 6], 2.0),
            "RACE 4, $2 QUINELLA BOX 1, 6"
        );
    }

    #[test]
    fn test_round_trip_all_structures() {
        let parser = InstructionParser::new();
        let cases: Vec<(BetType, Vec<u8>, f64)> = vec![
            (BetType::straight(WagerKind::Win), vec![7], 10.0),
            (BetType::straight(WagerKind::Place), vec![2], 5.0),
            (BetType::straight(WagerKind::Trifecta), vec![7, 1, 4], 1.0),
            (BetType::boxed(WagerKind::Exacta), vec![3, 5, 7], 1.0),
            (BetType::boxed(WagerKind::Superfecta), vec![1, 2, 3, 4, 9], 0.10),
            (BetType::key(WagerKind::Trifecta), vec![3, 5, 7, 8], 1.0),
            (BetType::wheel(WagerKind::Exacta), vec![12], 1.0),
            (
                BetType::new(WagerKind::Superfecta, Structure::Wheel { keys: 2 }),
                vec![4, 6],
                0.10,
            ),
            (BetType::boxed(WagerKind::Quinella), vec![2, 11], 2.0),
        ];

        for (bet_type, horses, stake) in cases {
            let rendered = render_instruction(bet_type, &horses, stake);
            let parsed = parser.parse(&rendered).expect(&rendered);
            assert_eq!(parsed.bet_type, bet_type, "{}", rendered);
            assert_eq!(parsed.horses, horses, "{}", rendered);
            assert!((parsed.unit_stake - stake).abs() < 1e-9, "{}", rendered);
            assert_eq!(parsed.race_number, None);
        }
    }

    #[test]
    fn test_parse_race_prefix() {
        let parser = InstructionParser::default();
        let parsed = parser.parse("RACE 9, $1 EXACTA BOX 3, 5").unwrap();
        assert_eq!(parsed.race_number, Some(9));
        assert_eq!(parsed.horses, vec![3, 5]);
    }

    #[test]
    fn test_parse_instruction_free_fn() {
        let parsed = parse_instruction("$2 QUINELLA BOX 3, 5, 7").unwrap();
        assert_eq!(parsed.bet_type, BetType::boxed(WagerKind::Quinella));
        assert_eq!(parsed.horses, vec![3, 5, 7]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parser = InstructionParser::new();
        assert!(parser.parse("give me the 3 horse").is_none());
        assert!(parser.parse("$1 EXACTA ALL WITH 3").is_none());
        assert!(parser.parse("$1 TRIFECTA 3 WITH ALL").is_none());
    }
}
