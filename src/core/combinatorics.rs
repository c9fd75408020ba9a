//! Exotic wager combinatorics
//!
//! Combination counts and costs for straight, box, key and wheel structures.
//!
//! For `n` selected horses filling `k` finishing positions:
//!     Box:   P(n, k) = n! / (n - k)!     (quinella: C(n, 2))
//!     Key:   P(n - 1, k - 1)             (one key horse, n includes it)
//!     Wheel: (n - keys) * (n - keys - 1) * ...  over the open positions,
//!            where n is the whole field of starters
//!
//! A structure whose depth the field cannot support returns `None`. Callers
//! must drop such bets rather than price them at zero.

use serde::{Deserialize, Serialize};

use crate::error::{validate_field_size, EngineError};
use crate::models::round_cents;

/// Pool a wager is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerKind {
    Win,
    Place,
    Show,
    Exacta,
    Quinella,
    Trifecta,
    Superfecta,
}

impl WagerKind {
    /// Number of finishing positions the wager covers
    pub fn positions(self) -> usize {
        match self {
            WagerKind::Win | WagerKind::Place | WagerKind::Show => 1,
            WagerKind::Exacta | WagerKind::Quinella => 2,
            WagerKind::Trifecta => 3,
            WagerKind::Superfecta => 4,
        }
    }

    /// Whether finishing order matters
    pub fn is_ordered(self) -> bool {
        !matches!(self, WagerKind::Quinella)
    }

    /// Customary minimum unit per combination
    pub fn default_unit_stake(self) -> f64 {
        match self {
            WagerKind::Win | WagerKind::Place | WagerKind::Show => 2.0,
            WagerKind::Exacta => 1.0,
            WagerKind::Quinella => 2.0,
            WagerKind::Trifecta => 1.0,
            WagerKind::Superfecta => 0.10,
        }
    }

    /// Name as called at the window
    pub fn window_name(self) -> &'static str {
        match self {
            WagerKind::Win => "WIN",
            WagerKind::Place => "PLACE",
            WagerKind::Show => "SHOW",
            WagerKind::Exacta => "EXACTA",
            WagerKind::Quinella => "QUINELLA",
            WagerKind::Trifecta => "TRIFECTA",
            WagerKind::Superfecta => "SUPERFECTA",
        }
    }

    pub fn from_window_name(name: &str) -> Option<Self> {
        match name {
            "WIN" => Some(WagerKind::Win),
            "PLACE" => Some(WagerKind::Place),
            "SHOW" => Some(WagerKind::Show),
            "EXACTA" => Some(WagerKind::Exacta),
            "QUINELLA" => Some(WagerKind::Quinella),
            "TRIFECTA" => Some(WagerKind::Trifecta),
            "SUPERFECTA" => Some(WagerKind::Superfecta),
            _ => None,
        }
    }
}

/// How the selected horses are arranged across positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "structure", rename_all = "snake_case")]
pub enum Structure {
    /// One designated finish order
    Straight,
    /// Any order among the selected horses
    Box,
    /// One key horse on top, the rest in any order underneath
    Key,
    /// Key horse(s) in the leading positions, ALL in each open position
    Wheel { keys: usize },
}

/// A wager kind paired with its structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BetType {
    pub kind: WagerKind,
    #[serde(flatten)]
    pub structure: Structure,
}

impl BetType {
    pub const fn new(kind: WagerKind, structure: Structure) -> Self {
        Self { kind, structure }
    }

    pub const fn straight(kind: WagerKind) -> Self {
        Self::new(kind, Structure::Straight)
    }

    pub const fn boxed(kind: WagerKind) -> Self {
        Self::new(kind, Structure::Box)
    }

    pub const fn key(kind: WagerKind) -> Self {
        Self::new(kind, Structure::Key)
    }

    pub const fn wheel(kind: WagerKind) -> Self {
        Self::new(kind, Structure::Wheel { keys: 1 })
    }

    /// Whether this structure is meaningful for the kind
    pub fn is_supported(&self) -> bool {
        let k = self.kind.positions();
        match self.structure {
            Structure::Straight => true,
            Structure::Box | Structure::Key => k >= 2,
            Structure::Wheel { keys } => k >= 2 && keys >= 1 && keys < k,
        }
    }

    /// Wheels are priced over the whole field; everything else over the selection
    pub fn prices_over_field(&self) -> bool {
        matches!(self.structure, Structure::Wheel { .. })
    }

    /// Display label, e.g. "EXACTA BOX"
    pub fn label(&self) -> String {
        let kind = self.kind.window_name();
        match self.structure {
            Structure::Straight => kind.to_string(),
            Structure::Box => format!("{} BOX", kind),
            Structure::Key => format!("{} KEY", kind),
            Structure::Wheel { .. } => format!("{} WHEEL", kind),
        }
    }
}

/// Permutations `P(n, r) = n! / (n - r)!`
///
/// Computed as a falling product so large `n` does not overflow early.
pub fn permutations(n: u64, r: u64) -> Option<u64> {
    if r > n {
        return None;
    }
    (0..r).try_fold(1u64, |acc, i| acc.checked_mul(n - i))
}

/// Binomial coefficient `C(n, r)`
pub fn choose(n: u64, r: u64) -> Option<u64> {
    if r > n {
        return None;
    }
    let r = r.min(n - r);
    let mut acc = 1u64;
    for i in 0..r {
        acc = acc.checked_mul(n - i)? / (i + 1);
    }
    Some(acc)
}

/// Combination count for a bet type at a given depth
///
/// `field_depth` is the number of selected horses for straight/box/key bets and
/// the number of starters for wheels. Returns `None` when the depth cannot
/// support the structure.
pub fn combinations(bet_type: BetType, field_depth: usize) -> Option<u64> {
    if !bet_type.is_supported() {
        return None;
    }

    let k = bet_type.kind.positions() as u64;
    let n = field_depth as u64;
    if n < k {
        return None;
    }

    match bet_type.structure {
        Structure::Straight => Some(1),
        Structure::Box => {
            if bet_type.kind.is_ordered() {
                permutations(n, k)
            } else {
                choose(n, k)
            }
        }
        Structure::Key => {
            if bet_type.kind.is_ordered() {
                permutations(n - 1, k - 1)
            } else {
                choose(n - 1, k - 1)
            }
        }
        Structure::Wheel { keys } => {
            let keys = keys as u64;
            let open = k - keys;
            if bet_type.kind.is_ordered() {
                permutations(n - keys, open)
            } else {
                choose(n - keys, open)
            }
        }
    }
}

/// Total cost of a bet type at a given depth and unit stake
pub fn cost(bet_type: BetType, field_depth: usize, unit_stake: f64) -> Option<f64> {
    if !unit_stake.is_finite() || unit_stake <= 0.0 {
        return None;
    }
    combinations(bet_type, field_depth).map(|c| round_cents(c as f64 * unit_stake))
}

/// Combination count for a concrete selection within a field, with the field-size guard
///
/// * `selected` - horses named on the ticket (key horses only, for wheels)
/// * `starters` - non-scratched horses in the race
pub fn guarded_combinations(
    bet_type: BetType,
    selected: usize,
    starters: usize,
) -> Result<u64, EngineError> {
    let k = bet_type.kind.positions();

    // The race itself must be deep enough for the bet
    validate_field_size(k, starters)?;
    // Every named horse must be a distinct starter
    validate_field_size(selected, starters)?;

    let depth = match bet_type.structure {
        Structure::Wheel { keys } => {
            if selected != keys {
                return Err(EngineError::FieldTooSmall {
                    required: keys,
                    available: selected,
                });
            }
            starters
        }
        Structure::Straight => {
            if selected != k {
                return Err(EngineError::FieldTooSmall {
                    required: k,
                    available: selected,
                });
            }
            selected
        }
        Structure::Box | Structure::Key => selected,
    };

    combinations(bet_type, depth).ok_or(EngineError::FieldTooSmall {
        required: k,
        available: depth,
    })
}
