//! Core calculation modules: Kelly sizing and exotic combinatorics

pub mod combinatorics;
pub mod instruction;
pub mod kelly;

// Re-export commonly used types
pub use combinatorics::{combinations, cost, guarded_combinations, BetType, Structure, WagerKind};
pub use instruction::{
    format_money, parse_instruction, render_instruction, InstructionParser, ParsedInstruction,
};
pub use kelly::{calculate_kelly_fraction, KellyInput, KellyResult, KellySizer, KellyWarning};
