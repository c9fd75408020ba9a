//! Parimutuel CLI - Command-line front end for the wagering engine

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use parimutuel::config::{EngineConfig, KellyFraction, RiskStyle};
use parimutuel::core::combinatorics::{combinations, cost, BetType, Structure, WagerKind};
use parimutuel::core::instruction::format_money;
use parimutuel::core::kelly::{KellyResult, KellySizer};
use parimutuel::multirace::{build_best_tickets, find_opportunities, MultiRaceTicket};
use parimutuel::recommend::{BetCandidate, RecommendationGenerator};
use parimutuel::{BankrollState, RaceCard};

#[derive(Parser)]
#[command(name = "parimutuel")]
#[command(author, version, about = "Parimutuel wagering decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run the interactive calculator
    #[arg(short, long)]
    interactive: bool,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Size a single win bet with the Kelly criterion
    Kelly {
        /// Estimated win probability (0-1)
        #[arg(short, long)]
        probability: f64,

        /// Decimal odds (6.0 for 5-1)
        #[arg(short, long)]
        odds: f64,

        /// Bankroll amount
        #[arg(short, long, default_value = "1000")]
        bankroll: f64,

        /// Kelly fraction (overrides the configuration)
        #[arg(short, long, value_enum)]
        fraction: Option<FractionArg>,
    },

    /// Count combinations and cost for an exotic structure
    Combos {
        #[arg(value_enum)]
        kind: KindArg,

        #[arg(value_enum, default_value = "box")]
        structure: StructureArg,

        /// Selected horses (starters for wheels)
        #[arg(short, long)]
        depth: usize,

        /// Stake per combination (defaults to the pool's customary unit)
        #[arg(short, long)]
        unit: Option<f64>,
    },

    /// Tiered bet recommendations for one race
    Recommend {
        /// Race card JSON file
        #[arg(long)]
        card: PathBuf,

        /// Race number on the card
        #[arg(short, long)]
        race: u8,

        /// Bankroll for Kelly sizing
        #[arg(short, long, default_value = "1000")]
        bankroll: f64,

        /// Session bankroll state (JSON); replaces --bankroll and the Kelly settings
        #[arg(long)]
        state: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Scan a card for multi-race opportunities and build tickets
    Sequences {
        /// Race card JSON file
        #[arg(long)]
        card: PathBuf,

        /// Budget per ticket
        #[arg(short, long, default_value = "50")]
        budget: f64,

        #[arg(short, long, value_enum, default_value = "balanced")]
        style: StyleArg,

        /// Session bankroll state (JSON); replaces --budget and --style
        #[arg(long)]
        state: Option<PathBuf>,

        /// Include MARGINAL windows
        #[arg(long)]
        expert: bool,

        /// Print JSON instead of scripts
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FractionArg {
    Full,
    Half,
    Quarter,
    Eighth,
}

impl From<FractionArg> for KellyFraction {
    fn from(arg: FractionArg) -> Self {
        match arg {
            FractionArg::Full => KellyFraction::Full,
            FractionArg::Half => KellyFraction::Half,
            FractionArg::Quarter => KellyFraction::Quarter,
            FractionArg::Eighth => KellyFraction::Eighth,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Exacta,
    Quinella,
    Trifecta,
    Superfecta,
}

impl From<KindArg> for WagerKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Exacta => WagerKind::Exacta,
            KindArg::Quinella => WagerKind::Quinella,
            KindArg::Trifecta => WagerKind::Trifecta,
            KindArg::Superfecta => WagerKind::Superfecta,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StructureArg {
    Straight,
    Box,
    Key,
    Wheel,
}

impl From<StructureArg> for Structure {
    fn from(arg: StructureArg) -> Self {
        match arg {
            StructureArg::Straight => Structure::Straight,
            StructureArg::Box => Structure::Box,
            StructureArg::Key => Structure::Key,
            StructureArg::Wheel => Structure::Wheel { keys: 1 },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Safe,
    Balanced,
    Aggressive,
}

impl From<StyleArg> for RiskStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Safe => RiskStyle::Safe,
            StyleArg::Balanced => RiskStyle::Balanced,
            StyleArg::Aggressive => RiskStyle::Aggressive,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    let config = load_config(cli.config.as_deref())?;

    println!("{}", "Parimutuel CLI v0.2.0".cyan().bold());
    println!();

    if cli.interactive {
        run_interactive(&config)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Kelly {
                probability,
                odds,
                bankroll,
                fraction,
            } => {
                let mut settings = config.kelly.clone();
                if let Some(f) = fraction {
                    settings.fraction = f.into();
                }
                let result = KellySizer::new(settings).size(probability, odds, bankroll);
                print_kelly(&result, bankroll);
            }
            Commands::Combos {
                kind,
                structure,
                depth,
                unit,
            } => {
                print_combos(BetType::new(kind.into(), structure.into()), depth, unit)?;
            }
            Commands::Recommend {
                card,
                race,
                bankroll,
                state,
                json,
            } => {
                let generator = match state {
                    Some(path) => {
                        RecommendationGenerator::for_bankroll(config, &load_state(&path)?)
                    }
                    None => RecommendationGenerator::new(config, bankroll),
                };
                recommend_race(&generator, &card, race, json)?;
            }
            Commands::Sequences {
                card,
                budget,
                style,
                state,
                expert,
                json,
            } => {
                let mut config = config;
                config.multi_race.expert_mode |= expert;
                let (budget, style) = match state {
                    Some(path) => {
                        let state = load_state(&path)?;
                        (state.available_budget(), state.risk_tolerance)
                    }
                    None => (budget, style.into()),
                };
                scan_sequences(&config, &card, budget, style, json)?;
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_card(path: &Path) -> Result<RaceCard> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let card: RaceCard = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse race card {:?}", path))?;
    info!("Loaded {} races from {:?}", card.races.len(), path);
    Ok(card)
}

fn load_state(path: &Path) -> Result<BankrollState> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let state: BankrollState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bankroll state {:?}", path))?;
    info!(
        "Bankroll {} with {} left today",
        format_money(state.current_bankroll),
        format_money(state.available_budget())
    );
    Ok(state)
}

fn print_kelly(result: &KellyResult, bankroll: f64) {
    println!("{}", "Kelly Sizing:".yellow().bold());
    println!("{}", "-".repeat(40));
    println!("{:<22} {:>12.1}%", "Win probability", result.probability * 100.0);
    println!("{:<22} {:>12.2}", "Decimal odds", result.decimal_odds);
    println!("{:<22} {:>12.1}%", "Implied probability", result.implied_probability * 100.0);
    println!("{:<22} {:>12.1}%", "Edge", result.edge_percent);
    println!("{:<22} {:>12.1}%", "Overlay", result.overlay_percent);
    println!("{:<22} {:>12.4}", "Full Kelly fraction", result.full_kelly_fraction);
    println!();

    if result.should_bet {
        println!(
            "{} {} of {} ({:.2}% of bankroll)",
            "→ Bet".green().bold(),
            format_money(result.optimal_bet_size).green().bold(),
            format_money(bankroll),
            result.adjusted_fraction * 100.0
        );
        if let Some(growth) = result.expected_growth {
            println!("  expected log growth per bet: {:.5}", growth);
        }
    } else {
        println!(
            "{} {}",
            "→ No bet:".red().bold(),
            result.reason.as_deref().unwrap_or("-")
        );
    }

    for warning in &result.warnings {
        println!("  {} {}", "!".yellow(), warning.message());
    }
}

fn print_combos(bet_type: BetType, depth: usize, unit: Option<f64>) -> Result<()> {
    let unit = unit.unwrap_or_else(|| bet_type.kind.default_unit_stake());
    let Some(count) = combinations(bet_type, depth) else {
        bail!(
            "{} cannot be built from {} horses",
            bet_type.label(),
            depth
        );
    };
    let total = cost(bet_type, depth, unit).unwrap_or_default();

    println!("{}", bet_type.label().yellow().bold());
    println!("{}", "-".repeat(40));
    println!("{:<16} {:>10}", "Depth", depth);
    println!("{:<16} {:>10}", "Combinations", count);
    println!("{:<16} {:>10}", "Unit", format_money(unit));
    println!("{:<16} {:>10}", "Total", format_money(total).green().bold());
    Ok(())
}

fn recommend_race(
    generator: &RecommendationGenerator,
    card_path: &Path,
    race_number: u8,
    json: bool,
) -> Result<()> {
    let card = load_card(card_path)?;
    let race = card
        .race(race_number)
        .with_context(|| format!("Race {} is not on the card", race_number))?;

    let recs = generator.generate_race(race);

    if json {
        println!("{}", serde_json::to_string_pretty(&recs)?);
        return Ok(());
    }

    println!(
        "{}: race {} / {} starters / bankroll {}",
        "Recommending".green(),
        race_number,
        race.starter_count(),
        format_money(generator.bankroll())
    );
    println!();

    for group in &recs.tiers {
        println!(
            "{}",
            format!("Tier {} ({}):", group.tier.number(), group.label)
                .yellow()
                .bold()
        );
        print_bet_header();
        for bet in &group.bets {
            print_bet(bet);
        }
        println!(
            "{:>58} {:>10}  {} - {}",
            "tier total",
            format_money(group.total_investment),
            format_money(group.potential_return.low),
            format_money(group.potential_return.high)
        );
        println!();
    }

    if !recs.special.is_empty() {
        println!("{}", "Special:".magenta().bold());
        print_bet_header();
        for bet in &recs.special {
            print_bet(bet);
        }
        println!();
    }

    for warning in &recs.warnings {
        println!("{} {}", "!".yellow(), warning);
    }

    println!(
        "{} total investment {}",
        "→".green(),
        format_money(recs.total_investment).green().bold()
    );
    println!("{}", "(returns are heuristic estimates, not payouts)".dimmed());
    Ok(())
}

fn print_bet_header() {
    println!(
        "{:<46} {:>5} {:>6} {:>10}  {}",
        "Instruction", "Conf", "Edge", "Cost", "Est. return"
    );
    println!("{}", "-".repeat(90));
}

fn print_bet(bet: &BetCandidate) {
    let edge = format!("{:+.0}%", bet.edge_percent);
    let edge = if bet.edge_percent > 0.0 {
        edge.green()
    } else {
        edge.normal()
    };
    println!(
        "{:<46} {:>5.0} {:>6} {:>10}  {} - {}",
        bet.instruction,
        bet.confidence,
        edge,
        format_money(bet.total_cost),
        format_money(bet.potential_return.low),
        format_money(bet.potential_return.high)
    );
}

fn scan_sequences(
    config: &EngineConfig,
    card_path: &Path,
    budget: f64,
    style: RiskStyle,
    json: bool,
) -> Result<()> {
    let card = load_card(card_path)?;
    let settings = &config.multi_race;

    if json {
        let tickets = build_best_tickets(&card, budget, style, settings)?;
        println!("{}", serde_json::to_string_pretty(&tickets)?);
        return Ok(());
    }

    let opportunities = find_opportunities(&card, settings)?;
    println!(
        "{}: {} races, budget {}, {} style",
        "Scanning".green(),
        card.races.len(),
        format_money(budget),
        style.label()
    );
    println!();

    if opportunities.is_empty() {
        println!("{}", "No sequence opportunities on this card.".yellow());
        return Ok(());
    }

    println!("{}", "Opportunities:".yellow().bold());
    println!(
        "{:<14} {:>8} {:>9} {:>4}  {}",
        "Bet", "Races", "Quality", "VP", "Reasoning"
    );
    println!("{}", "-".repeat(90));
    for opp in &opportunities {
        println!(
            "{:<14} {:>8} {:>9} {:>4}  {}",
            opp.bet_type.name(),
            opp.race_span(),
            opp.quality.label(),
            opp.value_play_count,
            opp.reasoning.dimmed()
        );
    }
    println!();

    let tickets = build_best_tickets(&card, budget, style, settings)?;
    for ticket in &tickets {
        print_ticket(ticket);
    }
    Ok(())
}

fn print_ticket(ticket: &MultiRaceTicket) {
    let header = format!(
        "{} ({} confidence)",
        ticket.bet_type.name(),
        ticket.confidence.label()
    );
    if ticket.is_valid {
        println!("{}", header.cyan().bold());
    } else {
        println!("{} {}", header.red().bold(), "[over budget]".red());
    }
    for line in ticket.script.lines() {
        println!("  {}", line);
    }
    println!(
        "  est. payout {} - {}",
        format_money(ticket.estimated_payout.low),
        format_money(ticket.estimated_payout.high)
    );
    for warning in &ticket.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    println!();
}

fn run_interactive(config: &EngineConfig) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!("Choose 'Quit' to exit.\n");

    let theme = ColorfulTheme::default();

    loop {
        let options = vec!["Kelly calculator", "Exotic combinations", "Quit"];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                let probability: f64 = Input::with_theme(&theme)
                    .with_prompt("Win probability (0-1)")
                    .interact_text()?;

                let odds: f64 = Input::with_theme(&theme)
                    .with_prompt("Decimal odds")
                    .interact_text()?;

                let bankroll: f64 = Input::with_theme(&theme)
                    .with_prompt("Bankroll")
                    .default(1000.0)
                    .interact_text()?;

                let fractions = KellyFraction::all();
                let labels: Vec<&str> = fractions.iter().map(|f| f.label()).collect();
                let default = fractions
                    .iter()
                    .position(|f| *f == config.kelly.fraction)
                    .unwrap_or(0);
                let choice = Select::with_theme(&theme)
                    .with_prompt("Kelly fraction")
                    .items(&labels)
                    .default(default)
                    .interact()?;

                let mut settings = config.kelly.clone();
                settings.fraction = fractions[choice];

                println!();
                print_kelly(
                    &KellySizer::new(settings).size(probability, odds, bankroll),
                    bankroll,
                );
                println!();
            }
            1 => {
                let kinds = [
                    WagerKind::Exacta,
                    WagerKind::Quinella,
                    WagerKind::Trifecta,
                    WagerKind::Superfecta,
                ];
                let kind_labels: Vec<&str> = kinds.iter().map(|k| k.window_name()).collect();
                let kind = Select::with_theme(&theme)
                    .with_prompt("Bet")
                    .items(&kind_labels)
                    .default(0)
                    .interact()?;

                let structures = [Structure::Box, Structure::Key, Structure::Wheel { keys: 1 }];
                let structure = Select::with_theme(&theme)
                    .with_prompt("Structure")
                    .items(&["Box", "Key", "Wheel"])
                    .default(0)
                    .interact()?;

                let depth: usize = Input::with_theme(&theme)
                    .with_prompt("Horses (starters for a wheel)")
                    .interact_text()?;

                println!();
                let bet_type = BetType::new(kinds[kind], structures[structure]);
                if let Err(e) = print_combos(bet_type, depth, None) {
                    println!("{} {}", "!".red(), e);
                }
                println!();
            }
            _ => {
                println!("Goodbye!");
                break;
            }
        }
    }

    Ok(())
}
