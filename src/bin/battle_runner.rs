//! Headless Battle Runner
//!
//! Runs seeded battles in parallel and prints aggregate results as JSON or text.

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

use tactical_core::battle::{
    Battle, BattleContext, BattleOutcome, Formation, Stance, Terrain, TroopType, UnitSnapshot,
    Weather,
};
use tactical_core::core::{BattleConfig, BattleId, Result, Side};
use tactical_core::vfx::{NullRenderer, VfxStats};

/// Headless Battle Runner - seeded battles for balance checks
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run seeded battles and report remaining-troop ratios")]
struct Args {
    /// Number of battles to run
    #[arg(long, default_value_t = 100)]
    battles: u64,

    /// Base seed; battle i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Attacker troop type
    #[arg(long, default_value = "footman")]
    attacker: String,

    /// Defender troop type
    #[arg(long, default_value = "archer")]
    defender: String,

    #[arg(long, default_value = "wedge")]
    attacker_formation: String,

    #[arg(long, default_value = "line")]
    defender_formation: String,

    /// Units per side
    #[arg(long, default_value_t = 3)]
    units: u32,

    /// Crew per unit
    #[arg(long, default_value_t = 500)]
    crew: u32,

    /// Distance between the two battle lines
    #[arg(long, default_value_t = 20.0)]
    distance: f32,

    #[arg(long, default_value = "plains")]
    terrain: String,

    #[arg(long, default_value = "clear")]
    weather: String,

    /// Balance config (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// One finished battle
#[derive(Debug, Serialize)]
struct BattleResult {
    seed: u64,
    outcome: BattleOutcome,
    ticks: u64,
    attacker_remaining: f32,
    defender_remaining: f32,
    checksum: u64,
    vfx: VfxStats,
}

/// JSON output structure
#[derive(Debug, Default, Serialize)]
struct Summary {
    battles: u64,
    base_seed: u64,
    attacker: String,
    defender: String,
    attacker_victories: u64,
    defender_victories: u64,
    draws: u64,
    mean_attacker_remaining: f32,
    mean_defender_remaining: f32,
    mean_ticks: f32,
    projectiles_spawned: u64,
    impacts_dispatched: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tactical_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };

    let terrain = Terrain::from_id(&args.terrain).unwrap_or_else(|| {
        tracing::warn!(terrain = %args.terrain, "Unknown terrain, using plains");
        Terrain::Plains
    });
    let weather = Weather::from_id(&args.weather).unwrap_or_else(|| {
        tracing::warn!(weather = %args.weather, "Unknown weather, using clear");
        Weather::Clear
    });
    let context = BattleContext::new(terrain, weather);

    let base_seed = args.seed.unwrap_or_else(rand::random);
    let roster = build_roster(&args);

    let results = (0..args.battles)
        .into_par_iter()
        .map(|i| run_battle(base_seed.wrapping_add(i), &roster, context, &config))
        .collect::<Result<Vec<_>>>()?;

    let summary = summarize(&args, base_seed, &results);

    match args.format.as_str() {
        "text" => print_text(&summary),
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

/// Two facing lines of `units` units each, spread along x
fn build_roster(args: &Args) -> Vec<UnitSnapshot> {
    let attacker = TroopType::resolve_id(&args.attacker);
    let defender = TroopType::resolve_id(&args.defender);
    let attacker_formation = Formation::resolve_id(&args.attacker_formation);
    let defender_formation = Formation::resolve_id(&args.defender_formation);

    let mut roster = Vec::new();
    let mut next_id = 1;
    for (side, troop, formation, z) in [
        (Side::Attacker, attacker, attacker_formation, 0.0),
        (Side::Defender, defender, defender_formation, args.distance),
    ] {
        for i in 0..args.units {
            roster.push(UnitSnapshot {
                id: next_id,
                side,
                troop_type: troop.id().to_string(),
                leadership: 50,
                strength: 50,
                intelligence: 50,
                crew: args.crew,
                max_crew: args.crew,
                training: 50,
                morale: 100.0,
                formation: formation.id().to_string(),
                stance: Stance::Aggressive,
                position: [i as f32 * 10.0, 0.0, z],
            });
            next_id += 1;
        }
    }
    roster
}

fn run_battle(
    seed: u64,
    roster: &[UnitSnapshot],
    context: BattleContext,
    config: &BattleConfig,
) -> Result<BattleResult> {
    let mut battle = Battle::new(BattleId::new(), seed, roster, context, config.clone())?;
    let mut renderer = NullRenderer;
    let frame = config.tick_seconds();

    while !battle.is_finished() {
        battle.advance(frame, &mut renderer)?;
    }

    let result = BattleResult {
        seed,
        outcome: battle.outcome(),
        ticks: battle.tick_count(),
        attacker_remaining: battle.remaining_ratio(Side::Attacker),
        defender_remaining: battle.remaining_ratio(Side::Defender),
        checksum: battle.checksum(),
        vfx: battle.vfx().stats(),
    };
    battle.teardown(&mut renderer);
    Ok(result)
}

fn summarize(args: &Args, base_seed: u64, results: &[BattleResult]) -> Summary {
    let mut summary = Summary {
        battles: results.len() as u64,
        base_seed,
        attacker: args.attacker.clone(),
        defender: args.defender.clone(),
        ..Summary::default()
    };
    if results.is_empty() {
        return summary;
    }

    for result in results {
        match result.outcome {
            BattleOutcome::AttackerVictory => summary.attacker_victories += 1,
            BattleOutcome::DefenderVictory => summary.defender_victories += 1,
            BattleOutcome::Draw | BattleOutcome::Undecided => summary.draws += 1,
        }
        summary.mean_attacker_remaining += result.attacker_remaining;
        summary.mean_defender_remaining += result.defender_remaining;
        summary.mean_ticks += result.ticks as f32;
        summary.projectiles_spawned += result.vfx.projectiles_spawned;
        summary.impacts_dispatched += result.vfx.impacts_dispatched;
    }

    let n = results.len() as f32;
    summary.mean_attacker_remaining /= n;
    summary.mean_defender_remaining /= n;
    summary.mean_ticks /= n;
    summary
}

fn print_text(summary: &Summary) {
    println!("Battle Results");
    println!("==============");
    println!("{} vs {} over {} battles", summary.attacker, summary.defender, summary.battles);
    println!("Base seed: {}", summary.base_seed);
    println!();
    println!("Attacker victories: {}", summary.attacker_victories);
    println!("Defender victories: {}", summary.defender_victories);
    println!("Draws: {}", summary.draws);
    println!();
    println!("Attacker remaining: {:.1}%", summary.mean_attacker_remaining * 100.0);
    println!("Defender remaining: {:.1}%", summary.mean_defender_remaining * 100.0);
    println!("Mean ticks: {:.1}", summary.mean_ticks);
    println!(
        "Projectiles: {}, impacts: {}",
        summary.projectiles_spawned, summary.impacts_dispatched
    );
}
