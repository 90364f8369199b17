//! Battle system integration tests

use std::collections::BTreeMap;
use std::thread;

use tactical_core::battle::*;
use tactical_core::core::{BattleConfig, BattleError, BattleId, Side, UnitId};
use tactical_core::vfx::{NullRenderer, RecordingRenderer};

fn snapshot(id: u32, side: Side, troop: &str, formation: &str, position: [f32; 3]) -> UnitSnapshot {
    UnitSnapshot {
        id,
        side,
        troop_type: troop.into(),
        leadership: 50,
        strength: 50,
        intelligence: 50,
        crew: 500,
        max_crew: 500,
        training: 50,
        morale: 100.0,
        formation: formation.into(),
        stance: Stance::Aggressive,
        position,
    }
}

fn footmen_vs_archers() -> Vec<UnitSnapshot> {
    vec![
        snapshot(1, Side::Attacker, "footman", "wedge", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Defender, "archer", "line", [2.0, 0.0, 0.0]),
    ]
}

fn new_battle(seed: u64, roster: &[UnitSnapshot], context: BattleContext) -> Battle {
    Battle::new(BattleId::new(), seed, roster, context, BattleConfig::default()).unwrap()
}

#[test]
fn test_footmen_wedge_beat_archer_line() {
    let roster = footmen_vs_archers();
    let seeds = 0..24u64;
    let n = seeds.clone().count() as f32;

    let (mut attacker_total, mut defender_total) = (0.0, 0.0);
    let mut attacker_wins = 0;
    for seed in seeds {
        let mut battle = new_battle(seed, &roster, BattleContext::default());
        if battle.run_to_completion().unwrap() == BattleOutcome::AttackerVictory {
            attacker_wins += 1;
        }
        attacker_total += battle.remaining_ratio(Side::Attacker);
        defender_total += battle.remaining_ratio(Side::Defender);
    }

    let attacker_mean = attacker_total / n;
    let defender_mean = defender_total / n;
    assert!(
        attacker_mean > defender_mean + 0.05,
        "attacker {attacker_mean:.3} vs defender {defender_mean:.3}"
    );
    assert!(attacker_wins as f32 > n / 2.0);
}

#[test]
fn test_footmen_vs_archers_from_runner_distance() {
    let roster = vec![
        snapshot(1, Side::Attacker, "footman", "wedge", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Defender, "archer", "line", [0.0, 0.0, 20.0]),
    ];

    for seed in 0..8u64 {
        let mut battle = new_battle(seed, &roster, BattleContext::default());
        let mut strikes = 0;
        let mut closed = false;
        while !battle.is_finished() {
            strikes += battle.tick().unwrap().events.len();
            if let Some(footmen) = battle.unit(UnitId(1)) {
                closed |= footmen.position.z > 0.0;
            }
        }

        assert!(strikes > 0, "seed {seed}: no engagement");
        assert!(closed, "seed {seed}: footmen never advanced");
        assert!(battle.tick_count() < battle.config().tick.max_ticks);
    }
}

#[test]
fn test_melee_lines_close_and_fight() {
    let roster = vec![
        snapshot(1, Side::Attacker, "footman", "line", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Attacker, "cavalry", "wedge", [10.0, 0.0, 0.0]),
        snapshot(3, Side::Defender, "footman", "line", [0.0, 0.0, 20.0]),
        snapshot(4, Side::Defender, "footman", "square", [10.0, 0.0, 20.0]),
    ];
    let mut battle = new_battle(12, &roster, BattleContext::default());

    let mut attackers_struck = false;
    let mut defenders_struck = false;
    for _ in 0..400 {
        for event in battle.tick().unwrap().events {
            match event.attacker_id.0 {
                1 | 2 => attackers_struck = true,
                _ => defenders_struck = true,
            }
        }
        if attackers_struck && defenders_struck {
            break;
        }
    }

    assert!(attackers_struck && defenders_struck);
}

#[test]
fn test_unit_at_21_morale_routs_once_and_stops_attacking() {
    let config = BattleConfig::default();
    let tracker = MoraleTracker::new(config.morale.clone());

    let mut shaken = snapshot(1, Side::Attacker, "footman", "line", [0.0, 0.0, 0.0]);
    shaken.morale = 21.0;
    let enemy = snapshot(2, Side::Defender, "footman", "line", [2.0, 0.0, 0.0]);

    let mut units = BTreeMap::new();
    for s in [&shaken, &enemy] {
        let unit = Unit::from_snapshot(s, &config.morale).unwrap();
        units.insert(unit.id, unit);
    }
    assert_eq!(units[&UnitId(1)].rout, RoutState::Shaken);

    // 10 of 500 crew lost is 2 morale: 21 -> 19
    let mut event = CombatEvent::empty(UnitId(2), UnitId(1), 1);
    event.damage = 10;
    let mut enemy_unit = units.remove(&UnitId(2)).unwrap();
    let mut unit = units.remove(&UnitId(1)).unwrap();
    unit.apply_casualties(event.damage);
    let transitions = tracker.apply_event(&mut enemy_unit, &mut unit, &event);
    units.insert(unit.id, unit);
    units.insert(enemy_unit.id, enemy_unit);

    let routs: Vec<_> = transitions.iter().filter(|t| t.entered_rout()).collect();
    assert_eq!(routs.len(), 1);
    assert_eq!(routs[0].unit_id, UnitId(1));
    assert!((units[&UnitId(1)].morale() - 19.0).abs() < 1e-4);
    assert!(units[&UnitId(1)].vulnerable);

    // Recover idle until it rallies, checking it never attacks while routed
    let mut rallied_at = None;
    for tick in 2..400 {
        let unit = units.get_mut(&UnitId(1)).unwrap();
        let transition = tracker.recover_idle(unit, tick);
        assert!(transition.map_or(true, |t| !t.entered_rout()));

        let unit = &units[&UnitId(1)];
        let attacks = plan_engagements(&units)
            .iter()
            .any(|e| e.attacker_id == UnitId(1));
        if unit.rout == RoutState::Routed {
            assert!(unit.morale() <= config.morale.exit_routed);
            assert!(!attacks);
        } else {
            assert!(unit.morale() > config.morale.exit_routed);
            assert!(!unit.vulnerable);
            assert!(attacks);
            rallied_at = Some(tick);
            break;
        }
    }
    assert!(rallied_at.is_some());
}

#[test]
fn test_same_seed_replays_identically() {
    let roster = vec![
        snapshot(1, Side::Attacker, "cavalry", "wedge", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Attacker, "archer", "line", [10.0, 0.0, -5.0]),
        snapshot(3, Side::Defender, "footman", "square", [0.0, 0.0, 25.0]),
        snapshot(4, Side::Defender, "mage", "scattered", [10.0, 0.0, 30.0]),
    ];
    let context = BattleContext::new(Terrain::Hills, Weather::Rain);

    let mut first = new_battle(99, &roster, context);
    let mut second = new_battle(99, &roster, context);
    let mut renderer = NullRenderer;
    for _ in 0..300 {
        first.advance(0.1, &mut renderer).unwrap();
        second.advance(0.1, &mut renderer).unwrap();
    }

    assert_eq!(first.tick_count(), second.tick_count());
    assert!(first.replay().compare(second.replay()).is_none());
    let a: Vec<UnitDelta> = first.units().map(Unit::delta).collect();
    let b: Vec<UnitDelta> = second.units().map(Unit::delta).collect();
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_diverge() {
    let roster = footmen_vs_archers();
    let mut a = new_battle(1, &roster, BattleContext::default());
    let mut b = new_battle(2, &roster, BattleContext::default());
    a.run_to_completion().unwrap();
    b.run_to_completion().unwrap();

    let mismatch = a.replay().compare(b.replay());
    assert!(mismatch.is_some() || a.replay().len() != b.replay().len());
}

#[test]
fn test_crew_and_morale_stay_in_bounds_every_tick() {
    let roster = vec![
        snapshot(1, Side::Attacker, "cavalry", "crane", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Attacker, "siege", "line", [5.0, 0.0, -20.0]),
        snapshot(3, Side::Defender, "archer", "line", [0.0, 0.0, 15.0]),
        snapshot(4, Side::Defender, "footman", "spindle", [6.0, 0.0, 12.0]),
    ];
    let mut battle = new_battle(5, &roster, BattleContext::default());

    while !battle.is_finished() {
        let report = battle.tick().unwrap();
        for delta in &report.deltas {
            assert!(delta.crew <= 500);
            assert!((0.0..=100.0).contains(&delta.morale));
        }
        for event in &report.events {
            if event.is_evaded {
                assert_eq!(event.damage, 0);
            }
        }
    }
}

#[test]
fn test_commands_steer_units() {
    let roster = vec![
        snapshot(1, Side::Attacker, "footman", "line", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Defender, "footman", "line", [0.0, 0.0, 100.0]),
    ];
    let mut battle = new_battle(3, &roster, BattleContext::default());

    let destination = glam::Vec3::new(-10.0, 0.0, 0.0);
    assert_eq!(
        battle.submit(&UnitCommand::new(UnitId(1), CommandKind::Move { destination })),
        CommandOutcome::Applied
    );
    assert_eq!(
        battle.submit(&UnitCommand::new(UnitId(1), CommandKind::Attack { target: UnitId(1) })),
        CommandOutcome::Rejected
    );
    assert_eq!(
        battle.submit(&UnitCommand::new(UnitId(42), CommandKind::Hold)),
        CommandOutcome::Ignored
    );

    for _ in 0..100 {
        battle.tick().unwrap();
    }
    let unit = battle.unit(UnitId(1)).unwrap();
    assert!(unit.position.distance(destination) < 1e-3 || unit.order == StandingOrder::Engage);
}

#[test]
fn test_teardown_cancels_in_flight_projectiles() {
    let roster = vec![
        snapshot(1, Side::Attacker, "archer", "line", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Defender, "archer", "line", [0.0, 0.0, 30.0]),
    ];
    let mut battle = new_battle(8, &roster, BattleContext::default());
    let mut renderer = RecordingRenderer::new();

    for _ in 0..5 {
        battle.advance(0.1, &mut renderer).unwrap();
    }
    assert!(renderer.projectile_spawns() > 0);
    assert!(battle.vfx().projectiles().live_count() > 0);

    battle.teardown(&mut renderer);
    battle.teardown(&mut renderer);

    assert_eq!(battle.phase(), BattlePhase::TornDown);
    assert!(battle.vfx().stats().projectiles_cancelled > 0);
    assert_eq!(battle.vfx().projectiles().live_count(), 0);
    assert_eq!(renderer.calls_after_dispose(battle.id()), 0);
    assert!(matches!(battle.tick(), Err(BattleError::BattleTornDown(_))));
    assert_eq!(
        battle.submit(&UnitCommand::new(UnitId(1), CommandKind::Hold)),
        CommandOutcome::Ignored
    );
}

#[test]
fn test_concurrent_battles_match_sequential_runs() {
    let roster = footmen_vs_archers();

    let sequential: Vec<u64> = (0..4)
        .map(|seed| {
            let mut battle = new_battle(seed, &roster, BattleContext::default());
            battle.run_to_completion().unwrap();
            battle.checksum()
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let roster = roster.clone();
            thread::spawn(move || {
                let mut battle = new_battle(seed, &roster, BattleContext::default());
                let mut renderer = NullRenderer;
                while !battle.is_finished() {
                    battle.advance(0.1, &mut renderer).unwrap();
                }
                battle.checksum()
            })
        })
        .collect();
    let concurrent: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(sequential, concurrent);
}

#[test]
fn test_unknown_ids_fall_back() {
    let roster = vec![
        snapshot(1, Side::Attacker, "dragon", "tortoise", [0.0, 0.0, 0.0]),
        snapshot(2, Side::Defender, "footman", "line", [2.0, 0.0, 0.0]),
    ];
    let battle = new_battle(1, &roster, BattleContext::default());
    let unit = battle.unit(UnitId(1)).unwrap();

    assert_eq!(unit.troop_type, TroopType::Irregular);
    assert_eq!(unit.formation, Formation::Scattered);
}

#[test]
fn test_config_file_matches_defaults() {
    let config = BattleConfig::from_toml_str(include_str!("../data/battle.toml")).unwrap();
    let defaults = BattleConfig::default();

    assert_eq!(config.balance_version, defaults.balance_version);
    assert_eq!(config.counters.len(), defaults.counters.len());
    assert_eq!(config.tick.logic_hz, defaults.tick.logic_hz);
    assert_eq!(
        MatchupTable::from_config(&config).multiplier(TroopType::Footman, TroopType::Archer),
        1.3
    );
}
