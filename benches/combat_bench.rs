//! Benchmarks for the per-tick hot paths: strike resolution, full battles,
//! and effect pools under load.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactical_core::battle::{
    resolve, Battle, BattleContext, CombatEvent, EngagementContext, Formation, MatchupTable, Stance, TroopType,
    Unit, UnitSnapshot,
};
use tactical_core::core::{BattleConfig, BattleId, Side, UnitId};
use tactical_core::vfx::{
    ImpactRequest, NullRenderer, ParticleKind, ParticleSystem, ProjectileSpec, ProjectileSystem,
};

fn unit(id: u32, side: Side, troop: TroopType, formation: Formation) -> Unit {
    let mut unit = Unit::new(UnitId(id), side, troop, 500);
    unit.formation = formation;
    unit
}

fn snapshot(id: u32, side: Side, troop: &str, x: f32, z: f32) -> UnitSnapshot {
    UnitSnapshot {
        id,
        side,
        troop_type: troop.into(),
        leadership: 60,
        strength: 55,
        intelligence: 50,
        crew: 500,
        max_crew: 500,
        training: 50,
        morale: 100.0,
        formation: "line".into(),
        stance: Stance::Aggressive,
        position: [x, 0.0, z],
    }
}

fn bench_resolve(c: &mut Criterion) {
    let config = BattleConfig::default();
    let matchups = MatchupTable::standard();
    let attacker = unit(1, Side::Attacker, TroopType::Footman, Formation::Wedge);
    let defender = unit(2, Side::Defender, TroopType::Archer, Formation::Line);
    let ctx = EngagementContext {
        combat: &config.combat,
        matchups: &matchups,
        battle: BattleContext::default(),
        tick: 1,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("resolve_strike", |b| {
        b.iter(|| black_box(resolve(black_box(&attacker), black_box(&defender), &ctx, &mut rng)));
    });
}

fn bench_full_battle(c: &mut Criterion) {
    let roster: Vec<UnitSnapshot> = (0..8)
        .flat_map(|i| {
            let x = i as f32 * 10.0;
            [
                snapshot(i * 2 + 1, Side::Attacker, "footman", x, 0.0),
                snapshot(i * 2 + 2, Side::Defender, "archer", x, 20.0),
            ]
        })
        .collect();

    c.bench_function("battle_8v8_to_completion", |b| {
        b.iter(|| {
            let mut battle = Battle::new(
                BattleId::new(),
                black_box(7),
                &roster,
                BattleContext::default(),
                BattleConfig::default(),
            )
            .unwrap();
            let mut renderer = NullRenderer;
            while !battle.is_finished() {
                battle.advance(0.1, &mut renderer).unwrap();
            }
            black_box(battle.outcome())
        });
    });
}

fn bench_particle_burst(c: &mut Criterion) {
    let config = BattleConfig::default();
    let mut particles = ParticleSystem::new(&config.vfx);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    // Pools are saturated after the first few iterations; this measures recycling
    c.bench_function("particle_burst_64_and_update", |b| {
        b.iter(|| {
            particles.burst(ParticleKind::Fire, Vec3::ZERO, 64, &mut rng);
            black_box(particles.update(0.016))
        });
    });
}

fn bench_projectile_volley(c: &mut Criterion) {
    let config = BattleConfig::default();
    let mut projectiles = ProjectileSystem::new(config.vfx.projectile_capacity);
    let profile = TroopType::Archer.projectile();
    let on_arrival = ImpactRequest::from_event(&CombatEvent::empty(UnitId(1), UnitId(2), 1));

    c.bench_function("projectile_volley_200", |b| {
        b.iter(|| {
            for i in 0..200 {
                let Some(profile) = profile else { break };
                projectiles.spawn(ProjectileSpec {
                    troop_type: TroopType::Archer,
                    origin: Vec3::ZERO,
                    target: Vec3::new(i as f32 % 40.0, 0.0, 30.0),
                    speed: profile.speed,
                    trajectory: profile.trajectory,
                    on_arrival,
                });
            }
            projectiles.update(0.1);
            black_box(projectiles.drain_arrivals().len())
        });
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_full_battle,
    bench_particle_burst,
    bench_projectile_volley
);
criterion_main!(benches);
