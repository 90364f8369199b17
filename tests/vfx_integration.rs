//! Effect pipeline integration tests

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactical_core::battle::{
    BattleContext, CombatEvent, Terrain, TroopType, Weather, ARRIVAL_EPSILON,
};
use tactical_core::core::{BattleConfig, BattleId, UnitId};
use tactical_core::vfx::*;

fn strike(attacker: TroopType, defender: TroopType) -> CombatEvent {
    let mut event = CombatEvent::empty(UnitId(1), UnitId(2), 1);
    event.attacker_troop = attacker;
    event.defender_troop = defender;
    event.attack_style = attacker.attack_style();
    event.origin = Vec3::ZERO;
    event.target = Vec3::new(30.0, 0.0, 0.0);
    event
}

#[test]
fn test_linear_projectile_lands_once_after_two_seconds() {
    let mut projectiles = ProjectileSystem::new(8);
    let mut dispatcher = ImpactDispatcher::new(BattleContext::default());

    let handle = projectiles.spawn(ProjectileSpec {
        troop_type: TroopType::Warship,
        origin: Vec3::ZERO,
        target: Vec3::new(100.0, 0.0, 0.0),
        speed: 50.0,
        trajectory: TrajectoryKind::Linear,
        on_arrival: ImpactRequest::from_event(&strike(TroopType::Warship, TroopType::Warship)),
    });

    let mut landed = Vec::new();
    let mut clock = 0.0f32;
    for _ in 0..30 {
        projectiles.update(0.1);
        clock += 0.1;
        for arrival in projectiles.drain_arrivals() {
            dispatcher.dispatch(&arrival.request);
            landed.push((clock, arrival));
        }
    }

    assert_eq!(landed.len(), 1);
    assert_eq!(dispatcher.dispatched(), 1);
    let (at, arrival) = landed[0];
    assert!((at - 2.0).abs() < 0.1 + ARRIVAL_EPSILON);
    assert!((arrival.elapsed - 2.0).abs() < 1e-3);
    assert!(!arrival.early);
    assert_eq!(arrival.handle, handle);
    assert!(projectiles.get(handle).is_none());
    assert_eq!(projectiles.live_count(), 0);
}

#[test]
fn test_evaded_strike_only_shows_evade() {
    let config = BattleConfig::default();
    let mut pipeline = VfxPipeline::new(BattleId::new(), BattleContext::default(), &config.vfx);
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut renderer = RecordingRenderer::new();

    for attacker in [TroopType::Footman, TroopType::Archer, TroopType::Mage, TroopType::Siege] {
        let mut event = strike(attacker, TroopType::Footman);
        event.is_evaded = true;
        event.is_critical = true;
        pipeline.publish(VfxEvent::Strike(event));
    }
    for _ in 0..40 {
        pipeline.frame(0.1, &mut rng, &mut renderer);
    }

    let stats = pipeline.stats();
    assert_eq!(stats.impacts_dispatched, 4);
    assert_eq!(stats.evade_impacts, 4);
    assert_eq!(stats.damage_impacts, 0);
    for call in &renderer.calls {
        if let RenderCall::SpawnParticle { handle, .. } = call {
            assert_eq!(handle.kind, ParticleKind::Impact(ImpactPreset::Evade));
        }
    }
}

#[test]
fn test_evade_preset_in_every_context() {
    let contexts = [
        BattleContext::default(),
        BattleContext::new(Terrain::Void, Weather::Clear),
        BattleContext::new(Terrain::River, Weather::Rain),
        BattleContext::new(Terrain::Desert, Weather::Sandstorm),
    ];
    for context in contexts {
        for troop in TroopType::all() {
            let mut request = ImpactRequest::from_event(&strike(*troop, TroopType::Footman));
            request.is_evaded = true;
            request.defender_died = true;
            let preset = select_preset(&request, &context);
            assert_eq!(preset, ImpactPreset::Evade);
            assert!(!preset.is_damage_based());
        }
    }
}

#[test]
fn test_particle_pools_never_exceed_capacity() {
    let mut config = BattleConfig::default();
    config.vfx.impact_particle_capacity = 16;
    config.vfx.lingering_particle_capacity = 8;
    let mut particles = ParticleSystem::new(&config.vfx);
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for round in 0..20 {
        particles.burst(ParticleKind::Impact(ImpactPreset::Blood), Vec3::ZERO, 7, &mut rng);
        particles.burst(ParticleKind::Fire, Vec3::ONE, 5, &mut rng);
        if round % 3 == 0 {
            particles.update(0.05);
        }
        for kind in ParticleKind::all() {
            assert!(particles.live_count(kind) <= particles.capacity(kind));
        }
    }

    assert_eq!(particles.capacity(ParticleKind::Fire), 8);
    assert!(particles.recycled_count() > 0);
    assert_eq!(particles.instances().len(), particles.total_live());
}

#[test]
fn test_projectile_recycle_lands_early_exactly_once() {
    let mut projectiles = ProjectileSystem::new(2);
    let request = ImpactRequest::from_event(&strike(TroopType::Archer, TroopType::Footman));
    let spec = ProjectileSpec {
        troop_type: TroopType::Archer,
        origin: Vec3::ZERO,
        target: Vec3::new(60.0, 0.0, 0.0),
        speed: 60.0,
        trajectory: TrajectoryKind::Parabolic,
        on_arrival: request,
    };

    let first = projectiles.spawn(spec);
    projectiles.spawn(spec);
    projectiles.spawn(spec);

    let early = projectiles.drain_arrivals();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].handle, first);
    assert!(early[0].early);

    for _ in 0..20 {
        projectiles.update(0.1);
    }
    let rest = projectiles.drain_arrivals();
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().all(|a| !a.early && a.handle != first));
    assert_eq!(projectiles.arrived_count(), 3);
}

#[test]
fn test_full_bus_stays_bounded_and_prefers_strikes() {
    let mut config = BattleConfig::default();
    config.vfx.bus_capacity = 4;
    let mut pipeline = VfxPipeline::new(BattleId::new(), BattleContext::default(), &config.vfx);

    for i in 0..8 {
        pipeline.publish(VfxEvent::Cosmetic {
            kind: ParticleKind::Impact(ImpactPreset::Dust),
            position: Vec3::new(i as f32 * 100.0, 0.0, 0.0),
            count: 3,
        });
    }
    for _ in 0..6 {
        pipeline.publish(VfxEvent::Strike(strike(TroopType::Footman, TroopType::Archer)));
    }

    // Four cosmetics queued then evicted, four dropped outright; two
    // strike visuals shed once nothing cosmetic was left
    assert_eq!(pipeline.pending_events(), 4);
    assert_eq!(pipeline.stats().events_dropped, 8);
    assert_eq!(pipeline.stats().visuals_shed, 2);

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    pipeline.frame(0.016, &mut rng, &mut NullRenderer);
    assert_eq!(pipeline.stats().impacts_dispatched, 4);
    assert_eq!(pipeline.pending_events(), 0);
}

#[test]
fn test_space_battle_deaths_explode() {
    let config = BattleConfig::default();
    let context = BattleContext::new(Terrain::Void, Weather::Storm);
    let mut pipeline = VfxPipeline::new(BattleId::new(), context, &config.vfx);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let mut event = strike(TroopType::Warship, TroopType::Warship);
    event.defender_died = true;
    event.damage = 500;
    pipeline.publish(VfxEvent::Strike(event));
    for _ in 0..10 {
        pipeline.frame(0.1, &mut rng, &mut NullRenderer);
    }

    let particles = pipeline.particles();
    assert!(particles.live_count(ParticleKind::Impact(ImpactPreset::Explosion)) > 0);
    // No weather in space
    assert_eq!(particles.live_count(ParticleKind::Rain), 0);
}
