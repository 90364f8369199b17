//! Visual-effects pipeline for one battle
//!
//! Combat events go onto the bus during logic ticks. Each render frame the
//! pipeline ages in-flight projectiles, drains the bus into new launches
//! or impacts, lands arrived projectiles, spawns weather and ages
//! particles. Nothing here feeds back into the simulation.

pub mod bus;
pub mod impact;
pub mod particle;
pub mod pool;
pub mod projectile;
pub mod renderer;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::terrain::BattleContext;
use crate::core::config::VfxConfig;
use crate::core::types::BattleId;

pub use bus::{PublishOutcome, VfxEvent, VfxEventBus};
pub use impact::{select_preset, ImpactDispatcher, ImpactPreset, ImpactRequest};
pub use particle::{ParticleHandle, ParticleInstance, ParticleKind, ParticleSpec, ParticleSystem};
pub use pool::{Handle, Pool};
pub use projectile::{Arrival, ProjectileSpec, ProjectileSystem, TrajectoryKind};
pub use renderer::{NullRenderer, RecordingRenderer, RenderCall, Renderer};

/// Half-width of the box ambient weather falls through
const WEATHER_HALF_EXTENT: f32 = 60.0;
/// Height weather particles start at
const WEATHER_CEILING: f32 = 20.0;

const ROUT_DUST_BURST: u32 = 12;
const FIRE_BURST: u32 = 6;
const SMOKE_BURST: u32 = 4;

/// Running totals for one pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfxStats {
    pub events_coalesced: u64,
    pub events_dropped: u64,
    /// Strike, rout or death visuals shed to keep the bus bounded
    pub visuals_shed: u64,
    pub projectiles_spawned: u64,
    pub projectiles_arrived: u64,
    pub projectiles_recycled: u64,
    pub projectiles_cancelled: u64,
    pub impacts_dispatched: u64,
    pub damage_impacts: u64,
    pub evade_impacts: u64,
    pub particles_spawned: u64,
    pub particles_recycled: u64,
}

#[derive(Debug, Clone)]
pub struct VfxPipeline {
    battle_id: BattleId,
    bus: VfxEventBus,
    projectiles: ProjectileSystem,
    particles: ParticleSystem,
    impacts: ImpactDispatcher,
    weather_rate: f32,
    weather_accumulator: f32,
    anchor: Vec3,
    particles_spawned: u64,
    projectiles_cancelled: u64,
    damage_impacts: u64,
    evade_impacts: u64,
    torn_down: bool,
}

impl VfxPipeline {
    pub fn new(battle_id: BattleId, context: BattleContext, config: &VfxConfig) -> Self {
        Self {
            battle_id,
            bus: VfxEventBus::new(config.bus_capacity, config.coalesce_radius),
            projectiles: ProjectileSystem::new(config.projectile_capacity),
            particles: ParticleSystem::new(config),
            impacts: ImpactDispatcher::new(context),
            weather_rate: config.weather_particles_per_second,
            weather_accumulator: 0.0,
            anchor: Vec3::ZERO,
            particles_spawned: 0,
            projectiles_cancelled: 0,
            damage_impacts: 0,
            evade_impacts: 0,
            torn_down: false,
        }
    }

    pub fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn set_context(&mut self, context: BattleContext) {
        self.impacts.set_context(context);
    }

    /// Centre of the ambient weather box
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    /// Queue an event, plus the decorative bursts that go with it
    ///
    /// Rout dust and battlefield fire and smoke ride the bus as cosmetic
    /// events, so they are the first thing thrown away under load.
    pub fn publish(&mut self, event: VfxEvent) -> PublishOutcome {
        if self.torn_down {
            tracing::debug!(battle = %self.battle_id, "Effect event after teardown discarded");
            return PublishOutcome::Dropped;
        }
        let decorations = self.decorations(&event);
        let outcome = self.bus.publish(event);
        for (kind, position, count) in decorations.into_iter().flatten() {
            self.bus.publish(VfxEvent::Cosmetic {
                kind,
                position,
                count,
            });
        }
        outcome
    }

    fn decorations(&self, event: &VfxEvent) -> [Option<(ParticleKind, Vec3, u32)>; 2] {
        match *event {
            VfxEvent::Rout { position, .. } => [
                Some((ParticleKind::Impact(ImpactPreset::Dust), position, ROUT_DUST_BURST)),
                None,
            ],
            VfxEvent::Death { position, .. } if !self.impacts.context().terrain.is_space() => [
                Some((ParticleKind::Fire, position, FIRE_BURST)),
                Some((ParticleKind::Smoke, position, SMOKE_BURST)),
            ],
            _ => [None, None],
        }
    }

    /// Run one render frame
    pub fn frame<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R, renderer: &mut dyn Renderer) {
        if self.torn_down {
            return;
        }

        // Flights launched this frame start ageing next frame
        self.projectiles.update(dt);
        for event in self.bus.drain() {
            self.handle_event(event, rng, renderer);
        }

        let battle = self.battle_id;
        for (handle, projectile) in self.projectiles.iter() {
            renderer.update_projectile(battle, handle, projectile.position(), dt);
        }

        for arrival in self.projectiles.drain_arrivals() {
            self.impact(&arrival.request, rng, renderer);
        }

        self.spawn_weather(dt, rng, renderer);
        self.particles.update(dt);
    }

    fn handle_event<R: Rng + ?Sized>(
        &mut self,
        event: VfxEvent,
        rng: &mut R,
        renderer: &mut dyn Renderer,
    ) {
        match event {
            VfxEvent::Strike(strike) => {
                let request = ImpactRequest::from_event(&strike);
                match strike.attacker_troop.projectile() {
                    Some(profile) => {
                        let spec = ProjectileSpec {
                            troop_type: strike.attacker_troop,
                            origin: strike.origin,
                            target: strike.target,
                            speed: profile.speed,
                            trajectory: profile.trajectory,
                            on_arrival: request,
                        };
                        let handle = self.projectiles.spawn(spec);
                        renderer.spawn_projectile(self.battle_id, handle, &spec);
                    }
                    None => self.impact(&request, rng, renderer),
                }
                if strike.counter_damage > 0 {
                    self.impact(&ImpactRequest::return_fire(&strike), rng, renderer);
                }
            }
            VfxEvent::Rout { unit_id, .. } => {
                tracing::trace!(battle = %self.battle_id, unit = %unit_id, "Rout visual");
            }
            VfxEvent::Death { position, .. } => {
                // Ships break apart; land deaths leave only decorative fire
                if self.impacts.context().terrain.is_space() {
                    let explosion = ImpactPreset::Explosion;
                    let debris = ImpactPreset::Debris;
                    self.emit(ParticleKind::Impact(explosion), position, explosion.burst_size(), rng, renderer);
                    self.emit(ParticleKind::Impact(debris), position, debris.burst_size(), rng, renderer);
                }
            }
            VfxEvent::Cosmetic {
                kind,
                position,
                count,
            } => self.emit(kind, position, count, rng, renderer),
        }
    }

    fn impact<R: Rng + ?Sized>(
        &mut self,
        request: &ImpactRequest,
        rng: &mut R,
        renderer: &mut dyn Renderer,
    ) {
        let preset = self.impacts.dispatch(request);
        if preset.is_damage_based() {
            self.damage_impacts += 1;
        } else {
            self.evade_impacts += 1;
        }
        let count = request.burst_size(preset);
        self.emit(ParticleKind::Impact(preset), request.position, count, rng, renderer);
    }

    fn emit<R: Rng + ?Sized>(
        &mut self,
        kind: ParticleKind,
        position: Vec3,
        count: u32,
        rng: &mut R,
        renderer: &mut dyn Renderer,
    ) {
        for (handle, spec) in self.particles.burst(kind, position, count, rng) {
            renderer.spawn_particle(self.battle_id, handle, &spec);
        }
        self.particles_spawned += count as u64;
    }

    fn spawn_weather<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        rng: &mut R,
        renderer: &mut dyn Renderer,
    ) {
        let Some(kind) = self.impacts.context().effective_weather().ambient_particle() else {
            return;
        };
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        self.weather_accumulator += self.weather_rate * dt;
        let count = self.weather_accumulator.floor();
        self.weather_accumulator -= count;

        for _ in 0..count as u32 {
            let position = self.anchor
                + Vec3::new(
                    rng.gen_range(-WEATHER_HALF_EXTENT..=WEATHER_HALF_EXTENT),
                    WEATHER_CEILING,
                    rng.gen_range(-WEATHER_HALF_EXTENT..=WEATHER_HALF_EXTENT),
                );
            let velocity = match kind {
                ParticleKind::Rain => Vec3::new(0.0, -12.0, 0.0),
                ParticleKind::Sand => Vec3::new(6.0, rng.gen_range(-0.5..=0.5), 1.0),
                _ => Vec3::new(rng.gen_range(-0.3..=0.3), -1.5, rng.gen_range(-0.3..=0.3)),
            };
            let spec = ParticleSpec {
                kind,
                position,
                velocity,
            };
            let handle = self.particles.spawn(&spec);
            renderer.spawn_particle(self.battle_id, handle, &spec);
            self.particles_spawned += 1;
        }
    }

    /// Dispose every projectile, particle and queued event
    ///
    /// Pending arrivals are cancelled and never dispatched. Returns the
    /// number of projectiles cancelled. Repeated calls do nothing.
    pub fn teardown(&mut self, renderer: &mut dyn Renderer) -> usize {
        if self.torn_down {
            return 0;
        }
        let cancelled = self.projectiles.clear();
        let particles = self.particles.clear();
        self.bus.clear();
        renderer.dispose_all(self.battle_id);
        self.projectiles_cancelled += cancelled as u64;
        self.torn_down = true;
        tracing::info!(
            battle = %self.battle_id,
            projectiles = cancelled,
            particles,
            "Effects torn down"
        );
        cancelled
    }

    pub fn stats(&self) -> VfxStats {
        VfxStats {
            events_coalesced: self.bus.coalesced_count(),
            events_dropped: self.bus.dropped_count(),
            visuals_shed: self.bus.shed_count(),
            projectiles_spawned: self.projectiles.spawned_count(),
            projectiles_arrived: self.projectiles.arrived_count(),
            projectiles_recycled: self.projectiles.recycled_count(),
            projectiles_cancelled: self.projectiles_cancelled,
            impacts_dispatched: self.impacts.dispatched(),
            damage_impacts: self.damage_impacts,
            evade_impacts: self.evade_impacts,
            particles_spawned: self.particles_spawned,
            particles_recycled: self.particles.recycled_count(),
        }
    }

    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn pending_events(&self) -> usize {
        self.bus.len()
    }
}
