//! Pooled particles
//!
//! One fixed-capacity pool per particle kind. A burst larger than a pool
//! recycles that kind's oldest particles; other kinds are untouched.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::VfxConfig;
use crate::vfx::impact::ImpactPreset;
use crate::vfx::pool::{Handle, Pool};

/// Downward pull on heavy particles, world units per second squared
const GRAVITY: f32 = -9.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    Impact(ImpactPreset),
    Fire,
    Smoke,
    Rain,
    Snow,
    Sand,
}

impl ParticleKind {
    pub const COUNT: usize = ImpactPreset::ALL.len() + 5;

    pub fn all() -> Vec<ParticleKind> {
        ImpactPreset::ALL
            .iter()
            .map(|p| ParticleKind::Impact(*p))
            .chain([
                ParticleKind::Fire,
                ParticleKind::Smoke,
                ParticleKind::Rain,
                ParticleKind::Snow,
                ParticleKind::Sand,
            ])
            .collect()
    }

    /// Dense index, `0..COUNT`
    pub fn index(&self) -> usize {
        let impacts = ImpactPreset::ALL.len();
        match self {
            ParticleKind::Impact(preset) => ImpactPreset::ALL
                .iter()
                .position(|p| p == preset)
                .unwrap_or(0),
            ParticleKind::Fire => impacts,
            ParticleKind::Smoke => impacts + 1,
            ParticleKind::Rain => impacts + 2,
            ParticleKind::Snow => impacts + 3,
            ParticleKind::Sand => impacts + 4,
        }
    }

    pub fn is_weather(&self) -> bool {
        matches!(self, ParticleKind::Rain | ParticleKind::Snow | ParticleKind::Sand)
    }

    pub fn capacity(&self, config: &VfxConfig) -> usize {
        match self {
            ParticleKind::Impact(_) => config.impact_particle_capacity,
            ParticleKind::Fire | ParticleKind::Smoke => config.lingering_particle_capacity,
            ParticleKind::Rain | ParticleKind::Snow | ParticleKind::Sand => {
                config.weather_particle_capacity
            }
        }
    }

    pub fn ttl(&self) -> f32 {
        match self {
            ParticleKind::Impact(preset) => preset.ttl(),
            ParticleKind::Fire => 3.0,
            ParticleKind::Smoke => 4.0,
            ParticleKind::Rain => 1.0,
            ParticleKind::Snow | ParticleKind::Sand => 2.5,
        }
    }

    /// Does gravity act on it?
    fn is_heavy(&self) -> bool {
        matches!(
            self,
            ParticleKind::Impact(ImpactPreset::Blood)
                | ParticleKind::Impact(ImpactPreset::Debris)
                | ParticleKind::Impact(ImpactPreset::Splash)
                | ParticleKind::Rain
        )
    }

    pub fn color(&self) -> [f32; 4] {
        match self {
            ParticleKind::Impact(ImpactPreset::Spark) => [1.0, 0.9, 0.4, 1.0],
            ParticleKind::Impact(ImpactPreset::Dust) => [0.7, 0.6, 0.45, 0.6],
            ParticleKind::Impact(ImpactPreset::Blood) => [0.6, 0.05, 0.05, 1.0],
            ParticleKind::Impact(ImpactPreset::Explosion) => [1.0, 0.5, 0.1, 1.0],
            ParticleKind::Impact(ImpactPreset::MagicBurst) => [0.5, 0.3, 1.0, 1.0],
            ParticleKind::Impact(ImpactPreset::Splash) => [0.6, 0.75, 0.9, 0.8],
            ParticleKind::Impact(ImpactPreset::Debris) => [0.45, 0.4, 0.35, 1.0],
            ParticleKind::Impact(ImpactPreset::Evade) => [1.0, 1.0, 1.0, 0.5],
            ParticleKind::Impact(ImpactPreset::Generic) => [0.9, 0.9, 0.9, 0.8],
            ParticleKind::Fire => [1.0, 0.4, 0.0, 1.0],
            ParticleKind::Smoke => [0.3, 0.3, 0.3, 0.7],
            ParticleKind::Rain => [0.7, 0.8, 1.0, 0.5],
            ParticleKind::Snow => [1.0, 1.0, 1.0, 0.9],
            ParticleKind::Sand => [0.85, 0.7, 0.4, 0.6],
        }
    }

    fn size(&self) -> f32 {
        match self {
            ParticleKind::Impact(ImpactPreset::Explosion) => 1.5,
            ParticleKind::Smoke => 2.0,
            ParticleKind::Fire => 1.0,
            ParticleKind::Rain | ParticleKind::Snow | ParticleKind::Sand => 0.15,
            ParticleKind::Impact(_) => 0.4,
        }
    }
}

/// Spawn request for one particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub kind: ParticleKind,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Reference to a live particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleHandle {
    pub kind: ParticleKind,
    handle: Handle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub ttl: f32,
}

impl Particle {
    fn new(spec: &ParticleSpec) -> Self {
        Self {
            kind: spec.kind,
            position: spec.position,
            velocity: spec.velocity,
            age: 0.0,
            ttl: spec.kind.ttl(),
        }
    }

    pub fn progress(&self) -> f32 {
        (self.age / self.ttl).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.ttl
    }

    fn update(&mut self, dt: f32) {
        self.age += dt;
        if self.kind.is_heavy() {
            self.velocity.y += GRAVITY * dt;
        }
        self.position += self.velocity * dt;
    }
}

/// GPU-friendly particle record for the renderer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
    pub kind: u32,
    pub progress: f32,
}

impl ParticleInstance {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_particle(particle: &Particle) -> Self {
        let mut color = particle.kind.color();
        // Fade out over the last 30% of life
        let progress = particle.progress();
        if progress > 0.7 {
            color[3] *= 1.0 - (progress - 0.7) / 0.3;
        }
        Self {
            position: particle.position.to_array(),
            size: particle.kind.size(),
            color,
            kind: particle.kind.index() as u32,
            progress,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pools: Vec<Pool<Particle>>,
}

impl ParticleSystem {
    pub fn new(config: &VfxConfig) -> Self {
        let pools = ParticleKind::all()
            .iter()
            .map(|kind| Pool::with_capacity(kind.capacity(config)))
            .collect();
        Self { pools }
    }

    fn pool(&self, kind: ParticleKind) -> &Pool<Particle> {
        &self.pools[kind.index()]
    }

    pub fn spawn(&mut self, spec: &ParticleSpec) -> ParticleHandle {
        let spawned = self.pools[spec.kind.index()].spawn(Particle::new(spec));
        ParticleHandle {
            kind: spec.kind,
            handle: spawned.handle,
        }
    }

    /// Spawn `count` particles of `kind` scattered around `origin`
    pub fn burst<R: Rng + ?Sized>(
        &mut self,
        kind: ParticleKind,
        origin: Vec3,
        count: u32,
        rng: &mut R,
    ) -> Vec<(ParticleHandle, ParticleSpec)> {
        (0..count)
            .map(|_| {
                let velocity = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(0.5..=2.0),
                    rng.gen_range(-1.0..=1.0),
                ) * 2.0;
                let spec = ParticleSpec {
                    kind,
                    position: origin,
                    velocity,
                };
                (self.spawn(&spec), spec)
            })
            .collect()
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.pool(handle.kind).get(handle.handle)
    }

    /// Age every particle and release the expired ones
    ///
    /// Returns how many expired.
    pub fn update(&mut self, dt: f32) -> usize {
        if !(dt.is_finite() && dt > 0.0) {
            return 0;
        }
        let mut expired = 0;
        for pool in &mut self.pools {
            for handle in pool.handles() {
                let done = match pool.get_mut(handle) {
                    Some(p) => {
                        p.update(dt);
                        p.is_expired()
                    }
                    None => false,
                };
                if done && pool.release(handle).is_some() {
                    expired += 1;
                }
            }
        }
        expired
    }

    pub fn live_count(&self, kind: ParticleKind) -> usize {
        self.pool(kind).len()
    }

    pub fn total_live(&self) -> usize {
        self.pools.iter().map(|p| p.len()).sum()
    }

    pub fn capacity(&self, kind: ParticleKind) -> usize {
        self.pool(kind).capacity()
    }

    /// Live particles evicted to make room, across all kinds
    pub fn recycled_count(&self) -> u64 {
        self.pools.iter().map(|p| p.recycled_count()).sum()
    }

    /// Every live particle as an upload record
    pub fn instances(&self) -> Vec<ParticleInstance> {
        self.pools
            .iter()
            .flat_map(|pool| pool.iter().map(|(_, p)| ParticleInstance::from_particle(p)))
            .collect()
    }

    /// Release everything; returns how many were live
    pub fn clear(&mut self) -> usize {
        self.pools.iter_mut().map(|p| p.drain().len()).sum()
    }
}
