//! Boundary to the external scene renderer
//!
//! The battle core decides what to draw and when. Meshes, sprites and
//! GPU buffers live on the other side of this trait.

use glam::Vec3;

use crate::core::types::BattleId;
use crate::vfx::particle::{ParticleHandle, ParticleSpec};
use crate::vfx::pool::Handle;
use crate::vfx::projectile::ProjectileSpec;

pub trait Renderer {
    fn spawn_projectile(&mut self, battle: BattleId, handle: Handle, spec: &ProjectileSpec);

    /// Called once per frame for every projectile still in flight
    fn update_projectile(&mut self, battle: BattleId, handle: Handle, position: Vec3, dt: f32);

    fn spawn_particle(&mut self, battle: BattleId, handle: ParticleHandle, spec: &ParticleSpec);

    /// Drop every visual owned by `battle`
    fn dispose_all(&mut self, battle: BattleId);
}

/// Renderer that draws nothing, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn spawn_projectile(&mut self, _: BattleId, _: Handle, _: &ProjectileSpec) {}

    fn update_projectile(&mut self, _: BattleId, _: Handle, _: Vec3, _: f32) {}

    fn spawn_particle(&mut self, _: BattleId, _: ParticleHandle, _: &ParticleSpec) {}

    fn dispose_all(&mut self, _: BattleId) {}
}

/// One call made across the renderer boundary
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SpawnProjectile {
        battle: BattleId,
        handle: Handle,
        spec: ProjectileSpec,
    },
    UpdateProjectile {
        battle: BattleId,
        handle: Handle,
        position: Vec3,
    },
    SpawnParticle {
        battle: BattleId,
        handle: ParticleHandle,
        spec: ParticleSpec,
    },
    DisposeAll {
        battle: BattleId,
    },
}

/// Renderer that records every call, for tests and replays
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projectile_spawns(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::SpawnProjectile { .. }))
            .count()
    }

    pub fn particle_spawns(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::SpawnParticle { .. }))
            .count()
    }

    /// Calls made after the last `dispose_all` for `battle`
    pub fn calls_after_dispose(&self, battle: BattleId) -> usize {
        match self
            .calls
            .iter()
            .rposition(|c| *c == RenderCall::DisposeAll { battle })
        {
            Some(i) => self.calls.len() - i - 1,
            None => 0,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn spawn_projectile(&mut self, battle: BattleId, handle: Handle, spec: &ProjectileSpec) {
        self.calls.push(RenderCall::SpawnProjectile {
            battle,
            handle,
            spec: *spec,
        });
    }

    fn update_projectile(&mut self, battle: BattleId, handle: Handle, position: Vec3, _dt: f32) {
        self.calls.push(RenderCall::UpdateProjectile {
            battle,
            handle,
            position,
        });
    }

    fn spawn_particle(&mut self, battle: BattleId, handle: ParticleHandle, spec: &ParticleSpec) {
        self.calls.push(RenderCall::SpawnParticle {
            battle,
            handle,
            spec: *spec,
        });
    }

    fn dispose_all(&mut self, battle: BattleId) {
        self.calls.push(RenderCall::DisposeAll { battle });
    }
}
