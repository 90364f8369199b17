//! In-flight projectiles
//!
//! Every projectile produces exactly one `Arrival`: when its flight time
//! elapses, immediately for instant trajectories, or early when a full pool
//! forces it out. Teardown discards pending arrivals without producing them.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::battle::constants::{ARRIVAL_EPSILON, PARABOLIC_ARC_FACTOR};
use crate::battle::matchup::TroopType;
use crate::vfx::impact::ImpactRequest;
use crate::vfx::pool::{Handle, Pool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryKind {
    /// Lobbed: arcs above the straight line
    Parabolic,
    Linear,
    /// Beam or lightning: arrives the moment it is fired
    Instant,
}

/// Spawn request for one projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    pub troop_type: TroopType,
    pub origin: Vec3,
    pub target: Vec3,
    pub speed: f32,
    pub trajectory: TrajectoryKind,
    pub on_arrival: ImpactRequest,
}

impl ProjectileSpec {
    /// Seconds from launch to arrival
    pub fn flight_time(&self) -> f32 {
        let distance = self.origin.distance(self.target);
        match self.trajectory {
            TrajectoryKind::Instant => 0.0,
            TrajectoryKind::Parabolic | TrajectoryKind::Linear => {
                if self.speed > 0.0 && distance.is_finite() {
                    distance / self.speed
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub spec: ProjectileSpec,
    pub elapsed: f32,
    pub flight_time: f32,
}

impl Projectile {
    fn new(spec: ProjectileSpec) -> Self {
        Self {
            spec,
            elapsed: 0.0,
            flight_time: spec.flight_time(),
        }
    }

    /// Fraction of the flight completed, 0..=1
    pub fn progress(&self) -> f32 {
        if self.flight_time <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.flight_time).clamp(0.0, 1.0)
        }
    }

    pub fn position(&self) -> Vec3 {
        let t = self.progress();
        let straight = self.spec.origin.lerp(self.spec.target, t);
        match self.spec.trajectory {
            TrajectoryKind::Parabolic => {
                let apex = self.spec.origin.distance(self.spec.target) * PARABOLIC_ARC_FACTOR;
                straight + Vec3::Y * (4.0 * apex * t * (1.0 - t))
            }
            TrajectoryKind::Linear | TrajectoryKind::Instant => straight,
        }
    }

    fn has_arrived(&self) -> bool {
        self.elapsed + ARRIVAL_EPSILON >= self.flight_time
    }
}

/// A completed flight, ready for impact dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub handle: Handle,
    pub request: ImpactRequest,
    /// Flight time actually flown
    pub elapsed: f32,
    /// Forced down by pool recycling before its flight finished
    pub early: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectileSystem {
    pool: Pool<Projectile>,
    arrivals: VecDeque<Arrival>,
    spawned: u64,
    arrived: u64,
}

impl ProjectileSystem {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            arrivals: VecDeque::with_capacity(capacity),
            spawned: 0,
            arrived: 0,
        }
    }

    /// Launch a projectile
    ///
    /// If the pool is full the oldest projectile lands early so its impact
    /// still fires.
    pub fn spawn(&mut self, spec: ProjectileSpec) -> Handle {
        let spawned = self.pool.spawn(Projectile::new(spec));
        self.spawned += 1;

        if let Some((handle, evicted)) = spawned.evicted {
            tracing::debug!(slot = handle.index(), "Projectile pool full, landing oldest early");
            self.land(handle, evicted, true);
        }

        let handle = spawned.handle;
        if spec.trajectory == TrajectoryKind::Instant || spec.flight_time() <= 0.0 {
            if let Some(projectile) = self.pool.release(handle) {
                self.land(handle, projectile, false);
            }
        }
        handle
    }

    /// Advance every projectile by `dt` seconds, queuing arrivals
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        for handle in self.pool.handles() {
            let arrived = match self.pool.get_mut(handle) {
                Some(p) => {
                    p.elapsed += dt;
                    p.has_arrived()
                }
                None => false,
            };
            if arrived {
                if let Some(projectile) = self.pool.release(handle) {
                    self.land(handle, projectile, false);
                }
            }
        }
    }

    fn land(&mut self, handle: Handle, projectile: Projectile, early: bool) {
        self.arrived += 1;
        self.arrivals.push_back(Arrival {
            handle,
            request: projectile.spec.on_arrival,
            elapsed: projectile.elapsed,
            early,
        });
    }

    /// Take every queued arrival, oldest first
    pub fn drain_arrivals(&mut self) -> Vec<Arrival> {
        self.arrivals.drain(..).collect()
    }

    pub fn get(&self, handle: Handle) -> Option<&Projectile> {
        self.pool.get(handle)
    }

    /// Live projectiles in launch order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Projectile)> {
        self.pool.iter()
    }

    pub fn live_count(&self) -> usize {
        self.pool.len()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn spawned_count(&self) -> u64 {
        self.spawned
    }

    pub fn arrived_count(&self) -> u64 {
        self.arrived
    }

    pub fn recycled_count(&self) -> u64 {
        self.pool.recycled_count()
    }

    /// Drop every projectile and pending arrival; returns how many were cancelled
    pub fn clear(&mut self) -> usize {
        let cancelled = self.pool.drain().len() + self.arrivals.len();
        self.arrivals.clear();
        cancelled
    }
}
