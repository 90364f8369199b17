//! Bounded per-battle effect queue
//!
//! The queue never grows past its capacity. Strikes, routs and deaths are
//! state events: their effect on the battle is applied before they are
//! published, so only their visual rides the bus. A state event arriving
//! at a full bus evicts the oldest cosmetic, or failing that sheds the
//! visual of the oldest queued strike. Cosmetic bursts are merged into a
//! nearby burst of the same kind, or dropped, once the bus is full.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::battle::matchup::TroopType;
use crate::battle::resolution::CombatEvent;
use crate::core::types::{Tick, UnitId};
use crate::vfx::particle::ParticleKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VfxEvent {
    Strike(CombatEvent),
    Rout {
        unit_id: UnitId,
        position: Vec3,
        tick: Tick,
    },
    Death {
        unit_id: UnitId,
        troop_type: TroopType,
        position: Vec3,
        tick: Tick,
    },
    /// Decorative burst with no simulation meaning
    Cosmetic {
        kind: ParticleKind,
        position: Vec3,
        count: u32,
    },
}

impl VfxEvent {
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, VfxEvent::Cosmetic { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Queued,
    /// Merged into an already queued cosmetic burst
    Coalesced,
    /// Cosmetic dropped on a full bus
    Dropped,
    /// State event queued by evicting a cosmetic one
    EvictedCosmetic,
    /// State event queued by shedding an older event's visual
    Shed,
}

#[derive(Debug, Clone)]
pub struct VfxEventBus {
    queue: VecDeque<VfxEvent>,
    capacity: usize,
    coalesce_radius: f32,
    coalesced: u64,
    dropped: u64,
    shed: u64,
}

impl VfxEventBus {
    pub fn new(capacity: usize, coalesce_radius: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            coalesce_radius,
            coalesced: 0,
            dropped: 0,
            shed: 0,
        }
    }

    pub fn publish(&mut self, event: VfxEvent) -> PublishOutcome {
        if self.queue.len() < self.capacity {
            self.queue.push_back(event);
            return PublishOutcome::Queued;
        }

        match event {
            VfxEvent::Cosmetic {
                kind,
                position,
                count,
            } => {
                if self.coalesce(kind, position, count) {
                    self.coalesced += 1;
                    PublishOutcome::Coalesced
                } else {
                    self.dropped += 1;
                    tracing::debug!(?kind, "Effect bus full, dropped cosmetic burst");
                    PublishOutcome::Dropped
                }
            }
            state_event => {
                if self.evict_cosmetic() {
                    self.dropped += 1;
                    self.queue.push_back(state_event);
                    return PublishOutcome::EvictedCosmetic;
                }
                self.shed_oldest();
                self.shed += 1;
                self.queue.push_back(state_event);
                if self.shed.is_power_of_two() {
                    tracing::debug!(shed = self.shed, "Effect bus full, shedding strike visuals");
                }
                PublishOutcome::Shed
            }
        }
    }

    fn coalesce(&mut self, kind: ParticleKind, position: Vec3, count: u32) -> bool {
        let radius = self.coalesce_radius;
        let existing = self.queue.iter_mut().find_map(|queued| match queued {
            VfxEvent::Cosmetic {
                kind: k,
                position: pos,
                count: c,
            } if *k == kind && pos.distance(position) <= radius => Some(c),
            _ => None,
        });
        match existing {
            Some(c) => {
                *c = c.saturating_add(count);
                true
            }
            None => false,
        }
    }

    /// Drop the oldest queued cosmetic, if there is one
    fn evict_cosmetic(&mut self) -> bool {
        match self.queue.iter().position(VfxEvent::is_cosmetic) {
            Some(i) => self.queue.remove(i).is_some(),
            None => false,
        }
    }

    /// Drop the oldest queued strike, or the oldest event if none is a strike
    fn shed_oldest(&mut self) {
        let index = self
            .queue
            .iter()
            .position(|e| matches!(e, VfxEvent::Strike(_)))
            .unwrap_or(0);
        let _ = self.queue.remove(index);
    }

    /// Take every queued event in publish order
    pub fn drain(&mut self) -> Vec<VfxEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// State-event visuals discarded to keep the bus bounded
    pub fn shed_count(&self) -> u64 {
        self.shed
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
