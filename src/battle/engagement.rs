//! Engagement planning: who strikes whom this tick
//!
//! Units strike only what is inside their attack range. Out-of-range units
//! close distance in the movement phase instead.

use std::collections::BTreeMap;

use crate::battle::commands::StandingOrder;
use crate::battle::constants::RANGE_EPSILON;
use crate::battle::units::{Stance, Unit};
use crate::core::types::UnitId;

/// One planned strike
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engagement {
    pub attacker_id: UnitId,
    pub defender_id: UnitId,
    pub distance: f32,
}

/// Is `target` inside `unit`'s attack range?
///
/// Planning and the in-tick re-check both use this, with a small slack
/// past the nominal range.
pub fn within_reach(unit: &Unit, target: &Unit) -> bool {
    unit.distance_to(target) <= unit.troop_type.attack_range() + RANGE_EPSILON
}

/// How close a closing unit aims to get to its target
pub fn approach_distance(unit: &Unit) -> f32 {
    (unit.troop_type.attack_range() - RANGE_EPSILON).max(0.0)
}

/// Nearest living enemy of `unit`, lowest id on ties
pub fn nearest_enemy<'a>(unit: &Unit, units: &'a BTreeMap<UnitId, Unit>) -> Option<&'a Unit> {
    let mut best: Option<(&Unit, f32)> = None;
    for other in units.values() {
        if other.side == unit.side || !other.is_alive() {
            continue;
        }
        let distance = unit.distance_to(other);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((other, distance)),
        }
    }
    best.map(|(u, _)| u)
}

/// The unit this one wants to fight, in range or not
pub fn pursuit_target<'a>(unit: &Unit, units: &'a BTreeMap<UnitId, Unit>) -> Option<&'a Unit> {
    if let StandingOrder::Attack(target) = unit.order {
        if let Some(t) = units.get(&target) {
            if t.is_alive() && t.side != unit.side {
                return Some(t);
            }
        }
    }
    nearest_enemy(unit, units)
}

/// Plan every strike for this tick, in attacker id order
pub fn plan_engagements(units: &BTreeMap<UnitId, Unit>) -> Vec<Engagement> {
    let mut engagements = Vec::new();

    for unit in units.values() {
        if !unit.can_attack() {
            continue;
        }
        let ordered = match unit.order {
            StandingOrder::Attack(_) => pursuit_target(unit, units),
            StandingOrder::Engage if unit.stance == Stance::Aggressive => pursuit_target(unit, units),
            _ => None,
        };
        let target = ordered
            .filter(|t| within_reach(unit, t))
            .or_else(|| nearest_enemy(unit, units).filter(|t| within_reach(unit, t)));

        if let Some(defender) = target {
            engagements.push(Engagement {
                attacker_id: unit.id,
                defender_id: defender.id,
                distance: unit.distance_to(defender),
            });
        }
    }

    engagements
}
