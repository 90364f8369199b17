//! Unit movement for one logic tick
//!
//! Positions are read from a snapshot taken before anyone moves, so the
//! result does not depend on iteration order.

use glam::Vec3;
use std::collections::{BTreeMap, BTreeSet};

use crate::battle::commands::StandingOrder;
use crate::battle::constants::ROUT_SPEED_MULTIPLIER;
use crate::battle::engagement::{approach_distance, pursuit_target};
use crate::battle::morale::RoutState;
use crate::battle::units::{Stance, Unit};
use crate::core::types::{Side, UnitId};

/// Move every living unit by up to one tick's worth of travel
///
/// Units in `striking` landed a blow this tick and hold their ground unless
/// routed or retreating. Units that were only struck keep closing.
pub fn advance_units(units: &mut BTreeMap<UnitId, Unit>, dt: f32, striking: &BTreeSet<UnitId>) {
    let destinations: Vec<(UnitId, Vec3, f32)> = units
        .values()
        .filter(|u| u.is_alive())
        .filter_map(|u| plan_step(u, units, striking).map(|(goal, stop)| (u.id, goal, stop)))
        .collect();

    for (id, goal, stop) in destinations {
        let Some(unit) = units.get_mut(&id) else {
            continue;
        };
        let mut speed = unit.troop_type.movement_speed();
        if unit.rout == RoutState::Routed {
            speed *= ROUT_SPEED_MULTIPLIER;
        }
        let (next, arrived) = step_toward(unit.position, goal, speed * dt, stop);
        unit.position = next;

        if arrived && matches!(unit.order, StandingOrder::MoveTo(_)) {
            unit.order = StandingOrder::Engage;
        }
    }
}

/// Where a unit is heading and how close it needs to get
fn plan_step(
    unit: &Unit,
    units: &BTreeMap<UnitId, Unit>,
    striking: &BTreeSet<UnitId>,
) -> Option<(Vec3, f32)> {
    if unit.rout == RoutState::Routed || unit.stance == Stance::Retreating {
        let centroid = enemy_centroid(unit.side, units)?;
        let mut away = (unit.position - centroid).normalize_or_zero();
        if away == Vec3::ZERO {
            away = match unit.side {
                Side::Attacker => Vec3::NEG_Z,
                Side::Defender => Vec3::Z,
            };
        }
        // Far enough that the step never arrives
        return Some((unit.position + away * 1.0e6, 0.0));
    }

    if striking.contains(&unit.id) {
        return None;
    }

    match unit.order {
        StandingOrder::MoveTo(destination) => Some((destination, 0.0)),
        StandingOrder::Hold => None,
        StandingOrder::Attack(_) => {
            pursuit_target(unit, units).map(|t| (t.position, approach_distance(unit)))
        }
        StandingOrder::Engage => match unit.stance {
            Stance::Aggressive => {
                pursuit_target(unit, units).map(|t| (t.position, approach_distance(unit)))
            }
            Stance::Defensive | Stance::Retreating => None,
        },
    }
}

fn enemy_centroid(side: Side, units: &BTreeMap<UnitId, Unit>) -> Option<Vec3> {
    let (sum, count) = units
        .values()
        .filter(|u| u.side != side && u.is_alive())
        .fold((Vec3::ZERO, 0u32), |(sum, n), u| (sum + u.position, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Move from `from` toward `to`, stopping `stop_distance` short
///
/// Returns the new position and whether the stop point was reached.
pub fn step_toward(from: Vec3, to: Vec3, max_step: f32, stop_distance: f32) -> (Vec3, bool) {
    let offset = to - from;
    let distance = offset.length();
    let remaining = distance - stop_distance;
    if remaining <= 0.0 {
        return (from, true);
    }
    if remaining <= max_step {
        return (from + offset / distance * remaining, true);
    }
    (from + offset / distance * max_step, false)
}
