//! Player commands
//!
//! Commands are validated against the current unit table and either applied,
//! ignored (stale or dead unit), or rejected (illegal for the unit's state).
//! Nothing here is an error: the UI may race the simulation.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::battle::formation::Formation;
use crate::battle::morale::RoutState;
use crate::battle::units::{Stance, Unit};
use crate::core::types::UnitId;

/// What a unit does when it has nothing better to do
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandingOrder {
    /// Engage the nearest enemy
    #[default]
    Engage,
    MoveTo(Vec3),
    Attack(UnitId),
    /// Stay put; strike only what comes into range
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Move { destination: Vec3 },
    Attack { target: UnitId },
    ChangeFormation { formation: String },
    ChangeStance { stance: Stance },
    Retreat,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCommand {
    pub unit_id: UnitId,
    pub kind: CommandKind,
}

impl UnitCommand {
    pub fn new(unit_id: UnitId, kind: CommandKind) -> Self {
        Self { unit_id, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Applied,
    /// Unit (or target) no longer exists or is dead
    Ignored,
    /// Unit exists but may not do this right now
    Rejected,
}

/// Apply one command to the unit table
pub fn apply_command(command: &UnitCommand, units: &mut BTreeMap<UnitId, Unit>) -> CommandOutcome {
    let target_side = match &command.kind {
        CommandKind::Attack { target } => match units.get(target) {
            Some(t) if t.is_alive() => Some(t.side),
            _ => {
                tracing::debug!(unit = %command.unit_id, target = %target, "Attack on stale target ignored");
                return CommandOutcome::Ignored;
            }
        },
        _ => None,
    };

    let Some(unit) = units.get_mut(&command.unit_id) else {
        tracing::debug!(unit = %command.unit_id, "Command for unknown unit ignored");
        return CommandOutcome::Ignored;
    };
    if !unit.is_alive() {
        tracing::debug!(unit = %command.unit_id, "Command for destroyed unit ignored");
        return CommandOutcome::Ignored;
    }

    match &command.kind {
        CommandKind::Move { destination } => {
            unit.order = StandingOrder::MoveTo(*destination);
            if unit.stance == Stance::Retreating {
                unit.stance = Stance::Defensive;
            }
        }
        CommandKind::Attack { target } => {
            if unit.rout == RoutState::Routed || target_side == Some(unit.side) {
                return CommandOutcome::Rejected;
            }
            unit.order = StandingOrder::Attack(*target);
            unit.stance = Stance::Aggressive;
        }
        CommandKind::ChangeFormation { formation } => {
            unit.formation = Formation::resolve_id(formation);
        }
        CommandKind::ChangeStance { stance } => {
            if *stance == Stance::Aggressive && unit.rout == RoutState::Routed {
                return CommandOutcome::Rejected;
            }
            unit.stance = *stance;
            if *stance == Stance::Retreating {
                unit.order = StandingOrder::Engage;
            }
        }
        CommandKind::Retreat => {
            unit.stance = Stance::Retreating;
            unit.order = StandingOrder::Engage;
        }
        CommandKind::Hold => {
            unit.order = StandingOrder::Hold;
            unit.stance = Stance::Defensive;
        }
    }

    CommandOutcome::Applied
}
