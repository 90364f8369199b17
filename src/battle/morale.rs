//! Morale and rout state machine
//!
//! Morale drops with casualties. States move one edge per evaluation with
//! separate entry and exit thresholds, so a single point of morale cannot
//! flip a unit back and forth:
//!
//! ```text
//! Steady --(<= enter_shaken)--> Shaken --(<= enter_routed)--> Routed
//! Steady <--(> exit_shaken)---- Shaken <--(> exit_routed)---- Routed
//! ```
//!
//! A steady unit that collapses straight through `enter_routed` routs at once.

use serde::{Deserialize, Serialize};

use crate::battle::resolution::CombatEvent;
use crate::battle::units::Unit;
use crate::core::config::MoraleConfig;
use crate::core::types::{Tick, UnitId};

/// Rout state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoutState {
    #[default]
    Steady,
    Shaken,
    Routed,
}

/// A state change produced by a morale update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutTransition {
    pub unit_id: UnitId,
    pub from: RoutState,
    pub to: RoutState,
    pub tick: Tick,
}

impl RoutTransition {
    pub fn entered_rout(&self) -> bool {
        self.to == RoutState::Routed
    }
}

/// Next rout state for a unit at `morale`
pub fn next_state(current: RoutState, morale: f32, config: &MoraleConfig) -> RoutState {
    match current {
        RoutState::Steady => {
            if morale <= config.enter_routed {
                RoutState::Routed
            } else if morale <= config.enter_shaken {
                RoutState::Shaken
            } else {
                RoutState::Steady
            }
        }
        RoutState::Shaken => {
            if morale <= config.enter_routed {
                RoutState::Routed
            } else if morale > config.exit_shaken {
                RoutState::Steady
            } else {
                RoutState::Shaken
            }
        }
        // Never straight back to Steady
        RoutState::Routed => {
            if morale > config.exit_routed {
                RoutState::Shaken
            } else {
                RoutState::Routed
            }
        }
    }
}

/// Rout state for a unit entering battle at `morale`
pub fn initial_state(morale: f32, config: &MoraleConfig) -> RoutState {
    next_state(RoutState::Steady, morale, config)
}

/// Applies morale deltas to units and tracks the resulting transitions
#[derive(Debug, Clone, Default)]
pub struct MoraleTracker {
    config: MoraleConfig,
}

impl MoraleTracker {
    pub fn new(config: MoraleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MoraleConfig {
        &self.config
    }

    /// Re-evaluate a unit's rout state against its current morale
    pub fn evaluate(&self, unit: &mut Unit, tick: Tick) -> Option<RoutTransition> {
        let from = unit.rout;
        let to = next_state(from, unit.morale(), &self.config);
        if from == to {
            return None;
        }

        unit.rout = to;
        unit.vulnerable = to == RoutState::Routed;
        tracing::debug!(unit = %unit.id, ?from, ?to, morale = unit.morale(), "Rout state changed");
        Some(RoutTransition {
            unit_id: unit.id,
            from,
            to,
            tick,
        })
    }

    /// Shift a unit's morale by `delta` and re-evaluate
    pub fn adjust(&self, unit: &mut Unit, delta: f32, tick: Tick) -> Option<RoutTransition> {
        unit.set_morale(unit.morale() + delta);
        self.evaluate(unit, tick)
    }

    /// Apply the morale consequences of one resolved exchange
    ///
    /// The side that lost the larger fraction of its max crew loses morale in
    /// proportion; the other side gains a little. If both lost the same
    /// fraction, both pay. Evaded strikes change nothing.
    pub fn apply_event(
        &self,
        attacker: &mut Unit,
        defender: &mut Unit,
        event: &CombatEvent,
    ) -> Vec<RoutTransition> {
        let mut transitions = Vec::new();
        if event.is_evaded || (event.damage == 0 && event.counter_damage == 0) {
            return transitions;
        }

        let defender_loss = casualty_fraction(event.damage, defender.max_crew());
        let attacker_loss = casualty_fraction(event.counter_damage, attacker.max_crew());
        let flank = if event.enveloped {
            self.config.flank_shock
        } else {
            0.0
        };

        let (attacker_delta, defender_delta) = if defender_loss > attacker_loss {
            (
                self.config.victor_gain,
                -defender_loss * self.config.casualty_scale - flank,
            )
        } else if attacker_loss > defender_loss {
            (
                -attacker_loss * self.config.casualty_scale,
                self.config.victor_gain - flank,
            )
        } else {
            (
                -attacker_loss * self.config.casualty_scale,
                -defender_loss * self.config.casualty_scale - flank,
            )
        };

        transitions.extend(self.adjust(attacker, attacker_delta, event.tick));
        transitions.extend(self.adjust(defender, defender_delta, event.tick));
        transitions
    }

    /// Passive recovery for a unit that saw no combat this tick
    pub fn recover_idle(&self, unit: &mut Unit, tick: Tick) -> Option<RoutTransition> {
        if unit.morale() >= crate::battle::constants::MAX_MORALE {
            return None;
        }
        self.adjust(unit, self.config.idle_recovery, tick)
    }

    /// Morale hit for an ally near a unit that just routed
    pub fn apply_contagion(&self, ally: &mut Unit, tick: Tick) -> Option<RoutTransition> {
        self.adjust(ally, -self.config.contagion_penalty, tick)
    }
}

fn casualty_fraction(casualties: u32, max_crew: u32) -> f32 {
    if max_crew == 0 {
        return 0.0;
    }
    (casualties as f32 / max_crew as f32).min(1.0)
}
