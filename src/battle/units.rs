//! Units and the roster snapshots they are built from
//!
//! A unit is one fighting block (regiment or fleet squadron). Crew and
//! morale are private so `0 <= crew <= max_crew` and `0 <= morale <= 100`
//! hold no matter who holds a `&mut Unit`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::battle::commands::StandingOrder;
use crate::battle::constants::{CREW_PER_MODEL, MAX_MODELS_PER_UNIT, MAX_MORALE};
use crate::battle::formation::Formation;
use crate::battle::matchup::{AttackStyle, TroopType};
use crate::battle::morale::{initial_state, RoutState};
use crate::core::config::MoraleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{Side, UnitId};

/// Standing behaviour of a unit between explicit orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Close with and strike the nearest enemy
    #[default]
    Aggressive,
    /// Hold position, strike only what is in range
    Defensive,
    /// Fall back away from the enemy, never strike
    Retreating,
}

/// Commander attributes (0-100 scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub leadership: u32,
    pub strength: u32,
    pub intelligence: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            leadership: 50,
            strength: 50,
            intelligence: 50,
        }
    }
}

/// A unit on the battlefield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub side: Side,
    pub troop_type: TroopType,
    pub stats: UnitStats,
    crew: u32,
    max_crew: u32,
    /// Drill level, 0-100
    pub training: u8,
    morale: f32,
    pub rout: RoutState,
    /// Set while routed: takes amplified damage
    pub vulnerable: bool,
    pub formation: Formation,
    pub stance: Stance,
    pub order: StandingOrder,
    pub position: Vec3,
}

impl Unit {
    /// A full-strength, steady unit with default stats
    pub fn new(id: UnitId, side: Side, troop_type: TroopType, max_crew: u32) -> Self {
        Self {
            id,
            side,
            troop_type,
            stats: UnitStats::default(),
            crew: max_crew,
            max_crew,
            training: 50,
            morale: MAX_MORALE,
            rout: RoutState::Steady,
            vulnerable: false,
            formation: Formation::default(),
            stance: Stance::default(),
            order: StandingOrder::default(),
            position: Vec3::ZERO,
        }
    }

    pub fn crew(&self) -> u32 {
        self.crew
    }

    pub fn max_crew(&self) -> u32 {
        self.max_crew
    }

    pub fn morale(&self) -> f32 {
        self.morale
    }

    /// Set crew, clamped to `[0, max_crew]`
    pub fn set_crew(&mut self, crew: u32) {
        self.crew = crew.min(self.max_crew);
    }

    /// Set morale, clamped to `[0, 100]`
    ///
    /// Does not re-evaluate rout state; go through `MoraleTracker` for that.
    pub fn set_morale(&mut self, morale: f32) {
        self.morale = if morale.is_nan() {
            0.0
        } else {
            morale.clamp(0.0, MAX_MORALE)
        };
    }

    /// Remove up to `casualties` crew, returning how many were actually lost
    pub fn apply_casualties(&mut self, casualties: u32) -> u32 {
        let lost = casualties.min(self.crew);
        self.crew -= lost;
        lost
    }

    pub fn is_alive(&self) -> bool {
        self.crew > 0
    }

    /// May this unit initiate an attack right now?
    pub fn can_attack(&self) -> bool {
        self.is_alive() && self.rout != RoutState::Routed && self.stance != Stance::Retreating
    }

    /// May this unit return fire when struck? Retreating units still do.
    pub fn can_attack_back(&self) -> bool {
        self.is_alive() && self.rout != RoutState::Routed
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_crew == 0 {
            0.0
        } else {
            self.crew as f32 / self.max_crew as f32
        }
    }

    /// Striking power before crew, counters and formation are applied
    ///
    /// Magic users fight with intelligence, everyone else with strength.
    pub fn force(&self, training_weight: f32) -> f32 {
        let stat = match self.troop_type.attack_style() {
            AttackStyle::Magic => self.stats.intelligence,
            AttackStyle::Melee | AttackStyle::Ranged | AttackStyle::Siege => self.stats.strength,
        };
        let training = self.training.min(100) as f32 / 100.0;
        stat as f32 * (1.0 + training * training_weight)
    }

    /// Number of models (soldiers or ships) drawn at full strength
    pub fn model_count(&self) -> u32 {
        self.max_crew
            .div_ceil(CREW_PER_MODEL)
            .clamp(1, MAX_MODELS_PER_UNIT)
    }

    pub fn distance_to(&self, other: &Unit) -> f32 {
        self.position.distance(other.position)
    }

    /// Build a unit from a roster snapshot
    ///
    /// Unknown troop and formation ids fall back (with a warning) rather
    /// than failing; only a zero `max_crew` is rejected.
    pub fn from_snapshot(snapshot: &UnitSnapshot, morale_config: &MoraleConfig) -> Result<Unit> {
        if snapshot.max_crew == 0 {
            return Err(BattleError::InvalidRoster(format!(
                "unit {} has max_crew 0",
                snapshot.id
            )));
        }
        if snapshot.crew > snapshot.max_crew {
            tracing::warn!(
                unit = snapshot.id,
                crew = snapshot.crew,
                max_crew = snapshot.max_crew,
                "Roster crew exceeds max crew, clamping"
            );
        }

        let mut unit = Unit::new(
            UnitId(snapshot.id),
            snapshot.side,
            TroopType::resolve_id(&snapshot.troop_type),
            snapshot.max_crew,
        );
        unit.stats = UnitStats {
            leadership: snapshot.leadership,
            strength: snapshot.strength,
            intelligence: snapshot.intelligence,
        };
        unit.set_crew(snapshot.crew);
        unit.training = snapshot.training.min(100);
        unit.set_morale(snapshot.morale);
        unit.rout = initial_state(unit.morale, morale_config);
        unit.vulnerable = unit.rout == RoutState::Routed;
        unit.formation = Formation::resolve_id(&snapshot.formation);
        unit.stance = snapshot.stance;
        unit.position = Vec3::from_array(snapshot.position);
        Ok(unit)
    }

    /// Post-tick state for the roster service
    pub fn delta(&self) -> UnitDelta {
        UnitDelta {
            id: self.id,
            crew: self.crew,
            morale: self.morale,
            rout: self.rout,
            position: self.position,
        }
    }
}

/// Initial unit state as supplied by the roster service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub side: Side,
    pub troop_type: String,
    pub leadership: u32,
    pub strength: u32,
    pub intelligence: u32,
    pub crew: u32,
    pub max_crew: u32,
    #[serde(default = "default_training")]
    pub training: u8,
    #[serde(default = "default_morale")]
    pub morale: f32,
    #[serde(default = "default_formation")]
    pub formation: String,
    #[serde(default)]
    pub stance: Stance,
    #[serde(default)]
    pub position: [f32; 3],
}

fn default_training() -> u8 {
    50
}

fn default_morale() -> f32 {
    MAX_MORALE
}

fn default_formation() -> String {
    Formation::default().id().to_string()
}

/// Per-unit state change reported after each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDelta {
    pub id: UnitId,
    pub crew: u32,
    pub morale: f32,
    pub rout: RoutState,
    pub position: Vec3,
}
