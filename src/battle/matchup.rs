//! Troop types and the troop-vs-troop counter table
//!
//! Counters are sparse: any pair not in the table fights at 1.0.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::constants::{MELEE_RANGE, STANDARD_COUNTERS};
use crate::core::config::BattleConfig;
use crate::vfx::projectile::TrajectoryKind;

/// Type of troop (or hull, for fleet battles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopType {
    Footman,
    Archer,
    Cavalry,
    Siege,
    Mage,
    Warship,
    /// Fallback for unrecognized troop ids; has no counters
    Irregular,
}

/// How a troop type delivers damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackStyle {
    Melee,
    Ranged,
    Siege,
    Magic,
}

/// Flight characteristics of a troop type's projectiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileProfile {
    pub trajectory: TrajectoryKind,
    /// World units per second; ignored for instant trajectories
    pub speed: f32,
}

impl TroopType {
    pub fn all() -> &'static [TroopType] {
        &[
            TroopType::Footman,
            TroopType::Archer,
            TroopType::Cavalry,
            TroopType::Siege,
            TroopType::Mage,
            TroopType::Warship,
            TroopType::Irregular,
        ]
    }

    /// Parse a roster troop id (case-insensitive)
    pub fn from_id(id: &str) -> Option<TroopType> {
        match id.trim().to_ascii_lowercase().as_str() {
            "footman" => Some(TroopType::Footman),
            "archer" => Some(TroopType::Archer),
            "cavalry" => Some(TroopType::Cavalry),
            "siege" => Some(TroopType::Siege),
            "mage" => Some(TroopType::Mage),
            "warship" => Some(TroopType::Warship),
            "irregular" => Some(TroopType::Irregular),
            _ => None,
        }
    }

    /// Parse a troop id, falling back to `Irregular` with a warning
    pub fn resolve_id(id: &str) -> TroopType {
        Self::from_id(id).unwrap_or_else(|| {
            tracing::warn!(troop_id = id, "Unknown troop type, treating as irregular");
            TroopType::Irregular
        })
    }

    pub fn id(&self) -> &'static str {
        match self {
            TroopType::Footman => "footman",
            TroopType::Archer => "archer",
            TroopType::Cavalry => "cavalry",
            TroopType::Siege => "siege",
            TroopType::Mage => "mage",
            TroopType::Warship => "warship",
            TroopType::Irregular => "irregular",
        }
    }

    pub fn attack_style(&self) -> AttackStyle {
        match self {
            TroopType::Footman | TroopType::Cavalry | TroopType::Irregular => AttackStyle::Melee,
            TroopType::Archer | TroopType::Warship => AttackStyle::Ranged,
            TroopType::Siege => AttackStyle::Siege,
            TroopType::Mage => AttackStyle::Magic,
        }
    }

    /// Maximum distance at which this troop type can strike
    pub fn attack_range(&self) -> f32 {
        match self {
            TroopType::Footman | TroopType::Cavalry | TroopType::Irregular => MELEE_RANGE,
            TroopType::Archer => 40.0,
            TroopType::Siege => 60.0,
            TroopType::Mage => 30.0,
            TroopType::Warship => 80.0,
        }
    }

    /// Travel speed in world units per second
    pub fn movement_speed(&self) -> f32 {
        match self {
            TroopType::Footman | TroopType::Archer | TroopType::Mage => 1.5,
            TroopType::Irregular => 1.6,
            TroopType::Cavalry => 4.0,
            TroopType::Siege => 0.8,
            TroopType::Warship => 3.0,
        }
    }

    /// Projectile used when this troop type attacks, if any
    pub fn projectile(&self) -> Option<ProjectileProfile> {
        match self {
            TroopType::Archer => Some(ProjectileProfile {
                trajectory: TrajectoryKind::Parabolic,
                speed: 60.0,
            }),
            TroopType::Siege => Some(ProjectileProfile {
                trajectory: TrajectoryKind::Parabolic,
                speed: 35.0,
            }),
            TroopType::Mage => Some(ProjectileProfile {
                trajectory: TrajectoryKind::Instant,
                speed: 0.0,
            }),
            TroopType::Warship => Some(ProjectileProfile {
                trajectory: TrajectoryKind::Linear,
                speed: 120.0,
            }),
            TroopType::Footman | TroopType::Cavalry | TroopType::Irregular => None,
        }
    }
}

/// Sparse (attacker, defender) -> damage multiplier table
#[derive(Debug, Clone)]
pub struct MatchupTable {
    version: u32,
    counters: AHashMap<(TroopType, TroopType), f32>,
}

impl Default for MatchupTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl MatchupTable {
    /// Empty table: every pair fights at 1.0
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            counters: AHashMap::new(),
        }
    }

    /// The shipped counters
    pub fn standard() -> Self {
        let mut table = Self::empty(crate::battle::constants::BALANCE_VERSION);
        for &(attacker, defender, multiplier) in STANDARD_COUNTERS {
            if let (Some(a), Some(d)) = (TroopType::from_id(attacker), TroopType::from_id(defender))
            {
                table.insert(a, d, multiplier);
            }
        }
        table
    }

    /// Build the table from a config's `[[counter]]` entries
    ///
    /// Entries naming unknown troop ids are skipped with a warning.
    pub fn from_config(config: &BattleConfig) -> Self {
        let mut table = Self::empty(config.balance_version);
        for entry in &config.counters {
            match (
                TroopType::from_id(&entry.attacker),
                TroopType::from_id(&entry.defender),
            ) {
                (Some(a), Some(d)) => table.insert(a, d, entry.multiplier),
                _ => tracing::warn!(
                    attacker = %entry.attacker,
                    defender = %entry.defender,
                    "Skipping counter entry with unknown troop id"
                ),
            }
        }
        table
    }

    pub fn insert(&mut self, attacker: TroopType, defender: TroopType, multiplier: f32) {
        self.counters.insert((attacker, defender), multiplier);
    }

    /// Damage multiplier when `attacker` strikes `defender`
    pub fn multiplier(&self, attacker: TroopType, defender: TroopType) -> f32 {
        self.counters
            .get(&(attacker, defender))
            .copied()
            .unwrap_or(1.0)
    }

    /// Largest multiplier any pair can produce (never below 1.0)
    pub fn max_multiplier(&self) -> f32 {
        self.counters.values().copied().fold(1.0, f32::max)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
