//! Battle simulation - deterministic tick-driven combat between two sides
//!
//! Everything that affects the outcome lives here and draws randomness only
//! from the battle's seeded streams. Visual effects are published out to
//! `crate::vfx` and never feed back.

pub mod checksum;
pub mod clock;
pub mod commands;
pub mod constants;
pub mod engagement;
pub mod execution;
pub mod formation;
pub mod matchup;
pub mod morale;
pub mod movement;
pub mod placement;
pub mod resolution;
pub mod rng;
pub mod terrain;
pub mod units;

// Re-exports for convenient access
pub use checksum::{fold_tick, FnvHasher, ReplayLog, ReplayMismatch};
pub use clock::FixedStepClock;
pub use commands::{apply_command, CommandKind, CommandOutcome, StandingOrder, UnitCommand};
pub use constants::*;
pub use engagement::{
    approach_distance, nearest_enemy, plan_engagements, pursuit_target, within_reach, Engagement,
};
pub use execution::{Battle, BattleOutcome, BattlePhase, TickReport};
pub use formation::{Formation, FormationModifiers};
pub use matchup::{AttackStyle, MatchupTable, ProjectileProfile, TroopType};
pub use morale::{MoraleTracker, RoutState, RoutTransition};
pub use movement::{advance_units, step_toward};
pub use placement::{layout, place, visible_count};
pub use resolution::{resolve, CombatEvent, EngagementContext};
pub use rng::BattleRng;
pub use terrain::{BattleContext, Terrain, Weather};
pub use units::{Stance, Unit, UnitDelta, UnitSnapshot, UnitStats};
