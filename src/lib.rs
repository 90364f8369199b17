//! Tactical Core - deterministic battle simulation with pooled combat effects

pub mod battle;
pub mod core;
pub mod vfx;

pub use crate::battle::{Battle, BattleOutcome, TickReport, UnitSnapshot};
pub use crate::core::{BattleConfig, BattleError, BattleId, Result, Side, UnitId};
