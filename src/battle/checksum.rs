//! Replay checksums
//!
//! Each tick folds every unit's crew, morale and rout state into a rolling
//! FNV-1a hash. Two runs with the same seed, roster and commands produce
//! the same sequence; the first differing tick pinpoints a desync.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;

use crate::battle::morale::RoutState;
use crate::battle::units::Unit;
use crate::core::types::{Tick, UnitId};

/// Deterministic FNV-1a 64-bit hasher
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Fold one tick's unit state into the running checksum
pub fn fold_tick(previous: u64, tick: Tick, units: &BTreeMap<UnitId, Unit>) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write_u64(previous);
    hasher.write_u64(tick);
    for unit in units.values() {
        hasher.write_u32(unit.id.0);
        hasher.write_u32(unit.crew());
        hasher.write_u32(unit.morale().to_bits());
        hasher.write_u8(match unit.rout {
            RoutState::Steady => 0,
            RoutState::Shaken => 1,
            RoutState::Routed => 2,
        });
    }
    hasher.finish()
}

/// First tick at which two replays disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMismatch {
    pub tick: Tick,
    pub expected: u64,
    pub actual: u64,
}

/// Per-tick checksums of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    entries: Vec<(Tick, u64)>,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: Tick, checksum: u64) {
        self.entries.push((tick, checksum));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checksum after the last recorded tick
    pub fn last(&self) -> Option<u64> {
        self.entries.last().map(|(_, c)| *c)
    }

    /// Compare against a reference run
    ///
    /// Only the common prefix is compared; a shorter run is not a mismatch.
    pub fn compare(&self, actual: &ReplayLog) -> Option<ReplayMismatch> {
        let mismatch = self
            .entries
            .iter()
            .zip(actual.entries.iter())
            .find(|(e, a)| e != a)
            .map(|(e, a)| ReplayMismatch {
                tick: e.0.min(a.0),
                expected: e.1,
                actual: a.1,
            });

        if let Some(m) = &mismatch {
            tracing::warn!(
                tick = m.tick,
                expected = m.expected,
                actual = m.actual,
                "Replay diverged"
            );
        }
        mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::matchup::TroopType;
    use crate::core::types::Side;

    fn units() -> BTreeMap<UnitId, Unit> {
        let mut map = BTreeMap::new();
        map.insert(UnitId(1), Unit::new(UnitId(1), Side::Attacker, TroopType::Footman, 100));
        map.insert(UnitId(2), Unit::new(UnitId(2), Side::Defender, TroopType::Archer, 100));
        map
    }

    #[test]
    fn test_fnv_known_vector() {
        // FNV-1a 64 of "a"
        let mut h = FnvHasher::new();
        h.write(b"a");
        assert_eq!(h.finish(), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_default_matches_new() {
        assert_eq!(FnvHasher::default().finish(), FnvHasher::new().finish());
    }

    #[test]
    fn test_fold_is_state_sensitive() {
        let mut a = units();
        let b = units();
        assert_eq!(fold_tick(0, 1, &a), fold_tick(0, 1, &b));

        a.get_mut(&UnitId(2)).unwrap().apply_casualties(1);
        assert_ne!(fold_tick(0, 1, &a), fold_tick(0, 1, &b));
        assert_ne!(fold_tick(0, 1, &b), fold_tick(0, 2, &b));
    }

    #[test]
    fn test_compare_finds_first_divergence() {
        let mut expected = ReplayLog::new();
        let mut actual = ReplayLog::new();
        for tick in 1..=5 {
            expected.record(tick, tick * 10);
            actual.record(tick, if tick >= 3 { 0 } else { tick * 10 });
        }

        let m = expected.compare(&actual).unwrap();
        assert_eq!(m.tick, 3);
        assert_eq!(m.expected, 30);
        assert_eq!(m.actual, 0);
    }

    #[test]
    fn test_identical_logs_match() {
        let mut log = ReplayLog::new();
        log.record(1, 99);
        assert!(log.compare(&log.clone()).is_none());
    }
}
