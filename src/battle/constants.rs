//! Battle system constants - all tunable values in one place
//!
//! These are the defaults behind `BattleConfig`. Bump `BALANCE_VERSION`
//! whenever a number here changes so replays can tell tables apart.

/// Version of the shipped balance table
pub const BALANCE_VERSION: u32 = 1;

// Time
pub const LOGIC_TICK_HZ: u32 = 10;
pub const MAX_CATCH_UP_STEPS: u32 = 5;
pub const MAX_BATTLE_TICKS: u64 = 6000; // 10 minutes at 10 Hz

// Evasion and criticals
pub const EVADE_CAP: f32 = 0.30;
pub const EVADE_LEADERSHIP_DIVISOR: f32 = 200.0;
pub const CRIT_CAP: f32 = 0.25;
pub const CRIT_LEADERSHIP_DIVISOR: f32 = 300.0;
pub const CRIT_MULTIPLIER: f32 = 2.0;

// Damage
pub const CREW_NORMALIZATION: f32 = 1000.0;
pub const RANDOM_FACTOR_MIN: f32 = 0.8;
pub const RANDOM_FACTOR_MAX: f32 = 1.2;
pub const FORMATION_MULTIPLIER_MIN: f32 = 0.3;
pub const FORMATION_MULTIPLIER_MAX: f32 = 2.5;
pub const COUNTER_FIRE_RATIO: f32 = 0.5;
pub const ROUTED_VULNERABILITY: f32 = 1.5;
pub const ENVELOPMENT_BONUS: f32 = 1.15;
pub const TRAINING_WEIGHT: f32 = 0.5;

/// Troop counters evidenced for the standard ruleset: (attacker, defender, multiplier)
pub const STANDARD_COUNTERS: &[(&str, &str, f32)] = &[
    ("footman", "archer", 1.3),
    ("archer", "cavalry", 1.2),
    ("cavalry", "footman", 1.2),
    ("cavalry", "siege", 1.5),
];

// Morale (0-100 scale), hysteresis bands
pub const MAX_MORALE: f32 = 100.0;
pub const ENTER_SHAKEN_MORALE: f32 = 40.0;
pub const ENTER_ROUTED_MORALE: f32 = 20.0;
pub const EXIT_ROUTED_MORALE: f32 = 35.0;
pub const EXIT_SHAKEN_MORALE: f32 = 50.0;
pub const CASUALTY_MORALE_SCALE: f32 = 100.0;
pub const VICTOR_MORALE_GAIN: f32 = 1.0;
pub const FLANK_MORALE_SHOCK: f32 = 3.0;
pub const IDLE_MORALE_RECOVERY: f32 = 0.2;
pub const ROUT_CONTAGION_PENALTY: f32 = 5.0;
pub const ROUT_CONTAGION_RADIUS: f32 = 30.0;

// Movement and ranges (world units)
pub const MELEE_RANGE: f32 = 3.0;
/// Slack on attack range checks; closing units aim this far inside range
pub const RANGE_EPSILON: f32 = 0.05;
pub const ROUT_SPEED_MULTIPLIER: f32 = 1.2;

// Rendering hints
/// Crew represented by one rendered model (soldier figure or ship)
pub const CREW_PER_MODEL: u32 = 10;
pub const MAX_MODELS_PER_UNIT: u32 = 64;
pub const DEFAULT_MODEL_SPACING: f32 = 1.5;

// Effect pipeline
pub const VFX_BUS_CAPACITY: usize = 256;
pub const PROJECTILE_POOL_CAPACITY: usize = 128;
pub const IMPACT_PARTICLE_CAPACITY: usize = 64;
pub const LINGERING_PARTICLE_CAPACITY: usize = 48;
pub const WEATHER_PARTICLE_CAPACITY: usize = 256;
pub const WEATHER_PARTICLES_PER_SECOND: f32 = 40.0;
pub const COALESCE_RADIUS: f32 = 4.0;
/// Height of a parabolic arc as a fraction of horizontal distance
pub const PARABOLIC_ARC_FACTOR: f32 = 0.25;
/// Slack when comparing projectile elapsed time against flight time
pub const ARRIVAL_EPSILON: f32 = 1e-4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hysteresis_bands_nested() {
        assert!(ENTER_ROUTED_MORALE < EXIT_ROUTED_MORALE);
        assert!(EXIT_ROUTED_MORALE <= ENTER_SHAKEN_MORALE);
        assert!(ENTER_SHAKEN_MORALE < EXIT_SHAKEN_MORALE);
        assert!(EXIT_SHAKEN_MORALE <= MAX_MORALE);
    }

    #[test]
    fn test_random_band_contains_one() {
        assert!(RANDOM_FACTOR_MIN < 1.0 && RANDOM_FACTOR_MAX > 1.0);
    }

    #[test]
    fn test_formation_band_contains_one() {
        assert!(FORMATION_MULTIPLIER_MIN < 1.0 && FORMATION_MULTIPLIER_MAX > 1.0);
    }

    #[test]
    fn test_range_slack_is_small() {
        assert!(RANGE_EPSILON > 0.0 && RANGE_EPSILON < MELEE_RANGE * 0.1);
    }

    #[test]
    fn test_counter_fire_is_skirmish_scale() {
        assert!(COUNTER_FIRE_RATIO > 0.0 && COUNTER_FIRE_RATIO < 1.0);
    }
}
