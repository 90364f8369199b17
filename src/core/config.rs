//! Battle configuration with documented constants
//!
//! Every balance number the core uses is reachable from here, so one TOML
//! file (`data/battle.toml`) versions the whole table. Defaults come from
//! `battle::constants`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::constants::*;
use crate::core::error::{BattleError, Result};

/// Configuration for a single battle instance
///
/// Passed explicitly into `Battle::new`; there is no process-wide copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Version of the balance table (counters + modifiers)
    pub balance_version: u32,
    pub tick: TickConfig,
    pub combat: CombatConfig,
    pub morale: MoraleConfig,
    pub vfx: VfxConfig,
    /// Troop-type counter entries, keyed by troop ids
    #[serde(rename = "counter")]
    pub counters: Vec<CounterEntry>,
}

/// Fixed-step logic clock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Logic ticks per second
    pub logic_hz: u32,
    /// Upper bound on logic steps run for one render frame
    ///
    /// Keeps a long stall from turning into a spiral of catch-up work.
    pub max_catch_up_steps: u32,
    /// Battle ends in a draw after this many ticks
    pub max_ticks: u64,
}

/// Combat resolution tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Upper bound on evasion chance
    pub evade_cap: f32,
    /// Upper bound on critical chance
    pub crit_cap: f32,
    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,
    /// Crew count at which a unit fights at full frontage
    ///
    /// `crew / crew_normalization` is clamped to 1.0, so larger units
    /// do not scale damage past this point.
    pub crew_normalization: f32,
    pub random_factor_min: f32,
    pub random_factor_max: f32,
    /// Band the net formation multiplier is clamped to
    pub formation_multiplier_min: f32,
    pub formation_multiplier_max: f32,
    /// Return fire scale relative to a full strike
    pub counter_fire_ratio: f32,
    /// Incoming damage multiplier for routed units
    pub routed_vulnerability: f32,
    /// Bonus for enveloping formations against open flanks
    pub envelopment_bonus: f32,
    /// How much training (0-100) adds to force; 0.5 = +50% at 100
    pub training_weight: f32,
}

/// Morale and rout tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoraleConfig {
    /// Steady -> Shaken at or below this morale
    pub enter_shaken: f32,
    /// Any state -> Routed at or below this morale
    pub enter_routed: f32,
    /// Routed -> Shaken strictly above this morale
    pub exit_routed: f32,
    /// Shaken -> Steady strictly above this morale
    pub exit_shaken: f32,
    /// Morale lost per 100% of max crew lost in one exchange
    pub casualty_scale: f32,
    /// Morale gained by the winning side of an exchange
    pub victor_gain: f32,
    /// Extra morale lost when enveloped
    pub flank_shock: f32,
    /// Morale regained per tick by units out of combat
    pub idle_recovery: f32,
    /// Morale lost by nearby allies when a unit routs
    pub contagion_penalty: f32,
    /// Radius (world units) of rout contagion
    pub contagion_radius: f32,
}

/// Effect pipeline tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VfxConfig {
    /// Hard capacity of the per-battle event bus
    pub bus_capacity: usize,
    /// In-flight projectile pool size
    pub projectile_capacity: usize,
    /// Pool size for each impact preset
    pub impact_particle_capacity: usize,
    /// Pool size for fire and smoke
    pub lingering_particle_capacity: usize,
    /// Pool size for each weather particle kind
    pub weather_particle_capacity: usize,
    /// Ambient weather particles spawned per second of render time
    pub weather_particles_per_second: f32,
    /// Cosmetic bursts closer than this merge under bus overflow
    pub coalesce_radius: f32,
}

/// A single troop counter entry as it appears in TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterEntry {
    pub attacker: String,
    pub defender: String,
    pub multiplier: f32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            balance_version: BALANCE_VERSION,
            tick: TickConfig::default(),
            combat: CombatConfig::default(),
            morale: MoraleConfig::default(),
            vfx: VfxConfig::default(),
            counters: default_counters(),
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            logic_hz: LOGIC_TICK_HZ,
            max_catch_up_steps: MAX_CATCH_UP_STEPS,
            max_ticks: MAX_BATTLE_TICKS,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            evade_cap: EVADE_CAP,
            crit_cap: CRIT_CAP,
            crit_multiplier: CRIT_MULTIPLIER,
            crew_normalization: CREW_NORMALIZATION,
            random_factor_min: RANDOM_FACTOR_MIN,
            random_factor_max: RANDOM_FACTOR_MAX,
            formation_multiplier_min: FORMATION_MULTIPLIER_MIN,
            formation_multiplier_max: FORMATION_MULTIPLIER_MAX,
            counter_fire_ratio: COUNTER_FIRE_RATIO,
            routed_vulnerability: ROUTED_VULNERABILITY,
            envelopment_bonus: ENVELOPMENT_BONUS,
            training_weight: TRAINING_WEIGHT,
        }
    }
}

impl Default for MoraleConfig {
    fn default() -> Self {
        Self {
            enter_shaken: ENTER_SHAKEN_MORALE,
            enter_routed: ENTER_ROUTED_MORALE,
            exit_routed: EXIT_ROUTED_MORALE,
            exit_shaken: EXIT_SHAKEN_MORALE,
            casualty_scale: CASUALTY_MORALE_SCALE,
            victor_gain: VICTOR_MORALE_GAIN,
            flank_shock: FLANK_MORALE_SHOCK,
            idle_recovery: IDLE_MORALE_RECOVERY,
            contagion_penalty: ROUT_CONTAGION_PENALTY,
            contagion_radius: ROUT_CONTAGION_RADIUS,
        }
    }
}

impl Default for VfxConfig {
    fn default() -> Self {
        Self {
            bus_capacity: VFX_BUS_CAPACITY,
            projectile_capacity: PROJECTILE_POOL_CAPACITY,
            impact_particle_capacity: IMPACT_PARTICLE_CAPACITY,
            lingering_particle_capacity: LINGERING_PARTICLE_CAPACITY,
            weather_particle_capacity: WEATHER_PARTICLE_CAPACITY,
            weather_particles_per_second: WEATHER_PARTICLES_PER_SECOND,
            coalesce_radius: COALESCE_RADIUS,
        }
    }
}

/// The counters evidenced for the standard ruleset
fn default_counters() -> Vec<CounterEntry> {
    STANDARD_COUNTERS
        .iter()
        .map(|&(attacker, defender, multiplier)| CounterEntry {
            attacker: attacker.to_string(),
            defender: defender.to_string(),
            multiplier,
        })
        .collect()
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a config from TOML text
    ///
    /// Missing sections and fields fall back to defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let tick = &self.tick;
        if tick.logic_hz == 0 || tick.max_catch_up_steps == 0 {
            return Err(invalid("tick rate and catch-up steps must be positive"));
        }

        let combat = &self.combat;
        if combat.random_factor_min < 0.0 || combat.random_factor_min > combat.random_factor_max {
            return Err(invalid(format!(
                "random factor band [{}, {}] is inverted or negative",
                combat.random_factor_min, combat.random_factor_max
            )));
        }
        if combat.formation_multiplier_min <= 0.0
            || combat.formation_multiplier_min > combat.formation_multiplier_max
        {
            return Err(invalid(format!(
                "formation multiplier band [{}, {}] is inverted or non-positive",
                combat.formation_multiplier_min, combat.formation_multiplier_max
            )));
        }
        if combat.crew_normalization <= 0.0 {
            return Err(invalid("crew_normalization must be positive"));
        }
        if !(0.0..=1.0).contains(&combat.evade_cap) || !(0.0..=1.0).contains(&combat.crit_cap) {
            return Err(invalid("evade_cap and crit_cap must be within [0, 1]"));
        }
        if combat.crit_multiplier < 1.0 || combat.routed_vulnerability < 1.0 {
            return Err(invalid("crit and vulnerability multipliers must be >= 1"));
        }

        // Hysteresis only holds with the bands strictly nested
        let m = &self.morale;
        let ordered = 0.0 <= m.enter_routed
            && m.enter_routed < m.exit_routed
            && m.exit_routed <= m.enter_shaken
            && m.enter_shaken < m.exit_shaken
            && m.exit_shaken <= 100.0;
        if !ordered {
            return Err(invalid(format!(
                "morale thresholds must satisfy 0 <= enter_routed ({}) < exit_routed ({}) <= enter_shaken ({}) < exit_shaken ({}) <= 100",
                m.enter_routed, m.exit_routed, m.enter_shaken, m.exit_shaken
            )));
        }

        let vfx = &self.vfx;
        if vfx.bus_capacity == 0
            || vfx.projectile_capacity == 0
            || vfx.impact_particle_capacity == 0
            || vfx.lingering_particle_capacity == 0
            || vfx.weather_particle_capacity == 0
        {
            return Err(invalid("vfx capacities must be positive"));
        }

        if let Some(entry) = self.counters.iter().find(|c| c.multiplier <= 0.0) {
            return Err(invalid(format!(
                "counter {} -> {} has non-positive multiplier {}",
                entry.attacker, entry.defender, entry.multiplier
            )));
        }

        Ok(())
    }

    /// Seconds of simulated time per logic tick
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick.logic_hz as f32
    }
}

fn invalid(msg: impl Into<String>) -> BattleError {
    BattleError::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BattleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_counters_present() {
        let config = BattleConfig::default();
        assert_eq!(config.counters.len(), STANDARD_COUNTERS.len());
        assert!(config
            .counters
            .iter()
            .any(|c| c.attacker == "footman" && c.defender == "archer"));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = BattleConfig::from_toml_str(
            r#"
            balance_version = 7

            [combat]
            crit_cap = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.balance_version, 7);
        assert_eq!(config.combat.crit_cap, 0.1);
        assert_eq!(config.combat.evade_cap, EVADE_CAP);
        assert_eq!(config.morale.enter_routed, ENTER_ROUTED_MORALE);
    }

    #[test]
    fn test_counter_entries_parse() {
        let config = BattleConfig::from_toml_str(
            r#"
            [[counter]]
            attacker = "cavalry"
            defender = "siege"
            multiplier = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.counters.len(), 1);
        assert_eq!(config.counters[0].multiplier, 1.5);
    }

    #[test]
    fn test_inverted_morale_bands_rejected() {
        let mut config = BattleConfig::default();
        config.morale.exit_routed = 15.0; // below enter_routed

        assert!(matches!(
            config.validate(),
            Err(BattleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_random_band_rejected() {
        let mut config = BattleConfig::default();
        config.combat.random_factor_min = 1.5;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = BattleConfig::default();
        config.vfx.impact_particle_capacity = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_error() {
        let result = BattleConfig::from_toml_str("[combat\ncrit_cap = ");
        assert!(matches!(result, Err(BattleError::TomlError(_))));
    }

    #[test]
    fn test_tick_seconds() {
        let config = BattleConfig::default();
        assert!((config.tick_seconds() - 1.0 / LOGIC_TICK_HZ as f32).abs() < 1e-6);
    }
}
