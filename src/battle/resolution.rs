//! Per-engagement combat resolution
//!
//! `resolve` is pure: it reads two units and the context, draws from the
//! supplied generator, and returns a `CombatEvent`. Callers apply the
//! deltas. Draw order is fixed (evasion, random factor, crit, counter
//! factor) so a seeded generator replays exactly.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::{CRIT_LEADERSHIP_DIVISOR, EVADE_LEADERSHIP_DIVISOR};
use crate::battle::formation::Formation;
use crate::battle::matchup::{AttackStyle, MatchupTable, TroopType};
use crate::battle::terrain::{BattleContext, Terrain};
use crate::battle::units::Unit;
use crate::core::config::CombatConfig;
use crate::core::types::{Tick, UnitId};

/// Outcome of one attacker-vs-defender exchange
///
/// Consumed once by the state update and once by the effect pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub attacker_id: UnitId,
    pub defender_id: UnitId,
    pub tick: Tick,
    /// Crew the defender loses
    pub damage: u32,
    /// Crew the attacker loses to return fire
    pub counter_damage: u32,
    pub is_critical: bool,
    pub is_evaded: bool,
    pub defender_died: bool,
    pub attacker_died: bool,
    /// Attacker's formation wrapped the defender's flanks
    pub enveloped: bool,
    pub attack_style: AttackStyle,
    pub attacker_troop: TroopType,
    pub defender_troop: TroopType,
    pub origin: Vec3,
    pub target: Vec3,
}

impl CombatEvent {
    /// A zero-damage event between two units
    pub fn empty(attacker_id: UnitId, defender_id: UnitId, tick: Tick) -> Self {
        Self {
            attacker_id,
            defender_id,
            tick,
            damage: 0,
            counter_damage: 0,
            is_critical: false,
            is_evaded: false,
            defender_died: false,
            attacker_died: false,
            enveloped: false,
            attack_style: AttackStyle::Melee,
            attacker_troop: TroopType::Irregular,
            defender_troop: TroopType::Irregular,
            origin: Vec3::ZERO,
            target: Vec3::ZERO,
        }
    }

    /// Did anyone lose crew?
    pub fn has_casualties(&self) -> bool {
        self.damage > 0 || self.counter_damage > 0
    }
}

/// Read-only inputs shared by every resolution in a tick
#[derive(Debug, Clone, Copy)]
pub struct EngagementContext<'a> {
    pub combat: &'a CombatConfig,
    pub matchups: &'a MatchupTable,
    pub battle: BattleContext,
    pub tick: Tick,
}

/// Resolve one strike from `attacker` against `defender`, with return fire
pub fn resolve<R: Rng + ?Sized>(
    attacker: &Unit,
    defender: &Unit,
    ctx: &EngagementContext<'_>,
    rng: &mut R,
) -> CombatEvent {
    let config = ctx.combat;
    let mut event = CombatEvent {
        attack_style: attacker.troop_type.attack_style(),
        attacker_troop: attacker.troop_type,
        defender_troop: defender.troop_type,
        origin: attacker.position,
        target: defender.position,
        ..CombatEvent::empty(attacker.id, defender.id, ctx.tick)
    };

    // 1. Evasion
    let evade = evade_chance(attacker, defender, config);
    if rng.gen::<f32>() < evade {
        event.is_evaded = true;
        return event;
    }

    // 2-4. Base damage
    let counter = ctx
        .matchups
        .multiplier(attacker.troop_type, defender.troop_type);
    let (formation, enveloped) =
        formation_multiplier(attacker.formation, defender.formation, config);
    let random = rng.gen_range(config.random_factor_min..=config.random_factor_max);
    let mut damage = attacker.force(config.training_weight)
        * crew_factor(attacker.crew(), config)
        * counter
        * formation
        * random
        * ctx.battle.weather_modifier(event.attack_style)
        / ctx.battle.terrain.defense_multiplier();
    if defender.vulnerable {
        damage *= config.routed_vulnerability;
    }

    // 5. Critical
    if rng.gen::<f32>() < crit_chance(attacker, config) {
        event.is_critical = true;
        damage *= config.crit_multiplier;
    }

    // 6. Apply
    event.enveloped = enveloped;
    event.damage = to_casualties(damage);
    let defender_crew = defender.crew().saturating_sub(event.damage);
    event.defender_died = defender_crew == 0;

    // 7. Return fire from whoever is left, if they can reach
    if !event.defender_died && can_return_fire(attacker, defender) {
        let (formation, _) = formation_multiplier(defender.formation, attacker.formation, config);
        let random = rng.gen_range(config.random_factor_min..=config.random_factor_max);
        let style = defender.troop_type.attack_style();
        let counter_damage = defender.force(config.training_weight)
            * crew_factor(defender_crew, config)
            * ctx
                .matchups
                .multiplier(defender.troop_type, attacker.troop_type)
            * formation
            * random
            * ctx.battle.weather_modifier(style)
            * config.counter_fire_ratio;
        event.counter_damage = to_casualties(counter_damage);
        event.attacker_died = attacker.crew() <= event.counter_damage;
    }

    event
}

/// Chance the defender slips the blow entirely
pub fn evade_chance(attacker: &Unit, defender: &Unit, config: &CombatConfig) -> f32 {
    let gap = defender.stats.leadership as f32 - attacker.stats.leadership as f32;
    (gap / EVADE_LEADERSHIP_DIVISOR).clamp(0.0, config.evade_cap)
}

/// Chance the attacker lands a critical strike
pub fn crit_chance(attacker: &Unit, config: &CombatConfig) -> f32 {
    (attacker.stats.leadership as f32 / CRIT_LEADERSHIP_DIVISOR).min(config.crit_cap)
}

/// Net formation multiplier (attack over defense, clamped) and whether
/// the attacker envelops the defender
pub fn formation_multiplier(
    attacker: Formation,
    defender: Formation,
    config: &CombatConfig,
) -> (f32, bool) {
    let enveloped = attacker.envelops(defender);
    let mut raw = attacker.modifiers().attack / defender.modifiers().defense;
    if enveloped {
        raw *= config.envelopment_bonus;
    }
    (
        raw.clamp(
            config.formation_multiplier_min,
            config.formation_multiplier_max,
        ),
        enveloped,
    )
}

/// Upper bound on `damage / attacker force` for any single strike
pub fn max_damage_multiplier(config: &CombatConfig, matchups: &MatchupTable) -> f32 {
    matchups.max_multiplier()
        * config.formation_multiplier_max
        * config.random_factor_max
        * config.crit_multiplier
        * config.routed_vulnerability
        / Terrain::min_defense_multiplier()
}

fn crew_factor(crew: u32, config: &CombatConfig) -> f32 {
    (crew as f32 / config.crew_normalization).clamp(0.0, 1.0)
}

fn can_return_fire(attacker: &Unit, defender: &Unit) -> bool {
    defender.can_attack_back() && defender.distance_to(attacker) <= defender.troop_type.attack_range()
}

fn to_casualties(damage: f32) -> u32 {
    if damage.is_finite() && damage > 0.0 {
        damage.round() as u32
    } else {
        0
    }
}
