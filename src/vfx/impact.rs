//! Impact dispatch: which effect preset a hit produces
//!
//! The mapping is total. Every request resolves to exactly one preset,
//! falling back to `Generic` when nothing more specific applies.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::battle::matchup::{AttackStyle, TroopType};
use crate::battle::resolution::CombatEvent;
use crate::battle::terrain::BattleContext;

/// Closed set of impact effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactPreset {
    Spark,
    Dust,
    Blood,
    Explosion,
    MagicBurst,
    Splash,
    Debris,
    /// Whiff for a dodged strike; carries no damage connotation
    Evade,
    Generic,
}

impl ImpactPreset {
    pub const ALL: [ImpactPreset; 9] = [
        ImpactPreset::Spark,
        ImpactPreset::Dust,
        ImpactPreset::Blood,
        ImpactPreset::Explosion,
        ImpactPreset::MagicBurst,
        ImpactPreset::Splash,
        ImpactPreset::Debris,
        ImpactPreset::Evade,
        ImpactPreset::Generic,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ImpactPreset::Spark => "spark",
            ImpactPreset::Dust => "dust",
            ImpactPreset::Blood => "blood",
            ImpactPreset::Explosion => "explosion",
            ImpactPreset::MagicBurst => "magic_burst",
            ImpactPreset::Splash => "splash",
            ImpactPreset::Debris => "debris",
            ImpactPreset::Evade => "evade",
            ImpactPreset::Generic => "generic",
        }
    }

    /// Does this preset depict a hit that did damage?
    pub fn is_damage_based(&self) -> bool {
        !matches!(self, ImpactPreset::Evade)
    }

    /// Particles emitted per impact (doubled on a critical)
    pub fn burst_size(&self) -> u32 {
        match self {
            ImpactPreset::Explosion => 24,
            ImpactPreset::Debris | ImpactPreset::MagicBurst => 16,
            ImpactPreset::Blood | ImpactPreset::Splash | ImpactPreset::Dust => 10,
            ImpactPreset::Spark => 8,
            ImpactPreset::Generic => 6,
            ImpactPreset::Evade => 3,
        }
    }

    /// Particle lifetime in seconds
    pub fn ttl(&self) -> f32 {
        match self {
            ImpactPreset::Explosion | ImpactPreset::Debris => 1.2,
            ImpactPreset::Dust => 1.0,
            ImpactPreset::MagicBurst | ImpactPreset::Splash => 0.8,
            ImpactPreset::Blood => 0.7,
            ImpactPreset::Spark | ImpactPreset::Generic => 0.5,
            ImpactPreset::Evade => 0.3,
        }
    }
}

/// Everything the dispatcher needs to know about one hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRequest {
    pub attacker_troop: TroopType,
    pub defender_troop: TroopType,
    pub attack_style: AttackStyle,
    pub is_critical: bool,
    pub is_evaded: bool,
    pub defender_died: bool,
    pub position: Vec3,
}

impl ImpactRequest {
    /// The attacker's strike landing on the defender
    pub fn from_event(event: &CombatEvent) -> Self {
        Self {
            attacker_troop: event.attacker_troop,
            defender_troop: event.defender_troop,
            attack_style: event.attack_style,
            is_critical: event.is_critical,
            is_evaded: event.is_evaded,
            defender_died: event.defender_died,
            position: event.target,
        }
    }

    /// The defender's return fire landing on the attacker
    pub fn return_fire(event: &CombatEvent) -> Self {
        Self {
            attacker_troop: event.defender_troop,
            defender_troop: event.attacker_troop,
            attack_style: event.defender_troop.attack_style(),
            is_critical: false,
            is_evaded: false,
            defender_died: event.attacker_died,
            position: event.origin,
        }
    }

    /// Particle count for this impact
    pub fn burst_size(&self, preset: ImpactPreset) -> u32 {
        if self.is_critical {
            preset.burst_size() * 2
        } else {
            preset.burst_size()
        }
    }
}

/// Pick the preset for a hit
pub fn select_preset(request: &ImpactRequest, context: &BattleContext) -> ImpactPreset {
    if request.is_evaded {
        return ImpactPreset::Evade;
    }

    let space = context.terrain.is_space();
    if request.defender_died {
        return if space || request.attacker_troop == TroopType::Siege {
            ImpactPreset::Explosion
        } else {
            ImpactPreset::Blood
        };
    }

    match request.attack_style {
        AttackStyle::Magic => return ImpactPreset::MagicBurst,
        AttackStyle::Siege => return ImpactPreset::Debris,
        AttackStyle::Melee | AttackStyle::Ranged => {}
    }
    if space {
        return ImpactPreset::Spark;
    }
    if context.terrain.is_wet() || context.effective_weather().is_wet() {
        return ImpactPreset::Splash;
    }
    if request.is_critical {
        return ImpactPreset::Blood;
    }

    match request.attacker_troop {
        TroopType::Archer if context.terrain.is_dusty() => ImpactPreset::Dust,
        TroopType::Footman | TroopType::Cavalry | TroopType::Warship => ImpactPreset::Spark,
        TroopType::Mage => ImpactPreset::MagicBurst,
        TroopType::Siege => ImpactPreset::Debris,
        TroopType::Archer | TroopType::Irregular => ImpactPreset::Generic,
    }
}

/// Resolves arrivals into presets and counts how many it has resolved
#[derive(Debug, Clone)]
pub struct ImpactDispatcher {
    context: BattleContext,
    dispatched: u64,
}

impl ImpactDispatcher {
    pub fn new(context: BattleContext) -> Self {
        Self {
            context,
            dispatched: 0,
        }
    }

    pub fn context(&self) -> BattleContext {
        self.context
    }

    /// Weather can change mid-battle
    pub fn set_context(&mut self, context: BattleContext) {
        self.context = context;
    }

    pub fn dispatch(&mut self, request: &ImpactRequest) -> ImpactPreset {
        self.dispatched += 1;
        select_preset(request, &self.context)
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}
