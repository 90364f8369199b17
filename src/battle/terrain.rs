//! Terrain and weather context for a battle
//!
//! Read-only per-tick input to combat resolution and impact selection.

use serde::{Deserialize, Serialize};

use crate::battle::matchup::AttackStyle;
use crate::vfx::particle::ParticleKind;

/// Ground (or space) the engagement is fought over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Plains,
    Forest,
    Hills,
    River,
    Desert,
    Snowfield,
    /// Open space, for fleet battles
    Void,
}

impl Terrain {
    pub fn from_id(id: &str) -> Option<Terrain> {
        match id.trim().to_ascii_lowercase().as_str() {
            "plains" => Some(Terrain::Plains),
            "forest" => Some(Terrain::Forest),
            "hills" => Some(Terrain::Hills),
            "river" => Some(Terrain::River),
            "desert" => Some(Terrain::Desert),
            "snowfield" | "snow" => Some(Terrain::Snowfield),
            "void" | "space" => Some(Terrain::Void),
            _ => None,
        }
    }

    /// Divisor applied to damage taken by a defender on this terrain
    pub fn defense_multiplier(&self) -> f32 {
        match self {
            Terrain::Plains => 1.0,
            Terrain::Forest => 1.2,
            Terrain::Hills => 1.15,
            Terrain::River => 0.9, // Defenders caught fording
            Terrain::Desert => 1.0,
            Terrain::Snowfield => 1.05,
            Terrain::Void => 1.0,
        }
    }

    /// Smallest defense multiplier of any terrain
    pub fn min_defense_multiplier() -> f32 {
        0.9
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Terrain::Void)
    }

    pub fn is_wet(&self) -> bool {
        matches!(self, Terrain::River)
    }

    pub fn is_dusty(&self) -> bool {
        matches!(self, Terrain::Plains | Terrain::Desert)
    }
}

/// Current weather over the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
    Fog,
    Storm,
    Sandstorm,
}

impl Weather {
    pub fn from_id(id: &str) -> Option<Weather> {
        match id.trim().to_ascii_lowercase().as_str() {
            "clear" => Some(Weather::Clear),
            "rain" => Some(Weather::Rain),
            "snow" => Some(Weather::Snow),
            "fog" => Some(Weather::Fog),
            "storm" => Some(Weather::Storm),
            "sandstorm" => Some(Weather::Sandstorm),
            _ => None,
        }
    }

    /// Damage multiplier for missile fire (1.0 = normal)
    pub fn ranged_modifier(&self) -> f32 {
        match self {
            Weather::Clear => 1.0,
            Weather::Rain => 0.7,
            Weather::Snow => 0.8,
            Weather::Fog => 0.5,
            Weather::Storm => 0.4,
            Weather::Sandstorm => 0.3,
        }
    }

    pub fn is_wet(&self) -> bool {
        matches!(self, Weather::Rain | Weather::Storm)
    }

    /// Ambient particle kind drawn for this weather, if any
    pub fn ambient_particle(&self) -> Option<ParticleKind> {
        match self {
            Weather::Rain | Weather::Storm => Some(ParticleKind::Rain),
            Weather::Snow => Some(ParticleKind::Snow),
            Weather::Sandstorm => Some(ParticleKind::Sand),
            Weather::Clear | Weather::Fog => None,
        }
    }
}

/// Terrain and weather for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleContext {
    pub terrain: Terrain,
    pub weather: Weather,
}

impl BattleContext {
    pub fn new(terrain: Terrain, weather: Weather) -> Self {
        Self { terrain, weather }
    }

    /// Weather has no effect in open space
    pub fn effective_weather(&self) -> Weather {
        if self.terrain.is_space() {
            Weather::Clear
        } else {
            self.weather
        }
    }

    /// Damage multiplier weather applies to an attack style
    pub fn weather_modifier(&self, style: AttackStyle) -> f32 {
        match style {
            AttackStyle::Ranged | AttackStyle::Siege => self.effective_weather().ranged_modifier(),
            AttackStyle::Melee | AttackStyle::Magic => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!(Terrain::from_id("Space"), Some(Terrain::Void));
        assert_eq!(Terrain::from_id(" river "), Some(Terrain::River));
        assert_eq!(Weather::from_id("sandstorm"), Some(Weather::Sandstorm));
        assert_eq!(Weather::from_id("hail"), None);
    }

    #[test]
    fn test_min_defense_multiplier_is_minimum() {
        let terrains = [
            Terrain::Plains,
            Terrain::Forest,
            Terrain::Hills,
            Terrain::River,
            Terrain::Desert,
            Terrain::Snowfield,
            Terrain::Void,
        ];
        let min = terrains
            .iter()
            .map(|t| t.defense_multiplier())
            .fold(f32::INFINITY, f32::min);
        assert_eq!(min, Terrain::min_defense_multiplier());
    }

    #[test]
    fn test_weather_only_hurts_missiles() {
        let ctx = BattleContext::new(Terrain::Plains, Weather::Rain);
        assert!(ctx.weather_modifier(AttackStyle::Ranged) < 1.0);
        assert!(ctx.weather_modifier(AttackStyle::Siege) < 1.0);
        assert_eq!(ctx.weather_modifier(AttackStyle::Melee), 1.0);
        assert_eq!(ctx.weather_modifier(AttackStyle::Magic), 1.0);
    }

    #[test]
    fn test_no_weather_in_space() {
        let ctx = BattleContext::new(Terrain::Void, Weather::Storm);
        assert_eq!(ctx.effective_weather(), Weather::Clear);
        assert_eq!(ctx.weather_modifier(AttackStyle::Ranged), 1.0);
    }

    #[test]
    fn test_ambient_particles() {
        assert_eq!(Weather::Snow.ambient_particle(), Some(ParticleKind::Snow));
        assert_eq!(Weather::Clear.ambient_particle(), None);
    }
}
