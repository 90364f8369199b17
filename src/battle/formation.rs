//! Formation types and their attack/defense modifiers
//!
//! Modifiers are multiplicative and live in one table (`modifiers`).
//! The resolver divides attacker attack by defender defense and clamps.

use serde::{Deserialize, Serialize};

/// Named spatial arrangement of a unit's members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    #[default]
    Line,
    Wedge,
    Square,
    /// Crane wing / fish-scale: two mirrored wings that envelop
    Crane,
    /// Elongated bulge for breakthroughs
    Spindle,
    /// Fleet sphere, all-round defense
    Sphere,
    Scattered,
}

/// Attack/defense multiplier pair for a formation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationModifiers {
    pub attack: f32,
    pub defense: f32,
}

impl Formation {
    pub fn all() -> &'static [Formation] {
        &[
            Formation::Line,
            Formation::Wedge,
            Formation::Square,
            Formation::Crane,
            Formation::Spindle,
            Formation::Sphere,
            Formation::Scattered,
        ]
    }

    /// Parse a formation id (case-insensitive, accepts common aliases)
    pub fn from_id(id: &str) -> Option<Formation> {
        match id.trim().to_ascii_lowercase().as_str() {
            "line" => Some(Formation::Line),
            "wedge" => Some(Formation::Wedge),
            "square" => Some(Formation::Square),
            "crane" | "fish_scale" | "fishscale" => Some(Formation::Crane),
            "spindle" => Some(Formation::Spindle),
            "sphere" => Some(Formation::Sphere),
            "scattered" => Some(Formation::Scattered),
            _ => None,
        }
    }

    /// Parse a formation id, falling back to `Scattered` with a warning
    pub fn resolve_id(id: &str) -> Formation {
        Self::from_id(id).unwrap_or_else(|| {
            tracing::warn!(formation_id = id, "Unknown formation, falling back to scattered");
            Formation::Scattered
        })
    }

    pub fn id(&self) -> &'static str {
        match self {
            Formation::Line => "line",
            Formation::Wedge => "wedge",
            Formation::Square => "square",
            Formation::Crane => "crane",
            Formation::Spindle => "spindle",
            Formation::Sphere => "sphere",
            Formation::Scattered => "scattered",
        }
    }

    pub fn modifiers(&self) -> FormationModifiers {
        let (attack, defense) = match self {
            Formation::Line => (1.0, 1.0),
            Formation::Wedge => (1.2, 0.9),
            Formation::Square => (0.8, 1.3),
            Formation::Crane => (1.1, 0.95),
            Formation::Spindle => (1.25, 0.85),
            Formation::Sphere => (0.9, 1.2),
            Formation::Scattered => (0.9, 0.9),
        };
        FormationModifiers { attack, defense }
    }

    /// Can this formation wrap around an enemy's flanks?
    pub fn can_envelop(&self) -> bool {
        matches!(self, Formation::Crane)
    }

    /// Does this formation face every direction (immune to envelopment)?
    pub fn all_round_defense(&self) -> bool {
        matches!(self, Formation::Square | Formation::Sphere)
    }

    /// Is `self` enveloping `defender` when it attacks?
    pub fn envelops(&self, defender: Formation) -> bool {
        self.can_envelop() && !defender.all_round_defense()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formation_id_round_trip() {
        for formation in Formation::all() {
            assert_eq!(Formation::from_id(formation.id()), Some(*formation));
        }
    }

    #[test]
    fn test_fish_scale_alias() {
        assert_eq!(Formation::from_id("fish_scale"), Some(Formation::Crane));
        assert_eq!(Formation::from_id("WEDGE"), Some(Formation::Wedge));
    }

    #[test]
    fn test_unknown_formation_falls_back_to_scattered() {
        assert_eq!(Formation::resolve_id("tortoise"), Formation::Scattered);
    }

    #[test]
    fn test_modifiers_positive() {
        for formation in Formation::all() {
            let m = formation.modifiers();
            assert!(m.attack > 0.0 && m.defense > 0.0);
        }
    }

    #[test]
    fn test_offensive_vs_defensive_shapes() {
        assert!(Formation::Wedge.modifiers().attack > Formation::Line.modifiers().attack);
        assert!(Formation::Square.modifiers().defense > Formation::Line.modifiers().defense);
    }

    #[test]
    fn test_envelopment() {
        assert!(Formation::Crane.envelops(Formation::Line));
        assert!(!Formation::Crane.envelops(Formation::Square));
        assert!(!Formation::Crane.envelops(Formation::Sphere));
        assert!(!Formation::Wedge.envelops(Formation::Line));
    }
}
