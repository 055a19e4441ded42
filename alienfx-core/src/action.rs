//! Lighting actions and light addressing

use crate::color::Color;

/// What a light does: a static color or one of the animated effects.
///
/// The discriminants index the per-generation opcode tables in the
/// catalog, so the order is wire-relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Color,
    Pulse,
    Morph,
    Breathing,
    Spectrum,
    Rainbow,
    /// AC/battery state colors, persisted by the controller
    Power,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        Self::Color,
        Self::Pulse,
        Self::Morph,
        Self::Breathing,
        Self::Spectrum,
        Self::Rainbow,
        Self::Power,
    ];

    /// Opcode-table index
    pub const fn index(&self) -> usize {
        match self {
            Self::Color => 0,
            Self::Pulse => 1,
            Self::Morph => 2,
            Self::Breathing => 3,
            Self::Spectrum => 4,
            Self::Rainbow => 5,
            Self::Power => 6,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Pulse => "pulse",
            Self::Morph => "morph",
            Self::Breathing => "breathing",
            Self::Spectrum => "spectrum",
            Self::Rainbow => "rainbow",
            Self::Power => "power",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// One phase of a light's program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPhase {
    pub kind: ActionKind,
    /// Phase duration, generation-scaled
    pub time: u8,
    /// Effect speed, generation-scaled
    pub tempo: u8,
    pub color: Color,
}

impl ActionPhase {
    /// A static color phase with the default timing
    pub fn color(color: Color) -> Self {
        Self {
            kind: ActionKind::Color,
            time: 0,
            tempo: 0,
            color,
        }
    }
}

/// A light and the phases it should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightBlock {
    pub light: u8,
    pub phases: Vec<ActionPhase>,
}

/// Roles a mapped light can carry
pub mod light_flags {
    /// Participates in AC/battery power indication
    pub const POWER: u16 = 1;
    /// Hardware indicator (mute LED etc.), excluded from dimming
    pub const INDICATOR: u16 = 2;
}

/// Light index with its configured roles; the registry-independent
/// slice the engine needs from the user's mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedLight {
    pub id: u8,
    pub flags: u16,
}

impl MappedLight {
    pub fn plain(id: u8) -> Self {
        Self { id, flags: 0 }
    }

    pub fn is_power(&self) -> bool {
        self.flags & light_flags::POWER != 0
    }

    pub fn is_indicator(&self) -> bool {
        self.flags & light_flags::INDICATOR != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_indices_are_stable() {
        for (i, kind) in ActionKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(ActionKind::from_index(i), Some(kind));
        }
        assert_eq!(ActionKind::from_index(7), None);
    }

    #[test]
    fn kind_parses_by_name() {
        assert_eq!("morph".parse::<ActionKind>(), Ok(ActionKind::Morph));
        assert!("sparkle".parse::<ActionKind>().is_err());
    }

    #[test]
    fn light_roles() {
        let l = MappedLight { id: 3, flags: light_flags::POWER | light_flags::INDICATOR };
        assert!(l.is_power());
        assert!(l.is_indicator());
        assert!(!MappedLight::plain(1).is_power());
    }
}
