use std::fmt;

/// Identifier of a combatant (player character, monster, summoned ally).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a live effect instance.
///
/// Minted from the state's monotonic `ts` counter, so ids never repeat within
/// one encounter even after instances are removed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EffectId(pub String);

impl EffectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EffectId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EffectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discrete grid position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the position shifted by the given delta.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (king-move) distance to another cell.
    #[inline]
    pub fn distance(self, other: Position) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// Cell identity rendered as `"x,y"`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl std::str::FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once(',').ok_or(ParsePositionError)?;
        let x = x.trim().parse().map_err(|_| ParsePositionError)?;
        let y = y.trim().parse().map_err(|_| ParsePositionError)?;
        Ok(Self { x, y })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cell id must look like \"x,y\"")]
pub struct ParsePositionError;

/// Six ability scores' modifiers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "UPPERCASE")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

/// The four defenses an attack can target.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Defense {
    #[default]
    #[strum(serialize = "AC")]
    Ac,
    #[strum(serialize = "Fort")]
    Fortitude,
    #[strum(serialize = "Ref")]
    Reflex,
    #[strum(serialize = "Will")]
    Will,
}

/// Damage keywords used by resistances, vulnerabilities and immunities.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum DamageType {
    #[default]
    Untyped,
    Acid,
    Cold,
    Fire,
    Force,
    Lightning,
    Necrotic,
    Poison,
    Psychic,
    Radiant,
    Thunder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_cell_id() {
        let cell = Position::new(-3, 7);
        assert_eq!(cell.to_string(), "-3,7");
        assert_eq!("-3,7".parse::<Position>(), Ok(cell));
        assert!("3;7".parse::<Position>().is_err());
    }

    #[test]
    fn chebyshev_distance_takes_the_larger_axis() {
        assert_eq!(Position::new(0, 0).distance(Position::new(3, 1)), 3);
        assert_eq!(Position::new(2, 2).distance(Position::new(-1, 6)), 4);
        assert_eq!(Position::ORIGIN.distance(Position::ORIGIN), 0);
    }

    #[test]
    fn defense_names_match_stat_block_labels() {
        assert_eq!(Defense::Ac.to_string(), "AC");
        assert_eq!("Ref".parse::<Defense>(), Ok(Defense::Reflex));
        assert_eq!(Ability::Str.to_string(), "STR");
        assert_eq!("thunder".parse::<DamageType>(), Ok(DamageType::Thunder));
    }

    #[test]
    fn ids_convert_from_owned_and_borrowed_strings() {
        assert_eq!(EffectId::from(String::from("e1.1")), EffectId::from("e1.1"));
        assert_eq!(ActorId::from(String::from("orc")), ActorId::from("orc"));
    }
}
