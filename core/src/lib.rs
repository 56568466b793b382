#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the replay spectator.
//!
//! This crate defines the vocabulary that connects the transport, the
//! authoritative world model and the rendering adapters. Raw inbound messages
//! are turned into [`Envelope`] values by [`decode_message`]; rounds carry a
//! closed set of [`Signal`] variants that the signal processor dispatches onto
//! the world. Value types such as [`UnitId`], [`Team`], [`Loc`], [`GameMap`]
//! and [`Effect`] are shared by every layer so that adapters never need to
//! reach into world internals.

mod constants;
mod effect;
mod map;
mod signal;
mod wire;

use std::fmt;

use serde::{Deserialize, Deserializer};

pub use constants::{parse_value, Archetype, ArchetypeCatalog, Constants, Value};
pub use effect::{Effect, EffectId, EffectKind};
pub use map::{GameMap, Layer};
pub use signal::{
    AttackSignal, BroadcastComponent, BroadcastSignal, ClearRubbleSignal, DeathSignal,
    HealthChangeSignal, MovementSignal, Signal, SpawnSignal, TerrainSignal,
};
pub use wire::{
    decode_message, DecodeError, Envelope, Footer, GameStats, Header, MapHeader, MatchMetadata,
    Round, StoredConstants,
};

/// Name of the game constant holding the rubble level above which a cell is obstructed.
pub const RUBBLE_OBSTRUCTION_THRESHOLD: &str = "RUBBLE_OBSTRUCTION_THRESH";

/// Unique identifier the server assigns to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team a unit fights for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Team {
    /// First competing team.
    A,
    /// Second competing team.
    B,
    /// Units owned by neither team.
    Neutral,
    /// Any other team label reported by the server, such as zombies.
    Other(String),
}

impl Team {
    /// Maps the server's team label onto a team.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "A" => Self::A,
            "B" => Self::B,
            "NEUTRAL" => Self::Neutral,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Label used by the server for the team.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::Neutral => "NEUTRAL",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Team {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

/// Location expressed as a pair of coordinates.
///
/// Locations decoded from the wire are in world units; the world model
/// converts them to grid-local coordinates by subtracting the map origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Loc {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Loc {
    /// Creates a location from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parses a comma-joined `"x,y"` pair.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let (x, y) = raw
            .split_once(',')
            .ok_or_else(|| DecodeError::Location(raw.to_owned()))?;
        let x = x
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::Location(raw.to_owned()))?;
        let y = y
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::Location(raw.to_owned()))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(DecodeError::Location(raw.to_owned()));
        }
        Ok(Self { x, y })
    }

    /// Returns this location shifted so that `origin` becomes `(0, 0)`.
    #[must_use]
    pub fn relative_to(self, origin: Loc) -> Self {
        Self {
            x: self.x - origin.x,
            y: self.y - origin.y,
        }
    }

    /// Linearly interpolates between `self` and `other`.
    #[must_use]
    pub fn lerp(self, other: Loc, t: f64) -> Self {
        Self {
            x: self.x * (1.0 - t) + other.x * t,
            y: self.y * (1.0 - t) + other.y * t,
        }
    }

    /// Grid cell containing the location, if it lies in the non-negative quadrant.
    #[must_use]
    pub fn to_grid(self) -> Option<GridPos> {
        let column = self.x.round();
        let row = self.y.round();
        if column < 0.0 || row < 0.0 || column > f64::from(u32::MAX) || row > f64::from(u32::MAX)
        {
            return None;
        }
        Some(GridPos::new(column as u32, row as u32))
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl<'de> Deserialize<'de> for Loc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Loc::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Location of a single map cell expressed as column and row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    column: u32,
    row: u32,
}

impl GridPos {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}
