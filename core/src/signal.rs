use serde::{Deserialize, Deserializer};

use crate::{Loc, Team, UnitId};

/// One atomic state change reported inside a round.
///
/// The variant set is closed: tags the decoder does not know become
/// [`Signal::Unrecognized`], which the signal processor treats as fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// A unit entered the match.
    Spawn(SpawnSignal),
    /// A unit started moving to a new location.
    Movement(MovementSignal),
    /// A unit was destroyed.
    Death(DeathSignal),
    /// A unit attacked a location.
    Attack(AttackSignal),
    /// Health of one or more units changed.
    HealthChange(HealthChangeSignal),
    /// A unit started clearing rubble.
    ClearRubble(ClearRubbleSignal),
    /// Rubble level of a cell changed.
    RubbleChange(TerrainSignal),
    /// Parts lying on a cell changed.
    PartsChange(TerrainSignal),
    /// A unit broadcast a message.
    Broadcast(BroadcastSignal),
    /// Debug string attached to a unit.
    IndicatorString,
    /// Infection status of a unit changed.
    Infection,
    /// Team resource totals changed.
    TeamResource,
    /// Bytecode usage report.
    BytecodesUsed,
    /// Unit delay report.
    RobotDelay,
    /// A signal tag this client does not understand.
    Unrecognized {
        /// Tag reported by the server.
        tag: String,
    },
}

impl Signal {
    /// Wire tag of the spawn signal.
    pub const SPAWN_TAG: &'static str = "sig.SpawnSignal";
    /// Wire tag of the movement signal.
    pub const MOVEMENT_TAG: &'static str = "sig.MovementSignal";
    /// Wire tag of the death signal.
    pub const DEATH_TAG: &'static str = "sig.DeathSignal";
    /// Wire tag of the attack signal.
    pub const ATTACK_TAG: &'static str = "sig.AttackSignal";
    /// Wire tag of the health change signal.
    pub const HEALTH_CHANGE_TAG: &'static str = "sig.HealthChangeSignal";
    /// Wire tag of the clear rubble signal.
    pub const CLEAR_RUBBLE_TAG: &'static str = "sig.ClearRubbleSignal";
    /// Wire tag of the rubble change signal.
    pub const RUBBLE_CHANGE_TAG: &'static str = "sig.RubbleChangeSignal";
    /// Wire tag of the parts change signal.
    pub const PARTS_CHANGE_TAG: &'static str = "sig.PartsChangeSignal";
    /// Wire tag of the broadcast signal.
    pub const BROADCAST_TAG: &'static str = "sig.BroadcastSignal";
    /// Wire tag of the indicator string signal.
    pub const INDICATOR_STRING_TAG: &'static str = "sig.IndicatorStringSignal";
    /// Wire tag of the infection signal.
    pub const INFECTION_TAG: &'static str = "sig.InfectionSignal";
    /// Wire tag of the team resource signal.
    pub const TEAM_RESOURCE_TAG: &'static str = "sig.TeamResourceSignal";
    /// Wire tag of the bytecodes used signal.
    pub const BYTECODES_USED_TAG: &'static str = "sig.BytecodesUsedSignal";
    /// Wire tag of the robot delay signal.
    pub const ROBOT_DELAY_TAG: &'static str = "sig.RobotDelaySignal";

    /// Short name of the signal kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Spawn(_) => "spawn",
            Self::Movement(_) => "movement",
            Self::Death(_) => "death",
            Self::Attack(_) => "attack",
            Self::HealthChange(_) => "health-change",
            Self::ClearRubble(_) => "clear-rubble",
            Self::RubbleChange(_) => "rubble-change",
            Self::PartsChange(_) => "parts-change",
            Self::Broadcast(_) => "broadcast",
            Self::IndicatorString => "indicator-string",
            Self::Infection => "infection",
            Self::TeamResource => "team-resource",
            Self::BytecodesUsed => "bytecodes-used",
            Self::RobotDelay => "robot-delay",
            Self::Unrecognized { tag } => tag,
        }
    }
}

/// Payload of a spawn signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpawnSignal {
    /// Identifier of the new unit.
    pub robot_id: UnitId,
    /// Unit that produced the new unit, if any.
    #[serde(default)]
    pub parent_id: Option<UnitId>,
    /// Spawn location in world units.
    pub loc: Loc,
    /// Archetype name of the unit.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Team of the unit.
    pub team: Team,
    /// Initial movement delay.
    #[serde(default)]
    pub delay: u32,
}

/// Payload of a movement signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MovementSignal {
    /// Identifier of the moving unit.
    pub robot_id: UnitId,
    /// Destination in world units.
    pub new_loc: Loc,
    /// Movement delay in rounds.
    #[serde(default)]
    pub delay: u32,
}

/// Payload of a death signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeathSignal {
    /// Identifier of the unit that died.
    pub object_id: UnitId,
}

/// Payload of an attack signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttackSignal {
    /// Identifier of the attacking unit.
    pub robot_id: UnitId,
    /// Attacked location in world units.
    pub target_loc: Loc,
}

/// Payload of a health change signal: two parallel, comma-joined lists.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthChangeSignal {
    /// Units whose health changed.
    #[serde(deserialize_with = "id_list")]
    pub robot_ids: Vec<UnitId>,
    /// New health values, index-aligned with `robot_ids`.
    #[serde(deserialize_with = "number_list")]
    pub health: Vec<f64>,
}

/// Payload of a clear rubble signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClearRubbleSignal {
    /// Unit doing the clearing.
    pub robot_id: UnitId,
    /// Cell being cleared, in world units.
    pub loc: Loc,
    /// Number of rounds the clearing takes.
    pub delay: u32,
}

/// Payload shared by the rubble and parts change signals.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerrainSignal {
    /// Cell whose layer changed, in world units.
    pub loc: Loc,
    /// New layer value.
    pub amount: f64,
}

/// Payload of a broadcast signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BroadcastSignal {
    /// Unit that broadcast, when reported.
    #[serde(default)]
    pub robot_id: Option<UnitId>,
    /// Nested component carrying the broadcast location.
    pub component: BroadcastComponent,
    /// Broadcast radius.
    #[serde(deserialize_with = "number_text")]
    pub radius: f64,
}

/// Nested component of a broadcast signal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BroadcastComponent {
    /// Location the broadcast originates from, in world units.
    pub location: Loc,
}

impl BroadcastSignal {
    /// Location the broadcast originates from, in world units.
    #[must_use]
    pub fn location(&self) -> Loc {
        self.component.location
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn id_list<'de, D>(deserializer: D) -> Result<Vec<UnitId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    split_list(&raw)
        .map(|item| {
            item.parse::<u32>()
                .map(UnitId::new)
                .map_err(|_| serde::de::Error::custom(format!("invalid unit id `{item}`")))
        })
        .collect()
}

fn number_list<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    split_list(&raw)
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid number `{item}`")))
        })
        .collect()
}

fn number_text<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid number `{text}`"))),
    }
}
