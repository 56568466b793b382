//! Decoding of inbound wire messages into typed envelopes.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{parse_value, Archetype, ArchetypeCatalog, Constants, Loc, Signal};

/// Errors raised while decoding a single inbound message.
///
/// A decode error only invalidates the message it was raised for.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The message is not a `{MessageType, Data}` JSON object.
    #[error("malformed message envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The payload does not match the shape expected for its message type.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        /// Message type whose payload failed to decode.
        kind: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A recognised signal inside a round is missing or mistypes a field.
    #[error("malformed {tag} signal: {source}")]
    Signal {
        /// Tag of the offending signal.
        tag: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A location string is not a comma-joined numeric pair.
    #[error("invalid location `{0}`")]
    Location(String),
    /// A stored constant carries data that does not parse as its declared kind.
    #[error("constant `{name}` has invalid {kind} value `{data}`")]
    Value {
        /// Name of the constant or parameter.
        name: String,
        /// Declared value kind.
        kind: String,
        /// Offending data.
        data: String,
    },
    /// A map layer does not match the map's declared dimensions.
    #[error("map layer `{layer}` is not {width}x{height}")]
    LayerShape {
        /// Name of the offending layer.
        layer: &'static str,
        /// Declared map width.
        width: u32,
        /// Declared map height.
        height: u32,
    },
}

/// Typed inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Map description that opens a match.
    Header(Header),
    /// Game constants and unit archetype catalog.
    StoredConstants(StoredConstants),
    /// One simulation round.
    Round(Round),
    /// Team names and map list for the match.
    Metadata(MatchMetadata),
    /// Post-match statistics.
    GameStats(GameStats),
    /// Final message naming the winner.
    Footer(Footer),
}

impl Envelope {
    /// Message type label of the envelope.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Header(_) => HEADER,
            Self::StoredConstants(_) => STORED_CONSTANTS,
            Self::Round(_) => ROUND,
            Self::Metadata(_) => METADATA,
            Self::GameStats(_) => GAME_STATS,
            Self::Footer(_) => FOOTER,
        }
    }
}

const HEADER: &str = "Header";
const STORED_CONSTANTS: &str = "StoredConstants";
const ROUND: &str = "Round";
const METADATA: &str = "Metadata";
const GAME_STATS: &str = "GameStats";
const FOOTER: &str = "Footer";

/// Header payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    /// Map played in the match.
    pub map: MapHeader,
}

/// Map section of the header payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapHeader {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Map name.
    #[serde(default)]
    pub name: String,
    /// World-space location of the top-left cell.
    #[serde(default)]
    pub origin: Loc,
    /// Initial rubble, one row per entry.
    #[serde(deserialize_with = "layer_rows")]
    pub initial_rubble: Vec<Vec<f64>>,
    /// Initial parts, one row per entry.
    #[serde(deserialize_with = "layer_rows")]
    pub initial_parts: Vec<Vec<f64>>,
}

impl MapHeader {
    fn validate(&self) -> Result<(), DecodeError> {
        let layers = [
            ("InitialRubble", &self.initial_rubble),
            ("InitialParts", &self.initial_parts),
        ];
        for (layer, rows) in layers {
            let height_matches =
                usize::try_from(self.height).map_or(false, |height| rows.len() == height);
            let width_matches = rows.iter().all(|row| {
                usize::try_from(self.width).map_or(false, |width| row.len() == width)
            });
            if !height_matches || !width_matches {
                return Err(DecodeError::LayerShape {
                    layer,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }
}

/// Stored constants payload, converted to typed tables.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredConstants {
    /// Named game constants.
    pub constants: Constants,
    /// Unit archetypes keyed by name.
    pub catalog: ArchetypeCatalog,
}

/// Round payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Round {
    /// Signals in the order the server reported them; empty when absent.
    pub signals: Vec<Signal>,
}

/// Match metadata payload.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatchMetadata {
    /// Match type label.
    #[serde(rename = "Type")]
    pub match_type: String,
    /// Name of team A.
    pub team_a: String,
    /// Name of team B.
    pub team_b: String,
    /// Maps played, as reported by the server.
    pub maps: String,
}

/// Game statistics payload.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GameStats {
    /// How decisively the match was won.
    pub domination_factor: String,
}

/// Footer payload.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Footer {
    /// Label of the winning team.
    pub winner: String,
}

/// Decodes one raw inbound message.
///
/// Returns `Ok(None)` for message types the client does not track.
pub fn decode_message(raw: &str) -> Result<Option<Envelope>, DecodeError> {
    let envelope: RawEnvelope = serde_json::from_str(raw).map_err(DecodeError::Envelope)?;
    let data = envelope.data;

    let decoded = match envelope.message_type.as_str() {
        HEADER => {
            let header: Header = payload(HEADER, data)?;
            header.map.validate()?;
            Envelope::Header(header)
        }
        STORED_CONSTANTS => {
            let wire: StoredConstantsWire = payload(STORED_CONSTANTS, data)?;
            Envelope::StoredConstants(wire.into_typed()?)
        }
        ROUND if data.is_null() => Envelope::Round(Round::default()),
        ROUND => {
            let wire: RoundWire = payload(ROUND, data)?;
            let signals = wire
                .signals
                .unwrap_or_default()
                .iter()
                .map(decode_signal)
                .collect::<Result<Vec<_>, _>>()?;
            Envelope::Round(Round { signals })
        }
        METADATA => Envelope::Metadata(payload(METADATA, data)?),
        GAME_STATS => Envelope::GameStats(payload(GAME_STATS, data)?),
        FOOTER => Envelope::Footer(payload(FOOTER, data)?),
        other => {
            debug!(message_type = other, "ignoring unrecognized message type");
            return Ok(None);
        }
    };

    Ok(Some(decoded))
}

fn payload<T>(kind: &'static str, data: JsonValue) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(data).map_err(|source| DecodeError::Payload { kind, source })
}

fn decode_signal(raw: &JsonValue) -> Result<Signal, DecodeError> {
    let tagged = SignalTag::deserialize(raw).map_err(|source| DecodeError::Signal {
        tag: "untagged".to_owned(),
        source,
    })?;
    let tag = tagged.xml_name.local;

    let field_error = |source| DecodeError::Signal {
        tag: tag.clone(),
        source,
    };

    let signal = match tag.as_str() {
        Signal::SPAWN_TAG => Signal::Spawn(Deserialize::deserialize(raw).map_err(field_error)?),
        Signal::MOVEMENT_TAG => {
            Signal::Movement(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::DEATH_TAG => Signal::Death(Deserialize::deserialize(raw).map_err(field_error)?),
        Signal::ATTACK_TAG => Signal::Attack(Deserialize::deserialize(raw).map_err(field_error)?),
        Signal::HEALTH_CHANGE_TAG => {
            Signal::HealthChange(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::CLEAR_RUBBLE_TAG => {
            Signal::ClearRubble(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::RUBBLE_CHANGE_TAG => {
            Signal::RubbleChange(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::PARTS_CHANGE_TAG => {
            Signal::PartsChange(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::BROADCAST_TAG => {
            Signal::Broadcast(Deserialize::deserialize(raw).map_err(field_error)?)
        }
        Signal::INDICATOR_STRING_TAG => Signal::IndicatorString,
        Signal::INFECTION_TAG => Signal::Infection,
        Signal::TEAM_RESOURCE_TAG => Signal::TeamResource,
        Signal::BYTECODES_USED_TAG => Signal::BytecodesUsed,
        Signal::ROBOT_DELAY_TAG => Signal::RobotDelay,
        _ => Signal::Unrecognized { tag: tag.clone() },
    };

    Ok(signal)
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "MessageType")]
    message_type: String,
    #[serde(rename = "Data", default)]
    data: JsonValue,
}

#[derive(Deserialize)]
struct XmlName {
    #[serde(rename = "Local")]
    local: String,
}

#[derive(Deserialize)]
struct SignalTag {
    #[serde(rename = "XMLName")]
    xml_name: XmlName,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoundWire {
    #[serde(default)]
    signals: Option<Vec<JsonValue>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoredConstantsWire {
    #[serde(default)]
    game_constants: Option<Vec<EntryWire>>,
    #[serde(default)]
    robot_types: Option<Vec<RobotTypeWire>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntryWire {
    name: String,
    value: ValueWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ValueWire {
    #[serde(default)]
    data: String,
    #[serde(rename = "XMLName")]
    xml_name: XmlName,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RobotTypeWire {
    name: String,
    #[serde(default)]
    params: Option<Vec<EntryWire>>,
}

impl EntryWire {
    fn into_typed(self) -> Result<(String, crate::Value), DecodeError> {
        let value = parse_value(&self.name, &self.value.data, &self.value.xml_name.local)?;
        Ok((self.name, value))
    }
}

impl StoredConstantsWire {
    fn into_typed(self) -> Result<StoredConstants, DecodeError> {
        let constants = self
            .game_constants
            .unwrap_or_default()
            .into_iter()
            .map(EntryWire::into_typed)
            .collect::<Result<Vec<_>, _>>()?;

        let archetypes = self
            .robot_types
            .unwrap_or_default()
            .into_iter()
            .map(|robot_type| {
                let params = robot_type
                    .params
                    .unwrap_or_default()
                    .into_iter()
                    .map(EntryWire::into_typed)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Archetype::new(robot_type.name, params))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(StoredConstants {
            constants: Constants::from_entries(constants),
            catalog: ArchetypeCatalog::from_archetypes(archetypes),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayerRow {
    Joined(String),
    Wrapped(Vec<String>),
    Numbers(Vec<f64>),
}

impl LayerRow {
    fn into_values(self) -> Result<Vec<f64>, String> {
        let joined = match self {
            Self::Numbers(values) => return Ok(values),
            Self::Joined(joined) => joined,
            Self::Wrapped(parts) => parts.join(","),
        };
        joined
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<f64>()
                    .map_err(|_| format!("invalid layer value `{item}`"))
            })
            .collect()
    }
}

fn layer_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<LayerRow>::deserialize(deserializer)?;
    rows.into_iter()
        .map(|row| row.into_values().map_err(serde::de::Error::custom))
        .collect()
}
