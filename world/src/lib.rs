#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative spectator state reconstructed from the event stream.
//!
//! The world is mutated only through the methods on [`World`]; every mutation
//! bumps a version counter and appends a [`Change`] to a journal that the
//! presenter drains after each tick. Adapters read state through [`query`].

mod coords;
mod unit;

use std::collections::BTreeMap;

use spectator_core::{
    ArchetypeCatalog, Constants, Effect, EffectId, EffectKind, Footer, GameMap, GameStats,
    GridPos, Header, Layer, Loc, MatchMetadata, SpawnSignal, Team, UnitId,
};

pub use coords::{CoordinatePolicy, LocationKind};
pub use unit::Unit;

/// Referential and structural violations raised by world mutators.
///
/// The spectator treats every one of these as fatal for the stream.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// A signal referenced a unit that is not alive.
    #[error("unit {id} is not alive")]
    UnknownUnit {
        /// Identifier that failed to resolve.
        id: UnitId,
    },
    /// A spawn reused the identifier of a live unit.
    #[error("unit {id} is already alive")]
    DuplicateUnit {
        /// Identifier reused by the spawn.
        id: UnitId,
    },
    /// A spawn named an archetype missing from the catalog.
    #[error("archetype `{kind}` is not in the catalog")]
    UnknownArchetype {
        /// Archetype name reported by the spawn.
        kind: String,
    },
    /// The archetype exists but does not declare its maximum health.
    #[error("archetype `{kind}` does not declare maxHealth")]
    MissingMaxHealth {
        /// Archetype name reported by the spawn.
        kind: String,
    },
    /// A health change carried lists of different lengths.
    #[error("health change lists {ids} ids but {values} values")]
    HealthLengthMismatch {
        /// Number of unit identifiers.
        ids: usize,
        /// Number of health values.
        values: usize,
    },
    /// A terrain edit arrived before any header.
    #[error("terrain edit before the map header")]
    MapMissing,
    /// A terrain edit targeted a location outside the grid.
    #[error("location {loc} lies outside the map")]
    OutOfBounds {
        /// Grid-local location of the edit.
        loc: Loc,
    },
}

/// Requested modification of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerrainEdit {
    /// Sets the rubble level of the cell.
    Rubble(f64),
    /// Sets the parts lying on the cell.
    Parts(f64),
    /// Marks the cell as being cleared; the layer values arrive with a later rubble edit.
    Clear,
}

/// Entry in the change journal describing what a mutation touched.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// The map was rebuilt from a header.
    MapReplaced,
    /// Constants and catalog were replaced.
    ConstantsReplaced,
    /// A map cell changed.
    TileChanged(GridPos),
    /// A unit entered the world.
    UnitSpawned {
        /// Identifier of the unit.
        id: UnitId,
        /// Archetype name of the unit.
        kind: String,
        /// Team of the unit.
        team: Team,
        /// Grid-local spawn location.
        loc: Loc,
    },
    /// A unit left the world.
    UnitRemoved(UnitId),
    /// Health of a unit changed.
    HealthChanged(UnitId),
    /// Match metadata, statistics or winner were recorded.
    SummaryUpdated,
}

/// Informational match details that never affect simulation state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchSummary {
    /// Match type label.
    pub match_type: String,
    /// Name of team A.
    pub team_a: String,
    /// Name of team B.
    pub team_b: String,
    /// Maps played.
    pub maps: String,
    /// How decisively the match was won, once known.
    pub domination_factor: Option<String>,
    /// Winning team label, once known.
    pub winner: Option<String>,
}

/// Represents the authoritative spectator world state.
#[derive(Debug, Default)]
pub struct World {
    policy: CoordinatePolicy,
    map: Option<GameMap>,
    constants: Constants,
    catalog: ArchetypeCatalog,
    units: BTreeMap<UnitId, Unit>,
    effects: BTreeMap<EffectId, Effect>,
    next_effect: u64,
    round: u32,
    version: u64,
    changes: Vec<Change>,
    summary: MatchSummary,
}

impl World {
    /// Creates an empty world that normalizes locations with the provided policy.
    #[must_use]
    pub fn new(policy: CoordinatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Converts a wire location into grid-local coordinates.
    ///
    /// Before the first header the origin is `(0, 0)`.
    #[must_use]
    pub fn normalize(&self, kind: LocationKind, loc: Loc) -> Loc {
        let origin = self.map.as_ref().map(GameMap::origin).unwrap_or_default();
        self.policy.normalize(kind, loc, origin)
    }

    /// Builds the map from a header, replacing any previous map wholesale.
    pub fn apply_header(&mut self, header: &Header) {
        self.map = Some(GameMap::from_header(&header.map));
        self.record(Change::MapReplaced);
    }

    /// Replaces the constants table and the archetype catalog.
    pub fn apply_stored_constants(&mut self, constants: Constants, catalog: ArchetypeCatalog) {
        self.constants = constants;
        self.catalog = catalog;
        self.record(Change::ConstantsReplaced);
    }

    /// Adds a unit at full health for its archetype.
    pub fn spawn_unit(&mut self, spawn: &SpawnSignal) -> Result<(), WorldError> {
        if self.units.contains_key(&spawn.robot_id) {
            return Err(WorldError::DuplicateUnit { id: spawn.robot_id });
        }
        let archetype =
            self.catalog
                .get(&spawn.kind)
                .ok_or_else(|| WorldError::UnknownArchetype {
                    kind: spawn.kind.clone(),
                })?;
        let max_health = archetype
            .max_health()
            .ok_or_else(|| WorldError::MissingMaxHealth {
                kind: spawn.kind.clone(),
            })?;

        let loc = self.normalize(LocationKind::Unit, spawn.loc);
        let unit = Unit {
            id: spawn.robot_id,
            team: spawn.team.clone(),
            kind: spawn.kind.clone(),
            parent: spawn.parent_id,
            loc,
            from: loc,
            move_start: self.round,
            delay: spawn.delay,
            health: max_health,
            max_health,
            animating: false,
        };
        let _ = self.units.insert(spawn.robot_id, unit);
        self.record(Change::UnitSpawned {
            id: spawn.robot_id,
            kind: spawn.kind.clone(),
            team: spawn.team.clone(),
            loc,
        });
        Ok(())
    }

    /// Starts moving a unit from its current location to `new_loc`.
    pub fn move_unit(&mut self, id: UnitId, new_loc: Loc, delay: u32) -> Result<(), WorldError> {
        let destination = self.normalize(LocationKind::Unit, new_loc);
        let round = self.round;
        let unit = self.unit_mut(id)?;
        unit.from = unit.loc;
        unit.loc = destination;
        unit.move_start = round;
        unit.delay = delay;
        unit.animating = true;
        self.version += 1;
        Ok(())
    }

    /// Overwrites the health of every listed unit.
    ///
    /// All identifiers are validated before any unit is touched.
    pub fn change_health(&mut self, ids: &[UnitId], healths: &[f64]) -> Result<(), WorldError> {
        if ids.len() != healths.len() {
            return Err(WorldError::HealthLengthMismatch {
                ids: ids.len(),
                values: healths.len(),
            });
        }
        if let Some(missing) = ids.iter().find(|id| !self.units.contains_key(id)) {
            return Err(WorldError::UnknownUnit { id: *missing });
        }

        for (id, health) in ids.iter().zip(healths) {
            if let Some(unit) = self.units.get_mut(id) {
                unit.health = *health;
            }
            self.record(Change::HealthChanged(*id));
        }
        Ok(())
    }

    /// Removes a unit from the world and returns it.
    pub fn kill_unit(&mut self, id: UnitId) -> Result<Unit, WorldError> {
        let unit = self
            .units
            .remove(&id)
            .ok_or(WorldError::UnknownUnit { id })?;
        self.record(Change::UnitRemoved(id));
        Ok(unit)
    }

    /// Applies a terrain edit at a wire location and returns the touched cell.
    pub fn change_terrain(&mut self, edit: TerrainEdit, loc: Loc) -> Result<GridPos, WorldError> {
        let kind = match edit {
            TerrainEdit::Clear => LocationKind::Unit,
            TerrainEdit::Rubble(_) | TerrainEdit::Parts(_) => LocationKind::Terrain,
        };
        let local = self.normalize(kind, loc);
        let map = self.map.as_mut().ok_or(WorldError::MapMissing)?;
        let cell = local
            .to_grid()
            .filter(|cell| map.contains(*cell))
            .ok_or(WorldError::OutOfBounds { loc: local })?;

        match edit {
            TerrainEdit::Rubble(amount) => {
                let _ = map.set(Layer::Rubble, cell, amount);
            }
            TerrainEdit::Parts(amount) => {
                let _ = map.set(Layer::Parts, cell, amount);
            }
            TerrainEdit::Clear => {}
        }
        self.record(Change::TileChanged(cell));
        Ok(cell)
    }

    /// Starts a transient effect in the current round.
    pub fn add_effect(&mut self, kind: EffectKind, duration: u32) -> EffectId {
        let id = EffectId::new(self.next_effect);
        self.next_effect += 1;
        let effect = Effect {
            id,
            kind,
            start: self.round,
            duration,
        };
        let _ = self.effects.insert(id, effect);
        self.version += 1;
        id
    }

    /// Moves to the next round and prunes effects that expired.
    pub fn advance_round(&mut self) {
        self.round = self.round.saturating_add(1);
        let round = self.round;
        self.effects.retain(|_, effect| effect.is_live_at(round));
        self.version += 1;
    }

    /// Marks units whose move finished at the given sub-round fraction as settled.
    pub fn settle_moves(&mut self, fraction: f32) {
        let round = self.round;
        let mut settled = false;
        for unit in self.units.values_mut().filter(|unit| unit.animating) {
            if unit.move_progress(round, fraction) >= 1.0 {
                unit.animating = false;
                settled = true;
            }
        }
        if settled {
            self.version += 1;
        }
    }

    /// Records team names and maps from the match metadata.
    pub fn record_metadata(&mut self, metadata: MatchMetadata) {
        self.summary.match_type = metadata.match_type;
        self.summary.team_a = metadata.team_a;
        self.summary.team_b = metadata.team_b;
        self.summary.maps = metadata.maps;
        self.record(Change::SummaryUpdated);
    }

    /// Records post-match statistics.
    pub fn record_game_stats(&mut self, stats: GameStats) {
        self.summary.domination_factor = Some(stats.domination_factor);
        self.record(Change::SummaryUpdated);
    }

    /// Records the winner announced by the footer.
    pub fn record_footer(&mut self, footer: Footer) {
        self.summary.winner = Some(footer.winner);
        self.record(Change::SummaryUpdated);
    }

    /// Drains the change journal accumulated since the previous call.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, WorldError> {
        self.units.get_mut(&id).ok_or(WorldError::UnknownUnit { id })
    }

    fn record(&mut self, change: Change) {
        self.version += 1;
        self.changes.push(change);
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use spectator_core::{ArchetypeCatalog, Constants, Effect, GameMap, UnitId};

    use super::{CoordinatePolicy, MatchSummary, Unit, World};

    /// Number of rounds applied so far.
    #[must_use]
    pub fn current_round(world: &World) -> u32 {
        world.round
    }

    /// Counter bumped by every mutation.
    #[must_use]
    pub fn version(world: &World) -> u64 {
        world.version
    }

    /// Map built from the latest header, if one arrived.
    #[must_use]
    pub fn map(world: &World) -> Option<&GameMap> {
        world.map.as_ref()
    }

    /// Looks up a live unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<&Unit> {
        world.units.get(&id)
    }

    /// Iterator over live units in ascending identifier order.
    pub fn units(world: &World) -> impl Iterator<Item = &Unit> {
        world.units.values()
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(world: &World) -> usize {
        world.units.len()
    }

    /// Iterator over every stored effect in creation order.
    pub fn effects(world: &World) -> impl Iterator<Item = &Effect> {
        world.effects.values()
    }

    /// Iterator over effects still visible in `round`.
    pub fn live_effects(world: &World, round: u32) -> impl Iterator<Item = &Effect> {
        world
            .effects
            .values()
            .filter(move |effect| effect.is_live_at(round))
    }

    /// Game constants from the latest stored constants message.
    #[must_use]
    pub fn constants(world: &World) -> &Constants {
        &world.constants
    }

    /// Unit archetypes from the latest stored constants message.
    #[must_use]
    pub fn catalog(world: &World) -> &ArchetypeCatalog {
        &world.catalog
    }

    /// Match metadata, statistics and winner recorded so far.
    #[must_use]
    pub fn match_summary(world: &World) -> &MatchSummary {
        &world.summary
    }

    /// Coordinate policy the world normalizes locations with.
    #[must_use]
    pub fn coordinate_policy(world: &World) -> CoordinatePolicy {
        world.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectator_core::{Archetype, MapHeader, Value};

    fn header(origin: Loc) -> Header {
        Header {
            map: MapHeader {
                width: 4,
                height: 3,
                name: "test".to_owned(),
                origin,
                initial_rubble: vec![vec![0.0; 4]; 3],
                initial_parts: vec![vec![0.0; 4]; 3],
            },
        }
    }

    fn soldier_catalog() -> ArchetypeCatalog {
        ArchetypeCatalog::from_archetypes([Archetype::new(
            "SOLDIER",
            [("maxHealth".to_owned(), Value::Double(60.0))],
        )])
    }

    fn spawn(id: u32, x: f64, y: f64) -> SpawnSignal {
        SpawnSignal {
            robot_id: UnitId::new(id),
            parent_id: None,
            loc: Loc::new(x, y),
            kind: "SOLDIER".to_owned(),
            team: Team::A,
            delay: 0,
        }
    }

    fn world_with_map() -> World {
        let mut world = World::new(CoordinatePolicy::default());
        world.apply_header(&header(Loc::new(100.0, 200.0)));
        world.apply_stored_constants(Constants::default(), soldier_catalog());
        let _ = world.take_changes();
        world
    }

    #[test]
    fn spawn_uses_archetype_health_and_relative_location() {
        let mut world = world_with_map();
        world.spawn_unit(&spawn(7, 102.0, 201.0)).expect("spawn");

        let unit = query::unit(&world, UnitId::new(7)).expect("unit");
        assert_eq!(unit.loc(), Loc::new(2.0, 1.0));
        assert!((unit.health() - 60.0).abs() < f64::EPSILON);
        assert!(!unit.is_animating());
    }

    #[test]
    fn version_increases_with_every_mutation() {
        let mut world = world_with_map();
        let before = query::version(&world);
        world.spawn_unit(&spawn(1, 100.0, 200.0)).expect("spawn");
        let after_spawn = query::version(&world);
        world
            .move_unit(UnitId::new(1), Loc::new(101.0, 200.0), 1)
            .expect("move");
        assert!(after_spawn > before);
        assert!(query::version(&world) > after_spawn);
    }

    #[test]
    fn terrain_edits_before_header_are_rejected() {
        let mut world = World::default();
        assert_eq!(
            world.change_terrain(TerrainEdit::Rubble(5.0), Loc::new(0.0, 0.0)),
            Err(WorldError::MapMissing)
        );
    }

    #[test]
    fn clear_edit_marks_tile_without_touching_layers() {
        let mut world = world_with_map();
        let cell = world
            .change_terrain(TerrainEdit::Clear, Loc::new(101.0, 201.0))
            .expect("clear");
        assert_eq!(cell, GridPos::new(1, 1));
        assert_eq!(world.take_changes(), vec![Change::TileChanged(cell)]);
        let map = query::map(&world).expect("map");
        assert_eq!(map.rubble(cell), Some(0.0));
    }

    #[test]
    fn advance_round_prunes_expired_effects() {
        let mut world = world_with_map();
        let _ = world.add_effect(
            EffectKind::Death {
                at: Loc::new(1.0, 1.0),
                team: Team::B,
            },
            EffectKind::DEATH_ROUNDS,
        );
        let _ = world.add_effect(
            EffectKind::Broadcast {
                at: Loc::new(1.0, 1.0),
                radius: 3.0,
            },
            EffectKind::BROADCAST_ROUNDS,
        );
        assert_eq!(query::effects(&world).count(), 2);

        world.advance_round();
        assert_eq!(query::effects(&world).count(), 1);

        for _ in 0..3 {
            world.advance_round();
        }
        assert_eq!(query::effects(&world).count(), 0);
    }
}
