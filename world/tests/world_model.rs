use spectator_core::{
    Archetype, ArchetypeCatalog, Constants, Footer, GridPos, Header, Loc, MapHeader,
    MatchMetadata, SpawnSignal, Team, UnitId, Value,
};
use spectator_world::{query, Change, CoordinatePolicy, TerrainEdit, World, WorldError};

fn header() -> Header {
    Header {
        map: MapHeader {
            width: 5,
            height: 5,
            name: "field".to_owned(),
            origin: Loc::new(10.0, 10.0),
            initial_rubble: vec![vec![0.0; 5]; 5],
            initial_parts: vec![vec![0.0; 5]; 5],
        },
    }
}

fn catalog() -> ArchetypeCatalog {
    ArchetypeCatalog::from_archetypes([
        Archetype::new("ARCHON", [("maxHealth".to_owned(), Value::Double(1000.0))]),
        Archetype::new("SOLDIER", [("maxHealth".to_owned(), Value::Int(60))]),
        Archetype::new("DEN", Vec::<(String, Value)>::new()),
    ])
}

fn spawn(id: u32, kind: &str, x: f64, y: f64) -> SpawnSignal {
    SpawnSignal {
        robot_id: UnitId::new(id),
        parent_id: None,
        loc: Loc::new(x, y),
        kind: kind.to_owned(),
        team: Team::B,
        delay: 0,
    }
}

fn ready_world(policy: CoordinatePolicy) -> World {
    let mut world = World::new(policy);
    world.apply_header(&header());
    world.apply_stored_constants(Constants::default(), catalog());
    world
}

#[test]
fn header_and_constants_are_journaled() {
    let mut world = ready_world(CoordinatePolicy::default());
    assert_eq!(
        world.take_changes(),
        vec![Change::MapReplaced, Change::ConstantsReplaced]
    );
    assert!(world.take_changes().is_empty());
    assert_eq!(query::map(&world).map(|map| map.width()), Some(5));
}

#[test]
fn spawn_requires_catalog_entry() {
    let mut world = World::default();
    assert_eq!(
        world.spawn_unit(&spawn(1, "SOLDIER", 0.0, 0.0)),
        Err(WorldError::UnknownArchetype {
            kind: "SOLDIER".to_owned()
        })
    );

    let mut world = ready_world(CoordinatePolicy::default());
    assert_eq!(
        world.spawn_unit(&spawn(1, "TANK", 10.0, 10.0)),
        Err(WorldError::UnknownArchetype {
            kind: "TANK".to_owned()
        })
    );
    assert_eq!(
        world.spawn_unit(&spawn(1, "DEN", 10.0, 10.0)),
        Err(WorldError::MissingMaxHealth {
            kind: "DEN".to_owned()
        })
    );
    assert_eq!(query::unit_count(&world), 0);
}

#[test]
fn duplicate_live_ids_are_rejected() {
    let mut world = ready_world(CoordinatePolicy::default());
    world
        .spawn_unit(&spawn(3, "SOLDIER", 10.0, 10.0))
        .expect("first spawn");
    assert_eq!(
        world.spawn_unit(&spawn(3, "ARCHON", 11.0, 10.0)),
        Err(WorldError::DuplicateUnit { id: UnitId::new(3) })
    );

    let _ = world.kill_unit(UnitId::new(3)).expect("kill");
    world
        .spawn_unit(&spawn(3, "ARCHON", 11.0, 10.0))
        .expect("id reusable after death");
}

#[test]
fn move_records_origin_and_start_round() {
    let mut world = ready_world(CoordinatePolicy::default());
    world
        .spawn_unit(&spawn(1, "SOLDIER", 11.0, 11.0))
        .expect("spawn");
    world.advance_round();
    world.advance_round();
    world
        .move_unit(UnitId::new(1), Loc::new(12.0, 11.0), 2)
        .expect("move");

    let unit = query::unit(&world, UnitId::new(1)).expect("unit");
    assert_eq!(unit.move_from(), Loc::new(1.0, 1.0));
    assert_eq!(unit.loc(), Loc::new(2.0, 1.0));
    assert_eq!(unit.move_start(), 2);
    assert_eq!(unit.delay(), 2);
    assert!(unit.is_animating());
}

#[test]
fn settle_moves_clears_animation_once_complete() {
    let mut world = ready_world(CoordinatePolicy::default());
    world
        .spawn_unit(&spawn(1, "SOLDIER", 10.0, 10.0))
        .expect("spawn");
    world
        .move_unit(UnitId::new(1), Loc::new(11.0, 10.0), 1)
        .expect("move");

    world.settle_moves(0.3);
    assert!(query::unit(&world, UnitId::new(1))
        .expect("unit")
        .is_animating());

    world.settle_moves(0.5);
    assert!(!query::unit(&world, UnitId::new(1))
        .expect("unit")
        .is_animating());
}

#[test]
fn health_change_validates_before_writing() {
    let mut world = ready_world(CoordinatePolicy::default());
    world
        .spawn_unit(&spawn(1, "SOLDIER", 10.0, 10.0))
        .expect("spawn");
    let _ = world.take_changes();

    assert_eq!(
        world.change_health(&[UnitId::new(1), UnitId::new(2)], &[5.0]),
        Err(WorldError::HealthLengthMismatch { ids: 2, values: 1 })
    );
    assert_eq!(
        world.change_health(&[UnitId::new(1), UnitId::new(2)], &[5.0, 6.0]),
        Err(WorldError::UnknownUnit { id: UnitId::new(2) })
    );
    let unit = query::unit(&world, UnitId::new(1)).expect("unit");
    assert!((unit.health() - 60.0).abs() < f64::EPSILON);
    assert!(world.take_changes().is_empty());

    world
        .change_health(&[UnitId::new(1)], &[12.0])
        .expect("health change");
    assert_eq!(
        world.take_changes(),
        vec![Change::HealthChanged(UnitId::new(1))]
    );
}

#[test]
fn kill_unknown_unit_is_an_error() {
    let mut world = ready_world(CoordinatePolicy::default());
    assert_eq!(
        world.kill_unit(UnitId::new(9)).map(|unit| unit.id()),
        Err(WorldError::UnknownUnit { id: UnitId::new(9) })
    );
}

#[test]
fn terrain_edits_follow_coordinate_policy() {
    let mut relative = ready_world(CoordinatePolicy::default());
    let cell = relative
        .change_terrain(TerrainEdit::Rubble(120.0), Loc::new(12.0, 13.0))
        .expect("relative edit");
    assert_eq!(cell, GridPos::new(2, 3));
    assert_eq!(
        query::map(&relative).and_then(|map| map.rubble(cell)),
        Some(120.0)
    );

    let mut absolute = ready_world(CoordinatePolicy::new(false, true));
    let cell = absolute
        .change_terrain(TerrainEdit::Parts(40.0), Loc::new(2.0, 3.0))
        .expect("absolute edit");
    assert_eq!(cell, GridPos::new(2, 3));
    assert_eq!(
        query::map(&absolute).and_then(|map| map.parts(cell)),
        Some(40.0)
    );
}

#[test]
fn terrain_edit_outside_grid_is_rejected() {
    let mut world = ready_world(CoordinatePolicy::default());
    assert_eq!(
        world.change_terrain(TerrainEdit::Rubble(1.0), Loc::new(20.0, 10.0)),
        Err(WorldError::OutOfBounds {
            loc: Loc::new(10.0, 0.0)
        })
    );
    assert!(matches!(
        world.change_terrain(TerrainEdit::Rubble(1.0), Loc::new(5.0, 10.0)),
        Err(WorldError::OutOfBounds { .. })
    ));
}

#[test]
fn round_counter_only_moves_forward() {
    let mut world = World::default();
    assert_eq!(query::current_round(&world), 0);
    world.advance_round();
    world.advance_round();
    assert_eq!(query::current_round(&world), 2);
}

#[test]
fn match_summary_collects_metadata_and_winner() {
    let mut world = World::default();
    world.record_metadata(MatchMetadata {
        match_type: "bc16".to_owned(),
        team_a: "red".to_owned(),
        team_b: "blue".to_owned(),
        maps: "field".to_owned(),
    });
    world.record_footer(Footer {
        winner: "A".to_owned(),
    });

    let summary = query::match_summary(&world);
    assert_eq!(summary.team_a, "red");
    assert_eq!(summary.winner.as_deref(), Some("A"));
    assert_eq!(summary.domination_factor, None);
    assert_eq!(
        world.take_changes(),
        vec![Change::SummaryUpdated, Change::SummaryUpdated]
    );
}
