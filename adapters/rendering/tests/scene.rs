use glam::Vec2;
use spectator_core::{
    Constants, Effect, EffectId, EffectKind, GameMap, GridPos, Loc, MapHeader, Team, Value,
    RUBBLE_OBSTRUCTION_THRESHOLD,
};
use spectator_rendering::{team_color, EffectShape, RenderFacade, Scene, TileShade};

fn map() -> GameMap {
    GameMap::from_header(&MapHeader {
        width: 3,
        height: 2,
        name: "shading".to_owned(),
        origin: Loc::new(0.0, 0.0),
        initial_rubble: vec![vec![0.0, 50.0, 150.0], vec![0.0, 0.0, 0.0]],
        initial_parts: vec![vec![0.0, 0.0, 0.0], vec![1.0, 15.0, 300.0]],
    })
}

fn constants(threshold: i64) -> Constants {
    Constants::from_entries([(
        RUBBLE_OBSTRUCTION_THRESHOLD.to_owned(),
        Value::Int(threshold),
    )])
}

fn drawn_scene(constants: &Constants) -> Scene {
    let map = map();
    let mut scene = Scene::new();
    scene.resize(&map);
    scene.draw_map(&map, constants);
    scene
}

#[test]
fn rubble_shading_follows_obstruction_threshold() {
    let scene = drawn_scene(&constants(100));

    let clear = scene.tile(GridPos::new(0, 0)).expect("tile");
    assert!(!clear.obstructed);
    assert!(clear.fill.alpha.abs() < f32::EPSILON);

    let partial = scene.tile(GridPos::new(1, 0)).expect("tile");
    assert!(!partial.obstructed);
    assert!((partial.fill.alpha - 0.25).abs() < 1e-6);

    let blocked = scene.tile(GridPos::new(2, 0)).expect("tile");
    assert!(blocked.obstructed);
    assert!((blocked.fill.alpha - 0.5).abs() < f32::EPSILON);
}

#[test]
fn threshold_defaults_when_constant_missing() {
    let scene = drawn_scene(&Constants::default());
    assert!(scene.tile(GridPos::new(2, 0)).expect("tile").obstructed);

    let strict = drawn_scene(&constants(40));
    assert!(strict.tile(GridPos::new(1, 0)).expect("tile").obstructed);
}

#[test]
fn parts_marker_radius_is_capped() {
    let scene = drawn_scene(&constants(100));
    assert_eq!(scene.tile(GridPos::new(0, 1)).expect("tile").parts_radius, None);
    let small = scene
        .tile(GridPos::new(1, 1))
        .expect("tile")
        .parts_radius
        .expect("parts marker");
    assert!((small - 0.2).abs() < 1e-6);
    let capped = scene
        .tile(GridPos::new(2, 1))
        .expect("tile")
        .parts_radius
        .expect("parts marker");
    assert!((capped - 0.4).abs() < 1e-6);
}

#[test]
fn unit_drawables_have_unique_handles_and_team_colors() {
    let mut scene = Scene::new();
    let first = scene.create_unit_drawables("SOLDIER", &Team::A, Loc::new(1.0, 2.0));
    let second = scene.create_unit_drawables("ARCHON", &Team::B, Loc::new(0.0, 0.0));
    assert_ne!(first, second);

    let sprite = scene.unit(first).expect("sprite");
    assert_eq!(sprite.color, team_color(&Team::A));
    assert_eq!(sprite.position, Vec2::new(1.0, 2.0));
    assert!((sprite.health_ratio - 1.0).abs() < f32::EPSILON);

    scene.draw_unit(first, Loc::new(1.5, 2.0));
    scene.draw_health_bar(first, 0.25);
    let sprite = scene.unit(first).expect("sprite");
    assert_eq!(sprite.position, Vec2::new(1.5, 2.0));
    assert!((sprite.health_ratio - 0.25).abs() < f32::EPSILON);

    scene.remove_unit_drawables(first);
    assert!(scene.unit(first).is_none());
    scene.draw_unit(first, Loc::new(0.0, 0.0));
    assert!(scene.unit(first).is_none());
    assert_eq!(scene.units.len(), 1);
}

#[test]
fn effects_resolve_to_shapes() {
    let mut scene = Scene::new();
    let attack = Effect {
        id: EffectId::new(0),
        kind: EffectKind::Attack {
            from: Loc::new(0.0, 0.0),
            to: Loc::new(2.0, 0.0),
            team: Team::A,
        },
        start: 4,
        duration: EffectKind::ATTACK_ROUNDS,
    };
    scene.draw_effect(&attack, 0.5);
    let death = Effect {
        id: EffectId::new(1),
        kind: EffectKind::Death {
            at: Loc::new(1.0, 1.0),
            team: Team::B,
        },
        start: 4,
        duration: EffectKind::DEATH_ROUNDS,
    };
    scene.draw_effect(&death, 0.5);

    assert_eq!(scene.effects.len(), 2);
    match scene.effects[0] {
        EffectShape::Line { from, to, .. } => {
            assert!((from - Vec2::new(1.3, 0.5)).length() < 1e-5);
            assert!((to - Vec2::new(1.5, 0.5)).length() < 1e-5);
        }
        other => panic!("expected line, got {other:?}"),
    }
    match scene.effects[1] {
        EffectShape::Disc { center, radius, .. } => {
            assert_eq!(center, Vec2::new(1.5, 1.5));
            assert!((radius - 0.25).abs() < f32::EPSILON);
        }
        other => panic!("expected disc, got {other:?}"),
    }

    scene.clear_effects();
    assert!(scene.effects.is_empty());
}

#[test]
fn default_tile_is_unobstructed_and_empty() {
    let shade = TileShade::default();
    assert!(!shade.obstructed);
    assert_eq!(shade.parts_radius, None);
}
