use glam::DVec2;
use lionengine_core::{Axis, CollisionCategory, TileCoord};
use lionengine_system_tile_collision::{resolve_axis, TileCollision, Transform};
use lionengine_world::{CollisionConfig, MapConfig, TileMap};

const DEFINITIONS: &str = r#"
    [[formulas]]
    name = "top"
    range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
    function = { type = "linear", a = 0.0, b = 15.0 }

    [[formulas]]
    name = "slope"
    range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
    function = { type = "linear", a = 1.0, b = 0.0 }

    [[formulas]]
    name = "wall-left"
    range = { axis = "x", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
    function = { type = "linear", a = 0.0, b = 0.0 }

    [[formulas]]
    name = "fork-high"
    range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
    function = { type = "linear", a = -1.0, b = 15.0 }

    [[formulas]]
    name = "fork-low"
    range = { axis = "y", min_x = 0, max_x = 15, min_y = 0, max_y = 15 }
    function = { type = "linear", a = 1.0, b = 0.0 }

    [[groups]]
    name = "block"
    formulas = ["top"]

    [[groups]]
    name = "ramp"
    formulas = ["slope"]

    [[groups]]
    name = "wall"
    formulas = ["wall-left"]

    [[groups]]
    name = "fork"
    formulas = ["fork-high", "fork-low"]

    [[groups]]
    name = "water"
    formulas = ["top"]

    [[categories]]
    name = "feet"
    axis = "y"
    offset_y = -8.0
    groups = ["block", "ramp", "fork"]

    [[categories]]
    name = "front"
    axis = "x"
    offset_x = 4.0
    groups = ["wall"]
"#;

const LEVEL: &str = r###"
    tile_width = 16
    tile_height = 16
    layout = [
        "........",
        "........",
        ".....|..",
        "##/.~X##",
    ]

    [legend]
    "#" = { group = "block" }
    "/" = { group = "ramp" }
    "|" = { group = "wall" }
    "~" = { group = "water" }
    "X" = { group = "fork" }
"###;

fn level() -> (TileMap, TileCollision) {
    let set = CollisionConfig::from_toml_str(DEFINITIONS)
        .expect("parse definitions")
        .build()
        .expect("valid definitions");
    let map: MapConfig = toml::from_str(LEVEL).expect("parse level");
    let map = map.build(&set.groups).expect("level builds");
    (map, TileCollision::new(set.categories))
}

fn feet(collision: &TileCollision) -> &CollisionCategory {
    collision
        .categories()
        .iter()
        .find(|category| category.axis() == Axis::Y)
        .expect("vertical category")
}

fn moving(from: (f64, f64), to: (f64, f64)) -> Transform {
    Transform::new(DVec2::new(from.0, from.1), DVec2::new(to.0, to.1))
}

#[test]
fn falling_onto_block_lands_on_its_top() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((8.0, 40.0), (8.0, 20.0)));

    let hit = resolution.vertical().expect("landed");
    assert_eq!(hit.tile(), TileCoord::new(0, 0));
    assert_eq!(hit.formula(), "top");
    assert_eq!(hit.corrected(), 23.0);
    assert_eq!(resolution.position(), DVec2::new(8.0, 23.0));
    assert!(resolution.grounded());
    assert!(resolution.horizontal().is_none());
}

#[test]
fn huge_falls_are_resolved_within_the_map() {
    let (map, collision) = level();

    let resolution = collision.resolve(&map, &moving((8.0, 40.0), (8.0, -1.0e15)));
    let hit = resolution.vertical().expect("landed");
    assert_eq!(hit.tile(), TileCoord::new(0, 0));
    assert_eq!(hit.corrected(), 23.0);

    let resolution = collision.resolve(&map, &moving((8.0, 1.0e15), (8.0, 20.0)));
    assert_eq!(resolution.position(), DVec2::new(8.0, 23.0));

    let category = feet(&collision);
    assert!(resolve_axis(
        &map,
        DVec2::new(8.0, 1.0e15),
        DVec2::new(8.0, 1.0e12),
        category,
        0.0
    )
    .is_none());
    assert!(resolve_axis(
        &map,
        DVec2::new(-1.0e15, 40.0),
        DVec2::new(-1.0e12, -1.0e15),
        category,
        0.0
    )
    .is_none());
}

#[test]
fn rising_movement_is_not_grounded() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((8.0, 23.0), (8.0, 30.0)));

    assert!(resolution.vertical().is_none());
    assert!(!resolution.grounded());
    assert_eq!(resolution.position(), DVec2::new(8.0, 30.0));
}

#[test]
fn ramp_surface_follows_its_slope() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((40.0, 40.0), (40.0, 0.0)));

    let hit = resolution.vertical().expect("landed on ramp");
    assert_eq!(hit.tile(), TileCoord::new(2, 0));
    assert_eq!(hit.formula(), "slope");
    assert_eq!(resolution.position().y, 16.0);
    assert!(resolution.grounded());
}

#[test]
fn categories_ignore_groups_they_do_not_accept() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((72.0, 40.0), (72.0, 0.0)));

    assert!(resolution.vertical().is_none());
    assert!(!resolution.grounded());
    assert_eq!(resolution.position(), DVec2::new(72.0, 0.0));
}

#[test]
fn walls_clip_horizontal_movement() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((70.0, 24.0), (90.0, 24.0)));

    let hit = resolution.horizontal().expect("hit wall");
    assert_eq!(hit.axis(), Axis::X);
    assert_eq!(hit.tile(), TileCoord::new(5, 1));
    assert_eq!(hit.formula(), "wall-left");
    assert_eq!(resolution.position(), DVec2::new(76.0, 24.0));
    assert!(resolution.vertical().is_none());
}

#[test]
fn movement_away_from_a_wall_is_free() {
    let (map, collision) = level();
    let resolution = collision.resolve(&map, &moving((76.0, 24.0), (60.0, 24.0)));

    assert!(resolution.horizontal().is_none());
    assert_eq!(resolution.position(), DVec2::new(60.0, 24.0));
}

#[test]
fn horizontal_side_picks_between_stacked_formulas() {
    let (map, collision) = level();
    let category = feet(&collision);
    let old = DVec2::new(84.0, 40.0);
    let new = DVec2::new(84.0, 0.0);

    let forward = resolve_axis(&map, old, new, category, 1.0).expect("hit while moving right");
    assert_eq!(forward.formula(), "fork-high");
    assert_eq!(forward.corrected(), 19.0);

    let backward = resolve_axis(&map, old, new, category, -1.0).expect("hit while moving left");
    assert_eq!(backward.formula(), "fork-low");
    assert_eq!(backward.corrected(), 12.0);
}

#[test]
fn no_movement_on_the_tested_axis_yields_no_correction() {
    let (map, collision) = level();
    let category = feet(&collision);
    let resting = DVec2::new(8.0, 23.0);
    assert!(resolve_axis(&map, resting, DVec2::new(20.0, 23.0), category, 1.0).is_none());
}

#[test]
fn gravity_loop_settles_on_the_ground_without_tunnelling() {
    let (map, collision) = level();
    let mut position = DVec2::new(8.0, 80.0);
    let mut velocity = 0.0;
    let mut grounded_ticks = 0;

    for _ in 0..40 {
        velocity -= 1.0;
        let candidate = position + DVec2::new(0.0, velocity);
        let resolution = collision.resolve(&map, &Transform::new(position, candidate));
        position = resolution.position();
        if resolution.grounded() {
            velocity = 0.0;
            grounded_ticks += 1;
        }
    }

    assert_eq!(position, DVec2::new(8.0, 23.0));
    assert!(grounded_ticks > 20, "entity must stay grounded once landed");
}
