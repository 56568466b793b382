use std::collections::BTreeMap;

use glam::Vec2;
use spectator_core::{
    Constants, Effect, EffectKind, GameMap, GridPos, Loc, Team, RUBBLE_OBSTRUCTION_THRESHOLD,
};
use tracing::debug;

use crate::{team_accent, team_color, Color, DrawHandle, RenderFacade};

const DEFAULT_OBSTRUCTION_THRESHOLD: f64 = 100.0;
const PARTS_SCALE: f64 = 75.0;
const MAX_PARTS_RADIUS: f64 = 0.4;
const OBSTRUCTED_FILL: Color = Color::new(0.8, 0.8, 0.8, 0.5);
const RUBBLE_FILL: Color = Color::from_rgb_u8(0xaa, 0xaa, 0xaa);
const PARTS_FILL: Color = Color::from_rgb_u8(0xcc, 0x7a, 0x00);
const BROADCAST_COLOR: Color = Color::new(1.0, 0.0, 1.0, 1.0);

/// Shading of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileShade {
    /// Whether rubble exceeds the obstruction threshold.
    pub obstructed: bool,
    /// Fill color of the cell square.
    pub fill: Color,
    /// Radius of the parts marker in cell units, when parts lie on the cell.
    pub parts_radius: Option<f32>,
}

impl TileShade {
    /// Color of the parts marker.
    pub const PARTS_COLOR: Color = PARTS_FILL;

    /// Computes the shading of a cell from its rubble and parts levels.
    #[must_use]
    pub fn from_levels(rubble: f64, parts: f64, threshold: f64) -> Self {
        let threshold = if threshold > 0.0 {
            threshold
        } else {
            DEFAULT_OBSTRUCTION_THRESHOLD
        };
        let obstructed = rubble > threshold;
        let fill = if obstructed {
            OBSTRUCTED_FILL
        } else {
            RUBBLE_FILL.with_alpha((rubble * 0.5 / threshold) as f32)
        };
        let parts_radius =
            (parts > 1.0).then(|| (parts / PARTS_SCALE).min(MAX_PARTS_RADIUS) as f32);
        Self {
            obstructed,
            fill,
            parts_radius,
        }
    }
}

impl Default for TileShade {
    fn default() -> Self {
        Self::from_levels(0.0, 0.0, DEFAULT_OBSTRUCTION_THRESHOLD)
    }
}

/// Drawables of one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSprite {
    /// Archetype name, used to pick a glyph.
    pub kind: String,
    /// Team of the unit.
    pub team: Team,
    /// Body color.
    pub color: Color,
    /// Top-left corner of the unit's square in cell units.
    pub position: Vec2,
    /// Health bar fill in `[0, 1]`.
    pub health_ratio: f32,
    /// Health bar color.
    pub bar_color: Color,
}

/// Geometry of an effect, already resolved for the current frame.
///
/// Coordinates are cell centers in cell units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectShape {
    /// Segment travelling from an attacker to its target.
    Line {
        /// Segment start.
        from: Vec2,
        /// Segment end.
        to: Vec2,
        /// Stroke color.
        color: Color,
    },
    /// Filled circle growing where a unit died.
    Disc {
        /// Circle center.
        center: Vec2,
        /// Circle radius.
        radius: f32,
        /// Fill color.
        color: Color,
    },
    /// Expanding ring of a broadcast.
    Ring {
        /// Ring center.
        center: Vec2,
        /// Ring radius.
        radius: f32,
        /// Stroke color.
        color: Color,
    },
}

/// Retained scene every backend draws from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Number of columns of the current map.
    pub columns: u32,
    /// Number of rows of the current map.
    pub rows: u32,
    /// Tile shading in row-major order.
    pub tiles: Vec<TileShade>,
    /// Unit drawables keyed by handle.
    pub units: BTreeMap<DrawHandle, UnitSprite>,
    /// Effect layer for the current frame.
    pub effects: Vec<EffectShape>,
    next_handle: u64,
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shading of a cell, if it lies inside the current map.
    #[must_use]
    pub fn tile(&self, cell: GridPos) -> Option<&TileShade> {
        self.tile_index(cell).and_then(|index| self.tiles.get(index))
    }

    /// Drawables behind a handle.
    #[must_use]
    pub fn unit(&self, handle: DrawHandle) -> Option<&UnitSprite> {
        self.units.get(&handle)
    }

    fn tile_index(&self, cell: GridPos) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let columns = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        Some(row * columns + column)
    }

    fn sprite_mut(&mut self, handle: DrawHandle) -> Option<&mut UnitSprite> {
        let sprite = self.units.get_mut(&handle);
        if sprite.is_none() {
            debug!(handle = handle.get(), "ignoring command for released handle");
        }
        sprite
    }
}

impl RenderFacade for Scene {
    fn resize(&mut self, map: &GameMap) {
        self.columns = map.width();
        self.rows = map.height();
        self.tiles = vec![TileShade::default(); map.cells().count()];
    }

    fn draw_map(&mut self, map: &GameMap, constants: &Constants) {
        for cell in map.cells() {
            self.draw_tile(map, constants, cell);
        }
    }

    fn draw_tile(&mut self, map: &GameMap, constants: &Constants, cell: GridPos) {
        let threshold = constants
            .number(RUBBLE_OBSTRUCTION_THRESHOLD)
            .unwrap_or(DEFAULT_OBSTRUCTION_THRESHOLD);
        let shade = TileShade::from_levels(
            map.rubble(cell).unwrap_or_default(),
            map.parts(cell).unwrap_or_default(),
            threshold,
        );
        if let Some(slot) = self
            .tile_index(cell)
            .and_then(|index| self.tiles.get_mut(index))
        {
            *slot = shade;
        }
    }

    fn create_unit_drawables(&mut self, kind: &str, team: &Team, loc: Loc) -> DrawHandle {
        let handle = DrawHandle::new(self.next_handle);
        self.next_handle += 1;
        let sprite = UnitSprite {
            kind: kind.to_owned(),
            team: team.clone(),
            color: team_color(team),
            position: to_vec(loc),
            health_ratio: 1.0,
            bar_color: team_accent(team),
        };
        let _ = self.units.insert(handle, sprite);
        handle
    }

    fn remove_unit_drawables(&mut self, handle: DrawHandle) {
        if self.units.remove(&handle).is_none() {
            debug!(handle = handle.get(), "handle already released");
        }
    }

    fn draw_unit(&mut self, handle: DrawHandle, position: Loc) {
        if let Some(sprite) = self.sprite_mut(handle) {
            sprite.position = to_vec(position);
        }
    }

    fn draw_health_bar(&mut self, handle: DrawHandle, ratio: f64) {
        if let Some(sprite) = self.sprite_mut(handle) {
            sprite.health_ratio = ratio.clamp(0.0, 1.0) as f32;
        }
    }

    fn clear_effects(&mut self) {
        self.effects.clear();
    }

    fn draw_effect(&mut self, effect: &Effect, progress: f32) {
        let shape = match &effect.kind {
            EffectKind::Attack { from, to, team } => {
                travelling_line(*from, *to, progress, team_accent(team))
            }
            EffectKind::Clear { from, to } => {
                travelling_line(*from, *to, progress, team_accent(&Team::Neutral))
            }
            EffectKind::Death { at, team } => EffectShape::Disc {
                center: center_of(*at),
                radius: progress.clamp(0.0, 1.0) / 2.0,
                color: team_accent(team),
            },
            EffectKind::Broadcast { at, .. } => EffectShape::Ring {
                center: center_of(*at),
                radius: (0.1 + progress * 2.0).clamp(0.1, 2.1) / 2.0,
                color: BROADCAST_COLOR.with_alpha(1.0 - progress),
            },
        };
        self.effects.push(shape);
    }
}

fn travelling_line(from: Loc, to: Loc, progress: f32, color: Color) -> EffectShape {
    let from = center_of(from);
    let to = center_of(to);
    let head = progress.clamp(0.0, 1.0);
    let tail = (progress - 0.1).clamp(0.0, 1.0);
    EffectShape::Line {
        from: from.lerp(to, tail),
        to: from.lerp(to, head),
        color,
    }
}

fn to_vec(loc: Loc) -> Vec2 {
    Vec2::new(loc.x as f32, loc.y as f32)
}

fn center_of(loc: Loc) -> Vec2 {
    to_vec(loc) + Vec2::splat(0.5)
}
