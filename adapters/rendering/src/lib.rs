#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for spectator adapters.
//!
//! The presenter talks to a [`RenderFacade`]; [`Scene`] is the retained
//! implementation every backend draws from. Backends implement
//! [`RenderingBackend`] and hand the scene to an update closure each frame.

mod scene;

use anyhow::Result as AnyResult;
use spectator_core::{Constants, Effect, GameMap, GridPos, Loc, Team};
use std::time::Duration;

pub use scene::{EffectShape, Scene, TileShade, UnitSprite};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha channel.
    #[must_use]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Base color of a team: A red, B blue, neutral white, anything else green.
#[must_use]
pub fn team_color(team: &Team) -> Color {
    match team {
        Team::A => Color::new(1.0, 0.0, 0.0, 1.0),
        Team::B => Color::new(0.0, 0.0, 1.0, 1.0),
        Team::Neutral => Color::new(1.0, 1.0, 1.0, 1.0),
        Team::Other(_) => Color::new(0.0, 1.0, 0.0, 1.0),
    }
}

/// Lighter team color used for health bars and effects.
#[must_use]
pub fn team_accent(team: &Team) -> Color {
    team_color(team).lighten(0.5)
}

/// Opaque handle to the drawables created for one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawHandle(u64);

impl DrawHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw value of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Drawing surface the presenter issues commands to.
///
/// Locations are grid-local; a unit at `(x, y)` covers the cell whose
/// top-left corner is `(x, y)`.
pub trait RenderFacade {
    /// Prepares the surface for a map of the given size.
    fn resize(&mut self, map: &GameMap);

    /// Draws every tile of the map.
    fn draw_map(&mut self, map: &GameMap, constants: &Constants);

    /// Redraws a single tile.
    fn draw_tile(&mut self, map: &GameMap, constants: &Constants, cell: GridPos);

    /// Creates the drawables for a newly spawned unit.
    fn create_unit_drawables(&mut self, kind: &str, team: &Team, loc: Loc) -> DrawHandle;

    /// Releases the drawables behind a handle.
    fn remove_unit_drawables(&mut self, handle: DrawHandle);

    /// Positions a unit's drawables.
    fn draw_unit(&mut self, handle: DrawHandle, position: Loc);

    /// Redraws a unit's health bar with health as a fraction of its maximum.
    fn draw_health_bar(&mut self, handle: DrawHandle, ratio: f64);

    /// Clears the effect layer before the live effects are drawn again.
    fn clear_effects(&mut self);

    /// Draws one effect at the given animation progress.
    fn draw_effect(&mut self, effect: &Effect, progress: f32);
}

/// Decision returned by the per-frame update closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Keep presenting frames.
    Continue,
    /// Close the backend after this frame.
    Exit,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting spectator scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the update closure asks to exit or the
    /// window is closed.
    ///
    /// The `update_scene` closure receives the frame delta and mutates the
    /// scene before it is drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameControl + 'static;
}
