#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for the spectator.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! The backend draws the retained [`Scene`] with primitive shapes. The map is
//! scaled uniformly to fit the window, leaving a fixed margin on every side.

use anyhow::{ensure, Result};
use glam::Vec2;
use macroquad::{
    color::BLACK,
    input::{is_key_pressed, KeyCode},
};
use spectator_rendering::{
    Color, EffectShape, FrameControl, Presentation, RenderingBackend, Scene, TileShade,
    UnitSprite,
};
use std::time::Duration;
use tracing::info;

const MARGIN: f32 = 10.0;
const DEFAULT_WINDOW_SIZE: i32 = 960;
const UNIT_INSET: f32 = 0.1;
const HEALTH_BAR_HEIGHT: f32 = 0.12;
const EFFECT_LINE_WIDTH: f32 = 0.08;

/// Rendering backend implemented on top of macroquad.
#[derive(Clone, Copy, Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    window_width: i32,
    window_height: i32,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            window_width: DEFAULT_WINDOW_SIZE,
            window_height: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame rate once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Configures the initial window size in pixels.
    #[must_use]
    pub fn with_window_size(mut self, width: i32, height: i32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }
}

/// Edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` closes the window.
    quit_requested: bool,
    /// `H` toggles unit health bars.
    toggle_health_bars: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            toggle_health_bars: is_key_pressed(KeyCode::H),
        }
    }
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
}

impl FpsCounter {
    /// Records a rendered frame and returns the average rate once one second has elapsed.
    fn record_frame(&mut self, frame: Duration) -> Option<f32> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let per_second = self.frames as f32 / self.elapsed.as_secs_f32();
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(per_second)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameControl + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            window_width,
            window_height,
        } = self;
        ensure!(
            window_width > 0 && window_height > 0,
            "window size must be positive, got {window_width}x{window_height}"
        );

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width,
            window_height,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();
            let mut show_health_bars = true;

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }
                if keyboard.toggle_health_bars {
                    show_health_bars = !show_health_bars;
                }

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                if update_scene(frame_dt, &mut scene) == FrameControl::Exit {
                    break;
                }

                macroquad::window::clear_background(background);
                let metrics = SceneMetrics::from_scene(
                    &scene,
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );
                draw_tiles(&scene, &metrics);
                draw_units(&scene, &metrics, show_health_bars);
                draw_effects(&scene.effects, &metrics);

                if let Some(per_second) = fps_counter.record_frame(frame_dt) {
                    if show_fps {
                        info!(fps = f64::from(per_second), "frame rate");
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Screen placement of the map grid.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    /// Pixels per cell.
    cell_step: f32,
    offset_x: f32,
    offset_y: f32,
}

impl SceneMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        let columns = scene.columns as f32;
        let rows = scene.rows as f32;
        let available_width = (screen_width - 2.0 * MARGIN).max(0.0);
        let available_height = (screen_height - 2.0 * MARGIN).max(0.0);
        let cell_step = if columns == 0.0 || rows == 0.0 {
            0.0
        } else {
            (available_width / columns).min(available_height / rows)
        };

        Self {
            cell_step,
            offset_x: MARGIN + (available_width - columns * cell_step) * 0.5,
            offset_y: MARGIN + (available_height - rows * cell_step) * 0.5,
        }
    }

    fn to_screen(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            self.offset_x + position.x * self.cell_step,
            self.offset_y + position.y * self.cell_step,
        )
    }
}

fn draw_tiles(scene: &Scene, metrics: &SceneMetrics) {
    if metrics.cell_step <= f32::EPSILON || scene.columns == 0 {
        return;
    }

    let parts_color = to_macroquad_color(TileShade::PARTS_COLOR);
    let columns = scene.columns as usize;
    for (index, shade) in scene.tiles.iter().enumerate() {
        let cell = Vec2::new((index % columns) as f32, (index / columns) as f32);
        let corner = metrics.to_screen(cell);
        if shade.fill.alpha > f32::EPSILON {
            macroquad::shapes::draw_rectangle(
                corner.x,
                corner.y,
                metrics.cell_step,
                metrics.cell_step,
                to_macroquad_color(shade.fill),
            );
        }
        if let Some(radius) = shade.parts_radius {
            let center = metrics.to_screen(cell + Vec2::splat(0.5));
            macroquad::shapes::draw_circle(
                center.x,
                center.y,
                radius * metrics.cell_step,
                parts_color,
            );
        }
    }
}

fn draw_units(scene: &Scene, metrics: &SceneMetrics, show_health_bars: bool) {
    if metrics.cell_step <= f32::EPSILON {
        return;
    }

    for sprite in scene.units.values() {
        draw_unit(sprite, metrics);
        if show_health_bars {
            draw_health_bar(sprite, metrics);
        }
    }
}

fn draw_unit(sprite: &UnitSprite, metrics: &SceneMetrics) {
    let corner = metrics.to_screen(sprite.position + Vec2::splat(UNIT_INSET));
    let side = metrics.cell_step * (1.0 - 2.0 * UNIT_INSET);
    macroquad::shapes::draw_rectangle(
        corner.x,
        corner.y,
        side,
        side,
        to_macroquad_color(sprite.color),
    );
    macroquad::shapes::draw_rectangle_lines(corner.x, corner.y, side, side, 1.0, BLACK);

    if let Some(glyph) = sprite.kind.chars().next() {
        let font_size = side * 0.8;
        let _ = macroquad::text::draw_text(
            &glyph.to_string(),
            corner.x + side * 0.25,
            corner.y + side * 0.8,
            font_size,
            BLACK,
        );
    }
}

fn draw_health_bar(sprite: &UnitSprite, metrics: &SceneMetrics) {
    let corner = metrics.to_screen(sprite.position + Vec2::new(0.0, 1.0 - HEALTH_BAR_HEIGHT));
    let width = metrics.cell_step;
    let height = (metrics.cell_step * HEALTH_BAR_HEIGHT).max(2.0);
    macroquad::shapes::draw_rectangle(corner.x, corner.y, width, height, BLACK);

    let fill = width * sprite.health_ratio.clamp(0.0, 1.0);
    if fill > f32::EPSILON {
        macroquad::shapes::draw_rectangle(
            corner.x,
            corner.y,
            fill,
            height,
            to_macroquad_color(sprite.bar_color),
        );
    }
}

fn draw_effects(effects: &[EffectShape], metrics: &SceneMetrics) {
    if metrics.cell_step <= f32::EPSILON {
        return;
    }

    let thickness = (metrics.cell_step * EFFECT_LINE_WIDTH).max(1.0);
    for effect in effects {
        match *effect {
            EffectShape::Line { from, to, color } => {
                let from = metrics.to_screen(from);
                let to = metrics.to_screen(to);
                macroquad::shapes::draw_line(
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    thickness,
                    to_macroquad_color(color),
                );
            }
            EffectShape::Disc {
                center,
                radius,
                color,
            } => {
                let center = metrics.to_screen(center);
                macroquad::shapes::draw_circle(
                    center.x,
                    center.y,
                    radius * metrics.cell_step,
                    to_macroquad_color(color),
                );
            }
            EffectShape::Ring {
                center,
                radius,
                color,
            } => {
                let center = metrics.to_screen(center);
                macroquad::shapes::draw_circle_lines(
                    center.x,
                    center.y,
                    radius * metrics.cell_step,
                    thickness,
                    to_macroquad_color(color),
                );
            }
        }
    }
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
