use std::collections::HashMap;

use spectator_core::UnitId;
use spectator_rendering::{DrawHandle, RenderFacade};
use spectator_world::{query, Change, World};
use tracing::trace;

/// Counts of what a presented frame drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentStats {
    /// Units repositioned this frame.
    pub moved_units: usize,
    /// Live effects drawn this frame.
    pub effects: usize,
    /// Journal entries consumed this frame.
    pub changes: usize,
}

/// Translates world changes and state into façade commands.
///
/// The presenter owns the mapping from units to their drawables and releases
/// every handle exactly once.
#[derive(Debug, Default)]
pub struct Presenter {
    handles: HashMap<UnitId, DrawHandle>,
}

impl Presenter {
    /// Creates a presenter without drawables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawables currently held for a unit.
    #[must_use]
    pub fn handle(&self, id: UnitId) -> Option<DrawHandle> {
        self.handles.get(&id).copied()
    }

    /// Number of units with live drawables.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Draws one frame at the given sub-round fraction.
    ///
    /// Drains the change journal first so that tiles, drawables and health
    /// bars reflect every applied event before units and effects animate.
    pub fn present<F>(&mut self, world: &mut World, facade: &mut F, fraction: f32) -> PresentStats
    where
        F: RenderFacade + ?Sized,
    {
        let changes = world.take_changes();
        let change_count = changes.len();
        for change in changes {
            self.apply_change(world, facade, change);
        }

        let round = query::current_round(world);
        let mut moved_units = 0;
        for unit in query::units(world).filter(|unit| unit.is_animating()) {
            if let Some(handle) = self.handles.get(&unit.id()) {
                facade.draw_unit(*handle, unit.position(round, fraction));
                moved_units += 1;
            }
        }

        facade.clear_effects();
        let mut effects = 0;
        for effect in query::live_effects(world, round) {
            facade.draw_effect(effect, effect.progress(round, fraction));
            effects += 1;
        }

        PresentStats {
            moved_units,
            effects,
            changes: change_count,
        }
    }

    fn apply_change<F>(&mut self, world: &World, facade: &mut F, change: Change)
    where
        F: RenderFacade + ?Sized,
    {
        match change {
            Change::MapReplaced | Change::ConstantsReplaced => {
                if let Some(map) = query::map(world) {
                    if change == Change::MapReplaced {
                        facade.resize(map);
                    }
                    facade.draw_map(map, query::constants(world));
                }
            }
            Change::TileChanged(cell) => {
                if let Some(map) = query::map(world) {
                    facade.draw_tile(map, query::constants(world), cell);
                }
            }
            Change::UnitSpawned {
                id,
                kind,
                team,
                loc,
            } => {
                let handle = facade.create_unit_drawables(&kind, &team, loc);
                if let Some(stale) = self.handles.insert(id, handle) {
                    facade.remove_unit_drawables(stale);
                }
                trace!(unit = %id, handle = handle.get(), "drawables created");
            }
            Change::UnitRemoved(id) => {
                if let Some(handle) = self.handles.remove(&id) {
                    facade.remove_unit_drawables(handle);
                    trace!(unit = %id, handle = handle.get(), "drawables released");
                }
            }
            Change::HealthChanged(id) => {
                if let (Some(unit), Some(handle)) = (query::unit(world, id), self.handles.get(&id))
                {
                    facade.draw_health_bar(*handle, unit.health_ratio());
                }
            }
            Change::SummaryUpdated => {}
        }
    }
}
