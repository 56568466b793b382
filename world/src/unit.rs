use spectator_core::{Loc, Team, UnitId};

/// Unit tracked by the world, expressed in grid-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) team: Team,
    pub(crate) kind: String,
    pub(crate) parent: Option<UnitId>,
    pub(crate) loc: Loc,
    pub(crate) from: Loc,
    pub(crate) move_start: u32,
    pub(crate) delay: u32,
    pub(crate) health: f64,
    pub(crate) max_health: f64,
    pub(crate) animating: bool,
}

impl Unit {
    /// Identifier assigned by the server.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Team the unit fights for.
    #[must_use]
    pub fn team(&self) -> &Team {
        &self.team
    }

    /// Archetype name of the unit.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Unit that produced this one, if reported.
    #[must_use]
    pub const fn parent(&self) -> Option<UnitId> {
        self.parent
    }

    /// Destination of the latest move, or the spawn location.
    #[must_use]
    pub const fn loc(&self) -> Loc {
        self.loc
    }

    /// Location the latest move started from.
    #[must_use]
    pub const fn move_from(&self) -> Loc {
        self.from
    }

    /// Round in which the latest move started.
    #[must_use]
    pub const fn move_start(&self) -> u32 {
        self.move_start
    }

    /// Delay reported with the latest move.
    #[must_use]
    pub const fn delay(&self) -> u32 {
        self.delay
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Maximum health taken from the unit's archetype.
    #[must_use]
    pub const fn max_health(&self) -> f64 {
        self.max_health
    }

    /// Current health as a fraction of maximum health, clamped to `[0, 1]`.
    #[must_use]
    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Reports whether the unit is still travelling between `from` and `loc`.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.animating
    }

    /// Progress of the latest move, `min(1, round - start + 2 * fraction)`.
    #[must_use]
    pub fn move_progress(&self, round: u32, fraction: f32) -> f64 {
        let rounds = f64::from(round) - f64::from(self.move_start);
        (rounds + 2.0 * f64::from(fraction)).clamp(0.0, 1.0)
    }

    /// Location to draw the unit at for the given round and sub-round fraction.
    #[must_use]
    pub fn position(&self, round: u32, fraction: f32) -> Loc {
        if !self.animating {
            return self.loc;
        }
        self.from.lerp(self.loc, self.move_progress(round, fraction))
    }
}
