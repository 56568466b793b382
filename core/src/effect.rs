use crate::{Loc, Team};

/// Identifier of an effect, assigned in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Creates a new effect identifier with the provided counter value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the counter value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Geometry and styling of a transient visual effect.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectKind {
    /// A unit died at the location.
    Death {
        /// Where the unit died.
        at: Loc,
        /// Team of the unit that died.
        team: Team,
    },
    /// A unit attacked a target location.
    Attack {
        /// Location of the attacker.
        from: Loc,
        /// Location under attack.
        to: Loc,
        /// Team of the attacker.
        team: Team,
    },
    /// A unit is clearing rubble from a neighbouring cell.
    Clear {
        /// Location of the unit doing the work.
        from: Loc,
        /// Cell being cleared.
        to: Loc,
    },
    /// A message broadcast expanding from a location.
    Broadcast {
        /// Origin of the broadcast.
        at: Loc,
        /// Broadcast radius reported by the server.
        radius: f64,
    },
}

impl EffectKind {
    /// Number of rounds a death effect stays visible.
    pub const DEATH_ROUNDS: u32 = 1;
    /// Number of rounds an attack effect stays visible.
    pub const ATTACK_ROUNDS: u32 = 1;
    /// Number of rounds a broadcast effect stays visible.
    pub const BROADCAST_ROUNDS: u32 = 4;
}

/// Short-lived visual annotation anchored to the round it started in.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    /// Creation-order identifier.
    pub id: EffectId,
    /// Geometry of the effect.
    pub kind: EffectKind,
    /// Round in which the effect started.
    pub start: u32,
    /// Number of rounds the effect lasts.
    pub duration: u32,
}

impl Effect {
    /// Reports whether the effect is still visible in `round`.
    ///
    /// An effect expires once `round - start >= duration`.
    #[must_use]
    pub fn is_live_at(&self, round: u32) -> bool {
        round.saturating_sub(self.start) < self.duration
    }

    /// Animation progress of the effect given the sub-round interpolation fraction.
    #[must_use]
    pub fn progress(&self, round: u32, fraction: f32) -> f32 {
        if self.duration == 0 {
            return 1.0;
        }
        let elapsed = round.saturating_sub(self.start) as f32 + fraction;
        elapsed / self.duration as f32
    }
}
