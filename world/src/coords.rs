use spectator_core::Loc;

/// Category of a wire location, deciding whether the map origin is subtracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationKind {
    /// Unit positions, attack targets and clear-rubble targets.
    Unit,
    /// Rubble and parts change locations.
    Terrain,
    /// Broadcast origins.
    Broadcast,
}

/// Decides how wire locations are converted into grid-local coordinates.
///
/// Unit locations are always shifted by the map origin. Terrain and broadcast
/// locations have been observed both ways across server builds, so their
/// treatment is configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatePolicy {
    terrain_relative: bool,
    broadcast_relative: bool,
}

impl CoordinatePolicy {
    /// Creates a policy with explicit terrain and broadcast treatment.
    #[must_use]
    pub const fn new(terrain_relative: bool, broadcast_relative: bool) -> Self {
        Self {
            terrain_relative,
            broadcast_relative,
        }
    }

    /// Reports whether terrain locations are shifted by the origin.
    #[must_use]
    pub const fn terrain_relative(&self) -> bool {
        self.terrain_relative
    }

    /// Reports whether broadcast locations are shifted by the origin.
    #[must_use]
    pub const fn broadcast_relative(&self) -> bool {
        self.broadcast_relative
    }

    /// Converts a wire location into grid-local coordinates.
    #[must_use]
    pub fn normalize(&self, kind: LocationKind, loc: Loc, origin: Loc) -> Loc {
        let relative = match kind {
            LocationKind::Unit => true,
            LocationKind::Terrain => self.terrain_relative,
            LocationKind::Broadcast => self.broadcast_relative,
        };
        if relative {
            loc.relative_to(origin)
        } else {
            loc
        }
    }
}

impl Default for CoordinatePolicy {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_locations_are_always_relative() {
        let policy = CoordinatePolicy::new(false, false);
        let origin = Loc::new(100.0, 50.0);
        assert_eq!(
            policy.normalize(LocationKind::Unit, Loc::new(103.0, 52.0), origin),
            Loc::new(3.0, 2.0)
        );
    }

    #[test]
    fn terrain_and_broadcast_follow_policy() {
        let origin = Loc::new(100.0, 50.0);
        let absolute = CoordinatePolicy::new(false, false);
        assert_eq!(
            absolute.normalize(LocationKind::Terrain, Loc::new(3.0, 2.0), origin),
            Loc::new(3.0, 2.0)
        );

        let relative = CoordinatePolicy::default();
        assert_eq!(
            relative.normalize(LocationKind::Broadcast, Loc::new(103.0, 52.0), origin),
            Loc::new(3.0, 2.0)
        );
    }
}
