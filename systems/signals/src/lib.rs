#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Signal processor that replays decoded envelopes onto the world model.

use spectator_core::{
    AttackSignal, BroadcastSignal, ClearRubbleSignal, EffectKind, Envelope, Round, Signal,
};
use spectator_world::{query, LocationKind, TerrainEdit, World, WorldError};
use tracing::{debug, error, trace, warn};

/// Errors that end the stream when raised while applying an envelope.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ProcessError {
    /// A round carried a signal tag the spectator does not understand.
    #[error("round {round} carries unrecognized signal `{tag}`")]
    UnrecognizedSignal {
        /// Tag reported by the server.
        tag: String,
        /// Round counter at the time the round was rejected.
        round: u32,
    },
    /// The world rejected a mutation.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Outcome of applying one envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// A header rebuilt the map.
    Map,
    /// Constants and archetypes were replaced.
    Constants,
    /// A round without signals; nothing changed.
    EmptyRound,
    /// A round was applied.
    Round {
        /// Round counter after the round was applied.
        round: u32,
        /// Number of signals dispatched.
        signals: usize,
    },
    /// Match metadata, statistics or the winner were recorded.
    Summary,
}

/// Running totals kept by the processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Rounds applied.
    pub rounds: u64,
    /// Signals that mutated the world or added an effect.
    pub applied_signals: u64,
    /// Informational signals that were accepted without effect.
    pub ignored_signals: u64,
    /// Signals rejected on their own while the rest of the round carried on.
    pub dropped_signals: u64,
}

/// Dispatches decoded envelopes to world mutators.
#[derive(Debug, Default)]
pub struct SignalProcessor {
    stats: ProcessorStats,
}

impl SignalProcessor {
    /// Creates a processor with zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals accumulated since construction.
    #[must_use]
    pub const fn stats(&self) -> ProcessorStats {
        self.stats
    }

    /// Applies one envelope to the world.
    ///
    /// A round containing an unrecognized signal is rejected as a whole before
    /// the round counter moves. A health change with mismatched lists is
    /// dropped on its own. Any error returned here is fatal for the stream.
    pub fn apply(
        &mut self,
        world: &mut World,
        envelope: Envelope,
    ) -> Result<Applied, ProcessError> {
        match envelope {
            Envelope::Header(header) => {
                world.apply_header(&header);
                debug!(
                    width = header.map.width,
                    height = header.map.height,
                    name = %header.map.name,
                    "map loaded"
                );
                Ok(Applied::Map)
            }
            Envelope::StoredConstants(stored) => {
                debug!(
                    constants = stored.constants.len(),
                    archetypes = stored.catalog.len(),
                    "constants loaded"
                );
                world.apply_stored_constants(stored.constants, stored.catalog);
                Ok(Applied::Constants)
            }
            Envelope::Round(round) => self.apply_round(world, round),
            Envelope::Metadata(metadata) => {
                world.record_metadata(metadata);
                Ok(Applied::Summary)
            }
            Envelope::GameStats(stats) => {
                world.record_game_stats(stats);
                Ok(Applied::Summary)
            }
            Envelope::Footer(footer) => {
                world.record_footer(footer);
                Ok(Applied::Summary)
            }
        }
    }

    fn apply_round(&mut self, world: &mut World, round: Round) -> Result<Applied, ProcessError> {
        if round.signals.is_empty() {
            return Ok(Applied::EmptyRound);
        }

        if let Some(tag) = round.signals.iter().find_map(|signal| match signal {
            Signal::Unrecognized { tag } => Some(tag.clone()),
            _ => None,
        }) {
            let current = query::current_round(world);
            error!(round = current, tag = %tag, "rejecting round with unrecognized signal");
            return Err(ProcessError::UnrecognizedSignal {
                tag,
                round: current,
            });
        }

        world.advance_round();
        let current = query::current_round(world);
        let count = round.signals.len();
        for signal in round.signals {
            trace!(round = current, signal = signal.kind_name(), "dispatching signal");
            match dispatch(world, signal)? {
                Dispatch::Applied => self.stats.applied_signals += 1,
                Dispatch::Ignored => self.stats.ignored_signals += 1,
                Dispatch::Dropped => self.stats.dropped_signals += 1,
            }
        }
        self.stats.rounds += 1;

        Ok(Applied::Round {
            round: current,
            signals: count,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dispatch {
    Applied,
    Ignored,
    Dropped,
}

fn dispatch(world: &mut World, signal: Signal) -> Result<Dispatch, ProcessError> {
    match signal {
        Signal::Spawn(spawn) => world.spawn_unit(&spawn)?,
        Signal::Movement(movement) => {
            world.move_unit(movement.robot_id, movement.new_loc, movement.delay)?;
        }
        Signal::Death(death) => {
            let unit = world.kill_unit(death.object_id)?;
            let _ = world.add_effect(
                EffectKind::Death {
                    at: unit.loc(),
                    team: unit.team().clone(),
                },
                EffectKind::DEATH_ROUNDS,
            );
        }
        Signal::Attack(attack) => attack_effect(world, &attack)?,
        Signal::HealthChange(change) => {
            match world.change_health(&change.robot_ids, &change.health) {
                Ok(()) => {}
                Err(err @ WorldError::HealthLengthMismatch { .. }) => {
                    let round = query::current_round(world);
                    warn!(round, error = %err, "dropping health change");
                    return Ok(Dispatch::Dropped);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Signal::ClearRubble(clear) => clear_effect(world, &clear)?,
        Signal::RubbleChange(terrain) => {
            let _ = world.change_terrain(TerrainEdit::Rubble(terrain.amount), terrain.loc)?;
        }
        Signal::PartsChange(terrain) => {
            let _ = world.change_terrain(TerrainEdit::Parts(terrain.amount), terrain.loc)?;
        }
        Signal::Broadcast(broadcast) => broadcast_effect(world, &broadcast),
        Signal::IndicatorString
        | Signal::Infection
        | Signal::TeamResource
        | Signal::BytecodesUsed
        | Signal::RobotDelay => return Ok(Dispatch::Ignored),
        Signal::Unrecognized { tag } => {
            return Err(ProcessError::UnrecognizedSignal {
                tag,
                round: query::current_round(world),
            })
        }
    }
    Ok(Dispatch::Applied)
}

fn attack_effect(world: &mut World, attack: &AttackSignal) -> Result<(), WorldError> {
    let attacker = query::unit(world, attack.robot_id).ok_or(WorldError::UnknownUnit {
        id: attack.robot_id,
    })?;
    let kind = EffectKind::Attack {
        from: attacker.loc(),
        to: world.normalize(LocationKind::Unit, attack.target_loc),
        team: attacker.team().clone(),
    };
    let _ = world.add_effect(kind, EffectKind::ATTACK_ROUNDS);
    Ok(())
}

fn clear_effect(world: &mut World, clear: &ClearRubbleSignal) -> Result<(), WorldError> {
    let from = query::unit(world, clear.robot_id)
        .map(|unit| unit.loc())
        .ok_or(WorldError::UnknownUnit { id: clear.robot_id })?;
    let _ = world.change_terrain(TerrainEdit::Clear, clear.loc)?;
    let kind = EffectKind::Clear {
        from,
        to: world.normalize(LocationKind::Unit, clear.loc),
    };
    let _ = world.add_effect(kind, clear.delay);
    Ok(())
}

fn broadcast_effect(world: &mut World, broadcast: &BroadcastSignal) {
    let kind = EffectKind::Broadcast {
        at: world.normalize(LocationKind::Broadcast, broadcast.location()),
        radius: broadcast.radius,
    };
    let _ = world.add_effect(kind, EffectKind::BROADCAST_ROUNDS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectator_core::{Loc, Round, UnitId};

    #[test]
    fn empty_round_is_a_no_op() {
        let mut world = World::default();
        let mut processor = SignalProcessor::new();
        let applied = processor
            .apply(&mut world, Envelope::Round(Round::default()))
            .expect("empty round");
        assert_eq!(applied, Applied::EmptyRound);
        assert_eq!(query::current_round(&world), 0);
        assert_eq!(processor.stats(), ProcessorStats::default());
    }

    #[test]
    fn informational_signals_still_advance_the_round() {
        let mut world = World::default();
        let mut processor = SignalProcessor::new();
        let applied = processor
            .apply(
                &mut world,
                Envelope::Round(Round {
                    signals: vec![Signal::IndicatorString, Signal::BytecodesUsed],
                }),
            )
            .expect("round");
        assert_eq!(
            applied,
            Applied::Round {
                round: 1,
                signals: 2
            }
        );
        assert_eq!(processor.stats().ignored_signals, 2);
    }

    #[test]
    fn attack_by_unknown_unit_is_fatal() {
        let mut world = World::default();
        let mut processor = SignalProcessor::new();
        let result = processor.apply(
            &mut world,
            Envelope::Round(Round {
                signals: vec![Signal::Attack(AttackSignal {
                    robot_id: UnitId::new(4),
                    target_loc: Loc::new(1.0, 1.0),
                })],
            }),
        );
        assert_eq!(
            result,
            Err(ProcessError::World(WorldError::UnknownUnit {
                id: UnitId::new(4)
            }))
        );
    }
}
