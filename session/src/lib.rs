#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spectator session wiring the decoder, world, processor, scheduler and
//! presenter into a single owner.
//!
//! The session holds no global state. Transports and render façades are
//! passed to each call, so the same session drives a windowed backend, a
//! headless loop or a test harness.

mod presenter;
mod transport;

use spectator_core::{decode_message, Envelope};
use spectator_rendering::RenderFacade;
use spectator_system_playback::{Clock, PlaybackConfig, PlaybackState, Scheduler, StopReason};
use spectator_system_signals::{Applied, ProcessorStats, SignalProcessor};
use spectator_world::{query, CoordinatePolicy, World};
use tracing::{error, info, warn};

pub use presenter::{PresentStats, Presenter};
pub use transport::{Inbound, ReplayTransport, Transport, TransportError};

/// Settings a session is created with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pacing of round requests.
    pub playback: PlaybackConfig,
    /// Origin normalization of wire locations.
    pub coordinates: CoordinatePolicy,
}

/// What happened to one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageOutcome {
    /// The message was applied to the world.
    Applied(Applied),
    /// The message type is not tracked.
    Ignored,
    /// The message failed to decode and was dropped.
    Dropped,
    /// Applying the message raised a fatal error; playback stopped.
    Fatal(String),
    /// Playback had already stopped; the message was discarded.
    Discarded,
}

/// Summary of one presented frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    /// Round counter at the time of the frame.
    pub round: u32,
    /// Sub-round interpolation fraction used for the frame.
    pub fraction: f32,
    /// Playback state after the frame.
    pub state: PlaybackState,
    /// Whether the frame sent a pull request.
    pub requested: bool,
    /// Counts of what the presenter drew.
    pub drawn: PresentStats,
}

/// Owner of all spectator state for one stream.
#[derive(Debug)]
pub struct Session<C> {
    world: World,
    processor: SignalProcessor,
    scheduler: Scheduler,
    presenter: Presenter,
    clock: C,
    header_seen: bool,
}

impl<C> Session<C>
where
    C: Clock,
{
    /// Creates an idle session.
    #[must_use]
    pub fn new(config: SessionConfig, clock: C) -> Self {
        Self {
            world: World::new(config.coordinates),
            processor: SignalProcessor::new(),
            scheduler: Scheduler::new(config.playback),
            presenter: Presenter::new(),
            clock,
            header_seen: false,
        }
    }

    /// Read-only access to the world model.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the presenter and its drawable handles.
    #[must_use]
    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    /// Current playback state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    /// Reason playback stopped, once stopped.
    #[must_use]
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.scheduler.stop_reason()
    }

    /// Totals accumulated by the signal processor.
    #[must_use]
    pub fn processor_stats(&self) -> ProcessorStats {
        self.processor.stats()
    }

    /// Sends the initial pull request.
    pub fn start<T>(&mut self, transport: &mut T) -> Result<(), TransportError>
    where
        T: Transport + ?Sized,
    {
        if self.scheduler.start(self.clock.now()) {
            transport.request_more()?;
        }
        Ok(())
    }

    /// Decodes and applies one raw message.
    ///
    /// Every consumed message counts as a delivery, including messages that
    /// fail to decode or carry an untracked type.
    pub fn on_message(&mut self, raw: &str) -> MessageOutcome {
        if self.scheduler.state() == PlaybackState::Stopped {
            return MessageOutcome::Discarded;
        }

        let outcome = match decode_message(raw) {
            Err(err) => {
                warn!(error = %err, "dropping malformed message");
                MessageOutcome::Dropped
            }
            Ok(None) => MessageOutcome::Ignored,
            Ok(Some(envelope)) => self.apply(envelope),
        };

        self.scheduler.on_delivery(self.clock.now(), self.header_seen);
        outcome
    }

    /// Stops playback because the producer closed the stream.
    pub fn on_closed(&mut self) {
        if self.scheduler.state() != PlaybackState::Stopped {
            info!(round = query::current_round(&self.world), "stream closed");
        }
        self.scheduler.stop(StopReason::StreamClosed);
    }

    /// Drains every ready inbound event, then presents a frame.
    pub fn pump<T, F>(
        &mut self,
        transport: &mut T,
        facade: &mut F,
    ) -> Result<Option<FrameReport>, TransportError>
    where
        T: Transport + ?Sized,
        F: RenderFacade + ?Sized,
    {
        while let Some(inbound) = transport.poll() {
            match inbound {
                Inbound::Message(raw) => {
                    let _ = self.on_message(&raw);
                }
                Inbound::Closed => self.on_closed(),
            }
        }
        self.tick(transport, facade)
    }

    /// Advances playback and presents a frame.
    ///
    /// Returns `Ok(None)` once playback stopped. The presenter runs before
    /// finished moves are settled so the final position of a move is drawn.
    pub fn tick<T, F>(
        &mut self,
        transport: &mut T,
        facade: &mut F,
    ) -> Result<Option<FrameReport>, TransportError>
    where
        T: Transport + ?Sized,
        F: RenderFacade + ?Sized,
    {
        let now = self.clock.now();
        let round = query::current_round(&self.world);
        let Some(tick) = self.scheduler.tick(now, round) else {
            return Ok(None);
        };

        if tick.request {
            if let Err(err) = transport.request_more() {
                error!(error = %err, "pull request failed");
                self.scheduler.stop(StopReason::Fatal(err.to_string()));
                return Err(err);
            }
        }
        if let Some(waited) = self.scheduler.take_stall(now) {
            warn!(round, waited_ms = waited, "producer has not answered the pull request");
        }

        let drawn = self.presenter.present(&mut self.world, facade, tick.fraction);
        self.world.settle_moves(tick.fraction);

        Ok(Some(FrameReport {
            round,
            fraction: tick.fraction,
            state: self.scheduler.state(),
            requested: tick.request,
            drawn,
        }))
    }

    fn apply(&mut self, envelope: Envelope) -> MessageOutcome {
        let kind = envelope.kind();
        match self.processor.apply(&mut self.world, envelope) {
            Ok(applied) => {
                match applied {
                    Applied::Map => {
                        self.header_seen = true;
                        if let Some(map) = query::map(&self.world) {
                            info!(
                                map = map.name(),
                                width = map.width(),
                                height = map.height(),
                                "match header received"
                            );
                        }
                    }
                    Applied::Summary => {
                        let summary = query::match_summary(&self.world);
                        info!(
                            team_a = %summary.team_a,
                            team_b = %summary.team_b,
                            winner = summary.winner.as_deref().unwrap_or("undecided"),
                            "match summary updated"
                        );
                    }
                    Applied::Constants | Applied::EmptyRound | Applied::Round { .. } => {}
                }
                MessageOutcome::Applied(applied)
            }
            Err(err) => {
                error!(message_type = kind, error = %err, "fatal error applying message");
                let reason = err.to_string();
                self.scheduler.stop(StopReason::Fatal(reason.clone()));
                MessageOutcome::Fatal(reason)
            }
        }
    }
}
