#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Playback scheduler pacing round requests and sub-round interpolation.
//!
//! The scheduler owns no I/O. It decides when the next round should be pulled
//! from the producer and reports the interpolation fraction the presenter
//! should draw with. At most one pull request is outstanding at any time; a
//! new one is only issued after the previous one was answered and a full
//! round interval has elapsed.

mod clock;

use serde::Deserialize;
use tracing::{debug, info};

pub use clock::{Clock, ManualClock, SystemClock};

const DEFAULT_MS_PER_ROUND: u64 = 200;
const DEFAULT_MAX_ROUNDS: u32 = 2000;
const DEFAULT_STALL_AFTER_MS: u64 = 5000;

/// Pacing parameters of the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Milliseconds between two round requests.
    pub ms_per_round: u64,
    /// Round after which no further requests are issued.
    pub max_rounds: u32,
    /// Milliseconds an unanswered request may wait before it counts as stalled.
    pub stall_after_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            ms_per_round: DEFAULT_MS_PER_ROUND,
            max_rounds: DEFAULT_MAX_ROUNDS,
            stall_after_ms: DEFAULT_STALL_AFTER_MS,
        }
    }
}

/// Lifecycle state of playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// No header has been received yet.
    Idle,
    /// A pull request is in flight.
    Awaiting,
    /// The latest request was answered; frames interpolate toward the next round.
    Playing,
    /// Terminal state; no more ticks or requests.
    Stopped,
}

/// Reason playback stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The producer closed the stream.
    StreamClosed,
    /// A fatal error was raised while applying an event.
    Fatal(String),
}

/// Result of a scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Sub-round interpolation fraction in `[0, 1]`.
    pub fraction: f32,
    /// Whether a pull request must be sent to the producer now.
    pub request: bool,
}

/// Pure scheduler driven by explicit timestamps in milliseconds.
#[derive(Debug)]
pub struct Scheduler {
    config: PlaybackConfig,
    header_seen: bool,
    in_flight: bool,
    requested_at: Option<f64>,
    stall_reported: bool,
    deliveries: u64,
    last_round_time: Option<f64>,
    stopped: Option<StopReason>,
}

impl Scheduler {
    /// Creates a scheduler in the idle state.
    #[must_use]
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            header_seen: false,
            in_flight: false,
            requested_at: None,
            stall_reported: false,
            deliveries: 0,
            last_round_time: None,
            stopped: None,
        }
    }

    /// Pacing parameters in use.
    #[must_use]
    pub const fn config(&self) -> PlaybackConfig {
        self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        if self.stopped.is_some() {
            PlaybackState::Stopped
        } else if !self.header_seen {
            PlaybackState::Idle
        } else if self.in_flight {
            PlaybackState::Awaiting
        } else {
            PlaybackState::Playing
        }
    }

    /// Reason playback stopped, once stopped.
    #[must_use]
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stopped.as_ref()
    }

    /// Number of messages answered so far.
    #[must_use]
    pub const fn deliveries(&self) -> u64 {
        self.deliveries
    }

    /// Issues the initial pull request; returns whether it must be sent.
    pub fn start(&mut self, now: f64) -> bool {
        debug!("playback starting");
        self.request_more(now)
    }

    /// Marks a pull request as in flight unless one already is.
    ///
    /// Returns `false` when the request must not be sent.
    pub fn request_more(&mut self, now: f64) -> bool {
        if self.stopped.is_some() || self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.requested_at = Some(now);
        self.stall_reported = false;
        true
    }

    /// Records that the producer answered the outstanding request.
    pub fn on_delivery(&mut self, now: f64, header_seen: bool) {
        if self.stopped.is_some() {
            return;
        }
        self.in_flight = false;
        self.requested_at = None;
        self.stall_reported = false;
        self.deliveries += 1;
        self.header_seen |= header_seen;
        if self.last_round_time.is_none() {
            self.last_round_time = Some(now);
        }
    }

    /// Advances playback to `now`.
    ///
    /// Returns `None` once stopped. The tick requests another round when no
    /// request is outstanding, something was delivered, more than one round
    /// interval elapsed and the round limit was not reached.
    pub fn tick(&mut self, now: f64, current_round: u32) -> Option<Tick> {
        if self.stopped.is_some() {
            return None;
        }

        let ms_per_round = self.config.ms_per_round as f64;
        let elapsed = self.last_round_time.map_or(0.0, |last| now - last);
        let fraction = if ms_per_round > 0.0 {
            (elapsed / ms_per_round).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let request = !self.in_flight
            && self.deliveries > 0
            && elapsed > ms_per_round
            && current_round < self.config.max_rounds;
        if request {
            self.in_flight = true;
            self.requested_at = Some(now);
            self.stall_reported = false;
            self.last_round_time = Some(now);
        }

        Some(Tick {
            fraction: fraction as f32,
            request,
        })
    }

    /// Enters the terminal state.
    pub fn stop(&mut self, reason: StopReason) {
        if self.stopped.is_some() {
            return;
        }
        info!(?reason, "playback stopped");
        self.in_flight = false;
        self.requested_at = None;
        self.stopped = Some(reason);
    }

    /// Milliseconds the outstanding request has been waiting, if any.
    #[must_use]
    pub fn awaiting_for(&self, now: f64) -> Option<f64> {
        self.requested_at.map(|requested| (now - requested).max(0.0))
    }

    /// Reports whether the outstanding request waited longer than the stall threshold.
    #[must_use]
    pub fn is_stalled(&self, now: f64) -> bool {
        self.awaiting_for(now)
            .map_or(false, |waited| waited > self.config.stall_after_ms as f64)
    }

    /// Reports a stall once per outstanding request.
    pub fn take_stall(&mut self, now: f64) -> Option<f64> {
        if self.stall_reported || !self.is_stalled(now) {
            return None;
        }
        self.stall_reported = true;
        self.awaiting_for(now)
    }
}
