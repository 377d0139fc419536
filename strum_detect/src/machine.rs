//! Strum State Machine, the decision core.
//!
//! Consumes one [`StrumInput`] per frame and decides whether a strum, a
//! hand reset, or nothing happened.
//!
//! # Rules (in evaluation order)
//!
//! 1. The direction is pushed into the [`GestureWindow`]; motion is stable
//!    once W consecutive frames agree.
//! 2. **Timeout**: a strum window open longer than `max_strum_secs` is
//!    abandoned. The gesture window and the window timestamp are cleared,
//!    no event is emitted.
//! 3. **Trigger**: stable ∧ |velocity| > threshold ∧ cooldown elapsed ∧
//!    direction ≠ last successful direction.
//! 4. Triggered with matching shape and expected direction → **strum**;
//!    otherwise → **reset**. Both flip the expected direction and clear the
//!    gesture window; a reset also forgets the last successful direction.
//! 5. Anything else leaves the context untouched.
//!
//! Threshold comparisons are strict: equality is "not exceeded".

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::window::GestureWindow;
use crate::Direction;

// ════════════════════════════════════════════════════════════════════════════
// Inputs and outputs
// ════════════════════════════════════════════════════════════════════════════

/// Per-frame input to the state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrumInput {
    pub direction:   Direction,
    /// Smoothed vertical velocity (signed).
    pub velocity:    f32,
    /// Hand posture agrees with `direction`.
    pub shape_valid: bool,
    pub center_y:    f32,
    /// Seconds.
    pub now:         f64,
}

/// An accepted strum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrumEvent {
    pub direction: Direction,
    /// Magnitude of the smoothed velocity at the trigger frame.
    pub velocity:  f32,
    /// Chord held at the moment of the strum, if any.
    pub chord:     Option<String>,
    /// Hand-center y at strum onset; playback displacement is measured from here.
    pub start_y:   f32,
    pub timestamp: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StrumOutcome {
    Strum(StrumEvent),
    /// Trigger fired but posture or expected direction disagreed: the
    /// player was repositioning. Any live playback must be cancelled.
    Reset,
    /// Nothing happened. `abandoned` is set on the frame where an open
    /// strum window timed out.
    NoEvent { abandoned: bool },
}

impl StrumOutcome {
    pub fn strum(&self) -> Option<&StrumEvent> {
        match self {
            StrumOutcome::Strum(e) => Some(e),
            _ => None,
        }
    }
}

/// Coarse state, derived from the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A strum window is open and its timeout is running.
    StrumArmed,
    /// A successful strum's playback is live.
    PlaybackActive,
}

// ════════════════════════════════════════════════════════════════════════════
// StrumContext
// ════════════════════════════════════════════════════════════════════════════

/// Persistent decision state for one playing session.
#[derive(Clone, Debug, PartialEq)]
pub struct StrumContext {
    pub expected:          Direction,
    pub last_success:      Option<Direction>,
    pub last_strum_at:     Option<f64>,
    pub strum_started_at:  Option<f64>,
    pub strum_in_progress: bool,
    /// Hand-center y recorded at the last strum or reset.
    pub anchor_y:          Option<f32>,
}

impl Default for StrumContext {
    fn default() -> Self {
        StrumContext {
            expected:          Direction::Down,
            last_success:      None,
            last_strum_at:     None,
            strum_started_at:  None,
            strum_in_progress: false,
            anchor_y:          None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// StrumMachine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct StrumMachine {
    velocity_threshold: f32,
    cooldown_secs:      f64,
    max_strum_secs:     f64,
    window:             GestureWindow,
    ctx:                StrumContext,
}

impl StrumMachine {
    pub fn new(cfg: &DetectorConfig) -> Self {
        StrumMachine {
            velocity_threshold: cfg.velocity_threshold,
            cooldown_secs:      cfg.cooldown_secs,
            max_strum_secs:     cfg.max_strum_secs,
            window:             GestureWindow::new(cfg.stability_frames),
            ctx:                StrumContext::default(),
        }
    }

    /// Advance one frame.
    ///
    /// `chord` is only called when a strum is accepted, so the chord is
    /// read at the instant of the strum.
    pub fn step<F>(&mut self, input: &StrumInput, chord: F) -> StrumOutcome
    where
        F: FnOnce() -> Option<String>,
    {
        self.window.push(input.direction);

        let mut abandoned = false;
        if let Some(started) = self.ctx.strum_started_at {
            if input.now - started > self.max_strum_secs {
                debug!(after = input.now - started, "strum window abandoned");
                self.window.clear();
                self.ctx.strum_started_at = None;
                abandoned = true;
            }
        }

        if !self.triggered(input) {
            return StrumOutcome::NoEvent { abandoned };
        }

        let accepted = input.shape_valid && input.direction == self.ctx.expected;

        self.ctx.last_strum_at    = Some(input.now);
        self.ctx.strum_started_at = Some(input.now);
        self.ctx.anchor_y         = Some(input.center_y);
        self.ctx.expected         = self.ctx.expected.flipped();
        self.window.clear();

        if accepted {
            self.ctx.last_success = Some(input.direction);
            let event = StrumEvent {
                direction: input.direction,
                velocity:  input.velocity.abs(),
                chord:     chord(),
                start_y:   input.center_y,
                timestamp: input.now,
            };
            info!(
                direction = %event.direction,
                velocity  = event.velocity,
                chord     = event.chord.as_deref().unwrap_or("None"),
                "strum"
            );
            StrumOutcome::Strum(event)
        } else {
            self.ctx.last_success      = None;
            self.ctx.strum_in_progress = false;
            debug!(direction = %input.direction, shape_valid = input.shape_valid, "hand reset");
            StrumOutcome::Reset
        }
    }

    fn triggered(&self, input: &StrumInput) -> bool {
        let stable     = self.window.is_stable(input.direction);
        let fast       = input.velocity.abs() > self.velocity_threshold;
        let cooled     = self.ctx.last_strum_at
            .map_or(true, |t| input.now - t > self.cooldown_secs);
        let alternates = self.ctx.last_success != Some(input.direction);
        stable && fast && cooled && alternates
    }

    /// Playback for the last strum has started.
    pub fn begin_playback(&mut self) { self.ctx.strum_in_progress = true; }

    /// Playback finished, was cancelled, or never started.
    pub fn end_playback(&mut self) { self.ctx.strum_in_progress = false; }

    pub fn phase(&self) -> Phase {
        if self.ctx.strum_in_progress {
            Phase::PlaybackActive
        } else if self.ctx.strum_started_at.is_some() {
            Phase::StrumArmed
        } else {
            Phase::Idle
        }
    }

    pub fn context(&self) -> &StrumContext { &self.ctx }

    pub fn window(&self) -> &GestureWindow { &self.window }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
