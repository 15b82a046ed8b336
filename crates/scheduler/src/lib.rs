//! Play/pause and frame pacing for the viewer.
//!
//! The host asks [`AnimationScheduler::poll`] whether to draw, then reports
//! back with [`AnimationScheduler::frame_completed`] or
//! [`AnimationScheduler::frame_skipped`]. Only scheduled ticks that were
//! presented while playing move the simulation clock.

use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("simulation time must be finite, got {0}")]
    InvalidTime(f64),
    #[error("time step must be finite, got {0}")]
    InvalidStep(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameRequest {
    NextRefresh,
    At(Instant),
}

/// What the host should do before it next goes idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Render,
    WaitUntil(Instant),
    Idle,
}

/// Play/pause state, simulation clock and the next pending frame.
///
/// Auto-scheduled frames only exist while playing. An on-demand request
/// (parameter edit, resize, session load) produces exactly one frame in
/// either state.
#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    state: PlayState,
    time: f64,
    frames: u64,
    scheduled: Option<FrameRequest>,
    on_demand: bool,
    /// The frame handed out by the last `Render` consumed a scheduled request.
    tick: bool,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(PlayState::Paused)
    }
}

impl AnimationScheduler {
    pub fn new(initial: PlayState) -> Self {
        Self {
            state: initial,
            time: 0.0,
            frames: 0,
            scheduled: (initial == PlayState::Playing).then_some(FrameRequest::NextRefresh),
            on_demand: false,
            tick: false,
        }
    }

    pub fn toggle_play(&mut self, now: Instant) -> PlayState {
        self.tick = false;
        self.state = match self.state {
            PlayState::Paused => {
                self.scheduled = Some(FrameRequest::NextRefresh);
                PlayState::Playing
            }
            PlayState::Playing => {
                self.scheduled = None;
                PlayState::Paused
            }
        };
        tracing::debug!(state = ?self.state, ?now, time = self.time, "toggled playback");
        self.state
    }

    pub fn request_frame(&mut self) {
        self.on_demand = true;
    }

    /// Decides whether a frame is due at `now`.
    ///
    /// A `Render` decision consumes the pending request; the host follows
    /// it with [`AnimationScheduler::frame_completed`] once the frame is
    /// presented, or [`AnimationScheduler::frame_skipped`] when it was not.
    pub fn poll(&mut self, now: Instant) -> FrameDecision {
        let due = match self.scheduled {
            Some(FrameRequest::NextRefresh) => true,
            Some(FrameRequest::At(deadline)) => deadline <= now,
            None => false,
        };
        if due || self.on_demand {
            if due {
                self.scheduled = None;
            }
            self.tick = due;
            self.on_demand = false;
            return FrameDecision::Render;
        }
        match self.scheduled {
            Some(FrameRequest::At(deadline)) => FrameDecision::WaitUntil(deadline),
            _ => FrameDecision::Idle,
        }
    }

    /// Records a presented frame.
    ///
    /// When the frame was a scheduled tick and playback is still on, the clock
    /// advances by `dt` and the next tick is due `interval` after `now`.
    /// On-demand frames leave both the clock and the pending deadline alone.
    pub fn frame_completed(
        &mut self,
        now: Instant,
        dt: f64,
        interval: Duration,
    ) -> Result<(), SchedulerError> {
        if !dt.is_finite() {
            return Err(SchedulerError::InvalidStep(dt));
        }
        self.frames += 1;
        if self.finish_tick(now, interval) {
            self.time += dt;
        }
        Ok(())
    }

    /// Records a frame that was not presented (no surfaces yet, or dropped
    /// mid-frame). Neither the clock nor the frame count moves, but a
    /// consumed tick is rescheduled so playback keeps retrying.
    pub fn frame_skipped(&mut self, now: Instant, interval: Duration) {
        if self.finish_tick(now, interval) {
            tracing::trace!(time = self.time, "tick skipped; rescheduled");
        }
    }

    fn finish_tick(&mut self, now: Instant, interval: Duration) -> bool {
        if !std::mem::take(&mut self.tick) || self.state != PlayState::Playing {
            return false;
        }
        self.scheduled = Some(match now.checked_add(interval) {
            Some(deadline) if !interval.is_zero() => FrameRequest::At(deadline),
            _ => FrameRequest::NextRefresh,
        });
        true
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) -> Result<(), SchedulerError> {
        if !time.is_finite() {
            return Err(SchedulerError::InvalidTime(time));
        }
        self.time = time;
        Ok(())
    }

    pub fn reset_time(&mut self) {
        self.time = 0.0;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }
}

/// Converts a millisecond interval parameter; anything negative or not
/// finite becomes zero.
pub fn interval_from_millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
