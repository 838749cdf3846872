//! Auto-scroll engine
//!
//! Advances the stage scroll offset at `speed` px/s. Elapsed time is
//! accumulated in a fractional-pixel accumulator and only whole pixels are
//! flushed onto the offset, so long runs keep the exact average speed no
//! matter how irregular the frame rate is.

use std::time::{Duration, Instant};

/// Geometry the offset is clamped against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollBounds {
    pub content_height: f64,
    pub viewport_height: f64,
    /// Extra room below the content so the last lines are not flush with the edge
    pub margin: f64,
}

impl ScrollBounds {
    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport_height + self.margin).max(0.0)
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not playing; nothing happened and measurement restarts on resume
    Paused,
    /// Less than a whole pixel accumulated so far
    Pending,
    /// Offset moved by `by` px
    Advanced { by: f64 },
    /// Offset sits at the maximum; further ticks are no-ops
    AtEnd,
}

#[derive(Debug, Clone, Default)]
pub struct ScrollEngine {
    offset: f64,
    accumulator: f64,
    last_tick: Option<Instant>,
}

impl ScrollEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Start measuring elapsed time from `now`
    pub fn resume(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    /// Stop measuring; time until the next [`resume`](Self::resume) is never scrolled
    pub fn suspend(&mut self) {
        self.last_tick = None;
    }

    /// One animation tick at `now`
    pub fn tick(&mut self, now: Instant, playing: bool, speed: f64, bounds: ScrollBounds) -> TickOutcome {
        if !playing {
            self.suspend();
            return TickOutcome::Paused;
        }

        let elapsed = match self.last_tick {
            Some(previous) => now.saturating_duration_since(previous),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);

        self.advance(elapsed, speed, bounds)
    }

    /// Advance by `elapsed` worth of scrolling
    pub fn advance(&mut self, elapsed: Duration, speed: f64, bounds: ScrollBounds) -> TickOutcome {
        let max = bounds.max_scroll();
        if self.offset >= max {
            self.offset = max;
            self.accumulator = 0.0;
            return TickOutcome::AtEnd;
        }

        self.accumulator += speed.max(0.0) * elapsed.as_secs_f64();
        if self.accumulator < 1.0 {
            return TickOutcome::Pending;
        }

        let whole = self.accumulator.floor();
        self.accumulator -= whole;

        let next = (self.offset + whole).min(max);
        let by = next - self.offset;
        self.offset = next;
        TickOutcome::Advanced { by }
    }

    /// Jump to `position` if it differs from the local offset by more than 1px
    ///
    /// Returns true when the offset moved.
    pub fn seek(&mut self, position: f64, bounds: ScrollBounds) -> bool {
        let target = position.clamp(0.0, bounds.max_scroll());
        if (target - self.offset).abs() <= 1.0 {
            return false;
        }
        self.offset = target;
        self.accumulator = 0.0;
        true
    }

    /// Snap to the top and forget any partial pixel
    pub fn reset(&mut self) {
        self.offset = 0.0;
        self.accumulator = 0.0;
        self.last_tick = None;
    }

    /// Pull the offset back inside `bounds` after the content shrank
    pub fn clamp_to(&mut self, bounds: ScrollBounds) {
        let max = bounds.max_scroll();
        if self.offset > max {
            self.offset = max;
            self.accumulator = 0.0;
        }
    }
}

/// The one outstanding animation frame request
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    pending: Option<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Schedule the next frame one interval after `now`
    pub fn request(&mut self, now: Instant) {
        self.pending = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|deadline| now >= deadline)
    }

    /// Time left until the pending frame, `None` when nothing is scheduled
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
