//! Real-time playback over host-supplied clock and refresh scheduling.
//!
//! The host owns the refresh loop. It asks the player's [`Scheduler`] for
//! pending ticks and hands each one back through [`Player::on_tick`]; the
//! player never blocks or spawns anything itself.

use crate::Engine;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Frame counters this close to a whole frame snap onto it.
const FRAME_EPSILON: f64 = 1e-6;

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

pub type TickId = u64;

/// Per-refresh callback registration.
pub trait Scheduler {
    /// Requests one callback on the next refresh.
    fn request_tick(&mut self) -> TickId;
    fn cancel_tick(&mut self, id: TickId);
}

#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Queue of requested ticks that the host drains on each refresh.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: TickId,
    pending: VecDeque<TickId>,
    requests: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest pending tick, removed from the queue.
    pub fn take_pending(&mut self) -> Option<TickId> {
        self.pending.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total number of ticks ever requested.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl Scheduler for ManualScheduler {
    fn request_tick(&mut self) -> TickId {
        let id = self.next_id;
        self.next_id += 1;
        self.requests += 1;
        self.pending.push_back(id);
        id
    }

    fn cancel_tick(&mut self, id: TickId) {
        self.pending.retain(|p| *p != id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

pub struct Player<C: Clock, S: Scheduler> {
    engine: Engine,
    clock: C,
    scheduler: S,
    state: PlaybackState,
    /// Frames elapsed since `ip`, always in `[0, op - ip)`.
    counter: f64,
    last_tick_ms: f64,
    pending: Option<TickId>,
}

impl<C: Clock, S: Scheduler> Player<C, S> {
    pub fn new(engine: Engine, clock: C, scheduler: S) -> Self {
        Self {
            engine,
            clock,
            scheduler,
            state: PlaybackState::Stopped,
            counter: 0.0,
            last_tick_ms: 0.0,
            pending: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Composition frame of the playhead.
    pub fn current_frame(&self) -> f32 {
        self.engine.animation().ip + self.counter as f32
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Starts or resumes playback. Does nothing while already playing.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Playing;
        self.last_tick_ms = self.clock.now_ms();
        self.pending = Some(self.scheduler.request_tick());
        tracing::debug!(frame = self.current_frame(), "playback started");
    }

    /// Stops scheduling and keeps the playhead.
    pub fn pause(&mut self) {
        self.cancel_pending();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stops scheduling, rewinds to `ip` and renders it.
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.state = PlaybackState::Stopped;
        self.counter = 0.0;
        let frame = self.current_frame();
        self.engine.render_frame(frame);
    }

    /// Moves the playhead to a composition frame and renders it.
    pub fn seek(&mut self, frame: f32) {
        let ip = self.engine.animation().ip as f64;
        self.counter = self.wrap(frame as f64 - ip);
        self.last_tick_ms = self.clock.now_ms();
        let frame = self.current_frame();
        self.engine.render_frame(frame);
    }

    /// Handles a refresh callback. Ticks that were cancelled or arrive while
    /// not playing are ignored.
    pub fn on_tick(&mut self, id: TickId) {
        if self.state != PlaybackState::Playing || self.pending != Some(id) {
            tracing::trace!(id, "ignoring stale tick");
            return;
        }
        self.pending = None;

        let now = self.clock.now_ms();
        let elapsed = (now - self.last_tick_ms).max(0.0);
        self.last_tick_ms = now;

        let fr = self.engine.animation().fr as f64;
        self.counter = self.wrap(self.counter + elapsed / 1000.0 * fr);

        let frame = self.current_frame();
        self.engine.render_frame(frame);
        self.pending = Some(self.scheduler.request_tick());
    }

    fn wrap(&self, counter: f64) -> f64 {
        let total = self.engine.animation().total_frames() as f64;
        let snapped = if (counter - counter.round()).abs() < FRAME_EPSILON {
            counter.round()
        } else {
            counter
        };
        snapped.rem_euclid(total)
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_tick(id);
        }
    }
}
