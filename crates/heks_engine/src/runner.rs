//! The frame loop.
//!
//! A [`GameLoopRunner`] asks a [`FrameScheduler`] for the next frame time and
//! runs one engine tick per frame. Stopping is cooperative: the loop checks
//! [`Engine::is_running`] between frames, so a frame that has already been
//! handed out always runs to completion.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::events::Lifecycle;

/// Source of frame timestamps.
pub trait FrameScheduler {
    /// Wait for the next frame; resolves to its timestamp in milliseconds.
    fn next_frame(&mut self) -> impl Future<Output = f64>;
}

/// Shortest frame period an [`IntervalScheduler`] will tick at.
pub const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// A scheduler ticking at a fixed rate on the tokio timer.
///
/// Late ticks are skipped rather than bunched up, so at most one frame is
/// ever outstanding. Rates below 1 fps run at 1 fps; rates too high for the
/// timer (including infinity) run at [`MIN_FRAME_PERIOD`].
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Interval,
    epoch: Instant,
}

impl IntervalScheduler {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(frames_per_second: f64) -> Self {
        let period = frame_period(frames_per_second);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            epoch: Instant::now(),
        }
    }
}

fn frame_period(frames_per_second: f64) -> Duration {
    // NaN.max(1.0) is 1.0, and 1.0 / inf is 0.0.
    Duration::from_secs_f64(1.0 / frames_per_second.max(1.0)).max(MIN_FRAME_PERIOD)
}

impl FrameScheduler for IntervalScheduler {
    async fn next_frame(&mut self) -> f64 {
        let tick = self.interval.tick().await;
        tick.duration_since(self.epoch).as_secs_f64() * 1000.0
    }
}

/// Frames per second implied by two consecutive frame times (ms); 0 when
/// the times are equal.
#[must_use]
pub fn calculate_frames_per_second(current_time: f64, previous_time: f64) -> f64 {
    if current_time == previous_time {
        return 0.0;
    }
    1.0 / ((current_time - previous_time) / 1000.0)
}

/// Drives an [`Engine`] from a [`FrameScheduler`].
#[derive(Debug, Clone, Default)]
pub struct GameLoopRunner {
    /// Frames run so far.
    pub steps: u64,
    /// Time of the latest frame (ms).
    pub time: f64,
    /// Time of the frame before it (ms).
    pub previous_time: f64,
}

impl GameLoopRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fps(&self) -> f64 {
        calculate_frames_per_second(self.time, self.previous_time)
    }

    /// Start the engine, emit `start` and run frames until the engine is
    /// stopped or `max_frames` frames have run (`0` = no limit).
    ///
    /// Calling this on an engine that is already running does nothing.
    ///
    /// # Errors
    ///
    /// The first handler error ends the loop; the engine is stopped.
    pub async fn run<S: FrameScheduler>(
        &mut self,
        engine: &mut Engine,
        scheduler: &mut S,
        max_frames: u64,
    ) -> anyhow::Result<()> {
        if !engine.start() {
            warn!("engine is already running");
            return Ok(());
        }
        info!(max_frames, "starting frame loop");

        let result = self.run_frames(engine, scheduler, max_frames).await;
        engine.stop();
        debug!(steps = self.steps, fps = self.fps(), "frame loop ended");
        result
    }

    async fn run_frames<S: FrameScheduler>(
        &mut self,
        engine: &mut Engine,
        scheduler: &mut S,
        max_frames: u64,
    ) -> anyhow::Result<()> {
        engine.emit_event(Lifecycle::Start.as_str(), &[])?;
        while engine.is_running() && (max_frames == 0 || self.steps < max_frames) {
            let time = scheduler.next_frame().await;
            self.steps += 1;
            self.previous_time = self.time;
            self.time = time;
            engine.step(time)?;
        }
        Ok(())
    }
}
