use std::time::{Duration, Instant};

use anyhow::Result;
use log::trace;

use crate::context::{SceneContext, TickReport};
use crate::render::{Frame, Renderer};

/// Monotonic time since some fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Used by headless runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, step: Duration) {
        self.now += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }
}

/// Drives a [`SceneContext`]: one tick and one rendered frame per call to
/// [`RenderLoop::frame`].
pub struct RenderLoop<R: Renderer, C: Clock> {
    context: SceneContext,
    renderer: R,
    clock: C,
    frames: u64,
}

impl<R: Renderer, C: Clock> RenderLoop<R, C> {
    pub fn new(context: SceneContext, renderer: R, clock: C) -> Self {
        Self {
            context,
            renderer,
            clock,
            frames: 0,
        }
    }

    pub fn frame(&mut self) -> Result<TickReport> {
        let now = self.clock.now();
        let report = self.context.tick(now);
        let frame = Frame::capture(
            self.context.graph(),
            self.context.rig().active_camera(),
            self.context.viewport().aspect(),
        );
        self.renderer.render(&frame)?;
        self.frames += 1;
        trace!("frame {} at {now:?}", self.frames);
        Ok(report)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.context
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

impl<R: Renderer> RenderLoop<R, ManualClock> {
    /// Moves the clock forward by `step`, then renders a frame.
    pub fn step(&mut self, step: Duration) -> Result<TickReport> {
        self.clock.advance(step);
        self.frame()
    }
}
