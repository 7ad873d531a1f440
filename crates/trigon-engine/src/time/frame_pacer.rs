use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame began, in seconds.
    ///
    /// Zero for the first frame.
    pub dt: f32,

    /// Monotonic timestamp taken when the frame began.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Caps a loop at a fixed frame rate.
///
/// A late frame is not an error: the next frame simply starts without waiting.
#[derive(Debug, Clone)]
pub struct FramePacer {
    budget: Duration,
    frame_start: Option<Instant>,
    frame_index: u64,
}

impl FramePacer {
    /// Pacer targeting `target_fps` frames per second. `0` disables the cap.
    pub fn new(target_fps: u32) -> Self {
        let budget = if target_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / target_fps
        };
        Self::with_budget(budget)
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget,
            frame_start: None,
            frame_index: 0,
        }
    }

    /// Pacer that never waits.
    pub fn uncapped() -> Self {
        Self::with_budget(Duration::ZERO)
    }

    #[inline]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Number of frames begun so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Marks the start of a frame.
    pub fn begin_frame(&mut self) -> FrameTime {
        self.begin_frame_at(Instant::now())
    }

    pub fn begin_frame_at(&mut self, now: Instant) -> FrameTime {
        let dt = self
            .frame_start
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start));
        self.frame_start = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Time left in the current frame's budget at `now`.
    ///
    /// Zero before the first frame and once the budget is spent. A budget too
    /// large to add to the frame start never runs out.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.frame_start {
            Some(start) => match start.checked_add(self.budget) {
                Some(due) => due.saturating_duration_since(now),
                None => self.budget.saturating_sub(now.saturating_duration_since(start)),
            },
            None => Duration::ZERO,
        }
    }

    /// Instant the next frame is due.
    ///
    /// Clamped to the latest representable instant past the frame start.
    pub fn deadline(&self) -> Instant {
        match self.frame_start {
            Some(start) => start.checked_add(self.budget).unwrap_or_else(|| far_future(start)),
            None => Instant::now(),
        }
    }

    /// Blocks until the current frame's budget has elapsed.
    pub fn wait(&self) {
        let remaining = self.remaining_at(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Waits out the current frame, then begins the next one.
    pub fn tick(&mut self) -> FrameTime {
        self.wait();
        self.begin_frame()
    }
}

/// Latest instant reachable from `start` by halving steps.
fn far_future(start: Instant) -> Instant {
    let mut step = Duration::MAX;
    let mut at = start;
    while !step.is_zero() {
        if let Some(next) = at.checked_add(step) {
            at = next;
        }
        step /= 2;
    }
    at
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(60)
    }
}
