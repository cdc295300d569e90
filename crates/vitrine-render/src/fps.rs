use std::time::{Duration, Instant};

/// Frame-rate accounting for a drawable.
///
/// Totals run from the last [`FpsCounter::reset`]. With a non-zero update
/// interval, the counter closes a period every `update_interval` frames and
/// logs a summary.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    update_interval: u32,
    start_time: Instant,
    last_update_time: Instant,
    total_frames: u64,
    period_frames: u32,
    last_period: Duration,
    last_fps: f32,
}

impl FpsCounter {
    pub fn new(update_interval: u32) -> Self {
        let now = Instant::now();
        Self {
            update_interval,
            start_time: now,
            last_update_time: now,
            total_frames: 0,
            period_frames: 0,
            last_period: Duration::ZERO,
            last_fps: 0.0,
        }
    }

    /// Frames per summary period; `0` disables periodic updates.
    pub fn update_interval(&self) -> u32 {
        self.update_interval
    }

    /// Changes the update interval and resets the counter.
    pub fn set_update_interval(&mut self, frames: u32) {
        self.update_interval = frames;
        self.reset();
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start_time = now;
        self.last_update_time = now;
        self.total_frames = 0;
        self.period_frames = 0;
        self.last_period = Duration::ZERO;
        self.last_fps = 0.0;
    }

    /// Records one rendered frame.
    pub fn tick(&mut self) {
        self.total_frames += 1;
        if self.update_interval == 0 {
            return;
        }
        self.period_frames += 1;
        if self.period_frames < self.update_interval {
            return;
        }

        let now = Instant::now();
        self.last_period = now.duration_since(self.last_update_time);
        self.last_fps = rate(self.period_frames as u64, self.last_period);
        self.last_update_time = now;
        self.period_frames = 0;
        tracing::info!(
            "{:.2} fps over the last {} frames ({:?}), {:.2} fps over {} frames total",
            self.last_fps,
            self.update_interval,
            self.last_period,
            self.total_fps(),
            self.total_frames,
        );
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frames counted towards the current period.
    pub fn period_frames(&self) -> u32 {
        self.period_frames
    }

    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn total_fps(&self) -> f32 {
        rate(self.total_frames, self.total_duration())
    }

    /// Length of the last completed period.
    pub fn last_period(&self) -> Duration {
        self.last_period
    }

    /// Frame rate of the last completed period.
    pub fn last_fps(&self) -> f32 {
        self.last_fps
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn last_update_time(&self) -> Instant {
        self.last_update_time
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

fn rate(frames: u64, elapsed: Duration) -> f32 {
    let secs = elapsed.as_secs_f32();
    if secs > 0.0 { frames as f32 / secs } else { 0.0 }
}
