use std::time::Instant;

/// Wall-clock time source for interactive playback.
#[derive(Debug, Clone, Copy)]
pub struct RealtimeClock {
    start_time: Instant,
}

impl RealtimeClock {
    pub fn start() -> Self {
        Self { start_time: Instant::now() }
    }

    /// Seconds since `start`.
    #[inline(always)]
    pub fn now(&self) -> f32 {
        Instant::now().duration_since(self.start_time).as_secs_f32()
    }
}

/// Fixed `1/fps` time steps covering a piece of music, for offline export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepClock {
    fps: u32,
    total_frames: u64,
}

impl FixedStepClock {
    pub fn new(fps: u32, music_length: f32) -> Self {
        let fps = fps.max(1);
        let total_frames = (fps as f64 * music_length.max(0.0) as f64).floor() as u64;
        Self { fps, total_frames }
    }

    #[inline(always)]
    pub fn frame_time(&self) -> f32 {
        1.0 / self.fps as f32
    }

    #[inline(always)]
    pub const fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Music time of frame `index`.
    #[inline(always)]
    pub fn time_of(&self, index: u64) -> f32 {
        (index as f64 / self.fps as f64) as f32
    }

    /// Music time of every frame, in order.
    pub fn times(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.total_frames).map(|i| self.time_of(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_steps_cover_the_music() {
        let clock = FixedStepClock::new(60, 2.5);
        assert_eq!(clock.total_frames(), 150);
        assert!((clock.frame_time() - 1.0 / 60.0).abs() <= f32::EPSILON);
        let times: Vec<f32> = clock.times().collect();
        assert_eq!(times.len(), 150);
        assert_eq!(times[0], 0.0);
        assert!((times[60] - 1.0).abs() <= 1e-6);
        assert!(times.windows(2).all(|w| w[0] < w[1]), "times must be increasing");
    }

    #[test]
    fn degenerate_inputs_do_not_divide_by_zero() {
        let clock = FixedStepClock::new(0, -3.0);
        assert_eq!(clock.total_frames(), 0);
        assert_eq!(clock.frame_time(), 1.0);
    }

    #[test]
    fn realtime_clock_is_monotonic() {
        let clock = RealtimeClock::start();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0 && b >= a);
    }
}
