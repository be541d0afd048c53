use std::time::Duration;

/// Share of one interval a tick may arrive early and still draw.
///
/// Vsync callbacks on a display that matches the target rate land a little
/// either side of the interval; without slack every other frame would be
/// skipped.
pub const PACING_SLACK: f64 = 0.1;

/// Caps redraws to a target rate by skipping ticks that arrive too soon.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    slack: Duration,
    last_drawn: Option<Duration>,
}

impl FramePacer {
    /// Pacer for `max_fps` frames per second. Non-positive or non-finite rates disable pacing.
    pub fn new(max_fps: f64) -> Self {
        let interval = if max_fps.is_finite() && max_fps > 0.0 {
            Duration::from_secs_f64(1.0 / max_fps)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            slack: interval.mul_f64(PACING_SLACK),
            last_drawn: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn reset(&mut self) {
        self.last_drawn = None;
    }

    /// Earliest clock reading at which a tick will draw, or `None` when the
    /// next tick draws regardless of when it arrives.
    pub fn next_due(&self) -> Option<Duration> {
        let last = self.last_drawn?;
        if self.interval.is_zero() {
            return None;
        }
        Some(last + self.interval.saturating_sub(self.slack))
    }

    /// Decide whether the tick at clock reading `now` draws.
    ///
    /// The first tick always draws. Afterwards the last-drawn stamp advances
    /// by whole intervals rather than snapping to `now`, so late ticks do not
    /// accumulate drift and a long stall does not cause a burst of redraws.
    pub fn should_draw(&mut self, now: Duration) -> bool {
        let Some(last) = self.last_drawn else {
            self.last_drawn = Some(now);
            return true;
        };
        if self.interval.is_zero() {
            self.last_drawn = Some(now);
            return true;
        }
        let delta = now.saturating_sub(last);
        if delta + self.slack < self.interval {
            return false;
        }
        let whole = ((delta + self.slack).as_nanos() / self.interval.as_nanos()).max(1);
        let whole = whole.min(u32::MAX as u128) as u32;
        self.last_drawn = Some(last + self.interval.saturating_mul(whole));
        true
    }
}

/// Frame-time ring buffer plus drawn/throttled counters.
#[derive(Debug, Clone)]
pub struct FrameStats {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
    last_frame: Option<Duration>,
    drawn: u64,
    throttled: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
            last_frame: None,
            drawn: 0,
            throttled: 0,
        }
    }

    /// Note a drawn frame at clock reading `now`; the gap to the previous one is recorded.
    pub fn record_drawn(&mut self, now: Duration) {
        if let Some(prev) = self.last_frame {
            self.history[self.index] = now.saturating_sub(prev);
            self.index = (self.index + 1) % self.capacity;
            if self.index == 0 {
                self.filled = true;
            }
        }
        self.last_frame = Some(now);
        self.drawn += 1;
    }

    pub fn record_throttled(&mut self) {
        self.throttled += 1;
    }

    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    fn samples(&self) -> &[Duration] {
        let count = if self.filled { self.capacity } else { self.index };
        &self.history[..count]
    }

    pub fn count(&self) -> usize {
        self.samples().len()
    }

    pub fn average(&self) -> Duration {
        let samples = self.samples();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Frames per second implied by the average frame time, zero with no samples.
    pub fn fps(&self) -> f64 {
        let avg = self.average();
        if avg.is_zero() {
            0.0
        } else {
            1.0 / avg.as_secs_f64()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn first_tick_always_draws() {
        let mut pacer = FramePacer::new(60.0);
        assert!(pacer.should_draw(ms(5)));
        assert!(!pacer.should_draw(ms(6)));
    }

    #[test]
    fn high_refresh_ticks_are_halved() {
        // 120 Hz callbacks against a 60 fps cap
        let mut pacer = FramePacer::new(60.0);
        let tick = Duration::from_micros(8_333);
        let drawn = (0..120)
            .filter(|i| pacer.should_draw(tick * *i))
            .count();
        assert!((59..=61).contains(&drawn), "drew {drawn}");
    }

    #[test]
    fn matching_refresh_with_jitter_draws_every_tick() {
        let mut pacer = FramePacer::new(60.0);
        let mut now = Duration::ZERO;
        assert!(pacer.should_draw(now));
        for i in 0..60 {
            // alternate slightly early and slightly late callbacks
            now += if i % 2 == 0 {
                Duration::from_micros(16_200)
            } else {
                Duration::from_micros(17_100)
            };
            assert!(pacer.should_draw(now), "tick {i} skipped");
        }
    }

    #[test]
    fn stamp_advances_by_whole_intervals() {
        let mut pacer = FramePacer::new(50.0);
        assert!(pacer.should_draw(ms(0)));
        assert!(pacer.should_draw(ms(25)));
        // last drawn is 20 ms, not 25 ms, so 40 ms is already due
        assert!(pacer.should_draw(ms(40)));
    }

    #[test]
    fn next_due_is_the_first_reading_that_draws() {
        let mut pacer = FramePacer::new(50.0);
        assert_eq!(pacer.next_due(), None);
        assert!(pacer.should_draw(ms(100)));
        // 20 ms interval less 2 ms of slack
        let due = pacer.next_due().unwrap();
        assert_eq!(due, ms(118));
        assert!(!pacer.should_draw(due - Duration::from_micros(1)));
        assert_eq!(pacer.next_due(), Some(due));
        assert!(pacer.should_draw(due));
        assert_eq!(pacer.next_due(), Some(ms(138)));
        assert_eq!(FramePacer::new(0.0).next_due(), None);
    }

    #[test]
    fn long_stall_does_not_burst() {
        let mut pacer = FramePacer::new(50.0);
        assert!(pacer.should_draw(ms(0)));
        assert!(pacer.should_draw(ms(5_000)));
        assert!(!pacer.should_draw(ms(5_005)));
    }

    #[test]
    fn zero_rate_disables_pacing() {
        let mut pacer = FramePacer::new(0.0);
        assert_eq!(pacer.interval(), Duration::ZERO);
        assert!(pacer.should_draw(ms(1)));
        assert!(pacer.should_draw(ms(1)));
    }

    #[test]
    fn reset_makes_next_tick_draw() {
        let mut pacer = FramePacer::new(60.0);
        assert!(pacer.should_draw(ms(100)));
        pacer.reset();
        assert!(pacer.should_draw(ms(101)));
    }

    #[test]
    fn stats_track_history() {
        let mut stats = FrameStats::new(3);
        for t in [0, 10, 30, 60] {
            stats.record_drawn(ms(t));
        }
        stats.record_throttled();

        assert_eq!(stats.count(), 3);
        assert_eq!(stats.average(), ms(20));
        assert_eq!(stats.max(), ms(30));
        assert_eq!(stats.min(), ms(10));
        assert_eq!(stats.drawn(), 4);
        assert_eq!(stats.throttled(), 1);
        assert!((stats.fps() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn stats_wrap_around() {
        let mut stats = FrameStats::new(2);
        for t in [0, 10, 30, 60] {
            stats.record_drawn(ms(t));
        }
        // holds 20 and 30
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.average(), ms(25));
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = FrameStats::default();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.average(), Duration::ZERO);
        assert_eq!(stats.fps(), 0.0);
    }
}
