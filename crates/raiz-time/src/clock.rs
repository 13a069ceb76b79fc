//! Wall-clock pacing for the virtual timeline

use std::time::{Duration, Instant};

use raiz_core::SimTime;

/// Maps simulation time onto real instants
///
/// Real-time drivers sleep until `instant_for(next_deadline)` and then run
/// the scheduler up to `sim_now()`.
/// INVARIANT: `sim_now` is monotonic, since it derives from `Instant`.
#[derive(Clone, Copy, Debug)]
pub struct Pacer {
    /// Real instant corresponding to `origin_sim`
    reference: Instant,
    origin_sim: SimTime,
    /// Playback rate (1.0 = real time)
    rate: f64,
}

impl Pacer {
    /// Start pacing now, with the virtual clock at `origin_sim`
    pub fn new(origin_sim: SimTime) -> Self {
        Pacer {
            reference: Instant::now(),
            origin_sim,
            rate: 1.0,
        }
    }

    /// Run the timeline faster (> 1.0) or slower (< 1.0) than real time.
    /// Clamped to [0.1, 100.0].
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate.clamp(0.1, 100.0);
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Virtual time corresponding to the current real instant
    pub fn sim_now(&self) -> SimTime {
        self.sim_at(Instant::now())
    }

    /// Virtual time corresponding to `instant`
    pub fn sim_at(&self, instant: Instant) -> SimTime {
        let real = instant.saturating_duration_since(self.reference);
        self.origin_sim + real.mul_f64(self.rate)
    }

    /// Real instant at which `t` is reached
    pub fn instant_for(&self, t: SimTime) -> Instant {
        let virtual_elapsed = t.duration_since(self.origin_sim);
        self.reference + virtual_elapsed.div_f64(self.rate)
    }

    /// Real time left until `t`, zero if already reached
    pub fn until(&self, t: SimTime) -> Duration {
        self.instant_for(t).saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_now_monotonic() {
        let pacer = Pacer::new(SimTime::ZERO);
        let t1 = pacer.sim_now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = pacer.sim_now();
        assert!(t2 > t1);
    }

    #[test]
    fn test_instant_roundtrip() {
        let pacer = Pacer::new(SimTime::from_secs(10));
        let target = SimTime::from_secs(12);
        let instant = pacer.instant_for(target);
        let back = pacer.sim_at(instant);
        // Within a microsecond of float rounding
        assert!(back.as_micros().abs_diff(target.as_micros()) <= 1);
    }

    #[test]
    fn test_rate_scales_timeline() {
        let pacer = Pacer::new(SimTime::ZERO).with_rate(4.0);
        let instant = pacer.instant_for(SimTime::from_secs(4));
        assert_eq!(
            instant.duration_since(pacer.reference),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_past_target_needs_no_wait() {
        let pacer = Pacer::new(SimTime::from_secs(5));
        assert_eq!(pacer.until(SimTime::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn test_rate_clamped() {
        assert_eq!(Pacer::new(SimTime::ZERO).with_rate(0.0).rate(), 0.1);
        assert_eq!(Pacer::new(SimTime::ZERO).with_rate(1e6).rate(), 100.0);
    }
}
