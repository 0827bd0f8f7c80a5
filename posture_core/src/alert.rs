use crate::classifier::Verdict;
use std::time::{Duration, Instant};

/// Tracks a continuous bad-posture streak and decides when an audible alert
/// is due.
///
/// The timer is a plain value owned by whoever runs the frame loop. All
/// transitions take an explicit `now`, so tests drive a simulated clock and
/// multiple independent sessions can coexist in one process.
///
/// Firing is split in two: `observe` reports that an alert is due, and the
/// owner calls `mark_alerted` only once the alert side effect was actually
/// dispatched. A failed dispatch leaves `last_alert` untouched, so the next
/// frame retries immediately.
#[derive(Debug, Clone)]
pub struct AlertTimer {
    threshold: Duration,
    cooldown: Duration,
    bad_since: Option<Instant>,
    last_alert: Option<Instant>,
}

impl AlertTimer {
    pub fn new(threshold: Duration, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            bad_since: None,
            last_alert: None,
        }
    }

    /// Feeds one frame's verdict into the state machine. Returns true when
    /// an alert is due on this frame.
    pub fn observe(&mut self, verdict: &Verdict, now: Instant) -> bool {
        if verdict.is_good {
            self.bad_since = None;
            return false;
        }

        let since = *self.bad_since.get_or_insert(now);
        if now.duration_since(since) < self.threshold {
            return false;
        }

        match self.last_alert {
            Some(last) if now.duration_since(last) < self.cooldown => false,
            _ => true,
        }
    }

    /// Records a successfully dispatched alert, starting the cooldown.
    pub fn mark_alerted(&mut self, now: Instant) {
        self.last_alert = Some(now);
    }

    /// How long the current bad-posture streak has lasted, if one is active.
    pub fn bad_duration(&self, now: Instant) -> Option<Duration> {
        self.bad_since.map(|since| now.duration_since(since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PosturePolicy;

    const THRESHOLD: Duration = Duration::from_secs(10);

    fn good() -> Verdict {
        PosturePolicy::STANDARD.classify(-70.0)
    }

    fn bad() -> Verdict {
        PosturePolicy::STANDARD.classify(-10.0)
    }

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn streak_below_threshold_never_alerts() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        for s in 0..10 {
            assert!(!timer.observe(&bad(), at(base, s)), "alerted at {s}s");
        }
    }

    #[test]
    fn sustained_streak_alerts_exactly_once() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        let mut alerts = 0;
        for s in 0..=12 {
            if timer.observe(&bad(), at(base, s)) {
                timer.mark_alerted(at(base, s));
                alerts += 1;
            }
        }
        assert_eq!(alerts, 1);
    }

    #[test]
    fn alert_fires_on_the_tenth_second_not_before() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        for s in 0..10 {
            assert!(!timer.observe(&bad(), at(base, s)));
        }
        assert!(timer.observe(&bad(), at(base, 10)));
    }

    #[test]
    fn good_frame_resets_the_streak() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        let mut first_alert = None;
        for s in 0..=20 {
            let verdict = if s == 5 { good() } else { bad() };
            if timer.observe(&verdict, at(base, s)) {
                timer.mark_alerted(at(base, s));
                first_alert.get_or_insert(s);
            }
        }
        // The streak restarts at second 6, so the earliest alert is 16.
        assert_eq!(first_alert, Some(16));
    }

    #[test]
    fn cooldown_suppresses_the_second_streak() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        for s in 0..=10 {
            if timer.observe(&bad(), at(base, s)) {
                timer.mark_alerted(at(base, s));
            }
        }
        // Still bad, 4 seconds later: within cooldown despite the streak
        // being well past the threshold.
        assert!(!timer.observe(&bad(), at(base, 14)));
        // Cooldown expired: re-alert.
        assert!(timer.observe(&bad(), at(base, 20)));
    }

    #[test]
    fn failed_dispatch_retries_on_the_next_frame() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        for s in 0..10 {
            timer.observe(&bad(), at(base, s));
        }
        // Alert due, but the owner fails to play the sound and never marks.
        assert!(timer.observe(&bad(), at(base, 10)));
        assert!(timer.observe(&bad(), at(base, 11)));
        timer.mark_alerted(at(base, 11));
        assert!(!timer.observe(&bad(), at(base, 12)));
    }

    #[test]
    fn good_frame_clears_streak_but_not_cooldown() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        for s in 0..=10 {
            if timer.observe(&bad(), at(base, s)) {
                timer.mark_alerted(at(base, s));
            }
        }
        assert!(!timer.observe(&good(), at(base, 11)));
        assert_eq!(timer.bad_duration(at(base, 11)), None);
        // New streak must accumulate a full threshold on its own, and by
        // then the cooldown has also lapsed.
        for s in 12..22 {
            assert!(!timer.observe(&bad(), at(base, s)));
        }
        assert!(timer.observe(&bad(), at(base, 22)));
    }

    #[test]
    fn bad_duration_tracks_the_streak() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        assert_eq!(timer.bad_duration(base), None);
        timer.observe(&bad(), base);
        assert_eq!(timer.bad_duration(at(base, 3)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn twelve_one_second_frames_end_to_end() {
        let base = Instant::now();
        let mut timer = AlertTimer::new(THRESHOLD, THRESHOLD);
        let mut fired_at = Vec::new();
        for s in 0..12 {
            if timer.observe(&bad(), at(base, s)) {
                timer.mark_alerted(at(base, s));
                fired_at.push(s);
            }
        }
        assert_eq!(fired_at, vec![10]);
    }
}
