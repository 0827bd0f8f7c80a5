use thiserror::Error;

pub const GOOD_POSTURE: &str = "Good Posture";
pub const BAD_POSTURE: &str = "Bad Posture! Please sit straight";

/// Classification of a single frame's neck angle. Carries no memory of
/// previous frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub label: &'static str,
    pub is_good: bool,
}

impl Verdict {
    fn good() -> Self {
        Self {
            label: GOOD_POSTURE,
            is_good: true,
        }
    }

    fn bad() -> Self {
        Self {
            label: BAD_POSTURE,
            is_good: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("accepted range is inverted: {min} > {max}")]
    InvertedRange { min: f32, max: f32 },
}

/// Inclusive accepted range for the negated neck angle.
///
/// Deployments disagree on the accepted range for the same measurement, so
/// the range is a constructor parameter with named presets rather than a
/// constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosturePolicy {
    good_min: f32,
    good_max: f32,
}

impl PosturePolicy {
    /// Default policy, [65, 100] degrees.
    pub const STANDARD: PosturePolicy = PosturePolicy {
        good_min: 65.0,
        good_max: 100.0,
    };

    /// Narrower [60, 80] degree policy.
    pub const STRICT: PosturePolicy = PosturePolicy {
        good_min: 60.0,
        good_max: 80.0,
    };

    pub fn new(good_min: f32, good_max: f32) -> Result<Self, PolicyError> {
        if good_min > good_max {
            return Err(PolicyError::InvertedRange {
                min: good_min,
                max: good_max,
            });
        }
        Ok(Self { good_min, good_max })
    }

    /// Classifies a raw `neck_angle` output. The raw angle is negated first:
    /// upright poses measure negative in image coordinates.
    pub fn classify(&self, raw_angle: f32) -> Verdict {
        let angle = -raw_angle;
        if angle >= self.good_min && angle <= self.good_max {
            Verdict::good()
        } else {
            Verdict::bad()
        }
    }
}

impl Default for PosturePolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive() {
        let policy = PosturePolicy::STANDARD;
        assert!(policy.classify(-65.0).is_good);
        assert!(policy.classify(-100.0).is_good);
        assert!(!policy.classify(-64.999).is_good);
        assert!(!policy.classify(-100.001).is_good);
    }

    #[test]
    fn strict_preset_uses_its_own_bounds() {
        let policy = PosturePolicy::STRICT;
        assert!(policy.classify(-60.0).is_good);
        assert!(policy.classify(-80.0).is_good);
        assert!(!policy.classify(-85.0).is_good);
    }

    #[test]
    fn labels_match_verdict() {
        let policy = PosturePolicy::STANDARD;
        assert_eq!(policy.classify(-70.0).label, GOOD_POSTURE);
        assert_eq!(policy.classify(-10.0).label, BAD_POSTURE);
    }

    #[test]
    fn zero_angle_is_not_good() {
        // Coincident shoulder/ear landmarks collapse to a raw angle of 0.
        assert!(!PosturePolicy::STANDARD.classify(0.0).is_good);
        assert!(!PosturePolicy::STRICT.classify(0.0).is_good);
    }

    #[test]
    fn classification_is_idempotent() {
        let policy = PosturePolicy::STANDARD;
        let first = policy.classify(-72.5);
        for _ in 0..10 {
            assert_eq!(policy.classify(-72.5), first);
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(PosturePolicy::new(100.0, 65.0).is_err());
        assert!(PosturePolicy::new(65.0, 65.0).is_ok());
    }
}
