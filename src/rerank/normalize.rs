/// Score transform applied once, at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Scores are returned as the backend produced them.
    Raw,
    /// Scores are mapped through the logistic sigmoid into (0, 1).
    Sigmoid,
}

impl Normalization {
    pub fn from_flag(normalize: bool) -> Self {
        if normalize { Self::Sigmoid } else { Self::Raw }
    }

    pub fn is_normalized(self) -> bool {
        matches!(self, Self::Sigmoid)
    }

    /// Widens to `f64` so normalized scores near 0 and 1 stay distinct.
    pub fn apply(self, raw: f32) -> f64 {
        match self {
            Self::Raw => f64::from(raw),
            Self::Sigmoid => sigmoid(raw),
        }
    }
}

/// Logistic sigmoid `1 / (1 + e^-s)`.
///
/// Evaluated and returned in `f64` with the branch that never exponentiates a
/// positive argument. Logits within about ±36 map strictly inside (0, 1);
/// larger magnitudes saturate instead of overflowing.
pub fn sigmoid(score: f32) -> f64 {
    let s = f64::from(score);
    if s >= 0.0 {
        1.0 / (1.0 + (-s).exp())
    } else {
        let e = s.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_known_values() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) - 0.880_797).abs() < 1e-6);
        assert!((sigmoid(-2.0) - 0.119_203).abs() < 1e-6);
        assert!((sigmoid(-5.652_343_75) - 0.003_497).abs() < 1e-5);
    }

    #[test]
    fn test_sigmoid_is_strictly_increasing() {
        let samples: Vec<f32> = (-64..=64).map(|i| i as f32 * 0.125).collect();
        for pair in samples.windows(2) {
            let (b, a) = (pair[0], pair[1]);
            assert!(
                sigmoid(a) > sigmoid(b),
                "sigmoid({a}) <= sigmoid({b})"
            );
        }
    }

    #[test]
    fn test_sigmoid_stays_in_unit_interval() {
        for s in [-30.0f32, -15.0, -3.5, -0.001, 0.001, 3.5, 15.0, 30.0] {
            let v = sigmoid(s);
            assert!(v > 0.0 && v < 1.0, "sigmoid({s}) = {v}");
        }
    }

    #[test]
    fn test_large_logits_stay_distinct() {
        assert!(sigmoid(17.0) < sigmoid(18.0));
        assert!(sigmoid(18.0) < sigmoid(20.0));
        assert!(sigmoid(20.0) < sigmoid(30.0));
        assert!(sigmoid(-104.0) > 0.0);
        assert!(sigmoid(-30.0) < sigmoid(-20.0));
    }

    #[test]
    fn test_sigmoid_extremes_do_not_overflow() {
        assert!(sigmoid(f32::MAX).is_finite());
        assert!(sigmoid(f32::MIN).is_finite());
        assert!(sigmoid(1e6) <= 1.0);
        assert!(sigmoid(-1e6) >= 0.0);
    }

    #[test]
    fn test_applying_twice_changes_value() {
        let once = Normalization::Sigmoid.apply(1.5);
        let twice = Normalization::Sigmoid.apply(once as f32);
        assert_ne!(once, twice);
    }

    #[test]
    fn test_raw_is_identity() {
        assert_eq!(Normalization::Raw.apply(-3.25), -3.25);
        assert_eq!(Normalization::from_flag(false), Normalization::Raw);
        assert!(Normalization::from_flag(true).is_normalized());
    }
}
