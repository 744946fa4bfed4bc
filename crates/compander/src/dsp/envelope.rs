/// Envelope follower - per-channel one-pole smoother over sample magnitude
///
/// Rising levels are tracked with the attack coefficient and falling levels
/// with the decay coefficient.
use compand_core::ChannelTimes;

/// Convert a time constant in seconds to a smoothing coefficient in (0, 1]
///
/// Times at or below one sample period respond instantly.
#[inline]
pub fn time_to_coeff(time: f64, sample_rate: u32) -> f64 {
    let rate = sample_rate as f64;
    if time > 1.0 / rate {
        1.0 - (-1.0 / (rate * time)).exp()
    } else {
        1.0
    }
}

/// Convert a level in dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10_f64.powf(db / 20.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeFollower {
    attack_coeff: f64,
    decay_coeff: f64,
    envelope: f64,
}

impl EnvelopeFollower {
    /// Create a follower from precomputed coefficients
    pub fn new(attack_coeff: f64, decay_coeff: f64, envelope: f64) -> Self {
        Self {
            attack_coeff,
            decay_coeff,
            envelope,
        }
    }

    /// Create a follower from time constants and an initial level in dB
    pub fn from_times(times: ChannelTimes, sample_rate: u32, initial_volume_db: f64) -> Self {
        Self::new(
            time_to_coeff(times.attack, sample_rate),
            time_to_coeff(times.decay, sample_rate),
            db_to_linear(initial_volume_db),
        )
    }

    /// Feed one rectified sample and return the new envelope
    #[inline]
    pub fn update(&mut self, level: f64) -> f64 {
        let delta = level - self.envelope;
        if delta > 0.0 {
            self.envelope += delta * self.attack_coeff;
        } else {
            self.envelope += delta * self.decay_coeff;
        }
        self.envelope
    }

    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    pub fn attack_coeff(&self) -> f64 {
        self.attack_coeff
    }

    pub fn decay_coeff(&self) -> f64 {
        self.decay_coeff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_coeff() {
        let coeff = time_to_coeff(0.3, 44100);
        let expected = 1.0 - (-1.0f64 / (44100.0 * 0.3)).exp();
        assert_eq!(coeff, expected);
        assert!(coeff > 0.0 && coeff < 1.0);

        // At or below one sample period the follower is instant
        assert_eq!(time_to_coeff(0.0, 44100), 1.0);
        assert_eq!(time_to_coeff(1.0 / 48000.0, 48000), 1.0);
    }

    #[test]
    fn test_initial_volume() {
        let times = ChannelTimes {
            attack: 0.3,
            decay: 0.8,
        };
        let env = EnvelopeFollower::from_times(times, 48000, 0.0);
        assert_eq!(env.envelope(), 1.0);

        let env = EnvelopeFollower::from_times(times, 48000, -20.0);
        assert!((env.envelope() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_attack_monotonic_without_overshoot() {
        let mut env = EnvelopeFollower::new(0.1, 0.01, 0.0);
        let target = 0.8;
        let mut previous = env.envelope();

        for _ in 0..50 {
            let current = env.update(target);
            assert!(current > previous);
            assert!(current <= target);
            // Remaining distance shrinks geometrically
            let ratio = (target - current) / (target - previous);
            assert!((ratio - 0.9).abs() < 1e-9);
            previous = current;
        }
    }

    #[test]
    fn test_decay_uses_decay_coeff() {
        let mut env = EnvelopeFollower::new(0.5, 0.25, 1.0);
        assert_eq!(env.update(0.0), 0.75);
        assert_eq!(env.update(0.0), 0.5625);
        // Rising again switches to the attack coefficient
        assert_eq!(env.update(1.0), 0.78125);
    }

    #[test]
    fn test_instant_follower_tracks_input() {
        let mut env = EnvelopeFollower::new(1.0, 1.0, 0.0);
        for level in [0.3, 0.9, 0.1, 0.0, 0.5] {
            assert!((env.update(level) - level).abs() < 1e-12);
        }
    }
}
