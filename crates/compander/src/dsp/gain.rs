//! Gain lookup against a [`TransferCurve`]

use super::curve::TransferCurve;

impl TransferCurve {
    /// Linear gain for a (linear) envelope level
    ///
    /// Levels below the curve's domain get the floor gain. Otherwise the
    /// segment table is scanned from the low end for the piece whose next
    /// anchor lies at or above `ln(envelope)`; above the last anchor the
    /// final piece applies.
    #[inline]
    pub fn gain(&self, envelope: f64) -> f64 {
        if envelope < self.in_min_lin {
            return self.out_min_lin;
        }

        let in_log = envelope.ln();
        let last = self.segments.len() - 1;
        let index = (1..last)
            .find(|&i| in_log <= self.segments[i + 1].x)
            .unwrap_or(last);

        self.segments[index].eval(in_log).exp()
    }

    /// Gain in dB for an envelope level in dB
    pub fn gain_db(&self, level_db: f64) -> f64 {
        20.0 * self.gain(10f64.powf(level_db / 20.0)).log10()
    }
}

#[cfg(test)]
mod tests {
    use crate::dsp::curve::TransferCurve;
    use compand_core::Breakpoint;

    fn default_curve() -> TransferCurve {
        TransferCurve::build(
            &[Breakpoint::new(-70.0, -70.0), Breakpoint::new(-60.0, -20.0)],
            0.01,
            0.0,
        )
        .unwrap()
    }

    fn knee_curve(knee: f64) -> TransferCurve {
        TransferCurve::build(
            &[
                Breakpoint::new(-80.0, -80.0),
                Breakpoint::new(-50.0, -30.0),
                Breakpoint::new(-20.0, -15.0),
                Breakpoint::new(-6.0, -9.0),
            ],
            knee,
            1.5,
        )
        .unwrap()
    }

    #[test]
    fn test_floor_clamp() {
        for curve in [default_curve(), knee_curve(6.0)] {
            let floor = curve.out_min_lin();
            assert_eq!(curve.gain(0.0), floor);
            assert_eq!(curve.gain(curve.in_min_lin() * 0.5), floor);
            assert_eq!(curve.gain(curve.in_min_lin() * (1.0 - 1e-12)), floor);
        }
    }

    #[test]
    fn test_straight_region_matches_line() {
        // Between -60 dB and 0 dB the relative gain falls linearly from
        // +40 dB to 0 dB, i.e. gain = level^(-2/3)
        let curve = default_curve();
        for level_db in [-55.0, -40.0, -20.0, -6.0, -0.5] {
            let env = 10f64.powf(level_db / 20.0);
            let expected = env.powf(-2.0 / 3.0);
            let gain = curve.gain(env);
            assert!(
                (gain - expected).abs() < 1e-9 * expected,
                "level {} dB: got {}, expected {}",
                level_db,
                gain,
                expected
            );
        }
    }

    #[test]
    fn test_gain_db_below_first_point() {
        // Below the first breakpoint the curve is unity
        let curve = default_curve();
        assert!(curve.gain_db(-80.0).abs() < 1e-9);
        assert!(curve.gain_db(-200.0).abs() < 1e-9);
    }

    #[test]
    fn test_above_full_scale_uses_last_gain() {
        let curve = knee_curve(2.0);
        let at_zero = curve.gain(1.0);
        assert!((curve.gain(2.0) - at_zero).abs() < 1e-12);
        assert!((curve.gain(10.0) - at_zero).abs() < 1e-12);
        // Unity point plus 1.5 dB output gain
        assert!((curve.gain_db(0.0) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_continuous_across_boundaries() {
        for knee in [0.01, 3.0, 6.0, 12.0] {
            let curve = knee_curve(knee);
            let segments = curve.segments();
            for (i, seg) in segments.iter().enumerate().skip(2) {
                let eps = 1e-9;
                let below = curve.gain((seg.x - eps).exp());
                let above = curve.gain((seg.x + eps).exp());
                assert!(
                    (below - above).abs() < 1e-6 * below.max(above),
                    "knee {} segment {}: {} vs {}",
                    knee,
                    i,
                    below,
                    above
                );
            }
        }
    }

    #[test]
    fn test_soft_knee_stays_between_lines() {
        // The rounded corner at -50 dB sits between the two straight pieces
        let curve = knee_curve(6.0);
        let sharp = knee_curve(0.01);
        let at_corner = curve.gain_db(-50.0);
        let sharp_corner = sharp.gain_db(-50.0);
        assert!(at_corner < sharp_corner);
        assert!(at_corner > 0.0);
    }

    #[test]
    fn test_repeatable_for_any_order() {
        let curve = knee_curve(6.0);
        let levels = [0.5, 1e-3, 0.25, 1e-5, 0.5, 0.9];
        let forward: Vec<f64> = levels.iter().map(|&l| curve.gain(l)).collect();
        let backward: Vec<f64> = levels.iter().rev().map(|&l| curve.gain(l)).collect();
        for (f, b) in forward.iter().zip(backward.iter().rev()) {
            assert_eq!(f, b);
        }
    }
}
