use rand::{Rng, RngCore};

use crate::core::Bounds;

/// Ranges at or above this are treated as unbounded.
const UNBOUNDED_RANGE: f64 = 1e100;

/// Range-relative random perturbation.
///
/// Each moved dimension gets a random sign times
/// `span * scale * 10^(-u * decades)` with `u ~ U[0, 1)`, where `span` is the
/// dimension's width. Magnitudes are log-uniform, so a single step policy
/// tries coarse jumps and fine adjustments alike, and parameters living
/// around 1e-7 move as readily as those around 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StepPolicy {
    scale: f64,
    decades: f64,
}

impl StepPolicy {
    pub(crate) fn new(scale: f64, decades: f64) -> Self {
        Self { scale, decades }
    }

    /// Write a projected perturbation of `base` into `out`.
    pub(crate) fn perturb(
        &self,
        rng: &mut dyn RngCore,
        bounds: &Bounds,
        base: &[f64],
        dimensions: &[usize],
        out: &mut Vec<f64>,
    ) {
        out.clear();
        out.extend_from_slice(base);
        for &i in dimensions {
            out[i] += self.offset(rng, span(bounds.range(i), base[i]));
        }
        bounds.project_in_place(out);
    }

    fn offset(&self, rng: &mut dyn RngCore, span: f64) -> f64 {
        let exponent = rng.gen_range(0.0..1.0) * self.decades;
        let magnitude = span * self.scale * 10f64.powf(-exponent);
        if rng.gen_bool(0.5) { magnitude } else { -magnitude }
    }
}

/// Width used to size steps; unbounded dimensions scale with the value itself.
fn span(range: f64, value: f64) -> f64 {
    if range.is_finite() && range < UNBOUNDED_RANGE {
        range
    } else {
        value.abs().max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn steps_stay_within_scaled_range() {
        let bounds = Bounds::new(vec![0.0, 1e-7], vec![8.0, 1e-5]).unwrap();
        let policy = StepPolicy::new(0.5, 6.0);
        let mut rng = StdRng::seed_from_u64(1);
        let base = [4.0, 5e-6];
        let mut out = Vec::new();

        for _ in 0..1000 {
            policy.perturb(&mut rng, &bounds, &base, &[0, 1], &mut out);
            assert!(bounds.contains(&out));
            assert!((out[0] - base[0]).abs() <= 8.0 * 0.5);
            assert!((out[1] - base[1]).abs() <= 1e-5 * 0.5);
        }
    }

    #[test]
    fn only_listed_dimensions_move() {
        let bounds = Bounds::new(vec![0.0; 3], vec![10.0; 3]).unwrap();
        let policy = StepPolicy::new(1.0, 3.0);
        let mut rng = StdRng::seed_from_u64(2);
        let base = [5.0, 5.0, 5.0];
        let mut out = Vec::new();

        for _ in 0..100 {
            policy.perturb(&mut rng, &bounds, &base, &[1], &mut out);
            assert_eq!(out[0], 5.0);
            assert_eq!(out[2], 5.0);
        }
    }

    #[test]
    fn magnitudes_cover_several_decades() {
        let policy = StepPolicy::new(1.0, 6.0);
        let mut rng = StdRng::seed_from_u64(3);
        let magnitudes: Vec<f64> = (0..2000).map(|_| policy.offset(&mut rng, 1.0).abs()).collect();

        assert!(magnitudes.iter().any(|&m| m > 0.1));
        assert!(magnitudes.iter().any(|&m| m < 1e-4));
        assert!(magnitudes.iter().all(|&m| m <= 1.0 && m >= 1e-6));
    }

    #[test]
    fn unbounded_dimensions_scale_with_value() {
        assert_eq!(span(8.0, 3.0), 8.0);
        assert_eq!(span(f64::INFINITY, 3.0), 3.0);
        assert_eq!(span(f64::MAX, 2e-6), 1.0);
    }
}
