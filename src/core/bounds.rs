use crate::error::ConstructionError;

/// Project a single value into `[min, max]`.
///
/// Negative values are reflected first (the model treats a negative magnitude
/// as a sign ambiguity), then clamped below and above. NaN maps to `min`.
#[inline]
pub fn project1(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    let value = if value < 0.0 { -value } else { value };
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Project every component of `vector` into its bounds.
///
/// Components without a matching bound are returned untouched; use
/// [`Bounds`] for a length-checked form.
pub fn project(vector: &[f64], minima: &[f64], maxima: &[f64]) -> Vec<f64> {
    let mut projected = vector.to_vec();
    for ((value, &min), &max) in projected.iter_mut().zip(minima).zip(maxima) {
        *value = project1(*value, min, max);
    }
    projected
}

/// Per-dimension feasible box, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    minima: Vec<f64>,
    maxima: Vec<f64>,
}

impl Bounds {
    pub fn new(minima: Vec<f64>, maxima: Vec<f64>) -> Result<Self, ConstructionError> {
        if minima.len() != maxima.len() {
            return Err(ConstructionError::DimensionMismatch {
                initial: minima.len(),
                minima: minima.len(),
                maxima: maxima.len(),
            });
        }
        if minima.is_empty() {
            return Err(ConstructionError::Empty);
        }
        for (index, (&min, &max)) in minima.iter().zip(&maxima).enumerate() {
            // NaN on either side fails this comparison too
            if !(min <= max) {
                return Err(ConstructionError::InvalidBounds { index, min, max });
            }
        }
        Ok(Self { minima, maxima })
    }

    pub fn len(&self) -> usize {
        self.minima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minima.is_empty()
    }

    pub fn minima(&self) -> &[f64] {
        &self.minima
    }

    pub fn maxima(&self) -> &[f64] {
        &self.maxima
    }

    /// `(min, max)` of dimension `index`.
    pub fn get(&self, index: usize) -> (f64, f64) {
        (self.minima[index], self.maxima[index])
    }

    /// Width of dimension `index`; infinite when a bound is unbounded.
    pub fn range(&self, index: usize) -> f64 {
        self.maxima[index] - self.minima[index]
    }

    /// Components beyond the box's dimension are left untouched.
    #[inline]
    pub fn project_in_place(&self, params: &mut [f64]) {
        let limits = self.minima.iter().zip(&self.maxima);
        for (value, (&min, &max)) in params.iter_mut().zip(limits) {
            *value = project1(*value, min, max);
        }
    }

    pub fn project(&self, params: &[f64]) -> Vec<f64> {
        let mut projected = params.to_vec();
        self.project_in_place(&mut projected);
        projected
    }

    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.len()
            && params
                .iter()
                .zip(self.minima.iter().zip(&self.maxima))
                .all(|(&v, (&min, &max))| v >= min && v <= max)
    }
}
