use std::collections::BTreeSet;

use crate::data::model::{Field, LoadedArray, Scalar, shape_text};

use super::ReportError;

/// Distinct values are only enumerated for arrays up to this size...
pub const DISTINCT_MAX_ELEMENTS: usize = 1000;
/// ...and only when there are at most this many of them.
pub const DISTINCT_MAX_VALUES: usize = 20;

// ---------------------------------------------------------------------------
// Size and type facts
// ---------------------------------------------------------------------------

/// Facts that are always reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub ndim: usize,
    pub len: usize,
    pub nbytes: usize,
    /// Record fields in declaration order; empty for scalar types.
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub dtype: String,
}

impl Summary {
    pub fn kib(&self) -> f64 {
        self.nbytes as f64 / 1024.0
    }

    pub fn mib(&self) -> f64 {
        self.nbytes as f64 / (1024.0 * 1024.0)
    }

    pub fn shape_text(&self) -> String {
        shape_text(&self.shape)
    }
}

pub fn summarize(array: &LoadedArray) -> Summary {
    Summary {
        dtype: array.dtype().name(),
        shape: array.shape().to_vec(),
        ndim: array.ndim(),
        len: array.len(),
        nbytes: array.nbytes(),
        fields: array.fields().iter().map(field_summary).collect(),
    }
}

/// Sub-array fields print as `('<f4', (3,))`, scalar fields by type name.
fn field_summary(field: &Field) -> FieldSummary {
    let dtype = if field.shape.is_empty() {
        field.dtype.name()
    } else {
        format!("('{}', {})", field.dtype.descr(), shape_text(&field.shape))
    };
    FieldSummary {
        name: field.name.clone(),
        dtype,
    }
}

// ---------------------------------------------------------------------------
// Numeric statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: Scalar,
    pub max: Scalar,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Sorted distinct values, when the array is small and they are few.
    pub distinct: Option<Vec<Scalar>>,
}

/// Descriptive statistics over every element.
///
/// `Ok(None)` for non-numeric element types and for empty arrays. Any NaN
/// makes min, max, mean and std NaN.
pub fn statistics(array: &LoadedArray) -> Result<Option<Stats>, ReportError> {
    if !array.dtype().is_numeric() || array.is_empty() {
        return Ok(None);
    }

    let track_distinct = array.len() <= DISTINCT_MAX_ELEMENTS;
    let mut distinct = BTreeSet::new();
    let mut moments = Moments::default();
    let mut bounds: Option<(Scalar, Scalar)> = None;

    for index in 0..array.len() {
        let value = array
            .element(index)
            .ok_or_else(|| ReportError::unsupported(array.dtype()))?;
        let x = value
            .as_f64()
            .ok_or_else(|| ReportError::unsupported(array.dtype()))?;
        moments.push(x);

        bounds = match bounds {
            None => Some((value.clone(), value.clone())),
            Some((lo, hi)) => {
                let lo = if value < lo { value.clone() } else { lo };
                let hi = if value > hi { value.clone() } else { hi };
                Some((lo, hi))
            }
        };
        if track_distinct {
            distinct.insert(value.canonical());
        }
    }

    let Some((mut min, mut max)) = bounds else {
        return Ok(None);
    };
    if moments.saw_nan {
        min = min.nan_like();
        max = max.nan_like();
    }
    let distinct = (track_distinct && distinct.len() <= DISTINCT_MAX_VALUES)
        .then(|| distinct.into_iter().collect());

    Ok(Some(Stats {
        min,
        max,
        mean: moments.mean(),
        std: moments.std(),
        distinct,
    }))
}

/// Single-pass mean and variance (Welford) accumulated in `f64`.
#[derive(Debug, Default)]
struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
    sum: f64,
    saw_nan: bool,
    saw_inf: bool,
}

impl Moments {
    fn push(&mut self, x: f64) {
        if x.is_nan() {
            self.saw_nan = true;
            return;
        }
        self.sum += x;
        if x.is_infinite() {
            self.saw_inf = true;
            return;
        }
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn mean(&self) -> f64 {
        if self.saw_nan {
            f64::NAN
        } else if self.saw_inf {
            // inf, -inf, or NaN when both signs are present
            self.sum
        } else {
            self.mean
        }
    }

    fn std(&self) -> f64 {
        if self.saw_nan || self.saw_inf || self.count == 0 {
            f64::NAN
        } else {
            (self.m2 / self.count as f64).max(0.0).sqrt()
        }
    }
}
