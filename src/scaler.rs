use crate::enums::DegeneratePolicy;

use log::warn;
use ndarray::{Array, ArrayBase, Data, Dimension};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Image has the constant value {value} and cannot be min-max scaled")]
pub struct DegenerateImageError {
    pub value: f32,
}

/// Smallest and largest value of an array, `None` when it is empty.
pub fn min_max<S, D>(array: &ArrayBase<S, D>) -> Option<(f32, f32)>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    array.iter().fold(None, |acc, &value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// Linearly map an array of any dimensionality into `[0, 1]`
///
/// The global minimum becomes `0.0` and the global maximum `1.0`. A constant
/// array is handled according to `policy`. An empty array is returned as is.
///
/// # Errors
///
/// Returns [`DegenerateImageError`] for a constant array under
/// [`DegeneratePolicy::Reject`].
pub fn normalize<S, D>(
    array: &ArrayBase<S, D>,
    policy: DegeneratePolicy,
) -> Result<Array<f32, D>, DegenerateImageError>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let Some((min, max)) = min_max(array) else {
        return Ok(array.to_owned());
    };

    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return match policy {
            DegeneratePolicy::Zeros => {
                warn!("Constant image (value {min}), substituting zeros");
                Ok(Array::zeros(array.raw_dim()))
            }
            DegeneratePolicy::Reject => Err(DegenerateImageError { value: min }),
        };
    }

    let mut normalized = array.to_owned();
    normalized.par_mapv_inplace(|value| (value - min) / range);
    Ok(normalized)
}
