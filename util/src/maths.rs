//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value between `min` and `max`, returning the clamped value and
/// whether or not the clamp was applied.
///
/// NaN values are passed through unchanged and reported as unclamped, callers
/// must check for finiteness first if that matters to them.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> (T, bool)
where
    T: Float
{
    if *value > *max {
        (*max, true)
    }
    else if *value < *min {
        (*min, true)
    }
    else {
        (*value, false)
    }
}

/// Returns the sign of the value, treating zero (of either sign) as positive.
pub fn sign_or_pos<T>(value: T) -> T
where
    T: Float
{
    if value < T::zero() {
        -T::one()
    }
    else {
        T::one()
    }
}

/// Returns true if all values in the slice are finite.
pub fn all_finite<T>(values: &[T]) -> bool
where
    T: Float
{
    values.iter().all(|v| v.is_finite())
}
