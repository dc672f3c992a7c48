//! Arity validation - count gates that run before any extraction
//!
//! Pure checks: the only effect is the returned panic. `None` as the
//! upper bound permits variadic calls.

use crate::panic::Panic;

/// Require `count` to fall within `[min, max]` (or `[min, ∞)` when
/// `max` is `None`).
pub fn check_range(count: usize, min: usize, max: Option<usize>) -> Result<(), Panic> {
    if count < min {
        return Err(Panic::arity(format!(
            "expected at least {min} argument(s), got {count}"
        )));
    }
    if let Some(max) = max {
        if count > max {
            return Err(Panic::arity(format!(
                "expected at most {max} argument(s), got {count}"
            )));
        }
    }
    Ok(())
}

/// Require exactly `expected` arguments, phrased for the single-arity case
pub fn check_exact(count: usize, expected: usize) -> Result<(), Panic> {
    if count == expected {
        Ok(())
    } else {
        Err(Panic::arity(format!(
            "expected {expected} argument(s), got {count}"
        )))
    }
}
