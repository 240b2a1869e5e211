// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for models and grid requests.

use crate::error::{Result, ValidationError};

/// Smallest ring with two distinct neighbours per node.
pub const MIN_DIMENSION: usize = 3;

/// Validate the ring dimension.
pub fn validate_dimension(dimension: usize) -> Result<()> {
    if dimension < MIN_DIMENSION {
        return Err(ValidationError::Field {
            field: "dimension".into(),
            message: format!("must be at least {}, got {}", MIN_DIMENSION, dimension),
        }
        .into());
    }
    Ok(())
}

/// Validate a single oracle strength.
pub fn validate_beta(beta: f64) -> Result<()> {
    check_non_negative("beta", beta, None)
}

/// Validate a single total evolution time.
pub fn validate_total_time(total_time: f64) -> Result<()> {
    check_non_negative("total_time", total_time, None)
}

/// Validate the β axis of a grid run.
pub fn validate_beta_array(betas: &[f64]) -> Result<()> {
    if betas.is_empty() {
        return Err(ValidationError::Field {
            field: "betas".into(),
            message: "cannot be empty".into(),
        }
        .into());
    }

    for (i, &beta) in betas.iter().enumerate() {
        check_non_negative("betas", beta, Some(i))?;
    }

    Ok(())
}

/// Validate the `[time_lb, time_ub]` range of a grid run.
pub fn validate_time_range(time_lb: f64, time_ub: f64) -> Result<()> {
    check_non_negative("time_lb", time_lb, None)?;
    check_non_negative("time_ub", time_ub, None)?;

    if time_lb > time_ub {
        return Err(ValidationError::Field {
            field: "time_lb".into(),
            message: format!("lower bound {} exceeds upper bound {}", time_lb, time_ub),
        }
        .into());
    }

    Ok(())
}

fn check_non_negative(field: &str, value: f64, index: Option<usize>) -> Result<()> {
    let at = index.map(|i| format!(" at index {}", i)).unwrap_or_default();
    if value.is_nan() {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("contains NaN{}", at),
        }
        .into());
    }
    if value.is_infinite() {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("contains Inf{}", at),
        }
        .into());
    }
    if value < 0.0 {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("negative value {}{}", value, at),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_validate_dimension() {
        assert!(validate_dimension(3).is_ok());
        assert!(validate_dimension(64).is_ok());
        assert!(validate_dimension(2).is_err());
        assert!(validate_dimension(0).is_err());
    }

    #[test]
    fn test_validate_beta_array() {
        // Valid
        assert!(validate_beta_array(&[0.0, 0.5, 2.0]).is_ok());

        // Empty
        assert!(validate_beta_array(&[]).is_err());

        // Negative
        assert!(validate_beta_array(&[0.1, -0.2]).is_err());

        // Contains NaN
        let err = validate_beta_array(&[0.1, f64::NAN, 0.3]).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_validate_time_range() {
        assert!(validate_time_range(0.0, 10.0).is_ok());
        assert!(validate_time_range(5.0, 5.0).is_ok());
        assert!(validate_time_range(10.0, 1.0).is_err());
        assert!(validate_time_range(-1.0, 1.0).is_err());
        assert!(validate_time_range(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_validation_errors_are_field_errors() {
        let err = validate_beta(-1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::Field { ref field, .. }) if field == "beta"
        ));
        assert!(validate_total_time(f64::NAN).is_err());
        assert!(validate_total_time(0.0).is_ok());
    }
}
