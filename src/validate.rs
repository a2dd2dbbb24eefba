use thiserror::Error;

/// Local rejection; never reaches the network layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("score {0} is below 0")]
    BelowZero(f64),
    #[error("score {value} exceeds total marks {total}")]
    AboveTotal { value: f64, total: f64 },
    #[error("{0}")]
    Empty(&'static str),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::NotNumeric(_) => "not_numeric",
            ValidationError::BelowZero(_) => "below_zero",
            ValidationError::AboveTotal { .. } => "above_total",
            ValidationError::Empty(_) => "empty",
        }
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// Inclusive on both ends: `0 <= value <= total`.
pub fn check_range(value: f64, total: f64) -> Result<f64, ValidationError> {
    if value < 0.0 {
        return Err(ValidationError::BelowZero(value));
    }
    if value > total {
        return Err(ValidationError::AboveTotal { value, total });
    }
    Ok(value)
}

/// Blank input is `Ok(None)`; anything else must be a number in range.
pub fn parse_score_input(raw: &str, total: f64) -> Result<Option<f64>, ValidationError> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    let Some(v) = parse_number(t) else {
        return Err(ValidationError::NotNumeric(t.to_string()));
    };
    check_range(v, total).map(Some)
}
