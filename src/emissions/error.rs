use thiserror::Error;

/// Errors raised by the emission engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmissionError {
    /// A record carries a negative quantity or an unknown fuel
    #[error("invalid input in record '{record_id}': {reason}")]
    InvalidInput { record_id: String, reason: String },

    /// A caller-supplied range bound is not a `YYYY-MM-DD` date
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A range end was supplied without a start
    #[error("range end '{0}' given without a start date")]
    MissingStart(String),
}

impl EmissionError {
    pub(crate) fn negative(record_id: &str, field: &str, value: f64) -> Self {
        EmissionError::InvalidInput {
            record_id: record_id.to_string(),
            reason: format!("{} must be a finite, non-negative number, got {}", field, value),
        }
    }

    pub(crate) fn overflow(record_id: &str, what: &str) -> Self {
        EmissionError::InvalidInput {
            record_id: record_id.to_string(),
            reason: format!("{} exceeds the representable range", what),
        }
    }

    pub(crate) fn unrecognized_fuel(record_id: &str, fuel: &str) -> Self {
        EmissionError::InvalidInput {
            record_id: record_id.to_string(),
            reason: format!("unrecognized fuel type '{}'", fuel),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, EmissionError::InvalidInput { .. })
    }
}
