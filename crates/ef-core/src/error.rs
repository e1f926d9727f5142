use uuid::Uuid;

/// Alias for `Result<T, EfError>`.
pub type EfResult<T> = Result<T, EfError>;

/// Configuration and setup errors.
///
/// Physical operations (adding or removing energy, moving chunks) never
/// produce these; they clamp or no-op instead. These are raised once at
/// construction or selection time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EfError {
    /// A smoothing window of zero samples was requested.
    #[error("moving average window size must be at least 1")]
    InvalidWindowSize,

    /// A quantity that must be strictly positive and finite was not.
    #[error("invalid {what}: {value} (must be positive and finite)")]
    InvalidQuantity {
        /// Name of the offending quantity.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A thermal category name could not be parsed.
    #[error("unknown thermal category: \"{0}\"")]
    UnknownCategory(String),

    /// An energy type name could not be parsed.
    #[error("unknown energy type: \"{0}\"")]
    UnknownEnergyType(String),

    /// A pipeline selection referenced an element outside its carousel.
    #[error("{stage} selection {index} out of range (carousel has {len})")]
    SelectionOutOfRange {
        /// The carousel stage ("source", "converter", "user").
        stage: &'static str,
        /// The requested index.
        index: usize,
        /// Number of elements available in that carousel.
        len: usize,
    },

    /// A container id was not present in the thermal scene.
    #[error("container not found: {0}")]
    UnknownContainer(Uuid),

    /// A configuration document was malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EfError {
    /// Check that `value` is finite and strictly positive.
    pub fn ensure_positive(what: &'static str, value: f64) -> EfResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self::InvalidQuantity { what, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_positive_accepts_positive() {
        assert_eq!(EfError::ensure_positive("mass", 2.5), Ok(2.5));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_nan() {
        assert!(EfError::ensure_positive("mass", 0.0).is_err());
        assert!(EfError::ensure_positive("mass", -1.0).is_err());
        assert!(EfError::ensure_positive("mass", f64::NAN).is_err());
        assert!(EfError::ensure_positive("mass", f64::INFINITY).is_err());
    }

    #[test]
    fn selection_error_message() {
        let err = EfError::SelectionOutOfRange {
            stage: "user",
            index: 7,
            len: 4,
        };
        assert_eq!(err.to_string(), "user selection 7 out of range (carousel has 4)");
    }
}
