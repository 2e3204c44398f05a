use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkowitzError {
    #[error("Dimension mismatch: {field} — {reason}")]
    DimensionMismatch { field: String, reason: String },

    #[error("Singular covariance matrix: {0}")]
    SingularCovariance(String),

    #[error("Degenerate market: A*C - B^2 = {d} leaves the return constraint without a unique solution")]
    DegenerateMarket { d: Decimal },

    #[error("Negative portfolio variance {variance}: covariance matrix is not positive definite")]
    NegativeVariance { variance: Decimal },

    #[error("Invalid frontier range: {reason}")]
    InvalidRange { reason: String },

    #[error("Arithmetic overflow in {context}: result exceeds the Decimal range")]
    ArithmeticOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for MarkowitzError {
    fn from(e: serde_json::Error) -> Self {
        MarkowitzError::SerializationError(e.to_string())
    }
}
