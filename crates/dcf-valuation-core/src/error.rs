use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    #[error("Invalid assumption: {field}: {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error(
        "Degenerate terminal value: discount rate ({discount_rate}) must exceed terminal growth rate ({terminal_growth_rate})"
    )]
    DegenerateTerminalValue {
        discount_rate: Decimal,
        terminal_growth_rate: Decimal,
    },

    #[error("Invalid share count: {0} (shares outstanding must be positive)")]
    InvalidShareCount(Decimal),

    #[error("Insufficient peer data: {0}")]
    InsufficientPeerData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DcfError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DcfError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}
