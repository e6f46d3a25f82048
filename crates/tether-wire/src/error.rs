//! Codec error type.

use thiserror::Error;

/// Errors produced while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_error_display() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = WireError::Serde(serde_err);
        assert!(err.to_string().contains("serde error"));
    }
}
