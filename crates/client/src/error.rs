use iden3_primitives::PrimitiveError;

/// Errors surfaced by the client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("relay returned {status}: {message}")]
    Relay {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, as returned by the relay.
        message: String,
    },

    /// Codec or proof-format failure from the primitives layer.
    #[error(transparent)]
    Primitives(#[from] PrimitiveError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The identity has not been created on the relay yet.
    #[error("identity has no address yet; create it first")]
    MissingIdAddress,

    /// No key metadata is stored for the identity.
    #[error("no key metadata stored for {0}")]
    MissingKeys(String),

    /// Stored metadata could not be encoded or decoded.
    #[error("store error: {0}")]
    Store(String),

    /// The injected signing provider failed.
    #[error("signer error: {0}")]
    Signer(String),
}

impl ClientError {
    /// Returns true if this error is transient and the operation can be
    /// retried against the relay.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Relay { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_side_relay_errors_are_recoverable() {
        let err = ClientError::Relay {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_recoverable());

        let err = ClientError::Relay {
            status: 400,
            message: "bad claim".to_string(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_primitive_errors_pass_through() {
        let err: ClientError = PrimitiveError::UnknownClaimType([0u8; 8]).into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("unknown claim type"));
    }
}
