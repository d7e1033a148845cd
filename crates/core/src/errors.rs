use thiserror::Error;

/// Failures that terminate an inbound request before any dispatch happens.
///
/// Verification and decoding failures never reach the dispatcher; this enum
/// is the seam the HTTP layer uses to choose a status code and a safe
/// user-facing message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngressError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("dispatch queue unavailable: {0}")]
    Unavailable(String),
}

impl IngressError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::Malformed(_) => 400,
            Self::Unavailable(_) => 503,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "invalid signature",
            Self::Malformed(_) => "invalid request",
            Self::Unavailable(_) => "service temporarily unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IngressError;

    #[test]
    fn authentication_maps_to_401_with_fixed_message() {
        let error = IngressError::Authentication("duplicate signature header".to_string());
        assert_eq!(error.status_code(), 401);
        assert_eq!(error.user_message(), "invalid signature");
    }

    #[test]
    fn malformed_maps_to_400() {
        let error = IngressError::Malformed("body is not json".to_string());
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.user_message(), "invalid request");
    }

    #[test]
    fn unavailable_maps_to_503() {
        let error = IngressError::Unavailable("queue full".to_string());
        assert_eq!(error.status_code(), 503);
    }
}
