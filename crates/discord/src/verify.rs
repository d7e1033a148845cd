use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use herald_core::IngressError;
use thiserror::Error;

/// Header carrying the hex-encoded Ed25519 signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Header carrying the decimal timestamp bound into the signed message.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("header `{0}` appeared more than once")]
    RepeatedHeader(&'static str),
    #[error("header `{0}` is not valid UTF-8")]
    NonUtf8Header(&'static str),
    #[error("request signature did not verify")]
    BadSignature,
}

impl From<AuthenticationError> for IngressError {
    fn from(error: AuthenticationError) -> Self {
        Self::Authentication(error.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifierBuildError {
    #[error("public key is not valid hex")]
    InvalidHex,
    #[error("public key must be exactly 32 bytes, got {0}")]
    WrongLength(usize),
    #[error("public key bytes do not form a valid Ed25519 key")]
    InvalidKey,
}

/// The signature and timestamp headers of one inbound request, after the
/// exactly-one-value-per-header guard has been applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub signature: String,
    pub timestamp: String,
}

impl SignatureHeaders {
    /// Accepts the full list of values observed for each header. Zero values
    /// or more than one value is an authentication failure (header smuggling
    /// guard), not a soft fallback to the first value.
    pub fn from_values(
        signature_values: &[&str],
        timestamp_values: &[&str],
    ) -> Result<Self, AuthenticationError> {
        let signature = single_value(signature_values, SIGNATURE_HEADER)?;
        let timestamp = single_value(timestamp_values, TIMESTAMP_HEADER)?;
        Ok(Self { signature: signature.to_owned(), timestamp: timestamp.to_owned() })
    }
}

fn single_value<'a>(
    values: &[&'a str],
    header: &'static str,
) -> Result<&'a str, AuthenticationError> {
    match values {
        [] => Err(AuthenticationError::MissingHeader(header)),
        [value] => Ok(value),
        _ => Err(AuthenticationError::RepeatedHeader(header)),
    }
}

/// Verifies that an inbound request body was signed by the platform.
///
/// The signed message is the exact byte concatenation of the timestamp header
/// value and the raw body. The body must be the bytes as received; parsing
/// and re-serializing JSON can silently change them and break verification.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key_hex: &str) -> Result<Self, VerifierBuildError> {
        let decoded =
            hex::decode(public_key_hex.trim()).map_err(|_| VerifierBuildError::InvalidHex)?;
        let key_bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| VerifierBuildError::WrongLength(decoded.len()))?;
        let key =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| VerifierBuildError::InvalidKey)?;
        Ok(Self { key })
    }

    /// Returns `false` for any malformed signature input; this boundary never
    /// errors or panics.
    pub fn verify(&self, signature_hex: &str, timestamp: &str, raw_body: &[u8]) -> bool {
        let Ok(decoded) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature_bytes) = <[u8; 64]>::try_from(decoded.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&signature_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(raw_body);

        self.key.verify(&message, &signature).is_ok()
    }
}
