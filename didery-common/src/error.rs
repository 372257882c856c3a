/// Every way an inbound event, blob or deletion request can be rejected.
///
/// `Display` renders the human readable description returned to clients;
/// [`ValidationError::title`] gives the short heading that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    MalformedDid(String),

    #[error("Request must contain {0} field.")]
    MissingField(String),

    #[error("{0}")]
    MalformedField(String),

    #[error("Signature header missing.")]
    MissingSignatureHeader,

    #[error("Signature header missing signature for \"{0}\".")]
    MissingSignatureTag(String),

    #[error("Could not validate the request signature for {0} field. Unverifiable signature.")]
    UnverifiableSignature(String),

    #[error("{0}")]
    InvalidKey(String),

    #[error("{0}")]
    MalformedPayload(String),

    #[error("The DIDs key must match the first key in the signers field.")]
    HijackAttempt,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    StaleUpdate(String),

    #[error("{0}")]
    SequencingViolation(String),

    #[error("Signatures match the stored resource. Request could be a replay.")]
    ReplayedSignature,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

impl ValidationError {
    /// Return a short label for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedDid(_) => "malformed_did",
            Self::MissingField(_) => "missing_field",
            Self::MalformedField(_) => "malformed_field",
            Self::MissingSignatureHeader => "missing_signature_header",
            Self::MissingSignatureTag(_) => "missing_signature_tag",
            Self::UnverifiableSignature(_) => "unverifiable_signature",
            Self::InvalidKey(_) => "invalid_key",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::HijackAttempt => "hijack_attempt",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::StaleUpdate(_) => "stale_update",
            Self::SequencingViolation(_) => "sequencing_violation",
            Self::ReplayedSignature => "replayed_signature",
        }
    }

    /// Heading paired with the description in error responses.
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "Missing Required Field",
            Self::MalformedPayload(_) => "Malformed JSON",
            Self::MissingSignatureHeader | Self::MissingSignatureTag(_) => "Authorization Error",
            Self::UnverifiableSignature(_) | Self::HijackAttempt | Self::ReplayedSignature => {
                "Authorization Error"
            }
            Self::NotFound(_) => "Resource Not Found",
            Self::AlreadyExists(_) => "Resource Already Exists",
            _ => "Validation Error",
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedField(msg.into())
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_description_names_field() {
        let err = ValidationError::missing("signers");
        assert_eq!(err.to_string(), "Request must contain signers field.");
        assert_eq!(err.title(), "Missing Required Field");
        assert_eq!(err.kind(), "missing_field");
    }

    #[test]
    fn signature_errors_are_authorization_errors() {
        let err = ValidationError::UnverifiableSignature("rotation".into());
        assert_eq!(
            err.to_string(),
            "Could not validate the request signature for rotation field. Unverifiable signature."
        );
        assert_eq!(err.title(), "Authorization Error");
        assert_eq!(ValidationError::HijackAttempt.title(), "Authorization Error");
    }

    #[test]
    fn tag_is_quoted_in_missing_tag() {
        let err = ValidationError::MissingSignatureTag("rotation".into());
        assert_eq!(
            err.to_string(),
            "Signature header missing signature for \"rotation\"."
        );
    }
}
