use thiserror::Error;

/// Errors raised while handling membership credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The input held no PEM block at all.
    #[error("no PEM data found in {kind}[{}]", hex(.bytes))]
    NoPemData {
        /// What the input was expected to hold (`cert`, `CRL`, `private key`).
        kind: &'static str,
        /// The offending input.
        bytes: Vec<u8>,
    },

    /// A PEM block was found but carried the wrong label.
    #[error("unexpected PEM label '{found}', expected '{expected}'")]
    UnexpectedPemLabel {
        /// The label that was expected.
        expected: &'static str,
        /// The label that was found.
        found: String,
    },

    /// The DER content of a certificate, CRL or key could not be handled.
    #[error("malformed DER: {0}")]
    Der(String),

    /// The key or signature uses an algorithm that is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A private key could not be decoded.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// A signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// No trusted root vouches for the certificate.
    #[error("x509: certificate signed by unknown authority")]
    UnknownAuthority,

    /// A certificate on the chain is outside its validity period.
    #[error("x509: certificate has expired or is not yet valid. serial number: {serial}")]
    Expired {
        /// Hex serial number of the certificate.
        serial: String,
    },

    /// A signing identity's private key does not match its certificate.
    #[error("private key does not match the public key of certificate {serial}")]
    KeyMismatch {
        /// Hex serial number of the certificate.
        serial: String,
    },

    /// A certificate that must be able to sign certificates cannot.
    #[error("KeyUsage must be KeyCertSign. serial number: {serial}")]
    NotCertificateSigner {
        /// Hex serial number of the certificate.
        serial: String,
    },

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<der::Error> for CredentialError {
    fn from(value: der::Error) -> Self {
        CredentialError::Der(value.to_string())
    }
}

impl From<der::pem::Error> for CredentialError {
    fn from(value: der::pem::Error) -> Self {
        CredentialError::Der(value.to_string())
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
