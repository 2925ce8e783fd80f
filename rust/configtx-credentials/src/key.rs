//! Private keys and signing identities.

use std::fmt;

use const_oid::{ObjectIdentifier, db::rfc5912};
use p256::pkcs8::DecodePrivateKey;
use signature::Signer;
use x509_cert::Certificate;

use crate::CredentialError;

/// An elliptic curve private key able to sign revocation lists.
///
/// Only the NIST P-256 and P-384 curves are supported.
#[derive(Clone)]
pub enum PrivateKey {
    /// A NIST P-256 key, signing with SHA-256.
    P256(p256::ecdsa::SigningKey),
    /// A NIST P-384 key, signing with SHA-384.
    P384(p384::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Decode a PKCS#8 DER private key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CredentialError> {
        if let Ok(key) = p256::SecretKey::from_pkcs8_der(der) {
            return Ok(PrivateKey::P256(key.into()));
        }
        p384::SecretKey::from_pkcs8_der(der)
            .map(|key| PrivateKey::P384(key.into()))
            .map_err(|error| CredentialError::InvalidPrivateKey(error.to_string()))
    }

    /// Decode a SEC1 DER elliptic curve private key.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self, CredentialError> {
        if let Ok(key) = p256::SecretKey::from_sec1_der(der) {
            return Ok(PrivateKey::P256(key.into()));
        }
        p384::SecretKey::from_sec1_der(der)
            .map(|key| PrivateKey::P384(key.into()))
            .map_err(|error| CredentialError::InvalidPrivateKey(error.to_string()))
    }

    /// The X.509 signature algorithm this key signs with.
    pub fn signature_algorithm(&self) -> ObjectIdentifier {
        match self {
            PrivateKey::P256(_) => rfc5912::ECDSA_WITH_SHA_256,
            PrivateKey::P384(_) => rfc5912::ECDSA_WITH_SHA_384,
        }
    }

    /// The uncompressed SEC1 encoding of the matching public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::P256(key) => key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            PrivateKey::P384(key) => key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        }
    }

    /// Sign `message`, returning a DER encoded ECDSA signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CredentialError> {
        match self {
            PrivateKey::P256(key) => {
                let signature: p256::ecdsa::DerSignature = key
                    .try_sign(message)
                    .map_err(|error| CredentialError::Signing(error.to_string()))?;
                Ok(signature.as_bytes().to_vec())
            }
            PrivateKey::P384(key) => {
                let signature: p384::ecdsa::DerSignature = key
                    .try_sign(message)
                    .map_err(|error| CredentialError::Signing(error.to_string()))?;
                Ok(signature.as_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKey::P256(_) => f.write_str("PrivateKey::P256(..)"),
            PrivateKey::P384(_) => f.write_str("PrivateKey::P384(..)"),
        }
    }
}

/// A certificate, its private key and the membership it belongs to.
#[derive(Clone, Debug)]
pub struct SigningIdentity {
    /// The identity's certificate.
    pub certificate: Certificate,
    /// The key matching the certificate's public key.
    pub private_key: PrivateKey,
    /// Identifier of the membership service provider that issued it.
    pub msp_id: String,
}

impl SigningIdentity {
    /// Assemble a signing identity.
    pub fn new(certificate: Certificate, private_key: PrivateKey, msp_id: impl Into<String>) -> Self {
        Self {
            certificate,
            private_key,
            msp_id: msp_id.into(),
        }
    }

    /// Whether the private key matches the public key in the certificate.
    pub fn is_consistent(&self) -> bool {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
            == self.private_key.public_key_bytes().as_slice()
    }
}
