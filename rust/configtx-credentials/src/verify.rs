//! Certificate capability and chain-of-trust checks.
//!
//! A certificate is trusted when it is itself one of the roots, or when a
//! root or a trusted intermediate whose subject names the certificate's
//! issuer has signed it. Every certificate on the chain must be inside its
//! validity period. Only ECDSA signatures over P-256 and P-384 with SHA-256
//! or SHA-384 are understood.

use std::time::SystemTime;

use const_oid::{AssociatedOid, ObjectIdentifier, db::rfc5912};
use der::Encode;
use sha2::{Digest, Sha256, Sha384};
use signature::hazmat::PrehashVerifier;
use tracing::{trace, warn};
use x509_cert::{
    Certificate,
    ext::pkix::{KeyUsage, KeyUsages},
};

use crate::CredentialError;

/// The serial number of a certificate as lowercase hex.
pub fn serial_number(certificate: &Certificate) -> String {
    certificate
        .tbs_certificate
        .serial_number
        .as_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// The decoded key usage extension of a certificate, if it carries one.
pub fn key_usage(certificate: &Certificate) -> Result<Option<KeyUsage>, CredentialError> {
    let Some(extensions) = certificate.tbs_certificate.extensions.as_ref() else {
        return Ok(None);
    };
    extensions
        .iter()
        .find(|extension| extension.extn_id == KeyUsage::OID)
        .map(|extension| {
            use der::Decode;
            KeyUsage::from_der(extension.extn_value.as_bytes()).map_err(CredentialError::from)
        })
        .transpose()
}

/// Whether the certificate is allowed to sign other certificates.
pub fn can_sign_certificates(certificate: &Certificate) -> Result<bool, CredentialError> {
    Ok(key_usage(certificate)?
        .map(|usage| usage.0.contains(KeyUsages::KeyCertSign))
        .unwrap_or(false))
}

/// Fail unless the certificate is allowed to sign other certificates.
pub fn require_certificate_signer(certificate: &Certificate) -> Result<(), CredentialError> {
    if can_sign_certificates(certificate)? {
        Ok(())
    } else {
        Err(CredentialError::NotCertificateSigner {
            serial: serial_number(certificate),
        })
    }
}

fn curve_of(issuer: &Certificate) -> Result<ObjectIdentifier, CredentialError> {
    let spki = &issuer.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != rfc5912::ID_EC_PUBLIC_KEY {
        return Err(CredentialError::UnsupportedAlgorithm(
            spki.algorithm.oid.to_string(),
        ));
    }
    spki.algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| CredentialError::UnsupportedAlgorithm("missing curve".into()))?
        .decode_as::<ObjectIdentifier>()
        .map_err(CredentialError::from)
}

fn prehash(algorithm: ObjectIdentifier, message: &[u8]) -> Result<Vec<u8>, CredentialError> {
    match algorithm {
        rfc5912::ECDSA_WITH_SHA_256 => Ok(Sha256::digest(message).to_vec()),
        rfc5912::ECDSA_WITH_SHA_384 => Ok(Sha384::digest(message).to_vec()),
        other => Err(CredentialError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Check that `issuer`'s key produced the signature on `certificate`.
pub fn verify_signed_by(
    certificate: &Certificate,
    issuer: &Certificate,
) -> Result<(), CredentialError> {
    let message = certificate.tbs_certificate.to_der()?;
    let digest = prehash(certificate.signature_algorithm.oid, &message)?;
    let signature = certificate.signature.raw_bytes();
    let public_key = issuer
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();
    let invalid = |error: signature::Error| CredentialError::InvalidSignature(error.to_string());

    match curve_of(issuer)? {
        rfc5912::SECP_256_R_1 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key).map_err(invalid)?;
            let signature = p256::ecdsa::Signature::from_der(signature).map_err(invalid)?;
            key.verify_prehash(&digest, &signature).map_err(invalid)
        }
        rfc5912::SECP_384_R_1 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(public_key).map_err(invalid)?;
            let signature = p384::ecdsa::Signature::from_der(signature).map_err(invalid)?;
            key.verify_prehash(&digest, &signature).map_err(invalid)
        }
        other => Err(CredentialError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Longest run of intermediates followed between a certificate and a root.
pub const MAX_CHAIN_DEPTH: usize = 8;

fn require_current(certificate: &Certificate, now: SystemTime) -> Result<(), CredentialError> {
    let validity = &certificate.tbs_certificate.validity;
    if now < validity.not_before.to_system_time() || now > validity.not_after.to_system_time() {
        return Err(CredentialError::Expired {
            serial: serial_number(certificate),
        });
    }
    Ok(())
}

fn chain_to_root(
    certificate: &Certificate,
    roots: &[Certificate],
    intermediates: &[Certificate],
    now: SystemTime,
    depth: usize,
) -> Result<(), CredentialError> {
    require_current(certificate, now)?;
    if roots.contains(certificate) {
        return Ok(());
    }
    if depth == MAX_CHAIN_DEPTH {
        return Err(CredentialError::UnknownAuthority);
    }

    let issuer = &certificate.tbs_certificate.issuer;
    let candidates = roots
        .iter()
        .chain(intermediates.iter().filter(|candidate| *candidate != certificate))
        .filter(|candidate| &candidate.tbs_certificate.subject == issuer);

    let mut failure = CredentialError::UnknownAuthority;
    for candidate in candidates {
        if let Err(error) = verify_signed_by(certificate, candidate) {
            trace!(
                serial = %serial_number(certificate),
                issuer = %serial_number(candidate),
                %error,
                "Candidate issuer did not verify"
            );
            continue;
        }
        match chain_to_root(candidate, roots, intermediates, now, depth + 1) {
            Ok(()) => return Ok(()),
            Err(error @ CredentialError::Expired { .. }) => failure = error,
            Err(_) => {}
        }
    }
    Err(failure)
}

/// Check that `certificate` chains to one of `roots`, possibly through
/// `intermediates`, with every certificate on the chain currently valid.
pub fn verify_chain(
    certificate: &Certificate,
    roots: &[Certificate],
    intermediates: &[Certificate],
) -> Result<(), CredentialError> {
    verify_chain_at(certificate, roots, intermediates, SystemTime::now())
}

/// Like [`verify_chain`], checking validity periods at `now`.
pub fn verify_chain_at(
    certificate: &Certificate,
    roots: &[Certificate],
    intermediates: &[Certificate],
    now: SystemTime,
) -> Result<(), CredentialError> {
    chain_to_root(certificate, roots, intermediates, now, 0).inspect_err(|error| {
        warn!(
            serial = %serial_number(certificate),
            issuer = %certificate.tbs_certificate.issuer,
            %error,
            "Certificate does not chain to a trusted root"
        )
    })
}
