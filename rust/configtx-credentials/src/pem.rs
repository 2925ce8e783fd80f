//! PEM framing of certificates, revocation lists and private keys.
//!
//! Membership descriptors store every certificate and CRL as a single PEM
//! block. Parsing is lenient about surrounding whitespace and about text
//! preceding the first block; anything after the first block is ignored.

use der::{
    Decode, Encode,
    pem::{self, LineEnding},
};
use x509_cert::{Certificate, crl::CertificateList};

use crate::{CredentialError, PrivateKey};

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of an X.509 revocation list.
pub const CRL_LABEL: &str = "X509 CRL";
/// PEM label of a PKCS#8 private key.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
/// PEM label of a SEC1 elliptic curve private key.
pub const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";

const BEGIN: &[u8] = b"-----BEGIN ";
const END: &[u8] = b"-----END ";
const DASHES: &[u8] = b"-----";

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}

/// Locate the first PEM block in `bytes`.
fn first_block(bytes: &[u8]) -> Option<&[u8]> {
    let start = find(bytes, BEGIN, 0)?;
    let end = find(bytes, END, start)?;
    let close = find(bytes, DASHES, end + END.len())?;
    bytes.get(start..close + DASHES.len())
}

/// Decode the first PEM block of `bytes`, returning its label and DER body.
fn decode_block(kind: &'static str, bytes: &[u8]) -> Result<(String, Vec<u8>), CredentialError> {
    let block = first_block(bytes).ok_or_else(|| CredentialError::NoPemData {
        kind,
        bytes: bytes.to_vec(),
    })?;
    let (label, der) = pem::decode_vec(block)?;
    Ok((label.to_string(), der))
}

fn expect_label(found: String, expected: &'static str) -> Result<(), CredentialError> {
    if found == expected {
        Ok(())
    } else {
        Err(CredentialError::UnexpectedPemLabel { expected, found })
    }
}

/// Parse a PEM encoded X.509 certificate.
pub fn parse_certificate_from_bytes(bytes: &[u8]) -> Result<Certificate, CredentialError> {
    let (label, der) = decode_block("cert", bytes)?;
    expect_label(label, CERTIFICATE_LABEL)?;
    Ok(Certificate::from_der(&der)?)
}

/// Parse a PEM encoded X.509 certificate revocation list.
pub fn parse_crl(bytes: &[u8]) -> Result<CertificateList, CredentialError> {
    let (label, der) = decode_block("CRL", bytes)?;
    expect_label(label, CRL_LABEL)?;
    Ok(CertificateList::from_der(&der)?)
}

/// Parse a PEM encoded PKCS#8 or SEC1 elliptic curve private key.
pub fn parse_private_key_from_bytes(bytes: &[u8]) -> Result<PrivateKey, CredentialError> {
    let (label, der) = decode_block("private key", bytes)?;
    match label.as_str() {
        PRIVATE_KEY_LABEL => PrivateKey::from_pkcs8_der(&der),
        EC_PRIVATE_KEY_LABEL => PrivateKey::from_sec1_der(&der),
        _ => Err(CredentialError::UnexpectedPemLabel {
            expected: PRIVATE_KEY_LABEL,
            found: label,
        }),
    }
}

fn encode_block(label: &'static str, der: &[u8]) -> Result<Vec<u8>, CredentialError> {
    Ok(pem::encode_string(label, LineEnding::LF, der)?.into_bytes())
}

/// Encode a certificate as a single PEM block.
pub fn encode_certificate(certificate: &Certificate) -> Result<Vec<u8>, CredentialError> {
    encode_block(CERTIFICATE_LABEL, &certificate.to_der()?)
}

/// Encode a revocation list as a single PEM block.
pub fn encode_crl(crl: &CertificateList) -> Result<Vec<u8>, CredentialError> {
    encode_block(CRL_LABEL, &crl.to_der()?)
}
