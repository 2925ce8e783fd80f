//! X.509 membership material for channel configuration.
//!
//! Membership descriptors carry certificates and revocation lists as PEM
//! blocks. This crate parses and re-encodes them ([`parse_certificate_from_bytes`],
//! [`parse_crl`], [`parse_private_key_from_bytes`]), answers the questions
//! configuration mutators need to ask of them ([`can_sign_certificates`],
//! [`verify_chain`]) and issues revocation lists signed by a
//! [`SigningIdentity`] ([`create_crl`]).
//!
//! Supported keys are ECDSA over NIST P-256 and P-384.
//!
//! Test certificate generation is available behind the `helpers` feature.

mod error;
pub use error::*;

mod key;
pub use key::*;

mod pem;
pub use pem::*;

mod verify;
pub use verify::*;

mod crl;
pub use crl::*;

pub use x509_cert::{Certificate, crl::CertificateList};

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
