//! Construction of signed certificate revocation lists.

use std::time::{Duration, SystemTime};

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{BitString, OctetString, UtcTime},
};
use tracing::debug;
use x509_cert::{
    Certificate, Version,
    crl::{CertificateList, RevokedCert, TbsCertList},
    ext::{
        Extension,
        pkix::{AuthorityKeyIdentifier, SubjectKeyIdentifier},
    },
    spki::AlgorithmIdentifierOwned,
    time::Time,
};

use crate::{CredentialError, SigningIdentity, serial_number};

/// How long a freshly created revocation list remains current.
pub const CRL_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn subject_key_identifier(certificate: &Certificate) -> Result<Option<OctetString>, CredentialError> {
    let Some(extensions) = certificate.tbs_certificate.extensions.as_ref() else {
        return Ok(None);
    };
    extensions
        .iter()
        .find(|extension| extension.extn_id == SubjectKeyIdentifier::OID)
        .map(|extension| {
            SubjectKeyIdentifier::from_der(extension.extn_value.as_bytes())
                .map(|identifier| identifier.0)
                .map_err(CredentialError::from)
        })
        .transpose()
}

fn authority_key_identifier(signer: &Certificate) -> Result<Option<Extension>, CredentialError> {
    let Some(key_identifier) = subject_key_identifier(signer)? else {
        return Ok(None);
    };
    let extension = AuthorityKeyIdentifier {
        key_identifier: Some(key_identifier),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    Ok(Some(Extension {
        extn_id: AuthorityKeyIdentifier::OID,
        critical: false,
        extn_value: OctetString::new(extension.to_der()?)?,
    }))
}

/// Build and sign a revocation list revoking `revoked`, issued by `signer`.
///
/// The list is current from now for [`CRL_VALIDITY`]. Every entry carries
/// the same revocation time.
pub fn create_crl(
    signer: &SigningIdentity,
    revoked: &[Certificate],
) -> Result<CertificateList, CredentialError> {
    create_crl_at(signer, revoked, SystemTime::now())
}

/// Like [`create_crl`], with an explicit issuance time.
///
/// Fails when the signer's private key does not belong to its certificate.
pub fn create_crl_at(
    signer: &SigningIdentity,
    revoked: &[Certificate],
    now: SystemTime,
) -> Result<CertificateList, CredentialError> {
    if !signer.is_consistent() {
        return Err(CredentialError::KeyMismatch {
            serial: serial_number(&signer.certificate),
        });
    }

    let this_update = Time::UtcTime(UtcTime::from_system_time(now)?);
    let next_update = Time::UtcTime(UtcTime::from_system_time(now + CRL_VALIDITY)?);

    let revoked_certificates = revoked
        .iter()
        .map(|certificate| RevokedCert {
            serial_number: certificate.tbs_certificate.serial_number.clone(),
            revocation_date: this_update,
            crl_entry_extensions: None,
        })
        .collect::<Vec<_>>();

    let algorithm = AlgorithmIdentifierOwned {
        oid: signer.private_key.signature_algorithm(),
        parameters: None,
    };

    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: algorithm.clone(),
        issuer: signer.certificate.tbs_certificate.subject.clone(),
        this_update,
        next_update: Some(next_update),
        revoked_certificates: (!revoked_certificates.is_empty()).then_some(revoked_certificates),
        crl_extensions: authority_key_identifier(&signer.certificate)?.map(|extension| vec![extension]),
    };

    let signature = signer.private_key.sign(&tbs_cert_list.to_der()?)?;

    debug!(
        msp = %signer.msp_id,
        revoked = revoked.len(),
        "Signed certificate revocation list"
    );

    Ok(CertificateList {
        tbs_cert_list,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestAuthority;
    use testresult::TestResult;

    #[test_log::test]
    fn it_lists_every_revoked_serial() -> TestResult {
        let authority = TestAuthority::root("Org1 CA", 1)?;
        let first = authority.leaf("peer0.org1", 10)?;
        let second = authority.leaf("peer1.org1", 11)?;

        let crl = create_crl(&authority.signing_identity("Org1MSP"), &[first, second])?;
        let serials = crl
            .tbs_cert_list
            .revoked_certificates
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.serial_number.as_bytes().to_vec())
            .collect::<Vec<_>>();

        assert_eq!(serials, vec![vec![10], vec![11]]);
        assert_eq!(
            crl.tbs_cert_list.issuer,
            authority.certificate().tbs_certificate.subject
        );
        Ok(())
    }

    #[test]
    fn it_refuses_a_key_that_does_not_match_the_certificate() -> TestResult {
        let authority = TestAuthority::root("Org1 CA", 1)?;
        let other = TestAuthority::root("Org2 CA", 2)?;
        let signer = SigningIdentity::new(
            authority.certificate().clone(),
            other.private_key().clone(),
            "Org1MSP",
        );

        assert_eq!(
            create_crl(&signer, &[]).unwrap_err(),
            CredentialError::KeyMismatch {
                serial: "01".into()
            }
        );
        Ok(())
    }

    #[test]
    fn it_is_current_for_a_year() -> TestResult {
        let authority = TestAuthority::root("Org1 CA", 1)?;
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let crl = create_crl_at(&authority.signing_identity("Org1MSP"), &[], now)?;
        let next_update = crl
            .tbs_cert_list
            .next_update
            .map(|time| time.to_system_time());

        assert_eq!(crl.tbs_cert_list.this_update.to_system_time(), now);
        assert_eq!(next_update, Some(now + CRL_VALIDITY));
        assert!(crl.tbs_cert_list.revoked_certificates.is_none());
        Ok(())
    }

    #[test]
    fn it_carries_the_signer_key_identifier() -> TestResult {
        let authority = TestAuthority::root("Org1 CA", 1)?;
        let crl = create_crl(&authority.signing_identity("Org1MSP"), &[])?;

        let extensions = crl.tbs_cert_list.crl_extensions.unwrap_or_default();
        let aki = extensions
            .iter()
            .find(|extension| extension.extn_id == AuthorityKeyIdentifier::OID)
            .map(|extension| AuthorityKeyIdentifier::from_der(extension.extn_value.as_bytes()))
            .transpose()?;

        assert_eq!(
            aki.and_then(|aki| aki.key_identifier),
            subject_key_identifier(authority.certificate())?
        );
        Ok(())
    }
}
