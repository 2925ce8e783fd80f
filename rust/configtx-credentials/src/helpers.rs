use anyhow::Result;
use der::Decode;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber, date_time_ymd,
};
use x509_cert::{Certificate, crl::CertificateList};

use crate::{PrivateKey, SigningIdentity, create_crl, encode_certificate};

/// A certificate authority with its key, for generating test material.
pub struct TestAuthority {
    certificate: Certificate,
    private_key: PrivateKey,
    issuer: rcgen::Certificate,
    key_pair: KeyPair,
}

fn params(common_name: &str, serial: u8, is_ca: bool) -> Result<CertificateParams> {
    let mut params = CertificateParams::new(Vec::<String>::new())?;
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    params.distinguished_name = name;
    params.serial_number = Some(SerialNumber::from_slice(&[serial]));
    if is_ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
    } else {
        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    }
    Ok(params)
}

fn convert(certificate: &rcgen::Certificate) -> Result<Certificate> {
    Ok(Certificate::from_der(certificate.der())?)
}

impl TestAuthority {
    /// A self-signed root authority. Serials must stay below 0x80.
    pub fn root(common_name: &str, serial: u8) -> Result<Self> {
        let key_pair = KeyPair::generate()?;
        let issuer = params(common_name, serial, true)?.self_signed(&key_pair)?;
        Ok(Self {
            certificate: convert(&issuer)?,
            private_key: PrivateKey::from_pkcs8_der(&key_pair.serialize_der())?,
            issuer,
            key_pair,
        })
    }

    /// An intermediate authority signed by this one.
    pub fn intermediate(&self, common_name: &str, serial: u8) -> Result<Self> {
        self.issue(params(common_name, serial, true)?)
    }

    /// An intermediate authority signed by this one that was valid only
    /// during the year 2000.
    pub fn expired_intermediate(&self, common_name: &str, serial: u8) -> Result<Self> {
        let mut params = params(common_name, serial, true)?;
        params.not_before = date_time_ymd(2000, 1, 1);
        params.not_after = date_time_ymd(2001, 1, 1);
        self.issue(params)
    }

    fn issue(&self, params: CertificateParams) -> Result<Self> {
        let key_pair = KeyPair::generate()?;
        let issuer = params.signed_by(&key_pair, &self.issuer, &self.key_pair)?;
        Ok(Self {
            certificate: convert(&issuer)?,
            private_key: PrivateKey::from_pkcs8_der(&key_pair.serialize_der())?,
            issuer,
            key_pair,
        })
    }

    /// An end-entity certificate signed by this authority. It cannot sign
    /// certificates.
    pub fn leaf(&self, common_name: &str, serial: u8) -> Result<Certificate> {
        let key_pair = KeyPair::generate()?;
        let leaf = params(common_name, serial, false)?.signed_by(
            &key_pair,
            &self.issuer,
            &self.key_pair,
        )?;
        convert(&leaf)
    }

    /// The authority's certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The authority's certificate as PEM.
    pub fn certificate_pem(&self) -> Result<Vec<u8>> {
        Ok(encode_certificate(&self.certificate)?)
    }

    /// The authority's private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The authority's private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> Vec<u8> {
        self.key_pair.serialize_pem().into_bytes()
    }

    /// A signing identity for this authority within `msp_id`.
    pub fn signing_identity(&self, msp_id: &str) -> SigningIdentity {
        SigningIdentity::new(self.certificate.clone(), self.private_key.clone(), msp_id)
    }

    /// A revocation list issued by this authority.
    pub fn revoke(&self, certificates: &[Certificate]) -> Result<CertificateList> {
        Ok(create_crl(&self.signing_identity("helpers"), certificates)?)
    }
}
