//! Membership service provider descriptors.
//!
//! The descriptor of an organization is stored under its `MSP` value with
//! every certificate and revocation list as a PEM block. [`Msp`] is its
//! parsed form. [`MspGroup`] edits it in place: each operation parses the
//! stored descriptor, applies one change and writes the result back through
//! the generic value path, or leaves the value untouched when the change is
//! rejected or changes nothing.

use configtx_credentials::{
    Certificate, CertificateList, CredentialError, SigningIdentity, create_crl, encode_certificate,
    encode_crl, parse_certificate_from_bytes, parse_crl, require_certificate_signer, verify_chain,
};
use configtx_tree::ConfigGroup;
use serde_bytes::ByteBuf;
use tracing::{debug, warn};

use crate::{
    ConfigTxError, MSP_KEY,
    payload::{CryptoConfig, MspConfig, NodeOusConfig, OuIdentifierConfig},
    value::{read_value, write_value},
};

/// An organizational unit, optionally pinned to a certificate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OuIdentifier {
    /// Certificate of the CA the unit is bound to, if any.
    pub certificate: Option<Certificate>,
    /// Name of the unit.
    pub organizational_unit_identifier: String,
}

/// Classification of identities into node roles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeOus {
    /// Whether classification is enforced.
    pub enable: bool,
    /// Unit of client identities.
    pub client_ou_identifier: OuIdentifier,
    /// Unit of peer identities.
    pub peer_ou_identifier: OuIdentifier,
    /// Unit of admin identities.
    pub admin_ou_identifier: OuIdentifier,
    /// Unit of orderer identities.
    pub orderer_ou_identifier: OuIdentifier,
}

/// A parsed membership service provider descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Msp {
    /// The MSP identifier.
    pub name: String,
    /// Root CA certificates.
    pub root_certs: Vec<Certificate>,
    /// Intermediate CA certificates.
    pub intermediate_certs: Vec<Certificate>,
    /// Administrator certificates.
    pub admins: Vec<Certificate>,
    /// Certificate revocation lists.
    pub revocation_list: Vec<CertificateList>,
    /// Recognized organizational units.
    pub organizational_unit_identifiers: Vec<OuIdentifier>,
    /// Hash function configuration.
    pub crypto_config: CryptoConfig,
    /// TLS root CA certificates.
    pub tls_root_certs: Vec<Certificate>,
    /// TLS intermediate CA certificates.
    pub tls_intermediate_certs: Vec<Certificate>,
    /// Node classification.
    pub node_ous: NodeOus,
}

fn parse_certificates(field: &str, pems: &[ByteBuf]) -> Result<Vec<Certificate>, ConfigTxError> {
    pems.iter()
        .map(|pem| parse_certificate_from_bytes(pem))
        .collect::<Result<_, _>>()
        .map_err(|error| ConfigTxError::malformed(format!("parsing {field}"), error))
}

fn parse_ou_identifier(
    field: &str,
    config: Option<&OuIdentifierConfig>,
) -> Result<OuIdentifier, ConfigTxError> {
    let Some(config) = config else {
        return Ok(OuIdentifier::default());
    };
    let certificate = if config.certificate.is_empty() {
        None
    } else {
        Some(
            parse_certificate_from_bytes(&config.certificate)
                .map_err(|error| ConfigTxError::malformed(format!("parsing {field}"), error))?,
        )
    };
    Ok(OuIdentifier {
        certificate,
        organizational_unit_identifier: config.organizational_unit_identifier.clone(),
    })
}

fn encode_certificates(
    field: &str,
    certificates: &[Certificate],
) -> Result<Vec<ByteBuf>, ConfigTxError> {
    certificates
        .iter()
        .map(|certificate| encode_certificate(certificate).map(ByteBuf::from))
        .collect::<Result<_, _>>()
        .map_err(|error| ConfigTxError::malformed(format!("encoding {field}"), error))
}

fn encode_ou_identifier(
    field: &str,
    identifier: &OuIdentifier,
) -> Result<OuIdentifierConfig, ConfigTxError> {
    let certificate = identifier
        .certificate
        .as_ref()
        .map(encode_certificate)
        .transpose()
        .map_err(|error| ConfigTxError::malformed(format!("encoding {field}"), error))?
        .unwrap_or_default();
    Ok(OuIdentifierConfig {
        certificate: ByteBuf::from(certificate),
        organizational_unit_identifier: identifier.organizational_unit_identifier.clone(),
    })
}

impl Msp {
    /// Parse a stored descriptor, naming the field that failed.
    pub fn from_config(config: &MspConfig) -> Result<Self, ConfigTxError> {
        let revocation_list = config
            .revocation_list
            .iter()
            .map(|pem| parse_crl(pem))
            .collect::<Result<_, _>>()
            .map_err(|error| ConfigTxError::malformed("parsing crls", error))?;

        let organizational_unit_identifiers = config
            .organizational_unit_identifiers
            .iter()
            .map(|identifier| parse_ou_identifier("ou identifiers", Some(identifier)))
            .collect::<Result<_, _>>()?;

        let node_ous = config.node_ous.clone().unwrap_or_default();

        Ok(Msp {
            name: config.name.clone(),
            root_certs: parse_certificates("root certs", &config.root_certs)?,
            intermediate_certs: parse_certificates("intermediate certs", &config.intermediate_certs)?,
            admins: parse_certificates("admin certs", &config.admins)?,
            revocation_list,
            organizational_unit_identifiers,
            crypto_config: config.crypto_config.clone().unwrap_or_default(),
            tls_root_certs: parse_certificates("tls root certs", &config.tls_root_certs)?,
            tls_intermediate_certs: parse_certificates(
                "tls intermediate certs",
                &config.tls_intermediate_certs,
            )?,
            node_ous: NodeOus {
                enable: node_ous.enable,
                client_ou_identifier: parse_ou_identifier(
                    "client ou identifier cert",
                    node_ous.client_ou_identifier.as_ref(),
                )?,
                peer_ou_identifier: parse_ou_identifier(
                    "peer ou identifier cert",
                    node_ous.peer_ou_identifier.as_ref(),
                )?,
                admin_ou_identifier: parse_ou_identifier(
                    "admin ou identifier cert",
                    node_ous.admin_ou_identifier.as_ref(),
                )?,
                orderer_ou_identifier: parse_ou_identifier(
                    "orderer ou identifier cert",
                    node_ous.orderer_ou_identifier.as_ref(),
                )?,
            },
        })
    }

    /// Encode this descriptor for storage.
    pub fn to_config(&self) -> Result<MspConfig, ConfigTxError> {
        let revocation_list = self
            .revocation_list
            .iter()
            .map(|crl| encode_crl(crl).map(ByteBuf::from))
            .collect::<Result<_, _>>()
            .map_err(|error| ConfigTxError::malformed("encoding crls", error))?;

        let organizational_unit_identifiers = self
            .organizational_unit_identifiers
            .iter()
            .map(|identifier| encode_ou_identifier("ou identifiers", identifier))
            .collect::<Result<_, _>>()?;

        let node_ous = &self.node_ous;

        Ok(MspConfig {
            name: self.name.clone(),
            root_certs: encode_certificates("root certs", &self.root_certs)?,
            intermediate_certs: encode_certificates("intermediate certs", &self.intermediate_certs)?,
            admins: encode_certificates("admin certs", &self.admins)?,
            revocation_list,
            organizational_unit_identifiers,
            crypto_config: Some(self.crypto_config.clone()),
            tls_root_certs: encode_certificates("tls root certs", &self.tls_root_certs)?,
            tls_intermediate_certs: encode_certificates(
                "tls intermediate certs",
                &self.tls_intermediate_certs,
            )?,
            node_ous: Some(NodeOusConfig {
                enable: node_ous.enable,
                client_ou_identifier: Some(encode_ou_identifier(
                    "client ou identifier cert",
                    &node_ous.client_ou_identifier,
                )?),
                peer_ou_identifier: Some(encode_ou_identifier(
                    "peer ou identifier cert",
                    &node_ous.peer_ou_identifier,
                )?),
                admin_ou_identifier: Some(encode_ou_identifier(
                    "admin ou identifier cert",
                    &node_ous.admin_ou_identifier,
                )?),
                orderer_ou_identifier: Some(encode_ou_identifier(
                    "orderer ou identifier cert",
                    &node_ous.orderer_ou_identifier,
                )?),
            }),
        })
    }

    /// Build a revocation list for `certificates`, signed by an identity of
    /// this MSP.
    ///
    /// The identity must belong to this MSP, its certificate must be one of
    /// the MSP's root or intermediate certificates, and its private key must
    /// match that certificate.
    pub fn create_msp_crl(
        &self,
        signing_identity: &SigningIdentity,
        certificates: &[Certificate],
    ) -> Result<CertificateList, ConfigTxError> {
        if signing_identity.msp_id != self.name {
            return Err(ConfigTxError::InvalidArgument(format!(
                "signing identity MSP ID '{}' does not match MSP ID '{}'",
                signing_identity.msp_id, self.name
            )));
        }

        let issuer = &signing_identity.certificate;
        if !self.root_certs.contains(issuer) && !self.intermediate_certs.contains(issuer) {
            return Err(ConfigTxError::InvalidArgument(
                "signing identity's certificate is not a root or intermediate certificate for this MSP"
                    .into(),
            ));
        }

        create_crl(signing_identity, certificates)
            .map_err(|error| ConfigTxError::InvalidArgument(format!("creating crl: {error}")))
    }

    /// Check that every intermediate chains to a root and every TLS
    /// intermediate chains to a TLS root. Chains may pass through other
    /// intermediates of the same kind.
    fn verify_intermediates(&self) -> Result<(), CredentialError> {
        for intermediate in &self.intermediate_certs {
            verify_chain(intermediate, &self.root_certs, &self.intermediate_certs)?;
        }
        for intermediate in &self.tls_intermediate_certs {
            verify_chain(
                intermediate,
                &self.tls_root_certs,
                &self.tls_intermediate_certs,
            )?;
        }
        Ok(())
    }
}

fn add_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

fn remove_all<T: PartialEq>(items: &mut Vec<T>, item: &T) -> bool {
    let before = items.len();
    items.retain(|candidate| candidate != item);
    items.len() != before
}

fn require_signer(kind: &str, certificate: &Certificate) -> Result<(), ConfigTxError> {
    require_certificate_signer(certificate)
        .map_err(|error| ConfigTxError::InvalidArgument(format!("invalid {kind} cert: {error}")))
}

/// Parse the descriptor stored in an organization's group.
pub(crate) fn read_msp(organization: &str, group: &ConfigGroup) -> Result<Msp, ConfigTxError> {
    let config = read_value::<MspConfig>(group)
        .map_err(|error| ConfigTxError::malformed(format!("retrieving msp of {organization}"), error))?
        .ok_or_else(|| ConfigTxError::missing_value(MSP_KEY))?;
    Msp::from_config(&config)
}

/// The membership descriptor of one organization.
pub struct MspGroup<'a> {
    organization: String,
    group: &'a mut ConfigGroup,
}

impl<'a> MspGroup<'a> {
    pub(crate) fn new(organization: &str, group: &'a mut ConfigGroup) -> Self {
        Self {
            organization: organization.to_string(),
            group,
        }
    }

    /// The parsed descriptor.
    pub fn configuration(&self) -> Result<Msp, ConfigTxError> {
        read_msp(&self.organization, self.group)
    }

    /// Parse the descriptor, apply `change` and store the result when the
    /// change reports that it modified something.
    fn update<F>(&mut self, operation: &str, change: F) -> Result<(), ConfigTxError>
    where
        F: FnOnce(&mut Msp) -> Result<bool, ConfigTxError>,
    {
        let mut msp = self.configuration()?;
        if !change(&mut msp)? {
            debug!(organization = %self.organization, operation, "MSP unchanged");
            return Ok(());
        }
        write_value(self.group, &msp.to_config()?)?;
        debug!(organization = %self.organization, operation, "Updated MSP");
        Ok(())
    }

    /// Add an administrator certificate.
    pub fn add_admin_cert(&mut self, certificate: Certificate) -> Result<(), ConfigTxError> {
        self.update("add admin cert", |msp| {
            Ok(add_unique(&mut msp.admins, certificate))
        })
    }

    /// Remove an administrator certificate.
    pub fn remove_admin_cert(&mut self, certificate: &Certificate) -> Result<(), ConfigTxError> {
        self.update("remove admin cert", |msp| {
            Ok(remove_all(&mut msp.admins, certificate))
        })
    }

    /// Add a root CA certificate. It must be allowed to sign certificates.
    pub fn add_root_cert(&mut self, certificate: Certificate) -> Result<(), ConfigTxError> {
        self.update("add root cert", |msp| {
            require_signer("root", &certificate)?;
            Ok(add_unique(&mut msp.root_certs, certificate))
        })
    }

    /// Remove a root CA certificate.
    ///
    /// Fails when a remaining intermediate would no longer chain to a
    /// remaining root.
    pub fn remove_root_cert(&mut self, certificate: &Certificate) -> Result<(), ConfigTxError> {
        let organization = self.organization.clone();
        self.update("remove root cert", |msp| {
            if !remove_all(&mut msp.root_certs, certificate) {
                return Ok(false);
            }
            msp.verify_intermediates().map_err(|error| {
                warn!(%organization, %error, "Refusing to remove root certificate");
                ConfigTxError::IntegrityViolation(error)
            })?;
            Ok(true)
        })
    }

    /// Add an intermediate CA certificate. It must be allowed to sign
    /// certificates.
    pub fn add_intermediate_cert(&mut self, certificate: Certificate) -> Result<(), ConfigTxError> {
        self.update("add intermediate cert", |msp| {
            require_signer("intermediate", &certificate)?;
            Ok(add_unique(&mut msp.intermediate_certs, certificate))
        })
    }

    /// Remove an intermediate CA certificate.
    pub fn remove_intermediate_cert(
        &mut self,
        certificate: &Certificate,
    ) -> Result<(), ConfigTxError> {
        self.update("remove intermediate cert", |msp| {
            Ok(remove_all(&mut msp.intermediate_certs, certificate))
        })
    }

    /// Add a TLS root CA certificate. It must be allowed to sign
    /// certificates.
    pub fn add_tls_root_cert(&mut self, certificate: Certificate) -> Result<(), ConfigTxError> {
        self.update("add tls root cert", |msp| {
            require_signer("tls root", &certificate)?;
            Ok(add_unique(&mut msp.tls_root_certs, certificate))
        })
    }

    /// Remove a TLS root CA certificate.
    ///
    /// Fails when a remaining TLS intermediate would no longer chain to a
    /// remaining TLS root.
    pub fn remove_tls_root_cert(&mut self, certificate: &Certificate) -> Result<(), ConfigTxError> {
        let organization = self.organization.clone();
        self.update("remove tls root cert", |msp| {
            if !remove_all(&mut msp.tls_root_certs, certificate) {
                return Ok(false);
            }
            msp.verify_intermediates().map_err(|error| {
                warn!(%organization, %error, "Refusing to remove TLS root certificate");
                ConfigTxError::IntegrityViolation(error)
            })?;
            Ok(true)
        })
    }

    /// Add a TLS intermediate CA certificate. It must be allowed to sign
    /// certificates.
    pub fn add_tls_intermediate_cert(
        &mut self,
        certificate: Certificate,
    ) -> Result<(), ConfigTxError> {
        self.update("add tls intermediate cert", |msp| {
            require_signer("tls intermediate", &certificate)?;
            Ok(add_unique(&mut msp.tls_intermediate_certs, certificate))
        })
    }

    /// Remove a TLS intermediate CA certificate.
    pub fn remove_tls_intermediate_cert(
        &mut self,
        certificate: &Certificate,
    ) -> Result<(), ConfigTxError> {
        self.update("remove tls intermediate cert", |msp| {
            Ok(remove_all(&mut msp.tls_intermediate_certs, certificate))
        })
    }

    /// Add an organizational unit.
    pub fn add_ou_identifier(&mut self, identifier: OuIdentifier) -> Result<(), ConfigTxError> {
        self.update("add ou identifier", |msp| {
            Ok(add_unique(
                &mut msp.organizational_unit_identifiers,
                identifier,
            ))
        })
    }

    /// Remove an organizational unit.
    pub fn remove_ou_identifier(&mut self, identifier: &OuIdentifier) -> Result<(), ConfigTxError> {
        self.update("remove ou identifier", |msp| {
            Ok(remove_all(
                &mut msp.organizational_unit_identifiers,
                identifier,
            ))
        })
    }

    /// Replace the hash function configuration.
    pub fn set_crypto_config(&mut self, crypto_config: CryptoConfig) -> Result<(), ConfigTxError> {
        self.update("set crypto config", |msp| {
            if msp.crypto_config == crypto_config {
                return Ok(false);
            }
            msp.crypto_config = crypto_config;
            Ok(true)
        })
    }

    fn set_node_ou(
        &mut self,
        operation: &str,
        identifier: OuIdentifier,
        slot: fn(&mut NodeOus) -> &mut OuIdentifier,
    ) -> Result<(), ConfigTxError> {
        self.update(operation, |msp| {
            let current = slot(&mut msp.node_ous);
            if *current == identifier {
                return Ok(false);
            }
            *current = identifier;
            Ok(true)
        })
    }

    /// Replace the unit that classifies client identities.
    pub fn set_client_ou_identifier(
        &mut self,
        identifier: OuIdentifier,
    ) -> Result<(), ConfigTxError> {
        self.set_node_ou("set client ou identifier", identifier, |node_ous| {
            &mut node_ous.client_ou_identifier
        })
    }

    /// Replace the unit that classifies peer identities.
    pub fn set_peer_ou_identifier(&mut self, identifier: OuIdentifier) -> Result<(), ConfigTxError> {
        self.set_node_ou("set peer ou identifier", identifier, |node_ous| {
            &mut node_ous.peer_ou_identifier
        })
    }

    /// Replace the unit that classifies admin identities.
    pub fn set_admin_ou_identifier(
        &mut self,
        identifier: OuIdentifier,
    ) -> Result<(), ConfigTxError> {
        self.set_node_ou("set admin ou identifier", identifier, |node_ous| {
            &mut node_ous.admin_ou_identifier
        })
    }

    /// Replace the unit that classifies orderer identities.
    pub fn set_orderer_ou_identifier(
        &mut self,
        identifier: OuIdentifier,
    ) -> Result<(), ConfigTxError> {
        self.set_node_ou("set orderer ou identifier", identifier, |node_ous| {
            &mut node_ous.orderer_ou_identifier
        })
    }

    /// Turn node classification on or off.
    pub fn set_enable_node_ous(&mut self, enable: bool) -> Result<(), ConfigTxError> {
        self.update("set enable node ous", |msp| {
            if msp.node_ous.enable == enable {
                return Ok(false);
            }
            msp.node_ous.enable = enable;
            Ok(true)
        })
    }

    /// Build a revocation list signed by an identity of this MSP.
    ///
    /// See [`Msp::create_msp_crl`].
    pub fn create_msp_crl(
        &self,
        signing_identity: &SigningIdentity,
        certificates: &[Certificate],
    ) -> Result<CertificateList, ConfigTxError> {
        self.configuration()?
            .create_msp_crl(signing_identity, certificates)
    }

    /// Append a revocation list.
    pub fn add_crl(&mut self, crl: CertificateList) -> Result<(), ConfigTxError> {
        self.update("add crl", |msp| Ok(add_unique(&mut msp.revocation_list, crl)))
    }

    /// Create a revocation list for `certificates` signed by
    /// `signing_identity` and append it.
    pub fn add_crl_from_signing_identity(
        &mut self,
        signing_identity: &SigningIdentity,
        certificates: &[Certificate],
    ) -> Result<(), ConfigTxError> {
        self.update("add crl from signing identity", |msp| {
            let crl = msp.create_msp_crl(signing_identity, certificates)?;
            msp.revocation_list.push(crl);
            Ok(true)
        })
    }
}
