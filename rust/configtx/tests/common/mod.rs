#![allow(dead_code)]

use std::collections::BTreeMap;

use anyhow::Result;
use configtx::{
    APPLICATION_GROUP_KEY, BatchSize, Config, ConfigGroup, ConfigTx, CryptoConfig, Msp,
    ORDERER_GROUP_KEY, Organization, Policy, PolicyScope,
    payload::{ConfigPayload, MspConfig},
};
use configtx_credentials::TestAuthority;

pub const ORG1: &str = "Org1";
pub const ORG1_MSP: &str = "Org1MSP";
pub const ORDERER_ORG: &str = "OrdererOrg";
pub const ORDERER_MSP: &str = "OrdererMSP";

pub fn standard_policies() -> BTreeMap<String, Policy> {
    BTreeMap::from([
        ("Readers".to_string(), Policy::implicit_meta("ANY Readers")),
        ("Writers".to_string(), Policy::implicit_meta("ANY Writers")),
        ("Admins".to_string(), Policy::implicit_meta("MAJORITY Admins")),
    ])
}

pub fn msp(name: &str, authority: &TestAuthority) -> Msp {
    Msp {
        name: name.to_string(),
        root_certs: vec![authority.certificate().clone()],
        admins: vec![authority.certificate().clone()],
        tls_root_certs: vec![authority.certificate().clone()],
        crypto_config: CryptoConfig {
            signature_hash_family: "SHA2".into(),
            identity_identifier_hash_function: "SHA256".into(),
        },
        ..Default::default()
    }
}

pub fn organization(name: &str, msp_id: &str, authority: &TestAuthority) -> Organization {
    Organization {
        name: name.to_string(),
        policies: standard_policies(),
        msp: msp(msp_id, authority),
    }
}

/// Certificate authorities of the organizations in [`channel`].
pub struct Authorities {
    pub org1: TestAuthority,
    pub orderer: TestAuthority,
}

/// A channel with one application organization and one ordering
/// organization, each with the standard policies and an MSP, ordered by
/// `etcdraft`.
pub fn channel() -> Result<(Config, Authorities)> {
    let authorities = Authorities {
        org1: TestAuthority::root("Org1 CA", 1)?,
        orderer: TestAuthority::root("Orderer CA", 2)?,
    };

    let root = ConfigGroup::new("Admins")
        .with_group(APPLICATION_GROUP_KEY, ConfigGroup::new("Admins"))
        .with_group(ORDERER_GROUP_KEY, ConfigGroup::new("Admins"));
    let mut builder = ConfigTx::new(Config::new(root));

    builder.channel().set_policies(standard_policies())?;

    let mut application = builder.application()?;
    application.set_policies(standard_policies())?;
    application.set_organization(&organization(ORG1, ORG1_MSP, &authorities.org1))?;

    let mut orderer = builder.orderer()?;
    orderer.set_policies(standard_policies())?;
    orderer.set_consensus_type("etcdraft")?;
    orderer.set_batch_size(BatchSize {
        max_message_count: 500,
        absolute_max_bytes: 10 * 1024 * 1024,
        preferred_max_bytes: 2 * 1024 * 1024,
    })?;
    orderer.set_batch_timeout("2s")?;
    orderer.set_organization(&organization(ORDERER_ORG, ORDERER_MSP, &authorities.orderer))?;

    Ok((builder.updated().clone(), authorities))
}

pub fn open() -> Result<(ConfigTx, Authorities)> {
    let (config, authorities) = channel()?;
    Ok((ConfigTx::new(config), authorities))
}

pub fn stored_msp(config: &Config, group: &str, organization: &str) -> Result<MspConfig> {
    let value = &config.channel_group.groups[group].groups[organization].values["MSP"];
    Ok(MspConfig::decode(&value.value)?)
}
