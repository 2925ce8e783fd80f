mod common;

use anyhow::{Result, anyhow};
use configtx::{
    APPLICATION_GROUP_KEY, Config, ConfigGroup, ConfigTx, ConfigTxError, CryptoConfig, ErrorKind,
    MspGroup, OuIdentifier,
    payload::{ConfigPayload, MspConfig},
};
use configtx_credentials::{SigningIdentity, TestAuthority, serial_number};
use pretty_assertions::assert_eq;
use serde_bytes::ByteBuf;

/// Run `operation` against the MSP of `Org1`.
fn org1_msp<T>(
    tx: &mut ConfigTx,
    operation: impl FnOnce(&mut MspGroup<'_>) -> Result<T, ConfigTxError>,
) -> Result<T> {
    let mut application = tx.application()?;
    let mut organization = application
        .organization(common::ORG1)
        .ok_or_else(|| anyhow!("missing {}", common::ORG1))?;
    Ok(operation(&mut organization.msp())?)
}

fn msp_version(tx: &ConfigTx) -> u64 {
    tx.updated().channel_group.groups[APPLICATION_GROUP_KEY].groups[common::ORG1].values["MSP"]
        .version
}

#[test_log::test]
fn it_reads_the_membership_descriptor() -> Result<()> {
    let (mut tx, authorities) = common::open()?;

    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;

    assert_eq!(msp.name, common::ORG1_MSP);
    assert_eq!(msp.root_certs, vec![authorities.org1.certificate().clone()]);
    assert_eq!(msp.crypto_config.signature_hash_family, "SHA2");
    assert!(msp.intermediate_certs.is_empty());
    Ok(())
}

#[test_log::test]
fn it_refuses_to_orphan_an_intermediate() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let intermediate = authorities.org1.intermediate("Org1 ICA", 10)?;
    org1_msp(&mut tx, |msp| {
        msp.add_intermediate_cert(intermediate.certificate().clone())
    })?;
    let before = tx.updated().clone();

    let error = org1_msp(&mut tx, |msp| {
        Ok(msp
            .remove_root_cert(authorities.org1.certificate())
            .unwrap_err())
    })?;

    assert_eq!(error.kind(), ErrorKind::IntegrityViolation);
    assert_eq!(
        error.to_string(),
        "x509: certificate signed by unknown authority"
    );
    assert_eq!(tx.updated(), &before);
    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert!(msp.root_certs.contains(authorities.org1.certificate()));
    Ok(())
}

#[test_log::test]
fn it_removes_a_root_no_intermediate_depends_on() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let second = TestAuthority::root("Org1 CA 2", 20)?;
    let intermediate = second.intermediate("Org1 ICA 2", 21)?;

    org1_msp(&mut tx, |msp| {
        msp.add_root_cert(second.certificate().clone())?;
        msp.add_intermediate_cert(intermediate.certificate().clone())?;
        msp.remove_root_cert(authorities.org1.certificate())
    })?;

    let stored = common::stored_msp(tx.updated(), APPLICATION_GROUP_KEY, common::ORG1)?;
    assert_eq!(stored.root_certs.len(), 1);
    assert_eq!(stored.intermediate_certs.len(), 1);
    Ok(())
}

#[test_log::test]
fn it_follows_nested_intermediates_when_removing_a_root() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let first = authorities.org1.intermediate("Org1 ICA 1", 22)?;
    let second = first.intermediate("Org1 ICA 2", 23)?;
    let unrelated = TestAuthority::root("Unrelated CA", 24)?;

    org1_msp(&mut tx, |msp| {
        msp.add_root_cert(unrelated.certificate().clone())?;
        msp.add_intermediate_cert(first.certificate().clone())?;
        msp.add_intermediate_cert(second.certificate().clone())?;
        msp.remove_root_cert(unrelated.certificate())
    })?;

    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert_eq!(msp.root_certs, vec![authorities.org1.certificate().clone()]);
    assert_eq!(msp.intermediate_certs.len(), 2);

    let error = org1_msp(&mut tx, |msp| {
        Ok(msp
            .remove_root_cert(authorities.org1.certificate())
            .unwrap_err())
    })?;
    assert_eq!(error.kind(), ErrorKind::IntegrityViolation);
    Ok(())
}

#[test_log::test]
fn it_refuses_to_keep_an_intermediate_that_has_expired() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let second = TestAuthority::root("Org1 CA 2", 25)?;
    let expired = authorities.org1.expired_intermediate("Org1 ICA", 26)?;
    org1_msp(&mut tx, |msp| {
        msp.add_root_cert(second.certificate().clone())?;
        msp.add_intermediate_cert(expired.certificate().clone())
    })?;
    let before = tx.updated().clone();

    let error = org1_msp(&mut tx, |msp| {
        Ok(msp.remove_root_cert(second.certificate()).unwrap_err())
    })?;

    assert_eq!(error.kind(), ErrorKind::IntegrityViolation);
    assert_eq!(
        error.to_string(),
        "x509: certificate has expired or is not yet valid. serial number: 1a"
    );
    assert_eq!(tx.updated(), &before);
    Ok(())
}

#[test_log::test]
fn it_refuses_to_orphan_a_tls_intermediate() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let intermediate = authorities.org1.intermediate("Org1 TLS ICA", 11)?;
    org1_msp(&mut tx, |msp| {
        msp.add_tls_intermediate_cert(intermediate.certificate().clone())
    })?;

    let result = org1_msp(&mut tx, |msp| {
        msp.remove_tls_root_cert(authorities.org1.certificate())
    });

    let error = result.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<ConfigTxError>(),
        Some(ConfigTxError::IntegrityViolation(_))
    ));
    Ok(())
}

#[test_log::test]
fn it_rejects_a_root_that_cannot_sign_certificates() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let leaf = authorities.org1.leaf("peer0.org1", 11)?;

    let error = org1_msp(&mut tx, |msp| Ok(msp.add_root_cert(leaf.clone()).unwrap_err()))?;

    assert_eq!(
        error.to_string(),
        format!(
            "invalid root cert: KeyUsage must be KeyCertSign. serial number: {}",
            serial_number(&leaf)
        )
    );
    assert_eq!(serial_number(&leaf), "0b");
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_rejects_an_intermediate_that_cannot_sign_certificates() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let leaf = authorities.org1.leaf("peer0.org1", 12)?;

    let error = org1_msp(&mut tx, |msp| {
        Ok(msp.add_tls_intermediate_cert(leaf).unwrap_err())
    })?;

    assert!(
        error
            .to_string()
            .starts_with("invalid tls intermediate cert: KeyUsage must be KeyCertSign.")
    );
    Ok(())
}

#[test_log::test]
fn it_reports_a_missing_descriptor() -> Result<()> {
    let root = ConfigGroup::new("Admins").with_group(
        APPLICATION_GROUP_KEY,
        ConfigGroup::new("Admins").with_group(common::ORG1, ConfigGroup::new("Admins")),
    );
    let mut tx = ConfigTx::new(Config::new(root));

    let error = org1_msp(&mut tx, |msp| Ok(msp.configuration().unwrap_err()))?;

    assert_eq!(error.to_string(), "config does not contain value for MSP");
    assert_eq!(error.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test_log::test]
fn it_names_the_field_that_failed_to_parse() -> Result<()> {
    let (mut config, _) = common::channel()?;
    let broken = MspConfig {
        name: common::ORG1_MSP.into(),
        tls_root_certs: vec![ByteBuf::from(b"not a cert".to_vec())],
        ..Default::default()
    };
    config
        .channel_group
        .groups
        .get_mut(APPLICATION_GROUP_KEY)
        .and_then(|application| application.groups.get_mut(common::ORG1))
        .and_then(|organization| organization.values.get_mut("MSP"))
        .ok_or_else(|| anyhow!("missing MSP value"))?
        .value = broken.encode()?;
    let mut tx = ConfigTx::new(config);
    let admin = TestAuthority::root("Other", 30)?;

    let error = org1_msp(&mut tx, |msp| {
        Ok(msp.add_admin_cert(admin.certificate().clone()).unwrap_err())
    })?;

    let message = error.to_string();
    assert!(
        message.starts_with("parsing tls root certs: no PEM data found in cert["),
        "{message}"
    );
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_does_not_rewrite_the_descriptor_for_a_duplicate() -> Result<()> {
    let (mut tx, authorities) = common::open()?;

    org1_msp(&mut tx, |msp| {
        msp.add_admin_cert(authorities.org1.certificate().clone())?;
        msp.add_root_cert(authorities.org1.certificate().clone())
    })?;

    assert_eq!(msp_version(&tx), 0);
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_manages_admin_certificates() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let admin = authorities.org1.leaf("Admin@org1", 13)?;

    org1_msp(&mut tx, |msp| msp.add_admin_cert(admin.clone()))?;
    assert_eq!(msp_version(&tx), 1);
    assert_eq!(
        common::stored_msp(tx.updated(), APPLICATION_GROUP_KEY, common::ORG1)?
            .admins
            .len(),
        2
    );

    org1_msp(&mut tx, |msp| msp.remove_admin_cert(&admin))?;
    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert_eq!(msp.admins, vec![authorities.org1.certificate().clone()]);
    Ok(())
}

#[test_log::test]
fn it_manages_organizational_units() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let unit = OuIdentifier {
        certificate: Some(authorities.org1.certificate().clone()),
        organizational_unit_identifier: "peer".into(),
    };

    org1_msp(&mut tx, |msp| msp.add_ou_identifier(unit.clone()))?;
    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert_eq!(msp.organizational_unit_identifiers, vec![unit.clone()]);

    org1_msp(&mut tx, |msp| msp.remove_ou_identifier(&unit))?;
    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert!(msp.organizational_unit_identifiers.is_empty());
    Ok(())
}

#[test_log::test]
fn it_configures_node_classification() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let client = OuIdentifier {
        certificate: Some(authorities.org1.certificate().clone()),
        organizational_unit_identifier: "client".into(),
    };
    let orderer = OuIdentifier {
        certificate: None,
        organizational_unit_identifier: "orderer".into(),
    };

    org1_msp(&mut tx, |msp| {
        msp.set_enable_node_ous(true)?;
        msp.set_client_ou_identifier(client.clone())?;
        msp.set_orderer_ou_identifier(orderer.clone())
    })?;

    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert!(msp.node_ous.enable);
    assert_eq!(msp.node_ous.client_ou_identifier, client);
    assert_eq!(msp.node_ous.orderer_ou_identifier, orderer);
    assert_eq!(msp.node_ous.peer_ou_identifier, OuIdentifier::default());
    assert_eq!(msp_version(&tx), 1);
    Ok(())
}

#[test_log::test]
fn it_replaces_the_crypto_config() -> Result<()> {
    let (mut tx, _) = common::open()?;
    let unchanged = CryptoConfig {
        signature_hash_family: "SHA2".into(),
        identity_identifier_hash_function: "SHA256".into(),
    };
    let sha3 = CryptoConfig {
        signature_hash_family: "SHA3".into(),
        identity_identifier_hash_function: "SHA256".into(),
    };

    org1_msp(&mut tx, |msp| msp.set_crypto_config(unchanged))?;
    assert_eq!(msp_version(&tx), 0);

    org1_msp(&mut tx, |msp| msp.set_crypto_config(sha3.clone()))?;
    assert_eq!(msp_version(&tx), 1);
    assert_eq!(org1_msp(&mut tx, |msp| msp.configuration())?.crypto_config, sha3);
    Ok(())
}

#[test_log::test]
fn it_creates_a_crl_signed_by_the_msp() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let revoked = authorities.org1.leaf("peer1.org1", 14)?;
    let identity = authorities.org1.signing_identity(common::ORG1_MSP);

    let crl = org1_msp(&mut tx, |msp| {
        msp.create_msp_crl(&identity, std::slice::from_ref(&revoked))
    })?;

    let entries = crl
        .tbs_cert_list
        .revoked_certificates
        .ok_or_else(|| anyhow!("no revoked certificates"))?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].serial_number, revoked.tbs_certificate.serial_number);
    assert_eq!(
        crl.tbs_cert_list.issuer,
        authorities.org1.certificate().tbs_certificate.subject
    );
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_requires_the_crl_signer_to_belong_to_the_msp() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let revoked = authorities.org1.leaf("peer1.org1", 15)?;
    let foreign = authorities.org1.signing_identity("OtherMSP");
    let outsider = authorities.orderer.signing_identity(common::ORG1_MSP);

    let mismatch = org1_msp(&mut tx, |msp| {
        Ok(msp
            .create_msp_crl(&foreign, std::slice::from_ref(&revoked))
            .unwrap_err())
    })?;
    let untrusted = org1_msp(&mut tx, |msp| {
        Ok(msp
            .add_crl_from_signing_identity(&outsider, std::slice::from_ref(&revoked))
            .unwrap_err())
    })?;

    assert_eq!(
        mismatch.to_string(),
        "signing identity MSP ID 'OtherMSP' does not match MSP ID 'Org1MSP'"
    );
    assert_eq!(
        untrusted.to_string(),
        "signing identity's certificate is not a root or intermediate certificate for this MSP"
    );
    assert_eq!(untrusted.kind(), ErrorKind::InvalidArgument);
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_refuses_a_crl_signer_whose_key_does_not_match() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let revoked = authorities.org1.leaf("peer3.org1", 17)?;
    let impostor = SigningIdentity::new(
        authorities.org1.certificate().clone(),
        authorities.orderer.private_key().clone(),
        common::ORG1_MSP,
    );

    let created = org1_msp(&mut tx, |msp| {
        Ok(msp
            .create_msp_crl(&impostor, std::slice::from_ref(&revoked))
            .unwrap_err())
    })?;
    let stored = org1_msp(&mut tx, |msp| {
        Ok(msp
            .add_crl_from_signing_identity(&impostor, std::slice::from_ref(&revoked))
            .unwrap_err())
    })?;

    assert_eq!(created.kind(), ErrorKind::InvalidArgument);
    assert_eq!(
        created.to_string(),
        "creating crl: private key does not match the public key of certificate 01"
    );
    assert_eq!(stored, created);
    assert_eq!(tx.updated(), tx.original());
    Ok(())
}

#[test_log::test]
fn it_stores_revocation_lists() -> Result<()> {
    let (mut tx, authorities) = common::open()?;
    let revoked = authorities.org1.leaf("peer2.org1", 16)?;
    let identity = authorities.org1.signing_identity(common::ORG1_MSP);
    let external = authorities.org1.revoke(std::slice::from_ref(&revoked))?;

    org1_msp(&mut tx, |msp| {
        msp.add_crl_from_signing_identity(&identity, std::slice::from_ref(&revoked))?;
        msp.add_crl(external.clone())?;
        msp.add_crl(external.clone())
    })?;

    let msp = org1_msp(&mut tx, |msp| msp.configuration())?;
    assert_eq!(msp.revocation_list.len(), 2);
    assert_eq!(msp.revocation_list[1], external);
    Ok(())
}
