use configtx_tree::{
    ConfigGroup, ConfigPolicy, ConfigUpdate, ConfigValue, PolicyDefinition, Versioned,
};
use pretty_assertions::assert_eq;

fn policy(policy_type: i32, rule: &str) -> ConfigPolicy {
    ConfigPolicy::new(
        PolicyDefinition {
            policy_type,
            value: rule.as_bytes().to_vec(),
        },
        "Admins",
    )
}

fn organization(msp: &[u8]) -> ConfigGroup {
    ConfigGroup::new("Admins")
        .with_value("MSP", ConfigValue::new(msp.to_vec(), "Admins"))
        .with_policy("Admins", policy(1, "admin"))
        .with_policy("Readers", policy(1, "member"))
}

fn channel() -> ConfigGroup {
    let application = ConfigGroup::new("Admins")
        .with_group("Org1", organization(b"org1"))
        .with_group("Org2", organization(b"org2"))
        .with_policy("Admins", policy(3, "MAJORITY Admins"))
        .with_value("Capabilities", ConfigValue::new(b"V2_0".to_vec(), "Admins"));

    ConfigGroup::new("Admins")
        .with_group("Application", application)
        .with_group("Orderer", ConfigGroup::new("Admins"))
        .with_policy("Admins", policy(3, "MAJORITY Admins"))
        .with_policy("Readers", policy(3, "ANY Readers"))
        .with_policy("Writers", policy(3, "ANY Writers"))
        .with_value(
            "OrdererAddresses",
            ConfigValue::new(b"o:7050".to_vec(), "/Channel/Orderer/Admins"),
        )
}

fn is_stamp<T: Versioned + Default + PartialEq>(entry: &T) -> bool {
    *entry == T::stamp(entry.version())
}

/// Apply a write set onto a tree the way a validating node would.
fn apply(original: &ConfigGroup, write: &ConfigGroup) -> ConfigGroup {
    let mut result = original.clone();

    if write.version != original.version {
        result.values = write
            .values
            .iter()
            .map(|(name, value)| match original.values.get(name) {
                Some(current) if is_stamp(value) && current.version == value.version => {
                    (name.clone(), current.clone())
                }
                _ => (name.clone(), value.clone()),
            })
            .collect();
        result.policies = write
            .policies
            .iter()
            .map(|(name, policy)| match original.policies.get(name) {
                Some(current) if is_stamp(policy) && current.version == policy.version => {
                    (name.clone(), current.clone())
                }
                _ => (name.clone(), policy.clone()),
            })
            .collect();
        result.groups = write
            .groups
            .iter()
            .map(|(name, group)| {
                let current = original.groups.get(name).cloned().unwrap_or_default();
                if group.is_leaf() && group.mod_policy.is_empty() && group.version == current.version {
                    (name.clone(), current)
                } else {
                    (name.clone(), apply(&current, group))
                }
            })
            .collect();
    } else {
        for (name, value) in &write.values {
            result.values.insert(name.clone(), value.clone());
        }
        for (name, policy) in &write.policies {
            result.policies.insert(name.clone(), policy.clone());
        }
        for (name, group) in &write.groups {
            let current = original.groups.get(name).cloned().unwrap_or_default();
            result.groups.insert(name.clone(), apply(&current, group));
        }
    }

    if !write.mod_policy.is_empty() {
        result.mod_policy = write.mod_policy.clone();
    }
    result.version = write.version;
    result
}

fn without_versions(group: &ConfigGroup) -> ConfigGroup {
    let mut group = group.clone();
    group.version = 0;
    group.values.values_mut().for_each(|v| v.version = 0);
    group.policies.values_mut().for_each(|p| p.version = 0);
    group.groups = group
        .groups
        .iter()
        .map(|(name, child)| (name.clone(), without_versions(child)))
        .collect();
    group
}

#[test_log::test]
fn it_produces_an_empty_update_for_identical_trees() {
    let tree = channel();
    let update = ConfigUpdate::compute("mychannel", &tree, &tree.clone());

    assert!(update.is_empty());
    assert!(update.write_set.is_leaf());
}

#[test_log::test]
fn it_serializes_identical_diffs_to_identical_bytes() -> anyhow::Result<()> {
    let original = channel();
    let mut updated = original.clone();
    updated.set_value("Capabilities", b"V3_0".to_vec(), "Admins");
    if let Some(application) = updated.group_mut("Application") {
        application.remove_group("Org2");
    }

    let first = ConfigUpdate::compute("mychannel", &original, &updated).to_canonical_bytes()?;
    let second = ConfigUpdate::compute("mychannel", &original, &updated).to_canonical_bytes()?;

    assert_eq!(first, second);
    Ok(())
}

#[test_log::test]
fn it_connects_a_deep_change_to_the_root_without_bumping_ancestors() {
    let original = channel();
    let mut updated = original.clone();
    if let Some(org) = updated
        .group_mut("Application")
        .and_then(|application| application.group_mut("Org1"))
    {
        org.set_value("MSP", b"org1-rotated".to_vec(), "Admins");
    }

    let update = ConfigUpdate::compute("mychannel", &original, &updated);

    assert_eq!(update.read_set.version, 0);
    assert_eq!(update.write_set.version, 0);

    let read_org = &update.read_set.groups["Application"].groups["Org1"];
    let write_org = &update.write_set.groups["Application"].groups["Org1"];

    assert_eq!(update.write_set.groups["Application"].version, 0);
    assert_eq!(write_org.version, 0);
    assert_eq!(read_org.values["MSP"], ConfigValue::stamp(0));
    assert_eq!(
        write_org.values["MSP"],
        ConfigValue {
            version: 1,
            value: b"org1-rotated".to_vec(),
            mod_policy: "Admins".into(),
        }
    );
    assert!(!write_org.policies.contains_key("Admins"));
    assert!(!update.write_set.groups.contains_key("Orderer"));
    assert!(!update.write_set.groups["Application"].groups.contains_key("Org2"));
}

#[test_log::test]
fn it_bumps_a_group_whose_membership_changed() {
    let original = channel();
    let mut updated = original.clone();
    updated.remove_policy("Readers");

    let update = ConfigUpdate::compute("mychannel", &original, &updated);

    assert_eq!(update.read_set.version, 0);
    assert_eq!(update.write_set.version, 1);
    assert_eq!(update.write_set.mod_policy, "Admins");

    assert_eq!(
        update.write_set.policies.keys().collect::<Vec<_>>(),
        vec!["Admins", "Writers"]
    );
    assert_eq!(update.write_set.policies["Admins"], ConfigPolicy::stamp(0));
    assert_eq!(update.read_set.policies["Writers"], ConfigPolicy::stamp(0));
    assert_eq!(update.write_set.groups["Application"], ConfigGroup::stamp(0));
    assert_eq!(update.write_set.groups["Orderer"], ConfigGroup::stamp(0));
    assert_eq!(update.read_set.values["OrdererAddresses"], ConfigValue::stamp(0));
}

#[test_log::test]
fn it_bumps_a_group_whose_mod_policy_changed() {
    let original = channel();
    let mut updated = original.clone();
    if let Some(orderer) = updated.group_mut("Orderer") {
        orderer.set_mod_policy("Writers");
    }

    let update = ConfigUpdate::compute("mychannel", &original, &updated);
    let orderer = &update.write_set.groups["Orderer"];

    assert_eq!(update.write_set.version, 0);
    assert_eq!(orderer.version, 1);
    assert_eq!(orderer.mod_policy, "Writers");
    assert_eq!(update.read_set.groups["Orderer"].version, 0);
}

#[test_log::test]
fn it_reproduces_the_updated_tree_when_the_write_set_is_applied() {
    let original = channel();
    let mut updated = original.clone();
    updated.set_value("Capabilities", b"V3_0".to_vec(), "Admins");
    updated.remove_value("OrdererAddresses");
    if let Some(application) = updated.group_mut("Application") {
        application.remove_group("Org2");
        application
            .groups
            .insert("Org3".into(), organization(b"org3"));
        application.set_policy(
            "Admins",
            PolicyDefinition {
                policy_type: 3,
                value: b"ANY Admins".to_vec(),
            },
            "Admins",
        );
    }

    let update = ConfigUpdate::compute("mychannel", &original, &updated);
    let applied = apply(&original, &update.write_set);

    assert_eq!(without_versions(&applied), without_versions(&updated));
}

#[test_log::test]
fn it_never_reads_added_entries() {
    let original = channel();
    let mut updated = original.clone();
    if let Some(application) = updated.group_mut("Application") {
        application
            .groups
            .insert("Org3".into(), organization(b"org3"));
    }

    let update = ConfigUpdate::compute("mychannel", &original, &updated);
    let application_read = &update.read_set.groups["Application"];
    let application_write = &update.write_set.groups["Application"];

    assert!(!application_read.groups.contains_key("Org3"));
    assert_eq!(application_read.groups["Org1"], ConfigGroup::stamp(0));
    assert_eq!(application_write.version, 1);
    assert_eq!(application_write.groups["Org3"], organization(b"org3"));
}

#[test_log::test]
fn it_projects_an_update_as_json() -> anyhow::Result<()> {
    let original = channel();
    let mut updated = original.clone();
    updated.set_value("Capabilities", b"V3_0".to_vec(), "Admins");

    let update = ConfigUpdate::compute("mychannel", &original, &updated);
    let json = serde_json::to_value(&update)?;

    assert_eq!(json["channel_id"], "mychannel");
    assert_eq!(json["write_set"]["version"], 1);
    assert_eq!(json["write_set"]["values"]["Capabilities"]["version"], 0);
    assert_eq!(
        json["read_set"]["policies"]["Admins"],
        serde_json::json!({ "version": 0, "policy": null, "mod_policy": "" })
    );
    Ok(())
}
