//! Structural differences between two configuration trees.
//!
//! Two snapshots of the same tree are compared level by level. For every
//! group the values, the policies and the child groups are classified
//! independently:
//!
//! - **Added** (only in the updated tree): full content in the write set at
//!   version 0. Never part of the read set.
//! - **Removed** (only in the original tree): omitted from the write set.
//!   Absence is the deletion signal.
//! - **Unchanged**: omitted, unless the membership of the enclosing group
//!   changed. In that case a version-only stamp is placed in both the read
//!   and the write set so that the new child set is fully restated.
//! - **Modified**: full content in the write set with the original version
//!   plus one, and the original version asserted in the read set.
//!
//! A group's own version is bumped only when its direct membership or its
//! own mod-policy changed. A group that is untouched at its level but has a
//! changed descendant appears in both sets at its original version, which
//! keeps the update connected from the root.
//!
//! # Usage
//!
//! ```rust
//! use configtx_tree::{ConfigGroup, compute_update};
//!
//! let original = ConfigGroup::new("Admins");
//! let mut updated = original.clone();
//! updated.set_value("OrdererAddresses", vec![1], "Admins");
//!
//! let delta = compute_update(&original, &updated);
//!
//! assert!(delta.changed);
//! assert_eq!(delta.write_set.version, 1);
//! assert_eq!(delta.read_set.version, 0);
//! ```

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{ConfigGroup, Versioned};

/// The read and write sets produced by comparing two groups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupDelta {
    /// Nodes whose versions the update depends on.
    pub read_set: ConfigGroup,
    /// Nodes the update adds or changes.
    pub write_set: ConfigGroup,
    /// Whether anything at or below this group changed.
    pub changed: bool,
}

/// Differences between two mappings of versioned leaves.
struct LeafDelta<T> {
    read_set: BTreeMap<String, T>,
    write_set: BTreeMap<String, T>,
    same_set: BTreeMap<String, T>,
    members_changed: bool,
}

impl<T> LeafDelta<T> {
    fn is_empty(&self) -> bool {
        self.read_set.is_empty() && self.write_set.is_empty()
    }
}

/// Differences between two mappings of child groups.
struct GroupsDelta {
    read_set: BTreeMap<String, ConfigGroup>,
    write_set: BTreeMap<String, ConfigGroup>,
    same_set: BTreeMap<String, ConfigGroup>,
    members_changed: bool,
}

fn leaf_map_update<T>(
    kind: &'static str,
    original: &BTreeMap<String, T>,
    updated: &BTreeMap<String, T>,
) -> LeafDelta<T>
where
    T: Versioned,
{
    let mut delta = LeafDelta {
        read_set: BTreeMap::new(),
        write_set: BTreeMap::new(),
        same_set: BTreeMap::new(),
        members_changed: false,
    };

    for (name, original_entry) in original {
        let Some(updated_entry) = updated.get(name) else {
            trace!(kind, name = %name, "Removed");
            delta.members_changed = true;
            continue;
        };

        if original_entry.same_content(updated_entry) {
            delta
                .same_set
                .insert(name.clone(), T::stamp(original_entry.version()));
            continue;
        }

        let version = original_entry.version() + 1;
        trace!(kind, name = %name, version, "Modified");
        delta
            .read_set
            .insert(name.clone(), T::stamp(original_entry.version()));
        delta
            .write_set
            .insert(name.clone(), updated_entry.revision(version));
    }

    for (name, updated_entry) in updated {
        if original.contains_key(name) {
            continue;
        }
        trace!(kind, name = %name, "Added");
        delta.members_changed = true;
        delta.write_set.insert(name.clone(), updated_entry.revision(0));
    }

    delta
}

fn groups_map_update(
    original: &BTreeMap<String, ConfigGroup>,
    updated: &BTreeMap<String, ConfigGroup>,
) -> GroupsDelta {
    let mut delta = GroupsDelta {
        read_set: BTreeMap::new(),
        write_set: BTreeMap::new(),
        same_set: BTreeMap::new(),
        members_changed: false,
    };

    for (name, original_group) in original {
        let Some(updated_group) = updated.get(name) else {
            trace!(kind = "group", name = %name, "Removed");
            delta.members_changed = true;
            continue;
        };

        let child = group_update(original_group, updated_group);
        if !child.changed {
            delta.same_set.insert(name.clone(), child.read_set);
            continue;
        }

        delta.read_set.insert(name.clone(), child.read_set);
        delta.write_set.insert(name.clone(), child.write_set);
    }

    for (name, updated_group) in updated {
        if original.contains_key(name) {
            continue;
        }
        trace!(kind = "group", name = %name, "Added");
        delta.members_changed = true;

        let child = group_update(&ConfigGroup::default(), updated_group);
        delta.write_set.insert(
            name.clone(),
            ConfigGroup {
                version: 0,
                mod_policy: updated_group.mod_policy.clone(),
                ..child.write_set
            },
        );
    }

    delta
}

fn group_update(original: &ConfigGroup, updated: &ConfigGroup) -> GroupDelta {
    let mut policies = leaf_map_update("policy", &original.policies, &updated.policies);
    let mut values = leaf_map_update("value", &original.values, &updated.values);
    let mut groups = groups_map_update(&original.groups, &updated.groups);

    let members_changed = policies.members_changed
        || values.members_changed
        || groups.members_changed
        || original.mod_policy != updated.mod_policy;

    if !members_changed {
        if policies.is_empty()
            && values.is_empty()
            && groups.read_set.is_empty()
            && groups.write_set.is_empty()
        {
            return GroupDelta {
                read_set: ConfigGroup::stamp(original.version),
                write_set: ConfigGroup::stamp(original.version),
                changed: false,
            };
        }

        return GroupDelta {
            read_set: ConfigGroup {
                version: original.version,
                groups: groups.read_set,
                values: values.read_set,
                policies: policies.read_set,
                mod_policy: String::new(),
            },
            write_set: ConfigGroup {
                version: original.version,
                groups: groups.write_set,
                values: values.write_set,
                policies: policies.write_set,
                mod_policy: updated.mod_policy.clone(),
            },
            changed: true,
        };
    }

    // The child set is restated in full, so unchanged siblings are asserted
    // in both sets by version.
    for (name, stamp) in std::mem::take(&mut policies.same_set) {
        policies.read_set.insert(name.clone(), stamp.clone());
        policies.write_set.insert(name, stamp);
    }
    for (name, stamp) in std::mem::take(&mut values.same_set) {
        values.read_set.insert(name.clone(), stamp.clone());
        values.write_set.insert(name, stamp);
    }
    for (name, stamp) in std::mem::take(&mut groups.same_set) {
        groups.read_set.insert(name.clone(), stamp.clone());
        groups.write_set.insert(name, stamp);
    }

    GroupDelta {
        read_set: ConfigGroup {
            version: original.version,
            groups: groups.read_set,
            values: values.read_set,
            policies: policies.read_set,
            mod_policy: String::new(),
        },
        write_set: ConfigGroup {
            version: original.version + 1,
            groups: groups.write_set,
            values: values.write_set,
            policies: policies.write_set,
            mod_policy: updated.mod_policy.clone(),
        },
        changed: true,
    }
}

/// Compare two snapshots of a group and produce the read and write sets that
/// transform `original` into `updated`.
///
/// This never fails: any two well-formed trees can be compared. When nothing
/// differs, both sets are bare stamps of the original root version and
/// [`GroupDelta::changed`] is `false`.
pub fn compute_update(original: &ConfigGroup, updated: &ConfigGroup) -> GroupDelta {
    let delta = group_update(original, updated);
    debug!(
        changed = delta.changed,
        read = delta.read_set.groups.len()
            + delta.read_set.values.len()
            + delta.read_set.policies.len(),
        write = delta.write_set.groups.len()
            + delta.write_set.values.len()
            + delta.write_set.policies.len(),
        "Computed configuration update"
    );
    delta
}
