use std::collections::{BTreeMap, btree_map::Entry};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ConfigPolicy, ConfigValue, PolicyDefinition};

/// An interior node of the configuration tree.
///
/// A group nests other groups strictly downwards (organizations inside the
/// application scope, for instance), so a tree built from groups is acyclic.
/// Its own `version` and `mod_policy` guard its membership: adding or
/// removing children, or changing the group's mod-policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigGroup {
    /// Monotonic version of this group.
    pub version: u64,
    /// Child groups by name.
    pub groups: BTreeMap<String, ConfigGroup>,
    /// Values by name (context key).
    pub values: BTreeMap<String, ConfigValue>,
    /// Policies by name.
    pub policies: BTreeMap<String, ConfigPolicy>,
    /// Name of a policy of this group that authorizes membership changes.
    pub mod_policy: String,
}

impl ConfigGroup {
    /// Create an empty group at version 0 guarded by `mod_policy`.
    pub fn new(mod_policy: impl Into<String>) -> Self {
        Self {
            mod_policy: mod_policy.into(),
            ..Default::default()
        }
    }

    /// A group carrying only a version, used in read and write sets.
    pub fn stamp(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Whether the group has no children of any kind.
    pub fn is_leaf(&self) -> bool {
        self.groups.is_empty() && self.values.is_empty() && self.policies.is_empty()
    }

    /// Look up a child group.
    pub fn group(&self, name: &str) -> Option<&ConfigGroup> {
        self.groups.get(name)
    }

    /// Look up a child group for mutation.
    pub fn group_mut(&mut self, name: &str) -> Option<&mut ConfigGroup> {
        self.groups.get_mut(name)
    }

    /// Look up a value.
    pub fn value(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    /// Look up a policy.
    pub fn policy(&self, name: &str) -> Option<&ConfigPolicy> {
        self.policies.get(name)
    }

    /// Builder-style insertion of a child group.
    pub fn with_group(mut self, name: impl Into<String>, group: ConfigGroup) -> Self {
        self.groups.insert(name.into(), group);
        self
    }

    /// Builder-style insertion of a value.
    pub fn with_value(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder-style insertion of a policy.
    pub fn with_policy(mut self, name: impl Into<String>, policy: ConfigPolicy) -> Self {
        self.policies.insert(name.into(), policy);
        self
    }

    /// Write a value, stamping it with `mod_policy`.
    ///
    /// A new value starts at version 0. An existing value whose payload or
    /// mod-policy changes is bumped by exactly one; rewriting identical
    /// content leaves the version alone.
    pub fn set_value(
        &mut self,
        name: impl Into<String>,
        value: Vec<u8>,
        mod_policy: impl Into<String>,
    ) -> &ConfigValue {
        let mod_policy = mod_policy.into();
        match self.values.entry(name.into()) {
            Entry::Occupied(entry) => {
                let name = entry.key().clone();
                let current = entry.into_mut();
                if current.value != value || current.mod_policy != mod_policy {
                    current.value = value;
                    current.mod_policy = mod_policy;
                    current.version += 1;
                    trace!(value = %name, version = current.version, "Rewrote value");
                }
                current
            }
            Entry::Vacant(entry) => {
                trace!(value = %entry.key(), "Created value");
                entry.insert(ConfigValue::new(value, mod_policy))
            }
        }
    }

    /// Write a policy, stamping it with `mod_policy`.
    ///
    /// Versioning follows [`ConfigGroup::set_value`].
    pub fn set_policy(
        &mut self,
        name: impl Into<String>,
        policy: PolicyDefinition,
        mod_policy: impl Into<String>,
    ) -> &ConfigPolicy {
        let mod_policy = mod_policy.into();
        match self.policies.entry(name.into()) {
            Entry::Occupied(entry) => {
                let name = entry.key().clone();
                let current = entry.into_mut();
                if current.policy.as_ref() != Some(&policy) || current.mod_policy != mod_policy {
                    current.policy = Some(policy);
                    current.mod_policy = mod_policy;
                    current.version += 1;
                    trace!(policy = %name, version = current.version, "Rewrote policy");
                }
                current
            }
            Entry::Vacant(entry) => {
                trace!(policy = %entry.key(), "Created policy");
                entry.insert(ConfigPolicy::new(policy, mod_policy))
            }
        }
    }

    /// Overwrite this group's mod-policy, bumping its version when it changes.
    ///
    /// Returns whether anything changed.
    pub fn set_mod_policy(&mut self, mod_policy: impl Into<String>) -> bool {
        let mod_policy = mod_policy.into();
        if self.mod_policy == mod_policy {
            return false;
        }
        self.mod_policy = mod_policy;
        self.version += 1;
        true
    }

    /// Remove a value, returning it if it was present.
    pub fn remove_value(&mut self, name: &str) -> Option<ConfigValue> {
        self.values.remove(name)
    }

    /// Remove a policy, returning it if it was present.
    pub fn remove_policy(&mut self, name: &str) -> Option<ConfigPolicy> {
        self.policies.remove(name)
    }

    /// Remove a child group, returning it if it was present.
    pub fn remove_group(&mut self, name: &str) -> Option<ConfigGroup> {
        self.groups.remove(name)
    }
}
