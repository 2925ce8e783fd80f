use serde::{Deserialize, Serialize};

/// Common behaviour of the versioned leaves of a [`crate::ConfigGroup`].
///
/// The update computation is written once against this trait and applied to
/// both the values and the policies mapping of every group.
pub trait Versioned: Clone {
    /// The version currently stamped on this entry.
    fn version(&self) -> u64;

    /// An entry carrying only a version, with no content and no mod-policy.
    ///
    /// Stamps are used in read sets, and in write sets to re-assert siblings
    /// of a changed entry without restating their content.
    fn stamp(version: u64) -> Self;

    /// Whether two entries hold the same content, comparing the mod-policy
    /// and the encoded payload byte for byte.
    fn same_content(&self, other: &Self) -> bool;

    /// A copy of this entry's content stamped with `version`.
    fn revision(&self, version: u64) -> Self;
}

/// A named leaf carrying an opaque payload.
///
/// The payload is typed by the name (the context key) it is stored under,
/// e.g. `Capabilities` or `MSP`. This crate never decodes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigValue {
    /// Monotonic version of this value.
    pub version: u64,
    /// The encoded payload.
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
    /// Name of the policy that authorizes changes to this value.
    pub mod_policy: String,
}

impl ConfigValue {
    /// Create a new value at version 0.
    pub fn new(value: Vec<u8>, mod_policy: impl Into<String>) -> Self {
        Self {
            version: 0,
            value,
            mod_policy: mod_policy.into(),
        }
    }
}

impl Versioned for ConfigValue {
    fn version(&self) -> u64 {
        self.version
    }

    fn stamp(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        self.mod_policy == other.mod_policy && self.value == other.value
    }

    fn revision(&self, version: u64) -> Self {
        Self {
            version,
            value: self.value.clone(),
            mod_policy: self.mod_policy.clone(),
        }
    }
}

/// The discriminated, encoded rule of a policy.
///
/// `policy_type` selects how `value` is to be decoded. The tree keeps both
/// opaque; interpretation belongs to whoever reads the policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefinition {
    /// Numeric policy type discriminant.
    #[serde(rename = "type")]
    pub policy_type: i32,
    /// The encoded rule.
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

/// A named leaf carrying an authorization rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPolicy {
    /// Monotonic version of this policy.
    pub version: u64,
    /// The rule, absent on version stamps.
    pub policy: Option<PolicyDefinition>,
    /// Name of the policy that authorizes changes to this policy.
    pub mod_policy: String,
}

impl ConfigPolicy {
    /// Create a new policy at version 0.
    pub fn new(policy: PolicyDefinition, mod_policy: impl Into<String>) -> Self {
        Self {
            version: 0,
            policy: Some(policy),
            mod_policy: mod_policy.into(),
        }
    }

    /// The numeric type of the rule, `0` when no rule is present.
    pub fn policy_type(&self) -> i32 {
        self.policy.as_ref().map(|p| p.policy_type).unwrap_or_default()
    }
}

impl Versioned for ConfigPolicy {
    fn version(&self) -> u64 {
        self.version
    }

    fn stamp(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        self.mod_policy == other.mod_policy && self.policy == other.policy
    }

    fn revision(&self, version: u64) -> Self {
        Self {
            version,
            policy: self.policy.clone(),
            mod_policy: self.mod_policy.clone(),
        }
    }
}
