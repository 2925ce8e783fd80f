//! Typed views of the policies of a group.
//!
//! A policy's rule is stored as a numeric type discriminant and an encoded
//! payload. Only two types are recognized: signature policies and implicit
//! meta policies. Implicit meta rules are written `ANY|ALL|MAJORITY <name>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use configtx_tree::{ConfigGroup, ConfigPolicy, PolicyDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ADMINS_POLICY_KEY, ConfigTxError,
    payload::{ConfigPayload, ImplicitMetaPolicy, ImplicitMetaRule, SignaturePolicy},
};

/// The closed set of policy types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// A boolean expression over signer identities.
    Signature,
    /// An aggregation over the same-named policy of every child group.
    ImplicitMeta,
}

impl PolicyType {
    /// The discriminant stored in the tree.
    pub const fn code(self) -> i32 {
        match self {
            PolicyType::Signature => 1,
            PolicyType::ImplicitMeta => 3,
        }
    }

    /// Resolve a stored discriminant.
    pub fn from_code(code: i32) -> Result<Self, ConfigTxError> {
        match code {
            1 => Ok(PolicyType::Signature),
            3 => Ok(PolicyType::ImplicitMeta),
            other => Err(ConfigTxError::InvalidArgument(format!(
                "unknown policy type: {other}"
            ))),
        }
    }
}

impl FromStr for PolicyType {
    type Err = ConfigTxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Signature" => Ok(PolicyType::Signature),
            "ImplicitMeta" => Ok(PolicyType::ImplicitMeta),
            other => Err(ConfigTxError::InvalidArgument(format!(
                "unknown policy type: {other}"
            ))),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyType::Signature => f.write_str("Signature"),
            PolicyType::ImplicitMeta => f.write_str("ImplicitMeta"),
        }
    }
}

/// A policy in its textual form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// How `rule` is interpreted.
    pub policy_type: PolicyType,
    /// The rule text.
    pub rule: String,
    /// Policy authorizing changes to this policy. Empty means `Admins`.
    pub mod_policy: String,
}

impl Policy {
    /// An implicit meta policy guarded by `Admins`.
    pub fn implicit_meta(rule: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::ImplicitMeta,
            rule: rule.into(),
            mod_policy: ADMINS_POLICY_KEY.into(),
        }
    }

    /// A signature policy guarded by `Admins`.
    pub fn signature(rule: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::Signature,
            rule: rule.into(),
            mod_policy: ADMINS_POLICY_KEY.into(),
        }
    }

    /// Replace the mod-policy.
    pub fn with_mod_policy(mut self, mod_policy: impl Into<String>) -> Self {
        self.mod_policy = mod_policy.into();
        self
    }
}

impl FromStr for ImplicitMetaRule {
    type Err = ConfigTxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANY" => Ok(ImplicitMetaRule::Any),
            "ALL" => Ok(ImplicitMetaRule::All),
            "MAJORITY" => Ok(ImplicitMetaRule::Majority),
            other => Err(ConfigTxError::InvalidArgument(format!(
                "unknown rule type '{other}', expected ALL, ANY, or MAJORITY"
            ))),
        }
    }
}

impl fmt::Display for ImplicitMetaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplicitMetaRule::Any => f.write_str("ANY"),
            ImplicitMetaRule::All => f.write_str("ALL"),
            ImplicitMetaRule::Majority => f.write_str("MAJORITY"),
        }
    }
}

impl FromStr for ImplicitMetaPolicy {
    type Err = ConfigTxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = s.split(' ').collect::<Vec<_>>();
        let [rule, sub_policy] = tokens.as_slice() else {
            return Err(ConfigTxError::InvalidArgument(format!(
                "expected two space separated tokens, but got {}",
                tokens.len()
            )));
        };
        if sub_policy.is_empty() {
            return Err(ConfigTxError::InvalidArgument(
                "implicit meta policy requires a sub-policy name".into(),
            ));
        }
        Ok(ImplicitMetaPolicy {
            rule: rule.parse()?,
            sub_policy: sub_policy.to_string(),
        })
    }
}

impl fmt::Display for ImplicitMetaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rule, self.sub_policy)
    }
}

/// Decode a stored policy into its textual form.
pub fn get_policy(name: &str, policy: &ConfigPolicy) -> Result<Policy, ConfigTxError> {
    let definition = policy.policy.clone().unwrap_or_default();
    let policy_type = PolicyType::from_code(definition.policy_type)?;
    let context = || format!("unmarshaling {name} policy");

    let rule = match policy_type {
        PolicyType::Signature => SignaturePolicy::decode(&definition.value)
            .map_err(|error| ConfigTxError::malformed(context(), error))?
            .rule,
        PolicyType::ImplicitMeta => ImplicitMetaPolicy::decode(&definition.value)
            .map_err(|error| ConfigTxError::malformed(context(), error))?
            .to_string(),
    };

    Ok(Policy {
        policy_type,
        rule,
        mod_policy: policy.mod_policy.clone(),
    })
}

/// Decode every policy of a mapping, failing on the first bad one.
pub fn get_policies(
    policies: &BTreeMap<String, ConfigPolicy>,
) -> Result<BTreeMap<String, Policy>, ConfigTxError> {
    policies
        .iter()
        .map(|(name, policy)| Ok((name.clone(), get_policy(name, policy)?)))
        .collect()
}

/// Validate and encode a policy's rule.
pub fn to_definition(policy: &Policy) -> Result<PolicyDefinition, ConfigTxError> {
    let value = match policy.policy_type {
        PolicyType::Signature => {
            if policy.rule.trim().is_empty() {
                return Err(ConfigTxError::InvalidArgument(
                    "signature policy requires a rule".into(),
                ));
            }
            SignaturePolicy {
                rule: policy.rule.clone(),
            }
            .encode()
        }
        PolicyType::ImplicitMeta => policy.rule.parse::<ImplicitMetaPolicy>()?.encode(),
    }
    .map_err(|error| ConfigTxError::InvalidArgument(error.to_string()))?;

    Ok(PolicyDefinition {
        policy_type: policy.policy_type.code(),
        value,
    })
}

fn mod_policy_or_admins(policy: &Policy) -> &str {
    if policy.mod_policy.is_empty() {
        ADMINS_POLICY_KEY
    } else {
        &policy.mod_policy
    }
}

/// Write one policy into a group.
pub fn set_policy(group: &mut ConfigGroup, name: &str, policy: &Policy) -> Result<(), ConfigTxError> {
    let definition = to_definition(policy)?;
    let written = group.set_policy(name, definition, mod_policy_or_admins(policy));
    debug!(policy = name, version = written.version, "Set policy");
    Ok(())
}

/// Replace the full policy set of a group.
///
/// Every policy is validated before anything is written, so an invalid entry
/// leaves the group untouched. Policies absent from `policies` are removed.
pub fn set_policies(
    group: &mut ConfigGroup,
    policies: &BTreeMap<String, Policy>,
) -> Result<(), ConfigTxError> {
    let definitions = policies
        .iter()
        .map(|(name, policy)| Ok((name, to_definition(policy)?, mod_policy_or_admins(policy))))
        .collect::<Result<Vec<_>, ConfigTxError>>()?;

    group.policies.retain(|name, _| policies.contains_key(name));
    for (name, definition, mod_policy) in definitions {
        group.set_policy(name.clone(), definition, mod_policy);
    }
    debug!(count = policies.len(), "Replaced policies");
    Ok(())
}

/// Remove a policy from a group.
///
/// The group's policies are decoded first, so a group holding an unreadable
/// policy cannot be modified this way.
pub fn remove_policy(group: &mut ConfigGroup, name: &str) -> Result<(), ConfigTxError> {
    let policies = get_policies(&group.policies)?;
    if !policies.contains_key(name) {
        return Err(ConfigTxError::NotFound(format!(
            "policy {name} does not exist"
        )));
    }

    for (referrer, policy) in &policies {
        if policy.policy_type != PolicyType::ImplicitMeta {
            continue;
        }
        if let Ok(meta) = policy.rule.parse::<ImplicitMetaPolicy>() {
            if meta.sub_policy == name {
                warn!(
                    policy = name,
                    referrer = %referrer,
                    "Removing a policy referenced by an implicit meta policy"
                );
            }
        }
    }

    group.remove_policy(name);
    debug!(policy = name, "Removed policy");
    Ok(())
}
