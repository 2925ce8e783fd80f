//! Operations shared by every group view.
//!
//! A view exposes the [`ConfigGroup`] it wraps; policy, mod-policy and
//! capability operations are then provided on top of it.

use std::collections::BTreeMap;

use configtx_tree::ConfigGroup;
use tracing::debug;

use crate::{
    ConfigTxError, Policy,
    payload::Capabilities,
    policy,
    value::{read_value, write_value},
};

/// A view over a group that owns policies.
pub trait PolicyScope {
    /// Name of the scope, used in error context, e.g. `channel`.
    const SCOPE: &'static str;

    /// The wrapped group.
    fn config_group(&self) -> &ConfigGroup;

    /// The wrapped group, for mutation.
    fn config_group_mut(&mut self) -> &mut ConfigGroup;

    /// All policies of the group in textual form.
    fn policies(&self) -> Result<BTreeMap<String, Policy>, ConfigTxError> {
        policy::get_policies(&self.config_group().policies)
    }

    /// Create or update one policy. An empty mod-policy means `Admins`.
    fn set_policy(&mut self, name: &str, policy: Policy) -> Result<(), ConfigTxError> {
        policy::set_policy(self.config_group_mut(), name, &policy)
    }

    /// Replace every policy of the group. Nothing is written unless every
    /// policy is valid.
    fn set_policies(&mut self, policies: BTreeMap<String, Policy>) -> Result<(), ConfigTxError> {
        policy::set_policies(self.config_group_mut(), &policies)
    }

    /// Remove one policy.
    fn remove_policy(&mut self, name: &str) -> Result<(), ConfigTxError> {
        policy::remove_policy(self.config_group_mut(), name)
    }

    /// Overwrite the mod-policy of the group itself.
    fn set_mod_policy(&mut self, mod_policy: &str) -> Result<(), ConfigTxError> {
        if mod_policy.is_empty() {
            return Err(ConfigTxError::InvalidArgument(
                "non empty mod policy is required".into(),
            ));
        }
        if self.config_group_mut().set_mod_policy(mod_policy) {
            debug!(scope = Self::SCOPE, mod_policy, "Set mod policy");
        }
        Ok(())
    }
}

/// Capabilities enabled in `group`, in name order.
pub(crate) fn read_capabilities(
    scope: &str,
    group: &ConfigGroup,
) -> Result<Vec<String>, ConfigTxError> {
    let capabilities = read_value::<Capabilities>(group).map_err(|error| {
        ConfigTxError::malformed(format!("retrieving {scope} capabilities"), error)
    })?;
    Ok(capabilities
        .map(|capabilities| capabilities.capabilities.into_iter().collect())
        .unwrap_or_default())
}

/// A view over a group that carries a capability set.
pub trait CapabilityScope: PolicyScope {
    /// Enabled capabilities in name order. An absent value reads as empty.
    fn capabilities(&self) -> Result<Vec<String>, ConfigTxError> {
        read_capabilities(Self::SCOPE, self.config_group())
    }

    /// Enable a capability. Enabling one that is already set changes nothing.
    fn add_capability(&mut self, capability: &str) -> Result<(), ConfigTxError> {
        let mut capabilities = read_value::<Capabilities>(self.config_group())
            .map_err(|error| {
                ConfigTxError::malformed(format!("retrieving {} capabilities", Self::SCOPE), error)
            })?
            .unwrap_or_default();

        if !capabilities.capabilities.insert(capability.to_string()) {
            return Ok(());
        }
        write_value(self.config_group_mut(), &capabilities)?;
        debug!(scope = Self::SCOPE, capability, "Added capability");
        Ok(())
    }

    /// Disable a capability. Fails when it is not set; never creates the
    /// capability value.
    fn remove_capability(&mut self, capability: &str) -> Result<(), ConfigTxError> {
        let Some(mut capabilities) = read_value::<Capabilities>(self.config_group())
            .map_err(|error| {
                ConfigTxError::malformed(format!("retrieving {} capabilities", Self::SCOPE), error)
            })?
        else {
            return Err(ConfigTxError::CapabilityNotSet);
        };

        if !capabilities.capabilities.remove(capability) {
            return Err(ConfigTxError::CapabilityNotSet);
        }
        write_value(self.config_group_mut(), &capabilities)?;
        debug!(scope = Self::SCOPE, capability, "Removed capability");
        Ok(())
    }
}
