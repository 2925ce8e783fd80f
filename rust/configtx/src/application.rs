use std::collections::BTreeMap;

use configtx_tree::ConfigGroup;
use serde::Serialize;
use tracing::debug;

use crate::{
    Application, CapabilityScope, ConfigTxError, Organization, OrganizationConfiguration,
    OrganizationGroup, Policy, PolicyScope, organization::organizations_configuration, policy,
    scope::read_capabilities,
};

/// A typed summary of the application group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApplicationConfiguration {
    /// Application organizations by name.
    pub organizations: BTreeMap<String, OrganizationConfiguration>,
    /// Enabled application capabilities.
    pub capabilities: Vec<String>,
    /// Application-level policies.
    pub policies: BTreeMap<String, Policy>,
    /// Mod-policy of the application group.
    pub mod_policy: String,
}

impl ApplicationConfiguration {
    pub(crate) fn from_group(group: &ConfigGroup) -> Result<Self, ConfigTxError> {
        Ok(Self {
            organizations: organizations_configuration(group, |name| {
                format!("retrieving application org {name}")
            })?,
            capabilities: read_capabilities("application", group)?,
            policies: policy::get_policies(&group.policies)?,
            mod_policy: group.mod_policy.clone(),
        })
    }
}

/// The application group and the organizations inside it.
pub struct ApplicationGroup<'a> {
    group: &'a mut ConfigGroup,
}

impl<'a> ApplicationGroup<'a> {
    pub(crate) fn new(group: &'a mut ConfigGroup) -> Self {
        Self { group }
    }

    /// Decode the group and every organization in it.
    pub fn configuration(&self) -> Result<ApplicationConfiguration, ConfigTxError> {
        ApplicationConfiguration::from_group(self.group)
    }

    /// Names of the application organizations.
    pub fn organization_names(&self) -> Vec<String> {
        self.group.groups.keys().cloned().collect()
    }

    /// A view over one application organization.
    pub fn organization(&mut self, name: &str) -> Option<OrganizationGroup<'_, Application>> {
        self.group
            .group_mut(name)
            .map(|group| OrganizationGroup::new(name, group))
    }

    /// Add an organization, or replace the one with the same name.
    pub fn set_organization(&mut self, organization: &Organization) -> Result<(), ConfigTxError> {
        let group = organization.to_group()?;
        self.group.groups.insert(organization.name.clone(), group);
        debug!(organization = %organization.name, "Set application organization");
        Ok(())
    }

    /// Remove an organization.
    pub fn remove_organization(&mut self, name: &str) -> Result<(), ConfigTxError> {
        self.group.remove_group(name).ok_or_else(|| {
            ConfigTxError::NotFound(format!("application org {name} does not exist"))
        })?;
        debug!(organization = name, "Removed application organization");
        Ok(())
    }
}

impl PolicyScope for ApplicationGroup<'_> {
    const SCOPE: &'static str = "application";

    fn config_group(&self) -> &ConfigGroup {
        self.group
    }

    fn config_group_mut(&mut self) -> &mut ConfigGroup {
        self.group
    }
}

impl CapabilityScope for ApplicationGroup<'_> {}
