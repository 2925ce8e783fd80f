//! Consortiums of an ordering system channel.
//!
//! The `Consortiums` group holds one group per consortium, and each
//! consortium holds the groups of its member organizations. Consortium
//! groups are guarded by the orderer administrators.

use std::collections::BTreeMap;

use configtx_tree::ConfigGroup;
use serde::Serialize;
use tracing::debug;

use crate::{
    ConfigTxError, ConsortiumMember, ORDERER_ADMINS_POLICY_NAME, Organization,
    OrganizationConfiguration, OrganizationGroup, PolicyScope,
    organization::organizations_configuration,
};

/// A typed summary of one consortium.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsortiumConfiguration {
    /// Name of the consortium.
    pub name: String,
    /// Member organizations by name.
    pub organizations: BTreeMap<String, OrganizationConfiguration>,
}

impl ConsortiumConfiguration {
    pub(crate) fn from_group(name: &str, group: &ConfigGroup) -> Result<Self, ConfigTxError> {
        Ok(Self {
            name: name.to_string(),
            organizations: organizations_configuration(group, |organization| {
                format!("failed to retrieve organization {organization} from consortium {name}")
            })?,
        })
    }
}

pub(crate) fn consortiums_configuration(
    group: &ConfigGroup,
) -> Result<Vec<ConsortiumConfiguration>, ConfigTxError> {
    group
        .groups
        .iter()
        .map(|(name, consortium)| ConsortiumConfiguration::from_group(name, consortium))
        .collect()
}

/// The consortiums group.
pub struct ConsortiumsGroup<'a> {
    group: &'a mut ConfigGroup,
}

impl<'a> ConsortiumsGroup<'a> {
    pub(crate) fn new(group: &'a mut ConfigGroup) -> Self {
        Self { group }
    }

    /// Decode every consortium and its organizations, in name order.
    pub fn configuration(&self) -> Result<Vec<ConsortiumConfiguration>, ConfigTxError> {
        consortiums_configuration(self.group)
    }

    /// Names of the consortiums.
    pub fn consortium_names(&self) -> Vec<String> {
        self.group.groups.keys().cloned().collect()
    }

    /// A view over one consortium.
    pub fn consortium(&mut self, name: &str) -> Option<ConsortiumGroup<'_>> {
        self.group
            .group_mut(name)
            .map(|group| ConsortiumGroup::new(name, group))
    }

    /// Add a consortium of `organizations`, or replace the one with the
    /// same name.
    pub fn set_consortium(
        &mut self,
        name: &str,
        organizations: &[Organization],
    ) -> Result<(), ConfigTxError> {
        let mut consortium = ConfigGroup::new(ORDERER_ADMINS_POLICY_NAME);
        for organization in organizations {
            consortium
                .groups
                .insert(organization.name.clone(), organization.to_group()?);
        }
        self.group.groups.insert(name.to_string(), consortium);
        debug!(consortium = name, members = organizations.len(), "Set consortium");
        Ok(())
    }

    /// Remove a consortium.
    pub fn remove_consortium(&mut self, name: &str) -> Result<(), ConfigTxError> {
        self.group
            .remove_group(name)
            .ok_or_else(|| ConfigTxError::NotFound(format!("consortium {name} does not exist")))?;
        debug!(consortium = name, "Removed consortium");
        Ok(())
    }
}

impl PolicyScope for ConsortiumsGroup<'_> {
    const SCOPE: &'static str = "consortiums";

    fn config_group(&self) -> &ConfigGroup {
        self.group
    }

    fn config_group_mut(&mut self) -> &mut ConfigGroup {
        self.group
    }
}

/// One consortium and its member organizations.
pub struct ConsortiumGroup<'a> {
    name: String,
    group: &'a mut ConfigGroup,
}

impl<'a> ConsortiumGroup<'a> {
    pub(crate) fn new(name: &str, group: &'a mut ConfigGroup) -> Self {
        Self {
            name: name.to_string(),
            group,
        }
    }

    /// Name of the consortium.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decode the consortium and its organizations.
    pub fn configuration(&self) -> Result<ConsortiumConfiguration, ConfigTxError> {
        ConsortiumConfiguration::from_group(&self.name, self.group)
    }

    /// Names of the member organizations.
    pub fn organization_names(&self) -> Vec<String> {
        self.group.groups.keys().cloned().collect()
    }

    /// A view over one member organization.
    pub fn organization(&mut self, name: &str) -> Option<OrganizationGroup<'_, ConsortiumMember>> {
        self.group
            .group_mut(name)
            .map(|group| OrganizationGroup::new(name, group))
    }

    /// Add a member organization, or replace the one with the same name.
    pub fn set_organization(&mut self, organization: &Organization) -> Result<(), ConfigTxError> {
        let group = organization.to_group()?;
        self.group.groups.insert(organization.name.clone(), group);
        debug!(consortium = %self.name, organization = %organization.name, "Set consortium organization");
        Ok(())
    }

    /// Remove a member organization.
    pub fn remove_organization(&mut self, name: &str) -> Result<(), ConfigTxError> {
        self.group.remove_group(name).ok_or_else(|| {
            ConfigTxError::NotFound(format!(
                "consortium {} org {name} does not exist",
                self.name
            ))
        })?;
        debug!(consortium = %self.name, organization = name, "Removed consortium organization");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configtx_tree::ConfigValue;

    #[test]
    fn it_names_the_consortium_of_a_broken_member() {
        let mut group = ConfigGroup::new("Admins").with_group(
            "Consortium1",
            ConfigGroup::default().with_group(
                "Org1",
                ConfigGroup::default().with_value("foobar", ConfigValue::new(b"foobar".to_vec(), "")),
            ),
        );
        let consortiums = ConsortiumsGroup::new(&mut group);

        let error = consortiums.configuration().unwrap_err();

        assert_eq!(
            error.to_string(),
            "failed to retrieve organization Org1 from consortium Consortium1: config does not contain value for MSP"
        );
    }

    #[test]
    fn it_reports_a_missing_consortium() {
        let mut group = ConfigGroup::new("Admins");
        let mut consortiums = ConsortiumsGroup::new(&mut group);

        assert_eq!(
            consortiums.remove_consortium("SampleConsortium").unwrap_err(),
            ConfigTxError::NotFound("consortium SampleConsortium does not exist".into())
        );
        assert!(consortiums.consortium("SampleConsortium").is_none());
    }
}
