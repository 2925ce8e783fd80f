use std::collections::BTreeMap;

use configtx_tree::ConfigGroup;
use serde::Serialize;
use tracing::debug;

use crate::{
    CapabilityScope, ConfigTxError, Orderer, Organization, OrganizationConfiguration,
    OrganizationGroup, Policy, PolicyScope,
    organization::organizations_configuration,
    payload::{BatchSize, BatchTimeout, ConsensusState, ConsensusType},
    policy,
    scope::read_capabilities,
    value::{read_value, write_value},
};

/// A typed summary of the orderer group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrdererConfiguration {
    /// Consensus protocol, e.g. `etcdraft`.
    pub consensus_type: String,
    /// Protocol specific options.
    pub consensus_metadata: Vec<u8>,
    /// Whether the ordering service is in maintenance.
    pub state: ConsensusState,
    /// Block cutting limits.
    pub batch_size: BatchSize,
    /// Block cutting timeout, empty when unset.
    pub batch_timeout: String,
    /// Ordering organizations by name.
    pub organizations: BTreeMap<String, OrganizationConfiguration>,
    /// Enabled orderer capabilities.
    pub capabilities: Vec<String>,
    /// Orderer-level policies.
    pub policies: BTreeMap<String, Policy>,
    /// Mod-policy of the orderer group.
    pub mod_policy: String,
}

impl OrdererConfiguration {
    pub(crate) fn from_group(group: &ConfigGroup) -> Result<Self, ConfigTxError> {
        let consensus = read_consensus_type(group)?;
        Ok(Self {
            consensus_type: consensus.consensus_type,
            consensus_metadata: consensus.metadata.into_vec(),
            state: consensus.state,
            batch_size: read_batch_size(group)?,
            batch_timeout: read_batch_timeout(group)?,
            organizations: organizations_configuration(group, |name| {
                format!("retrieving orderer org {name}")
            })?,
            capabilities: read_capabilities("orderer", group)?,
            policies: policy::get_policies(&group.policies)?,
            mod_policy: group.mod_policy.clone(),
        })
    }
}

fn read_consensus_type(group: &ConfigGroup) -> Result<ConsensusType, ConfigTxError> {
    read_value::<ConsensusType>(group)
        .map_err(|error| ConfigTxError::malformed("retrieving orderer consensus type", error))?
        .filter(|consensus| !consensus.consensus_type.is_empty())
        .ok_or_else(|| ConfigTxError::NotFound("cannot determine consensus type of orderer".into()))
}

fn read_batch_size(group: &ConfigGroup) -> Result<BatchSize, ConfigTxError> {
    Ok(read_value::<BatchSize>(group)
        .map_err(|error| ConfigTxError::malformed("retrieving orderer batch size", error))?
        .unwrap_or_default())
}

fn read_batch_timeout(group: &ConfigGroup) -> Result<String, ConfigTxError> {
    Ok(read_value::<BatchTimeout>(group)
        .map_err(|error| ConfigTxError::malformed("retrieving orderer batch timeout", error))?
        .map(|timeout| timeout.timeout)
        .unwrap_or_default())
}

/// The orderer group and the ordering organizations inside it.
pub struct OrdererGroup<'a> {
    group: &'a mut ConfigGroup,
}

impl<'a> OrdererGroup<'a> {
    pub(crate) fn new(group: &'a mut ConfigGroup) -> Self {
        Self { group }
    }

    /// Decode the ordering parameters and every organization.
    ///
    /// Fails when no consensus type is set.
    pub fn configuration(&self) -> Result<OrdererConfiguration, ConfigTxError> {
        OrdererConfiguration::from_group(self.group)
    }

    /// The consensus protocol, its options and state.
    pub fn consensus_type(&self) -> Result<ConsensusType, ConfigTxError> {
        read_consensus_type(self.group)
    }

    /// Switch the consensus protocol, keeping its options and state.
    pub fn set_consensus_type(&mut self, consensus_type: &str) -> Result<(), ConfigTxError> {
        if consensus_type.is_empty() {
            return Err(ConfigTxError::InvalidArgument(
                "non empty consensus type is required".into(),
            ));
        }
        let mut consensus = read_value::<ConsensusType>(self.group)
            .map_err(|error| ConfigTxError::malformed("retrieving orderer consensus type", error))?
            .unwrap_or_default();
        consensus.consensus_type = consensus_type.to_string();
        write_value(self.group, &consensus)?;
        debug!(consensus_type, "Set consensus type");
        Ok(())
    }

    /// Put the ordering service into, or take it out of, maintenance.
    pub fn set_consensus_state(&mut self, state: ConsensusState) -> Result<(), ConfigTxError> {
        let mut consensus = read_consensus_type(self.group)?;
        consensus.state = state;
        write_value(self.group, &consensus)?;
        debug!(?state, "Set consensus state");
        Ok(())
    }

    /// Block cutting limits, all zero when unset.
    pub fn batch_size(&self) -> Result<BatchSize, ConfigTxError> {
        read_batch_size(self.group)
    }

    /// Replace the block cutting limits.
    pub fn set_batch_size(&mut self, batch_size: BatchSize) -> Result<(), ConfigTxError> {
        if batch_size.max_message_count == 0 {
            return Err(ConfigTxError::InvalidArgument(
                "batch size max message count must be greater than zero".into(),
            ));
        }
        if batch_size.absolute_max_bytes == 0 {
            return Err(ConfigTxError::InvalidArgument(
                "batch size absolute max bytes must be greater than zero".into(),
            ));
        }
        if batch_size.preferred_max_bytes > batch_size.absolute_max_bytes {
            return Err(ConfigTxError::InvalidArgument(format!(
                "batch size preferred max bytes {} exceeds absolute max bytes {}",
                batch_size.preferred_max_bytes, batch_size.absolute_max_bytes
            )));
        }
        write_value(self.group, &batch_size)?;
        debug!(
            max_message_count = batch_size.max_message_count,
            "Set batch size"
        );
        Ok(())
    }

    /// Block cutting timeout, empty when unset.
    pub fn batch_timeout(&self) -> Result<String, ConfigTxError> {
        read_batch_timeout(self.group)
    }

    /// Replace the block cutting timeout, e.g. `2s`.
    pub fn set_batch_timeout(&mut self, timeout: &str) -> Result<(), ConfigTxError> {
        if timeout.is_empty() {
            return Err(ConfigTxError::InvalidArgument(
                "non empty batch timeout is required".into(),
            ));
        }
        write_value(
            self.group,
            &BatchTimeout {
                timeout: timeout.to_string(),
            },
        )?;
        debug!(timeout, "Set batch timeout");
        Ok(())
    }

    /// Names of the ordering organizations.
    pub fn organization_names(&self) -> Vec<String> {
        self.group.groups.keys().cloned().collect()
    }

    /// A view over one ordering organization.
    pub fn organization(&mut self, name: &str) -> Option<OrganizationGroup<'_, Orderer>> {
        self.group
            .group_mut(name)
            .map(|group| OrganizationGroup::new(name, group))
    }

    /// Add an organization, or replace the one with the same name.
    pub fn set_organization(&mut self, organization: &Organization) -> Result<(), ConfigTxError> {
        let group = organization.to_group()?;
        self.group.groups.insert(organization.name.clone(), group);
        debug!(organization = %organization.name, "Set orderer organization");
        Ok(())
    }

    /// Remove an organization.
    pub fn remove_organization(&mut self, name: &str) -> Result<(), ConfigTxError> {
        self.group.remove_group(name).ok_or_else(|| {
            ConfigTxError::NotFound(format!("orderer org {name} does not exist"))
        })?;
        debug!(organization = name, "Removed orderer organization");
        Ok(())
    }
}

impl PolicyScope for OrdererGroup<'_> {
    const SCOPE: &'static str = "orderer";

    fn config_group(&self) -> &ConfigGroup {
        self.group
    }

    fn config_group_mut(&mut self) -> &mut ConfigGroup {
        self.group
    }
}

impl CapabilityScope for OrdererGroup<'_> {}
