use std::collections::BTreeMap;

use configtx_tree::ConfigGroup;
use serde::Serialize;
use tracing::debug;

use crate::{
    APPLICATION_GROUP_KEY, ApplicationConfiguration, CONSORTIUMS_GROUP_KEY, CapabilityScope,
    ConfigTxError, ConsortiumConfiguration, ORDERER_ADDRESSES_KEY, ORDERER_GROUP_KEY,
    OrdererConfiguration, Policy, PolicyScope,
    consortiums::consortiums_configuration,
    payload::{Consortium, OrdererAddresses},
    value::read_value,
};

/// The channel group: the root of the configuration tree.
pub struct ChannelGroup<'a> {
    group: &'a mut ConfigGroup,
}

/// A typed summary of the channel group and the groups below it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelConfiguration {
    /// The consortium the channel was created under, empty when unset.
    pub consortium: String,
    /// The application group, when present.
    pub application: Option<ApplicationConfiguration>,
    /// The orderer group, when present.
    pub orderer: Option<OrdererConfiguration>,
    /// Consortiums of an ordering system channel, in name order.
    pub consortiums: Vec<ConsortiumConfiguration>,
    /// Enabled channel capabilities.
    pub capabilities: Vec<String>,
    /// Channel-level policies.
    pub policies: BTreeMap<String, Policy>,
    /// Legacy orderer addresses.
    pub orderer_addresses: Vec<String>,
    /// Mod-policy of the channel group.
    pub mod_policy: String,
}

impl<'a> ChannelGroup<'a> {
    pub(crate) fn new(group: &'a mut ConfigGroup) -> Self {
        Self { group }
    }

    /// Decode the whole channel: its own values and policies, and the
    /// application, orderer and consortiums groups with their
    /// organizations. Fails with the first decode error.
    pub fn configuration(&self) -> Result<ChannelConfiguration, ConfigTxError> {
        let consortium = self.consortium()?;
        let orderer = self
            .group
            .group(ORDERER_GROUP_KEY)
            .map(OrdererConfiguration::from_group)
            .transpose()?;
        let application = self
            .group
            .group(APPLICATION_GROUP_KEY)
            .map(ApplicationConfiguration::from_group)
            .transpose()?;
        let consortiums = self
            .group
            .group(CONSORTIUMS_GROUP_KEY)
            .map(consortiums_configuration)
            .transpose()?
            .unwrap_or_default();

        Ok(ChannelConfiguration {
            consortium,
            application,
            orderer,
            consortiums,
            policies: self.policies()?,
            capabilities: self.capabilities()?,
            orderer_addresses: self.orderer_addresses()?,
            mod_policy: self.group.mod_policy.clone(),
        })
    }

    /// The consortium the channel was created under, empty when unset.
    pub fn consortium(&self) -> Result<String, ConfigTxError> {
        Ok(read_value::<Consortium>(self.group)
            .map_err(|error| ConfigTxError::malformed("retrieving channel consortium", error))?
            .map(|consortium| consortium.name)
            .unwrap_or_default())
    }

    /// The legacy channel-wide orderer addresses, empty when absent.
    pub fn orderer_addresses(&self) -> Result<Vec<String>, ConfigTxError> {
        Ok(read_value::<OrdererAddresses>(self.group)
            .map_err(|error| ConfigTxError::malformed("retrieving orderer addresses", error))?
            .map(|addresses| addresses.addresses)
            .unwrap_or_default())
    }

    /// Drop the legacy channel-wide orderer addresses, if present.
    pub fn remove_legacy_orderer_addresses(&mut self) {
        if self.group.remove_value(ORDERER_ADDRESSES_KEY).is_some() {
            debug!("Removed legacy orderer addresses");
        }
    }
}

impl PolicyScope for ChannelGroup<'_> {
    const SCOPE: &'static str = "channel";

    fn config_group(&self) -> &ConfigGroup {
        self.group
    }

    fn config_group_mut(&mut self) -> &mut ConfigGroup {
        self.group
    }
}

impl CapabilityScope for ChannelGroup<'_> {}
