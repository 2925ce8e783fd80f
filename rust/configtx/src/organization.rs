use std::collections::BTreeMap;
use std::marker::PhantomData;

use configtx_tree::ConfigGroup;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::{
    ADMINS_POLICY_KEY, ConfigTxError, Msp, MspGroup, Policy, PolicyScope,
    msp::read_msp,
    payload::{Address, AnchorPeers, Endpoints},
    policy,
    value::{read_value, write_value},
};

/// Marker for organizations of the application group.
#[derive(Clone, Copy, Debug)]
pub struct Application;

/// Marker for organizations of the orderer group.
#[derive(Clone, Copy, Debug)]
pub struct Orderer;

/// Marker for organizations of a consortium.
#[derive(Clone, Copy, Debug)]
pub struct ConsortiumMember;

/// A new organization: its membership and its policies.
#[derive(Clone, Debug)]
pub struct Organization {
    /// Name of the organization's group.
    pub name: String,
    /// Policies of the organization.
    pub policies: BTreeMap<String, Policy>,
    /// The organization's membership descriptor.
    pub msp: Msp,
}

impl Organization {
    pub(crate) fn to_group(&self) -> Result<ConfigGroup, ConfigTxError> {
        let mut group = ConfigGroup::new(ADMINS_POLICY_KEY);
        policy::set_policies(&mut group, &self.policies)?;
        write_value(&mut group, &self.msp.to_config()?)?;
        Ok(group)
    }
}

/// A typed summary of an organization.
///
/// Anchor peers are only ever set on application organizations and
/// endpoints on ordering ones; the other list is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrganizationConfiguration {
    /// Name of the organization's group.
    pub name: String,
    /// Policies of the organization.
    pub policies: BTreeMap<String, Policy>,
    /// The organization's membership descriptor, serialized in stored form.
    #[serde(serialize_with = "serialize_msp")]
    pub msp: Msp,
    /// Anchor peers of an application organization.
    pub anchor_peers: Vec<Address>,
    /// Endpoints of an ordering organization.
    pub endpoints: Vec<String>,
    /// Mod-policy of the organization's group.
    pub mod_policy: String,
}

fn serialize_msp<S: Serializer>(msp: &Msp, serializer: S) -> Result<S::Ok, S::Error> {
    msp.to_config()
        .map_err(serde::ser::Error::custom)?
        .serialize(serializer)
}

impl OrganizationConfiguration {
    pub(crate) fn from_group(name: &str, group: &ConfigGroup) -> Result<Self, ConfigTxError> {
        Ok(Self {
            name: name.to_string(),
            msp: read_msp(name, group)?,
            policies: policy::get_policies(&group.policies)?,
            anchor_peers: read_anchor_peers(name, group)?,
            endpoints: read_endpoints(name, group)?,
            mod_policy: group.mod_policy.clone(),
        })
    }
}

/// Summaries of every organization under `group`, each failure prefixed by
/// `context` applied to the organization's name.
pub(crate) fn organizations_configuration(
    group: &ConfigGroup,
    context: impl Fn(&str) -> String,
) -> Result<BTreeMap<String, OrganizationConfiguration>, ConfigTxError> {
    group
        .groups
        .iter()
        .map(|(name, organization)| {
            OrganizationConfiguration::from_group(name, organization)
                .map(|configuration| (name.clone(), configuration))
                .map_err(|error| error.context(context(name)))
        })
        .collect()
}

fn read_anchor_peers(name: &str, group: &ConfigGroup) -> Result<Vec<Address>, ConfigTxError> {
    Ok(read_value::<AnchorPeers>(group)
        .map_err(|error| ConfigTxError::malformed(format!("retrieving anchor peers of {name}"), error))?
        .map(|peers| peers.anchor_peers)
        .unwrap_or_default())
}

fn read_endpoints(name: &str, group: &ConfigGroup) -> Result<Vec<String>, ConfigTxError> {
    Ok(read_value::<Endpoints>(group)
        .map_err(|error| ConfigTxError::malformed(format!("retrieving endpoints of {name}"), error))?
        .map(|endpoints| endpoints.addresses)
        .unwrap_or_default())
}

/// An organization inside the application group, the orderer group or a
/// consortium.
///
/// The marker `K` selects the operations that only make sense for one kind:
/// anchor peers for application organizations, endpoints for ordering ones.
pub struct OrganizationGroup<'a, K> {
    name: String,
    group: &'a mut ConfigGroup,
    kind: PhantomData<K>,
}

impl<'a, K> OrganizationGroup<'a, K> {
    pub(crate) fn new(name: &str, group: &'a mut ConfigGroup) -> Self {
        Self {
            name: name.to_string(),
            group,
            kind: PhantomData,
        }
    }

    /// Name of the organization.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The organization's membership descriptor.
    pub fn msp(&mut self) -> MspGroup<'_> {
        MspGroup::new(&self.name, self.group)
    }

    /// A typed summary of the organization.
    pub fn configuration(&self) -> Result<OrganizationConfiguration, ConfigTxError> {
        OrganizationConfiguration::from_group(&self.name, self.group)
    }
}

impl<K> PolicyScope for OrganizationGroup<'_, K> {
    const SCOPE: &'static str = "organization";

    fn config_group(&self) -> &ConfigGroup {
        self.group
    }

    fn config_group_mut(&mut self) -> &mut ConfigGroup {
        self.group
    }
}

impl OrganizationGroup<'_, Application> {
    /// The organization's anchor peers, empty when absent.
    pub fn anchor_peers(&self) -> Result<Vec<Address>, ConfigTxError> {
        read_anchor_peers(&self.name, self.group)
    }

    /// Add an anchor peer. Adding one that is already listed changes nothing.
    pub fn add_anchor_peer(&mut self, peer: Address) -> Result<(), ConfigTxError> {
        let mut anchor_peers = self.anchor_peers()?;
        if anchor_peers.contains(&peer) {
            return Ok(());
        }
        debug!(organization = %self.name, peer = %peer, "Adding anchor peer");
        anchor_peers.push(peer);
        write_value(self.group, &AnchorPeers { anchor_peers })
    }

    /// Remove an anchor peer.
    pub fn remove_anchor_peer(&mut self, peer: &Address) -> Result<(), ConfigTxError> {
        let mut anchor_peers = self.anchor_peers()?;
        let Some(position) = anchor_peers.iter().position(|candidate| candidate == peer) else {
            return Err(ConfigTxError::NotFound(format!(
                "could not find anchor peer {peer} in {}'s anchor peer endpoints",
                self.name
            )));
        };
        anchor_peers.remove(position);
        debug!(organization = %self.name, peer = %peer, "Removing anchor peer");
        write_value(self.group, &AnchorPeers { anchor_peers })
    }
}

impl OrganizationGroup<'_, Orderer> {
    /// The organization's endpoints, empty when absent.
    pub fn endpoints(&self) -> Result<Vec<String>, ConfigTxError> {
        read_endpoints(&self.name, self.group)
    }

    /// Add an endpoint. Adding one that is already listed changes nothing.
    pub fn add_endpoint(&mut self, endpoint: Address) -> Result<(), ConfigTxError> {
        let mut addresses = self.endpoints()?;
        let endpoint = endpoint.to_string();
        if addresses.contains(&endpoint) {
            return Ok(());
        }
        debug!(organization = %self.name, endpoint = %endpoint, "Adding endpoint");
        addresses.push(endpoint);
        write_value(self.group, &Endpoints { addresses })
    }

    /// Remove an endpoint.
    pub fn remove_endpoint(&mut self, endpoint: &Address) -> Result<(), ConfigTxError> {
        let mut addresses = self.endpoints()?;
        let endpoint = endpoint.to_string();
        let Some(position) = addresses.iter().position(|candidate| *candidate == endpoint) else {
            return Err(ConfigTxError::NotFound(format!(
                "could not find endpoint {endpoint} in {}",
                self.name
            )));
        };
        addresses.remove(position);
        debug!(organization = %self.name, endpoint = %endpoint, "Removing endpoint");
        write_value(self.group, &Endpoints { addresses })
    }
}
