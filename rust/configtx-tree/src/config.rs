use serde::{Deserialize, Serialize};

use crate::{ConfigGroup, ConfigTreeError, compute_update};

/// A full channel configuration: the root group and its sequence number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of updates applied to this configuration so far.
    pub sequence: u64,
    /// The root of the configuration tree.
    pub channel_group: ConfigGroup,
}

impl Config {
    /// Wrap a root group at sequence 0.
    pub fn new(channel_group: ConfigGroup) -> Self {
        Self {
            sequence: 0,
            channel_group,
        }
    }

    /// Encode this configuration in its canonical DAG-CBOR form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigTreeError> {
        serde_ipld_dagcbor::to_vec(self)
            .map_err(|error| ConfigTreeError::EncodeFailed(error.to_string()))
    }

    /// Decode a configuration from DAG-CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigTreeError> {
        serde_ipld_dagcbor::from_slice(bytes)
            .map_err(|error| ConfigTreeError::DecodeFailed(error.to_string()))
    }
}

/// A proposal to move a channel from one configuration to another.
///
/// The read set names every node whose version the proposal depends on,
/// with no payloads. The write set carries the full content of every added or
/// changed node. Both are rooted at the channel group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    /// The channel the update targets.
    pub channel_id: String,
    /// Nodes and versions the update was computed against.
    pub read_set: ConfigGroup,
    /// Nodes the update adds or changes.
    pub write_set: ConfigGroup,
}

impl ConfigUpdate {
    /// Compute the update that turns `original` into `updated`.
    pub fn compute(
        channel_id: impl Into<String>,
        original: &ConfigGroup,
        updated: &ConfigGroup,
    ) -> Self {
        let delta = compute_update(original, updated);
        Self {
            channel_id: channel_id.into(),
            read_set: delta.read_set,
            write_set: delta.write_set,
        }
    }

    /// Whether the update writes nothing.
    pub fn is_empty(&self) -> bool {
        self.write_set.is_leaf() && self.write_set.version == self.read_set.version
    }

    /// Encode this update in its canonical DAG-CBOR form.
    ///
    /// Equal updates always encode to identical bytes.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, ConfigTreeError> {
        serde_ipld_dagcbor::to_vec(self)
            .map_err(|error| ConfigTreeError::EncodeFailed(error.to_string()))
    }

    /// Decode an update from DAG-CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigTreeError> {
        serde_ipld_dagcbor::from_slice(bytes)
            .map_err(|error| ConfigTreeError::DecodeFailed(error.to_string()))
    }
}
