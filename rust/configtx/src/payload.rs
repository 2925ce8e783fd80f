//! Typed payloads of configuration values and policy rules.
//!
//! The tree stores every payload as opaque bytes. Each payload type here is
//! bound to the context key it is stored under and knows how to encode
//! itself to, and decode itself from, those bytes. Payloads are encoded as
//! DAG-CBOR; an empty byte string decodes to the payload's default, so a
//! freshly created value with no content reads as an empty payload.

use std::collections::BTreeSet;
use std::fmt;

use configtx_credentials::CredentialError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_bytes::ByteBuf;
use thiserror::Error;

use crate::{
    ANCHOR_PEERS_KEY, BATCH_SIZE_KEY, BATCH_TIMEOUT_KEY, CAPABILITIES_KEY, CONSENSUS_TYPE_KEY,
    CONSORTIUM_KEY, ENDPOINTS_KEY, MSP_KEY, ORDERER_ADDRESSES_KEY,
};

/// Failures of the payload codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A payload could not be encoded.
    #[error("marshaling {name}: {message}")]
    Encode {
        /// Name of the payload type.
        name: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A payload could not be decoded.
    #[error("unmarshaling {name}: {message}")]
    Decode {
        /// Name of the payload type.
        name: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// No payload type is bound to the context key.
    #[error("unknown context key '{0}'")]
    UnknownKey(String),

    /// Certificate material embedded in a payload is unreadable.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// A payload that can be stored as the content of a value or policy.
pub trait ConfigPayload: Serialize + DeserializeOwned + Default {
    /// Name used when reporting codec failures.
    const NAME: &'static str;

    /// Encode this payload.
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|error| CodecError::Encode {
            name: Self::NAME,
            message: error.to_string(),
        })
    }

    /// Decode a payload. Empty bytes decode to the default payload.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_ipld_dagcbor::from_slice(bytes).map_err(|error| CodecError::Decode {
            name: Self::NAME,
            message: error.to_string(),
        })
    }
}

/// A payload bound to the context key of a value.
pub trait ValuePayload: ConfigPayload {
    /// The context key values of this type are stored under.
    const KEY: &'static str;
}

/// A set of named feature capabilities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Enabled capability names.
    pub capabilities: BTreeSet<String>,
}

impl ConfigPayload for Capabilities {
    const NAME: &'static str = "capabilities";
}

impl ValuePayload for Capabilities {
    const KEY: &'static str = CAPABILITIES_KEY;
}

/// Legacy channel-wide ordering service addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdererAddresses {
    /// `host:port` addresses.
    pub addresses: Vec<String>,
}

impl ConfigPayload for OrdererAddresses {
    const NAME: &'static str = "orderer addresses";
}

impl ValuePayload for OrdererAddresses {
    const KEY: &'static str = ORDERER_ADDRESSES_KEY;
}

/// The consortium a channel was created under.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consortium {
    /// Name of the consortium.
    pub name: String,
}

impl ConfigPayload for Consortium {
    const NAME: &'static str = "consortium";
}

impl ValuePayload for Consortium {
    const KEY: &'static str = CONSORTIUM_KEY;
}

/// Operating state of the ordering service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusState {
    /// Transactions are ordered.
    #[default]
    Normal,
    /// Only configuration changes are accepted.
    Maintenance,
}

/// The consensus protocol of the ordering service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusType {
    /// Protocol name, e.g. `etcdraft`.
    #[serde(rename = "type")]
    pub consensus_type: String,
    /// Protocol specific options, opaque to this crate.
    pub metadata: ByteBuf,
    /// Operating state.
    pub state: ConsensusState,
}

impl ConfigPayload for ConsensusType {
    const NAME: &'static str = "consensus type";
}

impl ValuePayload for ConsensusType {
    const KEY: &'static str = CONSENSUS_TYPE_KEY;
}

/// Limits at which the orderer cuts a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSize {
    /// Most transactions in one block.
    pub max_message_count: u32,
    /// Hard limit on the serialized size of a block's transactions.
    pub absolute_max_bytes: u32,
    /// Preferred limit on the serialized size of a block's transactions.
    pub preferred_max_bytes: u32,
}

impl ConfigPayload for BatchSize {
    const NAME: &'static str = "batch size";
}

impl ValuePayload for BatchSize {
    const KEY: &'static str = BATCH_SIZE_KEY;
}

/// How long the orderer waits before cutting a partial block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchTimeout {
    /// A duration such as `2s` or `500ms`.
    pub timeout: String,
}

impl ConfigPayload for BatchTimeout {
    const NAME: &'static str = "batch timeout";
}

impl ValuePayload for BatchTimeout {
    const KEY: &'static str = BATCH_TIMEOUT_KEY;
}

/// Endpoints of an ordering organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// `host:port` addresses.
    pub addresses: Vec<String>,
}

impl ConfigPayload for Endpoints {
    const NAME: &'static str = "endpoints";
}

impl ValuePayload for Endpoints {
    const KEY: &'static str = ENDPOINTS_KEY;
}

/// A network address.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Create an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Anchor peers of an application organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorPeers {
    /// Peer addresses reachable by other organizations.
    pub anchor_peers: Vec<Address>,
}

impl ConfigPayload for AnchorPeers {
    const NAME: &'static str = "anchor peers";
}

impl ValuePayload for AnchorPeers {
    const KEY: &'static str = ANCHOR_PEERS_KEY;
}

/// An organizational unit identifier, PEM certificate and unit name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OuIdentifierConfig {
    /// PEM certificate, empty when any certificate of the MSP applies.
    pub certificate: ByteBuf,
    /// Name of the organizational unit.
    pub organizational_unit_identifier: String,
}

/// Hash functions used by an MSP.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Hash family used for signatures, e.g. `SHA2`.
    pub signature_hash_family: String,
    /// Hash function used to compute identity identifiers, e.g. `SHA256`.
    pub identity_identifier_hash_function: String,
}

/// Node classification by organizational unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOusConfig {
    /// Whether identities are classified.
    pub enable: bool,
    /// Unit of client identities.
    pub client_ou_identifier: Option<OuIdentifierConfig>,
    /// Unit of peer identities.
    pub peer_ou_identifier: Option<OuIdentifierConfig>,
    /// Unit of admin identities.
    pub admin_ou_identifier: Option<OuIdentifierConfig>,
    /// Unit of orderer identities.
    pub orderer_ou_identifier: Option<OuIdentifierConfig>,
}

/// A membership service provider descriptor as stored in the tree.
///
/// Certificates and revocation lists are kept as PEM blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MspConfig {
    /// The MSP identifier.
    pub name: String,
    /// Root CA certificates.
    pub root_certs: Vec<ByteBuf>,
    /// Intermediate CA certificates.
    pub intermediate_certs: Vec<ByteBuf>,
    /// Administrator certificates.
    pub admins: Vec<ByteBuf>,
    /// Certificate revocation lists.
    pub revocation_list: Vec<ByteBuf>,
    /// Recognized organizational units.
    pub organizational_unit_identifiers: Vec<OuIdentifierConfig>,
    /// Hash function configuration.
    pub crypto_config: Option<CryptoConfig>,
    /// TLS root CA certificates.
    pub tls_root_certs: Vec<ByteBuf>,
    /// TLS intermediate CA certificates.
    pub tls_intermediate_certs: Vec<ByteBuf>,
    /// Node classification.
    pub node_ous: Option<NodeOusConfig>,
}

impl ConfigPayload for MspConfig {
    const NAME: &'static str = "msp config";
}

impl ValuePayload for MspConfig {
    const KEY: &'static str = MSP_KEY;
}

/// How an implicit meta policy aggregates its sub-policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImplicitMetaRule {
    /// Satisfied by any one sub-policy.
    #[default]
    Any,
    /// Satisfied when all sub-policies are.
    All,
    /// Satisfied by a strict majority of sub-policies.
    Majority,
}

/// A rule evaluated over the same-named policy of every child group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImplicitMetaPolicy {
    /// How child results are aggregated.
    pub rule: ImplicitMetaRule,
    /// Name of the policy evaluated in each child group.
    pub sub_policy: String,
}

impl ConfigPayload for ImplicitMetaPolicy {
    const NAME: &'static str = "implicit meta policy";
}

/// A boolean expression over signer identities, kept as its source text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturePolicy {
    /// The expression, e.g. `OR('Org1MSP.admin')`.
    pub rule: String,
}

impl ConfigPayload for SignaturePolicy {
    const NAME: &'static str = "signature policy";
}

/// Any typed value payload, discriminated by its context key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// A capability set.
    Capabilities(Capabilities),
    /// Channel-wide orderer addresses.
    OrdererAddresses(OrdererAddresses),
    /// Ordering organization endpoints.
    Endpoints(Endpoints),
    /// Application organization anchor peers.
    AnchorPeers(AnchorPeers),
    /// A membership descriptor.
    Msp(MspConfig),
    /// The channel's consortium.
    Consortium(Consortium),
    /// The orderer's consensus protocol.
    ConsensusType(ConsensusType),
    /// The orderer's block size limits.
    BatchSize(BatchSize),
    /// The orderer's block timeout.
    BatchTimeout(BatchTimeout),
}

impl Payload {
    /// Decode the payload stored under `key`.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(match key {
            CAPABILITIES_KEY => Payload::Capabilities(Capabilities::decode(bytes)?),
            ORDERER_ADDRESSES_KEY => Payload::OrdererAddresses(OrdererAddresses::decode(bytes)?),
            ENDPOINTS_KEY => Payload::Endpoints(Endpoints::decode(bytes)?),
            ANCHOR_PEERS_KEY => Payload::AnchorPeers(AnchorPeers::decode(bytes)?),
            MSP_KEY => Payload::Msp(MspConfig::decode(bytes)?),
            CONSORTIUM_KEY => Payload::Consortium(Consortium::decode(bytes)?),
            CONSENSUS_TYPE_KEY => Payload::ConsensusType(ConsensusType::decode(bytes)?),
            BATCH_SIZE_KEY => Payload::BatchSize(BatchSize::decode(bytes)?),
            BATCH_TIMEOUT_KEY => Payload::BatchTimeout(BatchTimeout::decode(bytes)?),
            other => return Err(CodecError::UnknownKey(other.to_string())),
        })
    }

    /// The context key this payload is stored under.
    pub fn key(&self) -> &'static str {
        match self {
            Payload::Capabilities(_) => Capabilities::KEY,
            Payload::OrdererAddresses(_) => OrdererAddresses::KEY,
            Payload::Endpoints(_) => Endpoints::KEY,
            Payload::AnchorPeers(_) => AnchorPeers::KEY,
            Payload::Msp(_) => MspConfig::KEY,
            Payload::Consortium(_) => Consortium::KEY,
            Payload::ConsensusType(_) => ConsensusType::KEY,
            Payload::BatchSize(_) => BatchSize::KEY,
            Payload::BatchTimeout(_) => BatchTimeout::KEY,
        }
    }

    /// Encode this payload.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Payload::Capabilities(payload) => payload.encode(),
            Payload::OrdererAddresses(payload) => payload.encode(),
            Payload::Endpoints(payload) => payload.encode(),
            Payload::AnchorPeers(payload) => payload.encode(),
            Payload::Msp(payload) => payload.encode(),
            Payload::Consortium(payload) => payload.encode(),
            Payload::ConsensusType(payload) => payload.encode(),
            Payload::BatchSize(payload) => payload.encode(),
            Payload::BatchTimeout(payload) => payload.encode(),
        }
    }
}
