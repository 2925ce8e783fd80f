/// Policy that authorizes administrative changes.
pub const ADMINS_POLICY_KEY: &str = "Admins";
/// Policy that authorizes reads.
pub const READERS_POLICY_KEY: &str = "Readers";
/// Policy that authorizes writes.
pub const WRITERS_POLICY_KEY: &str = "Writers";

/// Group holding the application organizations.
pub const APPLICATION_GROUP_KEY: &str = "Application";
/// Group holding the ordering organizations.
pub const ORDERER_GROUP_KEY: &str = "Orderer";
/// Group holding the consortiums of an ordering system channel.
pub const CONSORTIUMS_GROUP_KEY: &str = "Consortiums";

/// Mod-policy of consortium groups.
pub const ORDERER_ADMINS_POLICY_NAME: &str = "/Channel/Orderer/Admins";

/// Value holding a capability set.
pub const CAPABILITIES_KEY: &str = "Capabilities";
/// Value holding an organization's membership descriptor.
pub const MSP_KEY: &str = "MSP";
/// Value holding the channel-wide orderer addresses.
pub const ORDERER_ADDRESSES_KEY: &str = "OrdererAddresses";
/// Value holding an ordering organization's endpoints.
pub const ENDPOINTS_KEY: &str = "Endpoints";
/// Value holding an application organization's anchor peers.
pub const ANCHOR_PEERS_KEY: &str = "AnchorPeers";
/// Value naming the consortium a channel belongs to.
pub const CONSORTIUM_KEY: &str = "Consortium";
/// Value holding the orderer's consensus protocol and state.
pub const CONSENSUS_TYPE_KEY: &str = "ConsensusType";
/// Value holding the orderer's block cutting limits.
pub const BATCH_SIZE_KEY: &str = "BatchSize";
/// Value holding the orderer's block cutting timeout.
pub const BATCH_TIMEOUT_KEY: &str = "BatchTimeout";

pub use configtx_credentials::CRL_VALIDITY;
