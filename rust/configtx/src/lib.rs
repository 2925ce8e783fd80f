#![warn(missing_docs)]

//! Build and modify the configuration of a permissioned ledger channel, and
//! compute the update proposal that moves a channel from its current
//! configuration to the modified one.
//!
//! A [`ConfigTx`] is opened over a [`Config`]. It keeps the original intact
//! and applies every mutation to a working copy through group views:
//! [`ChannelGroup`], [`ApplicationGroup`], [`OrdererGroup`],
//! [`ConsortiumsGroup`], the [`OrganizationGroup`]s inside them, and the
//! [`MspGroup`] of each organization. [`ConfigTx::compute_update`] then diffs the two trees.
//!
//! ```rust
//! use configtx::{CapabilityScope, Config, ConfigGroup, ConfigTx, Policy, PolicyScope};
//!
//! let mut tx = ConfigTx::new(Config::new(ConfigGroup::new("Admins")));
//!
//! tx.channel().add_capability("V3_0")?;
//! tx.channel().set_policy("Readers", Policy::implicit_meta("ANY Readers"))?;
//!
//! let update = tx.compute_update("mychannel");
//! assert!(update.write_set.values.contains_key("Capabilities"));
//! assert!(update.write_set.policies.contains_key("Readers"));
//! # Ok::<(), configtx::ConfigTxError>(())
//! ```
//!
//! Every mutator either applies its change completely or fails and leaves
//! the working copy as it was.

mod error;
pub use error::*;

mod keys;
pub use keys::*;

pub mod payload;
pub use payload::{Address, BatchSize, ConsensusState, ConsensusType, CryptoConfig};

mod policy;
pub use policy::{Policy, PolicyType, get_policies, get_policy};

mod value;

mod scope;
pub use scope::*;

mod config;
pub use config::*;

mod channel;
pub use channel::*;

mod application;
pub use application::*;

mod orderer;
pub use orderer::*;

mod consortiums;
pub use consortiums::*;

mod organization;
pub use organization::*;

mod msp;
pub use msp::*;

pub use configtx_credentials::{Certificate, CertificateList, SigningIdentity};
pub use configtx_tree::{Config, ConfigGroup, ConfigUpdate};
