#![warn(missing_docs)]

//! This crate provides the versioned configuration tree of a ledger channel
//! and the algorithm that computes a [`ConfigUpdate`] between two snapshots
//! of that tree.
//!
//! The tree is made of [`ConfigGroup`] nodes. Each group holds named child
//! groups, named [`ConfigValue`] leaves (opaque, context-typed payloads) and
//! named [`ConfigPolicy`] leaves. Every node carries a version counter and a
//! mod-policy reference naming the policy that authorizes changes to it.
//!
//! ```rust
//! use configtx_tree::{ConfigGroup, ConfigUpdate};
//!
//! let original = ConfigGroup::default();
//!
//! let mut updated = original.clone();
//! updated.set_value("Capabilities", b"V3_0".to_vec(), "Admins");
//!
//! let update = ConfigUpdate::compute("mychannel", &original, &updated);
//!
//! assert!(!update.is_empty());
//! assert_eq!(update.write_set.values["Capabilities"].version, 0);
//! ```
//!
//! Payloads are compared byte for byte: the tree never interprets them. Maps
//! are ordered by name so that equal inputs always produce an identical
//! [`ConfigUpdate`], including its canonical encoding.

mod error;
pub use error::*;

mod entry;
pub use entry::*;

mod group;
pub use group::*;

mod config;
pub use config::*;

/// Computation of the read and write sets between two configuration trees.
///
/// See [`ConfigUpdate::compute`] for the entry point.
pub mod differential;
pub use differential::compute_update;
