//! Cluster membership store.
//!
//! The membership store holds the identity of every cluster node and a
//! small set of per-feature configuration documents. Steps only read
//! nodes; configuration is read and merged through [`read_config_or_default`].

mod local;
mod store;

pub use local::LocalMembershipStore;
pub use store::{find_node, read_config_or_default, ClusterNode, ConfigMap, MembershipStore};
