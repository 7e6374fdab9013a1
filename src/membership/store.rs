//! Membership store trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Configuration document stored under one key.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// A member node of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Node (host) name.
    pub name: String,
    /// Deployment controller machine id of the node.
    #[serde(rename = "machineid")]
    pub machine_id: String,
}

/// Trait for membership store backends.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Lists all cluster nodes.
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>>;

    /// Reads the configuration document stored under `key`.
    ///
    /// Fails with `ConfigItemNotFound` when nothing is stored.
    async fn read_config(&self, key: &str) -> Result<ConfigMap>;

    /// Replaces the configuration document stored under `key`.
    async fn update_config(&self, key: &str, value: &ConfigMap) -> Result<()>;
}

/// Looks a node up by name.
///
/// # Errors
///
/// Returns `NodeNotFound` if no member has this name.
pub async fn find_node(store: &dyn MembershipStore, name: &str) -> Result<ClusterNode> {
    store
        .list_nodes()
        .await?
        .into_iter()
        .find(|n| n.name == name)
        .ok_or_else(|| StoreError::node_not_found(name).into())
}

/// Reads a configuration document, treating an absent key as empty.
///
/// # Errors
///
/// Returns any store error other than `ConfigItemNotFound`.
pub async fn read_config_or_default(store: &dyn MembershipStore, key: &str) -> Result<ConfigMap> {
    match store.read_config(key).await {
        Ok(config) => Ok(config),
        Err(e) if e.is_config_item_not_found() => {
            debug!("{e}, using an empty document");
            Ok(ConfigMap::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{node, MockStore};

    #[tokio::test]
    async fn test_find_node() {
        let mut store = MockStore::new();
        store
            .expect_list_nodes()
            .returning(|| Ok(vec![node("node-1", "1"), node("node-2", "2")]));

        let found = find_node(&store, "node-2").await.expect("node");
        assert_eq!(found.machine_id, "2");

        let missing = find_node(&store, "node-3").await;
        assert!(missing.is_err_and(|e| e.kind() == ErrorKind::NodeNotFound));
    }

    #[tokio::test]
    async fn test_read_config_or_default_swallows_missing_key() {
        let mut store = MockStore::new();
        store
            .expect_read_config()
            .returning(|key| Err(StoreError::not_found(key).into()));

        let config = read_config_or_default(&store, "TerraformVarsMicroceph").await;
        tokio_test::assert_ok!(&config);
        assert!(config.map(|c| c.is_empty()).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_read_config_or_default_keeps_other_errors() {
        let mut store = MockStore::new();
        store.expect_read_config().returning(|_| {
            Err(StoreError::Corrupted {
                message: String::from("bad json"),
            }
            .into())
        });

        let result = read_config_or_default(&store, "TerraformVarsMicroceph").await;
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::Store));
    }

    #[test]
    fn test_node_uses_machineid_field() {
        let parsed: ClusterNode =
            serde_json::from_str(r#"{"name": "node-1", "machineid": "0"}"#).expect("node");
        assert_eq!(parsed, node("node-1", "0"));
    }
}
