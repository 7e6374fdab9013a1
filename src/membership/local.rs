//! Local file-based membership store.
//!
//! The whole store is one JSON document holding the node list and the
//! configuration documents by key. Every write goes to a temporary file
//! which is then renamed over the store file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

use super::store::{ClusterNode, ConfigMap, MembershipStore};

/// On-disk layout of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    nodes: Vec<ClusterNode>,
    #[serde(default)]
    config: BTreeMap<String, ConfigMap>,
}

/// Local file-based membership store.
#[derive(Debug)]
pub struct LocalMembershipStore {
    /// Path to the store file.
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl LocalMembershipStore {
    /// Creates a store backed by the given file. The file is created on
    /// first write.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path to the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a node, replacing any node with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn add_node(&self, node: ClusterNode) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;

        info!("Adding node {} (machine {})", node.name, node.machine_id);
        doc.nodes.retain(|n| n.name != node.name);
        doc.nodes.push(node);
        self.save(&doc).await
    }

    /// Removes a node by name.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if no such node is registered.
    pub async fn remove_node(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;

        let before = doc.nodes.len();
        doc.nodes.retain(|n| n.name != name);
        if doc.nodes.len() == before {
            return Err(StoreError::node_not_found(name).into());
        }

        info!("Removing node {name}");
        self.save(&doc).await
    }

    async fn load(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            debug!("Store file does not exist: {}", self.path.display());
            return Ok(StoreDocument::default());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| StoreError::Corrupted {
            message: format!("Failed to read store file: {e}"),
        })?;

        let doc = serde_json::from_str(&content).map_err(|e| StoreError::Corrupted {
            message: format!("Failed to parse store file: {e}"),
        })?;

        Ok(doc)
    }

    async fn save(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::WriteFailed {
                message: format!("Failed to create store directory: {e}"),
            })?;
        }

        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::serialization(format!("Failed to serialize store: {e}")))?;

        let temp_path = self.path.with_extension("tmp");
        let write_failed = |e: std::io::Error| StoreError::WriteFailed {
            message: format!("{}: {e}", temp_path.display()),
        };

        let mut file = fs::File::create(&temp_path).await.map_err(write_failed)?;
        file.write_all(content.as_bytes()).await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| StoreError::WriteFailed {
            message: format!("Failed to rename store file: {e}"),
        })?;

        debug!("Store saved to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for LocalMembershipStore {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
        Ok(self.load().await?.nodes)
    }

    async fn read_config(&self, key: &str) -> Result<ConfigMap> {
        self.load()
            .await?
            .config
            .remove(key)
            .ok_or_else(|| StoreError::not_found(key).into())
    }

    async fn update_config(&self, key: &str, value: &ConfigMap) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;

        debug!("Updating config {key}");
        doc.config.insert(key.to_string(), value.clone());
        self.save(&doc).await
    }
}
