//! Agent memory stream persistence.
//!
//! The memory stream is an append-only, ID-indexed log of timestamped
//! records ("nodes") persisted as a JSON array at
//! `<base_dir>/<agent_id>/memory_stream/nodes.json`. Nodes are never
//! rewritten or deleted once appended; every append rewrites the whole
//! file, which is acceptable at the expected node counts (tens to low
//! hundreds).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Errors from memory storage operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage unavailable at {path}: {detail}")]
    StorageUnavailable { path: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default salience score for observation nodes recorded by this core.
pub const DEFAULT_OBSERVATION_IMPORTANCE: i64 = 50;

/// The kind of record a node holds.
///
/// Legacy stores written by other producers may carry tags this core does
/// not generate (interview dialogue, reflections); those round-trip
/// through [`NodeType::Other`] untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Observation,
    TraitAdjustment,
    Other(String),
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "observation" => NodeType::Observation,
            "trait_adjustment" => NodeType::TraitAdjustment,
            _ => NodeType::Other(tag),
        }
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Observation => "observation".to_string(),
            NodeType::TraitAdjustment => "trait_adjustment".to_string(),
            NodeType::Other(tag) => tag,
        }
    }
}

/// A single persisted fact or event in an agent's memory stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Unique within a store, strictly increasing in append order.
    pub node_id: u64,

    /// Distinguishes ordinary observations from trait-adjustment records.
    pub node_type: NodeType,

    /// Free-text description of the event or recommendation.
    pub content: String,

    /// Salience score used by downstream retrieval weighting.
    pub importance: i64,

    /// Logical time step (turn index) when the node was created.
    pub created: u64,

    /// Logical time step when the node was last retrieved.
    pub last_retrieved: u64,

    /// Optional back-reference to a related node.
    #[serde(default)]
    pub pointer_id: Option<u64>,
}

/// A node awaiting an identifier, assigned by the store at append time.
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub node_type: NodeType,
    pub content: String,
    pub importance: i64,
    pub created: u64,
    pub last_retrieved: u64,
    pub pointer_id: Option<u64>,
}

impl NodeDraft {
    /// Create an observation draft timestamped at `time_step`.
    pub fn observation(content: impl Into<String>, time_step: u64) -> Self {
        Self {
            node_type: NodeType::Observation,
            content: content.into(),
            importance: DEFAULT_OBSERVATION_IMPORTANCE,
            created: time_step,
            last_retrieved: time_step,
            pointer_id: None,
        }
    }

    fn into_node(self, node_id: u64) -> MemoryNode {
        MemoryNode {
            node_id,
            node_type: self.node_type,
            content: self.content,
            importance: self.importance,
            created: self.created,
            last_retrieved: self.last_retrieved,
            pointer_id: self.pointer_id,
        }
    }
}

/// Path to an agent's memory stream file.
pub fn nodes_path(base_dir: impl AsRef<Path>, agent_id: Uuid) -> PathBuf {
    base_dir
        .as_ref()
        .join(agent_id.to_string())
        .join("memory_stream")
        .join("nodes.json")
}

/// An ordered, durable sequence of memory nodes for one agent.
///
/// The store is exclusively owned by one decision engine per agent
/// identifier; concurrent writers against the same backing file are
/// unsupported.
#[derive(Debug)]
pub struct MemoryStore {
    agent_id: Uuid,
    path: PathBuf,
    nodes: Vec<MemoryNode>,
}

impl MemoryStore {
    /// Load an existing memory stream.
    ///
    /// Fails with [`MemoryError::StorageUnavailable`] if the backing file
    /// is missing or corrupt. A legacy file holding a single bare node
    /// object (not wrapped in an array) is coerced into a one-element
    /// sequence rather than rejected.
    pub async fn load(base_dir: impl AsRef<Path>, agent_id: Uuid) -> Result<Self, MemoryError> {
        let path = nodes_path(base_dir, agent_id);
        let content =
            fs::read_to_string(&path)
                .await
                .map_err(|e| MemoryError::StorageUnavailable {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;

        let nodes = parse_nodes(&content).map_err(|detail| MemoryError::StorageUnavailable {
            path: path.display().to_string(),
            detail,
        })?;

        Ok(Self {
            agent_id,
            path,
            nodes,
        })
    }

    /// Load an existing memory stream, or initialize an empty one if the
    /// backing file does not exist yet.
    pub async fn open_or_create(
        base_dir: impl AsRef<Path>,
        agent_id: Uuid,
    ) -> Result<Self, MemoryError> {
        let path = nodes_path(&base_dir, agent_id);
        if fs::try_exists(&path).await? {
            return Self::load(base_dir, agent_id).await;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let store = Self {
            agent_id,
            path,
            nodes: Vec::new(),
        };
        store.flush().await?;
        Ok(store)
    }

    /// The next free node identifier: one greater than the maximum id
    /// currently present, or `1` for an empty store.
    ///
    /// Recomputed from the in-memory sequence on every call; multiple
    /// append paths (observations, trait adjustments) share this store and
    /// a cached value would go stale between them.
    pub fn next_id(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| n.node_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Assign the draft a fresh id, add it to the sequence, and persist.
    ///
    /// Returns the assigned node id. The whole file is rewritten
    /// synchronously before this returns; durability trumps throughput at
    /// this record volume.
    pub async fn append(&mut self, draft: NodeDraft) -> Result<u64, MemoryError> {
        let node_id = self.next_id();
        self.nodes.push(draft.into_node(node_id));
        self.flush().await?;
        Ok(node_id)
    }

    async fn flush(&self) -> Result<(), MemoryError> {
        let content = serde_json::to_string_pretty(&self.nodes)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    /// The agent this store belongs to.
    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The ordered node sequence.
    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Parse a memory stream file body into a node sequence.
///
/// Accepts a JSON array of nodes or, for legacy single-record files, a
/// single bare node object.
fn parse_nodes(content: &str) -> Result<Vec<MemoryNode>, String> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("not valid JSON: {e}"))?;

    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| format!("invalid node sequence: {e}"))
        }
        serde_json::Value::Object(_) => {
            let node: MemoryNode =
                serde_json::from_value(value).map_err(|e| format!("invalid node record: {e}"))?;
            Ok(vec![node])
        }
        _ => Err("top-level value is neither a sequence nor a record".to_string()),
    }
}
