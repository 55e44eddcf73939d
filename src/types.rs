//! Data types for the etcd keys client

use http::HeaderMap;
use serde::{Deserialize, Serialize};

/// What the store did to produce a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Plain read
    Get,
    /// Unconditional or permissive conditional write
    Set,
    /// Key or directory removal
    Delete,
    /// Write forced onto an existing key
    Update,
    /// Write forced onto an absent key, or an in-order creation
    Create,
    /// Write guarded by `prevValue`/`prevIndex`
    CompareAndSwap,
    /// Removal guarded by `prevValue`/`prevIndex`
    CompareAndDelete,
    /// TTL ran out
    Expire,
    /// An action this client does not know about
    #[serde(other)]
    Unknown,
}

/// A key or directory as reported by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Full key path, absent for the root directory
    #[serde(default)]
    pub key: Option<String>,
    /// Scalar value; directories have none
    #[serde(default)]
    pub value: Option<String>,
    /// Whether this node is a directory
    #[serde(default)]
    pub dir: bool,
    /// Remaining time to live in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
    /// RFC 3339 expiration timestamp
    #[serde(default)]
    pub expiration: Option<String>,
    /// Index of the mutation that created this node
    #[serde(default)]
    pub created_index: u64,
    /// Index of the last mutation of this node
    #[serde(default)]
    pub modified_index: u64,
    /// Children of a directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl Node {
    /// Returns true if this node is a directory
    pub fn is_dir(&self) -> bool {
        self.dir
    }

    /// Children of a directory node; empty for scalar keys
    pub fn children(&self) -> &[Node] {
        &self.nodes
    }
}

/// Successful response to a key operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    /// What the store did
    pub action: Action,
    /// The node after the action
    pub node: Node,
    /// The node before the action, for writes and deletes that replaced something
    #[serde(default)]
    pub prev_node: Option<Node>,
    /// `X-Etcd-Index` header: store index when the response was produced
    #[serde(skip)]
    pub etcd_index: Option<u64>,
    /// `X-Raft-Index` header
    #[serde(skip)]
    pub raft_index: Option<u64>,
    /// `X-Raft-Term` header
    #[serde(skip)]
    pub raft_term: Option<u64>,
}

impl KeyResponse {
    /// Value of the node, if it is a scalar key
    pub fn value(&self) -> Option<&str> {
        self.node.value.as_deref()
    }

    /// Key of the node
    pub fn key(&self) -> Option<&str> {
        self.node.key.as_deref()
    }

    /// Fill the index fields from response headers
    pub(crate) fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.etcd_index = header_u64(headers, "x-etcd-index");
        self.raft_index = header_u64(headers, "x-raft-index");
        self.raft_term = header_u64(headers, "x-raft-term");
        self
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v: &str| v.parse().ok())
}

/// Response of the `/version` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Server version
    pub etcdserver: String,
    /// Cluster version
    pub etcdcluster: String,
}

/// Statistics a single member can report about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    /// `/stats/self`: this member's raft and traffic counters
    SelfStats,
    /// `/stats/store`: operation counters of the key space
    Store,
}

impl StatsKind {
    pub(crate) fn path_segment(self) -> &'static str {
        match self {
            StatsKind::SelfStats => "self",
            StatsKind::Store => "store",
        }
    }
}
