//! Per-compile memoization of resolved topologies.
//!
//! The cache is owned by one compiler instance and keyed by a SHA-256 digest
//! of the edge list, so a plan whose alias map changed between two calls is
//! never served a stale map.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use super::errors::TopologyError;
use super::{resolve_topology, TopologyMap};
use crate::query_plan::JoinEdge;

const FIELD_SEP: &[u8] = b"\x1f";
const EDGE_SEP: &[u8] = b"\x1e";

#[derive(Debug, Default)]
pub struct TopologyCache {
    entries: HashMap<String, Arc<TopologyMap>>,
    hits: u64,
    misses: u64,
}

impl TopologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content hash of an edge list, hex encoded.
    pub fn cache_key(edges: &[JoinEdge]) -> String {
        let mut hasher = Sha256::new();
        for edge in edges {
            hasher.update(edge.parent_alias.as_deref().unwrap_or("").as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(edge.table_name.as_bytes());
            hasher.update(FIELD_SEP);
            for (parent_column, child_column) in &edge.join_cols {
                hasher.update(parent_column.as_bytes());
                hasher.update(b"=");
                hasher.update(child_column.as_bytes());
                hasher.update(b",");
            }
            hasher.update(FIELD_SEP);
            hasher.update(edge.table_alias.as_bytes());
            hasher.update(EDGE_SEP);
        }
        hex::encode(hasher.finalize())
    }

    /// Return the cached map for these edges, resolving on first use.
    /// Resolution errors are not cached.
    pub fn get_or_resolve(&mut self, edges: &[JoinEdge]) -> Result<Arc<TopologyMap>, TopologyError> {
        let key = Self::cache_key(edges);
        if let Some(map) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("TopologyCache: hit for {}", &key[..12]);
            return Ok(Arc::clone(map));
        }

        self.misses += 1;
        let map = Arc::new(resolve_topology(edges)?);
        self.entries.insert(key, Arc::clone(&map));
        Ok(map)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
