//! NUMA topology: the nodes of the machine and the caches behind each one

use serde::{Deserialize, Serialize};
use std::fs;

use super::memory_cache::{caches_for_node, MemoryCache};
use crate::error::{Error, Result};
use crate::Context;

/// One NUMA node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub caches: Vec<MemoryCache>,
}

impl Node {
    /// Discover a single node, failing if it does not exist
    pub fn detect(ctx: &Context, node_id: u32) -> Result<Self> {
        if !node_exists(ctx, node_id) {
            return Err(Error::NodeNotFound(node_id));
        }
        Ok(Node {
            id: node_id,
            caches: caches_for_node(ctx, node_id)?,
        })
    }

    /// Distinct logical processors behind this node's caches
    pub fn logical_processors(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .caches
            .iter()
            .flat_map(|cache| cache.logical_processors.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// All NUMA nodes, ascending by ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyInfo {
    pub nodes: Vec<Node>,
}

impl TopologyInfo {
    pub fn detect(ctx: &Context) -> Result<Self> {
        let nodes = node_ids(ctx)?
            .into_iter()
            .map(|id| Node::detect(ctx, id))
            .collect::<Result<Vec<_>>>()?;
        Ok(TopologyInfo { nodes })
    }

    pub fn is_numa(&self) -> bool {
        self.nodes.len() > 1
    }
}

/// Whether `{node_root}/node{N}` is present
pub fn node_exists(ctx: &Context, node_id: u32) -> bool {
    ctx.paths().node(node_id).is_dir()
}

/// IDs of every `node<N>` directory under the node root
pub fn node_ids(ctx: &Context) -> Result<Vec<u32>> {
    let root = &ctx.paths().sys_devices_system_node;
    let entries = fs::read_dir(root).map_err(|e| Error::read_dir(root, e))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_dir(root, e))?;
        let name = entry.file_name();
        let Some(digits) = name.to_str().and_then(|n| n.strip_prefix("node")) else {
            continue;
        };
        if let Ok(id) = digits.parse::<u32>() {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}
