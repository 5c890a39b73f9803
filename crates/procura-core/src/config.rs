use serde::{Deserialize, Serialize};

/// Tunables for cost accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fixed cost units charged per demand node.
    pub node_overhead: u64,
    /// Fixed cost units charged per recipe node.
    pub task_overhead: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            node_overhead: 8,
            task_overhead: 8,
        }
    }
}

/// Per-job options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Hide the requested item from stock so it is always crafted.
    pub exclude_target_from_stock: bool,
    pub resolver: ResolverConfig,
}
