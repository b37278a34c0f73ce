//! Vault indexing engine for plain-text knowledge vaults.
//!
//! Scans a folder of markdown documents, extracts a directed wiki-link
//! graph and a task ledger, keeps both consistent as files change, and
//! serves graph analytics and full-text search without blocking the
//! caller. Documents encrypted at rest are decrypted on read through a
//! host-supplied [`crypto::VaultCipher`]; plaintext never touches disk.

pub mod crypto;
pub mod extract;
pub mod graph;
pub mod indexer;
pub mod search;
pub mod tasks;
pub mod vault;

pub use crypto::VaultCipher;
pub use extract::{extract_links, extract_tags};
pub use graph::analytics::{
    backlinks, connected_component, detect_cycles, graph_stats, isolated_nodes, GraphStats,
};
pub use graph::{build_graph, validate_graph, WikiGraph};
pub use indexer::{IndexEvent, IndexState, VaultIndexer};
pub use search::SearchResult;
pub use tasks::{extract_tasks, TaskRecord, TaskStatus};
