use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::WikiGraph;

/// Vault-local metadata directory holding the cache snapshot.
pub const META_DIR_NAME: &str = ".vaultindex";

const CACHE_FILE_NAME: &str = "graph-cache.json";

/// Increment when the cache structure changes; a mismatched cache is
/// treated as absent and regenerated on the next full pass.
const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheEnvelope {
    schema_version: u32,
    created_at: String,
    graph: WikiGraph,
}

fn cache_path(vault_root: &Path) -> PathBuf {
    vault_root.join(META_DIR_NAME).join(CACHE_FILE_NAME)
}

/// Atomic file write: write to a temp file in the same directory, sync,
/// then rename. A crash mid-write leaves the previous cache intact, and
/// a file watcher never observes a partially-written snapshot.
fn atomic_write_file(path: &Path, content: &[u8]) -> Result<(), String> {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{}.vaultindex-tmp", file_name));

    let mut file = fs::File::create(&temp_path)
        .map_err(|e| format!("Failed to create temp file {:?}: {}", temp_path, e))?;
    file.write_all(content)
        .map_err(|e| format!("Failed to write temp file {:?}: {}", temp_path, e))?;
    file.sync_all()
        .map_err(|e| format!("Failed to sync temp file {:?}: {}", temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path)
        .map_err(|e| format!("Failed to rename {:?} -> {:?}: {}", temp_path, path, e))?;

    Ok(())
}

/// Persist the graph snapshot under the vault's metadata directory.
pub fn save_graph(vault_root: &Path, graph: &WikiGraph) -> Result<(), String> {
    let path = cache_path(vault_root);
    let meta_dir = path.parent().unwrap_or(vault_root);
    if !meta_dir.exists() {
        fs::create_dir_all(meta_dir)
            .map_err(|e| format!("Failed to create metadata directory {:?}: {}", meta_dir, e))?;
    }

    let envelope = CacheEnvelope {
        schema_version: CACHE_SCHEMA_VERSION,
        created_at: chrono::Utc::now().to_rfc3339(),
        graph: graph.clone(),
    };
    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| format!("Failed to serialize graph cache: {}", e))?;
    atomic_write_file(&path, json.as_bytes())
}

/// Load the cached graph, if any. Absence, unreadable JSON, or a schema
/// version mismatch all yield `None`; no cache is never an error.
pub fn load_graph(vault_root: &Path) -> Option<WikiGraph> {
    let path = cache_path(vault_root);
    let content = fs::read_to_string(&path).ok()?;
    let envelope: CacheEnvelope = match serde_json::from_str(&content) {
        Ok(env) => env,
        Err(e) => {
            log::warn!("[Cache] Ignoring unreadable graph cache {:?}: {}", path, e);
            return None;
        }
    };
    if envelope.schema_version != CACHE_SCHEMA_VERSION {
        log::warn!(
            "[Cache] Schema version mismatch: cache={}, current={}. Ignoring.",
            envelope.schema_version,
            CACHE_SCHEMA_VERSION
        );
        return None;
    }
    Some(envelope.graph)
}
