use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::indexer::cache::META_DIR_NAME;

/// One discovered document: vault-relative id and absolute path.
#[derive(Clone, Debug, PartialEq)]
pub struct VaultDocument {
    pub doc_id: String,
    pub path: PathBuf,
}

/// Recursively enumerate the `.md` documents under a vault root.
///
/// Document ids are vault-relative with forward-slash separators regardless
/// of platform. Hidden directories (including the engine's own metadata
/// directory) are skipped. Order is deterministic (sorted by id).
pub fn enumerate_documents(vault_root: &Path) -> Result<Vec<VaultDocument>, String> {
    if !vault_root.is_dir() {
        return Err(format!("Not a valid vault directory: {:?}", vault_root));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(vault_root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let relative = path.strip_prefix(vault_root).unwrap_or(path);
        if is_hidden(relative) {
            continue;
        }
        let doc_id = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        documents.push(VaultDocument {
            doc_id,
            path: path.to_path_buf(),
        });
    }

    documents.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
    Ok(documents)
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || name == META_DIR_NAME
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_enumerates_nested_markdown_with_forward_slashes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Projects/Work")).unwrap();
        fs::write(root.join("index.md"), "root").unwrap();
        fs::write(root.join("Projects/Work/plan.md"), "plan").unwrap();
        fs::write(root.join("Projects/readme.txt"), "not markdown").unwrap();

        let docs = enumerate_documents(root).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["Projects/Work/plan.md", "index.md"]);
    }

    #[test]
    fn test_skips_hidden_and_metadata_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join(META_DIR_NAME)).unwrap();
        fs::write(root.join(".obsidian/config.md"), "x").unwrap();
        fs::write(root.join(format!("{}/cache.md", META_DIR_NAME)), "x").unwrap();
        fs::write(root.join("visible.md"), "x").unwrap();

        let docs = enumerate_documents(root).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].doc_id, "visible.md");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        assert!(enumerate_documents(Path::new("/nonexistent/vault/path")).is_err());
    }
}
