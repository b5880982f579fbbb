use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::layers::index::is_document;

/// Folder name -> subtree, or a document leaf (serialized as `null`).
pub type FolderTree = BTreeMap<String, FolderNode>;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FolderNode {
    Folder(FolderTree),
    Document,
}

/// Lists the documents of the knowledge base as a nested folder tree.
pub fn list_pdf_tree(root: &Path) -> Result<FolderTree> {
    let mut tree = FolderTree::new();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(tree),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read directory {}", root.display()));
        }
    };

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", root.display()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            tree.insert(name, FolderNode::Folder(list_pdf_tree(&path)?));
        } else if path.is_file() && is_document(&path) {
            tree.insert(name, FolderNode::Document);
        }
    }

    tracing::debug!("Found {} entries in {}", tree.len(), root.display());
    Ok(tree)
}
