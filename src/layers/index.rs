use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Normalized title key -> absolute path of the document it came from.
#[derive(Debug, Default, Clone)]
pub struct TitleIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl TitleIndex {
    /// Scans `root` recursively for documents. A missing root gives an empty index.
    pub fn build(root: &Path) -> Self {
        let mut entries: BTreeMap<String, PathBuf> = BTreeMap::new();
        if !root.is_dir() {
            tracing::debug!("Knowledge base {:?} does not exist, nothing to index", root);
            return Self { entries };
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !is_document(path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!("Skipping non UTF-8 file name: {:?}", path);
                continue;
            };
            let key = normalize_title(file_name);
            let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            match entries.get(&key) {
                Some(existing) => {
                    tracing::warn!(
                        "Title '{}' already indexed from {:?}, ignoring {:?}",
                        key,
                        existing,
                        absolute
                    );
                }
                None => {
                    entries.insert(key, absolute);
                }
            }
        }

        tracing::info!("Indexed {} documents under {:?}", entries.len(), root);
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display titles of every indexed document, in index order.
    pub fn document_titles(&self) -> Vec<String> {
        self.entries
            .values()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .map(document_title)
            .collect()
    }
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}

/// Human-readable title of a saved document: extension and save timestamp
/// removed, underscores turned back into spaces.
pub fn document_title(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let stem = match stem.rsplit_once('_') {
        Some((head, suffix)) if !head.is_empty() && is_timestamp(suffix) => head,
        _ => stem,
    };
    stem.replace('_', " ").trim().to_string()
}

fn is_timestamp(suffix: &str) -> bool {
    !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit())
}

/// Index key for a file name.
pub fn normalize_title(file_name: &str) -> String {
    document_title(file_name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_normalize_strips_timestamp_and_underscores() {
        assert_eq!(
            normalize_title("Attention_Is_All_You_Need_20240101120000.pdf"),
            "attention is all you need"
        );
        assert_eq!(
            normalize_title("Attention Is All You Need_20240101120000.pdf"),
            "attention is all you need"
        );
    }

    #[test]
    fn test_normalize_keeps_non_numeric_suffix() {
        assert_eq!(normalize_title("Deep_Q_Networks.pdf"), "deep q networks");
        assert_eq!(normalize_title("ResNet_v2.PDF"), "resnet v2");
    }

    #[test]
    fn test_document_title_preserves_case() {
        assert_eq!(document_title("AlphaGo_20230505101010.pdf"), "AlphaGo");
    }

    #[test]
    fn test_build_indexes_nested_pdfs_only() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("old/deeper")).unwrap();
        File::create(root.join("ResNet_20240101000000.pdf")).unwrap();
        File::create(root.join("old/deeper/AlphaGo.pdf")).unwrap();
        File::create(root.join("old/notes.txt")).unwrap();

        let index = TitleIndex::build(root);

        assert_eq!(index.len(), 2);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["alphago", "resnet"]);
        let path = index.get("alphago").unwrap();
        assert!(path.is_absolute());
        assert!(path.exists());
        assert_eq!(index.document_titles(), vec!["AlphaGo", "ResNet"]);
    }

    #[test]
    fn test_build_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let index = TitleIndex::build(&dir.path().join("missing"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_collision_keeps_first_in_walk_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        File::create(root.join("a/ResNet_20240101000000.pdf")).unwrap();
        File::create(root.join("b/ResNet_20250101000000.pdf")).unwrap();

        let index = TitleIndex::build(root);

        assert_eq!(index.len(), 1);
        let kept = index.get("resnet").unwrap();
        assert!(kept.starts_with(std::path::absolute(root.join("a")).unwrap()));
    }
}
