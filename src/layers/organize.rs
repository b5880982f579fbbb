use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::layers::index::TitleIndex;
use crate::layers::resolution::{SequenceRatio, Similarity, TitleResolver};
use crate::layers::{ActionRecord, GroupMapping};

/// Moves documents of the knowledge base into one folder per group.
///
/// Each run indexes the tree once, resolves every title against that snapshot,
/// moves matched files and finally prunes directories the moves left empty.
/// The tree is not locked: running two reorganizations at once, or writing to
/// the tree from elsewhere during a run, is unsupported.
pub struct Reorganizer<S: Similarity = SequenceRatio> {
    root: PathBuf,
    resolver: TitleResolver<S>,
}

impl Reorganizer<SequenceRatio> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_resolver(root, TitleResolver::default())
    }
}

impl<S: Similarity> Reorganizer<S> {
    pub fn with_resolver(root: impl Into<PathBuf>, resolver: TitleResolver<S>) -> Self {
        Self {
            root: root.into(),
            resolver,
        }
    }

    /// Indexes the knowledge base and reorganizes it. Only an unusable root is
    /// an error; everything else ends up in the returned records.
    pub fn run(&self, groups: &GroupMapping) -> Result<Vec<ActionRecord>> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create knowledge base {}", self.root.display())
        })?;
        let index = TitleIndex::build(&self.root);
        Ok(self.apply(&index, groups))
    }

    /// Moves the files of `groups` as resolved against `index`, then prunes
    /// the folders left empty.
    pub fn apply(&self, index: &TitleIndex, groups: &GroupMapping) -> Vec<ActionRecord> {
        let mut records = Vec::new();
        let mut destinations: HashSet<PathBuf> = HashSet::new();
        let mut claimed: HashSet<&str> = HashSet::new();

        for (group, titles) in groups.iter() {
            let Some(folder_name) = folder_name(group) else {
                tracing::warn!("Skipping group with unusable name: '{}'", group);
                records.push(ActionRecord::InvalidGroup {
                    group: group.to_string(),
                });
                continue;
            };
            let destination = self.root.join(&folder_name);
            if let Err(e) = fs::create_dir_all(&destination) {
                tracing::error!("Failed to create folder {}: {}", destination.display(), e);
                records.push(ActionRecord::FolderFailed {
                    group: group.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
            destinations.insert(destination.clone());

            for title in titles {
                let Some((key, _)) = self.resolver.resolve(title, index.keys()) else {
                    tracing::warn!("No file matches title '{}'", title);
                    records.push(ActionRecord::Warning {
                        title: title.clone(),
                    });
                    continue;
                };
                if !claimed.insert(key) {
                    tracing::warn!("File for '{}' was already placed by an earlier group", title);
                    records.push(ActionRecord::Warning {
                        title: title.clone(),
                    });
                    continue;
                }
                let Some(source) = index.get(key) else {
                    continue;
                };
                if let Some(record) = move_into(source, &destination, &folder_name) {
                    records.push(record);
                }
            }
        }

        records.extend(remove_empty_dirs(&self.root, &destinations));
        records
    }
}

/// Folder name for a group: spaces and path separators become underscores.
/// Names that would not stay inside the knowledge base are rejected.
pub fn folder_name(group: &str) -> Option<String> {
    let name = group.trim().replace([' ', '/', '\\'], "_");
    match name.as_str() {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

/// Moves `source` into `destination` unless a file with the same name is
/// already there, in which case nothing is recorded.
fn move_into(source: &Path, destination: &Path, folder_name: &str) -> Option<ActionRecord> {
    let file_name = source.file_name()?;
    let target = destination.join(file_name);
    let file = file_name.to_string_lossy().into_owned();
    if target.exists() {
        tracing::debug!("{} is already in {}", file, folder_name);
        return None;
    }

    match fs::rename(source, &target) {
        Ok(()) => {
            tracing::info!("Moved {} to {}", file, folder_name);
            Some(ActionRecord::Moved {
                file,
                folder: folder_name.to_string(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to move {}: {}", source.display(), e);
            Some(ActionRecord::MoveFailed {
                file,
                reason: e.to_string(),
            })
        }
    }
}

/// Removes empty directories below `root`, deepest first, skipping `keep`.
/// The root itself is never removed.
pub fn remove_empty_dirs(root: &Path, keep: &HashSet<PathBuf>) -> Vec<ActionRecord> {
    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry during cleanup: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();

    // Deepest first so parents emptied by their children are seen as empty
    dirs.into_iter()
        .rev()
        .filter(|dir| !keep.contains(dir))
        .filter_map(prune_dir)
        .collect()
}

/// Removes `dir` if it is empty. Non-empty folders give no record.
fn prune_dir(dir: PathBuf) -> Option<ActionRecord> {
    let is_empty = match fs::read_dir(&dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", dir.display(), e);
            return Some(ActionRecord::CleanupError {
                folder: dir,
                reason: e.to_string(),
            });
        }
    };
    if !is_empty {
        return None;
    }

    match fs::remove_dir(&dir) {
        Ok(()) => {
            tracing::info!("Removed empty folder {}", dir.display());
            Some(ActionRecord::CleanupNote { folder: dir })
        }
        Err(e) => {
            tracing::warn!("Failed to remove {}: {}", dir.display(), e);
            Some(ActionRecord::CleanupError {
                folder: dir,
                reason: e.to_string(),
            })
        }
    }
}
