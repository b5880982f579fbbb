use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Ordered group name -> member titles, in the order they appeared in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMapping {
    entries: Vec<(String, Vec<String>)>,
}

impl GroupMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `title` to `group`, creating the group at the end if it is new.
    pub fn push_title(&mut self, group: &str, title: impl Into<String>) {
        let titles = self.group_mut(group);
        titles.push(title.into());
    }

    /// Registers `group` with the given titles, extending it if the name repeats.
    pub fn extend_group(&mut self, group: &str, titles: impl IntoIterator<Item = String>) {
        self.group_mut(group).extend(titles);
    }

    fn group_mut(&mut self, group: &str) -> &mut Vec<String> {
        let pos = match self.entries.iter().position(|(name, _)| name == group) {
            Some(pos) => pos,
            None => {
                self.entries.push((group.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    pub fn get(&self, group: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, titles)| titles.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, titles)| (name.as_str(), titles.as_slice()))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn title_count(&self) -> usize {
        self.entries.iter().map(|(_, titles)| titles.len()).sum()
    }

    /// Renders the mapping in the plain-text hand-off format read by
    /// [`parsing::parse_grouped_titles`]. Names and titles are flattened to a
    /// single line and lose surrounding quotes so the text parses back the same.
    pub fn to_grouped_text(&self) -> String {
        let blocks: Vec<String> = self
            .entries
            .iter()
            .map(|(name, titles)| {
                let mut block = hand_off_line(name);
                if block.is_empty() {
                    block = parsing::FALLBACK_GROUP.to_string();
                }
                for title in titles.iter().map(|t| hand_off_line(t)) {
                    if !title.is_empty() {
                        block.push_str(&format!("\n\"{}\"", title));
                    }
                }
                block
            })
            .collect();
        blocks.join("\n\n")
    }
}

fn hand_off_line(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.trim_matches('"').trim().to_string()
}

/// One entry of the log returned by a reorganize run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRecord {
    Moved { file: String, folder: String },
    Warning { title: String },
    MoveFailed { file: String, reason: String },
    InvalidGroup { group: String },
    FolderFailed { group: String, reason: String },
    CleanupNote { folder: PathBuf },
    CleanupError { folder: PathBuf, reason: String },
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRecord::Moved { file, folder } => {
                write!(f, "Moved '{}' to '{}'", file, folder)
            }
            ActionRecord::Warning { title } => {
                write!(f, "Warning: no matching file for '{}'", title)
            }
            ActionRecord::MoveFailed { file, reason } => {
                write!(f, "Failed to move '{}': {}", file, reason)
            }
            ActionRecord::InvalidGroup { group } => {
                write!(f, "Warning: group name '{}' cannot be used as a folder", group)
            }
            ActionRecord::FolderFailed { group, reason } => {
                write!(f, "Failed to create folder for group '{}': {}", group, reason)
            }
            ActionRecord::CleanupNote { folder } => {
                write!(f, "Removed empty folder: {}", folder.display())
            }
            ActionRecord::CleanupError { folder, reason } => {
                write!(f, "Failed to remove folder {}: {}", folder.display(), reason)
            }
        }
    }
}

/// A paper offered to the user that may later be saved into the knowledge base.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recommendation {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

pub mod classification;
pub mod download;
pub mod index;
pub mod library;
pub mod organize;
pub mod parsing;
pub mod resolution;
pub mod selection;
