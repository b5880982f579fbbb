use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::layers::Recommendation;
use crate::layers::download::Downloader;

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Failed to create number regex"));
static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("Failed to create word regex"));

/// Papers most recently recommended to the user, in the order they were shown.
#[derive(Debug, Default, Clone)]
pub struct RecommendationCache {
    papers: Vec<Recommendation>,
}

impl RecommendationCache {
    pub fn new(papers: Vec<Recommendation>) -> Self {
        Self { papers }
    }

    /// Reads a JSON array of `{ "title": ..., "url": ... }` objects.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recommendations from {}", path.display()))?;
        let papers: Vec<Recommendation> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse recommendations in {}", path.display()))?;
        Ok(Self::new(papers))
    }

    pub fn papers(&self) -> &[Recommendation] {
        &self.papers
    }

    /// Indices of the papers a free-text reply asks for: everything when it
    /// says "all", 1-based positions, and papers sharing any title word.
    pub fn select(&self, reply: &str) -> Vec<usize> {
        let lowered = reply.to_lowercase();
        let mut selected: BTreeSet<usize> = BTreeSet::new();

        if lowered.contains("all") {
            selected.extend(0..self.papers.len());
        }

        for number in RE_NUMBER.find_iter(&lowered) {
            if let Ok(position) = number.as_str().parse::<usize>() {
                if let Some(index) = position.checked_sub(1) {
                    selected.insert(index);
                }
            }
        }

        for (index, paper) in self.papers.iter().enumerate() {
            let title = paper.title.to_lowercase();
            if RE_WORD.find_iter(&title).any(|word| lowered.contains(word.as_str())) {
                selected.insert(index);
            }
        }

        selected.into_iter().filter(|&i| i < self.papers.len()).collect()
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved { title: String, path: PathBuf },
    Failed { title: String, reason: String },
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved { title, path } => {
                write!(f, "Saved '{}' to: {}", title, path.display())
            }
            SaveOutcome::Failed { title, reason } => {
                write!(f, "Failed to save '{}': {}", title, reason)
            }
        }
    }
}

/// Downloads every paper selected by `reply`, one outcome per paper.
pub async fn save_selection(
    cache: &RecommendationCache,
    reply: &str,
    downloader: &Downloader,
) -> Vec<SaveOutcome> {
    let mut outcomes = Vec::new();
    for index in cache.select(reply) {
        let paper = &cache.papers()[index];
        let title = if paper.title.trim().is_empty() {
            format!("paper_{}", index)
        } else {
            paper.title.clone()
        };

        let Some(url) = paper.url.as_deref() else {
            outcomes.push(SaveOutcome::Failed {
                title,
                reason: "no URL recorded for this paper".to_string(),
            });
            continue;
        };

        match downloader.save_arxiv_pdf(url, &title).await {
            Ok(path) => outcomes.push(SaveOutcome::Saved { title, path }),
            Err(e) => {
                tracing::warn!("Saving '{}' failed: {}", title, e);
                outcomes.push(SaveOutcome::Failed {
                    title,
                    reason: e.to_string(),
                })
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn cache() -> RecommendationCache {
        RecommendationCache::new(vec![
            Recommendation {
                title: "Attention Is All You Need".to_string(),
                url: Some("https://arxiv.org/abs/1706.03762".to_string()),
            },
            Recommendation {
                title: "Deep Residual Learning".to_string(),
                url: Some("https://arxiv.org/abs/1512.03385".to_string()),
            },
            Recommendation {
                title: "Mastering Go".to_string(),
                url: None,
            },
        ])
    }

    #[test]
    fn test_select_all() {
        assert_eq!(cache().select("Save ALL of them"), vec![0, 1, 2]);
    }

    #[test]
    fn test_select_by_position_drops_out_of_range() {
        assert_eq!(cache().select("2 and 9 and 0"), vec![1]);
    }

    #[test]
    fn test_select_by_title_word() {
        assert_eq!(cache().select("the residual one"), vec![1]);
    }

    #[test]
    fn test_select_nothing() {
        assert!(cache().select("no thanks").is_empty());
        assert!(RecommendationCache::default().select("save all").is_empty());
    }

    #[test]
    fn test_save_outcome_display_names_the_paper() {
        let saved = SaveOutcome::Saved {
            title: "ResNet".to_string(),
            path: PathBuf::from("kb/ResNet_20240101000000.pdf"),
        };
        assert_eq!(saved.to_string(), "Saved 'ResNet' to: kb/ResNet_20240101000000.pdf");
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recs.json");
        let json = r#"[
            {"title": "ResNet", "url": "https://arxiv.org/abs/1512.03385"},
            {"title": "BERT"}
        ]"#;
        fs::write(&path, json).unwrap();

        let cache = RecommendationCache::load(&path).unwrap();

        assert_eq!(cache.papers().len(), 2);
        assert_eq!(cache.papers()[1].url, None);
    }

    #[tokio::test]
    async fn test_save_selection_reports_missing_url_and_bad_host() {
        let dir = tempdir().unwrap();
        let cache = RecommendationCache::new(vec![
            Recommendation {
                title: "Mastering Go".to_string(),
                url: None,
            },
            Recommendation {
                title: "Blog Post".to_string(),
                url: Some("https://example.com/post".to_string()),
            },
        ]);
        let downloader = Downloader::new(dir.path());

        let outcomes = save_selection(&cache, "1 2", &downloader).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o, SaveOutcome::Failed { .. })));
        assert!(outcomes[1].to_string().contains("Only arXiv links"));
    }
}
