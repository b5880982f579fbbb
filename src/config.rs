use std::env;
use std::path::PathBuf;

pub const DEFAULT_KNOWLEDGE_BASE: &str = "knowledge_base";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://models.inference.ai.azure.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub knowledge_base: PathBuf,
    pub llm_endpoint: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl Config {
    /// Reads settings from the process environment (after `.env` was loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            knowledge_base: non_empty("KNOWLEDGE_BASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_BASE)),
            llm_endpoint: non_empty("LLM_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
            llm_api_key: non_empty("LLM_API_KEY").or_else(|| non_empty("GITHUB_TOKEN")),
            llm_model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        }
    }
}
