use serde_json::Value;
use thiserror::Error;

use crate::layers::GroupMapping;

pub const FALLBACK_GROUP: &str = "Uncategorized";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in reply")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("group '{0}' is not a list of titles")]
    NotATitleList(String),
}

/// Parses the plain-text hand-off format: a bare line names a group, the
/// quoted lines below it are its titles.
pub fn parse_grouped_titles(text: &str) -> GroupMapping {
    let mut groups = GroupMapping::new();
    let mut current: Option<&str> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match quoted_title(line) {
            Some(title) => match current {
                Some(group) => groups.push_title(group, title),
                None => tracing::debug!("Dropping title outside of any group: {}", title),
            },
            None => current = Some(line),
        }
    }

    groups
}

fn quoted_title(line: &str) -> Option<&str> {
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        Some(line[1..line.len() - 1].trim())
    } else {
        None
    }
}

/// Extracts the first `{ ... }` span of a classification reply and decodes it
/// as group -> titles, keeping the key order of the reply.
pub fn parse_classification_reply(reply: &str) -> Result<GroupMapping, ParseError> {
    let start = reply.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = reply.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }

    let object: serde_json::Map<String, Value> = serde_json::from_str(&reply[start..=end])?;
    let mut groups = GroupMapping::new();
    for (group, value) in object {
        let Value::Array(items) = value else {
            return Err(ParseError::NotATitleList(group));
        };
        let titles = items
            .into_iter()
            .map(|item| match item {
                Value::String(title) => Ok(title),
                _ => Err(ParseError::NotATitleList(group.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        groups.extend_group(&group, titles);
    }
    Ok(groups)
}

/// Full-context decode: falls back to every original title in one catch-all group.
pub fn groups_or_uncategorized(reply: &str, titles: &[String]) -> GroupMapping {
    parse_classification_reply(reply).unwrap_or_else(|e| {
        tracing::warn!("Could not parse classification reply ({}), using fallback group", e);
        let mut groups = GroupMapping::new();
        groups.extend_group(FALLBACK_GROUP, titles.iter().cloned());
        groups
    })
}

/// Prompt-only decode: falls back to an empty catch-all group.
pub fn groups_or_empty(reply: &str) -> GroupMapping {
    parse_classification_reply(reply).unwrap_or_else(|e| {
        tracing::warn!("Could not parse classification reply ({}), using empty fallback group", e);
        let mut groups = GroupMapping::new();
        groups.extend_group(FALLBACK_GROUP, Vec::new());
        groups
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_titles_preserves_order() {
        let text = concat!(
            "Reinforcement Learning\n\"Deep Q Networks\"\n\"AlphaGo\"\n\n",
            "Computer Vision\n\"ResNet\"\n"
        );
        let groups = parse_grouped_titles(text);

        let collected: Vec<(&str, &[String])> = groups.iter().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].0, "Reinforcement Learning");
        assert_eq!(collected[0].1, ["Deep Q Networks", "AlphaGo"]);
        assert_eq!(collected[1].0, "Computer Vision");
        assert_eq!(collected[1].1, ["ResNet"]);
    }

    #[test]
    fn test_parse_grouped_titles_tolerates_whitespace_and_leading_titles() {
        let text = concat!(
            "  \"Orphan\"  \n\n   Theme A  \n  \"Title 1\"  \n\n\n",
            " Theme B\n\"Title 2\"\nTheme A\n\"Title 3\""
        );
        let groups = parse_grouped_titles(text);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("Theme A").unwrap(), ["Title 1", "Title 3"]);
        assert_eq!(groups.get("Theme B").unwrap(), ["Title 2"]);
    }

    #[test]
    fn test_parse_grouped_titles_without_quotes_is_empty() {
        assert!(parse_grouped_titles("just some prose\nwith no titles").is_empty());
        assert!(parse_grouped_titles("").is_empty());
        assert!(parse_grouped_titles("\"").is_empty());
    }

    #[test]
    fn test_grouped_text_round_trip() {
        let text = "Vision\n\"ResNet\"\n\"ViT\"\n\nNLP\n\"BERT\"";
        assert_eq!(parse_grouped_titles(text).to_grouped_text(), text);
    }

    #[test]
    fn test_parse_classification_reply_with_prose() {
        let reply = "Sure! Here you go: {\"Vision\": [\"ResNet\"]}";
        let groups = parse_classification_reply(reply).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("Vision").unwrap(), ["ResNet"]);
    }

    #[test]
    fn test_parse_classification_reply_keeps_key_order() {
        let reply = "```json\n{\"Zeta\": [\"A\"], \"Alpha\": [\"B\", \"C\"]}\n```";
        let groups = parse_classification_reply(reply).unwrap();
        assert_eq!(groups.group_names().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_parse_classification_reply_errors() {
        assert!(matches!(
            parse_classification_reply("no object here"),
            Err(ParseError::NoJsonObject)
        ));
        assert!(matches!(
            parse_classification_reply("} backwards {"),
            Err(ParseError::NoJsonObject)
        ));
        assert!(matches!(
            parse_classification_reply("{not json}"),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_classification_reply("{\"Vision\": \"ResNet\"}"),
            Err(ParseError::NotATitleList(_))
        ));
    }

    #[test]
    fn test_full_context_fallback_keeps_titles() {
        let titles = vec!["ResNet".to_string(), "BERT".to_string()];
        let groups = groups_or_uncategorized("I cannot help with that.", &titles);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(FALLBACK_GROUP).unwrap(), ["ResNet", "BERT"]);
    }

    #[test]
    fn test_prompt_only_fallback_is_empty_group() {
        let groups = groups_or_empty("nothing useful");
        assert_eq!(groups.len(), 1);
        assert!(groups.get(FALLBACK_GROUP).unwrap().is_empty());
    }

    #[test]
    fn test_fallbacks_not_used_on_valid_reply() {
        let groups = groups_or_empty("{\"NLP\": [\"BERT\"]}");
        assert_eq!(groups.get("NLP").unwrap(), ["BERT"]);
        assert!(groups.get(FALLBACK_GROUP).is_none());
    }
}
