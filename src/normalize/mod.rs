//! Mapping of divergent agent response shapes onto one canonical view.
//!
//! Agents built against different protocol revisions place the same
//! information in different spots. Extraction is a priority-ordered list of
//! pure rules per field; supporting a new shape means appending a rule.

pub mod rules;

use serde_json::Value;
use tracing::{debug, warn};

pub use rules::{ArtifactRule, ContentRule, StateRule};

use crate::types::{NormalizedResponse, NO_CONTENT};
use crate::util::text::preview;

/// Ordered rule sets for content, state and artifacts.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    content_rules: Vec<ContentRule>,
    state_rules: Vec<StateRule>,
    artifact_rules: Vec<ArtifactRule>,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self {
            content_rules: rules::CONTENT_RULES.to_vec(),
            state_rules: rules::STATE_RULES.to_vec(),
            artifact_rules: rules::ARTIFACT_RULES.to_vec(),
        }
    }
}

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a content rule, tried after all existing ones.
    pub fn with_content_rule(mut self, rule: ContentRule) -> Self {
        self.content_rules.push(rule);
        self
    }

    pub fn with_state_rule(mut self, rule: StateRule) -> Self {
        self.state_rules.push(rule);
        self
    }

    pub fn with_artifact_rule(mut self, rule: ArtifactRule) -> Self {
        self.artifact_rules.push(rule);
        self
    }

    /// Never fails: a missing field only means a missed extraction path.
    pub fn normalize(&self, value: &Value) -> NormalizedResponse {
        let state = self
            .state_rules
            .iter()
            .find_map(|rule| (rule.extract)(value));
        let artifacts = self
            .artifact_rules
            .iter()
            .find_map(|rule| (rule.extract)(value));

        let content = self.content_rules.iter().find_map(|rule| {
            let text = (rule.extract)(value).filter(|t| !t.is_empty())?;
            debug!(rule = rule.name, content = %preview(&text), "extracted response content");
            Some(text)
        });

        let content = content.unwrap_or_else(|| {
            warn!(response = %preview(&value.to_string()), "no content found in response");
            NO_CONTENT.to_string()
        });

        NormalizedResponse {
            content,
            state,
            artifacts,
        }
    }
}

/// Normalize with the default rule set.
pub fn normalize(value: &Value) -> NormalizedResponse {
    ResponseNormalizer::default().normalize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskState;
    use serde_json::json;

    #[test]
    fn empty_object_yields_sentinel() {
        let normalized = normalize(&json!({}));
        assert_eq!(normalized.content, NO_CONTENT);
        assert!(normalized.state.is_none());
        assert!(normalized.artifacts.is_none());
        assert!(!normalized.has_content());
    }

    #[test]
    fn non_object_input_does_not_panic() {
        for value in [json!(null), json!(42), json!("text"), json!([1, 2])] {
            assert_eq!(normalize(&value).content, NO_CONTENT);
        }
    }

    #[test]
    fn appended_rule_runs_last() {
        fn reply_field(value: &Value) -> Option<String> {
            value.get("reply")?.as_str().map(str::to_string)
        }
        let normalizer = ResponseNormalizer::new().with_content_rule(ContentRule {
            name: "reply",
            extract: reply_field,
        });
        let normalized = normalizer.normalize(&json!({"reply": "custom"}));
        assert_eq!(normalized.content, "custom");

        let normalized = normalizer.normalize(&json!({"reply": "custom", "content": "direct"}));
        assert_eq!(normalized.content, "direct");
    }

    #[test]
    fn state_is_extracted_independently_of_content() {
        let normalized = normalize(&json!({"result": {"status": {"state": "input-required"}}}));
        assert_eq!(normalized.state, Some(TaskState::InputRequired));
        assert_eq!(normalized.content, NO_CONTENT);
    }
}
