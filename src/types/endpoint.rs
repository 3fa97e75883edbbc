//! Agent endpoints and capability cards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TaskLinkError};

/// Optional protocol features an agent advertises.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_transition_history: Option<bool>,
}

/// A skill listed on a capability card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Capability document served at the endpoint's well-known path.
///
/// Only `name` is required by the protocol; everything else is optional and
/// unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityCard {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Either an organization string or an `{organization, url}` object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_input_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_output_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CapabilityCard {
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.streaming.unwrap_or(false)
    }

    /// Human readable provider label.
    pub fn provider_label(&self) -> Option<String> {
        match self.provider.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("organization")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TaskLinkError::InvalidArgument(
                "invalid agent card: missing name".to_string(),
            ));
        }
        Ok(())
    }
}

/// A configured agent. Identity is `id`; `url` and `streaming` may change on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentEndpoint {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CapabilityCard>,
}

impl AgentEndpoint {
    pub fn new(id: impl Into<String>, url: impl Into<String>, streaming: bool) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            url: url.into(),
            streaming,
            description: None,
            version: None,
            provider: None,
            card: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build a new endpoint, with a fresh id, from a fetched capability card.
    pub fn from_card(url: impl Into<String>, card: CapabilityCard) -> Result<Self> {
        card.validate()?;
        let mut endpoint = Self::new(uuid::Uuid::new_v4().to_string(), url, false);
        endpoint.apply_card(card)?;
        Ok(endpoint)
    }

    /// Refresh descriptive fields and streaming capability from a card.
    pub fn apply_card(&mut self, card: CapabilityCard) -> Result<()> {
        card.validate()?;
        self.name = card.name.clone();
        self.description = card.description.clone();
        self.version = card.version.clone();
        self.provider = card.provider_label();
        self.streaming = card.supports_streaming();
        self.card = Some(card);
        Ok(())
    }

    /// The endpoint every new installation starts with.
    pub fn local_default() -> Self {
        Self::new("1", "http://localhost:10000", true).with_name("Local Agent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_parses_minimal_document() {
        let card: CapabilityCard = serde_json::from_value(json!({"name": "Echo"})).unwrap();
        assert_eq!(card.name, "Echo");
        assert!(!card.supports_streaming());
        assert!(card.skills.is_empty());
    }

    #[test]
    fn card_keeps_unknown_fields() {
        let card: CapabilityCard = serde_json::from_value(json!({
            "name": "Echo",
            "capabilities": {"streaming": true, "pushNotifications": false},
            "provider": {"organization": "Acme"},
            "authentication": {"schemes": ["public"]}
        }))
        .unwrap();
        assert!(card.supports_streaming());
        assert_eq!(card.provider_label().as_deref(), Some("Acme"));
        assert!(card.extra.contains_key("authentication"));
    }

    #[test]
    fn from_card_requires_name() {
        let err = AgentEndpoint::from_card("http://x", CapabilityCard::default()).unwrap_err();
        assert!(err.to_string().contains("missing name"));
    }

    #[test]
    fn apply_card_updates_streaming_flag() {
        let mut endpoint = AgentEndpoint::new("a", "http://x", false);
        let card: CapabilityCard = serde_json::from_value(json!({
            "name": "Planner",
            "version": "2.1",
            "capabilities": {"streaming": true}
        }))
        .unwrap();
        endpoint.apply_card(card).unwrap();
        assert_eq!(endpoint.id, "a");
        assert_eq!(endpoint.name, "Planner");
        assert_eq!(endpoint.version.as_deref(), Some("2.1"));
        assert!(endpoint.streaming);
    }
}
