//! Domain entities and the JSON-to-entity boundary.
//!
//! Pure mapping from transformed JSON to typed values via serde. Schema
//! mismatches fail with [`Error::MalformedEntity`]; order of array inputs is
//! preserved.

use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Build one entity from a transformed JSON object.
pub fn build<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(Error::MalformedEntity)
}

/// Build an ordered sequence of entities from a transformed JSON array.
pub fn build_many<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>, Error> {
    values.into_iter().map(build).collect()
}

/// A chat message as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// The user that authored a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Rich-content element attached to a message. Also serializable because
/// embeds travel in outbound message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_builds_from_full_object() {
        let message: Message = build(json!({
            "id": "456",
            "channel_id": "123",
            "content": "hello",
            "author": {"id": "9", "username": "amy"},
            "embeds": [{"title": "t"}],
        }))
        .unwrap();
        assert_eq!(message.id, "456");
        assert_eq!(message.content, "hello");
        assert_eq!(message.author.unwrap().username, "amy");
        assert_eq!(message.embeds[0].title.as_deref(), Some("t"));
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let message: Message = build(json!({"id": "1", "channel_id": "2"})).unwrap();
        assert_eq!(message.content, "");
        assert!(message.author.is_none());
        assert!(message.embeds.is_empty());
    }

    #[test]
    fn schema_mismatch_is_malformed_entity() {
        let err = build::<Message>(json!({"id": 42})).unwrap_err();
        assert!(matches!(err, Error::MalformedEntity(_)));
    }

    #[test]
    fn build_many_preserves_order() {
        let messages: Vec<Message> = build_many(vec![
            json!({"id": "1", "channel_id": "c"}),
            json!({"id": "2", "channel_id": "c"}),
            json!({"id": "3", "channel_id": "c"}),
        ])
        .unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn embed_serializes_without_null_fields() {
        let embed = Embed::new().title("t");
        let value = serde_json::to_value(embed).unwrap();
        assert_eq!(value, json!({"title": "t"}));
    }
}
