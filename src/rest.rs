//! Representative operation surface: channel messages and reactions.
//!
//! Every operation follows the same mechanical translation: validate caller
//! input, bind a route from the catalogue, hand an [`OutboundRequest`] to the
//! dispatcher, then transform the response payload into typed entities. The
//! dispatcher owns all ordering, rate-limit, and retry concerns.

use crate::dispatch::Dispatcher;
use crate::entity::{self, Embed, Message};
use crate::error::Error;
use crate::request::OutboundRequest;
use crate::route::routes;
use crate::transform::ResponsePayload;
use serde_json::Value;

/// Handle to the message/reaction operations. Cheap to clone.
#[derive(Clone)]
pub struct Rest {
    dispatcher: Dispatcher,
}

impl Rest {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Send a message to a channel.
    ///
    /// Fails with [`Error::EmptyPayload`] before any network call when the
    /// payload has neither content nor an embed.
    pub async fn create_message(
        &self,
        channel_id: &str,
        message: impl Into<CreateMessage>,
    ) -> Result<Message, Error> {
        let body = message.into().into_body()?;
        let route = routes::CREATE_MESSAGE.bind(&[("channel.id", channel_id)])?;
        let payload = self.dispatcher.submit(OutboundRequest::new(route).body(body)).await?;
        entity::build(payload.into_object()?)
    }

    /// Fetch a single message.
    pub async fn get_message(&self, channel_id: &str, message_id: &str) -> Result<Message, Error> {
        let route = routes::GET_CHANNEL_MESSAGE
            .bind(&[("channel.id", channel_id), ("message.id", message_id)])?;
        let payload = self.dispatcher.submit(OutboundRequest::new(route)).await?;
        entity::build(payload.into_object()?)
    }

    /// Edit a previously-sent message. Same empty-payload precondition as
    /// [`Rest::create_message`].
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: impl Into<CreateMessage>,
    ) -> Result<Message, Error> {
        let body = message.into().into_body()?;
        let route = routes::EDIT_MESSAGE
            .bind(&[("channel.id", channel_id), ("message.id", message_id)])?;
        let payload = self.dispatcher.submit(OutboundRequest::new(route).body(body)).await?;
        entity::build(payload.into_object()?)
    }

    /// Delete a message.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), Error> {
        let route = routes::DELETE_MESSAGE
            .bind(&[("channel.id", channel_id), ("message.id", message_id)])?;
        self.none(OutboundRequest::new(route)).await
    }

    /// React to a message. `emoji` may be a raw glyph or a `name:id` pair;
    /// it is percent-encoded into the path (space becomes `%20`).
    pub async fn create_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), Error> {
        let route = routes::CREATE_REACTION.bind(&[
            ("channel.id", channel_id),
            ("message.id", message_id),
            ("emoji", emoji),
        ])?;
        self.none(OutboundRequest::new(route)).await
    }

    /// Remove the current user's reaction from a message.
    pub async fn delete_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), Error> {
        let route = routes::DELETE_OWN_REACTION.bind(&[
            ("channel.id", channel_id),
            ("message.id", message_id),
            ("emoji", emoji),
        ])?;
        self.none(OutboundRequest::new(route)).await
    }

    /// List messages in a channel. An empty list is a valid result.
    pub async fn get_channel_messages(
        &self,
        channel_id: &str,
        query: GetMessages,
    ) -> Result<Vec<Message>, Error> {
        let route = routes::GET_CHANNEL_MESSAGES.bind(&[("channel.id", channel_id)])?;
        let mut request = OutboundRequest::new(route);
        // Query precedence on the wire: limit, after, around, before.
        if let Some(limit) = query.limit {
            request = request.query("limit", limit.clamp(1, 100).to_string());
        }
        if let Some(after) = query.after {
            request = request.query("after", after);
        }
        if let Some(around) = query.around {
            request = request.query("around", around);
        }
        if let Some(before) = query.before {
            request = request.query("before", before);
        }
        let payload = self.dispatcher.submit(request).await?;
        entity::build_many(payload.into_array()?)
    }

    /// Show the "user is typing" indicator in a channel.
    pub async fn trigger_typing(&self, channel_id: &str) -> Result<(), Error> {
        let route = routes::TRIGGER_TYPING_INDICATOR.bind(&[("channel.id", channel_id)])?;
        self.none(OutboundRequest::new(route)).await
    }

    async fn none(&self, request: OutboundRequest) -> Result<(), Error> {
        self.dispatcher.submit(request).await.and_then(ResponsePayload::into_none)
    }
}

/// Outbound message payload. At least one of content or embed must be set by
/// the time it is sent.
#[derive(Debug, Clone, Default)]
pub struct CreateMessage {
    content: Option<String>,
    embed: Option<Embed>,
}

impl CreateMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Client-side precondition check plus JSON assembly. Empty strings count
    /// as no content.
    fn into_body(self) -> Result<Value, Error> {
        let mut body = serde_json::Map::new();
        if let Some(content) = self.content.filter(|c| !c.is_empty()) {
            body.insert("content".into(), Value::String(content));
        }
        if let Some(embed) = self.embed {
            body.insert(
                "embed".into(),
                serde_json::to_value(embed).map_err(Error::MalformedEntity)?,
            );
        }
        if body.is_empty() {
            return Err(Error::EmptyPayload);
        }
        Ok(Value::Object(body))
    }
}

impl From<&str> for CreateMessage {
    fn from(content: &str) -> Self {
        CreateMessage::new().content(content)
    }
}

impl From<String> for CreateMessage {
    fn from(content: String) -> Self {
        CreateMessage::new().content(content)
    }
}

impl From<Embed> for CreateMessage {
    fn from(embed: Embed) -> Self {
        CreateMessage::new().embed(embed)
    }
}

/// Cursor parameters for [`Rest::get_channel_messages`]. `limit` is clamped
/// to the server's 1..=100 window.
#[derive(Debug, Clone, Default)]
pub struct GetMessages {
    limit: Option<u16>,
    after: Option<String>,
    around: Option<String>,
    before: Option<String>,
}

impl GetMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u16) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, message_id: impl Into<String>) -> Self {
        self.after = Some(message_id.into());
        self
    }

    pub fn around(mut self, message_id: impl Into<String>) -> Self {
        self.around = Some(message_id.into());
        self
    }

    pub fn before(mut self, message_id: impl Into<String>) -> Self {
        self.before = Some(message_id.into());
        self
    }
}
