//! Inbound messages and the channels replies go to.
//!
//! The chat platform itself is outside Aphid. A transport turns whatever it
//! receives into a [`Message`] carrying the text, whether a bot sent it, and
//! the [`Channel`] a reply should be delivered to.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ChannelError;

// ============================================================================
// Channel
// ============================================================================

/// The destination of replies for one conversation.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Delivers `text` to the conversation.
    async fn send(&self, text: &str) -> Result<(), ChannelError>;
}

/// A shared, type-erased channel.
pub type BoxedChannel = Arc<dyn Channel>;

/// Discards every reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChannel;

#[async_trait]
impl Channel for NullChannel {
    async fn send(&self, _text: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Keeps every reply in memory, in send order.
#[derive(Debug, Default)]
pub struct BufferChannel {
    sent: Mutex<Vec<String>>,
}

impl BufferChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the replies sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Channel for BufferChannel {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        self.sent.lock().push(text.to_owned());
        Ok(())
    }
}

// ============================================================================
// Message
// ============================================================================

/// A message received from the chat platform.
#[derive(Clone)]
pub struct Message {
    from_bot: bool,
    text: String,
    author: Option<String>,
    channel: BoxedChannel,
}

impl Message {
    /// Creates a message from a human sender.
    pub fn new(text: impl Into<String>, channel: BoxedChannel) -> Self {
        Self {
            from_bot: false,
            text: text.into(),
            author: None,
            channel,
        }
    }

    /// Marks whether the sender is a bot account.
    pub fn sent_by_bot(mut self, from_bot: bool) -> Self {
        self.from_bot = from_bot;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn is_from_bot(&self) -> bool {
        self.from_bot
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Display name of the sender, when the transport knows it.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn channel(&self) -> &BoxedChannel {
        &self.channel
    }

    /// Sends `text` to the channel this message arrived on.
    pub async fn reply(&self, text: impl AsRef<str>) -> Result<(), ChannelError> {
        self.channel.send(text.as_ref()).await
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from_bot", &self.from_bot)
            .field("text", &self.text)
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}
