//! The context handed to command handlers.

use std::sync::Arc;

use aphid_core::{CommandRegistry, Component, ModuleRegistry};
use serde::{Deserialize, Serialize};

use crate::container::Container;

/// Bot-wide options read by the dispatcher and by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotOptions {
    /// Text a message must start with to be treated as a command.
    ///
    /// Cut from the first space-separated token, so a prefix containing a
    /// space never yields a trigger.
    pub prefix: String,
    /// The author of the bot.
    pub author: String,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            prefix: "!".to_owned(),
            author: String::new(),
        }
    }
}

impl BotOptions {
    pub fn new(prefix: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            author: author.into(),
        }
    }
}

/// Shared, read-only view of the bot for handlers.
///
/// One context is created per [`Dispatcher`](crate::dispatch::Dispatcher) and
/// shared by every invocation.
#[derive(Debug)]
pub struct AphidContext {
    container: Arc<Container>,
    options: BotOptions,
}

impl AphidContext {
    pub fn new(container: Arc<Container>, options: BotOptions) -> Self {
        Self { container, options }
    }

    /// Returns the registered service of type `T`.
    pub fn service<T: Component>(&self) -> Option<Arc<T>> {
        self.container.service::<T>()
    }

    /// Returns the loaded module of type `M`.
    pub fn module<M: Component>(&self) -> Option<Arc<M>> {
        self.container.modules().get::<M>()
    }

    pub fn commands(&self) -> &CommandRegistry {
        self.container.commands()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        self.container.modules()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn options(&self) -> &BotOptions {
        &self.options
    }

    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    pub fn author(&self) -> &str {
        &self.options.author
    }
}
