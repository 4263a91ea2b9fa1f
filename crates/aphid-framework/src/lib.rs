//! # Aphid Framework
//!
//! Command dispatch on top of `aphid-core`.
//!
//! This layer provides:
//! - [`Container`]: the registration surface owning services, modules,
//!   commands and handler services
//! - [`Dispatcher`]: filters, tokenizes, resolves, binds and invokes
//! - [`bind_arguments`] and [`CommandArgs`] for positional parameters
//! - [`CommandHandler`] / [`IntoReply`]: async functions as command handlers,
//!   stored as tower services

pub mod args;
pub mod container;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;

pub use args::{ArgValue, CommandArgs, bind_arguments};
pub use container::Container;
pub use context::{AphidContext, BotOptions};
pub use dispatch::{DispatchOutcome, Dispatcher, IgnoreReason};
pub use error::{BindError, BoxError, HandlerResult, InvocationError};
pub use handler::{
    BoxedCommandService, CommandHandler, Invocation, IntoReply, MethodService,
};
