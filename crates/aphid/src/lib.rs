//! # Aphid
//!
//! A small chat-bot framework built around a dependency container and a
//! prefix-command dispatcher.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────────────────────────┐
//! │   Runtime   │────▶│ Dispatcher                                   │
//! │  (messages) │     │  prefix ─▶ tokens ─▶ trigger ─▶ bind ─▶ call │──▶ module handler
//! └─────────────┘     └──────────────────────────────────────────────┘
//!                                        │
//!                                        ▼
//!                     Container: services ─▶ modules ─▶ commands
//! ```
//!
//! - **Services**: shared singletons, built with their declared dependencies
//! - **Modules**: singletons that own command handlers
//! - **Commands**: trigger words mapped to a module handler; the first
//!   registration of a trigger wins
//! - **Parameters**: positional arguments bound and type-checked before the
//!   handler runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aphid::prelude::*;
//!
//! struct Greeter;
//! aphid::component!(Greeter);
//!
//! impl Injectable for Greeter {
//!     fn construct(_: Dependencies) -> ContainerResult<Self> {
//!         Ok(Greeter)
//!     }
//! }
//!
//! async fn greet(
//!     _: Arc<Greeter>,
//!     _: Arc<AphidContext>,
//!     _: Arc<Message>,
//!     args: CommandArgs,
//! ) -> String {
//!     format!("hello, {}", args.string("name").unwrap_or("stranger"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = AphidRuntime::builder()?
//!         .module::<Greeter>(ModuleInfo::new("Greeter", "Says hello"))?
//!         .command::<Greeter, _>("greet", CommandInfo::new("greet", ["greet"]), greet)?
//!         .parameter::<Greeter>("greet", ParameterInfo::new("name", ParameterKind::String).optional())?
//!         .build()?;
//!
//!     runtime.run(messages).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use aphid_core as core;
pub use aphid_framework as framework;
pub use aphid_runtime as runtime;

pub use aphid_core::component;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use aphid::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use aphid_runtime::{AphidConfig, AphidRuntime, RuntimeBuilder, RuntimeError};

    // Dependency injection
    pub use aphid_core::{
        Component, ContainerError, ContainerResult, Dependencies, Injectable, TypeKey,
    };

    // Registration metadata
    pub use aphid_core::{CommandInfo, ModuleInfo, ParameterInfo, ParameterKind};

    // Messages
    pub use aphid_core::{Channel, ChannelError, Message};

    // Handlers
    pub use aphid_framework::{
        AphidContext, ArgValue, BoxError, CommandArgs, DispatchOutcome, HandlerResult,
    };
}
