//! # Aphid Core
//!
//! The dependency container and command registry of the Aphid bot framework.
//!
//! This crate holds the pieces of Aphid that carry state and invariants:
//!
//! - **Type identity**: [`TypeKey`] and the [`Component`] / [`Injectable`]
//!   traits, which replace runtime reflection with declared metadata.
//! - **Instance store**: [`InstanceStore`], one live instance per type.
//! - **Service factory**: [`ServiceFactory`], builds instances by resolving
//!   their declared dependencies from the store.
//! - **Module registry**: [`ModuleRegistry`], one singleton per module.
//! - **Command registry**: [`CommandRegistry`], trigger words mapped to
//!   module handlers plus their positional parameters.
//! - **Collaborator interfaces**: [`Message`] / [`Channel`] for inbound
//!   messages and replies, [`Notifier`] for non-fatal conditions.
//!
//! Dispatching messages to handlers lives in `aphid-framework`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aphid_core::{Dependencies, Injectable, ServiceFactory, component};
//!
//! struct Database;
//! struct Users { db: Arc<Database> }
//!
//! component!(Database, Users);
//!
//! impl Injectable for Database {
//!     fn construct(_: Dependencies) -> aphid_core::ContainerResult<Self> {
//!         Ok(Database)
//!     }
//! }
//!
//! impl Injectable for Users {
//!     fn dependencies() -> Vec<aphid_core::TypeKey> {
//!         vec![aphid_core::TypeKey::of::<Database>()]
//!     }
//!
//!     fn construct(mut deps: Dependencies) -> aphid_core::ContainerResult<Self> {
//!         Ok(Users { db: deps.next()? })
//!     }
//! }
//!
//! let mut factory = ServiceFactory::new();
//! factory.add_service::<Database>()?;
//! let users = factory.create::<Users>()?;
//! ```

pub mod command;
pub mod component;
pub mod error;
pub mod factory;
pub mod message;
pub mod module;
pub mod notify;
pub mod store;

pub use command::{
    CommandInfo, CommandRegistry, LoadedCommand, LoadedParameter, ParameterInfo, ParameterKind,
    REST_KEY, ResolvedCommand, TriggerCollision,
};
pub use component::{Component, Dependencies, Injectable, ServiceArc, TypeKey};
pub use error::{ChannelError, ContainerError, ContainerResult};
pub use factory::ServiceFactory;
pub use message::{BoxedChannel, BufferChannel, Channel, Message, NullChannel};
pub use module::{ModuleInfo, ModuleRegistry};
pub use notify::{
    LogLevel, MemoryNotifier, Notification, Notifier, TracingNotifier, default_notifier,
};
pub use store::InstanceStore;

/// Implements [`Component`] for one or more types, using the type's name as
/// its identifier.
///
/// ```rust,ignore
/// struct Counter;
/// struct Greeter;
///
/// aphid_core::component!(Counter, Greeter);
/// assert_eq!(<Counter as aphid_core::Component>::NAME, "Counter");
/// ```
#[macro_export]
macro_rules! component {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl $crate::Component for $ty {
                const NAME: &'static str = stringify!($ty);
            }
        )+
    };
}
