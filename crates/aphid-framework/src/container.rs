//! The registration container.
//!
//! [`Container`] owns everything registered at start-up:
//!
//! - the [`ServiceFactory`] and its services,
//! - the [`ModuleRegistry`] with one singleton per module,
//! - the [`CommandRegistry`] with triggers and parameters,
//! - the handler services invoked by the dispatcher.
//!
//! Its lifecycle is explicit: create it, populate it through the `register_*`
//! methods, freeze it into an `Arc` for dispatching, and [`teardown`] when
//! done.
//!
//! [`teardown`]: Container::teardown

use std::collections::HashMap;
use std::sync::Arc;

use aphid_core::{
    CommandInfo, CommandRegistry, Component, ContainerResult, Injectable, LoadedCommand,
    LoadedParameter, ModuleInfo, ModuleRegistry, Notifier, ParameterInfo, ServiceFactory,
    TriggerCollision, TypeKey, default_notifier,
};
use tracing::{debug, info};

use crate::handler::{BoxedCommandService, CommandHandler, MethodService};

/// Services, modules, commands and their handlers.
pub struct Container {
    factory: ServiceFactory,
    modules: ModuleRegistry,
    commands: CommandRegistry,
    /// module → handler key → service.
    handlers: HashMap<TypeKey, HashMap<String, BoxedCommandService>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new(default_notifier())
    }
}

impl Container {
    /// Creates an empty container reporting to `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            factory: ServiceFactory::new(),
            modules: ModuleRegistry::new(Arc::clone(&notifier)),
            commands: CommandRegistry::new(Arc::clone(&notifier)),
            handlers: HashMap::new(),
            notifier,
        }
    }

    // ─── Registration ───────────────────────────────────────────────

    /// Builds `T` and makes it available to types registered afterwards.
    pub fn register_service<T: Injectable>(&mut self) -> ContainerResult<Arc<T>> {
        self.factory.add_service::<T>()
    }

    /// Builds the singleton of module `M` from the registered services.
    pub fn register_module<M: Injectable>(&mut self, info: ModuleInfo) -> ContainerResult<Arc<M>> {
        self.modules.load_module::<M>(&self.factory, info)
    }

    /// Registers `handler` as command `handler_key` of module `M`.
    ///
    /// The module does not have to be loaded yet. Triggers already taken by
    /// another command are returned as collisions; the command keeps the rest.
    /// Registering the same `M.handler_key` twice fails and leaves the first
    /// handler in place.
    pub fn register_command<M, H>(
        &mut self,
        handler_key: &str,
        info: CommandInfo,
        handler: H,
    ) -> ContainerResult<Vec<TriggerCollision>>
    where
        M: Component,
        H: CommandHandler<M>,
    {
        let module = TypeKey::of::<M>();
        let collisions = self
            .commands
            .add_command(LoadedCommand::new(module.clone(), handler_key, info))?;

        debug!(module = %module, handler = handler_key, "Handler registered");
        self.handlers
            .entry(module)
            .or_default()
            .insert(handler_key.to_owned(), MethodService::<M, H>::new(handler).boxed());

        Ok(collisions)
    }

    /// Appends a positional parameter to command `handler_key` of module `M`.
    pub fn register_parameter<M: Component>(
        &mut self,
        handler_key: &str,
        info: ParameterInfo,
    ) -> ContainerResult<()> {
        self.commands
            .add_parameter(LoadedParameter::new(TypeKey::of::<M>(), handler_key, info))
    }

    // ─── Lookup ─────────────────────────────────────────────────────

    /// Returns the registered service of type `T`.
    pub fn service<T: Component>(&self) -> Option<Arc<T>> {
        self.factory.store().get::<T>()
    }

    pub fn factory(&self) -> &ServiceFactory {
        &self.factory
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Returns a handle to the service invoking `module.handler_key()`.
    pub fn handler(&self, module: &str, handler_key: &str) -> Option<BoxedCommandService> {
        self.handlers.get(module)?.get(handler_key).cloned()
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Drops every service, module, command and handler.
    pub fn teardown(&mut self) {
        self.handlers.clear();
        self.commands.clear();
        self.modules.clear();
        self.factory.clear();
        info!("Container torn down");
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("factory", &self.factory)
            .field("modules", &self.modules)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aphid_core::{
        BufferChannel, ContainerError, Dependencies, MemoryNotifier, Message, ParameterKind,
    };
    use tower::ServiceExt;

    use crate::args::CommandArgs;
    use crate::context::{AphidContext, BotOptions};
    use crate::handler::Invocation;

    struct Counter;
    struct Greeter {
        _counter: Arc<Counter>,
    }

    aphid_core::component!(Counter, Greeter);

    impl Injectable for Counter {
        fn construct(_: Dependencies) -> ContainerResult<Self> {
            Ok(Counter)
        }
    }

    impl Injectable for Greeter {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Counter>()]
        }

        fn construct(mut deps: Dependencies) -> ContainerResult<Self> {
            Ok(Greeter {
                _counter: deps.next()?,
            })
        }
    }

    async fn noop(_: Arc<Greeter>, _: Arc<AphidContext>, _: Arc<Message>, _: CommandArgs) {}

    async fn first(
        _: Arc<Counter>,
        _: Arc<AphidContext>,
        _: Arc<Message>,
        _: CommandArgs,
    ) -> &'static str {
        "first"
    }

    async fn second(
        _: Arc<Counter>,
        _: Arc<AphidContext>,
        _: Arc<Message>,
        _: CommandArgs,
    ) -> &'static str {
        "second"
    }

    #[test]
    fn test_populate_and_teardown() {
        let mut container = Container::default();
        container.register_service::<Counter>().unwrap();
        container
            .register_module::<Greeter>(ModuleInfo::new("Greeter", ""))
            .unwrap();
        container
            .register_command::<Greeter, _>("greet", CommandInfo::new("greet", ["greet"]), noop)
            .unwrap();
        container
            .register_parameter::<Greeter>(
                "greet",
                ParameterInfo::new("times", ParameterKind::Number),
            )
            .unwrap();

        assert!(container.service::<Counter>().is_some());
        assert!(container.modules().get::<Greeter>().is_some());
        assert!(container.handler("Greeter", "greet").is_some());
        assert_eq!(container.commands().parameters("Greeter", "greet").len(), 1);

        container.teardown();

        assert!(container.service::<Counter>().is_none());
        assert!(container.modules().is_empty());
        assert!(container.commands().is_empty());
        assert!(container.handler("Greeter", "greet").is_none());
    }

    #[test]
    fn test_module_before_service_fails() {
        let notifier = Arc::new(MemoryNotifier::new());
        let mut container = Container::new(notifier.clone());

        assert!(
            container
                .register_module::<Greeter>(ModuleInfo::new("Greeter", ""))
                .is_err()
        );
        assert!(container.modules().get_instance("Greeter").is_none());
    }

    #[test]
    fn test_command_without_trigger_registers_no_handler() {
        let mut container = Container::default();
        let empty: [&str; 0] = [];
        assert!(
            container
                .register_command::<Greeter, _>("greet", CommandInfo::new("greet", empty), noop)
                .is_err()
        );
        assert!(container.handler("Greeter", "greet").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_handler_keeps_first_service() {
        let mut container = Container::default();
        container
            .register_command::<Counter, _>("run", CommandInfo::new("run", ["go"]), first)
            .unwrap();
        let err = container
            .register_command::<Counter, _>("run", CommandInfo::new("run", ["go"]), second)
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidArgument(_)));

        let container = Arc::new(container);
        let channel = Arc::new(BufferChannel::new());
        let handler = container.handler("Counter", "run").unwrap();
        handler
            .oneshot(Invocation {
                module: Arc::new(Counter),
                context: Arc::new(AphidContext::new(
                    Arc::clone(&container),
                    BotOptions::default(),
                )),
                message: Arc::new(Message::new("!go", channel.clone())),
                args: CommandArgs::new(),
            })
            .await
            .unwrap();

        assert_eq!(channel.sent(), vec!["first"]);
        assert_eq!(container.commands().len(), 1);
    }

    #[test]
    fn test_parameter_named_rest_is_rejected() {
        let mut container = Container::default();
        assert!(
            container
                .register_parameter::<Greeter>(
                    "greet",
                    ParameterInfo::new("rest", ParameterKind::String),
                )
                .is_err()
        );
        assert!(container.commands().parameters("Greeter", "greet").is_empty());
    }
}
