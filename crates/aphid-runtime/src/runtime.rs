//! Runtime orchestration.
//!
//! [`AphidRuntime`] owns the frozen [`Container`] and the [`Dispatcher`], and
//! feeds inbound messages through the pipeline one at a time.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use aphid_runtime::AphidRuntime;
//!
//! // Loads aphid.toml from the current directory and initializes logging.
//! let runtime = AphidRuntime::builder()?
//!     .service::<Counter>()?
//!     .module::<Greeter>(ModuleInfo::new("Greeter", "Says hello"))?
//!     .command::<Greeter, _>("greet", CommandInfo::new("greet", ["greet"]), greet)?
//!     .parameter::<Greeter>("greet", ParameterInfo::new("times", ParameterKind::Number))?
//!     .build()?;
//!
//! runtime.run(messages).await?;
//! runtime.teardown()?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use aphid_core::{
    CommandInfo, Component, Injectable, Message, ModuleInfo, Notifier, ParameterInfo,
    default_notifier,
};
use aphid_framework::{CommandHandler, Container, DispatchOutcome, Dispatcher};
use futures::{Stream, StreamExt};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AphidConfig, ConfigLoader, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

// =============================================================================
// RuntimeStats
// =============================================================================

/// Counters of dispatched messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Every message handed to the runtime.
    pub received: u64,
    pub handled: u64,
    /// Messages whose arguments did not bind.
    pub rejected: u64,
    pub ignored: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    handled: AtomicU64,
    rejected: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &DispatchOutcome) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            DispatchOutcome::Ignored(_) => &self.ignored,
            DispatchOutcome::Rejected { .. } => &self.rejected,
            DispatchOutcome::Handled { .. } => &self.handled,
            DispatchOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            received: self.received.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// AphidRuntime
// =============================================================================

/// A configured bot, ready to process messages.
pub struct AphidRuntime {
    config: AphidConfig,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    counters: Counters,
}

impl AphidRuntime {
    /// Loads configuration from the default locations, initializes logging
    /// and returns a builder for registration.
    pub fn builder() -> RuntimeResult<RuntimeBuilder> {
        let config = ConfigLoader::new().with_current_dir().load()?;
        Ok(Self::from_config(config))
    }

    /// Initializes logging from `config` and returns a builder for
    /// registration.
    pub fn from_config(config: AphidConfig) -> RuntimeBuilder {
        logging::init_from_config(&config.logging);
        info!(
            log_level = %config.logging.level,
            prefix = %config.bot.prefix,
            "Runtime initialized from configuration"
        );
        RuntimeBuilder::new(config)
    }

    pub fn config(&self) -> &AphidConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        self.dispatcher.container()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches a single message.
    ///
    /// With `bot.reply_errors` set, argument errors are sent back through the
    /// message's channel.
    pub async fn handle(&self, message: Message) -> DispatchOutcome {
        let message = Arc::new(message);
        let outcome = self.dispatcher.dispatch(Arc::clone(&message)).await;
        self.counters.record(&outcome);

        if self.config.bot.reply_errors
            && let DispatchOutcome::Rejected { errors, .. } = &outcome
        {
            let text = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(e) = message.reply(text).await {
                warn!(error = %e, "Failed to report argument errors");
            }
        }

        debug!(outcome = %outcome, "Message processed");
        outcome
    }

    /// Processes messages one at a time until the stream ends, Ctrl+C is
    /// received or [`shutdown`](Self::shutdown) is called.
    pub async fn run<S>(&self, messages: S) -> RuntimeResult<()>
    where
        S: Stream<Item = Message>,
    {
        let token = self.shutdown.clone();
        let signal_task = tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received Ctrl+C, shutting down");
                        token.cancel();
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
                },
                _ = token.cancelled() => {}
            }
        });

        info!("Aphid runtime is now running. Press Ctrl+C to stop.");

        tokio::pin!(messages);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = messages.next() => match next {
                    Some(message) => {
                        self.handle(message).await;
                    }
                    None => {
                        info!("Message stream ended");
                        break;
                    }
                },
            }
        }

        signal_task.abort();
        info!(stats = ?self.stats(), "Runtime stopped");
        Ok(())
    }

    /// Requests the message loop to stop after the current message.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// A token that is cancelled when the runtime shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.counters.snapshot()
    }

    /// Clears every registry of the container.
    ///
    /// Fails with [`RuntimeError::ContainerInUse`] if a handler still holds
    /// the context.
    pub fn teardown(self) -> RuntimeResult<()> {
        self.shutdown.cancel();
        let mut container = self
            .dispatcher
            .into_container()
            .map_err(|_| RuntimeError::ContainerInUse)?;
        container.teardown();
        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Registration surface of an [`AphidRuntime`].
///
/// Registration order matters: a service or module can only depend on
/// services registered before it.
pub struct RuntimeBuilder {
    config: AphidConfig,
    container: Container,
}

impl RuntimeBuilder {
    /// Creates a builder reporting through `tracing`.
    pub fn new(config: AphidConfig) -> Self {
        Self::with_notifier(config, default_notifier())
    }

    pub fn with_notifier(config: AphidConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            container: Container::new(notifier),
        }
    }

    pub fn config(&self) -> &AphidConfig {
        &self.config
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Registers service `T`.
    pub fn service<T: Injectable>(mut self) -> RuntimeResult<Self> {
        self.container.register_service::<T>()?;
        Ok(self)
    }

    /// Registers module `M` and creates its singleton.
    pub fn module<M: Injectable>(mut self, info: ModuleInfo) -> RuntimeResult<Self> {
        self.container.register_module::<M>(info)?;
        Ok(self)
    }

    /// Registers `handler` as command `handler_key` of module `M`.
    ///
    /// Trigger collisions are reported through the notifier and do not fail.
    pub fn command<M, H>(
        mut self,
        handler_key: &str,
        info: CommandInfo,
        handler: H,
    ) -> RuntimeResult<Self>
    where
        M: Component,
        H: CommandHandler<M>,
    {
        self.container
            .register_command::<M, H>(handler_key, info, handler)?;
        Ok(self)
    }

    /// Appends a positional parameter to command `handler_key` of module `M`.
    pub fn parameter<M: Component>(
        mut self,
        handler_key: &str,
        info: ParameterInfo,
    ) -> RuntimeResult<Self> {
        self.container.register_parameter::<M>(handler_key, info)?;
        Ok(self)
    }

    /// Validates the configuration and freezes the container.
    pub fn build(self) -> RuntimeResult<AphidRuntime> {
        validate_config(&self.config)?;

        let options = self.config.bot.to_options();
        let dispatcher = Dispatcher::new(Arc::new(self.container), options);
        info!(
            modules = dispatcher.container().modules().len(),
            commands = dispatcher.container().commands().len(),
            "Runtime built"
        );

        Ok(AphidRuntime {
            config: self.config,
            dispatcher,
            shutdown: CancellationToken::new(),
            counters: Counters::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aphid_core::{
        BufferChannel, ContainerResult, Dependencies, MemoryNotifier, ParameterKind, TypeKey,
    };
    use aphid_framework::{AphidContext, CommandArgs};
    use tokio_test::assert_ok;

    struct Greeter;

    aphid_core::component!(Greeter);

    impl Injectable for Greeter {
        fn construct(_: Dependencies) -> ContainerResult<Self> {
            Ok(Greeter)
        }
    }

    struct NeedsMissing;

    aphid_core::component!(NeedsMissing);

    impl Injectable for NeedsMissing {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::from("Database")]
        }

        fn construct(_: Dependencies) -> ContainerResult<Self> {
            Ok(NeedsMissing)
        }
    }

    async fn greet(
        _: Arc<Greeter>,
        _: Arc<AphidContext>,
        _: Arc<Message>,
        args: CommandArgs,
    ) -> String {
        format!("hello x{}", args.number("times").unwrap_or(1.0))
    }

    fn try_runtime(config: AphidConfig) -> RuntimeResult<AphidRuntime> {
        RuntimeBuilder::new(config)
            .module::<Greeter>(ModuleInfo::new("Greeter", "Says hello"))?
            .command::<Greeter, _>("greet", CommandInfo::new("greet", ["greet", "hi"]), greet)?
            .parameter::<Greeter>("greet", ParameterInfo::new("times", ParameterKind::Number))?
            .build()
    }

    fn runtime(config: AphidConfig) -> AphidRuntime {
        assert_ok!(try_runtime(config))
    }

    fn message(text: &str, channel: &Arc<BufferChannel>) -> Message {
        Message::new(text, channel.clone())
    }

    #[tokio::test]
    async fn test_handle_updates_stats() {
        let runtime = runtime(AphidConfig::default());
        let channel = Arc::new(BufferChannel::new());

        assert!(runtime.handle(message("!greet 2", &channel)).await.is_handled());
        runtime.handle(message("!greet", &channel)).await;
        runtime.handle(message("hello", &channel)).await;

        assert_eq!(
            runtime.stats(),
            RuntimeStats {
                received: 3,
                handled: 1,
                rejected: 1,
                ignored: 1,
                failed: 0,
            }
        );
        assert_eq!(channel.sent(), vec!["hello x2"]);
    }

    #[tokio::test]
    async fn test_reply_errors() {
        let mut config = AphidConfig::default();
        config.bot.reply_errors = true;
        let runtime = runtime(config);
        let channel = Arc::new(BufferChannel::new());

        runtime.handle(message("!hi abc", &channel)).await;

        assert_eq!(
            channel.sent(),
            vec!["argument \"times\" expects a number, got \"abc\""]
        );
    }

    #[tokio::test]
    async fn test_run_until_stream_ends() {
        let runtime = runtime(AphidConfig::default());
        let channel = Arc::new(BufferChannel::new());
        let messages = futures::stream::iter(vec![
            message("!greet 1", &channel),
            message("!hi 3", &channel),
        ]);

        assert_ok!(runtime.run(messages).await);

        assert_eq!(runtime.stats().handled, 2);
        assert_eq!(channel.sent(), vec!["hello x1", "hello x3"]);
    }

    #[tokio::test]
    async fn test_run_after_shutdown_processes_nothing() {
        let runtime = runtime(AphidConfig::default());
        let channel = Arc::new(BufferChannel::new());
        runtime.shutdown();

        assert_ok!(
            runtime
                .run(futures::stream::iter(vec![message("!greet 1", &channel)]))
                .await
        );

        assert!(runtime.is_shutdown());
        assert_eq!(runtime.stats().received, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let runtime = runtime(AphidConfig::default());
        let token = runtime.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_ok!(runtime.run(futures::stream::pending::<Message>()).await);
        assert!(runtime.is_shutdown());
    }

    #[test]
    fn test_build_rejects_invalid_prefix() {
        let mut config = AphidConfig::default();
        config.bot.prefix = "a b".into();
        let result = RuntimeBuilder::new(config).build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_registration_errors_abort_build() {
        let notifier = Arc::new(MemoryNotifier::new());
        let result = RuntimeBuilder::with_notifier(AphidConfig::default(), notifier.clone())
            .module::<NeedsMissing>(ModuleInfo::new("NeedsMissing", ""));

        assert!(matches!(result, Err(RuntimeError::Container(_))));
        assert_eq!(notifier.at_level(aphid_core::LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_teardown() {
        let runtime = runtime(AphidConfig::default());
        assert_eq!(runtime.container().commands().len(), 1);
        assert_ok!(runtime.teardown());
    }
}
