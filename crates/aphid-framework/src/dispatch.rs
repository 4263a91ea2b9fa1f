//! Message dispatch.
//!
//! [`Dispatcher::dispatch`] takes one inbound [`Message`] through the whole
//! pipeline:
//!
//! 1. Drop messages from bots and messages not starting with the prefix.
//! 2. Split the text on single spaces. The first token minus the length of
//!    the prefix is the trigger; the remaining tokens are argument candidates.
//! 3. Look up the trigger. Unknown triggers are ignored silently.
//! 4. Bind the candidates to the command's parameters.
//! 5. Invoke the handler service with the module singleton.
//!
//! Every step ends in a [`DispatchOutcome`]. Binding errors are returned as
//! data and are never sent to the message author from here.

use std::fmt;
use std::sync::Arc;

use aphid_core::{LoadedCommand, Message};
use tower::{BoxError, ServiceExt};
use tracing::{Instrument, Level, debug, error, span};

use crate::args::{CommandArgs, bind_arguments};
use crate::container::Container;
use crate::context::{AphidContext, BotOptions};
use crate::error::{BindError, InvocationError};
use crate::handler::Invocation;

/// Why a message was not treated as a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The sender is a bot.
    FromBot,
    /// The text does not start with the prefix.
    MissingPrefix,
    /// No command is bound to the trigger.
    UnknownTrigger(String),
}

/// The result of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    /// The arguments did not bind; the handler was not called.
    Rejected {
        trigger: String,
        errors: Vec<BindError>,
    },
    /// The handler ran to completion.
    Handled { trigger: String },
    /// The handler could not be invoked or returned an error.
    Failed { trigger: String, error: String },
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    /// The trigger of a resolved command.
    pub fn trigger(&self) -> Option<&str> {
        match self {
            Self::Ignored(_) => None,
            Self::Rejected { trigger, .. }
            | Self::Handled { trigger }
            | Self::Failed { trigger, .. } => Some(trigger),
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored(reason) => write!(f, "ignored ({reason:?})"),
            Self::Rejected { trigger, errors } => {
                write!(f, "{trigger}: ")?;
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            Self::Handled { trigger } => write!(f, "{trigger}: handled"),
            Self::Failed { trigger, error } => write!(f, "{trigger}: failed: {error}"),
        }
    }
}

/// Routes messages to command handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    container: Arc<Container>,
    context: Arc<AphidContext>,
}

impl Dispatcher {
    pub fn new(container: Arc<Container>, options: BotOptions) -> Self {
        let context = Arc::new(AphidContext::new(Arc::clone(&container), options));
        Self { container, context }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn context(&self) -> &Arc<AphidContext> {
        &self.context
    }

    /// Takes the container back, provided nothing else still shares it.
    pub fn into_container(self) -> Result<Container, Arc<Container>> {
        let Self { container, context } = self;
        drop(context);
        Arc::try_unwrap(container)
    }

    /// Dispatches one message.
    pub async fn dispatch(&self, message: Arc<Message>) -> DispatchOutcome {
        if message.is_from_bot() {
            return DispatchOutcome::Ignored(IgnoreReason::FromBot);
        }

        let prefix = self.context.prefix();
        let text = message.text();
        if !text.starts_with(prefix) {
            return DispatchOutcome::Ignored(IgnoreReason::MissingPrefix);
        }

        // The prefix is cut from the first token, not from the text: a prefix
        // containing a space leaves an empty trigger, which is never bound.
        let mut tokens = text.split(' ');
        let head = tokens.next().unwrap_or_default();
        let trigger = head.get(prefix.len()..).unwrap_or_default().to_owned();
        let candidates: Vec<&str> = tokens.collect();

        let Some(resolved) = self.container.commands().get_command(&trigger) else {
            debug!(trigger = %trigger, "No command bound to trigger");
            return DispatchOutcome::Ignored(IgnoreReason::UnknownTrigger(trigger));
        };

        let span = span!(Level::DEBUG, "dispatch", trigger = %trigger);
        let command = resolved.command;

        let args = match bind_arguments(resolved.parameters, &candidates) {
            Ok(args) => args,
            Err(errors) => {
                span.in_scope(|| {
                    debug!(
                        command = %command.qualified_name(),
                        errors = errors.len(),
                        "Arguments rejected"
                    )
                });
                return DispatchOutcome::Rejected { trigger, errors };
            }
        };

        let result = self
            .invoke(command, Arc::clone(&message), args)
            .instrument(span)
            .await;

        match result {
            Ok(()) => DispatchOutcome::Handled { trigger },
            Err(e) => {
                error!(
                    trigger = %trigger,
                    command = %command.qualified_name(),
                    "Handler failed: {e}"
                );
                DispatchOutcome::Failed {
                    trigger,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn invoke(
        &self,
        command: &LoadedCommand,
        message: Arc<Message>,
        args: CommandArgs,
    ) -> Result<(), BoxError> {
        let module = self
            .container
            .modules()
            .get_instance(command.module.as_str())
            .ok_or_else(|| InvocationError::ModuleNotLoaded {
                module: command.module.to_string(),
            })?;
        let handler = self
            .container
            .handler(command.module.as_str(), &command.handler_key)
            .ok_or_else(|| InvocationError::HandlerNotFound {
                command: command.qualified_name(),
            })?;

        debug!(command = %command.qualified_name(), "Invoking handler");
        handler
            .oneshot(Invocation {
                module,
                context: Arc::clone(&self.context),
                message,
                args,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aphid_core::{
        BufferChannel, CommandInfo, ContainerResult, Dependencies, Injectable, ModuleInfo,
        ParameterInfo, ParameterKind, TypeKey,
    };
    use parking_lot::Mutex;
    use tokio_test::assert_ok;

    use crate::error::HandlerResult;

    /// Records every invocation so tests can inspect what the handler saw.
    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<CommandArgs>>,
    }

    struct Greeter {
        journal: Arc<Journal>,
    }

    struct Unloaded;

    aphid_core::component!(Journal, Greeter, Unloaded);

    impl Injectable for Journal {
        fn construct(_: Dependencies) -> ContainerResult<Self> {
            Ok(Journal::default())
        }
    }

    impl Injectable for Greeter {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Journal>()]
        }

        fn construct(mut deps: Dependencies) -> ContainerResult<Self> {
            Ok(Greeter {
                journal: deps.next()?,
            })
        }
    }

    async fn greet(
        greeter: Arc<Greeter>,
        ctx: Arc<AphidContext>,
        message: Arc<Message>,
        args: CommandArgs,
    ) -> HandlerResult {
        let times = args.number("times").unwrap_or(1.0);
        message
            .reply(format!("hello x{times} from {}", ctx.author()))
            .await?;
        greeter.journal.calls.lock().push(args);
        Ok(())
    }

    async fn fail(
        _: Arc<Greeter>,
        _: Arc<AphidContext>,
        _: Arc<Message>,
        _: CommandArgs,
    ) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("boom"))
    }

    async fn orphan(_: Arc<Unloaded>, _: Arc<AphidContext>, _: Arc<Message>, _: CommandArgs) {}

    fn dispatcher() -> Dispatcher {
        let mut container = Container::default();
        assert_ok!(container.register_service::<Journal>());
        assert_ok!(container.register_module::<Greeter>(ModuleInfo::new("Greeter", "")));
        assert_ok!(container.register_command::<Greeter, _>(
            "greet",
            CommandInfo::new("greet", ["greet"]),
            greet,
        ));
        assert_ok!(container.register_parameter::<Greeter>(
            "greet",
            ParameterInfo::new("times", ParameterKind::Number),
        ));
        assert_ok!(container.register_command::<Greeter, _>(
            "fail",
            CommandInfo::new("fail", ["fail"]),
            fail,
        ));
        assert_ok!(container.register_command::<Unloaded, _>(
            "orphan",
            CommandInfo::new("orphan", ["orphan"]),
            orphan,
        ));

        Dispatcher::new(Arc::new(container), BotOptions::new("!", "ada"))
    }

    fn message(text: &str, channel: &Arc<BufferChannel>) -> Arc<Message> {
        Arc::new(Message::new(text, channel.clone()))
    }

    fn journal(dispatcher: &Dispatcher) -> Vec<CommandArgs> {
        dispatcher
            .context()
            .service::<Journal>()
            .map(|journal| journal.calls.lock().clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_binds_arguments_and_rest() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("!greet 3 extra", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Handled {
                trigger: "greet".into()
            }
        );
        let calls = journal(&dispatcher);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].number("times"), Some(3.0));
        assert_eq!(calls[0].rest(), ["extra"]);
        assert_eq!(channel.sent(), vec!["hello x3 from ada"]);
    }

    #[tokio::test]
    async fn test_missing_argument_is_returned() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("!greet", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Rejected {
                trigger: "greet".into(),
                errors: vec![BindError::MissingArgument {
                    parameter: "times".into()
                }],
            }
        );
        assert!(journal(&dispatcher).is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_returned() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("!greet abc", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Rejected {
                trigger: "greet".into(),
                errors: vec![BindError::TypeMismatch {
                    parameter: "times".into(),
                    expected: ParameterKind::Number,
                    value: "abc".into(),
                }],
            }
        );
        assert!(journal(&dispatcher).is_empty());
    }

    #[tokio::test]
    async fn test_ignored_messages() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("hello", &channel)).await;
        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::MissingPrefix));

        let from_bot = Arc::new(Message::new("!greet 3", channel.clone()).sent_by_bot(true));
        let outcome = dispatcher.dispatch(from_bot).await;
        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::FromBot));

        let outcome = dispatcher.dispatch(message("!nope", &channel)).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::UnknownTrigger("nope".into()))
        );

        assert!(journal(&dispatcher).is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_is_case_sensitive() {
        let mut container = Container::default();
        assert_ok!(container.register_service::<Journal>());
        assert_ok!(container.register_module::<Greeter>(ModuleInfo::new("Greeter", "")));
        assert_ok!(container.register_command::<Greeter, _>(
            "greet",
            CommandInfo::new("greet", ["greet"]),
            greet,
        ));
        let dispatcher = Dispatcher::new(Arc::new(container), BotOptions::new("hey.", ""));
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("HEY.greet", &channel)).await;
        assert!(outcome.is_ignored());

        let outcome = dispatcher.dispatch(message("hey.greet", &channel)).await;
        assert!(outcome.is_handled());
    }

    #[tokio::test]
    async fn test_prefix_with_space_leaves_empty_trigger() {
        let mut container = Container::default();
        assert_ok!(container.register_service::<Journal>());
        assert_ok!(container.register_module::<Greeter>(ModuleInfo::new("Greeter", "")));
        assert_ok!(container.register_command::<Greeter, _>(
            "greet",
            CommandInfo::new("greet", ["greet"]),
            greet,
        ));
        let dispatcher = Dispatcher::new(Arc::new(container), BotOptions::new("bot ", ""));
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("bot greet", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::UnknownTrigger(String::new()))
        );
        assert!(journal(&dispatcher).is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_is_reported() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("!fail", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                trigger: "fail".into(),
                error: "boom".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_unloaded_module_fails() {
        let dispatcher = dispatcher();
        let channel = Arc::new(BufferChannel::new());

        let outcome = dispatcher.dispatch(message("!orphan", &channel)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                trigger: "orphan".into(),
                error: "module Unloaded is not loaded".into(),
            }
        );
    }

    #[test]
    fn test_outcome_display() {
        let outcome = DispatchOutcome::Rejected {
            trigger: "greet".into(),
            errors: vec![
                BindError::TypeMismatch {
                    parameter: "times".into(),
                    expected: ParameterKind::Number,
                    value: "abc".into(),
                },
                BindError::MissingArgument {
                    parameter: "name".into(),
                },
            ],
        };
        assert_eq!(
            outcome.to_string(),
            "greet: argument \"times\" expects a number, got \"abc\", missing argument \"name\""
        );
    }
}
