//! Command and parameter registration.
//!
//! The [`CommandRegistry`] maps trigger words to the module handler they
//! select, together with the ordered positional parameters of that handler.
//!
//! Trigger collisions are not errors: the first registration keeps the
//! trigger, the later command loses only that trigger and a warning is sent
//! to the [`Notifier`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::TypeKey;
use crate::error::{ContainerError, ContainerResult};
use crate::notify::{Notifier, default_notifier};

const SENDER: &str = "CommandRegistry";

/// Name under which unbound tokens are kept; no parameter may use it.
pub const REST_KEY: &str = "rest";

// =============================================================================
// Registration records
// =============================================================================

/// A command that invokes a module handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    /// Words that select this command when they follow the prefix.
    pub trigger: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl CommandInfo {
    pub fn new<I, S>(name: impl Into<String>, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            trigger: triggers.into_iter().map(Into::into).collect(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How an argument token is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// The raw token.
    #[default]
    #[serde(alias = "String")]
    String,
    /// A finite numeric literal.
    #[serde(alias = "Number")]
    Number,
    /// `true` or `false`, case-insensitive.
    #[serde(alias = "Boolean")]
    Boolean,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_required() -> bool {
    true
}

/// A positional parameter of a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: ParameterKind,
    /// Defaults to `true`.
    #[serde(default = "default_required")]
    pub required: bool,
}

impl ParameterInfo {
    /// Creates a required parameter.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required: true,
        }
    }

    /// Marks the parameter as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A registered command. Immutable once added to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCommand {
    /// The module owning the handler.
    pub module: TypeKey,
    /// Name of the handler within the module.
    pub handler_key: String,
    pub info: CommandInfo,
}

impl LoadedCommand {
    pub fn new(module: TypeKey, handler_key: impl Into<String>, info: CommandInfo) -> Self {
        Self {
            module,
            handler_key: handler_key.into(),
            info,
        }
    }

    /// `Module.handler()`, as used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}()", self.module, self.handler_key)
    }
}

/// A registered handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedParameter {
    pub module: TypeKey,
    pub handler_key: String,
    pub info: ParameterInfo,
}

impl LoadedParameter {
    pub fn new(module: TypeKey, handler_key: impl Into<String>, info: ParameterInfo) -> Self {
        Self {
            module,
            handler_key: handler_key.into(),
            info,
        }
    }
}

/// A trigger that could not be bound because an earlier command owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCollision {
    pub trigger: String,
    /// Qualified name of the command keeping the trigger.
    pub existing: String,
    /// Qualified name of the command that lost it.
    pub rejected: String,
}

/// A command looked up by trigger, with its ordered parameters.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCommand<'a> {
    pub command: &'a LoadedCommand,
    pub parameters: &'a [LoadedParameter],
}

// =============================================================================
// CommandRegistry
// =============================================================================

/// Trigger and parameter tables for every registered command.
pub struct CommandRegistry {
    triggers: HashMap<String, Arc<LoadedCommand>>,
    /// Every command per module, including ones that lost all their triggers.
    by_module: HashMap<TypeKey, Vec<Arc<LoadedCommand>>>,
    /// module → handler key → parameters in registration order.
    parameters: HashMap<TypeKey, HashMap<String, Vec<LoadedParameter>>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(default_notifier())
    }
}

impl CommandRegistry {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            triggers: HashMap::new(),
            by_module: HashMap::new(),
            parameters: HashMap::new(),
            notifier,
        }
    }

    /// Registers `command` and binds its triggers.
    ///
    /// Triggers already bound to another command stay with that command; each
    /// such collision is reported as a warning and returned. The command is
    /// recorded under its module either way.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidArgument`] when the command has no triggers,
    /// or when its handler is already registered.
    pub fn add_command(&mut self, command: LoadedCommand) -> ContainerResult<Vec<TriggerCollision>> {
        if command.info.trigger.is_empty() {
            let msg = format!(
                "The command {} needs at least one trigger.",
                command.qualified_name()
            );
            self.notifier.error(SENDER, &msg);
            return Err(ContainerError::InvalidArgument(msg));
        }

        if self
            .commands_for(command.module.as_str())
            .any(|existing| existing.handler_key == command.handler_key)
        {
            let msg = format!("The command {} is already registered.", command.qualified_name());
            self.notifier.error(SENDER, &msg);
            return Err(ContainerError::InvalidArgument(msg));
        }

        let command = Arc::new(command);
        let mut collisions = Vec::new();

        for trigger in &command.info.trigger {
            if let Some(existing) = self.triggers.get(trigger) {
                let collision = TriggerCollision {
                    trigger: trigger.clone(),
                    existing: existing.qualified_name(),
                    rejected: command.qualified_name(),
                };
                self.notifier.warning(
                    SENDER,
                    &format!(
                        "{} tried to use the trigger \"{}\", but it is already used by {}",
                        collision.rejected, collision.trigger, collision.existing
                    ),
                );
                collisions.push(collision);
                continue;
            }
            self.triggers.insert(trigger.clone(), Arc::clone(&command));
        }

        debug!(
            command = %command.qualified_name(),
            triggers = command.info.trigger.len() - collisions.len(),
            "Command registered"
        );

        self.by_module
            .entry(command.module.clone())
            .or_default()
            .push(command);

        Ok(collisions)
    }

    /// Appends `parameter` to its handler's parameter list.
    ///
    /// Parameters bind in the order they are added. A duplicate name is
    /// reported as a warning but still added.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidArgument`] when the parameter is named
    /// [`REST_KEY`], which holds the unbound tokens.
    pub fn add_parameter(&mut self, parameter: LoadedParameter) -> ContainerResult<()> {
        if parameter.info.name == REST_KEY {
            let msg = format!(
                "{}.{}() cannot name a parameter \"{REST_KEY}\"",
                parameter.module, parameter.handler_key
            );
            self.notifier.error(SENDER, &msg);
            return Err(ContainerError::InvalidArgument(msg));
        }

        let list = self
            .parameters
            .entry(parameter.module.clone())
            .or_default()
            .entry(parameter.handler_key.clone())
            .or_default();

        if list.iter().any(|p| p.info.name == parameter.info.name) {
            self.notifier.warning(
                SENDER,
                &format!(
                    "{}.{}() declares the parameter \"{}\" more than once",
                    parameter.module, parameter.handler_key, parameter.info.name
                ),
            );
        }

        list.push(parameter);
        Ok(())
    }

    pub fn has_trigger(&self, trigger: &str) -> bool {
        self.triggers.contains_key(trigger)
    }

    /// Returns the command bound to `trigger` and its parameters.
    pub fn get_command(&self, trigger: &str) -> Option<ResolvedCommand<'_>> {
        let command = self.triggers.get(trigger)?;
        Some(ResolvedCommand {
            command,
            parameters: self.parameters(command.module.as_str(), &command.handler_key),
        })
    }

    /// Parameters of a handler, in binding order.
    pub fn parameters(&self, module: &str, handler_key: &str) -> &[LoadedParameter] {
        self.parameters
            .get(module)
            .and_then(|handlers| handlers.get(handler_key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every command registered for `module`, in registration order.
    pub fn commands_for(&self, module: &str) -> impl Iterator<Item = &LoadedCommand> {
        self.by_module
            .get(module)
            .into_iter()
            .flatten()
            .map(|command| &**command)
    }

    /// Bound triggers with their commands, sorted by trigger.
    pub fn triggers(&self) -> Vec<(&str, &LoadedCommand)> {
        let mut triggers: Vec<_> = self
            .triggers
            .iter()
            .map(|(trigger, command)| (trigger.as_str(), command.as_ref()))
            .collect();
        triggers.sort_unstable_by_key(|(trigger, _)| *trigger);
        triggers
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.by_module.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_module.is_empty()
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
        self.by_module.clear();
        self.parameters.clear();
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("triggers", &self.triggers.len())
            .field("commands", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogLevel, MemoryNotifier};

    fn command(module: &'static str, key: &str, triggers: &[&str]) -> LoadedCommand {
        LoadedCommand::new(
            TypeKey::from(module),
            key,
            CommandInfo::new(key, triggers.iter().copied()),
        )
    }

    fn registry() -> (CommandRegistry, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        (CommandRegistry::new(notifier.clone()), notifier)
    }

    #[test]
    fn test_add_command_binds_triggers() {
        let (mut registry, _) = registry();
        let collisions = registry
            .add_command(command("Greeter", "greet", &["greet", "hi"]))
            .unwrap();

        assert!(collisions.is_empty());
        assert!(registry.has_trigger("greet"));
        assert!(registry.has_trigger("hi"));
        assert!(!registry.has_trigger("bye"));

        let resolved = registry.get_command("hi").unwrap();
        assert_eq!(resolved.command.handler_key, "greet");
        assert!(resolved.parameters.is_empty());
    }

    #[test]
    fn test_add_command_requires_trigger() {
        let (mut registry, notifier) = registry();
        let err = registry
            .add_command(command("Greeter", "greet", &[]))
            .unwrap_err();

        assert!(matches!(err, ContainerError::InvalidArgument(_)));
        assert!(registry.is_empty());
        assert_eq!(notifier.at_level(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_trigger_collision_keeps_first_binding() {
        let (mut registry, notifier) = registry();
        registry
            .add_command(command("Greeter", "greet", &["greet"]))
            .unwrap();
        let collisions = registry
            .add_command(command("Other", "welcome", &["greet", "welcome"]))
            .unwrap();

        assert_eq!(
            collisions,
            vec![TriggerCollision {
                trigger: "greet".into(),
                existing: "Greeter.greet()".into(),
                rejected: "Other.welcome()".into(),
            }]
        );

        let winner = registry.get_command("greet").unwrap();
        assert_eq!(winner.command.module.as_str(), "Greeter");

        let other = registry.get_command("welcome").unwrap();
        assert_eq!(other.command.module.as_str(), "Other");

        let warnings = notifier.at_level(LogLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].text.contains("Greeter.greet()"));
        assert!(warnings[0].text.contains("Other.welcome()"));
    }

    #[test]
    fn test_command_without_free_trigger_still_enumerated() {
        let (mut registry, _) = registry();
        registry
            .add_command(command("Greeter", "greet", &["greet"]))
            .unwrap();
        registry
            .add_command(command("Greeter", "greet_again", &["greet"]))
            .unwrap();

        let keys: Vec<&str> = registry
            .commands_for("Greeter")
            .map(|c| c.handler_key.as_str())
            .collect();
        assert_eq!(keys, vec!["greet", "greet_again"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.triggers().len(), 1);
    }

    #[test]
    fn test_parameters_keep_registration_order() {
        let (mut registry, _) = registry();
        registry
            .add_command(command("Greeter", "greet", &["greet"]))
            .unwrap();
        registry
            .add_parameter(LoadedParameter::new(
                TypeKey::from("Greeter"),
                "greet",
                ParameterInfo::new("times", ParameterKind::Number),
            ))
            .unwrap();
        registry
            .add_parameter(LoadedParameter::new(
                TypeKey::from("Greeter"),
                "greet",
                ParameterInfo::new("name", ParameterKind::String).optional(),
            ))
            .unwrap();

        let resolved = registry.get_command("greet").unwrap();
        let names: Vec<&str> = resolved
            .parameters
            .iter()
            .map(|p| p.info.name.as_str())
            .collect();
        assert_eq!(names, vec!["times", "name"]);
        assert!(!resolved.parameters[1].info.required);
    }

    #[test]
    fn test_duplicate_parameter_name_warns_and_is_kept() {
        let (mut registry, notifier) = registry();
        for _ in 0..2 {
            registry
                .add_parameter(LoadedParameter::new(
                    TypeKey::from("Greeter"),
                    "greet",
                    ParameterInfo::new("times", ParameterKind::Number),
                ))
                .unwrap();
        }

        assert_eq!(registry.parameters("Greeter", "greet").len(), 2);
        assert_eq!(notifier.at_level(LogLevel::Warning).len(), 1);
    }

    #[test]
    fn test_parameter_named_rest_is_rejected() {
        let (mut registry, notifier) = registry();
        let err = registry
            .add_parameter(LoadedParameter::new(
                TypeKey::from("Greeter"),
                "greet",
                ParameterInfo::new(REST_KEY, ParameterKind::String),
            ))
            .unwrap_err();

        assert!(matches!(err, ContainerError::InvalidArgument(_)));
        assert!(registry.parameters("Greeter", "greet").is_empty());
        assert_eq!(notifier.at_level(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_same_handler_registered_twice_keeps_first() {
        let (mut registry, notifier) = registry();
        registry
            .add_command(command("Greeter", "greet", &["greet"]))
            .unwrap();
        let err = registry
            .add_command(command("Greeter", "greet", &["greet", "hello"]))
            .unwrap_err();

        assert!(matches!(err, ContainerError::InvalidArgument(_)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.has_trigger("hello"));
        assert_eq!(notifier.at_level(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_info_records_deserialize() {
        let info: CommandInfo = serde_json::from_str(
            r#"{"name": "greet", "trigger": ["greet", "hi"], "description": "Says hi"}"#,
        )
        .unwrap();
        assert_eq!(info.trigger, vec!["greet", "hi"]);

        let param: ParameterInfo =
            serde_json::from_str(r#"{"name": "times", "kind": "Number"}"#).unwrap();
        assert_eq!(param.kind, ParameterKind::Number);
        assert!(param.required);

        let param: ParameterInfo = serde_json::from_str(
            r#"{"name": "loud", "kind": "boolean", "required": false}"#,
        )
        .unwrap();
        assert_eq!(param.kind, ParameterKind::Boolean);
        assert!(!param.required);
    }
}
