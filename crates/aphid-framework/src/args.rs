//! Positional argument binding.
//!
//! [`bind_arguments`] matches the tokens following a trigger against a
//! handler's declared parameters and produces the [`CommandArgs`] handed to
//! the handler.

use std::collections::HashMap;
use std::fmt;

use aphid_core::{LoadedParameter, ParameterKind};
use serde::Serialize;

use crate::error::BindError;

/// A bound argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Number(f64),
    Boolean(bool),
    String(String),
}

impl ArgValue {
    /// Parses `token` as `kind`, returning `None` on a mismatch.
    pub fn parse(kind: ParameterKind, token: &str) -> Option<Self> {
        match kind {
            ParameterKind::String => Some(Self::String(token.to_owned())),
            ParameterKind::Number => token
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number),
            ParameterKind::Boolean => {
                if token.eq_ignore_ascii_case("true") {
                    Some(Self::Boolean(true))
                } else if token.eq_ignore_ascii_case("false") {
                    Some(Self::Boolean(false))
                } else {
                    None
                }
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Arguments of one command invocation.
///
/// `values` holds every bound parameter by name. Optional parameters without
/// a token are absent. Tokens beyond the declared parameters are kept in
/// `rest`, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandArgs {
    #[serde(flatten)]
    values: HashMap<String, ArgValue>,
    rest: Vec<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_number)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &HashMap<String, ArgValue> {
        &self.values
    }

    /// Tokens that matched no declared parameter.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    /// Sets `name`, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Appends an unmatched token.
    pub fn push_rest(&mut self, token: impl Into<String>) {
        self.rest.push(token.into());
    }

    /// Renders the arguments as a JSON object, with `rest` as an array.
    ///
    /// No parameter can be named `rest`; the registry rejects it.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Binds `tokens` to `parameters` positionally.
///
/// A required parameter without a token stops binding immediately with a
/// single [`BindError::MissingArgument`]. Type mismatches do not stop
/// binding, so every mismatching token is reported together.
pub fn bind_arguments<S: AsRef<str>>(
    parameters: &[LoadedParameter],
    tokens: &[S],
) -> Result<CommandArgs, Vec<BindError>> {
    let mut args = CommandArgs::new();
    let mut errors = Vec::new();

    for (index, parameter) in parameters.iter().enumerate() {
        let info = &parameter.info;
        let Some(token) = tokens.get(index) else {
            if info.required {
                errors.push(BindError::MissingArgument {
                    parameter: info.name.clone(),
                });
                return Err(errors);
            }
            continue;
        };
        let token: &str = token.as_ref();

        match ArgValue::parse(info.kind, token) {
            Some(value) => args.insert(info.name.clone(), value),
            None => errors.push(BindError::TypeMismatch {
                parameter: info.name.clone(),
                expected: info.kind,
                value: token.to_owned(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    args.rest = tokens
        .iter()
        .skip(parameters.len())
        .map(|token| token.as_ref().to_owned())
        .collect();
    Ok(args)
}
