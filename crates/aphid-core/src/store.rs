//! Keyed storage of live component instances.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::component::{Component, ServiceArc, TypeKey};
use crate::error::{ContainerError, ContainerResult};

/// Identifiers rejected by a fresh [`InstanceStore`].
///
/// Built-in and primitive type names never identify an application component,
/// so a component declaring one of them is treated as a registration bug.
pub const DEFAULT_DENIED: &[&str] = &[
    "()", "bool", "char", "str", "String", "i8", "i16", "i32", "i64", "i128", "isize", "u8",
    "u16", "u32", "u64", "u128", "usize", "f32", "f64", "Number", "Boolean", "Object",
    "Function", "Symbol", "Vec", "Option", "HashMap",
];

/// A map from [`TypeKey`] to exactly one live instance of that type.
///
/// `add` overwrites silently. Identifiers that are empty, contain whitespace,
/// or appear on the deny-list are rejected with
/// [`ContainerError::InvalidArgument`]. There are no ordering guarantees.
#[derive(Debug)]
pub struct InstanceStore {
    instances: HashMap<TypeKey, ServiceArc>,
    denied: HashSet<String>,
}

impl Default for InstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceStore {
    /// Creates an empty store with the [`DEFAULT_DENIED`] deny-list.
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            denied: DEFAULT_DENIED.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Removes every instance. The deny-list is kept.
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Removes the instance stored under `key`, returning whether one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.instances.remove(key).is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        self.instances.contains_key(key)
    }

    /// Returns the stored instance of `T`, if any.
    pub fn get<T: Component>(&self) -> Option<Arc<T>> {
        self.get_erased(T::NAME)?.downcast::<T>().ok()
    }

    /// Returns the type-erased instance stored under `key`, if any.
    pub fn get_erased(&self, key: &str) -> Option<ServiceArc> {
        self.instances.get(key).cloned()
    }

    /// Stores `instance` under `T::NAME`, replacing any previous instance.
    pub fn add<T: Component>(&mut self, instance: Arc<T>) -> ContainerResult<&mut Self> {
        self.add_erased(TypeKey::of::<T>(), instance)
    }

    /// Stores an already type-erased instance under `key`.
    ///
    /// The caller guarantees that `instance` is the component named by `key`.
    pub fn add_erased(&mut self, key: TypeKey, instance: ServiceArc) -> ContainerResult<&mut Self> {
        self.validate(key.as_str())?;
        if self.instances.insert(key.clone(), instance).is_some() {
            trace!(component = %key, "Replaced stored instance");
        }
        Ok(self)
    }

    /// Checks that `name` may identify a stored component.
    pub fn validate(&self, name: &str) -> ContainerResult<()> {
        if name.trim().is_empty() {
            return Err(ContainerError::invalid_argument(
                "component identifier must not be empty",
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ContainerError::invalid_argument(format!(
                "component identifier \"{name}\" must not contain whitespace"
            )));
        }
        if self.denied.contains(name) {
            return Err(ContainerError::invalid_argument(format!(
                "expected a component instance, not built-in type \"{name}\""
            )));
        }
        Ok(())
    }

    /// Adds `name` to the deny-list.
    pub fn deny(&mut self, name: impl Into<String>) -> &mut Self {
        self.denied.insert(name.into());
        self
    }

    /// Removes `name` from the deny-list, returning whether it was present.
    pub fn allow(&mut self, name: &str) -> bool {
        self.denied.remove(name)
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.denied.contains(name)
    }

    /// Iterates over the keys of stored instances.
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.instances.keys()
    }
}
