//! Module metadata and singleton instances.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::component::{Component, Injectable, ServiceArc, TypeKey};
use crate::error::ContainerResult;
use crate::factory::ServiceFactory;
use crate::notify::{Notifier, default_notifier};
use crate::store::InstanceStore;

const SENDER: &str = "ModuleRegistry";

/// Descriptive information about a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Display name of the module.
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Records module metadata and owns one singleton instance per module type.
///
/// Instances are created through a [`ServiceFactory`], so a module may depend
/// on any service registered before it.
pub struct ModuleRegistry {
    info: HashMap<TypeKey, ModuleInfo>,
    instances: InstanceStore,
    /// Registration order, for enumeration.
    order: Vec<TypeKey>,
    notifier: Arc<dyn Notifier>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(default_notifier())
    }
}

impl ModuleRegistry {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            info: HashMap::new(),
            instances: InstanceStore::new(),
            order: Vec::new(),
            notifier,
        }
    }

    /// Creates the singleton of `M` and records `info` under `M::NAME`.
    ///
    /// On failure (typically [`UnresolvedDependency`]) nothing is recorded.
    ///
    /// [`UnresolvedDependency`]: crate::error::ContainerError::UnresolvedDependency
    pub fn load_module<M: Injectable>(
        &mut self,
        factory: &ServiceFactory,
        info: ModuleInfo,
    ) -> ContainerResult<Arc<M>> {
        let key = TypeKey::of::<M>();
        self.notifier.info(SENDER, &format!("Loading {key}"));

        let instance = match factory.create::<M>() {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                self.notifier
                    .error(SENDER, &format!("Failed to load module {key}: {e}"));
                return Err(e);
            }
        };

        self.instances.add(Arc::clone(&instance))?;
        self.notifier
            .success(SENDER, &format!("Loaded module: {}!", info.name));
        if !self.order.contains(&key) {
            self.order.push(key.clone());
        }
        self.info.insert(key, info);
        Ok(instance)
    }

    pub fn get_info(&self, key: &str) -> Option<&ModuleInfo> {
        self.info.get(key)
    }

    /// Returns the type-erased singleton registered under `key`.
    pub fn get_instance(&self, key: &str) -> Option<ServiceArc> {
        self.instances.get_erased(key)
    }

    /// Returns the singleton of `M`.
    pub fn get<M: Component>(&self) -> Option<Arc<M>> {
        self.instances.get::<M>()
    }

    /// Iterates over loaded modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = (&TypeKey, &ModuleInfo)> {
        self.order
            .iter()
            .filter_map(|key| self.info.get(key).map(|info| (key, info)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every module and its metadata.
    pub fn clear(&mut self) {
        self.info.clear();
        self.instances.clear();
        self.order.clear();
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.order)
            .finish_non_exhaustive()
    }
}
