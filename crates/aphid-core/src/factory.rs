//! The service factory: the dependency-injection container proper.
//!
//! [`ServiceFactory`] builds instances of [`Injectable`] types by looking up
//! their declared dependencies in its [`InstanceStore`]. Resolution is depth
//! one: missing dependencies are reported, never created on demand, so a type
//! can only be built once everything it depends on was registered through
//! [`add_service`](ServiceFactory::add_service).
//!
//! Dependency cycles are not detected. In a cycle, whichever type is
//! registered first fails with [`ContainerError::UnresolvedDependency`]
//! naming the other member.

use std::sync::Arc;

use tracing::{debug, info};

use crate::component::{Dependencies, Injectable, TypeKey};
use crate::error::{ContainerError, ContainerResult};
use crate::store::InstanceStore;

/// Creates instances whose dependencies are registered services.
#[derive(Debug, Default)]
pub struct ServiceFactory {
    store: InstanceStore,
}

impl ServiceFactory {
    /// Creates a factory with an empty service store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory backed by an existing store.
    pub fn with_store(store: InstanceStore) -> Self {
        Self { store }
    }

    /// The store holding registered services.
    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut InstanceStore {
        &mut self.store
    }

    /// Builds a new `T`, supplying its declared dependencies from the store.
    ///
    /// The store is not modified. Every call injects the same stored
    /// dependency instances, so state reached through one created object is
    /// shared with every other object created here.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::InvalidArgument`] if `T::NAME` is not an acceptable
    ///   component identifier, or `T::construct` misreads its dependencies.
    /// - [`ContainerError::UnresolvedDependency`] naming `T` and the first
    ///   declared dependency missing from the store.
    pub fn create<T: Injectable>(&self) -> ContainerResult<T> {
        let requester = TypeKey::of::<T>();
        self.store.validate(requester.as_str())?;

        let declared = T::dependencies();
        let mut resolved = Vec::with_capacity(declared.len());
        for dependency in declared {
            match self.store.get_erased(dependency.as_str()) {
                Some(instance) => resolved.push((dependency, instance)),
                None => {
                    return Err(ContainerError::UnresolvedDependency {
                        requester,
                        dependency,
                    });
                }
            }
        }

        debug!(
            component = %requester,
            dependencies = resolved.len(),
            "Constructing component"
        );
        T::construct(Dependencies::new(requester, resolved))
    }

    /// Builds `T` and stores it as a singleton available to later types.
    ///
    /// Returns the stored instance.
    pub fn add_service<T: Injectable>(&mut self) -> ContainerResult<Arc<T>> {
        let service = Arc::new(self.create::<T>()?);
        self.store.add(Arc::clone(&service))?;
        info!(service = T::NAME, "Service registered");
        Ok(service)
    }

    /// Removes every registered service.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}
