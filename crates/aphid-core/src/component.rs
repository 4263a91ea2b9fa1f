//! Type identity and constructor metadata.
//!
//! Every type that can live in an [`InstanceStore`](crate::store::InstanceStore)
//! implements [`Component`], which gives it a stable string identifier.
//! Types that the [`ServiceFactory`](crate::factory::ServiceFactory) can build
//! additionally implement [`Injectable`], declaring the ordered list of
//! components their constructor needs.

use std::any::Any;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};

/// A type-erased, shareable instance as kept by the stores.
///
/// The concrete value behind the `dyn Any` is the component itself, so
/// `Arc::downcast::<T>()` recovers an `Arc<T>`.
pub type ServiceArc = Arc<dyn Any + Send + Sync>;

// =============================================================================
// TypeKey
// =============================================================================

/// Stable string naming a registered type.
///
/// Used as the key of every registry. Implements `Borrow<str>` so maps keyed by
/// `TypeKey` can be queried with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Creates a key from a static name without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a key from any string.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the key of component `T`.
    pub fn of<T: Component>() -> Self {
        Self::from_static(T::NAME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TypeKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

// =============================================================================
// Component / Injectable
// =============================================================================

/// A type with a stable identity that may be stored as a singleton.
///
/// Use the [`component!`](crate::component) macro to derive the identifier
/// from the type name.
pub trait Component: Any + Send + Sync {
    /// Identifier of this type, unique within a process.
    const NAME: &'static str;
}

/// A component the [`ServiceFactory`](crate::factory::ServiceFactory) can
/// construct.
///
/// The dependency list is declared up front instead of being recovered from
/// constructor signatures, which keeps the dependency graph introspectable.
///
/// # Example
///
/// ```rust,ignore
/// struct Greeter { counter: Arc<Counter> }
///
/// impl Injectable for Greeter {
///     fn dependencies() -> Vec<TypeKey> {
///         vec![TypeKey::of::<Counter>()]
///     }
///
///     fn construct(mut deps: Dependencies) -> ContainerResult<Self> {
///         Ok(Greeter { counter: deps.next()? })
///     }
/// }
/// ```
pub trait Injectable: Component + Sized {
    /// Components the constructor takes, in argument order.
    fn dependencies() -> Vec<TypeKey> {
        Vec::new()
    }

    /// Builds the instance from the resolved dependencies.
    fn construct(deps: Dependencies) -> ContainerResult<Self>;
}

// =============================================================================
// Dependencies
// =============================================================================

/// The resolved constructor arguments of one [`Injectable::construct`] call.
///
/// Instances are handed out positionally, in the order the type declared them.
pub struct Dependencies {
    requester: TypeKey,
    resolved: std::vec::IntoIter<(TypeKey, ServiceArc)>,
}

impl Dependencies {
    pub(crate) fn new(requester: TypeKey, resolved: Vec<(TypeKey, ServiceArc)>) -> Self {
        Self {
            requester,
            resolved: resolved.into_iter(),
        }
    }

    /// Takes the next declared dependency as an `Arc<D>`.
    ///
    /// Fails with [`ContainerError::InvalidArgument`] when every declared
    /// dependency was already taken, or when the dependency at this position
    /// is not a `D`.
    pub fn next<D: Component>(&mut self) -> ContainerResult<Arc<D>> {
        let (key, instance) = self.resolved.next().ok_or_else(|| {
            ContainerError::invalid_argument(format!(
                "{} asked for {} beyond its declared dependencies",
                self.requester,
                D::NAME
            ))
        })?;

        if key.as_str() != D::NAME {
            return Err(ContainerError::invalid_argument(format!(
                "{} declared {} at this position but asked for {}",
                self.requester,
                key,
                D::NAME
            )));
        }

        instance.downcast::<D>().map_err(|_| {
            ContainerError::invalid_argument(format!(
                "stored instance of {} is not a {}",
                key,
                std::any::type_name::<D>()
            ))
        })
    }

    /// Number of dependencies not yet taken.
    pub fn remaining(&self) -> usize {
        self.resolved.len()
    }

    /// The type being constructed.
    pub fn requester(&self) -> &TypeKey {
        &self.requester
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("requester", &self.requester)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Alpha;
    struct Beta;

    crate::component!(Alpha, Beta);

    #[test]
    fn test_type_key_of_uses_component_name() {
        assert_eq!(TypeKey::of::<Alpha>().as_str(), "Alpha");
        assert_eq!(TypeKey::of::<Beta>(), TypeKey::from("Beta"));
    }

    #[test]
    fn test_type_key_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(TypeKey::new(String::from("Alpha")), 1);
        assert_eq!(map.get("Alpha"), Some(&1));
    }

    #[test]
    fn test_dependencies_positional() {
        let alpha: ServiceArc = Arc::new(Alpha);
        let mut deps = Dependencies::new(
            TypeKey::from("Requester"),
            vec![(TypeKey::of::<Alpha>(), alpha)],
        );
        assert_eq!(deps.remaining(), 1);
        assert!(deps.next::<Alpha>().is_ok());
        assert!(matches!(
            deps.next::<Alpha>(),
            Err(ContainerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dependencies_wrong_type() {
        let alpha: ServiceArc = Arc::new(Alpha);
        let mut deps = Dependencies::new(
            TypeKey::from("Requester"),
            vec![(TypeKey::of::<Alpha>(), alpha)],
        );
        assert!(matches!(
            deps.next::<Beta>(),
            Err(ContainerError::InvalidArgument(_))
        ));
    }
}
