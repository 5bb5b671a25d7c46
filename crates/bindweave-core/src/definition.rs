//! Process-wide dependency-property identity.
//!
//! A [`PropertyDefinition`] is created once per property per owner type,
//! normally inside a `LazyLock` static, and never destroyed. Identity is the
//! unique id alone; name and types exist for validation and diagnostics.
//!
//! The unique id comes from the [`DefinitionRegistry`], an explicit
//! process-wide allocator backed by an atomic counter. Ids are assigned
//! starting at 1 in strictly increasing order and are never reused, so two
//! definitions created by separate `create` calls can never compare equal.

use core::any::{Any, TypeId, type_name};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors from [`PropertyDefinition::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The property name was empty.
    EmptyName,
    /// The methods bundle records a different value type than the one
    /// declared.
    ValueTypeMismatch { recorded: &'static str },
    /// The methods bundle records a different owner type than the one
    /// declared.
    OwnerTypeMismatch { recorded: &'static str },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "property definitions require a non-empty name"),
            Self::ValueTypeMismatch { recorded } => write!(
                f,
                "methods bundle value type '{recorded}' does not match the declared value type"
            ),
            Self::OwnerTypeMismatch { recorded } => write!(
                f,
                "methods bundle owner type '{recorded}' does not match the declared owner type"
            ),
        }
    }
}

impl std::error::Error for DefinitionError {}

/// The accessor bundle attached to a property definition.
///
/// Records the value and owner types the definition was built for, and acts
/// as the downcast anchor the typed property storage uses to verify at
/// registration time that a definition actually belongs to it.
pub trait MethodsDefinition {
    fn value_type(&self) -> TypeId;
    fn owner_type(&self) -> TypeId;
    fn value_type_name(&self) -> &'static str;
    fn owner_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

/// Concrete accessor bundle for a `TValue` property.
///
/// The value type is a generic parameter so that typed property storage can
/// downcast a definition's bundle and verify the definition really describes
/// a `TValue` slot; the owner type is only recorded as a `TypeId` since no
/// storage-side code needs to name it.
pub struct TypedMethodsDefinition<TValue: 'static> {
    owner_type: TypeId,
    owner_type_name: &'static str,
    _marker: PhantomData<fn() -> TValue>,
}

impl<TValue: 'static> TypedMethodsDefinition<TValue> {
    /// Build a bundle for a `TValue` property declared on `TOwner`.
    #[must_use]
    pub fn for_owner<TOwner: 'static>() -> Arc<Self> {
        Arc::new(Self {
            owner_type: TypeId::of::<TOwner>(),
            owner_type_name: type_name::<TOwner>(),
            _marker: PhantomData,
        })
    }
}

impl<TValue: 'static> MethodsDefinition for TypedMethodsDefinition<TValue> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<TValue>()
    }

    fn owner_type(&self) -> TypeId {
        self.owner_type
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<TValue>()
    }

    fn owner_type_name(&self) -> &'static str {
        self.owner_type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Immutable descriptor for a named, typed property on an owner type.
///
/// Cheap to clone (the name and methods bundle are shared). Equality and
/// hashing use the unique id only — two definitions with identical names and
/// types created by separate `create` calls are *not* equal.
#[derive(Clone)]
pub struct PropertyDefinition {
    id: u64,
    name: Arc<str>,
    value_type: TypeId,
    owner_type: TypeId,
    methods: Arc<dyn MethodsDefinition + Send + Sync>,
}

impl PropertyDefinition {
    /// Create a definition, allocating the next process-wide unique id.
    ///
    /// Fails if `name` is empty or if the methods bundle's recorded types
    /// disagree with the declared ones.
    pub fn create(
        name: &str,
        value_type: TypeId,
        owner_type: TypeId,
        methods: Arc<dyn MethodsDefinition + Send + Sync>,
    ) -> Result<Self, DefinitionError> {
        if name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if methods.value_type() != value_type {
            return Err(DefinitionError::ValueTypeMismatch {
                recorded: methods.value_type_name(),
            });
        }
        if methods.owner_type() != owner_type {
            return Err(DefinitionError::OwnerTypeMismatch {
                recorded: methods.owner_type_name(),
            });
        }
        Ok(Self {
            id: DefinitionRegistry::global().allocate_id(),
            name: Arc::from(name),
            value_type,
            owner_type,
            methods,
        })
    }

    /// Convenience: create a definition for a `TValue` property on `TOwner`
    /// with a freshly built typed methods bundle.
    pub fn create_for<TOwner: 'static, TValue: 'static>(
        name: &str,
    ) -> Result<Self, DefinitionError> {
        Self::create(
            name,
            TypeId::of::<TValue>(),
            TypeId::of::<TOwner>(),
            TypedMethodsDefinition::<TValue>::for_owner::<TOwner>(),
        )
    }

    /// The process-wide unique id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The property name, as a non-owning view.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    #[must_use]
    pub fn owner_type(&self) -> TypeId {
        self.owner_type
    }

    /// The shared accessor bundle this definition was created with.
    #[must_use]
    pub fn methods(&self) -> &Arc<dyn MethodsDefinition + Send + Sync> {
        &self.methods
    }
}

impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PropertyDefinition {}

impl Hash for PropertyDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value_type", &self.methods.value_type_name())
            .field("owner_type", &self.methods.owner_type_name())
            .finish()
    }
}

/// Process-wide unique-id allocator for property definitions.
///
/// This is deliberately an explicit object rather than a function-local
/// static: the counter's lifetime and initialization order are those of the
/// process-level `static`, and tests that need a predictable id sequence can
/// call [`reset_for_tests`](Self::reset_for_tests).
pub struct DefinitionRegistry {
    next_id: AtomicU64,
}

static GLOBAL_REGISTRY: DefinitionRegistry = DefinitionRegistry {
    next_id: AtomicU64::new(1),
};

impl DefinitionRegistry {
    /// The process-wide registry instance.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    /// Allocate the next unique id (strictly increasing, never reused).
    pub fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Reset the counter. Intended for test isolation only; definitions
    /// created before a reset must not be compared against ones created
    /// after it.
    pub fn reset_for_tests(&self) {
        self.next_id.store(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn create_succeeds_with_matching_types() {
        let def = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        assert_eq!(def.name(), "Value");
        assert_eq!(def.value_type(), TypeId::of::<u32>());
        assert_eq!(def.owner_type(), TypeId::of::<Widget>());
    }

    #[test]
    fn create_rejects_empty_name() {
        let result = PropertyDefinition::create_for::<Widget, u32>("");
        assert_eq!(result.unwrap_err(), DefinitionError::EmptyName);
    }

    #[test]
    fn create_rejects_value_type_mismatch() {
        let methods = TypedMethodsDefinition::<f32>::for_owner::<Widget>();
        let result = PropertyDefinition::create(
            "Value",
            TypeId::of::<u32>(),
            TypeId::of::<Widget>(),
            methods,
        );
        assert!(matches!(
            result,
            Err(DefinitionError::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn create_rejects_owner_type_mismatch() {
        let methods = TypedMethodsDefinition::<u32>::for_owner::<u64>();
        let result = PropertyDefinition::create(
            "Value",
            TypeId::of::<u32>(),
            TypeId::of::<Widget>(),
            methods,
        );
        assert!(matches!(
            result,
            Err(DefinitionError::OwnerTypeMismatch { .. })
        ));
    }

    #[test]
    fn separately_created_definitions_never_compare_equal() {
        let a = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let b = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        assert_ne!(a, b);
        assert!(b.id() > a.id(), "ids are strictly increasing");
    }

    #[test]
    fn clone_is_identity() {
        let a = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }
}
