use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// Runtime identity of a type, trait objects included
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Create the key for a type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if this key names `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Identity of a requested dependency: declared type plus optional name.
///
/// An empty name is the same identity as no name at all; every constructor
/// normalizes it, which is why the fields are private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyId {
    type_key: TypeKey,
    name: Option<String>,
}

impl DependencyId {
    /// Create an unnamed id for a type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            name: None,
        }
    }

    /// Create a named id for a type
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(TypeKey::of::<T>(), Some(name.into()))
    }

    /// Create an id from an already captured type key
    pub fn new(type_key: TypeKey, name: Option<String>) -> Self {
        Self {
            type_key,
            name: name.filter(|n| !n.is_empty()),
        }
    }

    /// Create an id for a type with an optional name
    pub fn with_name<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        Self::new(TypeKey::of::<T>(), name.map(str::to_string))
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn type_name(&self) -> &'static str {
        self.type_key.type_name()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if this id is declared with type `T`, whatever its name
    pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
        self.type_key.is::<T>()
    }

    /// Canonical key: `<type>` or `<type>@<name>`
    pub fn to_key(&self) -> String {
        match &self.name {
            Some(name) => format!("{}@{}", self.type_key.type_name(), name),
            None => self.type_key.type_name().to_string(),
        }
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}@{}", self.type_key, name),
            None => write!(f, "{}", self.type_key),
        }
    }
}

impl Serialize for DependencyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[allow(dead_code)]
    trait TestTrait: Send + Sync {
        fn value(&self) -> u32;
    }

    struct TestImpl;

    #[test]
    fn test_dependency_id_creation() {
        let id1 = DependencyId::of::<TestImpl>();
        let id2 = DependencyId::named::<TestImpl>("test");

        assert!(id1.is_type::<TestImpl>());
        assert_eq!(id1.name(), None);
        assert!(id2.is_type::<TestImpl>());
        assert_eq!(id2.name(), Some("test"));
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_empty_name_is_unnamed() {
        let unnamed = DependencyId::of::<TestImpl>();
        let empty = DependencyId::named::<TestImpl>("");
        let none = DependencyId::with_name::<TestImpl>(None);

        assert_eq!(unnamed, empty);
        assert_eq!(unnamed, none);

        let set: HashSet<_> = [unnamed, empty, none].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_key_format() {
        let unnamed = DependencyId::of::<String>();
        let named = DependencyId::named::<String>("cache");

        assert_eq!(unnamed.to_key(), "alloc::string::String");
        assert_eq!(named.to_key(), "alloc::string::String@cache");
        assert_eq!(named.to_string(), named.to_key());
    }

    #[test]
    fn test_trait_object_key() {
        let id = DependencyId::of::<dyn TestTrait>();

        assert!(id.type_name().contains("TestTrait"));
        assert!(id.is_type::<dyn TestTrait>());
        assert!(!id.is_type::<TestImpl>());
    }

    #[test]
    fn test_serializes_as_key() {
        let id = DependencyId::named::<String>("primary");
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"alloc::string::String@primary\"");
    }
}
