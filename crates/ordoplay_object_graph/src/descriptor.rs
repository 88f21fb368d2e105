// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type descriptions consumed by the node builder.
//!
//! The container never inspects values on its own: it asks a
//! [`TypeDescriber`] for the member list of every object or struct type it
//! builds nodes for. [`TypeRegistry`] is the stock describer and can be
//! populated in code or loaded from RON.

use crate::error::GraphError;
use crate::value::{ObjectRef, StructValue, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a member, collection item or node content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// Text (nullable)
    String,
    /// Any value, including null
    Any,
    /// A described object or struct type
    Named(String),
    /// Ordered list of items
    List(Box<TypeRef>),
    /// Dictionary from keys to values
    Map(Box<TypeRef>, Box<TypeRef>),
}

impl TypeRef {
    /// Shorthand for [`TypeRef::Named`]
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// Shorthand for [`TypeRef::List`]
    pub fn list(item: TypeRef) -> Self {
        TypeRef::List(Box::new(item))
    }

    /// Shorthand for [`TypeRef::Map`]
    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    /// Whether this is one of the built-in leaf types
    pub fn is_builtin_primitive(&self) -> bool {
        matches!(self, TypeRef::Bool | TypeRef::Int | TypeRef::Float | TypeRef::String)
    }

    /// Item type of a list, or value type of a map
    pub fn item_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::List(item) | TypeRef::Map(_, item) => Some(item),
            _ => None,
        }
    }

    /// Whether `value` may be stored in a slot of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Any, _) => true,
            (TypeRef::Bool, Value::Bool(_))
            | (TypeRef::Int, Value::Int(_))
            | (TypeRef::Float, Value::Float(_) | Value::Int(_))
            | (TypeRef::String, Value::String(_) | Value::Null) => true,
            (TypeRef::Named(_) | TypeRef::List(_) | TypeRef::Map(..), Value::Null) => true,
            (TypeRef::Named(name), Value::Object(object)) => object.type_name() == *name,
            (TypeRef::Named(name), Value::Struct(value)) => value.type_name() == name,
            (TypeRef::List(item), Value::List(list)) => list.item_type() == **item,
            (TypeRef::Map(key, item), Value::Map(map)) => {
                map.key_type() == **key && map.value_type() == **item
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Int => write!(f, "int"),
            TypeRef::Float => write!(f, "float"),
            TypeRef::String => write!(f, "string"),
            TypeRef::Any => write!(f, "any"),
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::List(item) => write!(f, "List<{item}>"),
            TypeRef::Map(key, item) => write!(f, "Map<{key}, {item}>"),
        }
    }
}

/// Whether a described type has reference or value semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Shared by identity, may be null
    Class,
    /// Copied by value, never null
    Struct,
}

/// A named member of a described type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name, unique within its type
    pub name: String,
    /// Declared member type
    pub ty: TypeRef,
}

/// Description of an object or struct type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Type name
    pub name: String,
    /// Class or struct
    pub kind: ObjectKind,
    /// Members in declaration order
    pub members: Vec<MemberDescriptor>,
}

impl ObjectDescriptor {
    /// Look up a member by name
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Source of type descriptions for the node builder
pub trait TypeDescriber {
    /// Describe the type with the given name
    fn describe(&self, type_name: &str) -> Option<&ObjectDescriptor>;
}

/// Map-backed [`TypeDescriber`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: IndexMap<String, ObjectDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous one with the same name
    pub fn register(&mut self, descriptor: ObjectDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Register a class type
    pub fn class<'a>(
        &mut self,
        name: &str,
        members: impl IntoIterator<Item = (&'a str, TypeRef)>,
    ) -> &mut Self {
        self.register(Self::descriptor(name, ObjectKind::Class, members))
    }

    /// Register a struct type
    pub fn structure<'a>(
        &mut self,
        name: &str,
        members: impl IntoIterator<Item = (&'a str, TypeRef)>,
    ) -> &mut Self {
        self.register(Self::descriptor(name, ObjectKind::Struct, members))
    }

    fn descriptor<'a>(
        name: &str,
        kind: ObjectKind,
        members: impl IntoIterator<Item = (&'a str, TypeRef)>,
    ) -> ObjectDescriptor {
        ObjectDescriptor {
            name: name.to_string(),
            kind,
            members: members
                .into_iter()
                .map(|(name, ty)| MemberDescriptor { name: name.to_string(), ty })
                .collect(),
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create an instance of a class with every member at its default value
    pub fn new_object(&self, type_name: &str) -> Result<ObjectRef, GraphError> {
        let descriptor = self.expect_kind(type_name, ObjectKind::Class)?;
        let object = ObjectRef::new(type_name);
        for member in &descriptor.members {
            object.set(&member.name, self.default_value(&member.ty)?);
        }
        Ok(object)
    }

    /// Create a struct value with every member at its default value
    pub fn new_struct(&self, type_name: &str) -> Result<StructValue, GraphError> {
        let descriptor = self.expect_kind(type_name, ObjectKind::Struct)?;
        let mut value = StructValue::new(type_name);
        for member in &descriptor.members {
            value.set(&member.name, self.default_value(&member.ty)?);
        }
        Ok(value)
    }

    /// Default value of a slot of the given type
    pub fn default_value(&self, ty: &TypeRef) -> Result<Value, GraphError> {
        Ok(match ty {
            TypeRef::Bool => Value::Bool(false),
            TypeRef::Int => Value::Int(0),
            TypeRef::Float => Value::Float(0.0),
            TypeRef::Named(name) => match self.describe(name) {
                Some(descriptor) if descriptor.kind == ObjectKind::Struct => {
                    Value::Struct(self.new_struct(name)?)
                }
                Some(_) => Value::Null,
                None => return Err(GraphError::UnknownType(name.clone())),
            },
            TypeRef::String | TypeRef::Any | TypeRef::List(_) | TypeRef::Map(..) => Value::Null,
        })
    }

    fn expect_kind(&self, type_name: &str, kind: ObjectKind) -> Result<&ObjectDescriptor, GraphError> {
        match self.types.get(type_name) {
            Some(descriptor) if descriptor.kind == kind => Ok(descriptor),
            Some(_) => Err(GraphError::TypeMismatch {
                expected: format!("{kind:?}"),
                actual: type_name.to_string(),
            }),
            None => Err(GraphError::UnknownType(type_name.to_string())),
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

impl TypeDescriber for TypeRegistry {
    fn describe(&self, type_name: &str) -> Option<&ObjectDescriptor> {
        self.types.get(type_name)
    }
}
