// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values wrapped by node content.
//!
//! Objects, lists and maps are shared handles compared by identity. Structs
//! and primitives are plain values compared structurally.

use crate::descriptor::TypeRef;
use crate::index::{Index, MapKey};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identity of a shared value, stable for as long as a handle to it lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(usize);

impl Identity {
    fn of<T>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

#[derive(Debug)]
struct ObjectData {
    type_name: String,
    fields: IndexMap<String, Value>,
}

/// Shared handle to a class instance
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    /// Create an instance with no fields set
    pub fn new(type_name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        })))
    }

    /// Set a field and return the handle, for chained construction
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Type name of the instance
    pub fn type_name(&self) -> String {
        self.0.borrow().type_name.clone()
    }

    /// Read a field
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    /// Write a field, returning the previous value
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().fields.insert(name.to_string(), value.into())
    }

    /// Names of the fields currently set
    pub fn field_names(&self) -> Vec<String> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    /// Identity of the instance
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.0.borrow().type_name, self.identity().0)
    }
}

#[derive(Debug)]
struct ListData {
    item_type: TypeRef,
    items: Vec<Value>,
}

/// Shared handle to an ordered list
#[derive(Clone)]
pub struct ListRef(Rc<RefCell<ListData>>);

impl ListRef {
    /// Create an empty list
    pub fn new(item_type: TypeRef) -> Self {
        Self(Rc::new(RefCell::new(ListData {
            item_type,
            items: Vec::new(),
        })))
    }

    /// Create a list holding the given items
    pub fn from_items<V: Into<Value>>(item_type: TypeRef, items: impl IntoIterator<Item = V>) -> Self {
        let list = Self::new(item_type);
        list.0.borrow_mut().items.extend(items.into_iter().map(Into::into));
        list
    }

    /// Declared item type
    pub fn item_type(&self) -> TypeRef {
        self.0.borrow().item_type.clone()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    /// Whether the list has no items
    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    /// Read an item
    pub fn get(&self, position: usize) -> Option<Value> {
        self.0.borrow().items.get(position).cloned()
    }

    /// Replace an item, returning the previous one
    pub fn set(&self, position: usize, value: impl Into<Value>) -> Option<Value> {
        let mut data = self.0.borrow_mut();
        let slot = data.items.get_mut(position)?;
        Some(std::mem::replace(slot, value.into()))
    }

    /// Append an item
    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().items.push(value.into());
    }

    /// Insert an item, shifting later items. Returns false when out of range.
    pub fn insert(&self, position: usize, value: impl Into<Value>) -> bool {
        let mut data = self.0.borrow_mut();
        if position > data.items.len() {
            return false;
        }
        data.items.insert(position, value.into());
        true
    }

    /// Remove an item, shifting later items
    pub fn remove(&self, position: usize) -> Option<Value> {
        let mut data = self.0.borrow_mut();
        (position < data.items.len()).then(|| data.items.remove(position))
    }

    /// Snapshot of the items
    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Identity of the list
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        write!(f, "List<{}>(len {})@{:#x}", data.item_type, data.items.len(), self.identity().0)
    }
}

#[derive(Debug)]
struct MapData {
    key_type: TypeRef,
    value_type: TypeRef,
    entries: IndexMap<MapKey, Value>,
}

/// Shared handle to an insertion-ordered dictionary
#[derive(Clone)]
pub struct MapRef(Rc<RefCell<MapData>>);

impl MapRef {
    /// Create an empty dictionary
    pub fn new(key_type: TypeRef, value_type: TypeRef) -> Self {
        Self(Rc::new(RefCell::new(MapData {
            key_type,
            value_type,
            entries: IndexMap::new(),
        })))
    }

    /// Insert an entry and return the handle, for chained construction
    pub fn with(self, key: impl Into<MapKey>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value);
        self
    }

    /// Declared key type
    pub fn key_type(&self) -> TypeRef {
        self.0.borrow().key_type.clone()
    }

    /// Declared value type
    pub fn value_type(&self) -> TypeRef {
        self.0.borrow().value_type.clone()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    /// Whether the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    /// Whether an entry exists for `key`
    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.0.borrow().entries.contains_key(key)
    }

    /// Read an entry
    pub fn get(&self, key: &MapKey) -> Option<Value> {
        self.0.borrow().entries.get(key).cloned()
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(&self, key: MapKey, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().entries.insert(key, value.into())
    }

    /// Remove an entry, preserving the order of the others
    pub fn remove(&self, key: &MapKey) -> Option<Value> {
        self.0.borrow_mut().entries.shift_remove(key)
    }

    /// Snapshot of the keys
    pub fn keys(&self) -> Vec<MapKey> {
        self.0.borrow().entries.keys().cloned().collect()
    }

    /// Snapshot of the entries
    pub fn entries(&self) -> Vec<(MapKey, Value)> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Identity of the dictionary
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        write!(
            f,
            "Map<{}, {}>(len {})@{:#x}",
            data.key_type,
            data.value_type,
            data.entries.len(),
            self.identity().0
        )
    }
}

/// Value-type aggregate, copied on read and written back as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl StructValue {
    /// Create a struct value with no fields set
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Set a field and return the value, for chained construction
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Type name of the struct
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Read a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field, returning the previous value
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.to_string(), value.into())
    }
}

/// A dynamically typed value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Class instance
    Object(ObjectRef),
    /// Struct value
    Struct(StructValue),
    /// List
    List(ListRef),
    /// Dictionary
    Map(MapRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl Value {
    /// Whether this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a list or a dictionary
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Identity of a shared value; `None` for nulls, structs and primitives
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::Object(object) => Some(object.identity()),
            Value::List(list) => Some(list.identity()),
            Value::Map(map) => Some(map.identity()),
            _ => None,
        }
    }

    /// Runtime type of the value; `None` for null
    pub fn runtime_type(&self) -> Option<TypeRef> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => TypeRef::Bool,
            Value::Int(_) => TypeRef::Int,
            Value::Float(_) => TypeRef::Float,
            Value::String(_) => TypeRef::String,
            Value::Object(object) => TypeRef::Named(object.type_name()),
            Value::Struct(value) => TypeRef::named(value.type_name()),
            Value::List(list) => TypeRef::list(list.item_type()),
            Value::Map(map) => TypeRef::map(map.key_type(), map.value_type()),
        })
    }

    /// Read a member of an object or struct
    pub fn member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.get(name),
            Value::Struct(value) => value.get(name).cloned(),
            _ => None,
        }
    }

    /// Read a collection item
    pub fn item(&self, index: &Index) -> Option<Value> {
        match (self, index) {
            (Value::List(list), Index::Int(position)) => list.get(*position),
            (Value::Map(map), Index::Key(key)) => map.get(key),
            _ => None,
        }
    }

    /// Valid indices of a collection, in order
    pub fn indices(&self) -> Vec<Index> {
        match self {
            Value::List(list) => (0..list.len()).map(Index::Int).collect(),
            Value::Map(map) => map.keys().into_iter().map(Index::Key).collect(),
            _ => Vec::new(),
        }
    }

    /// Snapshot of a collection's items with their indices
    pub fn items(&self) -> Vec<(Index, Value)> {
        match self {
            Value::List(list) => list.items().into_iter().enumerate().map(|(i, v)| (Index::Int(i), v)).collect(),
            Value::Map(map) => map.entries().into_iter().map(|(k, v)| (Index::Key(k), v)).collect(),
            _ => Vec::new(),
        }
    }

    /// The integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// The object handle
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The struct payload
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// The list handle
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// The dictionary handle
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "\"{value}\""),
            Value::Struct(value) => write!(f, "{}{{..}}", value.type_name()),
            Value::Object(object) => write!(f, "{object:?}"),
            Value::List(list) => write!(f, "{list:?}"),
            Value::Map(map) => write!(f, "{map:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Value::Struct(value)
    }
}

impl From<ListRef> for Value {
    fn from(value: ListRef) -> Self {
        Value::List(value)
    }
}

impl From<MapRef> for Value {
    fn from(value: MapRef) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_compare_by_identity() {
        let a = ObjectRef::new("SimpleClass").with("Member1", 1);
        let b = ObjectRef::new("SimpleClass").with("Member1", 1);
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a.clone()), Value::from(b));
        assert_eq!(Value::from(a.clone()).identity(), Some(a.identity()));
    }

    #[test]
    fn test_structs_compare_by_value() {
        let a = StructValue::new("SimpleStruct").with("Member1", 1);
        let b = StructValue::new("SimpleStruct").with("Member1", 1);
        assert_eq!(Value::from(a), Value::from(b));
        assert_eq!(Value::from(StructValue::new("S")).identity(), None);
    }

    #[test]
    fn test_list_operations() {
        let list = ListRef::from_items(TypeRef::Int, [1, 2, 3]);
        assert_eq!(list.len(), 3);
        assert!(list.insert(1, 5));
        assert!(!list.insert(9, 5));
        assert_eq!(list.remove(0), Some(Value::Int(1)));
        assert_eq!(list.items(), vec![Value::Int(5), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.set(2, 7), Some(Value::Int(3)));
        assert_eq!(list.set(3, 7), None);
    }

    #[test]
    fn test_map_preserves_order_on_remove() {
        let map = MapRef::new(TypeRef::String, TypeRef::Int)
            .with("a", 1)
            .with("b", 2)
            .with("c", 3);
        assert_eq!(map.remove(&MapKey::from("a")), Some(Value::Int(1)));
        assert_eq!(map.keys(), vec![MapKey::from("b"), MapKey::from("c")]);
        let value = Value::from(map);
        assert_eq!(value.indices(), vec![Index::key("b"), Index::key("c")]);
        assert_eq!(value.item(&Index::key("c")), Some(Value::Int(3)));
        assert_eq!(value.item(&Index::Int(0)), None);
    }

    #[test]
    fn test_runtime_type() {
        assert_eq!(Value::Null.runtime_type(), None);
        assert_eq!(Value::from(3).runtime_type(), Some(TypeRef::Int));
        let list = ListRef::new(TypeRef::named("SimpleClass"));
        assert_eq!(
            Value::from(list).runtime_type(),
            Some(TypeRef::list(TypeRef::named("SimpleClass")))
        );
    }

    #[test]
    fn test_cyclic_debug_terminates() {
        let a = ObjectRef::new("SimpleClass");
        a.set("Member2", a.clone());
        let printed = format!("{:?}", Value::from(a));
        assert!(printed.starts_with("SimpleClass@"));
    }
}
