// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for the in-crate tests.

use crate::container::NodeContainer;
use crate::descriptor::{TypeRef, TypeRegistry};
use crate::value::{ListRef, ObjectRef, StructValue, Value};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn fixture_types() -> TypeRegistry {
    let simple = || TypeRef::named("SimpleClass");
    let mut types = TypeRegistry::new();
    types
        .class("SimpleClass", [("Member1", TypeRef::Int), ("Member2", simple())])
        .class(
            "SimpleClass2",
            [("Member1", TypeRef::Int), ("Member2", simple()), ("Member3", simple())],
        )
        .structure("Struct", [("Member1", TypeRef::String), ("Member2", simple())])
        .class("StructClass", [("Member1", TypeRef::Int), ("Member2", TypeRef::named("Struct"))])
        .class(
            "PrimitiveListClass",
            [("Member1", TypeRef::Int), ("Member2", TypeRef::list(TypeRef::String))],
        )
        .class(
            "ObjectListClass",
            [("Member1", TypeRef::Int), ("Member2", TypeRef::list(simple()))],
        )
        .class(
            "StructListClass",
            [("Member1", TypeRef::Int), ("Member2", TypeRef::list(TypeRef::named("Struct")))],
        )
        .class(
            "ComplexClass",
            [
                ("Member1", TypeRef::Int),
                ("Member2", simple()),
                ("Member3", TypeRef::Any),
                ("Member4", TypeRef::named("Struct")),
                ("Member5", TypeRef::list(TypeRef::String)),
                ("Member6", TypeRef::list(simple())),
                ("Member7", TypeRef::list(TypeRef::named("Struct"))),
            ],
        )
        .class(
            "DictionaryClass",
            [("Member1", TypeRef::map(TypeRef::String, simple()))],
        );
    types
}

pub(crate) fn container() -> NodeContainer {
    init_tracing();
    NodeContainer::new(fixture_types())
}

pub(crate) fn simple(member1: i64, member2: impl Into<Value>) -> ObjectRef {
    ObjectRef::new("SimpleClass")
        .with("Member1", member1)
        .with("Member2", member2)
}

pub(crate) fn fixture_struct(member1: &str, member2: impl Into<Value>) -> StructValue {
    StructValue::new("Struct")
        .with("Member1", member1)
        .with("Member2", member2)
}

pub(crate) fn simple_list(items: impl IntoIterator<Item = ObjectRef>) -> ListRef {
    ListRef::from_items(TypeRef::named("SimpleClass"), items)
}

pub(crate) fn complex(types: &TypeRegistry) -> ObjectRef {
    let object = types.new_object("ComplexClass").unwrap_or_else(|e| panic!("{e}"));
    object.set("Member2", simple(1, Value::Null));
    object.set("Member3", simple(2, Value::Null));
    object.set("Member4", fixture_struct("a", simple(3, Value::Null)));
    object.set("Member5", ListRef::from_items(TypeRef::String, ["x", "y"]));
    object.set("Member6", simple_list([simple(4, Value::Null), simple(5, Value::Null)]));
    object.set(
        "Member7",
        ListRef::from_items(
            TypeRef::named("Struct"),
            [fixture_struct("b", Value::Null), fixture_struct("c", simple(6, Value::Null))],
        ),
    );
    object
}
