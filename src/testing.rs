use crate::value::{Module, Namespace, Value};
use proptest::prelude::*;

pub fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::Str),
        "[a-z_][a-z0-9_]{0,6}".prop_map(Value::Func),
        "[a-z_][a-z0-9_]{0,6}".prop_map(Value::Type),
    ];
    leaf.prop_recursive(
        4,  // levels deep
        32, // maximum nodes
        6,  // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::btree_map("[a-z_][a-z0-9_]{0,6}", inner.clone(), 0..6)
                    .prop_map(Value::Map),
                (
                    "[a-z_][a-z0-9_]{0,6}",
                    prop::collection::btree_map(
                        "[a-z_][a-z0-9_]{0,6}",
                        prop::option::of(inner),
                        0..6,
                    ),
                )
                    .prop_map(|(name, exports)| Value::Module(Module { name, exports })),
            ]
        },
    )
}

pub fn arb_namespace() -> impl Strategy<Value = Namespace> {
    prop::collection::btree_map("[a-z_][a-z0-9_]{0,8}", arb_value(), 0..8)
        .prop_map(|vars| vars.into_iter().collect())
}
