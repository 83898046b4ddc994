//! Property tests: canonical output stability and serialize/parse round
//! trips over generated conforming values.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

use crate::builder::*;
use crate::compiler::CompiledSchema;
use crate::registry::TypeRegistry;
use crate::schema::SchemaNode;

fn compile(node: &SchemaNode) -> CompiledSchema {
    CompiledSchema::compile(node, &TypeRegistry::new()).unwrap()
}

fn profile_schema() -> SchemaNode {
    object([
        ("id", string()),
        ("age", uint8()),
        ("active", boolean()),
        ("score", float64()),
        ("tags", array(string())),
        ("bio", nullable(string())),
        ("nick", optional(string())),
    ])
}

fn profile_value() -> impl Strategy<Value = Value> {
    (
        "[a-z0-9]{1,8}",
        0u8..=255,
        any::<bool>(),
        -1_000_000i64..1_000_000,
        prop::collection::vec("[a-z]{0,5}", 0..4),
        prop::option::of("[a-z ]{0,10}"),
        prop::option::of("[a-z]{1,6}"),
    )
        .prop_map(|(id, age, active, score, tags, bio, nick)| {
            let mut obj = json!({
                "id": id,
                "age": age,
                "active": active,
                "score": score,
                "tags": tags,
                "bio": bio,
            });
            if let Some(nick) = nick {
                obj["nick"] = json!(nick);
            }
            obj
        })
}

proptest! {
    #[test]
    fn prop_serialize_parse_round_trips(value in profile_value()) {
        let compiled = compile(&profile_schema());
        prop_assert!(compiled.validate(&value).is_valid());

        let text = compiled.serialize(&value).unwrap();
        let parsed = compiled.parse(&text).unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn prop_serialize_ignores_input_key_order(
        value in profile_value(),
        order in Just(vec!["id", "age", "active", "score", "tags", "bio", "nick"]).prop_shuffle(),
    ) {
        let compiled = compile(&profile_schema());
        let canonical = compiled.serialize(&value).unwrap();

        let obj = value.as_object().unwrap();
        let mut shuffled = Map::new();
        for key in order {
            if let Some(v) = obj.get(key) {
                shuffled.insert(key.to_string(), v.clone());
            }
        }
        let reordered = compiled.serialize(&Value::Object(shuffled)).unwrap();
        prop_assert_eq!(reordered, canonical);
    }

    #[test]
    fn prop_mock_always_validates(seed in any::<u64>()) {
        let schema = object([
            ("shape", discriminator("kind", [
                ("circle", object([("radius", float64())])),
                ("rect", object([("w", float64()), ("h", float64())])),
            ]).unwrap()),
            ("labels", record(enum_of(["a", "b", "c"]))),
            ("created", timestamp()),
        ]);
        let compiled = compile(&schema);
        let mut rng = StdRng::seed_from_u64(seed);
        let value = compiled.mock(&mut rng);
        prop_assert!(compiled.validate(&value).is_valid(), "mock produced {}", value);
    }

    #[test]
    fn prop_enum_rejects_nonmembers(s in "[a-z]{1,8}") {
        let members = ["red", "green", "blue"];
        let compiled = compile(&enum_of(members));
        let expected = members.contains(&s.as_str());
        prop_assert_eq!(compiled.validate(&json!(s)).is_valid(), expected);
    }

    #[test]
    fn prop_recursive_round_trip(depth in 0usize..6) {
        let mut builder = SchemaBuilder::new();
        let node = builder
            .recursive("Nested", |handle| {
                object([
                    ("value", int32()),
                    ("left", nullable(handle.clone())),
                    ("right", nullable(handle)),
                ])
            })
            .unwrap();
        let compiled = CompiledSchema::compile(&node, builder.registry()).unwrap();

        let mut value = json!({"value": 0, "left": null, "right": null});
        for i in 1..=depth {
            value = json!({"value": i, "left": value, "right": null});
        }

        prop_assert!(compiled.validate(&value).is_valid());
        let text = compiled.serialize(&value).unwrap();
        prop_assert_eq!(compiled.parse(&text).unwrap(), value);
    }

    #[test]
    fn prop_uint8_boundary(n in -300i64..600) {
        let compiled = compile(&uint8());
        let expected = (0..=255).contains(&n);
        prop_assert_eq!(compiled.validate(&json!(n)).is_valid(), expected);
    }
}
