//! End-to-end validate / parse / serialize / mock behavior.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::builder::*;
use crate::compiler::{CompiledSchema, ValidationIssue};
use crate::error::ParseFailure;
use crate::registry::TypeRegistry;

fn compile(node: &crate::schema::SchemaNode) -> CompiledSchema {
    CompiledSchema::compile(node, &TypeRegistry::new()).unwrap()
}

// =============================================================================
// Numbers
// =============================================================================

#[test]
fn test_uint8_range() {
    let compiled = compile(&uint8());
    assert!(compiled.validate(&json!(0)).is_valid());
    assert!(compiled.validate(&json!(255)).is_valid());
    assert!(!compiled.validate(&json!(256)).is_valid());
    assert!(!compiled.validate(&json!(-1)).is_valid());
}

#[test]
fn test_integer_accepts_whole_floats_rejects_fractions() {
    let compiled = compile(&int32());
    assert!(compiled.validate(&json!(1.0)).is_valid());
    assert!(!compiled.validate(&json!(1.5)).is_valid());
}

#[test]
fn test_int64_full_range() {
    let compiled = compile(&int64());
    assert!(compiled.validate(&json!(i64::MAX)).is_valid());
    assert!(compiled.validate(&json!(i64::MIN)).is_valid());
}

#[test]
fn test_uint64_rejects_negative() {
    let compiled = compile(&uint64());
    assert!(compiled.validate(&json!(u64::MAX)).is_valid());
    assert!(!compiled.validate(&json!(-1)).is_valid());
}

#[test]
fn test_float_accepts_any_finite_number() {
    let compiled = compile(&float64());
    assert!(compiled.validate(&json!(1.5)).is_valid());
    assert!(compiled.validate(&json!(-3)).is_valid());
    assert!(!compiled.validate(&json!("1.5")).is_valid());
}

// =============================================================================
// Nullable vs optional
// =============================================================================

#[test]
fn test_nullable_accepts_null_not_absence() {
    let schema = object([("note", nullable(string()))]);
    let compiled = compile(&schema);
    assert!(compiled.validate(&json!({"note": null})).is_valid());
    assert!(compiled.validate(&json!({"note": "hi"})).is_valid());
    assert!(!compiled.validate(&json!({})).is_valid());
}

#[test]
fn test_optional_accepts_absence_not_null() {
    let schema = object([("note", optional(string()))]);
    let compiled = compile(&schema);
    assert!(compiled.validate(&json!({})).is_valid());
    assert!(compiled.validate(&json!({"note": "hi"})).is_valid());
    assert!(!compiled.validate(&json!({"note": null})).is_valid());
}

#[test]
fn test_unknown_fields_are_ignored() {
    let schema = object([("id", string())]);
    let compiled = compile(&schema);
    assert!(compiled
        .validate(&json!({"id": "1", "extra": [1, 2, 3]}))
        .is_valid());
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn test_nested_path_in_diagnostics() {
    let schema = object([("items", array(object([("name", string())])))]);
    let compiled = compile(&schema);
    let outcome = compiled.validate(&json!({
        "items": [{"name": "a"}, {"name": "b"}, {"name": 3}]
    }));
    assert_eq!(
        outcome.errors,
        vec![ValidationIssue::new("items[2].name", "string")]
    );
}

#[test]
fn test_record_path_uses_entry_key() {
    let schema = object([("scores", record(int32()))]);
    let compiled = compile(&schema);
    let outcome = compiled.validate(&json!({"scores": {"alice": 3, "bob": "x"}}));
    assert_eq!(
        outcome.errors,
        vec![ValidationIssue::new("scores.bob", "int32")]
    );
}

#[test]
fn test_missing_required_field_reports_expected_type() {
    let compiled = compile(&object([("age", uint8())]));
    let outcome = compiled.validate(&json!({}));
    assert_eq!(outcome.errors, vec![ValidationIssue::new("age", "uint8")]);
}

// =============================================================================
// Enum and timestamp
// =============================================================================

#[test]
fn test_enum_membership() {
    let compiled = compile(&enum_of(["active", "suspended"]));
    assert!(compiled.validate(&json!("active")).is_valid());
    assert!(!compiled.validate(&json!("deleted")).is_valid());
    assert!(!compiled.validate(&json!(0)).is_valid());
}

#[test]
fn test_timestamp_requires_rfc3339() {
    let compiled = compile(&timestamp());
    assert!(compiled.validate(&json!("2024-01-01T00:00:00Z")).is_valid());
    assert!(compiled
        .validate(&json!("2024-01-01T00:00:00.123456Z"))
        .is_valid());
    assert!(compiled
        .validate(&json!("2024-01-01T00:00:00+05:30"))
        .is_valid());
    assert!(!compiled.validate(&json!("yesterday")).is_valid());
    assert!(!compiled.validate(&json!(1704067200)).is_valid());
}

#[test]
fn test_timestamp_lexical_form_survives_serialize() {
    let compiled = compile(&timestamp());
    let out = compiled
        .serialize(&json!("2024-01-01T00:00:00.123456Z"))
        .unwrap();
    assert_eq!(out, r#""2024-01-01T00:00:00.123456Z""#);
}

// =============================================================================
// Discriminators
// =============================================================================

fn shape_schema() -> crate::schema::SchemaNode {
    discriminator(
        "kind",
        [
            ("circle", object([("radius", float64())])),
            ("rect", object([("w", float64()), ("h", float64())])),
        ],
    )
    .unwrap()
}

#[test]
fn test_discriminator_dispatch() {
    let compiled = compile(&shape_schema());
    assert!(compiled
        .validate(&json!({"kind": "circle", "radius": 1.0}))
        .is_valid());
    assert!(!compiled
        .validate(&json!({"kind": "circle", "radius": "big"}))
        .is_valid());
}

#[test]
fn test_discriminator_fails_fast_on_unknown_tag() {
    let compiled = compile(&shape_schema());
    // Variant fields are wrong too, but the tag check stops first.
    let outcome = compiled.validate(&json!({"kind": "triangle", "radius": "big"}));
    assert_eq!(
        outcome.errors,
        vec![ValidationIssue::new("kind", "unknown discriminator value")]
    );
}

#[test]
fn test_discriminator_missing_tag() {
    let compiled = compile(&shape_schema());
    let outcome = compiled.validate(&json!({"radius": 1.0}));
    assert_eq!(
        outcome.errors,
        vec![ValidationIssue::new("kind", "discriminator tag 'kind'")]
    );
}

// =============================================================================
// parse
// =============================================================================

#[test]
fn test_parse_distinguishes_malformed_from_invalid() {
    let compiled = compile(&object([("id", string())]));
    assert!(matches!(
        compiled.parse("{not json"),
        Err(ParseFailure::Malformed(_))
    ));
    match compiled.parse(r#"{"id": 5}"#) {
        Err(ParseFailure::Invalid(outcome)) => {
            assert_eq!(outcome.errors, vec![ValidationIssue::new("id", "string")]);
        }
        other => panic!("expected invalid, got {other:?}"),
    }
    assert!(compiled.parse(r#"{"id": "5"}"#).is_ok());
}

// =============================================================================
// serialize
// =============================================================================

#[test]
fn test_serialize_uses_declaration_order() {
    let schema = object([("a", string()), ("b", int32()), ("c", boolean())]);
    let compiled = compile(&schema);
    // Input keys deliberately shuffled.
    let out = compiled
        .serialize(&json!({"c": true, "a": "x", "b": 2}))
        .unwrap();
    assert_eq!(out, r#"{"a":"x","b":2,"c":true}"#);
}

#[test]
fn test_serialize_drops_undeclared_fields() {
    let compiled = compile(&object([("id", string())]));
    let out = compiled
        .serialize(&json!({"id": "1", "debug": "drop me"}))
        .unwrap();
    assert_eq!(out, r#"{"id":"1"}"#);
}

#[test]
fn test_serialize_omits_absent_optional_fields() {
    let schema = object([("id", string()), ("note", optional(string()))]);
    let compiled = compile(&schema);
    assert_eq!(
        compiled.serialize(&json!({"id": "1"})).unwrap(),
        r#"{"id":"1"}"#
    );
    assert_eq!(
        compiled.serialize(&json!({"id": "1", "note": "n"})).unwrap(),
        r#"{"id":"1","note":"n"}"#
    );
}

#[test]
fn test_serialize_writes_discriminator_tag_first() {
    let compiled = compile(&shape_schema());
    let out = compiled
        .serialize(&json!({"radius": 2.0, "kind": "circle"}))
        .unwrap();
    assert_eq!(out, r#"{"kind":"circle","radius":2.0}"#);
}

#[test]
fn test_serialize_rejects_nonconforming_value() {
    let compiled = compile(&object([("id", string())]));
    let err = compiled.serialize(&json!({"id": 5})).unwrap_err();
    assert_eq!(err.path, "id");
    assert_eq!(err.expected, "string");
}

// =============================================================================
// Recursive schemas
// =============================================================================

#[test]
fn test_recursive_schema_validates_at_depth() {
    let mut builder = SchemaBuilder::new();
    let node = builder
        .recursive("TreeNode", |handle| {
            object([
                ("value", int32()),
                ("left", nullable(handle.clone())),
                ("right", nullable(handle)),
            ])
        })
        .unwrap();
    let compiled = CompiledSchema::compile(&node, builder.registry()).unwrap();

    let tree = json!({
        "value": 1,
        "left": {
            "value": 2,
            "left": null,
            "right": {"value": 3, "left": null, "right": null}
        },
        "right": null
    });
    assert!(compiled.validate(&tree).is_valid());

    let bad = json!({
        "value": 1,
        "left": {"value": "two", "left": null, "right": null},
        "right": null
    });
    let outcome = compiled.validate(&bad);
    assert_eq!(
        outcome.errors,
        vec![ValidationIssue::new("left.value", "int32")]
    );
}

// =============================================================================
// mock
// =============================================================================

#[test]
fn test_mock_output_validates() {
    let schema = object([
        ("id", string()),
        ("status", enum_of(["on", "off"])),
        ("tags", array(string())),
        ("meta", record(float64())),
        ("when", timestamp()),
        ("note", optional(nullable(string()))),
    ]);
    let compiled = compile(&schema);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let value = compiled.mock(&mut rng);
        let outcome = compiled.validate(&value);
        assert!(outcome.is_valid(), "mock produced {value}: {outcome:?}");
    }
}

#[test]
fn test_mock_terminates_on_recursive_schema() {
    let mut builder = SchemaBuilder::new();
    let node = builder
        .recursive("Chain", |handle| {
            object([("next", nullable(handle))])
        })
        .unwrap();
    let compiled = CompiledSchema::compile(&node, builder.registry()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        let value = compiled.mock(&mut rng);
        assert!(compiled.validate(&value).is_valid());
    }
}

// =============================================================================
// partial
// =============================================================================

#[test]
fn test_partial_accepts_subsets() {
    let full = object([("id", string()), ("name", string()), ("age", uint8())]);
    let compiled = compile(&partial(full).unwrap());
    assert!(compiled.validate(&json!({})).is_valid());
    assert!(compiled.validate(&json!({"name": "a"})).is_valid());
    assert!(!compiled.validate(&json!({"age": "old"})).is_valid());
}

#[test]
fn test_partial_discriminator_keeps_tag_required() {
    let node = partial(shape_schema()).unwrap();
    let compiled = compile(&node);
    assert!(compiled.validate(&json!({"kind": "circle"})).is_valid());
    assert!(!compiled.validate(&json!({})).is_valid());
    assert!(!compiled
        .validate(&json!({"kind": "circle", "radius": "big"}))
        .is_valid());
}
