//! Decoder contract tests: malformed input, schema violations, reference
//! validation, and the derived composition queries.

use motion_core::{load_composition, DecodeError, RefKind};
use serde_json::json;

fn decode_value(doc: serde_json::Value) -> Result<motion_core::Composition, DecodeError> {
    load_composition(doc.to_string().as_bytes())
}

fn minimal_doc() -> serde_json::Value {
    json!({
        "fr": 30, "ip": 0, "op": 180, "w": 400, "h": 300,
        "layers": [
            {
                "ty": 4, "ind": 1, "ip": 0, "op": 180, "st": 0,
                "ks": {
                    "o": { "a": 0, "k": 100 },
                    "p": { "a": 0, "k": [200, 150, 0] }
                },
                "shapes": []
            }
        ]
    })
}

mod malformed {
    use super::*;

    #[test]
    fn literal_baddata_is_malformed_json() {
        let err = load_composition(b"BADDATA").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson { .. }), "{err:?}");
    }

    #[test]
    fn truncated_document_is_malformed_json() {
        let err = load_composition(br#"{"fr": 30, "ip""#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson { .. }), "{err:?}");
    }

    #[test]
    fn top_level_array_is_a_schema_violation() {
        let err = load_composition(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::SchemaViolation { .. }), "{err:?}");
    }
}

mod schema {
    use super::*;

    #[test]
    fn missing_frame_rate_names_the_field() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("fr");
        match decode_value(doc).unwrap_err() {
            DecodeError::SchemaViolation { field, .. } => assert_eq!(field, "fr"),
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn string_typed_width_is_rejected() {
        let mut doc = minimal_doc();
        doc["w"] = json!("400");
        match decode_value(doc).unwrap_err() {
            DecodeError::SchemaViolation { field, .. } => assert_eq!(field, "w"),
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn layers_must_be_an_array() {
        let mut doc = minimal_doc();
        doc["layers"] = json!({});
        match decode_value(doc).unwrap_err() {
            DecodeError::SchemaViolation { field, .. } => assert_eq!(field, "layers"),
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn out_point_before_in_point_is_rejected() {
        let mut doc = minimal_doc();
        doc["ip"] = json!(200);
        assert!(matches!(
            decode_value(doc).unwrap_err(),
            DecodeError::SchemaViolation { .. }
        ));
    }

    #[test]
    fn duplicate_layer_indices_are_rejected() {
        let mut doc = minimal_doc();
        doc["layers"] = json!([
            {"ty": 3, "ind": 1, "ip": 0, "op": 180},
            {"ty": 3, "ind": 1, "ip": 0, "op": 180}
        ]);
        assert!(matches!(
            decode_value(doc).unwrap_err(),
            DecodeError::SchemaViolation { .. }
        ));
    }

    #[test]
    fn unrecognized_fields_are_ignored() {
        let mut doc = minimal_doc();
        doc["ddd"] = json!(0);
        doc["meta"] = json!({"generator": "test"});
        doc["layers"][0]["cl"] = json!("css-class");
        assert!(decode_value(doc).is_ok());
    }

    #[test]
    fn unknown_shape_types_decode_as_opaque_variants() {
        let mut doc = minimal_doc();
        doc["layers"][0]["shapes"] = json!([
            {"ty": "rp", "nm": "Repeater", "c": {"a": 0, "k": 3}},
            {"ty": "el", "p": {"a": 0, "k": [0, 0]}, "s": {"a": 0, "k": [10, 10]}}
        ]);
        let comp = decode_value(doc).unwrap();
        let shapes = comp.model().layers[0].shapes.as_ref().unwrap();
        assert_eq!(shapes.len(), 2, "unknown shape kept, not dropped");
    }
}

mod references {
    use super::*;

    #[test]
    fn dangling_parent_is_unresolved() {
        let mut doc = minimal_doc();
        doc["layers"][0]["parent"] = json!(99);
        match decode_value(doc).unwrap_err() {
            DecodeError::UnresolvedReference { kind, id } => {
                assert_eq!(kind, RefKind::Parent);
                assert_eq!(id, "99");
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn mutual_parent_cycle_fails_without_overflowing() {
        let mut doc = minimal_doc();
        doc["layers"] = json!([
            {"ty": 3, "ind": 1, "parent": 2, "ip": 0, "op": 180},
            {"ty": 3, "ind": 2, "parent": 1, "ip": 0, "op": 180}
        ]);
        match decode_value(doc).unwrap_err() {
            DecodeError::CyclicParentChain(indices) => {
                assert!(indices.contains(&1) || indices.contains(&2));
            }
            other => panic!("expected CyclicParentChain, got {other:?}"),
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let mut doc = minimal_doc();
        doc["layers"][0]["parent"] = json!(1);
        assert!(matches!(
            decode_value(doc).unwrap_err(),
            DecodeError::CyclicParentChain(_)
        ));
    }

    #[test]
    fn dangling_precomp_asset_is_unresolved() {
        let mut doc = minimal_doc();
        doc["layers"] = json!([
            {"ty": 0, "ind": 1, "ip": 0, "op": 180, "refId": "comp_missing", "w": 100, "h": 100}
        ]);
        match decode_value(doc).unwrap_err() {
            DecodeError::UnresolvedReference { kind, id } => {
                assert_eq!(kind, RefKind::Asset);
                assert_eq!(id, "comp_missing");
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn self_referencing_precomp_is_rejected() {
        let mut doc = minimal_doc();
        doc["assets"] = json!([
            {"id": "comp_0", "layers": [
                {"ty": 0, "ind": 1, "ip": 0, "op": 180, "refId": "comp_0", "w": 100, "h": 100}
            ]}
        ]);
        doc["layers"] = json!([
            {"ty": 0, "ind": 1, "ip": 0, "op": 180, "refId": "comp_0", "w": 100, "h": 100}
        ]);
        assert!(matches!(
            decode_value(doc).unwrap_err(),
            DecodeError::RecursiveComposition { .. }
        ));
    }

    #[test]
    fn parent_cycle_inside_precomp_asset_is_caught() {
        let mut doc = minimal_doc();
        doc["assets"] = json!([
            {"id": "comp_0", "layers": [
                {"ty": 3, "ind": 1, "parent": 2, "ip": 0, "op": 180},
                {"ty": 3, "ind": 2, "parent": 1, "ip": 0, "op": 180}
            ]}
        ]);
        doc["layers"] = json!([
            {"ty": 0, "ind": 1, "ip": 0, "op": 180, "refId": "comp_0", "w": 100, "h": 100}
        ]);
        assert!(matches!(
            decode_value(doc).unwrap_err(),
            DecodeError::CyclicParentChain(_)
        ));
    }
}

mod queries {
    use super::*;

    #[test]
    fn derived_queries_report_document_values() {
        let comp = decode_value(minimal_doc()).unwrap();
        assert_eq!(comp.frame_rate(), 30.0);
        assert_eq!(comp.start_frame(), 0.0);
        assert_eq!(comp.end_frame(), 180.0);
        assert_eq!(comp.duration_frames(), 180.0);
        assert!((comp.duration() - 6.0).abs() < 1e-6);
        assert_eq!(comp.width(), 400);
        assert_eq!(comp.height(), 300);
    }

    #[test]
    fn bounds_match_declared_pixel_size() {
        let comp = decode_value(minimal_doc()).unwrap();
        let bounds = comp.bounds();
        assert_eq!(bounds.width(), 400.0);
        assert_eq!(bounds.height(), 300.0);
        assert_eq!(bounds.x0, 0.0);
        assert_eq!(bounds.y0, 0.0);
    }
}
