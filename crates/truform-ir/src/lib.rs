//! The closed algebraic intent model and structural validator for
//! TrueForm documents: parts, features, selectors, expressions and units.
//! Every other crate in the workspace builds on these types; this crate
//! has no dependency on the graph builder, evaluator, kernel adapter or
//! cache.

pub mod dimension;
pub mod document;
pub mod error;
pub mod expr;
pub mod feature;
pub mod kernel_result;
pub mod part;
pub mod profile_sketch;
pub mod selector;
pub mod sketch;
pub mod units;
pub mod validate;

pub use dimension::Dimension;
pub use document::{Assembly, AssemblyMate, Document, DocumentContext, KernelContext, ToleranceContext, UnitsContext};
pub use error::{CoreError, CoreResult, ErrorCode};
pub use expr::{BinOp, Expr, OverrideMap, Parameter, Scalar};
pub use feature::{Feature, FeatureKind, Stage};
pub use kernel_result::{BuildResult, FeatureOutcome, KernelDiagnostics, KernelObject, KernelResult, KernelSelection, RenderMesh};
pub use part::{Assertion, Connector, CosmeticThread, Part, PartConstraint, PartDatum};
pub use selector::{Axis, Predicate, Rank, Selector, SelectorKind};
pub use sketch::{Profile, SketchEntity};
pub use units::{AngleUnit, LengthUnit, Unit, ValueType};
pub use validate::{validate_document, validate_part, StagedFeaturePolicy, ValidationConfig, ValidationReport, SCHEMA_TAG};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContext, KernelContext, ToleranceContext, UnitsContext};
    use crate::feature::{ExtrudeParams, FeatureKind, HoleParams, AxisRef};
    use crate::selector::{Predicate, Rank, Selector};
    use crate::sketch::Profile;

    fn base_document(parts: Vec<Part>) -> Document {
        Document {
            id: "doc1".into(),
            schema: SCHEMA_TAG.into(),
            ir_version: "1.0".into(),
            parts,
            assemblies: vec![],
            assertions: vec![],
            context: DocumentContext {
                units: UnitsContext {
                    length: LengthUnit::Mm,
                    angle: AngleUnit::Rad,
                },
                kernel: KernelContext {
                    name: "mock".into(),
                    version: "0.1.0".into(),
                },
                tolerance: ToleranceContext::default(),
            },
        }
    }

    fn plate_with_hole_part() -> Part {
        let base = Feature {
            id: "base".into(),
            kind: FeatureKind::Extrude(ExtrudeParams {
                result: "body:main".into(),
                profile: Profile::Rectangle {
                    name: "rect".into(),
                    corner: [0.0, 0.0],
                    width: Scalar::number(10.0),
                    height: Scalar::number(5.0),
                },
                depth: Scalar::number(2.0),
                direction: None,
                mode: None,
                cut: false,
                target_body: None,
            }),
            deps: vec![],
            tags: vec![],
        };
        let hole = Feature {
            id: "h1".into(),
            kind: FeatureKind::Hole(HoleParams {
                target_body: Selector::Named {
                    name: "body:main".into(),
                },
                placement: Selector::Face {
                    predicates: vec![
                        Predicate::Normal { axis: Axis::PlusZ },
                        Predicate::CreatedBy {
                            feature_id: "base".into(),
                        },
                    ],
                    rank: vec![Rank::MaxArea],
                },
                axis: AxisRef::Inline {
                    origin: [0.0, 0.0, 0.0],
                    direction: Axis::PlusZ,
                },
                diameter: Scalar::number(1.0),
                depth: Scalar::number(2.0),
                pattern_ref: None,
            }),
            deps: vec![],
            tags: vec![],
        };
        Part {
            id: "part1".into(),
            features: vec![base, hole],
            params: vec![],
            connectors: vec![],
            datums: vec![],
            constraints: vec![],
            cosmetic_threads: vec![],
            assertions: vec![],
            dimensions: vec![],
        }
    }

    #[test]
    fn plate_with_hole_validates() {
        let doc = base_document(vec![plate_with_hole_part()]);
        let report = validate_document(&doc, &ValidationConfig::default()).expect("should validate");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn duplicate_feature_id_rejected() {
        let mut part = plate_with_hole_part();
        let clone = part.features[0].clone();
        part.features.push(Feature {
            id: clone.id.clone(),
            ..clone
        });
        let err = validate_part(&part, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationDuplicateId);
    }

    #[test]
    fn unanchored_selector_rejected() {
        let mut part = plate_with_hole_part();
        if let FeatureKind::Hole(h) = &mut part.features[1].kind {
            h.placement = Selector::Face {
                predicates: vec![Predicate::Planar],
                rank: vec![],
            };
        }
        let err = validate_part(&part, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectorAnchorMissing);
    }

    #[test]
    fn explicit_deps_satisfy_anchoring() {
        let mut part = plate_with_hole_part();
        if let FeatureKind::Hole(h) = &mut part.features[1].kind {
            h.placement = Selector::Face {
                predicates: vec![Predicate::Planar],
                rank: vec![],
            };
        }
        part.features[1].deps.push("base".into());
        let report = validate_part(&part, &ValidationConfig::default()).expect("deps anchor the selector");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn mismatched_schema_tag_rejected() {
        let mut doc = base_document(vec![plate_with_hole_part()]);
        doc.schema = "other.schema".into();
        let err = validate_document(&doc, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationSchema);
    }

    #[test]
    fn scalar_serde_roundtrip_accepts_bare_numbers_and_expressions() {
        let raw = serde_json::json!(5.0);
        let scalar: Scalar = serde_json::from_value(raw).unwrap();
        assert_eq!(scalar, Scalar::Number(5.0));

        let raw = serde_json::json!({"type": "paramRef", "id": "w"});
        let scalar: Scalar = serde_json::from_value(raw).unwrap();
        assert_eq!(scalar, Scalar::Expr(Expr::param("w")));
    }
}
