//! End-to-end coverage of the concrete build scenarios a real document
//! would exercise: a plate with a hole anchored by a `createdBy` selector,
//! and a parameterized extrude whose depth comes from a caller override.

use truform_eval::{evaluate_part, CancellationToken, EvalOptions};
use truform_ir::feature::{AxisRef, ExtrudeParams, FeatureKind, HoleParams};
use truform_ir::selector::{Axis, Predicate, Rank, Selector};
use truform_ir::sketch::Profile;
use truform_ir::{BinOp, Expr, Feature, LengthUnit, OverrideMap, Parameter, Part, Scalar, ValueType};
use truform_kernel::ReferenceKernel;

fn plate_with_hole_part(depth_param_default: f64) -> Part {
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
            depth: Scalar::expr(Expr::param("depth")),
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
            target_body: Selector::Named { name: "body:main".into() },
            placement: Selector::Face {
                predicates: vec![
                    Predicate::Normal { axis: Axis::PlusZ },
                    Predicate::CreatedBy { feature_id: "base".into() },
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
        params: vec![Parameter {
            id: "depth".into(),
            value_type: ValueType::Length,
            default_expr: Scalar::number(depth_param_default),
        }],
        connectors: vec![],
        datums: vec![],
        constraints: vec![],
        cosmetic_threads: vec![],
        assertions: vec![],
        dimensions: vec![],
    }
}

#[test]
fn plate_with_hole_resolves_the_face_created_by_the_base_extrude() {
    let part = plate_with_hole_part(2.0);
    let mut kernel = ReferenceKernel::new();
    let overrides = OverrideMap::new();
    let cancel = CancellationToken::new();
    let result = evaluate_part(&part, LengthUnit::Mm, &overrides, &mut kernel, &cancel, &EvalOptions::default()).unwrap();

    assert!(!result.has_errors(), "{:?}", result.feature_log);
    let main = result.outputs.get("body:main").expect("extrude must produce body:main");
    assert!(main.iter().any(|o| o.created_by == "h1"), "hole should have re-keyed body:main");
}

#[test]
fn overriding_the_depth_parameter_changes_the_extruded_solid() {
    let part = plate_with_hole_part(2.0);
    let mut overrides = OverrideMap::new();
    overrides.insert("depth".into(), Scalar::number(8.0));
    let cancel = CancellationToken::new();

    let mut default_kernel = ReferenceKernel::new();
    let default_result = evaluate_part(&part, LengthUnit::Mm, &OverrideMap::new(), &mut default_kernel, &cancel, &EvalOptions::default()).unwrap();

    let mut overridden_kernel = ReferenceKernel::new();
    let overridden_result = evaluate_part(&part, LengthUnit::Mm, &overrides, &mut overridden_kernel, &cancel, &EvalOptions::default()).unwrap();

    let solid_area = |r: &truform_ir::BuildResult| -> f64 {
        r.outputs["body:main"]
            .iter()
            .find(|o| o.role.as_deref() == Some("solid"))
            .and_then(|o| o.area)
            .unwrap()
    };
    assert_ne!(solid_area(&default_result), solid_area(&overridden_result));
}

#[test]
fn arithmetic_expression_on_a_parameter_resolves_before_the_kernel_runs() {
    // (w * 2) + 5 with w = 10mm should resolve to 25mm, independent of any
    // kernel call — covered directly at the expression-engine layer, and
    // exercised here through a feature whose depth is that expression.
    let mut part = plate_with_hole_part(0.0);
    part.params.push(Parameter {
        id: "w".into(),
        value_type: ValueType::Length,
        default_expr: Scalar::number(10.0),
    });
    if let FeatureKind::Extrude(p) = &mut part.features[0].kind {
        p.depth = Scalar::expr(Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Binary {
                op: BinOp::Mul,
                lhs: Box::new(Expr::param("w")),
                rhs: Box::new(Expr::literal(2.0)),
            }),
            rhs: Box::new(Expr::literal(5.0)),
        });
    }
    let mut kernel = ReferenceKernel::new();
    let overrides = OverrideMap::new();
    let cancel = CancellationToken::new();
    let result = evaluate_part(&part, LengthUnit::Mm, &overrides, &mut kernel, &cancel, &EvalOptions::default()).unwrap();
    assert!(!result.has_errors(), "{:?}", result.feature_log);
    let solid = result.outputs["body:main"].iter().find(|o| o.role.as_deref() == Some("solid")).unwrap();
    // w=10 * h=5 * depth=25
    assert_eq!(solid.area, Some(10.0 * 5.0 * 25.0));
}
