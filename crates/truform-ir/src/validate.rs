use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::document::{Document, SUPPORTED_IR_VERSIONS};
use crate::error::{CoreError, CoreResult, ErrorCode};
use crate::feature::{Feature, FeatureKind, Stage};
use crate::part::Part;
use crate::profile_sketch::ProfileOwner;
use crate::selector::Selector;
use crate::sketch::Profile;

pub const SCHEMA_TAG: &str = "trueform.ir.v1";

/// Admission policy for beta/staging feature kinds, configured by the
/// caller and enforced identically by the validator and the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedFeaturePolicy {
    Allow,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub staged_features: StagedFeaturePolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            staged_features: StagedFeaturePolicy::Warn,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

/// Structural and semantic validation of a whole document. Pure; never
/// mutates `doc`. Runs before normalization, and `validate_part` runs again
/// on each part immediately before evaluation.
pub fn validate_document(doc: &Document, cfg: &ValidationConfig) -> CoreResult<ValidationReport> {
    if doc.schema != SCHEMA_TAG {
        return Err(CoreError::new(
            ErrorCode::ValidationSchema,
            format!("unexpected schema tag {:?}, expected {:?}", doc.schema, SCHEMA_TAG),
        ));
    }
    if !SUPPORTED_IR_VERSIONS.contains(&doc.ir_version.as_str()) {
        return Err(CoreError::new(
            ErrorCode::ValidationSchema,
            format!("unsupported irVersion {:?}", doc.ir_version),
        ));
    }

    let ctx = &doc.context;
    if !ctx.tolerance.linear.is_finite() || ctx.tolerance.linear < 0.0 {
        return Err(CoreError::new(
            ErrorCode::ValidationContext,
            "context.tolerance.linear must be finite and >= 0",
        ));
    }
    if !ctx.tolerance.angular.is_finite() || ctx.tolerance.angular < 0.0 {
        return Err(CoreError::new(
            ErrorCode::ValidationContext,
            "context.tolerance.angular must be finite and >= 0",
        ));
    }
    if ctx.kernel.name.trim().is_empty() {
        return Err(CoreError::new(
            ErrorCode::ValidationContext,
            "context.kernel.name must be non-empty",
        ));
    }
    if ctx.kernel.version.trim().is_empty() {
        return Err(CoreError::new(
            ErrorCode::ValidationContext,
            "context.kernel.version must be non-empty",
        ));
    }

    let mut part_ids = BTreeSet::new();
    for part in &doc.parts {
        if !part_ids.insert(part.id.clone()) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("duplicate part id {:?}", part.id),
            ));
        }
    }

    let mut report = ValidationReport::default();
    for part in &doc.parts {
        let part_report = validate_part(part, cfg)?;
        report.warnings.extend(part_report.warnings);
    }

    for assembly in &doc.assemblies {
        for part_id in &assembly.part_ids {
            if doc.find_part(part_id).is_none() {
                return Err(CoreError::new(
                    ErrorCode::ValidationContext,
                    format!("assembly {:?} references unknown part {:?}", assembly.id, part_id),
                )
                .with("referenceKind", "part")
                .with("referenceId", part_id.clone()));
            }
        }
        for mate in &assembly.mates {
            validate_assembly_mate_side(doc, assembly_part(doc, assembly, &mate.part_a), &mate.connector_a)?;
            validate_assembly_mate_side(doc, assembly_part(doc, assembly, &mate.part_b), &mate.connector_b)?;
        }
    }

    Ok(report)
}

fn assembly_part<'a>(
    doc: &'a Document,
    assembly: &crate::document::Assembly,
    part_id: &str,
) -> Option<&'a Part> {
    if !assembly.part_ids.iter().any(|id| id == part_id) {
        return None;
    }
    doc.find_part(part_id)
}

fn validate_assembly_mate_side(
    doc: &Document,
    part: Option<&Part>,
    connector_name: &str,
) -> CoreResult<()> {
    let part = part.ok_or_else(|| {
        CoreError::new(ErrorCode::ValidationContext, "assembly mate references an instance outside the assembly")
    })?;
    let _ = doc;
    if !part.connectors.iter().any(|c| c.name == connector_name) {
        return Err(CoreError::new(
            ErrorCode::ValidationContext,
            format!("connector {:?} not defined on part {:?}", connector_name, part.id),
        )
        .with("referenceKind", "connector")
        .with("referenceId", connector_name.to_string()));
    }
    Ok(())
}

/// Validate a single part in isolation: duplicate ids, per-feature field
/// shape, profile/selector structural rules, tolerance shape, staged
/// feature policy.
pub fn validate_part(part: &Part, cfg: &ValidationConfig) -> CoreResult<ValidationReport> {
    let mut report = ValidationReport::default();

    let mut feature_ids = BTreeSet::new();
    for f in &part.features {
        if !feature_ids.insert(f.id.clone()) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("duplicate feature id {:?}", f.id),
            )
            .feature(&f.id, f.kind.name()));
        }
    }

    let mut output_names = BTreeSet::new();
    for f in &part.features {
        if let Some(name) = f.kind.result_name() {
            if !output_names.insert(name.to_string()) {
                return Err(CoreError::new(
                    ErrorCode::ValidationDuplicateId,
                    format!("duplicate output name {:?}", name),
                )
                .feature(&f.id, f.kind.name()));
            }
        }
    }

    let mut param_ids = BTreeSet::new();
    for p in &part.params {
        if !param_ids.insert(p.id.clone()) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("duplicate param id {:?}", p.id),
            ));
        }
    }

    let mut datum_names = BTreeSet::new();
    for d in &part.datums {
        if !datum_names.insert(d.name.clone()) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("duplicate datum label {:?}", d.name),
            ));
        }
    }

    let mut connector_ids = BTreeSet::new();
    for c in &part.connectors {
        if !connector_ids.insert(c.name.clone()) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("duplicate connector id {:?}", c.name),
            ));
        }
        if feature_ids.contains(&c.name) {
            return Err(CoreError::new(
                ErrorCode::ValidationDuplicateId,
                format!("connector id {:?} collides with a feature id", c.name),
            ));
        }
    }

    let profile_owners = crate::profile_sketch::index_profiles(part)?;

    for f in &part.features {
        validate_feature_kind(f, &profile_owners)?;
        validate_staged_feature(f, cfg, &mut report.warnings)?;
    }

    for dim in &part.dimensions {
        validate_dimension_shape(dim)?;
    }

    Ok(report)
}

fn validate_staged_feature(
    f: &Feature,
    cfg: &ValidationConfig,
    warnings: &mut Vec<String>,
) -> CoreResult<()> {
    match f.kind.stage() {
        Stage::Stable => Ok(()),
        Stage::Beta | Stage::Staging => match cfg.staged_features {
            StagedFeaturePolicy::Allow => Ok(()),
            StagedFeaturePolicy::Warn => {
                warnings.push(format!(
                    "feature {:?} uses {} kind {:?}",
                    f.id,
                    if f.kind.stage() == Stage::Beta { "beta" } else { "staging" },
                    f.kind.name()
                ));
                Ok(())
            }
            StagedFeaturePolicy::Error => Err(CoreError::new(
                ErrorCode::ValidationStagedFeature,
                format!("feature kind {:?} is not stable and stagedFeatures=error", f.kind.name()),
            )
            .feature(&f.id, f.kind.name())),
        },
    }
}

fn validate_feature_kind(f: &Feature, profile_owners: &BTreeMap<String, ProfileOwner>) -> CoreResult<()> {
    for selector in f.kind.selectors() {
        validate_selector_shape(selector, f)?;
        if f.deps.is_empty() && !selector.is_self_anchored() {
            return Err(CoreError::new(
                ErrorCode::SelectorAnchorMissing,
                "selector is not anchored to a known feature and the feature declares no explicit deps",
            )
            .feature(&f.id, f.kind.name()));
        }
    }

    if let FeatureKind::Sketch(s) = &f.kind {
        for profile in &s.profiles {
            validate_inline_profile(profile, &s.entities)?;
        }
    }

    for profile in f.kind.inline_profiles() {
        if matches!(profile, Profile::Sketch { .. }) {
            return Err(CoreError::new(
                ErrorCode::ProfileMissing,
                "a sketch profile must be reached via profile.ref, not embedded directly in a feature",
            )
            .feature(&f.id, f.kind.name()));
        }
    }

    for name in f.kind.profile_refs() {
        if !profile_owners.contains_key(name) {
            return Err(CoreError::new(
                ErrorCode::ProfileMissing,
                format!("profile.ref {:?} does not name any sketch profile", name),
            )
            .feature(&f.id, f.kind.name())
            .with("referenceKind", "profile")
            .with("referenceId", name.to_string()));
        }
    }

    Ok(())
}

fn validate_selector_shape(selector: &Selector, f: &Feature) -> CoreResult<()> {
    match selector {
        Selector::Named { name } if name.trim().is_empty() => Err(CoreError::new(
            ErrorCode::ValidationSelector,
            "named selector must have a non-empty name",
        )
        .feature(&f.id, f.kind.name())),
        _ => Ok(()),
    }
}

fn validate_inline_profile(profile: &Profile, entities: &[crate::sketch::SketchEntity]) -> CoreResult<()> {
    if let Profile::Sketch { loop_ids, hole_loops, open, .. } = profile {
        if *open && !hole_loops.is_empty() {
            return Err(CoreError::new(
                ErrorCode::ValidationSelector,
                "an open sketch profile must not define holes",
            ));
        }
        let all_ids = loop_ids.iter().chain(hole_loops.iter().flatten());
        for id in all_ids {
            let entity = entities.iter().find(|e| e.id() == id).ok_or_else(|| {
                CoreError::new(
                    ErrorCode::ValidationSelector,
                    format!("sketch profile references unknown entity {:?}", id),
                )
            })?;
            if entity.is_construction() {
                return Err(CoreError::new(
                    ErrorCode::ValidationSelector,
                    format!("sketch profile references construction entity {:?}", id),
                ));
            }
            if !entity.is_renderable() {
                return Err(CoreError::new(
                    ErrorCode::ValidationSelector,
                    format!("sketch profile references non-renderable entity {:?}", id),
                ));
            }
        }
    }
    Ok(())
}

fn validate_dimension_shape(dim: &crate::dimension::Dimension) -> CoreResult<()> {
    if dim.has_symmetric_tolerance() && dim.has_bilateral_tolerance() {
        return Err(CoreError::new(
            ErrorCode::ValidationTolerance,
            format!("dimension {:?} mixes symmetric and bilateral tolerance", dim.name),
        ));
    }
    if (dim.has_symmetric_tolerance() || dim.has_bilateral_tolerance()) && dim.nominal.is_none() {
        return Err(CoreError::new(
            ErrorCode::ValidationTolerance,
            format!("dimension {:?} has a tolerance but no nominal", dim.name),
        ));
    }
    if dim.has_min_max() && (dim.nominal.is_some() || dim.has_symmetric_tolerance() || dim.has_bilateral_tolerance()) {
        return Err(CoreError::new(
            ErrorCode::ValidationTolerance,
            format!("dimension {:?} mixes min/max with nominal+tolerance", dim.name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ExtrudeParams, FeatureKind};
    use crate::Scalar;

    fn extrude_with_profile(profile: Profile) -> Part {
        Part {
            id: "part1".into(),
            features: vec![Feature {
                id: "e1".into(),
                kind: FeatureKind::Extrude(ExtrudeParams {
                    result: "body:main".into(),
                    profile,
                    depth: Scalar::number(2.0),
                    direction: None,
                    mode: None,
                    cut: false,
                    target_body: None,
                }),
                deps: vec![],
                tags: vec![],
            }],
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
    fn extrude_with_inline_sketch_profile_is_rejected() {
        let part = extrude_with_profile(Profile::Sketch {
            name: "s".into(),
            loop_ids: vec!["l1".into()],
            hole_loops: vec![],
            open: false,
        });
        let err = validate_part(&part, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileMissing);
        assert_eq!(err.context.get("featureId").map(String::as_str), Some("e1"));
    }

    #[test]
    fn extrude_with_inline_rectangle_profile_is_accepted() {
        let part = extrude_with_profile(Profile::Rectangle {
            name: "r".into(),
            corner: [0.0, 0.0],
            width: Scalar::number(10.0),
            height: Scalar::number(5.0),
        });
        assert!(validate_part(&part, &ValidationConfig::default()).is_ok());
    }

    #[test]
    fn extrude_with_profile_ref_to_known_sketch_is_accepted() {
        let sketch = Feature {
            id: "sk1".into(),
            kind: FeatureKind::Sketch(crate::feature::SketchParams {
                plane: crate::feature::PlaneRef::Inline {
                    origin: [0.0, 0.0, 0.0],
                    normal: crate::selector::Axis::PlusZ,
                },
                entities: vec![],
                profiles: vec![Profile::Rectangle {
                    name: "named_rect".into(),
                    corner: [0.0, 0.0],
                    width: Scalar::number(10.0),
                    height: Scalar::number(5.0),
                }],
            }),
            deps: vec![],
            tags: vec![],
        };
        let mut part = extrude_with_profile(Profile::ProfileRef { name: "named_rect".into() });
        part.features.insert(0, sketch);
        part.features[1].deps.push("sk1".into());
        assert!(validate_part(&part, &ValidationConfig::default()).is_ok());
    }
}
