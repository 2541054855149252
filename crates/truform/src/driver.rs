//! [`BuildDriver`]: owns the kernel adapter and the artifact cache for one
//! backend process and exposes the single `build_part` operation the rest
//! of the system depends on.

use truform_cache::PartBuildCache;
use truform_eval::{evaluate_part, CancellationToken, EvalOptions};
use truform_ir::validate::{validate_document, StagedFeaturePolicy, ValidationConfig};
use truform_ir::{BuildResult, CoreError, CoreResult, Document, ErrorCode, KernelObject, OverrideMap, RenderMesh};
use truform_kernel::{KernelAdapter, MeshOptions};

/// Validation and staged-feature admission policy for one driver. The two
/// presets keep the validator and the evaluator in lockstep — a staged
/// feature that would be rejected at validation time should never reach
/// the evaluator under a different policy.
#[derive(Debug, Clone, Default)]
pub struct BuildPolicy {
    pub validation: ValidationConfig,
    pub eval: EvalOptions,
}

impl BuildPolicy {
    pub fn strict() -> Self {
        BuildPolicy {
            validation: ValidationConfig {
                staged_features: StagedFeaturePolicy::Error,
            },
            eval: EvalOptions::strict(),
        }
    }

    pub fn permissive() -> Self {
        BuildPolicy {
            validation: ValidationConfig {
                staged_features: StagedFeaturePolicy::Allow,
            },
            eval: EvalOptions::permissive(),
        }
    }
}

/// A `build_part` result plus whether it was served from the artifact
/// cache, so a caller (or a test) can assert on cache behavior without the
/// driver leaking its internal key type.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub result: BuildResult,
    pub cache_hit: bool,
}

/// One kernel adapter, one artifact cache, one policy. A process typically
/// owns one `BuildDriver` per tenant or per kernel backend; builds for
/// different parts of the same driver share the cache (spec §4.6).
pub struct BuildDriver {
    adapter: Box<dyn KernelAdapter>,
    cache: PartBuildCache,
    policy: BuildPolicy,
}

impl BuildDriver {
    pub fn new(adapter: Box<dyn KernelAdapter>) -> Self {
        BuildDriver {
            adapter,
            cache: PartBuildCache::new(256),
            policy: BuildPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = PartBuildCache::new(capacity);
        self
    }

    pub(crate) fn policy(&self) -> &BuildPolicy {
        &self.policy
    }

    pub(crate) fn adapter_mut(&mut self) -> &mut dyn KernelAdapter {
        self.adapter.as_mut()
    }

    /// Validates `doc`, then builds `part_id` against the configured
    /// kernel adapter, reusing a cached `BuildResult` when the canonical
    /// hash of the part, its overrides, and the document's kernel context
    /// is unchanged (spec §4.6). Validation errors and per-feature errors
    /// surface immediately with no partial result (spec §7).
    pub fn build_part(
        &mut self,
        doc: &Document,
        part_id: &str,
        overrides: &OverrideMap,
        cancel: &CancellationToken,
    ) -> CoreResult<BuildResult> {
        Ok(self.build_part_detailed(doc, part_id, overrides, cancel)?.result)
    }

    pub fn build_part_detailed(
        &mut self,
        doc: &Document,
        part_id: &str,
        overrides: &OverrideMap,
        cancel: &CancellationToken,
    ) -> CoreResult<BuildOutcome> {
        let span = tracing::info_span!("build_part", document_id = %doc.id, part_id = %part_id);
        let _enter = span.enter();

        validate_document(doc, &self.policy.validation)?;
        let part = doc.find_part(part_id).ok_or_else(|| {
            CoreError::new(ErrorCode::ValidationContext, format!("document {:?} has no part {:?}", doc.id, part_id))
                .with("referenceKind", "part")
                .with("referenceId", part_id.to_string())
        })?;

        let length_unit = doc.context.units.length;
        let eval_opts = self.policy.eval.clone();
        let staged_features = self.policy.validation.staged_features;
        let adapter = self.adapter.as_mut();
        let (result, cache_hit) = self.cache.get_or_build(doc, part, overrides, staged_features, || {
            evaluate_part(part, length_unit, overrides, adapter, cancel, &eval_opts)
        })?;

        tracing::debug!(part_id = %part_id, cache_hit, "build_part complete");
        Ok(BuildOutcome { result, cache_hit })
    }

    /// Triangulates one build output for rendering (spec §6.1 `mesh`).
    /// Deliberately separate from `build_part`: not every caller wants a
    /// mesh for every build, and meshing cost varies wildly with options.
    pub fn mesh(&self, object: &KernelObject, options: &MeshOptions) -> CoreResult<RenderMesh> {
        self.adapter.mesh(object, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truform_ir::document::{DocumentContext, KernelContext, ToleranceContext, UnitsContext};
    use truform_ir::feature::{AxisRef, ExtrudeParams, FeatureKind, HoleParams};
    use truform_ir::selector::{Axis, Predicate, Rank, Selector};
    use truform_ir::sketch::Profile;
    use truform_ir::{AngleUnit, ErrorCode, Feature, LengthUnit, Part, Scalar, SCHEMA_TAG};
    use truform_kernel::ReferenceKernel;

    fn plate_with_hole() -> Part {
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
            params: vec![],
            connectors: vec![],
            datums: vec![],
            constraints: vec![],
            cosmetic_threads: vec![],
            assertions: vec![],
            dimensions: vec![],
        }
    }

    fn doc_with(part: Part) -> Document {
        Document {
            id: "doc1".into(),
            schema: SCHEMA_TAG.into(),
            ir_version: "1.0".into(),
            parts: vec![part],
            assemblies: vec![],
            assertions: vec![],
            context: DocumentContext {
                units: UnitsContext {
                    length: LengthUnit::Mm,
                    angle: AngleUnit::Rad,
                },
                kernel: KernelContext {
                    name: "reference".into(),
                    version: "0.1.0".into(),
                },
                tolerance: ToleranceContext::default(),
            },
        }
    }

    #[test]
    fn build_part_runs_the_full_pipeline_end_to_end() {
        let doc = doc_with(plate_with_hole());
        let mut driver = BuildDriver::new(Box::new(ReferenceKernel::new()));
        let overrides = OverrideMap::new();
        let cancel = CancellationToken::new();

        let result = driver.build_part(&doc, "part1", &overrides, &cancel).unwrap();
        assert!(!result.has_errors(), "{:?}", result.feature_log);
        assert!(result.outputs.contains_key("body:main"));
    }

    #[test]
    fn second_build_with_identical_inputs_hits_the_cache() {
        let doc = doc_with(plate_with_hole());
        let mut driver = BuildDriver::new(Box::new(ReferenceKernel::new()));
        let overrides = OverrideMap::new();
        let cancel = CancellationToken::new();

        let first = driver.build_part_detailed(&doc, "part1", &overrides, &cancel).unwrap();
        assert!(!first.cache_hit);
        let second = driver.build_part_detailed(&doc, "part1", &overrides, &cancel).unwrap();
        assert!(second.cache_hit);
    }

    #[test]
    fn invalid_document_is_rejected_before_any_kernel_call() {
        let mut doc = doc_with(plate_with_hole());
        doc.schema = "not-a-real-schema".into();
        let mut driver = BuildDriver::new(Box::new(ReferenceKernel::new()));
        let overrides = OverrideMap::new();
        let cancel = CancellationToken::new();

        let err = driver.build_part(&doc, "part1", &overrides, &cancel).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationSchema);
    }

    #[test]
    fn unknown_part_id_is_a_validation_context_error() {
        let doc = doc_with(plate_with_hole());
        let mut driver = BuildDriver::new(Box::new(ReferenceKernel::new()));
        let overrides = OverrideMap::new();
        let cancel = CancellationToken::new();

        let err = driver.build_part(&doc, "no-such-part", &overrides, &cancel).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationContext);
        assert_eq!(err.context.get("referenceId").map(String::as_str), Some("no-such-part"));
    }

    #[test]
    fn canceled_token_surfaces_job_canceled_without_a_partial_result() {
        let doc = doc_with(plate_with_hole());
        let mut driver = BuildDriver::new(Box::new(ReferenceKernel::new()));
        let overrides = OverrideMap::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = driver.build_part(&doc, "part1", &overrides, &cancel).unwrap_err();
        assert_eq!(err.code, ErrorCode::JobCanceled);
    }
}
