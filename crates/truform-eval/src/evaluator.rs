//! The feature evaluator (spec §4.4): drives a part's topologically
//! ordered features through a kernel adapter, merging each result into a
//! running output index keyed by owner name and recording a per-feature
//! outcome log.

use std::collections::BTreeMap;

use truform_expr::ResolveCtx;
use truform_graph::schedule;
use truform_ir::validate::StagedFeaturePolicy;
use truform_ir::{
    BuildResult, CoreError, CoreResult, ErrorCode, FeatureOutcome, KernelObject, LengthUnit, OverrideMap, Part, Stage,
};
use truform_kernel::{Capabilities, ExecuteInput, KernelAdapter};

use crate::cancel::CancellationToken;
use crate::resolver::SelectorResolver;

/// Policy knobs the evaluator consults before running each feature.
/// Mirrors the builder-style config structs used elsewhere in this
/// workspace (one field per independently tunable policy, `Default` gives
/// the permissive behavior).
#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub staged_features: StagedFeaturePolicy,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            staged_features: StagedFeaturePolicy::Warn,
        }
    }
}

impl EvalOptions {
    /// Reject beta/staging features outright rather than warn.
    pub fn strict() -> Self {
        EvalOptions {
            staged_features: StagedFeaturePolicy::Error,
        }
    }

    /// Run every feature regardless of stability tier, no warnings.
    pub fn permissive() -> Self {
        EvalOptions {
            staged_features: StagedFeaturePolicy::Allow,
        }
    }
}

/// Runs every feature in `part` against `adapter` in dependency order,
/// returning the accumulated build result. A per-feature failure aborts the
/// whole build immediately — the core never silently skips a feature — and
/// the returned error carries `featureId`/`featureKind` context.
pub fn evaluate_part(
    part: &Part,
    doc_length_unit: LengthUnit,
    overrides: &OverrideMap,
    adapter: &mut dyn KernelAdapter,
    cancel: &CancellationToken,
    opts: &EvalOptions,
) -> CoreResult<BuildResult> {
    let span = tracing::info_span!("evaluate_part", part_id = %part.id);
    let _enter = span.enter();

    let (_, order) = schedule(part)?;
    let expr_ctx = ResolveCtx::new(&part.params, overrides, doc_length_unit)?;
    let caps = adapter.capabilities();

    let mut outputs: BTreeMap<String, Vec<KernelObject>> = BTreeMap::new();
    let mut feature_log = Vec::with_capacity(order.len());
    let mut warnings = Vec::new();

    for feature_id in &order {
        if cancel.is_cancelled() {
            return Err(CoreError::new(ErrorCode::JobCanceled, "build canceled between features")
                .with("referenceKind", "feature")
                .with("referenceId", feature_id.clone()));
        }

        let feature = part
            .find_feature(feature_id)
            .expect("schedule only names ids that exist in this part");

        if let Some(reason) = staged_feature_violation(feature.kind.stage(), feature.kind.name(), opts) {
            match opts.staged_features {
                StagedFeaturePolicy::Error => {
                    return Err(CoreError::new(ErrorCode::ValidationStagedFeature, reason).feature(&feature.id, feature.kind.name()));
                }
                StagedFeaturePolicy::Warn => warnings.push(reason),
                StagedFeaturePolicy::Allow => {}
            }
        }

        let result = evaluate_feature(feature, &expr_ctx, &outputs, adapter, &caps)?;
        merge_result(&mut outputs, &result);
        feature_log.push(FeatureOutcome::Ok {
            feature_id: feature.id.clone(),
            result,
        });
    }

    warnings.extend(check_assertions(part, &outputs, &caps));

    Ok(BuildResult {
        part_id: part.id.clone(),
        outputs,
        feature_log,
        warnings,
        mesh: None,
    })
}

/// Runs one feature's kernel call against the live output index: checks
/// capability gating, resolves its selectors/scalars against `outputs`,
/// and invokes `adapter.execute`. Shared by `evaluate_part`'s full-part
/// loop and a partial build's per-feature recompute path (staged-feature
/// policy is checked by the caller, since a partial build must still track
/// warnings across the whole session rather than just this call).
pub fn evaluate_feature(
    feature: &truform_ir::Feature,
    expr_ctx: &ResolveCtx,
    outputs: &BTreeMap<String, Vec<KernelObject>>,
    adapter: &mut dyn KernelAdapter,
    caps: &Capabilities,
) -> CoreResult<truform_ir::KernelResult> {
    let kind_name = feature.kind.name();
    tracing::debug!(feature_id = %feature.id, kind = kind_name, "evaluating feature");

    if !caps.feature_kinds.contains(kind_name) {
        return Err(CoreError::new(
            ErrorCode::BackendUnsupportedFeature,
            format!("kernel {:?} does not support feature kind {kind_name:?}", caps.name),
        )
        .feature(&feature.id, kind_name));
    }

    let flat_pool: Vec<KernelObject> = outputs.values().flatten().cloned().collect();
    let resolver = SelectorResolver::new(outputs);
    let resolve = |s: &truform_ir::Selector| resolver.resolve(s);
    let resolve_scalar = |s: &truform_ir::Scalar, ty: truform_ir::ValueType| expr_ctx.resolve(s, ty);

    adapter
        .execute(ExecuteInput {
            feature,
            upstream: &flat_pool,
            resolve: &resolve,
            resolve_scalar: &resolve_scalar,
        })
        .map_err(|e| e.feature(&feature.id, kind_name))
}

/// Merges one kernel call's output into the running index. Creation
/// re-keys wholesale: every object a call returns shares one owner key
/// (spec §3 KernelObject.ownerKey), so replacing that key's bucket in one
/// step both installs new geometry and prunes whatever stood there before
/// — the rule the Open Question on stale-selection pruning settles on.
/// Explicit `deleted` ids (unused by the reference adapter, but part of
/// the adapter contract) are swept from every bucket afterward. Exposed
/// (not just `evaluate_part`-internal) so a partial build can merge a
/// reused feature's recorded output the same way it merges a freshly
/// recomputed one.
pub fn merge_result(outputs: &mut BTreeMap<String, Vec<KernelObject>>, result: &truform_ir::KernelResult) {
    if let Some(owner_key) = result.created.first().map(|o| o.owner_key.clone()) {
        outputs.insert(owner_key, result.created.clone());
    }
    if !result.deleted.is_empty() {
        for bucket in outputs.values_mut() {
            bucket.retain(|o| !result.deleted.contains(&o.id));
        }
    }
}

/// Checks one feature's stability tier against the active policy, returning
/// a human-readable reason when it's rejected or warned about. Exposed so a
/// partial build can apply the exact same admission rule per feature
/// outside `evaluate_part`'s own loop.
pub fn staged_feature_violation(stage: Stage, kind_name: &str, opts: &EvalOptions) -> Option<String> {
    match stage {
        Stage::Stable => None,
        Stage::Beta | Stage::Staging => match opts.staged_features {
            StagedFeaturePolicy::Allow => None,
            _ => Some(format!("feature kind {kind_name:?} is {stage:?}-tier, staged feature policy applies")),
        },
    }
}

/// Part-level assertions are informational only (spec §3 Assertion doc
/// comment): a failing one becomes a warning, never a build failure.
/// Exposed for reuse by a partial build, which runs the same check once
/// over the merged (reused + recomputed) output index.
pub fn check_assertions(part: &Part, outputs: &BTreeMap<String, Vec<KernelObject>>, caps: &Capabilities) -> Vec<String> {
    let mut warnings = Vec::new();
    for assertion in &part.assertions {
        match assertion.name.as_str() {
            "solid_count" if caps.assertions.iter().any(|a| a == "solid_count") => {
                let solids = outputs.values().flatten().filter(|o| o.role.as_deref() == Some("solid")).count();
                if solids == 0 {
                    warnings.push(format!("assertion {:?} failed: no solids were produced", assertion.name));
                }
            }
            name if !caps.assertions.iter().any(|a| a == name) => {
                warnings.push(format!("assertion {name:?} is not supported by kernel {:?}", caps.name));
            }
            _ => {}
        }
    }
    warnings
}
