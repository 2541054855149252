//! Partial builds (spec §4.6 "partial build request"): given a session and
//! the set of feature ids a caller knows changed, recompute only those
//! features and whatever downstream of them can no longer be trusted,
//! reusing every other feature's last recorded output verbatim.

use std::collections::{BTreeMap, BTreeSet};

use truform_cache::{feature_input_key, BuildSession, CacheKey};
use truform_eval::{check_assertions, evaluate_feature, merge_result, staged_feature_violation};
use truform_expr::ResolveCtx;
use truform_graph::schedule;
use truform_ir::validate::{validate_document, StagedFeaturePolicy};
use truform_ir::{BuildResult, CoreError, CoreResult, Document, ErrorCode, FeatureOutcome, KernelObject, KernelResult, OverrideMap};

use crate::driver::BuildDriver;
use crate::CancellationToken;

/// A `partial_build` result plus which features were served from the
/// session versus recomputed, so a caller can report exactly how much work
/// was skipped.
#[derive(Debug, Clone)]
pub struct PartialBuildOutcome {
    pub result: BuildResult,
    pub reused: Vec<String>,
    pub recomputed: Vec<String>,
}

impl BuildDriver {
    /// Rebuilds `part_id`, reusing `session`'s recorded per-feature output
    /// for every feature that isn't in `changed_feature_ids`, whose
    /// recomputed input hash still matches the session's last-recorded
    /// hash for it, and whose own dependencies all reused theirs. The
    /// first feature failing any of those three conditions — and every
    /// feature downstream of it — recomputes, exactly mirroring a full
    /// build's dependency order (spec §4.6, §8 "Incremental equivalence").
    pub fn partial_build(
        &mut self,
        session: &mut BuildSession,
        doc: &Document,
        part_id: &str,
        overrides: &OverrideMap,
        changed_feature_ids: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> CoreResult<PartialBuildOutcome> {
        let span = tracing::info_span!("partial_build", document_id = %doc.id, part_id = %part_id);
        let _enter = span.enter();

        validate_document(doc, &self.policy().validation)?;
        let part = doc.find_part(part_id).ok_or_else(|| {
            CoreError::new(ErrorCode::ValidationContext, format!("document {:?} has no part {:?}", doc.id, part_id))
                .with("referenceKind", "part")
                .with("referenceId", part_id.to_string())
        })?;

        let staged_features = self.policy().validation.staged_features;
        let eval_opts = self.policy().eval.clone();
        let (graph, order) = schedule(part)?;
        let expr_ctx = ResolveCtx::new(&part.params, overrides, doc.context.units.length)?;
        let adapter = self.adapter_mut();
        let caps = adapter.capabilities();

        let mut outputs: BTreeMap<String, Vec<KernelObject>> = BTreeMap::new();
        let mut dep_hashes: BTreeMap<String, CacheKey> = BTreeMap::new();
        let mut invalidated: BTreeSet<String> = BTreeSet::new();
        let mut feature_log = Vec::with_capacity(order.len());
        let mut warnings = Vec::new();
        let mut reused = Vec::new();
        let mut recomputed = Vec::new();

        for feature_id in &order {
            if cancel.is_cancelled() {
                return Err(CoreError::new(ErrorCode::JobCanceled, "build canceled between features")
                    .with("referenceKind", "feature")
                    .with("referenceId", feature_id.clone()));
            }

            let feature = part
                .find_feature(feature_id)
                .expect("schedule only names ids that exist in this part");

            if let Some(reason) = staged_feature_violation(feature.kind.stage(), feature.kind.name(), &eval_opts) {
                match staged_features {
                    StagedFeaturePolicy::Error => {
                        return Err(CoreError::new(ErrorCode::ValidationStagedFeature, reason).feature(&feature.id, feature.kind.name()));
                    }
                    StagedFeaturePolicy::Warn => warnings.push(reason),
                    StagedFeaturePolicy::Allow => {}
                }
            }

            let depends_on: Vec<String> = graph.edges.iter().filter(|e| &e.to == feature_id).map(|e| e.from.clone()).collect();
            let deps_all_reused = depends_on.iter().all(|d| !invalidated.contains(d));
            let input_hash = feature_input_key(doc, feature, overrides, staged_features, &dep_hashes)?;
            dep_hashes.insert(feature_id.clone(), input_hash);

            let prior = session.feature_build(part_id, feature_id);
            let can_reuse = deps_all_reused
                && !changed_feature_ids.contains(feature_id)
                && prior.is_some_and(|record| record.input_hash == input_hash);

            if can_reuse {
                let record = prior.expect("can_reuse implies prior.is_some");
                let result = KernelResult {
                    created: record.objects.clone(),
                    deleted: vec![],
                    diagnostics: Default::default(),
                };
                merge_result(&mut outputs, &result);
                reused.push(feature_id.clone());
                feature_log.push(FeatureOutcome::Ok {
                    feature_id: feature.id.clone(),
                    result,
                });
                continue;
            }

            invalidated.insert(feature_id.clone());
            let result = evaluate_feature(feature, &expr_ctx, &outputs, adapter, &caps)?;
            merge_result(&mut outputs, &result);
            session.record_feature_build(part_id, feature_id, input_hash, result.created.clone());
            recomputed.push(feature_id.clone());
            feature_log.push(FeatureOutcome::Ok {
                feature_id: feature.id.clone(),
                result,
            });
        }

        warnings.extend(check_assertions(part, &outputs, &caps));

        let result = BuildResult {
            part_id: part.id.clone(),
            outputs,
            feature_log,
            warnings,
            mesh: None,
        };

        tracing::debug!(part_id = %part_id, reused = reused.len(), recomputed = recomputed.len(), "partial_build complete");
        Ok(PartialBuildOutcome { result, reused, recomputed })
    }
}
