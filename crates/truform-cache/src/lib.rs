//! The artifact cache and build session layer (spec §4.6): content-addressed
//! reuse of `PartBuild`, `Mesh` and `Export` artifacts, plus the session
//! bookkeeping that lets an editing client skip re-running unchanged parts.

pub mod key;
pub mod session;
pub mod store;

pub use key::{content_hash, export_step_key, export_stl_key, feature_input_key, mesh_key, part_build_key, CacheKey};
pub use session::{BuildSession, BuildSessionStore, FeatureBuildRecord, SessionId};
pub use store::ArtifactCache;

use truform_ir::validate::StagedFeaturePolicy;
use truform_ir::{BuildResult, CoreResult, Document, OverrideMap, Part};

/// The cache surface a build driver actually calls: look up or compute a
/// part's `BuildResult`, keyed on everything `PartBuildKey` covers. Kept
/// as a thin wrapper over [`ArtifactCache`] so callers never hash a key by
/// hand.
pub struct PartBuildCache {
    inner: ArtifactCache<BuildResult>,
}

impl PartBuildCache {
    pub fn new(capacity: usize) -> Self {
        PartBuildCache {
            inner: ArtifactCache::new(capacity),
        }
    }

    pub fn get_or_build(
        &mut self,
        doc: &Document,
        part: &Part,
        overrides: &OverrideMap,
        staged_features: StagedFeaturePolicy,
        build: impl FnOnce() -> CoreResult<BuildResult>,
    ) -> CoreResult<(BuildResult, bool)> {
        let key = part_build_key(doc, part, overrides, staged_features)?;
        self.inner.get_or_insert_with(key, build)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truform_ir::document::{DocumentContext, KernelContext, ToleranceContext, UnitsContext};
    use truform_ir::feature::{ExtrudeParams, FeatureKind};
    use truform_ir::sketch::Profile;
    use truform_ir::{AngleUnit, Feature, LengthUnit, Scalar, SCHEMA_TAG};

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
                    name: "mock".into(),
                    version: "0.1.0".into(),
                },
                tolerance: ToleranceContext::default(),
            },
        }
    }

    fn plate() -> Part {
        Part {
            id: "part1".into(),
            features: vec![Feature {
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
    fn unchanged_part_hits_cache_on_second_build() {
        let doc = doc_with(plate());
        let part = &doc.parts[0];
        let overrides = OverrideMap::new();
        let mut cache = PartBuildCache::new(8);

        let mut builds = 0;
        let (_r1, hit1) = cache
            .get_or_build(&doc, part, &overrides, StagedFeaturePolicy::Warn, || {
                builds += 1;
                Ok(BuildResult::new(part.id.clone()))
            })
            .unwrap();
        assert!(!hit1);

        let (_r2, hit2) = cache
            .get_or_build(&doc, part, &overrides, StagedFeaturePolicy::Warn, || {
                builds += 1;
                Ok(BuildResult::new(part.id.clone()))
            })
            .unwrap();
        assert!(hit2);
        assert_eq!(builds, 1);
    }

    #[test]
    fn editing_the_part_misses_the_cache() {
        let doc = doc_with(plate());
        let mut edited = doc.parts[0].clone();
        if let FeatureKind::Extrude(p) = &mut edited.features[0].kind {
            p.depth = Scalar::number(9.0);
        }
        let overrides = OverrideMap::new();

        let key_before = part_build_key(&doc, &doc.parts[0], &overrides, StagedFeaturePolicy::Warn).unwrap();
        let key_after = part_build_key(&doc, &edited, &overrides, StagedFeaturePolicy::Warn).unwrap();
        assert_ne!(key_before, key_after);
    }

    #[test]
    fn different_staged_feature_policy_misses_the_cache() {
        let doc = doc_with(plate());
        let overrides = OverrideMap::new();
        let key_warn = part_build_key(&doc, &doc.parts[0], &overrides, StagedFeaturePolicy::Warn).unwrap();
        let key_error = part_build_key(&doc, &doc.parts[0], &overrides, StagedFeaturePolicy::Error).unwrap();
        assert_ne!(key_warn, key_error);
    }

    #[test]
    fn different_tolerance_misses_the_cache() {
        let mut doc = doc_with(plate());
        let overrides = OverrideMap::new();
        let key_before = part_build_key(&doc, &doc.parts[0], &overrides, StagedFeaturePolicy::Warn).unwrap();
        doc.context.tolerance.linear *= 2.0;
        let key_after = part_build_key(&doc, &doc.parts[0], &overrides, StagedFeaturePolicy::Warn).unwrap();
        assert_ne!(key_before, key_after);
    }
}
