//! Content-addressed cache keys (spec §4.6, §9): canonical JSON plus a
//! 64-bit FNV-1a hash. `serde_json`'s `Map` is BTreeMap-backed by default
//! (no `preserve_order` feature anywhere in this workspace), so
//! `serde_json::to_string` already emits keys in sorted order — that's the
//! entire "canonicalization" step.

use std::collections::BTreeMap;

use serde::Serialize;
use truform_ir::document::ToleranceContext;
use truform_ir::validate::StagedFeaturePolicy;
use truform_ir::{CoreError, CoreResult, Document, ErrorCode, Feature, OverrideMap, Part};
use truform_kernel::{MeshOptions, StepExportOptions, StlExportOptions};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A content-addressed cache key: the FNV-1a hash of some value's
/// canonical JSON encoding. Two inputs that serialize identically always
/// produce the same key, regardless of build order or process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CacheKey(pub u64);

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

fn canonical_json(value: &impl Serialize) -> CoreResult<String> {
    serde_json::to_string(value).map_err(|e| CoreError::new(ErrorCode::ValidationScalar, format!("cache key input did not serialize: {e}")))
}

pub fn content_hash(value: &impl Serialize) -> CoreResult<CacheKey> {
    let json = canonical_json(value)?;
    Ok(CacheKey(fnv1a_64(json.as_bytes())))
}

#[derive(Serialize)]
struct PartBuildKeyInput<'a> {
    schema: &'a str,
    ir_version: &'a str,
    kernel_name: &'a str,
    kernel_version: &'a str,
    tolerance: &'a ToleranceContext,
    staged_features: StagedFeaturePolicy,
    part: &'a Part,
    overrides: &'a OverrideMap,
}

/// The cache key for one part's build: everything that determines the
/// resulting `BuildResult` if re-evaluated. Any edit to the part's
/// features/params, an override value, a kernel version bump, a tolerance
/// change, or a staged-feature policy change produces a different key —
/// two builds of the same part under a different policy must never share a
/// cached result (spec §4.6).
pub fn part_build_key(
    doc: &Document,
    part: &Part,
    overrides: &OverrideMap,
    staged_features: StagedFeaturePolicy,
) -> CoreResult<CacheKey> {
    content_hash(&PartBuildKeyInput {
        schema: &doc.schema,
        ir_version: &doc.ir_version,
        kernel_name: &doc.context.kernel.name,
        kernel_version: &doc.context.kernel.version,
        tolerance: &doc.context.tolerance,
        staged_features,
        part,
        overrides,
    })
}

#[derive(Serialize)]
struct FeatureInputKeyInput<'a> {
    kernel_name: &'a str,
    kernel_version: &'a str,
    tolerance: &'a ToleranceContext,
    staged_features: StagedFeaturePolicy,
    feature: &'a Feature,
    overrides: &'a OverrideMap,
    /// Each dependency's own chained input hash, not its content — so a
    /// change anywhere upstream propagates forward without re-hashing the
    /// whole ancestry every time (spec §4.6 partial build).
    dep_hashes: &'a BTreeMap<String, CacheKey>,
}

/// One feature's input hash for a partial build: the feature's own
/// content plus the chained hash of each of its direct dependencies.
/// `dep_hashes` must already hold an entry for every id in `feature.deps`
/// (the caller walks the schedule in topological order).
pub fn feature_input_key(
    doc: &Document,
    feature: &Feature,
    overrides: &OverrideMap,
    staged_features: StagedFeaturePolicy,
    dep_hashes: &BTreeMap<String, CacheKey>,
) -> CoreResult<CacheKey> {
    content_hash(&FeatureInputKeyInput {
        kernel_name: &doc.context.kernel.name,
        kernel_version: &doc.context.kernel.version,
        tolerance: &doc.context.tolerance,
        staged_features,
        feature,
        overrides,
        dep_hashes,
    })
}

#[derive(Serialize)]
struct MeshKeyInput<'a> {
    part_build: CacheKey,
    output_name: &'a str,
    options: &'a MeshOptions,
}

/// The cache key for a tessellation of one output of an already-built
/// part: derived from the part's build key plus the mesh options, so a
/// deflection-only re-request reuses the same solid's mesh cache.
pub fn mesh_key(part_build: CacheKey, output_name: &str, options: &MeshOptions) -> CoreResult<CacheKey> {
    content_hash(&MeshKeyInput {
        part_build,
        output_name,
        options,
    })
}

#[derive(Serialize)]
#[serde(tag = "format")]
enum ExportFormat<'a> {
    Step { options: &'a StepExportOptions },
    Stl { options: &'a StlExportOptions },
}

#[derive(Serialize)]
struct ExportKeyInput<'a> {
    part_build: CacheKey,
    output_name: &'a str,
    format: ExportFormat<'a>,
}

pub fn export_step_key(part_build: CacheKey, output_name: &str, options: &StepExportOptions) -> CoreResult<CacheKey> {
    content_hash(&ExportKeyInput {
        part_build,
        output_name,
        format: ExportFormat::Step { options },
    })
}

pub fn export_stl_key(part_build: CacheKey, output_name: &str, options: &StlExportOptions) -> CoreResult<CacheKey> {
    content_hash(&ExportKeyInput {
        part_build,
        output_name,
        format: ExportFormat::Stl { options },
    })
}
