use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::selector::SelectorKind;

/// A single piece of topology the kernel adapter produced or kept alive
/// across a feature execution: a face, edge, or solid, tagged with the
/// bookkeeping the evaluator and selector resolver need without ever
/// looking at the adapter's internal shape representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelObject {
    /// Opaque id assigned by the adapter. Stable within one build, not
    /// across builds — the evaluator never persists these past a run.
    pub id: String,
    pub kind: SelectorKind,
    /// The output name of the solid this object currently belongs to.
    /// Faces/edges on a solid that gets re-keyed by a later mutating
    /// feature (hole/fillet/chamfer/shell/...) move to the new owner key.
    pub owner_key: String,
    /// The feature id that introduced this object, used by `createdBy`
    /// selector predicates.
    pub created_by: String,
    /// An adapter-assigned semantic role (e.g. `end_cap_positive`,
    /// `fillet_face`), used by `role` selector predicates. Opaque to the
    /// evaluator; only the adapter and the selector resolver interpret it.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub planar: bool,
    #[serde(default)]
    pub normal: Option<[f64; 3]>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub centroid: Option<[f64; 3]>,
}

/// A resolved selector: the ordered list of objects it matched, already
/// ranked. Empty means `selector_empty`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelSelection {
    pub objects: Vec<KernelObject>,
}

impl KernelSelection {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn first(&self) -> Option<&KernelObject> {
        self.objects.first()
    }
}

/// A renderable triangle mesh, one index buffer with per-face ranges so a
/// consumer can recover which source face each triangle came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMesh {
    pub vertices: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub face_ranges: Vec<FaceRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRange {
    pub face_id: String,
    pub start_index: u32,
    pub end_index: u32,
}

/// Diagnostics returned alongside a kernel operation: warnings that did not
/// stop the build plus timing for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelDiagnostics {
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

/// What a single `execute` call against the kernel adapter returns: the
/// objects it created or re-keyed, plus the objects it deleted (so the
/// evaluator can prune stale selections keyed on a dead owner).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelResult {
    pub created: Vec<KernelObject>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub diagnostics: KernelDiagnostics,
}

/// The outcome of building one feature: either it produced/updated kernel
/// objects, or it failed with a stable error code plus message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FeatureOutcome {
    Ok {
        feature_id: String,
        result: KernelResult,
    },
    Error {
        feature_id: String,
        code: String,
        message: String,
    },
    Skipped {
        feature_id: String,
        reason: String,
    },
}

/// Top-level result of building one part: the live object index keyed by
/// output name, plus a per-feature log and any warnings collected along
/// the way. This is what `truform::build_part` returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub part_id: String,
    /// Output name -> the objects currently owned under that key. The
    /// final non-suppressed feature's `result` (or owner key, for
    /// mutating features) is the part's primary solid.
    pub outputs: BTreeMap<String, Vec<KernelObject>>,
    pub feature_log: Vec<FeatureOutcome>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub mesh: Option<RenderMesh>,
}

impl BuildResult {
    pub fn new(part_id: impl Into<String>) -> Self {
        BuildResult {
            part_id: part_id.into(),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.feature_log
            .iter()
            .any(|o| matches!(o, FeatureOutcome::Error { .. }))
    }
}
