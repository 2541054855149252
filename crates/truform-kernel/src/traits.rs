use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use truform_ir::{CoreResult, Feature, KernelObject, KernelResult, KernelSelection, RenderMesh, Scalar, Selector, Stage, ValueType};

/// What this adapter supports, advertised once and consulted by the
/// evaluator before every feature execution (spec §4.4 point 5, §6.1).
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub name: String,
    pub feature_kinds: BTreeSet<String>,
    pub feature_stages: BTreeMap<String, FeatureCapability>,
    pub mesh: bool,
    pub exports: ExportCapabilities,
    pub assertions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeatureCapability {
    pub stage: Stage,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportCapabilities {
    pub step: bool,
    pub stl: bool,
}

/// Everything one `execute` call needs: the feature being built, the
/// accumulated upstream objects (read-only snapshot at this point in the
/// schedule), and a resolver closure over §4.5 that the adapter uses to
/// turn the feature's own selectors into concrete objects.
pub struct ExecuteInput<'a> {
    pub feature: &'a Feature,
    pub upstream: &'a [KernelObject],
    pub resolve: &'a dyn Fn(&Selector) -> CoreResult<KernelSelection>,
    /// Resolves a user-facing Scalar to a finite number in canonical units.
    /// Kept behind a closure so this crate never depends on the expression
    /// engine directly — the evaluator is the only caller that owns a
    /// `ResolveCtx`.
    pub resolve_scalar: &'a dyn Fn(&Scalar, ValueType) -> CoreResult<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlFormat {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshOptions {
    pub linear_deflection: Option<f64>,
    pub angular_deflection: Option<f64>,
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub include_edges: bool,
    #[serde(default)]
    pub include_tangent_edges: bool,
    pub edge_segment_length: Option<f64>,
    pub edge_max_segments: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepExportOptions {
    pub schema: Option<String>,
    pub unit: Option<String>,
    pub precision: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StlExportOptions {
    pub format: StlFormat,
}

impl Default for StlExportOptions {
    fn default() -> Self {
        StlExportOptions {
            format: StlFormat::Binary,
        }
    }
}

/// The sole contract the core depends on; any kernel satisfying it is
/// interchangeable (spec §6.1). A single generic `execute` entry point
/// replaces a per-feature-kind method set so new feature kinds never
/// require a trait change, only a `capabilities()` update.
pub trait KernelAdapter {
    fn capabilities(&self) -> Capabilities;

    fn execute(&mut self, input: ExecuteInput<'_>) -> CoreResult<KernelResult>;

    fn mesh(&self, object: &KernelObject, options: &MeshOptions) -> CoreResult<RenderMesh>;

    fn export_step(&self, object: &KernelObject, options: &StepExportOptions) -> CoreResult<Vec<u8>>;

    fn export_stl(&self, object: &KernelObject, options: &StlExportOptions) -> CoreResult<Vec<u8>>;

    /// Default accepts everything; adapters with a real validity check
    /// (self-intersection, non-manifold edges, ...) override this.
    fn check_valid(&self, _object: &KernelObject) -> bool {
        true
    }
}
