use serde::{Deserialize, Serialize};

use crate::part::{Assertion, Part};
use crate::units::{AngleUnit, LengthUnit};

/// The document-wide default units. Individual `Expr::Literal` values may
/// carry their own unit, but bare numbers and all canonicalized output use
/// these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsContext {
    pub length: LengthUnit,
    pub angle: AngleUnit,
}

/// Which backend built this document, and at what version — part of the
/// cache key so artifacts never leak across incompatible kernel builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelContext {
    pub name: String,
    pub version: String,
}

/// Tolerance policy threaded through the validator's dimension checks and
/// the kernel adapter's `checkValid` pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceContext {
    pub linear: f64,
    pub angular: f64,
}

impl Default for ToleranceContext {
    fn default() -> Self {
        ToleranceContext {
            linear: 1e-4,
            angular: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContext {
    pub units: UnitsContext,
    pub kernel: KernelContext,
    #[serde(default)]
    pub tolerance: ToleranceContext,
}

/// A mating edge between two parts' named connectors inside an assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyMate {
    pub name: String,
    pub part_a: String,
    pub connector_a: String,
    pub part_b: String,
    pub connector_b: String,
}

/// A collection of parts positioned relative to one another via mates.
/// truform does not solve assembly mates geometrically (see Non-goals); it
/// records and validates them structurally only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub id: String,
    pub part_ids: Vec<String>,
    #[serde(default)]
    pub mates: Vec<AssemblyMate>,
}

/// The wire-format root: everything needed to deterministically rebuild
/// every part in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub schema: String,
    pub ir_version: String,
    pub parts: Vec<Part>,
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    pub context: DocumentContext,
}

impl Document {
    pub fn find_part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }
}

/// Schema/IR versions this build of truform accepts. A document whose
/// `irVersion` is not in this list fails validation with
/// `validation_unsupported_version`.
pub const SUPPORTED_IR_VERSIONS: &[&str] = &["1.0"];
