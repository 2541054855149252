use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::expr::Parameter;
use crate::feature::Feature;
use crate::selector::Selector;

/// A named connection point exposed by a part for assembly mating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub name: String,
    pub selector: Selector,
}

/// A named datum plane/axis exposed at the part level, independent of any
/// single feature's `plane.datum`/`axis.datum` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDatum {
    pub name: String,
    pub feature_id: String,
}

/// An inter-feature constraint asserted at the part level (e.g. coincidence
/// between two connectors). Evaluated informationally; truform does not run
/// a constraint solver (see Non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartConstraint {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A cosmetic (non-geometric) thread annotation on a selected cylindrical
/// face, rendered in drawings/exports but not cut into the solid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticThread {
    pub face: Selector,
    pub designation: String,
}

/// A build-time assertion the evaluator checks after rebuilding a part
/// (e.g. expected solid count, volume bounds). Failing assertions are
/// reported as warnings, not build failures, unless `strictAssertions` is
/// set on the document context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One buildable part: a sequence of features plus the declarations that
/// scope them (parameters, connectors, datums, constraints, cosmetic
/// threads, assertions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: String,
    pub features: Vec<Feature>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub datums: Vec<PartDatum>,
    #[serde(default)]
    pub constraints: Vec<PartConstraint>,
    #[serde(default)]
    pub cosmetic_threads: Vec<CosmeticThread>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl Part {
    pub fn find_feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn feature_index(&self, id: &str) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }
}
