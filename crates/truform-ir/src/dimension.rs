use serde::{Deserialize, Serialize};

use crate::expr::Scalar;

/// A driven or reference dimension attached to a part for drawing/GD&T
/// purposes. truform validates its tolerance shape but does not evaluate
/// GD&T semantics (see Non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub nominal: Option<Scalar>,
    #[serde(default)]
    pub tolerance: Option<Scalar>,
    #[serde(default)]
    pub plus: Option<Scalar>,
    #[serde(default)]
    pub minus: Option<Scalar>,
    #[serde(default)]
    pub min: Option<Scalar>,
    #[serde(default)]
    pub max: Option<Scalar>,
}

impl Dimension {
    /// Structural shape check only; magnitude/sign checks that need a
    /// resolved number happen in [`crate::validate`] after normalization.
    pub fn has_symmetric_tolerance(&self) -> bool {
        self.tolerance.is_some()
    }

    pub fn has_bilateral_tolerance(&self) -> bool {
        self.plus.is_some() || self.minus.is_some()
    }

    pub fn has_min_max(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}
