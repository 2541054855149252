use serde::{Deserialize, Serialize};

/// One of the six principal axis directions. Used both by selector
/// `normal` predicates and by feature fields (extrude direction, hole
/// axis, pattern direction, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    PlusX,
    MinusX,
    PlusY,
    MinusY,
    PlusZ,
    MinusZ,
}

impl Axis {
    pub fn unit_vector(self) -> [f64; 3] {
        match self {
            Axis::PlusX => [1.0, 0.0, 0.0],
            Axis::MinusX => [-1.0, 0.0, 0.0],
            Axis::PlusY => [0.0, 1.0, 0.0],
            Axis::MinusY => [0.0, -1.0, 0.0],
            Axis::PlusZ => [0.0, 0.0, 1.0],
            Axis::MinusZ => [0.0, 0.0, -1.0],
        }
    }
}

/// The kind of geometric entity a typed selector targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Face,
    Edge,
    Solid,
}

/// A predicate that prunes the candidate selection set, applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    Normal { axis: Axis },
    Planar,
    CreatedBy { feature_id: String },
    Role { role: String },
}

/// A stable-sort rank rule, applied in order with the last rule dominating
/// as the primary sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Rank {
    MaxArea,
    MinZ,
    MaxZ,
    ClosestTo { selector: Box<Selector> },
}

/// A declarative query against the current geometric index. Resolves to
/// one (point-selector) or several (set-selector) selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selector {
    Face {
        #[serde(default)]
        predicates: Vec<Predicate>,
        #[serde(default)]
        rank: Vec<Rank>,
    },
    Edge {
        #[serde(default)]
        predicates: Vec<Predicate>,
        #[serde(default)]
        rank: Vec<Rank>,
    },
    Solid {
        #[serde(default)]
        predicates: Vec<Predicate>,
        #[serde(default)]
        rank: Vec<Rank>,
    },
    Named {
        name: String,
    },
}

impl Selector {
    pub fn kind(&self) -> Option<SelectorKind> {
        match self {
            Selector::Face { .. } => Some(SelectorKind::Face),
            Selector::Edge { .. } => Some(SelectorKind::Edge),
            Selector::Solid { .. } => Some(SelectorKind::Solid),
            Selector::Named { .. } => None,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        match self {
            Selector::Face { predicates, .. }
            | Selector::Edge { predicates, .. }
            | Selector::Solid { predicates, .. } => predicates,
            Selector::Named { .. } => &[],
        }
    }

    pub fn rank(&self) -> &[Rank] {
        match self {
            Selector::Face { rank, .. } | Selector::Edge { rank, .. } | Selector::Solid { rank, .. } => {
                rank
            }
            Selector::Named { .. } => &[],
        }
    }

    /// Whether this selector is reachable from a known feature id without
    /// help from an explicit `deps` entry: via `createdBy`, a nested
    /// `closestTo` that is itself anchored, or a `named` reference.
    pub fn is_self_anchored(&self) -> bool {
        match self {
            Selector::Named { .. } => true,
            Selector::Face { predicates, rank, .. }
            | Selector::Edge { predicates, rank, .. }
            | Selector::Solid { predicates, rank, .. } => {
                predicates
                    .iter()
                    .any(|p| matches!(p, Predicate::CreatedBy { .. }))
                    || rank.iter().any(|r| match r {
                        Rank::ClosestTo { selector } => selector.is_self_anchored(),
                        Rank::MaxArea | Rank::MinZ | Rank::MaxZ => false,
                    })
            }
        }
    }

    /// `createdBy` feature ids referenced anywhere in this selector,
    /// including nested `closestTo` selectors.
    pub fn created_by_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for p in self.predicates() {
            if let Predicate::CreatedBy { feature_id } = p {
                ids.push(feature_id.as_str());
            }
        }
        for r in self.rank() {
            if let Rank::ClosestTo { selector } = r {
                ids.extend(selector.created_by_ids());
            }
        }
        ids
    }

    pub fn named_ref(&self) -> Option<&str> {
        match self {
            Selector::Named { name } => Some(name.as_str()),
            _ => None,
        }
    }
}
