use serde::{Deserialize, Serialize};

use crate::expr::Scalar;

/// A single geometric entity inside a 2D sketch. Every entity carries an id
/// unique within its sketch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SketchEntity {
    Point {
        id: String,
        x: Scalar,
        y: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Line {
        id: String,
        start: String,
        end: String,
        #[serde(default)]
        construction: bool,
    },
    Arc {
        id: String,
        center: String,
        start: String,
        end: String,
        #[serde(default)]
        construction: bool,
    },
    Circle {
        id: String,
        center: String,
        radius: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Ellipse {
        id: String,
        center: String,
        radius_major: Scalar,
        radius_minor: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Rectangle {
        id: String,
        corner: String,
        width: Scalar,
        height: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Slot {
        id: String,
        start: String,
        end: String,
        width: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Polygon {
        id: String,
        sides: u32,
        center: String,
        radius: Scalar,
        #[serde(default)]
        construction: bool,
    },
    Spline {
        id: String,
        points: Vec<String>,
        #[serde(default)]
        construction: bool,
    },
}

impl SketchEntity {
    pub fn id(&self) -> &str {
        match self {
            SketchEntity::Point { id, .. }
            | SketchEntity::Line { id, .. }
            | SketchEntity::Arc { id, .. }
            | SketchEntity::Circle { id, .. }
            | SketchEntity::Ellipse { id, .. }
            | SketchEntity::Rectangle { id, .. }
            | SketchEntity::Slot { id, .. }
            | SketchEntity::Polygon { id, .. }
            | SketchEntity::Spline { id, .. } => id,
        }
    }

    pub fn is_construction(&self) -> bool {
        match self {
            SketchEntity::Point { construction, .. }
            | SketchEntity::Line { construction, .. }
            | SketchEntity::Arc { construction, .. }
            | SketchEntity::Circle { construction, .. }
            | SketchEntity::Ellipse { construction, .. }
            | SketchEntity::Rectangle { construction, .. }
            | SketchEntity::Slot { construction, .. }
            | SketchEntity::Polygon { construction, .. }
            | SketchEntity::Spline { construction, .. } => *construction,
        }
    }

    /// Point entities do not bound a renderable loop by themselves.
    pub fn is_renderable(&self) -> bool {
        !matches!(self, SketchEntity::Point { .. })
    }
}

/// A named profile: a closed (or explicitly open) loop of entities suitable
/// for extrusion, revolution, or sweeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Profile {
    Rectangle {
        name: String,
        corner: [f64; 2],
        width: Scalar,
        height: Scalar,
    },
    Circle {
        name: String,
        center: [f64; 2],
        radius: Scalar,
    },
    Poly {
        name: String,
        points: Vec<[f64; 2]>,
    },
    Sketch {
        name: String,
        loop_ids: Vec<String>,
        #[serde(default)]
        hole_loops: Vec<Vec<String>>,
        #[serde(default)]
        open: bool,
    },
    ProfileRef {
        name: String,
    },
}

impl Profile {
    pub fn name(&self) -> &str {
        match self {
            Profile::Rectangle { name, .. }
            | Profile::Circle { name, .. }
            | Profile::Poly { name, .. }
            | Profile::Sketch { name, .. }
            | Profile::ProfileRef { name } => name,
        }
    }
}
