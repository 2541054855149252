use serde::{Deserialize, Serialize};

/// Length unit carried by a literal or the document's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Mm,
    Cm,
    M,
    In,
}

impl LengthUnit {
    /// Factor to convert a value in this unit to millimeters, the canonical
    /// length unit used throughout the normalized IR.
    pub fn to_mm_factor(self) -> f64 {
        match self {
            LengthUnit::Mm => 1.0,
            LengthUnit::Cm => 10.0,
            LengthUnit::M => 1000.0,
            LengthUnit::In => 25.4,
        }
    }
}

/// Angle unit carried by a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    Rad,
    Deg,
}

impl AngleUnit {
    /// Factor to convert a value in this unit to radians, the canonical
    /// angle unit.
    pub fn to_rad_factor(self) -> f64 {
        match self {
            AngleUnit::Rad => 1.0,
            AngleUnit::Deg => std::f64::consts::PI / 180.0,
        }
    }
}

/// Any unit a literal may carry. `count` values never carry a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Unit {
    Length(LengthUnit),
    Angle(AngleUnit),
}

/// The canonical, unit-resolved type of a value flowing through the
/// parameter/expression engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Length,
    Angle,
    Count,
}
