use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::units::{Unit, ValueType};

/// A binary arithmetic operator over two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The closed expression sum type. Expressions are pure trees; evaluating
/// one never mutates the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expr {
    Literal {
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<Unit>,
    },
    ParamRef {
        id: String,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg {
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: f64) -> Self {
        Expr::Literal { value, unit: None }
    }

    pub fn literal_with_unit(value: f64, unit: Unit) -> Self {
        Expr::Literal {
            value,
            unit: Some(unit),
        }
    }

    pub fn param(id: impl Into<String>) -> Self {
        Expr::ParamRef { id: id.into() }
    }
}

/// A user-facing numeric field: either a raw number (interpreted in the
/// expected type's document/canonical unit) or a full expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum Scalar {
    Number(f64),
    Expr(Expr),
}

impl Scalar {
    pub fn number(v: f64) -> Self {
        Scalar::Number(v)
    }

    pub fn expr(e: Expr) -> Self {
        Scalar::Expr(e)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<Expr> for Scalar {
    fn from(e: Expr) -> Self {
        Scalar::Expr(e)
    }
}

/// A named parameter declared on a part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub default_expr: Scalar,
}

/// A caller-supplied override map from parameter id to a replacement
/// expression. Unknown ids are an error at resolution time.
pub type OverrideMap = BTreeMap<String, Scalar>;
