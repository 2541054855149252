//! Unit-aware parameter and expression resolution (spec §4.2). Given a
//! part's declared parameters, an optional override map and the document's
//! length unit, resolves any [`Scalar`] to a finite `f64` in canonical
//! units (millimeters for length, radians for angle, a plain integer count
//! for `count`).

use std::cell::RefCell;
use std::collections::BTreeMap;

use truform_ir::{
    BinOp, CoreError, CoreResult, Dimension, ErrorCode, Expr, LengthUnit, OverrideMap, Parameter, Scalar, Unit,
    ValueType,
};

/// A resolution context: the params in scope, the caller's overrides, and
/// the document's default length unit for unit-less literals. Owns a
/// memoization cache keyed by `(paramId, expectedType)` so resolving the
/// same parameter reference twice (e.g. via two sibling expressions) does
/// the arithmetic once.
#[derive(Debug)]
pub struct ResolveCtx<'a> {
    params: BTreeMap<&'a str, &'a Parameter>,
    overrides: &'a OverrideMap,
    doc_length_unit: LengthUnit,
    memo: RefCell<BTreeMap<(String, ValueType), f64>>,
}

impl<'a> ResolveCtx<'a> {
    /// Builds a context, rejecting any override id that does not name a
    /// declared parameter (spec §4.2: "unknown override ids are errors").
    pub fn new(params: &'a [Parameter], overrides: &'a OverrideMap, doc_length_unit: LengthUnit) -> CoreResult<Self> {
        let params: BTreeMap<&str, &Parameter> = params.iter().map(|p| (p.id.as_str(), p)).collect();
        for key in overrides.keys() {
            if !params.contains_key(key.as_str()) {
                return Err(scalar_error(format!("override id {key:?} does not name a declared parameter"))
                    .with("referenceKind", "override")
                    .with("referenceId", key.clone()));
            }
        }
        Ok(ResolveCtx {
            params,
            overrides,
            doc_length_unit,
            memo: RefCell::new(BTreeMap::new()),
        })
    }

    /// Resolve any user-facing numeric field to a finite double in
    /// canonical units, or an error naming the offending scalar.
    pub fn resolve(&self, scalar: &Scalar, expected: ValueType) -> CoreResult<f64> {
        match scalar {
            Scalar::Number(n) => self.resolve_bare_number(*n, expected),
            Scalar::Expr(e) => self.resolve_expr(e, expected),
        }
    }

    pub fn resolve_dimension(&self, dim: &Dimension) -> CoreResult<ResolvedDimension> {
        let resolve_opt = |s: &Option<Scalar>| -> CoreResult<Option<f64>> {
            s.as_ref().map(|v| self.resolve(v, ValueType::Length)).transpose()
        };
        let nominal = resolve_opt(&dim.nominal)?;
        let tolerance = resolve_opt(&dim.tolerance)?;
        let plus = resolve_opt(&dim.plus)?;
        let minus = resolve_opt(&dim.minus)?;
        let min = resolve_opt(&dim.min)?;
        let max = resolve_opt(&dim.max)?;

        if let Some(t) = tolerance {
            if t <= 0.0 {
                return Err(scalar_error(format!("dimension {:?} tolerance must be > 0", dim.name)));
            }
        }
        if let Some(p) = plus {
            if p < 0.0 {
                return Err(scalar_error(format!("dimension {:?} plus must be >= 0", dim.name)));
            }
        }
        if let Some(m) = minus {
            if m < 0.0 {
                return Err(scalar_error(format!("dimension {:?} minus must be >= 0", dim.name)));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(scalar_error(format!("dimension {:?} has min > max", dim.name)));
            }
        }

        Ok(ResolvedDimension {
            nominal,
            tolerance,
            plus,
            minus,
            min,
            max,
        })
    }

    fn resolve_bare_number(&self, n: f64, expected: ValueType) -> CoreResult<f64> {
        match expected {
            ValueType::Length => Ok(n * self.doc_length_unit.to_mm_factor()),
            ValueType::Angle => Ok(n),
            ValueType::Count => {
                if n.fract() != 0.0 || n < 0.0 {
                    Err(scalar_error(format!("count value {n} must be a non-negative integer")))
                } else {
                    Ok(n)
                }
            }
        }
    }

    fn resolve_expr(&self, expr: &Expr, expected: ValueType) -> CoreResult<f64> {
        match expr {
            Expr::Literal { value, unit } => resolve_literal(*value, *unit, expected, self.doc_length_unit),
            Expr::ParamRef { id } => self.resolve_param_ref(id, expected),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.resolve_expr(lhs, expected)?;
                let r = self.resolve_expr(rhs, expected)?;
                apply_binop(*op, l, r)
            }
            Expr::Neg { expr } => Ok(-self.resolve_expr(expr, expected)?),
        }
    }

    fn resolve_param_ref(&self, id: &str, expected: ValueType) -> CoreResult<f64> {
        let key = (id.to_string(), expected);
        if let Some(cached) = self.memo.borrow().get(&key) {
            return Ok(*cached);
        }

        let param = self
            .params
            .get(id)
            .ok_or_else(|| scalar_error(format!("unknown parameter id {id:?}")).with("referenceId", id.to_string()))?;

        if param.value_type != expected {
            return Err(scalar_error(format!(
                "parameter {id:?} has type {:?}, expected {:?}",
                param.value_type, expected
            )));
        }

        let scalar = match self.overrides.get(id) {
            Some(over) => over,
            None => &param.default_expr,
        };
        let value = self.resolve(scalar, expected)?;
        self.memo.borrow_mut().insert(key, value);
        Ok(value)
    }
}

fn resolve_literal(value: f64, unit: Option<Unit>, expected: ValueType, doc_length_unit: LengthUnit) -> CoreResult<f64> {
    match (expected, unit) {
        (ValueType::Length, None) => Ok(value * doc_length_unit.to_mm_factor()),
        (ValueType::Length, Some(Unit::Length(u))) => Ok(value * u.to_mm_factor()),
        (ValueType::Length, Some(Unit::Angle(_))) => Err(scalar_error("expected a length literal, found an angle unit")),
        (ValueType::Angle, None) => Ok(value),
        (ValueType::Angle, Some(Unit::Angle(u))) => Ok(value * u.to_rad_factor()),
        (ValueType::Angle, Some(Unit::Length(_))) => Err(scalar_error("expected an angle literal, found a length unit")),
        (ValueType::Count, None) => {
            if value.fract() != 0.0 || value < 0.0 {
                Err(scalar_error(format!("count value {value} must be a non-negative integer")))
            } else {
                Ok(value)
            }
        }
        (ValueType::Count, Some(_)) => Err(scalar_error("count literals must not carry a unit")),
    }
}

fn apply_binop(op: BinOp, l: f64, r: f64) -> CoreResult<f64> {
    match op {
        BinOp::Add => Ok(l + r),
        BinOp::Sub => Ok(l - r),
        BinOp::Mul => Ok(l * r),
        BinOp::Div => {
            if r == 0.0 {
                Err(scalar_error("division by zero"))
            } else {
                Ok(l / r)
            }
        }
    }
}

fn scalar_error(message: impl Into<String>) -> CoreError {
    CoreError::new(ErrorCode::ValidationScalar, message)
}

/// A dimension with every present field resolved to a finite mm value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedDimension {
    pub nominal: Option<f64>,
    pub tolerance: Option<f64>,
    pub plus: Option<f64>,
    pub minus: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}
