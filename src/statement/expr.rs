//! Expressions the binder couldn't reduce to a literal.
//!
//! Evaluated against the bound parameters just before routing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sharding::Value;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("parameter ${0} is not bound")]
    MissingParameter(usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("\"{0}\" is not a number")]
    NotNumeric(String),

    #[error("values \"{0}\" and \"{1}\" can't be compared")]
    Incomparable(String, String),

    #[error("expression can't be evaluated")]
    Unresolvable,
}

/// Parameter placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// `?`, numbered by position in the text.
    #[default]
    Question,
    /// `$1`, numbered explicitly.
    Dollar,
}

/// Reference to a bound parameter, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMarker {
    pub index: usize,
    #[serde(default)]
    pub kind: MarkerKind,
}

impl ParameterMarker {
    pub fn question(index: usize) -> Self {
        Self {
            index,
            kind: MarkerKind::Question,
        }
    }

    pub fn dollar(index: usize) -> Self {
        Self {
            index,
            kind: MarkerKind::Dollar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Compare {
        op: CompareOperator,
        left: Expr,
        right: Expr,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Literal(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenThen {
    pub when: Condition,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    Parameter(ParameterMarker),
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Case {
        branches: Vec<WhenThen>,
        #[serde(default)]
        otherwise: Option<Box<Expr>>,
    },
    /// Anything else, e.g. a function call.
    Unknown,
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn param(index: usize) -> Self {
        Self::Parameter(ParameterMarker::question(index))
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate using bound parameters.
    pub fn evaluate(&self, params: &[Value]) -> Result<Value, Error> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Parameter(marker) => params
                .get(marker.index)
                .cloned()
                .ok_or(Error::MissingParameter(marker.index + 1)),
            Self::Binary { op, left, right } => {
                let left = numeric(&left.evaluate(params)?)?;
                let right = numeric(&right.evaluate(params)?)?;
                let result = match op {
                    BinaryOperator::Add => left.checked_add(right),
                    BinaryOperator::Subtract => left.checked_sub(right),
                    BinaryOperator::Multiply => left.checked_mul(right),
                    BinaryOperator::Divide => {
                        if right == 0 {
                            return Err(Error::DivisionByZero);
                        }
                        left.checked_div(right)
                    }
                };
                result.map(Value::Integer).ok_or(Error::Overflow)
            }
            Self::Case {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    if branch.when.evaluate(params)? {
                        return branch.then.evaluate(params);
                    }
                }
                match otherwise {
                    Some(otherwise) => otherwise.evaluate(params),
                    None => Ok(Value::Null),
                }
            }
            Self::Unknown => Err(Error::Unresolvable),
        }
    }

    /// Parameters referenced anywhere in the expression.
    pub fn parameters(&self) -> Vec<ParameterMarker> {
        let mut markers = vec![];
        self.collect_parameters(&mut markers);
        markers
    }

    fn collect_parameters(&self, markers: &mut Vec<ParameterMarker>) {
        match self {
            Self::Parameter(marker) => markers.push(*marker),
            Self::Binary { left, right, .. } => {
                left.collect_parameters(markers);
                right.collect_parameters(markers);
            }
            Self::Case {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    branch.when.collect_parameters(markers);
                    branch.then.collect_parameters(markers);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_parameters(markers);
                }
            }
            Self::Literal(_) | Self::Unknown => (),
        }
    }
}

impl Condition {
    pub fn evaluate(&self, params: &[Value]) -> Result<bool, Error> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Not(condition) => Ok(!condition.evaluate(params)?),
            Self::And(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(params)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(conditions) => {
                for condition in conditions {
                    if condition.evaluate(params)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Compare { op, left, right } => {
                let left = left.evaluate(params)?;
                let right = right.evaluate(params)?;
                // NULL never compares true.
                if left.is_null() || right.is_null() {
                    return Ok(false);
                }
                let ordering = left
                    .partial_cmp(&right)
                    .ok_or_else(|| Error::Incomparable(left.to_string(), right.to_string()))?;
                Ok(match op {
                    CompareOperator::Eq => ordering.is_eq(),
                    CompareOperator::NotEq => ordering.is_ne(),
                    CompareOperator::Lt => ordering.is_lt(),
                    CompareOperator::LtEq => ordering.is_le(),
                    CompareOperator::Gt => ordering.is_gt(),
                    CompareOperator::GtEq => ordering.is_ge(),
                })
            }
        }
    }

    fn collect_parameters(&self, markers: &mut Vec<ParameterMarker>) {
        match self {
            Self::Compare { left, right, .. } => {
                left.collect_parameters(markers);
                right.collect_parameters(markers);
            }
            Self::And(conditions) | Self::Or(conditions) => {
                for condition in conditions {
                    condition.collect_parameters(markers);
                }
            }
            Self::Not(condition) => condition.collect_parameters(markers),
            Self::Literal(_) => (),
        }
    }
}

fn numeric(value: &Value) -> Result<i64, Error> {
    value
        .int()
        .ok_or_else(|| Error::NotNumeric(value.to_string()))
}
