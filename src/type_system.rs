//! Static types re-derived from the tree at evaluation time.

use std::cmp::Ordering;

use crate::{
    ast::{BinaryOp, ValueType},
    codec::{self, ExprNode},
    ctr::NodeId,
    error::{Error, Result},
    eval::{Evaluator, Io, Value},
};

/// How two operands of a comparison are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonStrategy {
    /// Both `Int`.
    Integer,
    /// `Int` and `Float` in any mix.
    Numeric,
    /// At least one `Char`, the other `Char`, `Int` or `Float`: compared by
    /// the char's ordinal.
    Ordinal,
    /// Both `String`.
    Text,
}

impl ComparisonStrategy {
    pub fn compare(self, lhs: &Value, rhs: &Value) -> Option<Ordering> {
        match (self, lhs, rhs) {
            (ComparisonStrategy::Integer, Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (ComparisonStrategy::Text, Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => lhs.as_f64().partial_cmp(&rhs.as_f64()),
        }
    }
}

/// Total table over every pair of operand types.
pub fn comparison_strategy(lhs: ValueType, rhs: ValueType) -> Result<ComparisonStrategy> {
    use ValueType::*;

    match (lhs, rhs) {
        (Int, Int) => Ok(ComparisonStrategy::Integer),
        (Int, Float) | (Float, Int) | (Float, Float) => Ok(ComparisonStrategy::Numeric),
        (Char, Char) | (Char, Int) | (Int, Char) | (Char, Float) | (Float, Char) => {
            Ok(ComparisonStrategy::Ordinal)
        }
        (String, String) => Ok(ComparisonStrategy::Text),
        (String, other) | (other, String) => Err(Error::invalid_operation(format!(
            "cannot compare string with {other}"
        ))),
    }
}

/// Result type of an arithmetic operator. `Add` promotes a `Char` next to
/// a `String` to `String`; every other operator needs matching operands.
pub fn arithmetic_type(op: BinaryOp, lhs: ValueType, rhs: ValueType) -> Result<ValueType> {
    if op.is_comparison() {
        return Ok(ValueType::Int);
    }

    let ty = match (op, lhs, rhs) {
        (_, lhs, rhs) if lhs == rhs => lhs,
        (BinaryOp::Add, ValueType::String, ValueType::Char)
        | (BinaryOp::Add, ValueType::Char, ValueType::String) => ValueType::String,
        (_, lhs, rhs) => {
            return Err(Error::invalid_operation(format!(
                "'{op}' between {lhs} and {rhs}"
            )));
        }
    };

    if ty == ValueType::String && op != BinaryOp::Add {
        return Err(Error::invalid_operation(format!("'{op}' on strings")));
    }

    Ok(ty)
}

impl<I: Io> Evaluator<'_, I> {
    /// Infers the type of the expression at `node`, memoized per node for
    /// the lifetime of the evaluator.
    pub fn determine_expr_type(&mut self, node: NodeId) -> Result<ValueType> {
        if let Some(ty) = self.type_cache.get(&node) {
            return Ok(*ty);
        }

        let ty = match codec::read_expression(self.ctr, node)? {
            ExprNode::Variable { name } => {
                let name = codec::decode_string(self.ctr, name)?;
                match self.vars.get(&name) {
                    Some(var) => var.ty,
                    None => return Err(Error::UndeclaredVariable(name)),
                }
            }

            ExprNode::Literal { ty, .. } => ty,

            ExprNode::Binary { op, .. } if op.is_comparison() => ValueType::Int,

            ExprNode::Binary { op, lhs, rhs } => {
                let lhs = self.determine_expr_type(lhs)?;
                let rhs = self.determine_expr_type(rhs)?;
                arithmetic_type(op, lhs, rhs)?
            }
        };

        self.type_cache.insert(node, ty);
        Ok(ty)
    }
}
