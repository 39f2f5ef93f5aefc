use core::fmt;
use std::io::{self, BufRead, Write};

use fxhash::FxHashMap;
use log::{debug, trace};

use crate::{
    ast::{BinaryOp, Literal, ValueType},
    codec::{self, CommandNode, ExprNode},
    ctr::{Ctr, NodeId},
    error::{Error, Result},
};

/// Line-oriented I/O used by `print` and `input`.
pub trait Io {
    /// Reads one line without its line terminator.
    fn read_line(&mut self) -> io::Result<String>;

    fn write(&mut self, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// [`Io`] over any buffered reader and writer.
#[derive(Debug)]
pub struct StreamIo<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamIo<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Io for StreamIo<R, W> {
    fn read_line(&mut self) -> io::Result<String> {
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input exhausted",
            ));
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    String(String),
    Char(char),
}

impl Value {
    pub fn zero(ty: ValueType) -> Self {
        match ty {
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::Char => Value::Char('\0'),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Char(_) => ValueType::Char,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Char(c) => *c != '\0',
        }
    }

    /// Converts a value whose run-time type drifted from `ty` (after a
    /// `Let` of another type) back to `ty`.
    pub fn coerce(self, ty: ValueType) -> Result<Self> {
        if self.value_type() == ty {
            return Ok(self);
        }
        match (self, ty) {
            (Value::Float(n), ValueType::Int) => Ok(Value::Int(n as i32)),
            (Value::Char(c), ValueType::Int) => Ok(Value::Int(u32::from(c) as i32)),
            (Value::Int(n), ValueType::Float) => Ok(Value::Float(n as f32)),
            (Value::Char(c), ValueType::Float) => Ok(Value::Float(u32::from(c) as f32)),
            (Value::Int(n), ValueType::Char) => Ok(Value::Char(char::from(n as u8))),
            (Value::Char(c), ValueType::String) => Ok(Value::String(c.to_string())),
            (value @ (Value::Int(_) | Value::Float(_)), ValueType::String) => {
                Ok(Value::String(value.to_string()))
            }
            (value, ty) => Err(Error::invalid_operation(format!(
                "cannot use {} value as {ty}",
                value.value_type()
            ))),
        }
    }

    pub(crate) fn as_f64(&self) -> f64 {
        match self {
            Value::Int(n) => f64::from(*n),
            Value::Float(n) => f64::from(*n),
            Value::Char(c) => f64::from(u32::from(*c)),
            Value::String(_) => f64::NAN,
        }
    }

    pub(crate) fn ordinal(&self) -> u8 {
        match self {
            Value::Char(c) => (u32::from(*c) & 0xff) as u8,
            _ => 0,
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(bits) => Value::Int(bits as i32),
            Literal::Float(n) => Value::Float(n),
            Literal::String(s) => Value::String(s),
            Literal::Char(c) => Value::Char(c),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Char(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub ty: ValueType,
    pub value: Value,
}

/// Executes a tree directly. One instance serves one execution: its caches
/// are keyed by node and assume a single variable table.
pub struct Evaluator<'a, I: Io> {
    pub(crate) ctr: &'a Ctr,
    io: I,
    pub(crate) vars: FxHashMap<String, Variable>,
    pub(crate) type_cache: FxHashMap<NodeId, ValueType>,
    value_cache: FxHashMap<NodeId, Value>,
    literal_cache: FxHashMap<NodeId, bool>,
}

impl<'a, I: Io> Evaluator<'a, I> {
    pub fn new(ctr: &'a Ctr, io: I) -> Self {
        Self {
            ctr,
            io,
            vars: FxHashMap::default(),
            type_cache: FxHashMap::default(),
            value_cache: FxHashMap::default(),
            literal_cache: FxHashMap::default(),
        }
    }

    /// Runs the command list under `root`. Output already written stays
    /// written when a command fails.
    pub fn run(&mut self, root: NodeId) -> Result<()> {
        let result = self.execute_commands(root);
        self.io.flush()?;
        result
    }

    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|var| &var.value)
    }

    pub fn into_io(self) -> I {
        self.io
    }

    fn execute_commands(&mut self, commands: NodeId) -> Result<()> {
        let ctr = self.ctr;
        for &command in ctr.children_of(commands) {
            self.execute_command(command)?;
        }
        Ok(())
    }

    fn execute_command(&mut self, node: NodeId) -> Result<()> {
        match codec::read_command(self.ctr, node)? {
            CommandNode::If { cond, body } => {
                if self.eval_expression(cond)?.is_truthy() {
                    self.execute_commands(body)?;
                }
            }

            CommandNode::While { cond, body } => {
                while self.eval_expression(cond)?.is_truthy() {
                    self.execute_commands(body)?;
                }
            }

            CommandNode::Declare { ty, name } => {
                let name = codec::decode_string(self.ctr, name)?;
                if self.vars.contains_key(&name) {
                    return Err(Error::DuplicateDeclaration(name));
                }
                debug!("declare {ty} {name}");
                self.vars.insert(
                    name,
                    Variable {
                        ty,
                        value: Value::zero(ty),
                    },
                );
            }

            CommandNode::Let { name, value } => {
                let name = codec::decode_string(self.ctr, name)?;
                if !self.vars.contains_key(&name) {
                    return Err(Error::UndeclaredVariable(name));
                }
                let value = self.eval_expression(value)?;
                if let Some(var) = self.vars.get_mut(&name) {
                    var.value = value;
                }
            }

            CommandNode::Print { expr } => {
                let value = self.eval_expression(expr)?;
                self.io.write(&value.to_string())?;
            }

            CommandNode::Input { name } => {
                let name = codec::decode_string(self.ctr, name)?;
                let ty = match self.vars.get(&name) {
                    Some(var) => var.ty,
                    None => return Err(Error::UndeclaredVariable(name)),
                };
                let line = self.io.read_line()?;
                let value = parse_input(&line, ty)?;
                if let Some(var) = self.vars.get_mut(&name) {
                    var.value = value;
                }
            }
        }

        Ok(())
    }

    pub fn eval_expression(&mut self, node: NodeId) -> Result<Value> {
        if let Some(value) = self.value_cache.get(&node) {
            trace!("value cache hit for {node}");
            return Ok(value.clone());
        }

        match codec::read_expression(self.ctr, node)? {
            ExprNode::Variable { name } => {
                let name = codec::decode_string(self.ctr, name)?;
                match self.vars.get(&name) {
                    Some(var) => Ok(var.value.clone()),
                    None => Err(Error::UndeclaredVariable(name)),
                }
            }

            ExprNode::Literal { ty, value } => {
                let value = Value::from(codec::read_literal(self.ctr, ty, value)?);
                self.value_cache.insert(node, value.clone());
                Ok(value)
            }

            ExprNode::Binary { op, lhs, rhs } => {
                let value = if op.is_comparison() {
                    self.eval_comparison(op, lhs, rhs)?
                } else {
                    self.eval_arithmetic(node, op, lhs, rhs)?
                };

                if self.is_literal_only(lhs)? && self.is_literal_only(rhs)? {
                    self.value_cache.insert(node, value.clone());
                }

                Ok(value)
            }
        }
    }

    /// Whether the subtree at `node` is built from literals alone, judged
    /// from the tags in the tree. Memoized per node.
    fn is_literal_only(&mut self, node: NodeId) -> Result<bool> {
        if let Some(&literal) = self.literal_cache.get(&node) {
            return Ok(literal);
        }

        let literal = match codec::read_expression(self.ctr, node)? {
            ExprNode::Literal { .. } => true,
            ExprNode::Variable { .. } => false,
            ExprNode::Binary { lhs, rhs, .. } => {
                self.is_literal_only(lhs)? && self.is_literal_only(rhs)?
            }
        };

        self.literal_cache.insert(node, literal);
        Ok(literal)
    }

    fn eval_operand(&mut self, node: NodeId) -> Result<(Value, ValueType)> {
        let ty = self.determine_expr_type(node)?;
        let value = self.eval_expression(node)?.coerce(ty)?;
        Ok((value, ty))
    }

    fn eval_arithmetic(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<Value> {
        let ty = self.determine_expr_type(node)?;
        let lhs = self.eval_expression(lhs)?.coerce(ty)?;
        let rhs = self.eval_expression(rhs)?.coerce(ty)?;

        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => match op {
                BinaryOp::Add => Ok(Value::Int(a.wrapping_add(b))),
                BinaryOp::Subtract => Ok(Value::Int(a.wrapping_sub(b))),
                BinaryOp::Multiply => Ok(Value::Int(a.wrapping_mul(b))),
                _ => floor_div(a, b).map(Value::Int),
            },

            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            })),

            (Value::String(mut a), Value::String(b)) if op == BinaryOp::Add => {
                a.push_str(&b);
                Ok(Value::String(a))
            }

            (a @ Value::Char(_), b @ Value::Char(_)) => {
                let (a, b) = (a.ordinal(), b.ordinal());
                let byte = match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Subtract => a.wrapping_sub(b),
                    BinaryOp::Multiply => a.wrapping_mul(b),
                    _ => a.checked_div(b).ok_or(Error::DivisionByZero)?,
                };
                Ok(Value::Char(char::from(byte)))
            }

            (a, _) => Err(Error::invalid_operation(format!(
                "'{op}' is not defined for {}",
                a.value_type()
            ))),
        }
    }

    fn eval_comparison(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<Value> {
        let (lhs, lhs_ty) = self.eval_operand(lhs)?;
        let (rhs, rhs_ty) = self.eval_operand(rhs)?;
        let strategy = crate::type_system::comparison_strategy(lhs_ty, rhs_ty)?;
        let ordering = strategy.compare(&lhs, &rhs);

        let holds = match op {
            BinaryOp::EqualTo => ordering == Some(std::cmp::Ordering::Equal),
            BinaryOp::LessThan => ordering == Some(std::cmp::Ordering::Less),
            _ => ordering == Some(std::cmp::Ordering::Greater),
        };
        Ok(Value::Int(i32::from(holds)))
    }
}

/// Integer division rounding toward negative infinity, on wrapped 32-bit
/// operands.
fn floor_div(a: i32, b: i32) -> Result<i32> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    let quotient = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn parse_input(line: &str, ty: ValueType) -> Result<Value> {
    let invalid = || Error::InvalidInput(line.to_string(), ty);
    match ty {
        ValueType::Int => line.trim().parse().map(Value::Int).map_err(|_| invalid()),
        ValueType::Float => line.trim().parse().map(Value::Float).map_err(|_| invalid()),
        ValueType::String => Ok(Value::String(line.to_string())),
        ValueType::Char => line.chars().next().map(Value::Char).ok_or_else(invalid),
    }
}

/// Executes the program under `root` with a fresh evaluator.
pub fn execute<I: Io>(ctr: &Ctr, root: NodeId, io: I) -> Result<I> {
    let mut evaluator = Evaluator::new(ctr, io);
    evaluator.run(root)?;
    Ok(evaluator.into_io())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_literal_subtrees_are_cached() {
        let (ctr, root) = crate::compile("int i\ni = 4\nprint((1 + 2) * 3 + i)\n").unwrap();
        let mut evaluator = Evaluator::new(&ctr, StreamIo::new("".as_bytes(), Vec::new()));
        evaluator.run(root).unwrap();

        let print = ctr.children_of(root)[2];
        let sum = ctr.children_of(print)[1];
        let product = ctr.children_of(sum)[1];
        let variable = ctr.children_of(sum)[2];
        let parenthesized = ctr.children_of(product)[1];

        assert_eq!(evaluator.value_cache.get(&parenthesized), Some(&Value::Int(3)));
        assert_eq!(evaluator.value_cache.get(&product), Some(&Value::Int(9)));
        assert!(!evaluator.value_cache.contains_key(&sum));
        assert!(!evaluator.value_cache.contains_key(&variable));

        assert_eq!(evaluator.literal_cache.get(&product), Some(&true));
        assert_eq!(evaluator.literal_cache.get(&variable), Some(&false));

        let (_, output) = evaluator.into_io().into_parts();
        assert_eq!(output, b"13");
    }

    #[test]
    fn floor_division() {
        assert_eq!(floor_div(7, 2).unwrap(), 3);
        assert_eq!(floor_div(-7, 2).unwrap(), -4);
        assert_eq!(floor_div(7, -2).unwrap(), -4);
        assert_eq!(floor_div(-8, 2).unwrap(), -4);
        assert_eq!(floor_div(i32::MIN, -1).unwrap(), i32::MIN);
        assert!(matches!(floor_div(1, 0), Err(Error::DivisionByZero)));
    }

    #[test]
    fn input_conversion() {
        assert_eq!(parse_input(" 42 ", ValueType::Int).unwrap(), Value::Int(42));
        assert_eq!(parse_input("2.5", ValueType::Float).unwrap(), Value::Float(2.5));
        assert_eq!(parse_input("xyz", ValueType::Char).unwrap(), Value::Char('x'));
        assert_eq!(
            parse_input(" a b ", ValueType::String).unwrap(),
            Value::String(" a b ".into())
        );
        assert!(matches!(
            parse_input("4x", ValueType::Int),
            Err(Error::InvalidInput(_, ValueType::Int))
        ));
        assert!(parse_input("", ValueType::Char).is_err());
    }

    #[test]
    fn float_display_keeps_fraction() {
        assert_eq!(Value::Float(4.0).to_string(), "4.0");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Char('a').to_string(), "a");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::zero(ValueType::Char).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
    }

    #[test]
    fn stream_io_strips_line_endings() {
        let mut io = StreamIo::new("one\r\ntwo\n".as_bytes(), Vec::new());
        assert_eq!(io.read_line().unwrap(), "one");
        assert_eq!(io.read_line().unwrap(), "two");
        assert_eq!(
            io.read_line().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
