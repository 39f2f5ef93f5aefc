use core::fmt;

use crate::error::EncodingError;

/// Value types of the language. The ordinal is the child count written
/// into the tree, so the discriminants must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int = 0,
    Float = 1,
    String = 2,
    Char = 3,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Char => write!(f, "char"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    EqualTo,
    LessThan,
    GreaterThan,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::EqualTo | BinaryOp::LessThan | BinaryOp::GreaterThan
        )
    }

    pub fn precedence(&self) -> (u8, u8) {
        match self {
            BinaryOp::EqualTo => (1, 2),
            BinaryOp::LessThan | BinaryOp::GreaterThan => (3, 4),
            BinaryOp::Add | BinaryOp::Subtract => (5, 6),
            BinaryOp::Multiply | BinaryOp::Divide => (7, 8),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Subtract => write!(f, "-"),
            BinaryOp::Multiply => write!(f, "*"),
            BinaryOp::Divide => write!(f, "/"),
            BinaryOp::EqualTo => write!(f, "=="),
            BinaryOp::LessThan => write!(f, "<"),
            BinaryOp::GreaterThan => write!(f, ">"),
        }
    }
}

/// A literal payload. Integers are kept as their 32-bit two's-complement
/// pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u32),
    Float(f32),
    String(String),
    Char(char),
}

impl Literal {
    pub const INT_MIN: i64 = -2_147_483_647;
    pub const INT_MAX: i64 = 0xffff_ffff;

    /// Negative values are folded into their two's-complement pattern, so
    /// `-2147483648` is never accepted.
    pub fn int(value: i64) -> Result<Self, EncodingError> {
        if !(Self::INT_MIN..=Self::INT_MAX).contains(&value) {
            return Err(EncodingError::IntOutOfRange(value));
        }
        let bits = if value < 0 {
            ((-value) as u32 ^ 0xffff_ffff).wrapping_add(1)
        } else {
            value as u32
        };
        Ok(Literal::Int(bits))
    }

    pub fn float(value: f32) -> Self {
        Literal::Float(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Literal::String(value.into())
    }

    pub fn string_from_utf8(bytes: Vec<u8>) -> Result<Self, EncodingError> {
        String::from_utf8(bytes)
            .map(Literal::String)
            .map_err(|_| EncodingError::InvalidUtf8)
    }

    pub fn char(value: char) -> Self {
        Literal::Char(value)
    }

    pub fn char_from_str(value: &str) -> Result<Self, EncodingError> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(Literal::Char(ch)),
            _ => Err(EncodingError::CharLength(value.chars().count())),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Literal::Int(_) => ValueType::Int,
            Literal::Float(_) => ValueType::Float,
            Literal::String(_) => ValueType::String,
            Literal::Char(_) => ValueType::Char,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // -2147483648 is outside the literal range, its pattern reads back unsigned
            Literal::Int(bits) if *bits as i32 == i32::MIN => write!(f, "{bits}"),
            Literal::Int(bits) => write!(f, "{}", *bits as i32),
            Literal::Float(val) if val.fract() == 0.0 && val.is_finite() => write!(f, "{val:.1}"),
            Literal::Float(val) => write!(f, "{val}"),
            Literal::String(val) => write!(f, "\"{}\"", escape(val, '"')),
            Literal::Char(val) => write!(f, "'{}'", escape(&val.to_string(), '\'')),
        }
    }
}

fn escape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Literal(Literal),
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn subtract(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::Subtract, lhs, rhs)
    }

    pub fn multiply(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::Multiply, lhs, rhs)
    }

    pub fn divide(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::Divide, lhs, rhs)
    }

    pub fn equal_to(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::EqualTo, lhs, rhs)
    }

    pub fn less_than(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::LessThan, lhs, rhs)
    }

    pub fn greater_than(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinaryOp::GreaterThan, lhs, rhs)
    }

    pub fn int(value: i64) -> Result<Self, EncodingError> {
        Literal::int(value).map(Expression::Literal)
    }

    pub fn float(value: f32) -> Self {
        Expression::Literal(Literal::float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::string(value))
    }

    pub fn char(value: char) -> Self {
        Expression::Literal(Literal::char(value))
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter, min_bp: u8) -> fmt::Result {
        match self {
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::Literal(lit) => write!(f, "{lit}"),
            Expression::Binary { op, lhs, rhs } => {
                let (l_bp, r_bp) = op.precedence();
                let parens = l_bp < min_bp;
                if parens {
                    write!(f, "(")?;
                }
                lhs.fmt_prec(f, l_bp)?;
                write!(f, " {op} ")?;
                rhs.fmt_prec(f, r_bp)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    If {
        cond: Expression,
        body: Vec<Command>,
    },
    While {
        cond: Expression,
        body: Vec<Command>,
    },
    Declare {
        ty: ValueType,
        name: String,
    },
    Let {
        name: String,
        value: Expression,
    },
    Print(Expression),
    Input(String),
}

impl Command {
    pub fn declare(ty: ValueType, name: impl Into<String>) -> Self {
        Command::Declare {
            ty,
            name: name.into(),
        }
    }

    pub fn assign(name: impl Into<String>, value: Expression) -> Self {
        Command::Let {
            name: name.into(),
            value,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        let indent = "    ".repeat(level);
        match self {
            Command::If { cond, body } | Command::While { cond, body } => {
                let keyword = if matches!(self, Command::If { .. }) {
                    "if"
                } else {
                    "while"
                };
                writeln!(f, "{indent}{keyword} {cond}:")?;
                for command in body {
                    command.fmt_indented(f, level + 1)?;
                }
                Ok(())
            }
            Command::Declare { ty, name } => writeln!(f, "{indent}{ty} {name}"),
            Command::Let { name, value } => writeln!(f, "{indent}{name} = {value}"),
            Command::Print(expr) => writeln!(f, "{indent}print({expr})"),
            Command::Input(name) => writeln!(f, "{indent}input({name})"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Renders a command list back to source text.
pub struct Program<'a>(pub &'a [Command]);

impl fmt::Display for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for command in self.0 {
            command.fmt_indented(f, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_int_folds_into_twos_complement() {
        assert_eq!(Literal::int(-1), Ok(Literal::Int(0xffff_ffff)));
        assert_eq!(Literal::int(-2_147_483_647), Ok(Literal::Int(0x8000_0001)));
        assert_eq!(Literal::int(0xffff_ffff), Ok(Literal::Int(0xffff_ffff)));
    }

    #[test]
    fn int_range_is_asymmetric() {
        assert_eq!(
            Literal::int(-2_147_483_648),
            Err(EncodingError::IntOutOfRange(-2_147_483_648))
        );
        assert!(Literal::int(0x1_0000_0000).is_err());
    }

    #[test]
    fn char_literal_requires_one_scalar() {
        assert_eq!(Literal::char_from_str("x"), Ok(Literal::Char('x')));
        assert_eq!(
            Literal::char_from_str("xy"),
            Err(EncodingError::CharLength(2))
        );
        assert_eq!(Literal::char_from_str(""), Err(EncodingError::CharLength(0)));
    }

    #[test]
    fn malformed_utf8_is_rejected() {
        assert_eq!(
            Literal::string_from_utf8(vec![0xff, 0xfe]),
            Err(EncodingError::InvalidUtf8)
        );
    }

    #[test]
    fn int_display_stays_in_literal_range() {
        assert_eq!(Literal::int(-5).unwrap().to_string(), "-5");
        assert_eq!(Literal::int(4_294_967_295).unwrap().to_string(), "-1");
        assert_eq!(Literal::int(2_147_483_648).unwrap().to_string(), "2147483648");
    }

    #[test]
    fn display_keeps_needed_parentheses() {
        let expr = Expression::multiply(
            Expression::add(Expression::variable("a"), Expression::variable("b")),
            Expression::variable("c"),
        );
        assert_eq!(expr.to_string(), "(a + b) * c");

        let expr = Expression::subtract(
            Expression::variable("a"),
            Expression::subtract(Expression::variable("b"), Expression::variable("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");
    }
}
