//! Count-as-value primitives shared by the encoder and every reader.
//!
//! A value `v` at a position is a node with `v` empty children. A nibble
//! is a node with four bit slots, most significant first, each holding
//! zero or one child.

use crate::{
    ast::{BinaryOp, Literal, ValueType},
    ctr::{Ctr, NodeId},
    error::{Error, Result},
};

const fn nibble_slots() -> [[bool; 4]; 16] {
    let mut table = [[false; 4]; 16];
    let mut value = 0;
    while value < 16 {
        let mut bit = 0;
        while bit < 4 {
            table[value][bit] = (value >> (3 - bit)) & 1 == 1;
            bit += 1;
        }
        value += 1;
    }
    table
}

/// Bit-slot occupancy for every nibble value.
pub const NIBBLE_SLOTS: [[bool; 4]; 16] = nibble_slots();

pub const INT_NIBBLES: usize = 8;
pub const FLOAT_NIBBLES: usize = 8;
pub const BYTE_NIBBLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    If = 0,
    While = 1,
    Declare = 2,
    Let = 3,
    Print = 4,
    Input = 5,
}

impl CommandTag {
    /// Children a command node with this tag must have.
    pub fn arity(self) -> usize {
        match self {
            CommandTag::Print | CommandTag::Input => 2,
            _ => 3,
        }
    }
}

impl TryFrom<usize> for CommandTag {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self> {
        match count {
            0 => Ok(CommandTag::If),
            1 => Ok(CommandTag::While),
            2 => Ok(CommandTag::Declare),
            3 => Ok(CommandTag::Let),
            4 => Ok(CommandTag::Print),
            5 => Ok(CommandTag::Input),
            _ => Err(Error::malformed(format!("invalid command tag {count}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprTag {
    Variable = 0,
    Add = 1,
    Subtract = 2,
    Multiply = 3,
    Divide = 4,
    Literal = 5,
    EqualTo = 6,
    GreaterThan = 7,
    LessThan = 8,
}

impl ExprTag {
    pub fn arity(self) -> usize {
        match self {
            ExprTag::Variable => 2,
            _ => 3,
        }
    }

    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            ExprTag::Add => Some(BinaryOp::Add),
            ExprTag::Subtract => Some(BinaryOp::Subtract),
            ExprTag::Multiply => Some(BinaryOp::Multiply),
            ExprTag::Divide => Some(BinaryOp::Divide),
            ExprTag::EqualTo => Some(BinaryOp::EqualTo),
            ExprTag::GreaterThan => Some(BinaryOp::GreaterThan),
            ExprTag::LessThan => Some(BinaryOp::LessThan),
            ExprTag::Variable | ExprTag::Literal => None,
        }
    }
}

impl From<BinaryOp> for ExprTag {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => ExprTag::Add,
            BinaryOp::Subtract => ExprTag::Subtract,
            BinaryOp::Multiply => ExprTag::Multiply,
            BinaryOp::Divide => ExprTag::Divide,
            BinaryOp::EqualTo => ExprTag::EqualTo,
            BinaryOp::GreaterThan => ExprTag::GreaterThan,
            BinaryOp::LessThan => ExprTag::LessThan,
        }
    }
}

impl TryFrom<usize> for ExprTag {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self> {
        match count {
            0 => Ok(ExprTag::Variable),
            1 => Ok(ExprTag::Add),
            2 => Ok(ExprTag::Subtract),
            3 => Ok(ExprTag::Multiply),
            4 => Ok(ExprTag::Divide),
            5 => Ok(ExprTag::Literal),
            6 => Ok(ExprTag::EqualTo),
            7 => Ok(ExprTag::GreaterThan),
            8 => Ok(ExprTag::LessThan),
            _ => Err(Error::malformed(format!("invalid expression tag {count}"))),
        }
    }
}

impl TryFrom<usize> for ValueType {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self> {
        match count {
            0 => Ok(ValueType::Int),
            1 => Ok(ValueType::Float),
            2 => Ok(ValueType::String),
            3 => Ok(ValueType::Char),
            _ => Err(Error::malformed(format!("invalid type tag {count}"))),
        }
    }
}

pub fn encode_count(ctr: &mut Ctr, dest: NodeId, count: usize) {
    for _ in 0..count {
        ctr.push_child(dest);
    }
}

pub fn decode_count(ctr: &Ctr, node: NodeId) -> usize {
    ctr.child_count(node)
}

/// Reads a node's children, failing unless there are exactly `arity`.
pub fn expect_children<'a>(
    ctr: &'a Ctr,
    node: NodeId,
    arity: usize,
    what: &str,
) -> Result<&'a [NodeId]> {
    let children = ctr.children_of(node);
    if children.len() != arity {
        return Err(Error::malformed(format!(
            "{what} node {node} has {} children, expected {arity}",
            children.len()
        )));
    }
    Ok(children)
}

pub fn encode_nibble(ctr: &mut Ctr, dest: NodeId, value: u8) {
    let nibble = ctr.push_child(dest);
    for &set in &NIBBLE_SLOTS[usize::from(value & 0xf)] {
        let slot = ctr.push_child(nibble);
        if set {
            ctr.push_child(slot);
        }
    }
}

pub fn decode_nibble(ctr: &Ctr, node: NodeId) -> Result<u8> {
    let slots = expect_children(ctr, node, 4, "nibble")?;
    let mut nibble = 0;
    for (i, &slot) in slots.iter().enumerate() {
        let bit = decode_count(ctr, slot);
        if bit > 1 {
            return Err(Error::malformed(format!("bit slot {slot} holds {bit}")));
        }
        nibble |= (bit as u8) << (3 - i);
    }
    Ok(nibble)
}

/// Appends the high and low nibble of `byte` to `dest`.
pub fn encode_byte(ctr: &mut Ctr, dest: NodeId, byte: u8) {
    encode_nibble(ctr, dest, byte >> 4);
    encode_nibble(ctr, dest, byte & 0xf);
}

/// Reads a byte from a node holding exactly two nibbles.
pub fn decode_byte(ctr: &Ctr, node: NodeId) -> Result<u8> {
    let nibbles = expect_children(ctr, node, BYTE_NIBBLES, "byte")?;
    Ok((decode_nibble(ctr, nibbles[0])? << 4) | decode_nibble(ctr, nibbles[1])?)
}

fn decode_nibbles(ctr: &Ctr, node: NodeId, count: usize, what: &str) -> Result<u32> {
    let nibbles = expect_children(ctr, node, count, what)?;
    let mut value = 0u32;
    for &nibble in nibbles {
        value = (value << 4) | u32::from(decode_nibble(ctr, nibble)?);
    }
    Ok(value)
}

pub fn encode_int(ctr: &mut Ctr, dest: NodeId, bits: u32) {
    for i in 0..INT_NIBBLES {
        let shift = 28 - i * 4;
        encode_nibble(ctr, dest, ((bits >> shift) & 0xf) as u8);
    }
}

/// Reads eight nibbles as a 32-bit two's-complement integer.
pub fn decode_int(ctr: &Ctr, node: NodeId) -> Result<i32> {
    decode_nibbles(ctr, node, INT_NIBBLES, "int").map(|bits| bits as i32)
}

/// Writes the four little-endian bytes of `value` in reverse order
/// (byte 3 first), two nibbles per byte.
pub fn encode_float(ctr: &mut Ctr, dest: NodeId, value: f32) {
    for &byte in value.to_le_bytes().iter().rev() {
        encode_byte(ctr, dest, byte);
    }
}

pub fn decode_float(ctr: &Ctr, node: NodeId) -> Result<f32> {
    let nibbles = expect_children(ctr, node, FLOAT_NIBBLES, "float")?;
    let mut bytes = [0u8; 4];
    for (i, pair) in nibbles.chunks(BYTE_NIBBLES).enumerate() {
        bytes[3 - i] = (decode_nibble(ctr, pair[0])? << 4) | decode_nibble(ctr, pair[1])?;
    }
    Ok(f32::from_le_bytes(bytes))
}

/// Appends one byte node per UTF-8 byte of `value`.
pub fn encode_string(ctr: &mut Ctr, dest: NodeId, value: &str) {
    for &byte in value.as_bytes() {
        let byte_node = ctr.push_child(dest);
        encode_byte(ctr, byte_node, byte);
    }
}

pub fn decode_bytes(ctr: &Ctr, node: NodeId) -> Result<Vec<u8>> {
    ctr.children_of(node)
        .iter()
        .map(|&byte| decode_byte(ctr, byte))
        .collect()
}

pub fn decode_string(ctr: &Ctr, node: NodeId) -> Result<String> {
    String::from_utf8(decode_bytes(ctr, node)?).map_err(|_| Error::InvalidEncoding)
}

/// Keeps only the low eight bits of the scalar.
pub fn encode_char(ctr: &mut Ctr, dest: NodeId, value: char) {
    encode_byte(ctr, dest, (u32::from(value) & 0xff) as u8);
}

pub fn decode_char(ctr: &Ctr, node: NodeId) -> Result<char> {
    decode_byte(ctr, node).map(char::from)
}

pub fn decode_type(ctr: &Ctr, node: NodeId) -> Result<ValueType> {
    ValueType::try_from(decode_count(ctr, node))
}

/// A command node with its tag decoded and arity checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandNode {
    If { cond: NodeId, body: NodeId },
    While { cond: NodeId, body: NodeId },
    Declare { ty: ValueType, name: NodeId },
    Let { name: NodeId, value: NodeId },
    Print { expr: NodeId },
    Input { name: NodeId },
}

pub fn read_command(ctr: &Ctr, node: NodeId) -> Result<CommandNode> {
    let Some(&tag) = ctr.children_of(node).first() else {
        return Err(Error::malformed(format!("command node {node} is empty")));
    };
    let tag = CommandTag::try_from(decode_count(ctr, tag))?;
    let c = expect_children(ctr, node, tag.arity(), "command")?;

    Ok(match tag {
        CommandTag::If => CommandNode::If {
            cond: c[1],
            body: c[2],
        },
        CommandTag::While => CommandNode::While {
            cond: c[1],
            body: c[2],
        },
        CommandTag::Declare => CommandNode::Declare {
            ty: decode_type(ctr, c[1])?,
            name: c[2],
        },
        CommandTag::Let => CommandNode::Let {
            name: c[1],
            value: c[2],
        },
        CommandTag::Print => CommandNode::Print { expr: c[1] },
        CommandTag::Input => CommandNode::Input { name: c[1] },
    })
}

/// An expression node with its tag decoded and arity checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprNode {
    Variable {
        name: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Literal {
        ty: ValueType,
        value: NodeId,
    },
}

pub fn read_expression(ctr: &Ctr, node: NodeId) -> Result<ExprNode> {
    let Some(&tag) = ctr.children_of(node).first() else {
        return Err(Error::malformed(format!("expression node {node} is empty")));
    };
    let tag = ExprTag::try_from(decode_count(ctr, tag))?;
    let c = expect_children(ctr, node, tag.arity(), "expression")?;

    Ok(match (tag, tag.binary_op()) {
        (_, Some(op)) => ExprNode::Binary {
            op,
            lhs: c[1],
            rhs: c[2],
        },
        (ExprTag::Literal, None) => ExprNode::Literal {
            ty: decode_type(ctr, c[1])?,
            value: c[2],
        },
        _ => ExprNode::Variable { name: c[1] },
    })
}

pub fn read_literal(ctr: &Ctr, ty: ValueType, node: NodeId) -> Result<Literal> {
    Ok(match ty {
        ValueType::Int => Literal::Int(decode_int(ctr, node)? as u32),
        ValueType::Float => Literal::Float(decode_float(ctr, node)?),
        ValueType::String => Literal::string_from_utf8(decode_bytes(ctr, node)?)
            .map_err(|_| Error::InvalidEncoding)?,
        ValueType::Char => Literal::Char(decode_char(ctr, node)?),
    })
}
