//! A small imperative language compiled to a count-encoded tree, a tree in
//! which every value is the number of children of some node, and executed
//! straight from that tree.

pub mod ast;
pub mod codec;
pub mod ctr;
pub mod decode;
pub mod encoder;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod store;
pub mod type_system;

use ctr::{Ctr, NodeId};

/// Parses `source` and encodes it into a fresh tree.
pub fn compile(source: &str) -> Result<(Ctr, NodeId), parser::Error> {
    let program = parser::parse(source)?;
    Ok(encoder::encode(&program))
}
