use log::debug;

use crate::{
    ast::{Command, Expression, Literal},
    codec::{self, CommandTag, ExprTag},
    ctr::{Ctr, NodeId},
};

/// Lowers a program into a fresh tree and returns it with its root, whose
/// children are the top-level commands.
pub fn encode(program: &[Command]) -> (Ctr, NodeId) {
    let mut ctr = Ctr::new();
    let root = ctr.new_node();
    encode_commands(&mut ctr, root, program);
    debug!(
        "encoded {} commands into {} nodes",
        program.len(),
        ctr.len()
    );
    (ctr, root)
}

pub fn encode_commands(ctr: &mut Ctr, dest: NodeId, commands: &[Command]) {
    for command in commands {
        encode_command(ctr, dest, command);
    }
}

/// Appends one command node to `dest`:
/// `[tag, payload, second payload]`.
pub fn encode_command(ctr: &mut Ctr, dest: NodeId, command: &Command) {
    let node = ctr.push_child(dest);
    let tag = ctr.push_child(node);
    let first = ctr.push_child(node);

    match command {
        Command::If { cond, body } | Command::While { cond, body } => {
            let kind = if matches!(command, Command::If { .. }) {
                CommandTag::If
            } else {
                CommandTag::While
            };
            codec::encode_count(ctr, tag, kind as usize);
            let second = ctr.push_child(node);
            encode_expression(ctr, first, cond);
            encode_commands(ctr, second, body);
        }

        Command::Declare { ty, name } => {
            codec::encode_count(ctr, tag, CommandTag::Declare as usize);
            let second = ctr.push_child(node);
            codec::encode_count(ctr, first, *ty as usize);
            codec::encode_string(ctr, second, name);
        }

        Command::Let { name, value } => {
            codec::encode_count(ctr, tag, CommandTag::Let as usize);
            let second = ctr.push_child(node);
            codec::encode_string(ctr, first, name);
            encode_expression(ctr, second, value);
        }

        Command::Print(expr) => {
            codec::encode_count(ctr, tag, CommandTag::Print as usize);
            encode_expression(ctr, first, expr);
        }

        Command::Input(name) => {
            codec::encode_count(ctr, tag, CommandTag::Input as usize);
            codec::encode_string(ctr, first, name);
        }
    }
}

/// Fills `node` with `[tag, payload, second payload]`.
pub fn encode_expression(ctr: &mut Ctr, node: NodeId, expr: &Expression) {
    let tag = ctr.push_child(node);
    let first = ctr.push_child(node);

    match expr {
        Expression::Variable(name) => {
            codec::encode_count(ctr, tag, ExprTag::Variable as usize);
            codec::encode_string(ctr, first, name);
        }

        Expression::Binary { op, lhs, rhs } => {
            codec::encode_count(ctr, tag, ExprTag::from(*op) as usize);
            let second = ctr.push_child(node);
            encode_expression(ctr, first, lhs);
            encode_expression(ctr, second, rhs);
        }

        Expression::Literal(literal) => {
            codec::encode_count(ctr, tag, ExprTag::Literal as usize);
            codec::encode_count(ctr, first, literal.value_type() as usize);
            let value = ctr.push_child(node);
            encode_literal(ctr, value, literal);
        }
    }
}

fn encode_literal(ctr: &mut Ctr, dest: NodeId, literal: &Literal) {
    match literal {
        Literal::Int(bits) => codec::encode_int(ctr, dest, *bits),
        Literal::Float(value) => codec::encode_float(ctr, dest, *value),
        Literal::String(value) => codec::encode_string(ctr, dest, value),
        Literal::Char(value) => codec::encode_char(ctr, dest, *value),
    }
}
