use crate::{
    ast::{Command, Expression},
    codec::{self, CommandNode, ExprNode},
    ctr::{Ctr, NodeId},
    error::Result,
};

/// Reads the command list under `root` back into syntax trees.
pub fn decode_program(ctr: &Ctr, root: NodeId) -> Result<Vec<Command>> {
    ctr.children_of(root)
        .iter()
        .map(|&command| decode_command(ctr, command))
        .collect()
}

pub fn decode_command(ctr: &Ctr, node: NodeId) -> Result<Command> {
    Ok(match codec::read_command(ctr, node)? {
        CommandNode::If { cond, body } => Command::If {
            cond: decode_expression(ctr, cond)?,
            body: decode_program(ctr, body)?,
        },
        CommandNode::While { cond, body } => Command::While {
            cond: decode_expression(ctr, cond)?,
            body: decode_program(ctr, body)?,
        },
        CommandNode::Declare { ty, name } => Command::Declare {
            ty,
            name: codec::decode_string(ctr, name)?,
        },
        CommandNode::Let { name, value } => Command::Let {
            name: codec::decode_string(ctr, name)?,
            value: decode_expression(ctr, value)?,
        },
        CommandNode::Print { expr } => Command::Print(decode_expression(ctr, expr)?),
        CommandNode::Input { name } => Command::Input(codec::decode_string(ctr, name)?),
    })
}

pub fn decode_expression(ctr: &Ctr, node: NodeId) -> Result<Expression> {
    Ok(match codec::read_expression(ctr, node)? {
        ExprNode::Variable { name } => Expression::Variable(codec::decode_string(ctr, name)?),
        ExprNode::Binary { op, lhs, rhs } => Expression::binary(
            op,
            decode_expression(ctr, lhs)?,
            decode_expression(ctr, rhs)?,
        ),
        ExprNode::Literal { ty, value } => {
            Expression::Literal(codec::read_literal(ctr, ty, value)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Literal, ValueType},
        encoder::encode,
        error::Error,
    };

    #[test]
    fn every_construct_survives_encoding() {
        let program = vec![
            Command::declare(ValueType::Int, "count"),
            Command::declare(ValueType::String, "ünï"),
            Command::Input("count".into()),
            Command::While {
                cond: Expression::less_than(
                    Expression::variable("count"),
                    Expression::int(4_294_967_295).unwrap(),
                ),
                body: vec![
                    Command::If {
                        cond: Expression::equal_to(
                            Expression::float(-0.25),
                            Expression::char('z'),
                        ),
                        body: vec![Command::Print(Expression::string("a\nb"))],
                    },
                    Command::assign(
                        "count",
                        Expression::divide(
                            Expression::multiply(
                                Expression::variable("count"),
                                Expression::int(-2_147_483_647).unwrap(),
                            ),
                            Expression::subtract(
                                Expression::int(3).unwrap(),
                                Expression::greater_than(
                                    Expression::int(0).unwrap(),
                                    Expression::int(1).unwrap(),
                                ),
                            ),
                        ),
                    ),
                ],
            },
        ];

        let (ctr, root) = encode(&program);
        assert_eq!(decode_program(&ctr, root).unwrap(), program);
    }

    #[test]
    fn char_is_truncated_to_a_byte() {
        let program = vec![Command::Print(Expression::char('\u{263a}'))];
        let (ctr, root) = encode(&program);
        assert_eq!(
            decode_program(&ctr, root).unwrap(),
            vec![Command::Print(Expression::Literal(Literal::Char('\u{3a}')))]
        );
    }

    #[test]
    fn corrupted_tag_is_malformed() {
        let (mut ctr, root) = encode(&[Command::Input("x".into())]);
        let command = ctr.children_of(root)[0];
        let tag = ctr.children_of(command)[0];
        // 6 children is past the last command tag
        ctr.push_child(tag);
        assert!(matches!(
            decode_program(&ctr, root),
            Err(Error::MalformedCtr(_))
        ));
    }

    #[test]
    fn wrong_arity_is_malformed() {
        let (mut ctr, root) = encode(&[Command::Print(Expression::int(1).unwrap())]);
        let command = ctr.children_of(root)[0];
        ctr.push_child(command);
        assert!(matches!(
            decode_program(&ctr, root),
            Err(Error::MalformedCtr(_))
        ));
    }
}
