use crate::{
    ast::{BinaryOp, Command, Expression, Literal, ValueType},
    error::EncodingError,
    lexer::{self, Lexer, Token},
    span::{Span, Spanned},
};

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] lexer::Error),

    #[error("expected '{1}' but got '{2}'")]
    UnexpectedToken(Span, String, Token),

    #[error("expected an indentation of {1} spaces but got {2}")]
    UnexpectedIndent(Span, usize, usize),

    #[error("block must contain at least one command")]
    EmptyBlock(Span),

    #[error("{1}")]
    Literal(Span, EncodingError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Lexer(err) => err.span(),
            Error::UnexpectedToken(span, ..)
            | Error::UnexpectedIndent(span, ..)
            | Error::EmptyBlock(span)
            | Error::Literal(span, _) => *span,
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    token: Spanned<Token>,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token()?;
        Ok(Parser { lexer, token })
    }

    fn parse(&mut self) -> Result<Vec<Command>> {
        let commands = self.parse_block(0)?;
        if self.token.value != Token::Eof {
            return Err(self.unexpected("command"));
        }
        Ok(commands)
    }

    /// Parses every command indented by exactly `indent` spaces. A line
    /// indented by less ends the block.
    fn parse_block(&mut self, indent: usize) -> Result<Vec<Command>> {
        let mut commands = vec![];

        while let Token::Indent(n) = self.token.value {
            if n < indent {
                break;
            }
            if n > indent {
                return Err(Error::UnexpectedIndent(self.token.span, indent, n));
            }
            self.advance()?;
            commands.push(self.parse_command(indent)?);
        }

        Ok(commands)
    }

    fn parse_command(&mut self, indent: usize) -> Result<Command> {
        let span = self.token.span;
        match self.token.value.clone() {
            Token::If | Token::While => {
                let is_if = self.token.value == Token::If;
                self.advance()?;
                let cond = self.parse_expr(0)?;
                self.expect(Token::Colon)?;
                self.expect_end_of_line()?;
                let body = self.parse_block(indent + INDENT_WIDTH)?;
                if body.is_empty() {
                    return Err(Error::EmptyBlock(span.merge(&self.token.span)));
                }
                Ok(if is_if {
                    Command::If { cond, body }
                } else {
                    Command::While { cond, body }
                })
            }

            Token::Int | Token::FloatType | Token::CharType | Token::StringType => {
                let ty = match self.token.value {
                    Token::Int => ValueType::Int,
                    Token::FloatType => ValueType::Float,
                    Token::CharType => ValueType::Char,
                    _ => ValueType::String,
                };
                self.advance()?;
                let name = self.expect_identifier()?;
                self.expect_end_of_line()?;
                Ok(Command::Declare { ty, name })
            }

            Token::Identifier(name) => {
                self.advance()?;
                self.expect(Token::Equal)?;
                let value = self.parse_expr(0)?;
                self.expect_end_of_line()?;
                Ok(Command::Let { name, value })
            }

            Token::Print => {
                self.advance()?;
                self.expect(Token::ParenLeft)?;
                let expr = self.parse_expr(0)?;
                self.expect(Token::ParenRight)?;
                self.expect_end_of_line()?;
                Ok(Command::Print(expr))
            }

            Token::Input => {
                self.advance()?;
                self.expect(Token::ParenLeft)?;
                let name = self.expect_identifier()?;
                self.expect(Token::ParenRight)?;
                self.expect_end_of_line()?;
                Ok(Command::Input(name))
            }

            _ => Err(self.unexpected("command")),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.token.value != token {
            return Err(self.unexpected(&token.to_string()));
        }
        self.advance()
    }

    fn expect_identifier(&mut self) -> Result<String> {
        let Token::Identifier(id) = self.token.value.clone() else {
            return Err(self.unexpected("identifier"));
        };
        self.advance()?;
        Ok(id)
    }

    fn expect_end_of_line(&mut self) -> Result<()> {
        match self.token.value {
            Token::Newline => self.advance(),
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("newline")),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken(
            self.token.span,
            expected.to_string(),
            self.token.value.clone(),
        )
    }

    fn parse_literal(&mut self, negative: bool, start: Span) -> Result<Expression> {
        let span = start.merge(&self.token.span);
        let literal = match &self.token.value {
            Token::Integer(digits) => {
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| Error::Literal(span, EncodingError::IntOutOfRange(i64::MAX)))?;
                let value = if negative { -value } else { value };
                Literal::int(value).map_err(|err| Error::Literal(span, err))?
            }
            Token::Float(digits) => {
                let value = digits
                    .parse::<f32>()
                    .map_err(|_| self.unexpected("float literal"))?;
                Literal::float(if negative { -value } else { value })
            }
            _ => return Err(self.unexpected("number")),
        };
        self.advance()?;
        Ok(Expression::Literal(literal))
    }

    fn parse_atom(&mut self) -> Result<Expression> {
        match &self.token.value {
            Token::Integer(_) | Token::Float(_) => {
                let span = self.token.span;
                self.parse_literal(false, span)
            }

            Token::Hyphen => {
                let span = self.token.span;
                self.advance()?;
                self.parse_literal(true, span)
            }

            Token::String(val) => {
                let expr = Expression::string(val.clone());
                self.advance()?;
                Ok(expr)
            }

            Token::Char(val) => {
                let literal = Literal::char_from_str(val)
                    .map_err(|err| Error::Literal(self.token.span, err))?;
                self.advance()?;
                Ok(Expression::Literal(literal))
            }

            Token::Identifier(id) => {
                let expr = Expression::variable(id.clone());
                self.advance()?;
                Ok(expr)
            }

            Token::ParenLeft => {
                self.advance()?;
                let expr = self.parse_expr(0)?;
                self.expect(Token::ParenRight)?;
                Ok(expr)
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expression> {
        let mut lhs = self.parse_atom()?;

        while let Some(op) = binary_op(&self.token.value) {
            let (l_bp, r_bp) = op.precedence();
            if l_bp < min_bp {
                break;
            }

            self.advance()?;
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expression::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Hyphen => Some(BinaryOp::Subtract),
        Token::Star => Some(BinaryOp::Multiply),
        Token::Slash => Some(BinaryOp::Divide),
        Token::EqualEqual => Some(BinaryOp::EqualTo),
        Token::LessThan => Some(BinaryOp::LessThan),
        Token::GreaterThan => Some(BinaryOp::GreaterThan),
        _ => None,
    }
}

pub fn parse(input: &str) -> Result<Vec<Command>> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    fn int(value: i64) -> Expression {
        Expression::int(value).unwrap()
    }

    #[test]
    fn precedence_and_associativity() {
        let program = parse("x = 1 + 2 * 3 - 4 / 2 < 10 == 1\n").unwrap();
        let expected = Expression::equal_to(
            Expression::less_than(
                Expression::subtract(
                    Expression::add(int(1), Expression::multiply(int(2), int(3))),
                    Expression::divide(int(4), int(2)),
                ),
                int(10),
            ),
            int(1),
        );
        assert_eq!(program, vec![Command::assign("x", expected)]);
    }

    #[test]
    fn parentheses_override_precedence() {
        let program = parse("print((a + b) * c)").unwrap();
        assert_eq!(
            program,
            vec![Command::Print(Expression::multiply(
                Expression::add(var("a"), var("b")),
                var("c"),
            ))]
        );
    }

    #[test]
    fn negative_literals() {
        let program = parse("x = -5 - -2.5\n").unwrap();
        assert_eq!(
            program,
            vec![Command::assign(
                "x",
                Expression::subtract(int(-5), Expression::float(-2.5)),
            )]
        );
    }

    #[test]
    fn nested_blocks() {
        let source = "\
int i
while i < 3:
    if i == 1:
        print('x')
    i = i + 1
print(\"done\")
";
        let program = parse(source).unwrap();
        assert_eq!(
            program,
            vec![
                Command::declare(ValueType::Int, "i"),
                Command::While {
                    cond: Expression::less_than(var("i"), int(3)),
                    body: vec![
                        Command::If {
                            cond: Expression::equal_to(var("i"), int(1)),
                            body: vec![Command::Print(Expression::char('x'))],
                        },
                        Command::assign("i", Expression::add(var("i"), int(1))),
                    ],
                },
                Command::Print(Expression::string("done")),
            ]
        );
    }

    #[test]
    fn declarations_and_input() {
        let program = parse("float f\nchar c\nstring s\ninput(s)\n").unwrap();
        assert_eq!(
            program,
            vec![
                Command::declare(ValueType::Float, "f"),
                Command::declare(ValueType::Char, "c"),
                Command::declare(ValueType::String, "s"),
                Command::Input("s".into()),
            ]
        );
    }

    #[test]
    fn empty_block_is_rejected() {
        assert!(matches!(
            parse("if 1:\nprint(1)\n"),
            Err(Error::EmptyBlock(_))
        ));
    }

    #[test]
    fn over_indented_line_is_rejected() {
        assert!(matches!(
            parse("print(1)\n    print(2)\n"),
            Err(Error::UnexpectedIndent(_, 0, 4))
        ));
    }

    #[test]
    fn out_of_range_literal_is_rejected() {
        assert!(matches!(
            parse("x = -2147483648\n"),
            Err(Error::Literal(_, EncodingError::IntOutOfRange(-2147483648)))
        ));
        assert!(matches!(
            parse("x = 99999999999999999999\n"),
            Err(Error::Literal(..))
        ));
    }

    #[test]
    fn rendered_program_parses_back() {
        let source = "\
int x
x = 2147483648 - -7
while x > 'a':
    print(\"a\\tb\" + '\\n')
    x = x / 2
";
        let program = parse(source).unwrap();
        let rendered = Program(&program).to_string();
        assert_eq!(parse(&rendered).unwrap(), program);
    }

    #[test]
    fn char_literal_must_be_one_scalar() {
        assert_eq!(
            parse("print('\\t')\n").unwrap(),
            vec![Command::Print(Expression::char('\t'))]
        );
        assert!(matches!(
            parse("print('ab')\n"),
            Err(Error::Literal(_, EncodingError::CharLength(2)))
        ));
        assert!(matches!(
            parse("print('')\n"),
            Err(Error::Literal(_, EncodingError::CharLength(0)))
        ));
    }

    #[test]
    fn missing_paren_reports_expected_token() {
        let err = parse("print(1\n").unwrap_err();
        assert_eq!(err.to_string(), "expected ')' but got 'newline'");
    }
}
