use std::fmt::{self, Display, Formatter};

use crate::span::{Position, Span, Spanned};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid token")]
    InvalidToken(Span),

    #[error("unterminated {0}")]
    Unterminated(String, Span),

    #[error("invalid escape char")]
    InvalidEscapeChar(Span),

    #[error("indentation must use spaces")]
    InvalidIndent(Span),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::InvalidToken(span)
            | Error::Unterminated(_, span)
            | Error::InvalidEscapeChar(span)
            | Error::InvalidIndent(span) => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    ParenLeft,
    ParenRight,
    Colon,
    Equal,
    EqualEqual,
    Plus,
    Hyphen,
    Star,
    Slash,
    LessThan,
    GreaterThan,

    Integer(String),
    Float(String),
    Char(String),
    String(String),
    Identifier(String),

    If,
    While,
    Print,
    Input,
    Int,
    FloatType,
    CharType,
    StringType,

    /// Leading spaces of a line that holds a command.
    Indent(usize),
    Newline,
    Eof,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::ParenLeft => write!(f, "("),
            Token::ParenRight => write!(f, ")"),
            Token::Colon => write!(f, ":"),
            Token::Equal => write!(f, "="),
            Token::EqualEqual => write!(f, "=="),
            Token::Plus => write!(f, "+"),
            Token::Hyphen => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LessThan => write!(f, "<"),
            Token::GreaterThan => write!(f, ">"),
            Token::Integer(val) => write!(f, "{val}"),
            Token::Float(val) => write!(f, "{val}"),
            Token::Char(val) => write!(f, "'{val}'"),
            Token::String(val) => write!(f, "\"{val}\""),
            Token::Identifier(val) => write!(f, "{val}"),
            Token::If => write!(f, "if"),
            Token::While => write!(f, "while"),
            Token::Print => write!(f, "print"),
            Token::Input => write!(f, "input"),
            Token::Int => write!(f, "int"),
            Token::FloatType => write!(f, "float"),
            Token::CharType => write!(f, "char"),
            Token::StringType => write!(f, "string"),
            Token::Indent(n) => write!(f, "indent of {n}"),
            Token::Newline => write!(f, "newline"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

const SYMBOLS: &[(&str, Token)] = &[
    ("==", Token::EqualEqual),
    ("(", Token::ParenLeft),
    (")", Token::ParenRight),
    (":", Token::Colon),
    ("=", Token::Equal),
    ("+", Token::Plus),
    ("-", Token::Hyphen),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("<", Token::LessThan),
    (">", Token::GreaterThan),
];

const KEYWORDS: &[(&str, Token)] = &[
    ("if", Token::If),
    ("while", Token::While),
    ("print", Token::Print),
    ("input", Token::Input),
    ("int", Token::Int),
    ("float", Token::FloatType),
    ("char", Token::CharType),
    ("string", Token::StringType),
];

#[derive(Debug)]
pub struct Lexer {
    buffer: String,
    index: usize,
    position: Position,
    at_line_start: bool,
}

impl Lexer {
    pub fn new(buffer: &str) -> Self {
        Self {
            buffer: buffer.to_string(),
            index: 0,
            position: Position {
                index: 0,
                line: 1,
                column: 1,
            },
            at_line_start: true,
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned<Token>> {
        if self.at_line_start {
            if let Some(indent) = self.next_indent()? {
                return Ok(indent);
            }
        }

        self.advance(self.slice_buffer_while(|c| c == ' ' || c == '\t').len());
        self.skip_comment();

        if self.remaining_buffer().is_empty() {
            return Ok(Spanned::new(
                Token::Eof,
                Span::new(self.position, self.position),
            ));
        }

        let current_char = self.current_char().unwrap_or_default();

        if current_char == '\n' || current_char == '\r' {
            let len = if self.remaining_buffer().starts_with("\r\n") {
                2
            } else {
                1
            };
            let span = self.advance_with_span(len);
            self.at_line_start = true;
            return Ok(Spanned::new(Token::Newline, span));
        }

        for symbol in SYMBOLS {
            if self.remaining_buffer().starts_with(symbol.0) {
                return Ok(Spanned::new(
                    symbol.1.clone(),
                    self.advance_with_span(symbol.0.len()),
                ));
            }
        }

        for keyword in KEYWORDS {
            if self.remaining_buffer().starts_with(keyword.0)
                && self
                    .remaining_buffer()
                    .strip_prefix(keyword.0)
                    .unwrap_or_default()
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric() && c != '_')
            {
                return Ok(Spanned::new(
                    keyword.1.clone(),
                    self.advance_with_span(keyword.0.len()),
                ));
            }
        }

        if current_char.is_ascii_digit() {
            let whole = self.slice_buffer_while(|c| c.is_ascii_digit()).len();
            let rest = &self.remaining_buffer()[whole..];
            if let Some(fraction) = rest.strip_prefix('.') {
                let digits = fraction.len()
                    - fraction.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                if digits > 0 {
                    let slice = self.remaining_buffer()[..whole + 1 + digits].to_string();
                    let span = self.advance_with_span(slice.len());
                    return Ok(Spanned::new(Token::Float(slice), span));
                }
            }
            let slice = self.remaining_buffer()[..whole].to_string();
            let span = self.advance_with_span(slice.len());
            return Ok(Spanned::new(Token::Integer(slice), span));
        }

        if current_char.is_alphabetic() || current_char == '_' {
            let slice = self
                .slice_buffer_while(|c| c.is_alphanumeric() || c == '_')
                .to_string();
            let span = self.advance_with_span(slice.chars().count());
            return Ok(Spanned::new(Token::Identifier(slice), span));
        }

        if current_char == '\'' {
            let slice = self
                .slice_buffer_between('\'')
                .ok_or(Error::Unterminated(
                    "char".into(),
                    Span::new(self.position, self.position),
                ))?
                .to_string();
            let value = self.unescape(&slice)?;
            let span = self.advance_with_span(slice.chars().count() + 2);
            return Ok(Spanned::new(Token::Char(value), span));
        }

        if current_char == '"' {
            let slice = self
                .slice_buffer_between('"')
                .ok_or(Error::Unterminated(
                    "string".into(),
                    Span::new(self.position, self.position),
                ))?
                .to_string();
            let value = self.unescape(&slice)?;
            let span = self.advance_with_span(slice.chars().count() + 2);
            return Ok(Spanned::new(Token::String(value), span));
        }

        Err(Error::InvalidToken(Span::new(self.position, self.position)))
    }

    /// Measures the indentation of the next line that carries a command,
    /// skipping blank and comment-only lines.
    fn next_indent(&mut self) -> Result<Option<Spanned<Token>>> {
        loop {
            let start = self.position;
            let leading = self
                .slice_buffer_while(|c| c == ' ' || c == '\t')
                .to_string();
            self.advance(leading.chars().count());
            self.skip_comment();

            match self.current_char() {
                None => {
                    self.at_line_start = false;
                    return Ok(None);
                }
                Some('\n') | Some('\r') => {
                    let len = if self.remaining_buffer().starts_with("\r\n") {
                        2
                    } else {
                        1
                    };
                    self.advance(len);
                }
                Some(_) => {
                    self.at_line_start = false;
                    if leading.contains('\t') {
                        return Err(Error::InvalidIndent(Span::new(start, self.position)));
                    }
                    return Ok(Some(Spanned::new(
                        Token::Indent(leading.len()),
                        Span::new(start, self.position),
                    )));
                }
            }
        }
    }

    fn skip_comment(&mut self) {
        if self.remaining_buffer().starts_with('#') {
            self.advance(self.slice_buffer_while(|c| c != '\n' && c != '\r').chars().count());
        }
    }

    fn unescape(&self, slice: &str) -> Result<String> {
        let mut str = String::new();
        let mut chars = slice.chars().enumerate();
        while let Some((i, ch)) = chars.next() {
            if ch == '\\' {
                str.push(match chars.next().map(|(_, c)| c) {
                    Some('n') => '\n',
                    Some('r') => '\r',
                    Some('t') => '\t',
                    Some('\\') => '\\',
                    Some('\'') => '\'',
                    Some('"') => '"',
                    Some('0') => '\0',
                    _ => {
                        return Err(Error::InvalidEscapeChar(
                            self.span_from_range(i + 1, i + 2),
                        ));
                    }
                });
            } else {
                str.push(ch);
            }
        }
        Ok(str)
    }

    fn current_char(&self) -> Option<char> {
        self.remaining_buffer().chars().next()
    }

    fn remaining_buffer(&self) -> &str {
        &self.buffer[self.index..]
    }

    /// Returns the text between `surr` and the next unescaped `surr` on the
    /// same line.
    fn slice_buffer_between(&self, surr: char) -> Option<&str> {
        let buffer = self.remaining_buffer();

        if !buffer.starts_with(surr) {
            return None;
        }

        let mut escaped = false;
        let end = buffer
            .char_indices()
            .skip(1)
            .take_while(|&(_, c)| c != '\n')
            .find(|&(_, c)| {
                if escaped {
                    escaped = false;
                    return false;
                }
                escaped = c == '\\';
                c == surr
            })?
            .0;

        Some(&buffer[1..end])
    }

    fn slice_buffer_while<P: Fn(char) -> bool>(&self, predicate: P) -> &str {
        let buffer = self.remaining_buffer();
        if let Some(pos) = buffer.find(|c| !predicate(c)) {
            &buffer[..pos]
        } else {
            buffer
        }
    }

    /// Advances by `n` characters.
    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(c) = self.current_char() {
                if c == '\n' {
                    self.position.line += 1;
                    self.position.column = 1;
                } else {
                    self.position.column += 1;
                }
                self.index += c.len_utf8();
                self.position.index = self.index;
            }
        }
    }

    fn span_from_range(&self, start: usize, end: usize) -> Span {
        Span::new(self.position_after(start), self.position_after(end))
    }

    fn position_after(&self, n: usize) -> Position {
        let mut pos = self.position;
        for c in self.remaining_buffer().chars().take(n) {
            pos.index += c.len_utf8();
            pos.column += 1;
        }
        pos
    }

    fn advance_with_span(&mut self, n: usize) -> Span {
        let start = self.position;
        self.advance(n);
        let mut end = self.position;
        end.column = end.column.saturating_sub(1).max(1);
        Span::new(start, end)
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned<Token>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.value == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
