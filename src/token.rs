use derive_more::Display;

use crate::common::{Error, ErrorKind};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[display(fmt = "end of file")]
    Eof,
    #[display(fmt = "illegal")]
    Illegal,
    #[display(fmt = "unterminated string")]
    UnterminatedString,

    #[display(fmt = "identifier")]
    Ident,
    #[display(fmt = "integer")]
    Integer,
    #[display(fmt = "string")]
    String,

    // keywords
    #[display(fmt = "var")]
    Var,
    #[display(fmt = "fun")]
    Fun,
    #[display(fmt = "return")]
    Return,
    #[display(fmt = "true")]
    True,
    #[display(fmt = "false")]
    False,
    #[display(fmt = "if")]
    If,
    #[display(fmt = "else")]
    Else,
    #[display(fmt = "loop")]
    Loop,
    #[display(fmt = "break")]
    Break,

    // symbols
    #[display(fmt = "(")]
    LeftParen,
    #[display(fmt = ")")]
    RightParen,
    #[display(fmt = "{{")]
    LeftBrace,
    #[display(fmt = "}}")]
    RightBrace,
    #[display(fmt = ",")]
    Comma,
    #[display(fmt = ";")]
    Semicolon,
    #[display(fmt = "=")]
    Equal,
    #[display(fmt = "!")]
    Bang,

    // infix operators
    #[display(fmt = "+")]
    Plus,
    #[display(fmt = "-")]
    Minus,
    #[display(fmt = "*")]
    Star,
    #[display(fmt = "/")]
    Slash,
    #[display(fmt = "<")]
    Lesser,
    #[display(fmt = ">")]
    Greater,
    #[display(fmt = "<=")]
    LesserEqual,
    #[display(fmt = ">=")]
    GreaterEqual,
    #[display(fmt = "==")]
    EqualEqual,
    #[display(fmt = "!=")]
    BangEqual,
}

impl TokenKind {
    pub fn from_keyword_str(name: &str) -> Option<TokenKind> {
        match name {
            "var" => Some(TokenKind::Var),
            "fun" => Some(TokenKind::Fun),
            "return" => Some(TokenKind::Return),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "loop" => Some(TokenKind::Loop),
            "break" => Some(TokenKind::Break),
            _ => None,
        }
    }

    pub fn is_prefix_op(&self) -> bool {
        matches!(*self, Self::Bang | Self::Plus | Self::Minus)
    }

    pub fn is_infix_op(&self) -> bool {
        matches!(
            *self,
            Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Slash
                | Self::Lesser
                | Self::Greater
                | Self::LesserEqual
                | Self::GreaterEqual
                | Self::EqualEqual
                | Self::BangEqual
        )
    }

    /// Tokens that begin a new operand and therefore can't directly follow a
    /// complete expression.
    pub fn starts_operand(&self) -> bool {
        matches!(
            *self,
            Self::Ident
                | Self::Integer
                | Self::String
                | Self::True
                | Self::False
                | Self::LeftParen
                | Self::Bang
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub literal: String,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, literal: impl Into<String>) -> Self {
        Token {
            kind,
            line,
            literal: literal.into(),
        }
    }

    pub fn error_at(&self, kind: ErrorKind) -> Error {
        Error::new(self.line, kind)
    }
}
