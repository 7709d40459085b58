use crate::token::{Token, TokenKind};

use unicode_xid::UnicodeXID;

#[derive(Debug, Clone)]
pub struct Lexer {
    source: Vec<char>,

    start: usize,
    current: usize,
    line: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) {
        self.current += 1;
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn create_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.line, self.lexeme())
    }

    /// Picks `matched` and consumes the next char if it is `next`, otherwise `single`.
    fn either(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            single
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.at_end() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                _ if c.is_whitespace() => self.advance(),
                _ => break,
            }
        }
    }

    fn lex_string(&mut self) -> Token {
        let line = self.line;
        self.start = self.current; // the opening '"' is not part of the literal

        while let Some(c) = self.peek() {
            if c == '"' {
                let token = Token::new(TokenKind::String, line, self.lexeme());
                self.advance(); // skip the closing: "
                return token;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        Token::new(TokenKind::UnterminatedString, line, self.lexeme())
    }

    fn lex_number(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        self.create_token(TokenKind::Integer)
    }

    fn lex_ident(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_xid_continue()) {
            self.advance();
        }

        let lexeme = self.lexeme();
        let kind = TokenKind::from_keyword_str(&lexeme).unwrap_or(TokenKind::Ident);
        Token::new(kind, self.line, lexeme)
    }

    pub fn next_token(&mut self) -> Token {
        let token = self.scan_token();
        log::trace!("token {:?} {:?} at L{}", token.kind, token.literal, token.line);
        token
    }

    fn scan_token(&mut self) -> Token {
        self.skip_trivia();
        self.start = self.current;

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, self.line, ""),
        };
        self.advance();

        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            '<' => self.either('=', TokenKind::LesserEqual, TokenKind::Lesser),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),

            '"' => return self.lex_string(),
            _ if c.is_ascii_digit() => return self.lex_number(),
            _ if c == '_' || c.is_xid_start() => return self.lex_ident(),

            _ => TokenKind::Illegal,
        };

        self.create_token(kind)
    }

    /// Returns the next token without moving the cursor or the line counter.
    pub fn peek_token(&mut self) -> Token {
        let (start, current, line) = (self.start, self.current, self.line);
        let token = self.next_token();
        self.start = start;
        self.current = current;
        self.line = line;
        token
    }

    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }
}
