use crate::error::Span;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Illegal,
    Eof,

    // Identifiers and literals
    Identifier,
    Integer,
    String,

    // Operators
    Assign,
    Plus,
    Minus,
    Bang,
    Star,
    Slash,
    Less,
    Greater,
    EqualEqual,
    BangEqual,

    // Delimiters
    Comma,
    Semicolon,
    Colon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    // Keywords
    Function,
    Let,
    True,
    False,
    If,
    Else,
    Return,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenType::Illegal => "ILLEGAL",
            TokenType::Eof => "EOF",
            TokenType::Identifier => "IDENT",
            TokenType::Integer => "INT",
            TokenType::String => "STRING",
            TokenType::Assign => "=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Bang => "!",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Less => "<",
            TokenType::Greater => ">",
            TokenType::EqualEqual => "==",
            TokenType::BangEqual => "!=",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Colon => ":",
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::Function => "FUNCTION",
            TokenType::Let => "LET",
            TokenType::True => "TRUE",
            TokenType::False => "FALSE",
            TokenType::If => "IF",
            TokenType::Else => "ELSE",
            TokenType::Return => "RETURN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, span: Span) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            span,
        }
    }
}

/// Scanner over the raw source text.
///
/// Keeps one current character plus a read cursor one position ahead; the
/// NUL character stands in for end of input.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    read_position: usize,
    ch: char,
    keywords: HashMap<&'static str, TokenType>,
    finished: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("fn", TokenType::Function);
        keywords.insert("let", TokenType::Let);
        keywords.insert("var", TokenType::Let);
        keywords.insert("true", TokenType::True);
        keywords.insert("false", TokenType::False);
        keywords.insert("if", TokenType::If);
        keywords.insert("else", TokenType::Else);
        keywords.insert("return", TokenType::Return);

        let mut lexer = Self {
            input: source.chars().collect(),
            position: 0,
            read_position: 0,
            ch: '\0',
            keywords,
            finished: false,
        };
        lexer.read_char();
        lexer
    }

    /// Scan the whole input, including the trailing EOF token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let at_end = token.token_type == TokenType::Eof;
            tokens.push(token);
            if at_end {
                return tokens;
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let start = self.position;
            let token_type = match self.ch {
                '+' => TokenType::Plus,
                '-' => TokenType::Minus,
                '*' => TokenType::Star,
                '<' => TokenType::Less,
                '>' => TokenType::Greater,
                ';' => TokenType::Semicolon,
                ':' => TokenType::Colon,
                ',' => TokenType::Comma,
                '(' => TokenType::LeftParen,
                ')' => TokenType::RightParen,
                '{' => TokenType::LeftBrace,
                '}' => TokenType::RightBrace,
                '[' => TokenType::LeftBracket,
                ']' => TokenType::RightBracket,
                '/' => {
                    if self.peek_char() == '/' {
                        self.skip_line();
                        continue;
                    }
                    TokenType::Slash
                }
                '=' => {
                    if self.peek_char() == '=' {
                        self.read_char();
                        TokenType::EqualEqual
                    } else {
                        TokenType::Assign
                    }
                }
                '!' => {
                    if self.peek_char() == '=' {
                        self.read_char();
                        TokenType::BangEqual
                    } else {
                        TokenType::Bang
                    }
                }
                '"' => {
                    let literal = self.read_string();
                    let span = Span::new(start, (self.position + 1).min(self.input.len()));
                    self.read_char();
                    return Token::new(TokenType::String, literal, span);
                }
                '\0' if self.position >= self.input.len() => {
                    return Token::new(TokenType::Eof, "", Span::new(start, start));
                }
                c if c.is_alphabetic() => {
                    let literal = self.read_while(char::is_alphabetic);
                    let token_type = self
                        .keywords
                        .get(literal.as_str())
                        .copied()
                        .unwrap_or(TokenType::Identifier);
                    return Token::new(token_type, literal, Span::new(start, self.position));
                }
                c if c.is_ascii_digit() => {
                    let literal = self.read_while(|c| c.is_ascii_digit());
                    return Token::new(TokenType::Integer, literal, Span::new(start, self.position));
                }
                _ => TokenType::Illegal,
            };

            let literal: String = self.input[start..=self.position].iter().collect();
            let token = Token::new(token_type, literal, Span::new(start, self.position + 1));
            self.read_char();
            return token;
        }
    }

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied().unwrap_or('\0');
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> char {
        self.input.get(self.read_position).copied().unwrap_or('\0')
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, ' ' | '\t' | '\n' | '\r') {
            self.read_char();
        }
    }

    fn skip_line(&mut self) {
        while !matches!(self.ch, '\n' | '\r') && self.position < self.input.len() {
            self.read_char();
        }
    }

    /// Read a string body verbatim. Leaves the cursor on the closing quote,
    /// or past the end of input when the literal is unterminated.
    fn read_string(&mut self) -> String {
        let start = self.position + 1;
        loop {
            self.read_char();
            if self.ch == '"' || self.position >= self.input.len() {
                break;
            }
        }
        let end = self.position.min(self.input.len());
        self.input[start..end].iter().collect()
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.position;
        while self.position < self.input.len() && accept(self.ch) {
            self.read_char();
        }
        self.input[start..self.position].iter().collect()
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.token_type == TokenType::Eof {
            self.finished = true;
        }
        Some(token)
    }
}
