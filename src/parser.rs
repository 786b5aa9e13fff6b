use crate::ast::{
    BlockStatement, Expression, FunctionLiteral, Identifier, InfixOp, PrefixOp, Program,
    Statement,
};
use crate::error::KestrelError;
use crate::lexer::{Lexer, Token, TokenType};
use std::collections::HashMap;
use std::rc::Rc;

/// Binding power of an operator, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

impl Precedence {
    fn of(token_type: TokenType) -> Precedence {
        match token_type {
            TokenType::EqualEqual | TokenType::BangEqual => Precedence::Equals,
            TokenType::Less | TokenType::Greater => Precedence::LessGreater,
            TokenType::Plus | TokenType::Minus => Precedence::Sum,
            TokenType::Star | TokenType::Slash => Precedence::Product,
            TokenType::LeftParen => Precedence::Call,
            TokenType::LeftBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }
}

type PrefixParseFn = fn(&mut Parser) -> Option<Expression>;
type InfixParseFn = fn(&mut Parser, Expression) -> Option<Expression>;

/// Pratt parser over a token stream.
///
/// Syntax errors never abort the parse: they are collected in `errors` and
/// the failed production is left out of the tree.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    errors: Vec<KestrelError>,
    prefix_fns: HashMap<TokenType, PrefixParseFn>,
    infix_fns: HashMap<TokenType, InfixParseFn>,
}

/// Parse `source` into a program plus every diagnostic found on the way.
pub fn parse(source: &str) -> (Program, Vec<KestrelError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();

        let mut prefix_fns: HashMap<TokenType, PrefixParseFn> = HashMap::new();
        prefix_fns.insert(TokenType::Identifier, Parser::parse_identifier);
        prefix_fns.insert(TokenType::Integer, Parser::parse_integer_literal);
        prefix_fns.insert(TokenType::String, Parser::parse_string_literal);
        prefix_fns.insert(TokenType::Minus, Parser::parse_prefix_expression);
        prefix_fns.insert(TokenType::Bang, Parser::parse_prefix_expression);
        prefix_fns.insert(TokenType::True, Parser::parse_boolean);
        prefix_fns.insert(TokenType::False, Parser::parse_boolean);
        prefix_fns.insert(TokenType::LeftParen, Parser::parse_grouped_expression);
        prefix_fns.insert(TokenType::If, Parser::parse_if_expression);
        prefix_fns.insert(TokenType::Function, Parser::parse_function_literal);
        prefix_fns.insert(TokenType::LeftBracket, Parser::parse_array_literal);
        prefix_fns.insert(TokenType::LeftBrace, Parser::parse_hash_literal);

        let mut infix_fns: HashMap<TokenType, InfixParseFn> = HashMap::new();
        for token_type in [
            TokenType::Plus,
            TokenType::Minus,
            TokenType::Star,
            TokenType::Slash,
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::Less,
            TokenType::Greater,
        ] {
            infix_fns.insert(token_type, Parser::parse_infix_expression);
        }
        infix_fns.insert(TokenType::LeftParen, Parser::parse_call_expression);
        infix_fns.insert(TokenType::LeftBracket, Parser::parse_index_expression);

        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
            prefix_fns,
            infix_fns,
        }
    }

    pub fn errors(&self) -> &[KestrelError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<KestrelError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.current_is(TokenType::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.advance();
        }

        tracing::debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.token_type {
            TokenType::Let => self.parse_let_statement(),
            TokenType::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();

        if !self.expect_peek(TokenType::Identifier) {
            return None;
        }
        let name = Identifier::new(self.current.clone());

        if !self.expect_peek(TokenType::Assign) {
            return None;
        }
        self.advance();

        let value = self.parse_expression(Precedence::Lowest);
        self.skip_semicolon();

        let span = token.span.to(self.current.span);
        Some(Statement::Let {
            token,
            name,
            value: value?,
            span,
        })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        self.advance();

        let value = self.parse_expression(Precedence::Lowest);
        self.skip_semicolon();

        let span = token.span.to(self.current.span);
        Some(Statement::Return {
            token,
            value: value?,
            span,
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();

        let expression = self.parse_expression(Precedence::Lowest);
        self.skip_semicolon();

        let span = token.span.to(self.current.span);
        Some(Statement::Expression {
            token,
            expression: expression?,
            span,
        })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let token = self.current.clone();
        let mut statements = Vec::new();

        self.advance();

        while !self.current_is(TokenType::RightBrace) && !self.current_is(TokenType::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.advance();
        }

        let span = token.span.to(self.current.span);
        BlockStatement {
            token,
            statements,
            span,
        }
    }

    /// Core of the Pratt loop: one prefix production, then fold infix
    /// productions while the next operator binds tighter than `precedence`.
    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let prefix = match self.prefix_fns.get(&self.current.token_type) {
            Some(prefix) => *prefix,
            None => {
                self.no_prefix_parse_fn_error();
                return None;
            }
        };
        let mut left = prefix(self)?;

        while !self.peek_is(TokenType::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_fns.get(&self.peek.token_type) {
                Some(infix) => *infix,
                None => return Some(left),
            };
            self.advance();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(Identifier::new(self.current.clone())))
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer {
                token: self.current.clone(),
                value,
            }),
            Err(_) => {
                let message = format!("could not parse {} as integer", self.current.literal);
                self.errors
                    .push(KestrelError::parse_error(self.current.span, message));
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expression> {
        Some(Expression::String {
            token: self.current.clone(),
            value: self.current.literal.clone(),
        })
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean {
            token: self.current.clone(),
            value: self.current_is(TokenType::True),
        })
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        let operator = match token.token_type {
            TokenType::Bang => PrefixOp::Not,
            _ => PrefixOp::Negate,
        };

        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix {
            token,
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let token = self.current.clone();
        let operator = match token.token_type {
            TokenType::Plus => InfixOp::Add,
            TokenType::Minus => InfixOp::Subtract,
            TokenType::Star => InfixOp::Multiply,
            TokenType::Slash => InfixOp::Divide,
            TokenType::Less => InfixOp::Less,
            TokenType::Greater => InfixOp::Greater,
            TokenType::EqualEqual => InfixOp::Equal,
            _ => InfixOp::NotEqual,
        };

        let precedence = self.current_precedence();
        self.advance();
        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix {
            token,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.advance();

        let expression = self.parse_expression(Precedence::Lowest);
        if !self.expect_peek(TokenType::RightParen) {
            return None;
        }

        expression
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();

        if !self.expect_peek(TokenType::LeftParen) {
            return None;
        }
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest);

        if !self.expect_peek(TokenType::RightParen) {
            return None;
        }
        if !self.expect_peek(TokenType::LeftBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let mut alternative = None;
        if self.peek_is(TokenType::Else) {
            self.advance();

            if !self.expect_peek(TokenType::LeftBrace) {
                return None;
            }
            alternative = Some(self.parse_block_statement());
        }

        Some(Expression::If {
            token,
            condition: Box::new(condition?),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();

        if !self.expect_peek(TokenType::LeftParen) {
            return None;
        }
        let parameters = self.parse_function_parameters();

        if !self.expect_peek(TokenType::LeftBrace) {
            return None;
        }
        let body = self.parse_block_statement();

        Some(Expression::Function(Rc::new(FunctionLiteral {
            token,
            parameters: parameters?,
            body,
        })))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut identifiers = Vec::new();

        if self.peek_is(TokenType::RightParen) {
            self.advance();
            return Some(identifiers);
        }

        if !self.expect_peek(TokenType::Identifier) {
            return None;
        }
        identifiers.push(Identifier::new(self.current.clone()));

        while self.peek_is(TokenType::Comma) {
            self.advance();
            if !self.expect_peek(TokenType::Identifier) {
                return None;
            }
            identifiers.push(Identifier::new(self.current.clone()));
        }

        if !self.expect_peek(TokenType::RightParen) {
            return None;
        }

        Some(identifiers)
    }

    fn parse_call_expression(&mut self, callee: Expression) -> Option<Expression> {
        let token = self.current.clone();
        let arguments = self.parse_expression_list(TokenType::RightParen)?;

        Some(Expression::Call {
            token,
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        let elements = self.parse_expression_list(TokenType::RightBracket)?;

        Some(Expression::Array { token, elements })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        let token = self.current.clone();
        self.advance();

        let index = self.parse_expression(Precedence::Lowest);
        if !self.expect_peek(TokenType::RightBracket) {
            return None;
        }

        Some(Expression::Index {
            token,
            left: Box::new(left),
            index: Box::new(index?),
        })
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        let mut pairs = Vec::new();

        while !self.peek_is(TokenType::RightBrace) {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest);

            if !self.expect_peek(TokenType::Colon) {
                return None;
            }

            self.advance();
            let value = self.parse_expression(Precedence::Lowest);
            pairs.push(key.zip(value));

            if !self.peek_is(TokenType::RightBrace) && !self.expect_peek(TokenType::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenType::RightBrace) {
            return None;
        }

        Some(Expression::Hash {
            token,
            pairs: pairs.into_iter().collect::<Option<Vec<_>>>()?,
        })
    }

    /// Comma-separated expressions up to `end`, shared by call arguments
    /// and array literals.
    fn parse_expression_list(&mut self, end: TokenType) -> Option<Vec<Expression>> {
        let mut list: Vec<Option<Expression>> = Vec::new();

        if self.peek_is(end) {
            self.advance();
            return Some(Vec::new());
        }

        self.advance();
        list.push(self.parse_expression(Precedence::Lowest));

        while self.peek_is(TokenType::Comma) {
            self.advance();
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest));
        }

        if !self.expect_peek(end) {
            return None;
        }

        list.into_iter().collect()
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenType::Semicolon) {
            self.advance();
        }
    }

    fn current_is(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn peek_is(&self, token_type: TokenType) -> bool {
        self.peek.token_type == token_type
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current.token_type)
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.token_type)
    }

    /// Advance only if the next token has the expected type; otherwise
    /// record a diagnostic and leave the cursor where it is.
    fn expect_peek(&mut self, token_type: TokenType) -> bool {
        if self.peek_is(token_type) {
            self.advance();
            return true;
        }

        let message = format!(
            "expected next token to be {}, got {} instead",
            token_type, self.peek.token_type
        );
        self.errors
            .push(KestrelError::parse_error(self.peek.span, message));
        false
    }

    fn no_prefix_parse_fn_error(&mut self) {
        let message = format!(
            "no prefix parse function for {} found",
            self.current.token_type
        );
        self.errors.push(
            KestrelError::parse_error(self.current.span, message)
                .with_help("this token cannot start an expression"),
        );
    }
}
