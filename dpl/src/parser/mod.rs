//! Recursive-descent parser
//!
//! Precedence, lowest first: assignment (`=`, `:=`, right associative), `or`,
//! `and`, `not`, comparison, `||`, additive, multiplicative, unary `-`,
//! postfix (indexing and calls), then grouping and primaries.

use crate::ast::{BinOp, Branch, Node, Span, UnOp};
use crate::error::{CompileError, Result};
use crate::interp::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::lexer::Token;


/// Parse tokens into a program: a block of `;`-separated statements
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Node> {
    let mut parser = Parser::new(tokens);
    let statements = parser.list(Token::Semi, None, Parser::statement)?;
    tracing::trace!(statements = statements.len(), "parsed");
    Ok(Node::Block(statements))
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Zero-width span just past the last token
    eof: Span,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        let eof = Span::point(tokens.last().map_or(0, |(_, span)| span.end));
        Parser {
            tokens,
            pos: 0,
            eof,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or(self.eof, |(_, span)| *span)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume `token` if it is next
    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.eat(&token) {
            return Ok(());
        }
        let found = match self.peek() {
            Some(found) => found.to_string(),
            None => "end of input".to_string(),
        };
        Err(CompileError::parser(
            format!("expected '{token}', found {found}"),
            self.span(),
        ))
    }

    fn unexpected(&self) -> CompileError {
        let message = match self.peek() {
            Some(token) => format!("unexpected token {token}"),
            None => "unexpected end of input".to_string(),
        };
        CompileError::parser(message, self.span())
    }

    /// `stop | item (sep item)* sep? stop`; a `None` stop means end of input
    fn list(
        &mut self,
        sep: Token,
        stop: Option<Token>,
        item: fn(&mut Self) -> Result<Node>,
    ) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        if self.eat_stop(&stop) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if !self.eat(&sep) {
                break;
            }
            if self.eat_stop(&stop) {
                return Ok(items);
            }
        }
        if self.eat_stop(&stop) {
            Ok(items)
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_stop(&mut self, stop: &Option<Token>) -> bool {
        match stop {
            Some(token) => self.eat(token),
            None => self.peek().is_none(),
        }
    }

    /// `{ statement; ... }`
    fn body(&mut self) -> Result<Node> {
        self.expect(Token::LBrace)?;
        let statements = self.list(Token::Semi, Some(Token::RBrace), Parser::statement)?;
        Ok(Node::Block(statements))
    }

    fn statement(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Return) => {
                self.advance();
                Ok(Node::ret(self.expression()?))
            }
            Some(Token::For) => self.for_loop(),
            Some(Token::If) => self.if_chain(),
            _ => self.expression(),
        }
    }

    fn for_loop(&mut self) -> Result<Node> {
        self.expect(Token::For)?;
        let recipients = self.list(Token::Comma, Some(Token::In), Parser::primary)?;
        let source = self.expression()?;
        let body = self.body()?;
        Ok(Node::for_in(recipients, source, body))
    }

    fn if_chain(&mut self) -> Result<Node> {
        self.expect(Token::If)?;
        let mut branches = Vec::new();
        loop {
            let cond = self.expression()?;
            let body = self.body()?;
            branches.push(Branch { cond, body });
            if !self.eat(&Token::Elif) {
                break;
            }
        }
        let otherwise = if self.eat(&Token::Else) {
            Some(Box::new(self.body()?))
        } else {
            None
        };
        Ok(Node::If {
            branches,
            otherwise,
        })
    }

    /// Run a recursive grammar rule with automatic stack growth
    fn nested(&mut self, rule: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || rule(self))
    }

    fn expression(&mut self) -> Result<Node> {
        self.nested(Parser::assignment)
    }

    fn assignment(&mut self) -> Result<Node> {
        let target = self.or()?;
        if self.eat(&Token::Eq) {
            Ok(Node::set(target, self.expression()?))
        } else if self.eat(&Token::ColonEq) {
            Ok(Node::create(target, self.expression()?))
        } else {
            Ok(target)
        }
    }

    fn or(&mut self) -> Result<Node> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            left = Node::binary(BinOp::Or, left, self.and()?);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Node> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            left = Node::binary(BinOp::And, left, self.not()?);
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Node> {
        if self.eat(&Token::Not) {
            Ok(Node::unary(UnOp::Not, self.nested(Parser::not)?))
        } else {
            self.compare()
        }
    }

    fn compare(&mut self) -> Result<Node> {
        let mut left = self.concat()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::LtEq) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::GtEq) => BinOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            left = Node::binary(op, left, self.concat()?);
        }
    }

    fn concat(&mut self) -> Result<Node> {
        let mut left = self.additive()?;
        while self.eat(&Token::Concat) {
            left = Node::binary(BinOp::Concat, left, self.additive()?);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Node> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            left = Node::binary(op, left, self.term()?);
        }
    }

    fn term(&mut self) -> Result<Node> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            left = Node::binary(op, left, self.unary()?);
        }
    }

    fn unary(&mut self) -> Result<Node> {
        if self.eat(&Token::Minus) {
            Ok(Node::unary(UnOp::Neg, self.nested(Parser::unary)?))
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Node> {
        let mut node = self.group()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket)?;
                node = Node::index(node, index);
            } else if self.eat(&Token::LParen) {
                let args = self.list(Token::Comma, Some(Token::RParen), Parser::expression)?;
                node = Node::call(node, args);
            } else {
                return Ok(node);
            }
        }
    }

    /// Parenthesised expression, or a function literal `(params) -> { body }`
    fn group(&mut self) -> Result<Node> {
        if !self.eat(&Token::LParen) {
            return self.primary();
        }
        let mut items = self.list(Token::Comma, Some(Token::RParen), Parser::expression)?;
        if self.eat(&Token::Arrow) {
            let body = self.body()?;
            return Ok(Node::function(items, body));
        }
        if items.len() == 1 {
            if let Some(item) = items.pop() {
                return Ok(item);
            }
        }
        Err(self.unexpected())
    }

    fn primary(&mut self) -> Result<Node> {
        let node = match self.peek() {
            Some(Token::Null) => Node::Null,
            Some(Token::True) => Node::Bool(true),
            Some(Token::False) => Node::Bool(false),
            Some(Token::Ident(name)) => Node::ident(name.clone()),
            Some(Token::IntLit(n)) => Node::Int(*n),
            Some(Token::RealLit(x)) => Node::Real(*x),
            Some(Token::TextLit(s)) => Node::text(s.clone()),
            Some(Token::LBracket) => {
                self.advance();
                let items = self.list(Token::Comma, Some(Token::RBracket), Parser::expression)?;
                return Ok(Node::Array(items));
            }
            Some(Token::LBrace) => {
                self.advance();
                return self.object();
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(node)
    }

    /// Object literal after the opening `{`
    fn object(&mut self) -> Result<Node> {
        let mut pairs = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Node::Object(pairs));
        }
        loop {
            let key = self.expression()?;
            self.expect(Token::Colon)?;
            let value = self.expression()?;
            pairs.push((key, value));
            if !self.eat(&Token::Comma) || self.at(&Token::RBrace) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Node::Object(pairs))
    }
}
