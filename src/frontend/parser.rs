use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::lang::{BinaryOp, Branch, Expr, Program, Stmt, SwitchCase, UnaryOp};

/// Recursive-descent parser for the pseudocode language.
///
/// The parser consumes lexed `Spanned` tokens and produces a `Program` whose
/// statements keep source order. Block constructs are closed by their own
/// keyword (`endif`, `endwhile`, `until`, `next`, `endswitch`,
/// `endfunction`), so newlines carry no meaning and are filtered out along
/// with comments. The one place line breaks matter is `return`: its value
/// must start on the same line.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    ///
    /// Used to provide stable source locations for errors that occur after
    /// advancing past the last token or at end-of-file.
    last_span: Option<Span>,
}

impl Parser {
    /// Creates a new parser from lexer output.
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_span: None,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if let Some(s) = token {
            self.last_span = Some(s.span);
        }
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    /// Constructs a `ParserError` at the most relevant location: the
    /// current token, else the last consumed one, else `1:1`.
    fn error(&self, message: &str) -> ParserError {
        let span = self
            .current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 });
        ParserError {
            message: message.to_string(),
            line: span.line,
            col: span.col,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of input".to_string())
    }

    /// Consumes `expected` or fails with "expected X after Y".
    fn expect(&mut self, expected: Token, after: &str) -> Result<(), ParserError> {
        if self.at(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {} after {}, found {}",
                expected.describe(),
                after,
                self.found()
            )))
        }
    }

    fn expect_ident(&mut self, after: &str) -> Result<String, ParserError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(&format!(
                "expected identifier after {}, found {}",
                after,
                self.found()
            ))),
        }
    }

    /// Parses a complete program.
    ///
    /// Function declarations are only accepted at the top level.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut statements = Vec::new();

        while !self.at_eof() {
            let stmt = if self.at(&Token::Function) {
                self.parse_function()?
            } else {
                self.parse_statement()?
            };
            statements.push(stmt);
        }

        Ok(Program::new(statements))
    }

    /// Parses statements until one of `terminators` is the current token.
    /// The terminator is left unconsumed.
    fn parse_block(&mut self, terminators: &[Token], construct: &str) -> Result<Vec<Stmt>, ParserError> {
        let mut body = Vec::new();

        loop {
            if let Some(t) = self.peek() {
                if terminators.contains(t) {
                    return Ok(body);
                }
            }
            if self.at_eof() {
                let names: Vec<String> = terminators.iter().map(|t| t.describe()).collect();
                return Err(self.error(&format!(
                    "unexpected end of input in {}, expected {}",
                    construct,
                    names.join(" or ")
                )));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParserError> {
        let spanned = self.current().ok_or_else(|| self.error("unexpected EOF"))?;

        match &spanned.token {
            Token::Ident(_) => self.parse_ident_statement(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_until(),
            Token::For => self.parse_for(),
            Token::Switch => self.parse_switch(),
            Token::Return => self.parse_return(),
            Token::Break => {
                self.advance();
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.advance();
                Ok(Stmt::Continue)
            }
            Token::Function => {
                Err(self.error("function declarations are only allowed at the top level"))
            }
            _ => Err(self.error(&format!("expected a statement, found {}", self.found()))),
        }
    }

    /// `name = expr` or `name(args)`.
    fn parse_ident_statement(&mut self) -> Result<Stmt, ParserError> {
        match self.peek_next() {
            Some(Token::Assign) => {
                let name = self.expect_ident("statement start")?;
                self.advance(); // consume '='
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { name, value })
            }
            Some(Token::LParen) => Ok(Stmt::Expr(self.parse_primary()?)),
            Some(Token::EqEq) => {
                self.advance();
                Err(self.error("'==' compares values; use '=' to assign"))
            }
            _ => {
                let name = self.expect_ident("statement start")?;
                Err(self.error(&format!(
                    "expected '=' or '(' after '{}', found {}",
                    name,
                    self.found()
                )))
            }
        }
    }

    /// ```text
    /// if <expr> then <stmts>
    /// (elseif <expr> then <stmts>)*
    /// (else <stmts>)?
    /// endif
    /// ```
    fn parse_if(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'if'

        let mut branches = Vec::new();
        let mut otherwise = None;
        let arm_end = [Token::ElseIf, Token::Else, Token::EndIf];

        let condition = self.parse_expr()?;
        self.expect(Token::Then, "if condition")?;
        let body = self.parse_block(&arm_end, "if")?;
        branches.push(Branch { condition, body });

        while self.at(&Token::ElseIf) {
            self.advance();
            let condition = self.parse_expr()?;
            self.expect(Token::Then, "elseif condition")?;
            let body = self.parse_block(&arm_end, "elseif")?;
            branches.push(Branch { condition, body });
        }

        if self.at(&Token::Else) {
            self.advance();
            otherwise = Some(self.parse_block(&[Token::EndIf], "else")?);
        }

        self.expect(Token::EndIf, "if statement")?;
        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'while'
        let condition = self.parse_expr()?;
        let body = self.parse_block(&[Token::EndWhile], "while")?;
        self.advance(); // consume 'endwhile'
        Ok(Stmt::While { condition, body })
    }

    fn parse_do_until(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'do'
        let body = self.parse_block(&[Token::Until], "do")?;
        self.advance(); // consume 'until'
        let condition = self.parse_expr()?;
        Ok(Stmt::DoUntil { body, condition })
    }

    /// `for i = <expr> to <expr> <stmts> next i`
    fn parse_for(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'for'
        let var = self.expect_ident("'for'")?;
        self.expect(Token::Assign, "loop variable")?;
        let start = self.parse_expr()?;
        self.expect(Token::To, "loop start value")?;
        let end = self.parse_expr()?;
        let body = self.parse_block(&[Token::Next], "for")?;
        self.advance(); // consume 'next'
        let next_var = self.expect_ident("'next'")?;

        Ok(Stmt::For {
            var,
            start,
            end,
            body,
            next_var,
        })
    }

    /// ```text
    /// switch <expr>:
    ///   case <expr>: <stmts>
    ///   default: <stmts>
    /// endswitch
    /// ```
    fn parse_switch(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'switch'
        let subject = self.parse_expr()?;
        self.expect(Token::Colon, "switch subject")?;

        let mut cases = Vec::new();
        let mut default = None;
        let case_end = [Token::Case, Token::Default, Token::EndSwitch];

        while self.at(&Token::Case) {
            self.advance();
            let value = self.parse_expr()?;
            self.expect(Token::Colon, "case value")?;
            let body = self.parse_block(&case_end, "case")?;
            cases.push(SwitchCase { value, body });
        }

        if self.at(&Token::Default) {
            self.advance();
            self.expect(Token::Colon, "'default'")?;
            default = Some(self.parse_block(&[Token::EndSwitch], "default")?);
        }

        self.expect(Token::EndSwitch, "switch cases")?;
        Ok(Stmt::Switch {
            subject,
            cases,
            default,
        })
    }

    /// `function name(a, b) <stmts> endfunction`
    fn parse_function(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'function' / 'procedure'
        let name = self.expect_ident("'function'")?;
        self.expect(Token::LParen, "function name")?;

        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                params.push(self.expect_ident("'(' or ','")?);
                if self.at(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "parameter list")?;

        let body = self.parse_block(&[Token::EndFunction], "function")?;
        self.advance(); // consume 'endfunction'

        Ok(Stmt::Function { name, params, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'return'
        let line = self.last_span.map(|s| s.line).unwrap_or(1);

        let same_line = self.current().map(|s| s.span.line == line).unwrap_or(false);
        if same_line && self.starts_expr() {
            Ok(Stmt::Return(Some(self.parse_expr()?)))
        } else {
            Ok(Stmt::Return(None))
        }
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Integer(_)
                    | Token::String(_)
                    | Token::Bool(_)
                    | Token::Ident(_)
                    | Token::LParen
                    | Token::Minus
                    | Token::Not
            )
        )
    }

    // =========================================================================
    // Expressions, lowest precedence first
    // =========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_and()?;
        while self.at(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_not()?;
        while self.at(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParserError> {
        if self.at(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Gt => Some(BinaryOp::Gt),
            Token::LtEq => Some(BinaryOp::LtEq),
            Token::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        }
    }

    /// Comparisons do not chain: `a < b < c` is rejected.
    fn parse_comparison(&mut self) -> Result<Expr, ParserError> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;

        if self.comparison_op().is_some() {
            return Err(self.error("comparison operators cannot be chained"));
        }
        Ok(Expr::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) | Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_power()?;
            left = Expr::binary(left, op, right);
        }
    }

    /// `^` is right associative: `2 ^ 3 ^ 2` is `2 ^ (3 ^ 2)`.
    fn parse_power(&mut self) -> Result<Expr, ParserError> {
        let base = self.parse_unary()?;
        if self.at(&Token::Caret) {
            self.advance();
            let exponent = self.parse_power()?;
            return Ok(Expr::binary(base, BinaryOp::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        if self.at(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOp::Neg, operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        let spanned = self.current().ok_or_else(|| self.error("unexpected EOF"))?;

        let expr = match &spanned.token {
            Token::Integer(n) => {
                let n = *n;
                self.advance();
                Expr::Integer(n)
            }
            Token::Bool(b) => {
                let b = *b;
                self.advance();
                Expr::Bool(b)
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance();
                Expr::Str(s)
            }
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args(&name)?;
                    Expr::Call { name, args }
                } else {
                    Expr::Ident(name)
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "parenthesised expression")?;
                Expr::Group(Box::new(inner))
            }
            _ => {
                return Err(self.error(&format!("expected an expression, found {}", self.found())));
            }
        };

        Ok(expr)
    }

    fn parse_args(&mut self, callee: &str) -> Result<Vec<Expr>, ParserError> {
        self.advance(); // consume '('
        let mut args = Vec::new();

        if !self.at(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.at(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RParen, &format!("arguments to '{}'", callee))?;
        Ok(args)
    }
}
