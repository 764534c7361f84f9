use crate::frontend::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexerError {}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexerError {
        LexerError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_comment(&mut self) -> Token {
        self.advance();
        self.advance();
        let mut comment = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            comment.push(ch);
            self.advance();
        }
        Token::Comment(comment.trim().to_string())
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start = self.span();
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some(ch) => {
                            return Err(
                                self.error(format!("unknown escape sequence: \\{}", ch), self.span())
                            );
                        }
                        None => {
                            return Err(self.error("unexpected EOF in escape sequence", self.span()));
                        }
                    }
                    self.advance();
                }
                Some('\n') => {
                    return Err(
                        self.error("unterminated string (newline before closing quote)", start)
                    );
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => return Err(self.error("unterminated string literal", start)),
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.span();

        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self
            .current()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        {
            return Err(self.error(
                format!("identifier cannot start with a digit: {}{}", digits, self.current().unwrap_or_default()),
                start,
            ));
        }
        if self.current() == Some('.') && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return Err(self.error("floating point numbers are not supported", start));
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("invalid integer: {}", digits), start))?;
        Ok(Token::Integer(value))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::keyword(&ident).unwrap_or(Token::Ident(ident))
    }

    fn read_operator(&mut self) -> Option<Token> {
        let ch = self.current()?;
        let next = self.peek();

        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::LtEq, 2),
            ('>', Some('=')) => (Token::GtEq, 2),
            ('=', _) => (Token::Assign, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('^', _) => (Token::Caret, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            (':', _) => (Token::Colon, 1),
            _ => return None,
        };

        for _ in 0..width {
            self.advance();
        }
        Some(token)
    }

    /// Lex the whole source, keeping comments and newlines.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let span = self.span();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    break;
                }
                Some('\n') => {
                    self.advance();
                    Token::Newline
                }
                Some('/') if self.peek() == Some('/') => self.read_comment(),
                Some('"') => self.read_string()?,
                Some(ch) if ch.is_ascii_digit() => self.read_number()?,
                Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_identifier(),
                Some(ch) => match self.read_operator() {
                    Some(token) => token,
                    None => return Err(self.error(format!("unexpected character '{}'", ch), span)),
                },
            };

            tokens.push(Spanned { token, span });
        }

        Ok(tokens)
    }

    /// Lex the whole source, dropping comments and newlines.
    pub fn tokenize_clean(&mut self) -> Result<Vec<Spanned>, LexerError> {
        Ok(self
            .tokenize()?
            .into_iter()
            .filter(|s| !matches!(s.token, Token::Comment(_) | Token::Newline))
            .collect())
    }
}
