#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    String(std::string::String),
    Bool(bool),

    // Identifier (variable or function name)
    Ident(std::string::String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Mod,
    Div,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logic
    And,
    Or,
    Not,

    // Assignment
    Assign,

    // Selection
    If,
    Then,
    ElseIf,
    Else,
    EndIf,
    Switch,
    Case,
    Default,
    EndSwitch,

    // Iteration
    While,
    EndWhile,
    Do,
    Until,
    For,
    To,
    Next,
    Break,
    Continue,

    // Subroutines
    Function,
    EndFunction,
    Return,

    // Delimiters
    LParen,
    RParen,
    Comma,
    Colon,

    // Special
    Comment(std::string::String),
    Newline,
    Eof,
}

impl Token {
    /// Keyword lookup, case-insensitive. `procedure` is an alias of
    /// `function`.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word.to_ascii_lowercase().as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),

            "mod" => Token::Mod,
            "div" => Token::Div,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,

            "if" => Token::If,
            "then" => Token::Then,
            "elseif" => Token::ElseIf,
            "else" => Token::Else,
            "endif" => Token::EndIf,
            "switch" => Token::Switch,
            "case" => Token::Case,
            "default" => Token::Default,
            "endswitch" => Token::EndSwitch,

            "while" => Token::While,
            "endwhile" => Token::EndWhile,
            "do" => Token::Do,
            "until" => Token::Until,
            "for" => Token::For,
            "to" => Token::To,
            "next" => Token::Next,
            "break" => Token::Break,
            "continue" => Token::Continue,

            "function" | "procedure" => Token::Function,
            "endfunction" | "endprocedure" => Token::EndFunction,
            "return" => Token::Return,

            _ => return None,
        };
        Some(token)
    }

    /// Short description used in parser diagnostics.
    pub fn describe(&self) -> std::string::String {
        match self {
            Token::Integer(n) => format!("integer {}", n),
            Token::String(_) => "string literal".to_string(),
            Token::Bool(b) => format!("'{}'", b),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Comment(_) => "comment".to_string(),
            Token::Newline => "newline".to_string(),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Caret => "^",
            Token::Mod => "MOD",
            Token::Div => "DIV",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::Assign => "=",
            Token::If => "if",
            Token::Then => "then",
            Token::ElseIf => "elseif",
            Token::Else => "else",
            Token::EndIf => "endif",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::EndSwitch => "endswitch",
            Token::While => "while",
            Token::EndWhile => "endwhile",
            Token::Do => "do",
            Token::Until => "until",
            Token::For => "for",
            Token::To => "to",
            Token::Next => "next",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Function => "function",
            Token::EndFunction => "endfunction",
            Token::Return => "return",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Integer(_)
            | Token::String(_)
            | Token::Bool(_)
            | Token::Ident(_)
            | Token::Comment(_)
            | Token::Newline
            | Token::Eof => "",
        }
    }
}
