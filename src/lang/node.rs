//! Statement and expression nodes. The compiler matches on them
//! exhaustively, one arm per construct.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // ───────────────────────────── Arithmetic ───────────────────────────
    Add,
    Sub,
    Mul,
    /// `/` and `DIV`: floor division by repeated subtraction.
    Div,
    Mod,
    /// `^`, right associative.
    Pow,

    // ───────────────────────────── Comparison ───────────────────────────
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // ─────────────────────────────── Logic ──────────────────────────────
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::LtEq
                | BinaryOp::GtEq
        )
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Bool(bool),
    /// Only meaningful as a `print` argument.
    Str(String),
    Ident(String),
    /// Parenthesised expression; evaluates to its inner value unchanged.
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Built-in (`print`, `input`, `assert`) or user function call.
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

/// One `if` or `elseif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = value`
    Assign { name: String, value: Expr },

    /// `if c then ... elseif c then ... else ... endif`
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Stmt>>,
    },

    /// `while c ... endwhile`
    While { condition: Expr, body: Vec<Stmt> },

    /// `do ... until c`: the body runs at least once.
    DoUntil { body: Vec<Stmt>, condition: Expr },

    /// `for var = start to end ... next next_var`
    ///
    /// Both identifiers are kept so the compiler can reject a mismatch.
    For {
        var: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
        next_var: String,
    },

    /// Parsed so it can be rejected with a clear message.
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },

    /// `function name(params) ... endfunction` (or `procedure`).
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },

    Return(Option<Expr>),
    Break,
    Continue,

    /// An expression used as a statement; in practice always a call.
    Expr(Expr),
}
