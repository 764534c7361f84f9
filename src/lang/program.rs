use super::node::Stmt;

/// Parsed pseudocode program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Top-level statements, function declarations included, in source order.
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Program { statements }
    }

    /// Function declarations, in source order.
    pub fn functions(&self) -> impl Iterator<Item = &Stmt> {
        self.statements
            .iter()
            .filter(|s| matches!(s, Stmt::Function { .. }))
    }

    /// Everything that runs from the entry point.
    pub fn main(&self) -> impl Iterator<Item = &Stmt> {
        self.statements
            .iter()
            .filter(|s| !matches!(s, Stmt::Function { .. }))
    }
}
