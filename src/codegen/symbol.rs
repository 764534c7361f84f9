/// What a symbol names, which decides how its label is derived and whether
/// it gets a storage cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A source-level variable or parameter. Label: `{scope}_var_{name}`.
    Variable,
    /// A shared constant cell. Label: `literal_{value}`.
    IntegerLiteral,
    /// An intermediate result cell. Label: `temp_{n}`.
    TempCalc,
    /// Loop anchor prefix. Label: `loop_{n}`; no storage.
    LoopLabel,
    /// If-chain anchor prefix. Label: `if_{n}`; no storage.
    IfLabel,
    /// A declared function. Label: `func_{name}_start`; no storage.
    FunctionIdentifier,
}

impl SymbolKind {
    /// Kinds that occupy a memory cell and get a `DAT` declaration.
    pub fn has_storage(self) -> bool {
        matches!(
            self,
            SymbolKind::Variable | SymbolKind::IntegerLiteral | SymbolKind::TempCalc
        )
    }

    /// Kinds whose label carries the owning scope's prefix.
    pub fn is_scoped(self) -> bool {
        self == SymbolKind::Variable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Canonical name inside its scope, e.g. `var_x`, `literal_5`, `temp_3`.
    pub name: String,
    pub kind: SymbolKind,
    pub initial_value: i64,
}
