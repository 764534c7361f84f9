use super::labels::LabelAllocator;
use super::symbol::{Symbol, SymbolKind};
use std::collections::HashMap;

/// Handle to one scope in a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The global scope every table starts with.
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone)]
struct Scope {
    prefix: String,
    parent: Option<ScopeId>,
    /// Declaration order is kept so the emitted data section is stable.
    entries: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl Scope {
    fn new(prefix: String, parent: Option<ScopeId>) -> Self {
        Scope {
            prefix,
            parent,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

/// Scoped mapping from names to storage cells and labels.
///
/// Scopes live in an arena and point at their parent by index. Lookup walks
/// from a scope outwards to the root. The table also owns the compilation's
/// [`LabelAllocator`].
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    labels: LabelAllocator,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new("global".to_string(), None)],
            labels: LabelAllocator::new(),
        }
    }

    pub fn add_scope(&mut self, prefix: impl Into<String>, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope::new(prefix.into(), Some(parent)));
        ScopeId(self.scopes.len() - 1)
    }

    pub fn prefix(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].prefix
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId)
    }

    pub fn symbols(&self, scope: ScopeId) -> &[Symbol] {
        &self.scopes[scope.0].entries
    }

    pub fn labels(&self) -> &LabelAllocator {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut LabelAllocator {
        &mut self.labels
    }

    /// Insert `name` into `scope` unless it is already there.
    ///
    /// Variables always start at zero whatever `value` says. Returns whether
    /// a new entry was created.
    pub fn add_symbol(&mut self, scope: ScopeId, name: &str, kind: SymbolKind, value: i64) -> bool {
        let table = &mut self.scopes[scope.0];
        if table.index.contains_key(name) {
            return false;
        }

        let initial_value = match kind {
            SymbolKind::Variable => 0,
            _ => value,
        };
        table.index.insert(name.to_string(), table.entries.len());
        table.entries.push(Symbol {
            name: name.to_string(),
            kind,
            initial_value,
        });
        true
    }

    /// Find `name` starting at `scope`, returning the symbol and the scope
    /// that owns it.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<(&Symbol, ScopeId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = &self.scopes[id.0];
            if let Some(symbol) = table.get(name) {
                return Some((symbol, id));
            }
            current = table.parent;
        }
        None
    }

    /// The assembly label for `name` as seen from `scope`.
    ///
    /// The prefix comes from the owning scope, not the requesting one.
    pub fn label_for(&self, scope: ScopeId, name: &str) -> Option<String> {
        let (symbol, owner) = self.resolve(scope, name)?;
        Some(self.derive_label(symbol, owner))
    }

    fn derive_label(&self, symbol: &Symbol, owner: ScopeId) -> String {
        self.access_label(symbol.kind, &symbol.name, owner)
    }

    fn access_label(&self, kind: SymbolKind, name: &str, owner: ScopeId) -> String {
        if kind.is_scoped() {
            format!("{}_{}", self.prefix(owner), name)
        } else if kind == SymbolKind::FunctionIdentifier {
            format!("{}_start", name)
        } else {
            name.to_string()
        }
    }

    /// Canonical in-scope name for a new symbol of `kind`.
    ///
    /// `key` is the literal's value or the variable/function name; counter
    /// kinds ignore it and draw the next id.
    pub fn fresh_label(&mut self, kind: SymbolKind, key: &str) -> String {
        match kind {
            SymbolKind::IntegerLiteral => match key.strip_prefix('-') {
                Some(magnitude) => format!("literal_neg{}", magnitude),
                None => format!("literal_{}", key),
            },
            SymbolKind::Variable => format!("var_{}", key),
            SymbolKind::FunctionIdentifier => format!("func_{}", key),
            SymbolKind::TempCalc => format!("temp_{}", self.labels.next_temp()),
            SymbolKind::LoopLabel => format!("loop_{}", self.labels.next_loop()),
            SymbolKind::IfLabel => format!("if_{}", self.labels.next_if()),
        }
    }

    /// Get or create the symbol for (`kind`, `key`) and return its access
    /// label, ready to use as an operand.
    ///
    /// Literals always go to the root scope so each value has one cell per
    /// program. Variables already visible from `scope` are reused; new ones
    /// land in `scope`.
    pub fn intern(&mut self, scope: ScopeId, kind: SymbolKind, key: &str, value: i64) -> String {
        let scope = match kind {
            SymbolKind::IntegerLiteral | SymbolKind::FunctionIdentifier => ScopeId::ROOT,
            _ => scope,
        };
        let name = self.fresh_label(kind, key);

        if let Some(label) = self.label_for(scope, &name) {
            return label;
        }
        self.add_symbol(scope, &name, kind, value);
        self.access_label(kind, &name, scope)
    }

    pub fn intern_literal(&mut self, value: i64) -> String {
        self.intern(ScopeId::ROOT, SymbolKind::IntegerLiteral, &value.to_string(), value)
    }

    pub fn intern_variable(&mut self, scope: ScopeId, name: &str) -> String {
        self.intern(scope, SymbolKind::Variable, name, 0)
    }

    /// Variable label if `name` is visible from `scope`.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<String> {
        self.label_for(scope, &format!("var_{}", name))
    }

    /// Declare `name` directly in `scope`, shadowing any outer variable.
    pub fn declare_local(&mut self, scope: ScopeId, name: &str) -> String {
        let canonical = format!("var_{}", name);
        self.add_symbol(scope, &canonical, SymbolKind::Variable, 0);
        format!("{}_{}", self.prefix(scope), canonical)
    }

    pub fn fresh_temp(&mut self, scope: ScopeId) -> String {
        self.intern(scope, SymbolKind::TempCalc, "", 0)
    }

    pub fn fresh_loop(&mut self, scope: ScopeId) -> String {
        self.intern(scope, SymbolKind::LoopLabel, "", 0)
    }

    pub fn fresh_if(&mut self, scope: ScopeId) -> String {
        self.intern(scope, SymbolKind::IfLabel, "", 0)
    }

    /// `label DAT value` lines for every storage symbol owned by `scope`.
    pub fn emit_declarations(&self, scope: ScopeId) -> Vec<String> {
        self.symbols(scope)
            .iter()
            .filter(|s| s.kind.has_storage())
            .map(|s| format!("{} DAT {}", self.derive_label(s, scope), s.initial_value))
            .collect()
    }

    /// Declarations of every scope, root first.
    pub fn emit_all_declarations(&self) -> Vec<String> {
        self.scope_ids()
            .flat_map(|id| self.emit_declarations(id))
            .collect()
    }
}
