//! Symbols and scopes
//!
//! A [`Scope`] is one named region of source holding a symbol table; a
//! [`Symbol`] is the record for one named entity within it. Both are plain
//! data owned by the scope graph in `table.rs`.

use indexmap::IndexMap;

use crate::ast::Expr;
use crate::errors::SemanticError;
use crate::ir::IrType;

/// Dense identifier of a scope within the graph
pub type ScopeId = usize;

/// Classification of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    Class,
    Parameter,
    Enum,
}

impl SymbolKind {
    /// Human-readable description used in diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Enum => "enum",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol's progress through type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Type not yet determined
    Unresolved,
    /// Currently being resolved (for cycle detection)
    Resolving,
    /// Type fully resolved
    Resolved,
}

impl std::fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResolutionState::Unresolved => "unresolved",
            ResolutionState::Resolving => "resolving",
            ResolutionState::Resolved => "resolved",
        };
        f.write_str(text)
    }
}

/// The record for one named entity within a scope
///
/// The lifetime ties the optional initializer back to the caller-owned AST.
#[derive(Debug, Clone)]
pub struct Symbol<'a> {
    pub name: String,
    pub kind: SymbolKind,
    /// Backend type; a placeholder until `state` reaches `Resolved`
    pub data_type: IrType,
    /// Original source-level spelling, e.g. `Player`, `i32`, `ref type`
    pub type_name: String,
    /// Id of the scope this symbol was declared in
    pub scope: ScopeId,
    pub state: ResolutionState,
    /// Initializer expression for inferred declarations
    pub initializer: Option<&'a Expr>,
    /// Names the initializer references, in encounter order
    pub dependencies: Vec<String>,
}

impl<'a> Symbol<'a> {
    /// Create a symbol with an already-known type
    pub fn resolved(
        name: impl Into<String>,
        kind: SymbolKind,
        data_type: IrType,
        type_name: impl Into<String>,
        scope: ScopeId,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            data_type,
            type_name: type_name.into(),
            scope,
            state: ResolutionState::Resolved,
            initializer: None,
            dependencies: Vec::new(),
        }
    }

    /// Create a symbol whose type must be inferred from its initializer
    pub fn unresolved(
        name: impl Into<String>,
        kind: SymbolKind,
        scope: ScopeId,
        initializer: Option<&'a Expr>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            // Placeholder until inference assigns the real type
            data_type: IrType::I32,
            type_name: "unresolved".into(),
            scope,
            state: ResolutionState::Unresolved,
            initializer,
            dependencies,
        }
    }

    /// Whether inference has completed for this symbol
    pub fn is_resolved(&self) -> bool {
        self.state == ResolutionState::Resolved
    }
}

/// One lexical scope: a name, a parent link, and its symbols
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub id: ScopeId,
    /// Synthetic (`scope_7`), a type name (`Player`), a function name
    /// (`Main`), or a qualified member-function name (`Player::GetDamage`)
    pub name: String,
    /// `None` only for the global scope
    pub parent: Option<ScopeId>,
    symbols: IndexMap<String, Symbol<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(id: ScopeId, name: impl Into<String>, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            symbols: IndexMap::new(),
        }
    }

    /// Insert a symbol; fails if the name already exists in this scope
    pub fn define(&mut self, symbol: Symbol<'a>) -> Result<(), SemanticError> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(SemanticError::DuplicateSymbol {
                scope: self.id,
                name: symbol.name,
            });
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol by name in this scope only
    pub fn get(&self, name: &str) -> Option<&Symbol<'a>> {
        self.symbols.get(name)
    }

    pub(super) fn get_mut(&mut self, name: &str) -> Option<&mut Symbol<'a>> {
        self.symbols.get_mut(name)
    }

    /// All symbols in declaration order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol<'a>> {
        self.symbols.values()
    }

    /// Number of symbols declared here
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether this scope has no symbols
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
