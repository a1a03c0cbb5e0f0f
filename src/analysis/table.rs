//! The scope graph
//!
//! [`SymbolTable`] owns every scope created for a compilation unit. Scopes
//! are stored densely in creation order and refer to their parents by id,
//! so the graph never holds owning back references. Two access modes exist:
//! the build cursor used while walking the AST top-down, and the navigation
//! stack used by later passes to look names up through lexical nesting.

use std::collections::HashMap;
use std::fmt;

use log::{debug, error, warn};

use crate::ast::Expr;
use crate::errors::{SemanticError, SemanticResult};
use crate::ir::{IrType, StructLayout};

use super::resolver::extract_dependencies;
use super::scope::{ResolutionState, Scope, ScopeId, Symbol, SymbolKind};

/// Id of the global scope, created at construction
pub const GLOBAL_SCOPE: ScopeId = 0;

/// Persistent, named scope graph with symbol storage
#[derive(Debug)]
pub struct SymbolTable<'a> {
    /// All scopes, indexed by id in creation order
    scopes: Vec<Scope<'a>>,
    /// Name index over named scopes; names are globally unique within it
    scope_names: HashMap<String, ScopeId>,
    /// Current parent during the build phase
    build_scope: ScopeId,
    /// Navigation stack for lookups; bottom is always the global scope
    nav_stack: Vec<ScopeId>,
}

impl<'a> SymbolTable<'a> {
    /// Create a graph holding only the global scope
    pub fn new() -> Self {
        let mut table = Self {
            scopes: Vec::new(),
            scope_names: HashMap::new(),
            build_scope: GLOBAL_SCOPE,
            nav_stack: Vec::new(),
        };
        table.install_global_scope();
        table
    }

    /// Reset to a single global scope
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.scope_names.clear();
        self.nav_stack.clear();
        self.build_scope = GLOBAL_SCOPE;
        self.install_global_scope();
    }

    fn install_global_scope(&mut self) {
        self.scopes.push(Scope::new(GLOBAL_SCOPE, "global", None));
        self.scope_names.insert("global".into(), GLOBAL_SCOPE);
        self.nav_stack.push(GLOBAL_SCOPE);
    }

    // === Build phase ===

    /// Create an anonymous scope under the build cursor and move into it
    pub fn enter_scope(&mut self) -> ScopeId {
        let name = format!("scope_{}", self.scopes.len());
        self.create_scope(name)
    }

    /// Create a named scope under the build cursor and move into it
    ///
    /// The name is registered in the global name index. A name that is
    /// already registered is rejected: no scope is created, the cursor
    /// stays put, and only [`clear`](Self::clear) frees the name for
    /// reuse.
    pub fn enter_named_scope(&mut self, name: impl Into<String>) -> SemanticResult<ScopeId> {
        let name = name.into();
        if let Some(&existing) = self.scope_names.get(&name) {
            warn!(
                "scope name '{}' already registered to scope {}; rejecting duplicate",
                name, existing
            );
            return Err(SemanticError::DuplicateScope(name));
        }
        Ok(self.create_scope(name))
    }

    fn create_scope(&mut self, name: String) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(id, name.clone(), Some(self.build_scope)));
        // Vacant for named scopes (the caller checked); a synthesized
        // anonymous name never displaces an existing registration
        self.scope_names.entry(name).or_insert(id);
        self.build_scope = id;
        debug!("entered scope {} '{}'", id, self.scopes[id].name);
        id
    }

    /// Move the build cursor back to the parent scope; no-op at global
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.build_scope].parent {
            self.build_scope = parent;
        }
    }

    /// Declare an explicitly typed symbol in the build-cursor scope
    pub fn declare_symbol(
        &mut self,
        name: impl Into<String>,
        kind: SymbolKind,
        data_type: IrType,
        type_name: impl Into<String>,
    ) -> SemanticResult<()> {
        let scope = self.build_scope;
        self.scopes[scope].define(Symbol::resolved(name, kind, data_type, type_name, scope))
    }

    /// Declare a symbol whose type will be inferred from its initializer
    ///
    /// The symbol starts Unresolved with a placeholder type; the names its
    /// initializer references are recorded as dependencies.
    pub fn declare_unresolved_symbol(
        &mut self,
        name: impl Into<String>,
        kind: SymbolKind,
        initializer: Option<&'a Expr>,
    ) -> SemanticResult<()> {
        let scope = self.build_scope;
        let dependencies = initializer.map(extract_dependencies).unwrap_or_default();
        self.scopes[scope].define(Symbol::unresolved(
            name,
            kind,
            scope,
            initializer,
            dependencies,
        ))
    }

    /// Id of the scope the build cursor currently points at
    pub fn build_scope_id(&self) -> ScopeId {
        self.build_scope
    }

    // === Navigation ===

    /// Push a scope onto the navigation stack by name
    pub fn push_scope(&mut self, name: &str) -> SemanticResult<ScopeId> {
        let id = self
            .find_scope_by_name(name)
            .ok_or_else(|| SemanticError::InvalidScope(name.into()))?;
        self.nav_stack.push(id);
        Ok(id)
    }

    /// Push a scope onto the navigation stack by id
    pub fn push_scope_id(&mut self, id: ScopeId) -> SemanticResult<ScopeId> {
        if id >= self.scopes.len() {
            return Err(SemanticError::InvalidScope(id.to_string()));
        }
        self.nav_stack.push(id);
        Ok(id)
    }

    /// Pop the top of the navigation stack; the global scope always remains
    pub fn pop_scope(&mut self) {
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    /// Reset the navigation stack to just the global scope
    pub fn reset_navigation(&mut self) {
        self.nav_stack.clear();
        self.nav_stack.push(GLOBAL_SCOPE);
    }

    // === Queries ===

    /// Look a name up through the navigation stack, top to bottom
    ///
    /// Inside a member-function scope (`Owner::func`), a miss in the scope
    /// itself falls back to the owner type's fields before anything deeper
    /// in the stack is consulted, so unqualified field access wins over
    /// same-named symbols in outer scopes.
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol<'a>> {
        let top = self.nav_stack.len() - 1;
        for (depth, &scope_id) in self.nav_stack.iter().enumerate().rev() {
            let scope = &self.scopes[scope_id];
            if let Some(symbol) = scope.get(name) {
                return Some(symbol);
            }
            if depth == top {
                if let Some(symbol) = self.owner_field_fallback(scope, name) {
                    return Some(symbol);
                }
            }
        }
        None
    }

    fn owner_field_fallback(&self, scope: &Scope<'a>, name: &str) -> Option<&Symbol<'a>> {
        let (owner, _) = scope.name.split_once("::")?;
        let owner_id = self.find_scope_by_name(owner)?;
        self.scopes[owner_id]
            .get(name)
            .filter(|symbol| symbol.kind == SymbolKind::Variable)
    }

    /// Look a name up in the navigation stack's top scope only
    pub fn lookup_symbol_current_scope(&self, name: &str) -> Option<&Symbol<'a>> {
        self.scopes[self.current_scope_id()].get(name)
    }

    /// Look a name up in one exact scope
    pub fn lookup_symbol_in_scope(&self, id: ScopeId, name: &str) -> Option<&Symbol<'a>> {
        self.scopes.get(id)?.get(name)
    }

    /// Look a name up starting from `scope_id` and walking parent links
    ///
    /// This is the resolver's lookup: symbols are searched in their
    /// declaring scope's lexical chain, independent of the navigation
    /// stack.
    pub fn lookup_symbol_in_context(&self, name: &str, scope_id: ScopeId) -> Option<&Symbol<'a>> {
        let mut cursor = (scope_id < self.scopes.len()).then_some(scope_id);
        while let Some(id) = cursor {
            let scope = &self.scopes[id];
            if let Some(symbol) = scope.get(name) {
                return Some(symbol);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Whether `lookup_symbol` would find the name
    pub fn symbol_exists(&self, name: &str) -> bool {
        self.lookup_symbol(name).is_some()
    }

    /// Whether the navigation stack's top scope declares the name
    pub fn symbol_exists_current_scope(&self, name: &str) -> bool {
        self.lookup_symbol_current_scope(name).is_some()
    }

    /// All symbols of one scope, in declaration order
    pub fn symbols_of(&self, id: ScopeId) -> impl Iterator<Item = &Symbol<'a>> {
        self.scopes.get(id).into_iter().flat_map(|s| s.symbols())
    }

    /// Resolve a scope name through the global name index
    pub fn find_scope_by_name(&self, name: &str) -> Option<ScopeId> {
        self.scope_names.get(name).copied()
    }

    /// Id of the navigation stack's top scope
    pub fn current_scope_id(&self) -> ScopeId {
        *self
            .nav_stack
            .last()
            .expect("navigation stack should never be empty")
    }

    /// Name of the navigation stack's top scope
    pub fn current_scope_name(&self) -> &str {
        &self.scopes[self.current_scope_id()].name
    }

    /// Read access to one scope
    pub fn scope(&self, id: ScopeId) -> Option<&Scope<'a>> {
        self.scopes.get(id)
    }

    /// All scopes in creation order
    pub fn scopes(&self) -> impl Iterator<Item = &Scope<'a>> {
        self.scopes.iter()
    }

    /// Number of scopes in the graph
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub(super) fn symbol_mut(&mut self, scope_id: ScopeId, name: &str) -> Option<&mut Symbol<'a>> {
        self.scopes.get_mut(scope_id)?.get_mut(name)
    }

    // === Type mapping ===

    /// Map a source-level type name onto its IR type
    ///
    /// Primitive names take precedence unconditionally; `string` and array
    /// spellings lower to the untyped pointer. Any other name must resolve
    /// to a class (materializing its struct layout from the fields of the
    /// scope of the same name) or an enum (an `i32`).
    pub fn type_from_name(&self, name: &str) -> SemanticResult<IrType> {
        if name.ends_with("[]") {
            // Element type stays textual; arrays lower to pointers
            return Ok(IrType::Ptr);
        }

        match name {
            "i8" => Ok(IrType::I8),
            "i16" => Ok(IrType::I16),
            "i32" => Ok(IrType::I32),
            "i64" => Ok(IrType::I64),
            "f32" => Ok(IrType::F32),
            "f64" => Ok(IrType::F64),
            "bool" => Ok(IrType::Bool),
            "void" => Ok(IrType::Void),
            "ptr" => Ok(IrType::Ptr),
            // The runtime's string record lives behind a pointer
            "string" => Ok(IrType::Ptr),
            _ => self.user_type_from_name(name),
        }
    }

    fn user_type_from_name(&self, name: &str) -> SemanticResult<IrType> {
        let symbol = self
            .lookup_symbol(name)
            .ok_or_else(|| SemanticError::UnknownType(name.into()))?;
        match symbol.kind {
            SymbolKind::Class => {
                let Some(scope_id) = self.find_scope_by_name(name) else {
                    error!("no scope found for class type '{}'", name);
                    return Ok(IrType::Ptr);
                };
                let fields = self.scopes[scope_id]
                    .symbols()
                    .filter(|s| s.kind == SymbolKind::Variable)
                    .map(|s| (s.name.clone(), s.data_type.clone()));
                Ok(IrType::Struct(StructLayout::compute(name, fields)))
            }
            SymbolKind::Enum => Ok(IrType::I32),
            _ => Err(SemanticError::UnknownType(name.into())),
        }
    }

    /// Whether any symbol in the graph is not yet Resolved
    pub fn has_unresolved_symbols(&self) -> bool {
        self.scopes
            .iter()
            .flat_map(|s| s.symbols())
            .any(|s| s.state != ResolutionState::Resolved)
    }
}

impl<'a> Default for SymbolTable<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> fmt::Display for SymbolTable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in &self.scopes {
            match scope.parent {
                Some(parent) => writeln!(f, "scope {}: \"{}\" (parent: {})", scope.id, scope.name, parent)?,
                None => writeln!(f, "scope {}: \"{}\"", scope.id, scope.name)?,
            }
            if scope.is_empty() {
                writeln!(f, "  (empty)")?;
            }
            for symbol in scope.symbols() {
                writeln!(
                    f,
                    "  {:<20} {:<10} {:<12} {}",
                    symbol.name, symbol.kind, symbol.type_name, symbol.state
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declare_var(table: &mut SymbolTable<'_>, name: &str, ty: IrType, spelling: &str) {
        table
            .declare_symbol(name, SymbolKind::Variable, ty, spelling)
            .unwrap();
    }

    #[test]
    fn test_new_table_has_global_scope() {
        let table = SymbolTable::new();
        assert_eq!(table.scope_count(), 1);
        assert_eq!(table.current_scope_id(), GLOBAL_SCOPE);
        assert_eq!(table.current_scope_name(), "global");
        assert_eq!(table.find_scope_by_name("global"), Some(GLOBAL_SCOPE));
    }

    #[test]
    fn test_enter_exit_restores_cursor() {
        let mut table = SymbolTable::new();
        let before = table.build_scope_id();
        let id = table.enter_named_scope("Main").unwrap();
        assert_eq!(table.build_scope_id(), id);
        table.exit_scope();
        assert_eq!(table.build_scope_id(), before);
    }

    #[test]
    fn test_exit_scope_at_global_is_noop() {
        let mut table = SymbolTable::new();
        table.exit_scope();
        assert_eq!(table.build_scope_id(), GLOBAL_SCOPE);
    }

    #[test]
    fn test_scope_ids_are_dense_and_parent_precedes_child() {
        let mut table = SymbolTable::new();
        table.enter_named_scope("A").unwrap();
        table.enter_scope();
        table.exit_scope();
        table.enter_scope();
        table.exit_scope();
        table.exit_scope();
        for scope in table.scopes() {
            if let Some(parent) = scope.parent {
                assert!(parent < scope.id);
            } else {
                assert_eq!(scope.id, GLOBAL_SCOPE);
            }
        }
        let ids: Vec<_> = table.scopes().map(|s| s.id).collect();
        assert_eq!(ids, [0, 1, 2, 3]);
    }

    #[test]
    fn test_anonymous_scope_names() {
        let mut table = SymbolTable::new();
        let id = table.enter_scope();
        assert_eq!(table.scope(id).unwrap().name, format!("scope_{}", id));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut table = SymbolTable::new();
        declare_var(&mut table, "x", IrType::I32, "i32");
        let err = table
            .declare_symbol("x", SymbolKind::Variable, IrType::I32, "i32")
            .unwrap_err();
        assert_eq!(
            err,
            SemanticError::DuplicateSymbol {
                scope: GLOBAL_SCOPE,
                name: "x".into()
            }
        );
        assert_eq!(table.symbols_of(GLOBAL_SCOPE).count(), 1);
    }

    #[test]
    fn test_push_pop_navigation_round_trip() {
        let mut table = SymbolTable::new();
        table.enter_named_scope("Main").unwrap();
        table.exit_scope();

        let before: Vec<_> = vec![table.current_scope_id()];
        let id = table.push_scope("Main").unwrap();
        assert_eq!(table.current_scope_id(), id);
        table.pop_scope();
        assert_eq!(vec![table.current_scope_id()], before);
    }

    #[test]
    fn test_pop_never_removes_global() {
        let mut table = SymbolTable::new();
        table.pop_scope();
        table.pop_scope();
        assert_eq!(table.current_scope_id(), GLOBAL_SCOPE);
    }

    #[test]
    fn test_push_unknown_scope_fails() {
        let mut table = SymbolTable::new();
        assert_eq!(
            table.push_scope("Nowhere").unwrap_err(),
            SemanticError::InvalidScope("Nowhere".into())
        );
        assert_eq!(
            table.push_scope_id(99).unwrap_err(),
            SemanticError::InvalidScope("99".into())
        );
    }

    #[test]
    fn test_reset_navigation() {
        let mut table = SymbolTable::new();
        table.enter_named_scope("Main").unwrap();
        table.exit_scope();
        table.push_scope("Main").unwrap();
        table.reset_navigation();
        assert_eq!(table.current_scope_id(), GLOBAL_SCOPE);
    }

    #[test]
    fn test_lookup_walks_navigation_stack() {
        let mut table = SymbolTable::new();
        declare_var(&mut table, "g", IrType::I32, "i32");
        table.enter_named_scope("Main").unwrap();
        declare_var(&mut table, "local", IrType::Bool, "bool");
        table.exit_scope();

        table.push_scope("Main").unwrap();
        assert!(table.lookup_symbol("local").is_some());
        assert!(table.lookup_symbol("g").is_some());
        assert!(table.lookup_symbol("missing").is_none());
        assert!(table.symbol_exists("g"));
        assert!(!table.symbol_exists_current_scope("g"));
    }

    #[test]
    fn test_member_function_fallback_finds_owner_field() {
        let mut table = SymbolTable::new();
        table
            .declare_symbol("Player", SymbolKind::Class, IrType::Ptr, "type")
            .unwrap();
        table.enter_named_scope("Player").unwrap();
        declare_var(&mut table, "b", IrType::I32, "i32");
        table.enter_named_scope("Player::GetX").unwrap();
        table.exit_scope();
        table.exit_scope();

        table.push_scope("Player").unwrap();
        table.push_scope("Player::GetX").unwrap();
        let symbol = table.lookup_symbol("b").expect("field should be visible");
        assert_eq!(symbol.kind, SymbolKind::Variable);
        assert_eq!(symbol.scope, table.find_scope_by_name("Player").unwrap());
    }

    #[test]
    fn test_member_function_fallback_beats_outer_scope() {
        let mut table = SymbolTable::new();
        // Global declares a function 'b'; the owner type declares field 'b'.
        table
            .declare_symbol("b", SymbolKind::Function, IrType::Void, "void")
            .unwrap();
        table
            .declare_symbol("Player", SymbolKind::Class, IrType::Ptr, "type")
            .unwrap();
        table.enter_named_scope("Player").unwrap();
        declare_var(&mut table, "b", IrType::I32, "i32");
        table.enter_named_scope("Player::GetX").unwrap();
        table.exit_scope();
        table.exit_scope();

        table.push_scope("Player::GetX").unwrap();
        let symbol = table.lookup_symbol("b").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_fallback_ignores_owner_functions() {
        let mut table = SymbolTable::new();
        table
            .declare_symbol("Player", SymbolKind::Class, IrType::Ptr, "type")
            .unwrap();
        table.enter_named_scope("Player").unwrap();
        table
            .declare_symbol("helper", SymbolKind::Function, IrType::Void, "void")
            .unwrap();
        table.enter_named_scope("Player::GetX").unwrap();
        table.exit_scope();
        table.exit_scope();

        table.push_scope("Player::GetX").unwrap();
        // Not on the stack and not a field, so the fallback must not
        // surface it.
        assert!(table.lookup_symbol("helper").is_none());
    }

    #[test]
    fn test_lookup_in_context_walks_parent_chain() {
        let mut table = SymbolTable::new();
        declare_var(&mut table, "g", IrType::I32, "i32");
        table.enter_named_scope("Main").unwrap();
        let inner = table.enter_scope();
        declare_var(&mut table, "x", IrType::Bool, "bool");
        table.exit_scope();
        table.exit_scope();

        assert!(table.lookup_symbol_in_context("x", inner).is_some());
        assert!(table.lookup_symbol_in_context("g", inner).is_some());
        assert!(table.lookup_symbol_in_context("x", GLOBAL_SCOPE).is_none());
        assert!(table.lookup_symbol_in_context("g", 99).is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut table = SymbolTable::new();
        declare_var(&mut table, "x", IrType::I32, "i32");
        table.enter_named_scope("Main").unwrap();
        table.push_scope("Main").unwrap();
        table.clear();
        assert_eq!(table.scope_count(), 1);
        assert_eq!(table.current_scope_id(), GLOBAL_SCOPE);
        assert_eq!(table.build_scope_id(), GLOBAL_SCOPE);
        assert!(table.lookup_symbol("x").is_none());
        assert_eq!(table.find_scope_by_name("Main"), None);
    }

    #[test]
    fn test_type_from_name_primitives() {
        let table = SymbolTable::new();
        assert_eq!(table.type_from_name("i8").unwrap(), IrType::I8);
        assert_eq!(table.type_from_name("i16").unwrap(), IrType::I16);
        assert_eq!(table.type_from_name("i32").unwrap(), IrType::I32);
        assert_eq!(table.type_from_name("i64").unwrap(), IrType::I64);
        assert_eq!(table.type_from_name("f32").unwrap(), IrType::F32);
        assert_eq!(table.type_from_name("f64").unwrap(), IrType::F64);
        assert_eq!(table.type_from_name("bool").unwrap(), IrType::Bool);
        assert_eq!(table.type_from_name("void").unwrap(), IrType::Void);
        assert_eq!(table.type_from_name("ptr").unwrap(), IrType::Ptr);
    }

    #[test]
    fn test_type_from_name_string_and_arrays() {
        let table = SymbolTable::new();
        assert_eq!(table.type_from_name("string").unwrap(), IrType::Ptr);
        assert_eq!(table.type_from_name("i32[]").unwrap(), IrType::Ptr);
        assert_eq!(table.type_from_name("Player[]").unwrap(), IrType::Ptr);
    }

    #[test]
    fn test_type_from_name_unknown() {
        let table = SymbolTable::new();
        assert_eq!(
            table.type_from_name("Ghost").unwrap_err(),
            SemanticError::UnknownType("Ghost".into())
        );
    }

    #[test]
    fn test_type_from_name_class_builds_layout() {
        let mut table = SymbolTable::new();
        table
            .declare_symbol("Player", SymbolKind::Class, IrType::Ptr, "type")
            .unwrap();
        table.enter_named_scope("Player").unwrap();
        declare_var(&mut table, "b", IrType::I32, "i32");
        declare_var(&mut table, "x", IrType::F32, "f32");
        table
            .declare_symbol("GetX", SymbolKind::Function, IrType::F32, "f32")
            .unwrap();
        table.exit_scope();

        let ty = table.type_from_name("Player").unwrap();
        let layout = ty.layout().expect("class should map to a struct");
        assert_eq!(layout.name, "Player");
        // Functions are not part of the layout
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.fields[0].name, "b");
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].name, "x");
        assert_eq!(layout.fields[1].offset, 4);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn test_type_from_name_enum_is_i32() {
        let mut table = SymbolTable::new();
        table
            .declare_symbol("Color", SymbolKind::Enum, IrType::I32, "enum")
            .unwrap();
        assert_eq!(table.type_from_name("Color").unwrap(), IrType::I32);
    }

    #[test]
    fn test_primitive_names_shadow_user_types() {
        let mut table = SymbolTable::new();
        table
            .declare_symbol("i32", SymbolKind::Class, IrType::Ptr, "type")
            .unwrap();
        assert_eq!(table.type_from_name("i32").unwrap(), IrType::I32);
    }

    #[test]
    fn test_duplicate_scope_name_rejected() {
        let mut table = SymbolTable::new();
        let first = table.enter_named_scope("Player").unwrap();
        table.exit_scope();

        let err = table.enter_named_scope("Player").unwrap_err();
        assert_eq!(err, SemanticError::DuplicateScope("Player".into()));
        // Nothing was allocated and the cursor did not move
        assert_eq!(table.scope_count(), 2);
        assert_eq!(table.build_scope_id(), GLOBAL_SCOPE);
        assert_eq!(table.find_scope_by_name("Player"), Some(first));

        // Only clearing frees the name for reuse
        table.clear();
        assert!(table.enter_named_scope("Player").is_ok());
    }
}
