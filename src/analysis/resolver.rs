//! Iterative type resolution
//!
//! Symbols declared without an explicit type carry their initializer and a
//! list of names it references. [`TypeResolver`] sweeps the scope graph
//! until every such symbol is resolved or no sweep makes progress,
//! recursing through dependencies and detecting cycles with the per-symbol
//! tri-state marker.

use log::debug;

use crate::ast::{Expr, ExprKind, Ident, UnaryOp};
use crate::errors::{Diagnostics, SemanticError};

use super::scope::{ResolutionState, ScopeId, SymbolKind};
use super::table::SymbolTable;

/// Upper bound on resolution sweeps before a cycle is assumed
const MAX_ITERATIONS: usize = 10;

/// Spelling used while an inference has no answer yet
const UNRESOLVED: &str = "unresolved";

/// Resolves the types of all Unresolved symbols in a scope graph
pub struct TypeResolver<'t, 'a> {
    table: &'t mut SymbolTable<'a>,
    cycle_reported: bool,
}

impl<'t, 'a> TypeResolver<'t, 'a> {
    pub fn new(table: &'t mut SymbolTable<'a>) -> Self {
        Self {
            table,
            cycle_reported: false,
        }
    }

    /// Drive inference to a fixed point
    ///
    /// Returns `true` when every symbol ends up Resolved. Failures are
    /// aggregated into the sink: one `CyclicInference` per run at most,
    /// and an `InferenceFailed` per symbol still Unresolved at the end.
    pub fn resolve_all_types(&mut self, diagnostics: &mut Diagnostics) -> bool {
        let mut progress = true;
        let mut iteration = 0;

        while progress && iteration < MAX_ITERATIONS {
            progress = false;
            iteration += 1;
            debug!("type resolution iteration {}", iteration);

            for (scope_id, name) in self.pending_symbols() {
                let still_unresolved = self
                    .table
                    .lookup_symbol_in_scope(scope_id, &name)
                    .is_some_and(|s| s.state == ResolutionState::Unresolved);
                if still_unresolved && self.resolve_in_scope(&name, scope_id, diagnostics) {
                    debug!("resolved '{}'", name);
                    progress = true;
                }
            }
        }

        let unresolved = self.pending_symbols();
        if progress && !unresolved.is_empty() {
            // The graph never settles; everything left is part of the knot.
            if !self.cycle_reported {
                diagnostics.report(SemanticError::CyclicInference(unresolved[0].1.clone()));
            }
            return false;
        }

        let mut all_resolved = true;
        for (_, name) in unresolved {
            diagnostics.report(SemanticError::InferenceFailed(name));
            all_resolved = false;
        }
        all_resolved
    }

    /// Resolve one symbol by name, searching scopes in creation order
    pub fn resolve_symbol_type(&mut self, name: &str, diagnostics: &mut Diagnostics) -> bool {
        let Some(scope_id) = self.find_declaring_scope(name) else {
            return false;
        };
        self.resolve_in_scope(name, scope_id, diagnostics)
    }

    fn find_declaring_scope(&self, name: &str) -> Option<ScopeId> {
        self.table
            .scopes()
            .find_map(|scope| scope.get(name).map(|s| s.scope))
    }

    fn pending_symbols(&self) -> Vec<(ScopeId, String)> {
        self.table
            .scopes()
            .flat_map(|scope| scope.symbols())
            .filter(|s| s.state == ResolutionState::Unresolved)
            .map(|s| (s.scope, s.name.clone()))
            .collect()
    }

    fn set_state(&mut self, scope_id: ScopeId, name: &str, state: ResolutionState) {
        if let Some(symbol) = self.table.symbol_mut(scope_id, name) {
            symbol.state = state;
        }
    }

    fn resolve_in_scope(
        &mut self,
        name: &str,
        scope_id: ScopeId,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let Some(symbol) = self.table.lookup_symbol_in_scope(scope_id, name) else {
            return false;
        };
        match symbol.state {
            ResolutionState::Resolved => return true,
            ResolutionState::Resolving => {
                // Re-entered while already resolving: the initializers
                // form a cycle. State is left untouched.
                if !self.cycle_reported {
                    self.cycle_reported = true;
                    diagnostics.report(SemanticError::CyclicInference(name.into()));
                }
                return false;
            }
            ResolutionState::Unresolved => {}
        }

        let dependencies = symbol.dependencies.clone();
        let initializer = symbol.initializer;
        self.set_state(scope_id, name, ResolutionState::Resolving);

        for dep in &dependencies {
            // A name that resolves to no symbol is left for the inference
            // step to judge.
            let Some(dep_scope) = self
                .table
                .lookup_symbol_in_context(dep, scope_id)
                .map(|s| s.scope)
            else {
                continue;
            };
            if !self.resolve_in_scope(dep, dep_scope, diagnostics) {
                debug!("dependency '{}' of '{}' failed to resolve", dep, name);
                self.set_state(scope_id, name, ResolutionState::Unresolved);
                return false;
            }
        }

        let inferred = match initializer {
            Some(expr) => self.infer_type(expr, scope_id),
            None => UNRESOLVED.to_string(),
        };
        if inferred == UNRESOLVED {
            self.set_state(scope_id, name, ResolutionState::Unresolved);
            return false;
        }

        match self.table.type_from_name(&inferred) {
            Ok(data_type) => {
                let symbol = self
                    .table
                    .symbol_mut(scope_id, name)
                    .expect("symbol was just looked up");
                symbol.data_type = data_type;
                symbol.type_name = inferred;
                symbol.state = ResolutionState::Resolved;
                true
            }
            Err(err) => {
                diagnostics.report(err);
                self.set_state(scope_id, name, ResolutionState::Unresolved);
                false
            }
        }
    }

    /// Infer the type name of an expression, or `"unresolved"`
    ///
    /// `ctx` is the scope the expression is evaluated in; identifier
    /// lookups walk its parent chain.
    pub fn infer_type(&self, expr: &Expr, ctx: ScopeId) -> String {
        match &expr.kind {
            ExprKind::Integer(_) => "i32".into(),
            ExprKind::Float(_) => "f32".into(),
            ExprKind::Bool(_) => "bool".into(),
            ExprKind::Str(_) => "string".into(),
            ExprKind::Binary { op, left, right } => {
                if op.yields_bool() {
                    return "bool".into();
                }
                // Arithmetic takes the type of whichever operand is known
                let left_type = self.infer_type(left, ctx);
                if left_type != UNRESOLVED {
                    return left_type;
                }
                self.infer_type(right, ctx)
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => "bool".into(),
                UnaryOp::Plus | UnaryOp::Minus => self.infer_type(operand, ctx),
            },
            ExprKind::Ident(ident) => {
                match self.table.lookup_symbol_in_context(&ident.name, ctx) {
                    Some(symbol) if symbol.is_resolved() => symbol.type_name.clone(),
                    _ => UNRESOLVED.into(),
                }
            }
            ExprKind::Call { target, .. } => match &target.kind {
                ExprKind::Ident(ident) => {
                    match self.table.lookup_symbol_in_context(&ident.name, ctx) {
                        Some(symbol)
                            if symbol.kind == SymbolKind::Function && symbol.is_resolved() =>
                        {
                            symbol.type_name.clone()
                        }
                        _ => UNRESOLVED.into(),
                    }
                }
                ExprKind::Member { target, member } => {
                    self.member_type(target, member, ctx, true)
                }
                _ => UNRESOLVED.into(),
            },
            ExprKind::Assign { value, .. } => self.infer_type(value, ctx),
            ExprKind::New { ty, .. } => {
                let spelling = ty.to_string();
                match self.table.lookup_symbol_in_context(&spelling, ctx) {
                    Some(symbol)
                        if matches!(symbol.kind, SymbolKind::Class | SymbolKind::Enum) =>
                    {
                        spelling
                    }
                    _ => UNRESOLVED.into(),
                }
            }
            ExprKind::Member { target, member } => self.member_type(target, member, ctx, false),
            ExprKind::This => UNRESOLVED.into(),
        }
    }

    /// Type of `target.member`, via the scope named after the target's type
    fn member_type(
        &self,
        target: &Expr,
        member: &Ident,
        ctx: ScopeId,
        require_function: bool,
    ) -> String {
        let target_type = self.infer_type(target, ctx);
        if target_type == UNRESOLVED {
            return UNRESOLVED.into();
        }
        let Some(type_scope) = self.table.find_scope_by_name(&target_type) else {
            return UNRESOLVED.into();
        };
        match self.table.lookup_symbol_in_scope(type_scope, &member.name) {
            Some(symbol)
                if symbol.is_resolved()
                    && (!require_function || symbol.kind == SymbolKind::Function) =>
            {
                symbol.type_name.clone()
            }
            _ => UNRESOLVED.into(),
        }
    }
}

/// Collect the names an initializer references, in encounter order
///
/// Identifiers, call targets (the receiver for member calls), `new` type
/// names, and everything reachable through operands and arguments count;
/// literals and `this` contribute nothing.
pub fn extract_dependencies(expr: &Expr) -> Vec<String> {
    let mut deps = Vec::new();
    collect_dependencies(expr, &mut deps);
    deps
}

fn collect_dependencies(expr: &Expr, deps: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Ident(ident) => deps.push(ident.name.clone()),
        ExprKind::Binary { left, right, .. } => {
            collect_dependencies(left, deps);
            collect_dependencies(right, deps);
        }
        ExprKind::Unary { operand, .. } => collect_dependencies(operand, deps),
        ExprKind::Call { target, args } => {
            match &target.kind {
                ExprKind::Ident(ident) => deps.push(ident.name.clone()),
                ExprKind::Member { target, .. } => collect_dependencies(target, deps),
                _ => {}
            }
            for arg in args {
                collect_dependencies(arg, deps);
            }
        }
        ExprKind::Assign { value, .. } => collect_dependencies(value, deps),
        ExprKind::New { ty, args } => {
            deps.push(ty.to_string());
            for arg in args {
                collect_dependencies(arg, deps);
            }
        }
        ExprKind::Member { target, .. } => collect_dependencies(target, deps),
        ExprKind::Integer(_)
        | ExprKind::Float(_)
        | ExprKind::Bool(_)
        | ExprKind::Str(_)
        | ExprKind::This => {}
    }
}
