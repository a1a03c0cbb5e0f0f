//! Semantic analysis for Opal
//!
//! This module turns a parsed compilation unit into a fully resolved scope
//! graph: the builder walks the AST and declares every symbol, then the
//! resolver infers the types of `var` declarations. Downstream passes
//! query the resulting [`SymbolTable`] through its navigation stack.

mod builder;
mod resolver;
mod scope;
mod table;

pub use builder::build_symbol_table;
pub use resolver::{extract_dependencies, TypeResolver};
pub use scope::{ResolutionState, Scope, ScopeId, Symbol, SymbolKind};
pub use table::{SymbolTable, GLOBAL_SCOPE};

use crate::ast::CompilationUnit;
use crate::errors::Diagnostics;

/// The outcome of running both analysis phases over one unit
#[derive(Debug)]
pub struct Analysis<'a> {
    /// The populated scope graph; read-only from here on
    pub table: SymbolTable<'a>,
    /// Everything reported by the build and resolve phases
    pub diagnostics: Diagnostics,
    /// Whether every symbol reached the Resolved state; downstream passes
    /// must not run when this is false
    pub resolved: bool,
}

/// Build the symbol table for a unit and resolve all inferred types
pub fn analyze(unit: &CompilationUnit) -> Analysis<'_> {
    let mut table = SymbolTable::new();
    let mut diagnostics = Diagnostics::new();

    build_symbol_table(&mut table, unit, &mut diagnostics);
    let resolved = TypeResolver::new(&mut table).resolve_all_types(&mut diagnostics);

    Analysis {
        table,
        diagnostics,
        resolved,
    }
}
