//! opalc - Semantic analysis core for the Opal scripting language
//!
//! This crate sits between the Opal parser and the code generator: it takes
//! a parsed compilation unit, builds a persistent named scope graph with a
//! symbol record per declared entity, iteratively infers the types of
//! `var` declarations, and maps source-level type names onto the backend IR
//! type system (including computed struct layouts).

pub mod analysis;
pub mod ast;
pub mod errors;
pub mod ir;

// Re-export commonly used types
pub use analysis::{
    analyze, build_symbol_table, Analysis, ResolutionState, Scope, ScopeId, Symbol, SymbolKind,
    SymbolTable, TypeResolver, GLOBAL_SCOPE,
};
pub use errors::{Diagnostic, Diagnostics, SemanticError, SemanticResult, SourceSpan};
pub use ir::{IrType, StructField, StructLayout};
