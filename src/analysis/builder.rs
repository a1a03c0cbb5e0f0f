//! Symbol table construction
//!
//! One pass over the AST that creates scopes and declares symbols for every
//! declaration kind. Explicitly typed declarations are mapped to IR types
//! immediately; `var` declarations are recorded Unresolved with their
//! initializer for the resolver. Declaration failures are reported and
//! skipped so one walk surfaces as many errors as possible.

use log::debug;

use crate::ast::{
    Block, CompilationUnit, EnumDecl, FunctionDecl, Ident, InterfaceDecl, Item, ItemKind,
    MemberKind, NamespaceDecl, Param, Stmt, StmtKind, TypeDecl, VariableDecl,
};
use crate::errors::{Diagnostics, SourceSpan};
use crate::ir::IrType;

use super::scope::SymbolKind;
use super::table::SymbolTable;

/// Build the scope graph for a compilation unit
///
/// The table is cleared first; diagnostics for duplicate or unmappable
/// declarations go into the sink and the walk continues past them.
pub fn build_symbol_table<'a>(
    table: &mut SymbolTable<'a>,
    unit: &'a CompilationUnit,
    diagnostics: &mut Diagnostics,
) {
    table.clear();
    let mut builder = SymbolTableBuilder { table, diagnostics };
    builder.visit_unit(unit);
    debug!("symbol table built: {} scopes", builder.table.scope_count());
}

struct SymbolTableBuilder<'t, 'a> {
    table: &'t mut SymbolTable<'a>,
    diagnostics: &'t mut Diagnostics,
}

impl<'t, 'a> SymbolTableBuilder<'t, 'a> {
    fn visit_unit(&mut self, unit: &'a CompilationUnit) {
        for item in &unit.items {
            self.visit_item(item);
        }
    }

    fn visit_item(&mut self, item: &'a Item) {
        match &item.kind {
            ItemKind::Type(decl) => self.visit_type_decl(decl),
            ItemKind::Interface(decl) => self.visit_interface_decl(decl),
            ItemKind::Enum(decl) => self.visit_enum_decl(decl),
            ItemKind::Function(decl) => self.visit_function(decl),
            ItemKind::Variable(decl) => self.visit_variable(decl),
            ItemKind::Namespace(decl) => self.visit_namespace(decl),
            ItemKind::Statement(stmt) => self.visit_stmt(stmt),
        }
    }

    fn visit_type_decl(&mut self, decl: &'a TypeDecl) {
        let spelling = if decl.is_ref_type() { "ref type" } else { "type" };
        // Classes are reference-shaped to the backend; a declaration that
        // fails is skipped as a whole, members included
        if !self.declare(&decl.name, SymbolKind::Class, IrType::Ptr, spelling) {
            return;
        }
        if !self.enter_decl_scope(&decl.name.name, decl.name.span) {
            return;
        }
        for member in &decl.members {
            match &member.kind {
                MemberKind::Function(func) => {
                    self.visit_member_function(func, &decl.name.name)
                }
                MemberKind::Variable(var) => self.visit_variable(var),
            }
        }
        self.table.exit_scope();
    }

    fn visit_interface_decl(&mut self, decl: &'a InterfaceDecl) {
        if !self.declare(&decl.name, SymbolKind::Class, IrType::Ptr, "interface") {
            return;
        }
        if !self.enter_decl_scope(&decl.name.name, decl.name.span) {
            return;
        }
        for member in &decl.members {
            match &member.kind {
                MemberKind::Function(func) => self.visit_function(func),
                MemberKind::Variable(var) => self.visit_variable(var),
            }
        }
        self.table.exit_scope();
    }

    fn visit_enum_decl(&mut self, decl: &'a EnumDecl) {
        if !self.declare(&decl.name, SymbolKind::Enum, IrType::I32, "enum") {
            return;
        }
        if !self.enter_decl_scope(&decl.name.name, decl.name.span) {
            return;
        }
        for case in &decl.cases {
            self.declare(&case.name, SymbolKind::Variable, IrType::I32, "enum case");
        }
        for method in &decl.methods {
            self.visit_function(method);
        }
        self.table.exit_scope();
    }

    fn visit_function(&mut self, func: &'a FunctionDecl) {
        let return_spelling = return_spelling(func);
        let return_type = match self.table.type_from_name(&return_spelling) {
            Ok(ty) => ty,
            Err(err) => {
                let span = func
                    .return_type
                    .as_ref()
                    .map(|t| t.span)
                    .unwrap_or(func.name.span);
                self.diagnostics.report_at(err, span);
                return;
            }
        };
        if !self.declare(&func.name, SymbolKind::Function, return_type, &return_spelling) {
            return;
        }
        if !self.enter_decl_scope(&func.name.name, func.name.span) {
            return;
        }
        self.visit_params(&func.params);
        if let Some(body) = &func.body {
            // The function scope doubles as the body's block scope
            for stmt in &body.stmts {
                self.visit_stmt(stmt);
            }
        }
        self.table.exit_scope();
    }

    fn visit_member_function(&mut self, func: &'a FunctionDecl, owner: &str) {
        let return_spelling = return_spelling(func);
        let return_type = match self.table.type_from_name(&return_spelling) {
            Ok(ty) => ty,
            Err(err) => {
                let span = func
                    .return_type
                    .as_ref()
                    .map(|t| t.span)
                    .unwrap_or(func.name.span);
                self.diagnostics.report_at(err, span);
                return;
            }
        };
        // The symbol lives in the owner's type scope; the body scope gets
        // the qualified name so sibling methods cannot collide.
        if !self.declare(&func.name, SymbolKind::Function, return_type, &return_spelling) {
            return;
        }
        let scope_name = format!("{}::{}", owner, func.name.name);
        if !self.enter_decl_scope(scope_name, func.name.span) {
            return;
        }

        let this_type = match self.table.type_from_name(owner) {
            Ok(ty) => IrType::ptr_to(ty),
            // The owner's own declaration failure was already diagnosed
            Err(_) => IrType::Ptr,
        };
        if let Err(err) =
            self.table
                .declare_symbol("this", SymbolKind::Parameter, this_type, format!("{}*", owner))
        {
            self.diagnostics.report_at(err, func.name.span);
        }

        self.visit_params(&func.params);
        if let Some(body) = &func.body {
            for stmt in &body.stmts {
                self.visit_stmt(stmt);
            }
        }
        self.table.exit_scope();
    }

    fn visit_params(&mut self, params: &'a [Param]) {
        for param in params {
            let spelling = param.ty.to_string();
            match self.table.type_from_name(&spelling) {
                Ok(ty) => {
                    self.declare(&param.name, SymbolKind::Parameter, ty, &spelling);
                }
                Err(err) => self.diagnostics.report_at(err, param.ty.span),
            }
        }
    }

    fn visit_variable(&mut self, var: &'a VariableDecl) {
        match &var.ty {
            Some(ty) => {
                let spelling = ty.to_string();
                let data_type = match self.table.type_from_name(&spelling) {
                    Ok(ty) => ty,
                    Err(err) => {
                        self.diagnostics.report_at(err, ty.span);
                        return;
                    }
                };
                // One symbol per declared name, all sharing the type
                for name in &var.names {
                    self.declare(name, SymbolKind::Variable, data_type.clone(), &spelling);
                }
            }
            None => {
                for name in &var.names {
                    if let Err(err) = self.table.declare_unresolved_symbol(
                        &name.name,
                        SymbolKind::Variable,
                        var.initializer.as_ref(),
                    ) {
                        self.diagnostics.report_at(err, name.span);
                    }
                }
            }
        }
    }

    fn visit_namespace(&mut self, decl: &'a NamespaceDecl) {
        self.table.enter_scope();
        for stmt in &decl.body.stmts {
            self.visit_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::Variable(var) => self.visit_variable(var),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                // `if` opens no scope of its own; a block child does
                self.visit_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch);
                }
            }
            StmtKind::While { body, .. } => self.visit_stmt(body),
            StmtKind::For { init, body, .. } => {
                self.table.enter_scope();
                if let Some(init) = init {
                    self.visit_stmt(init);
                }
                self.visit_stmt(body);
                self.table.exit_scope();
            }
            // The builder only descends into statements that can declare
            StmtKind::Expr(_) | StmtKind::Return(_) => {}
        }
    }

    fn visit_block(&mut self, block: &'a Block) {
        self.table.enter_scope();
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn declare(&mut self, name: &Ident, kind: SymbolKind, data_type: IrType, type_name: &str) -> bool {
        match self
            .table
            .declare_symbol(&name.name, kind, data_type, type_name)
        {
            Ok(()) => true,
            Err(err) => {
                self.diagnostics.report_at(err, name.span);
                false
            }
        }
    }

    fn enter_decl_scope(&mut self, scope_name: impl Into<String>, span: SourceSpan) -> bool {
        match self.table.enter_named_scope(scope_name) {
            Ok(_) => true,
            Err(err) => {
                self.diagnostics.report_at(err, span);
                false
            }
        }
    }
}

fn return_spelling(func: &FunctionDecl) -> String {
    func.return_type
        .as_ref()
        .map(|ty| ty.to_string())
        .unwrap_or_else(|| "void".into())
}
