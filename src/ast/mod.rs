//! Abstract Syntax Tree (AST) definitions for Opal
//!
//! These types describe the structure of an Opal compilation unit as the
//! upstream parser produces it. The semantic core consumes the tree
//! read-only; symbols keep non-owning references into it, so the AST must
//! outlive the symbol table.

use crate::errors::SourceSpan;

/// A complete Opal compilation unit
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// Top-level declarations and statements, in source order
    pub items: Vec<Item>,
}

/// A top-level item in a compilation unit
#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    /// Type declaration: `type Name { members }` or `ref type Name { ... }`
    Type(TypeDecl),
    /// Interface declaration: `interface Name { members }`
    Interface(InterfaceDecl),
    /// Enum declaration: `enum Name { Case1, Case2 }`
    Enum(EnumDecl),
    /// Free function declaration: `fn name(params) -> RetType { body }`
    Function(FunctionDecl),
    /// Variable declaration: `i32 x = 5;` or `var x = 5;`
    Variable(VariableDecl),
    /// Namespace declaration: `namespace Name { body }`
    Namespace(NamespaceDecl),
    /// A bare statement at the top level
    Statement(Stmt),
}

/// Declaration modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Marks a type as a reference type (heap allocated)
    Ref,
    Static,
    Public,
}

/// A type (class/struct) declaration
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Ident,
    pub modifiers: Vec<Modifier>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    /// Whether the `ref` modifier is present
    pub fn is_ref_type(&self) -> bool {
        self.modifiers.contains(&Modifier::Ref)
    }
}

/// An interface declaration
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Ident,
    pub members: Vec<Member>,
}

/// A member of a type or interface body
#[derive(Debug, Clone)]
pub struct Member {
    pub kind: MemberKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum MemberKind {
    /// A member function (method)
    Function(FunctionDecl),
    /// A field declaration
    Variable(VariableDecl),
}

/// An enum declaration
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Ident,
    pub cases: Vec<EnumCase>,
    pub methods: Vec<FunctionDecl>,
}

/// A single enum case
#[derive(Debug, Clone)]
pub struct EnumCase {
    pub name: Ident,
    pub span: SourceSpan,
}

/// A function declaration
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Ident,
    /// Declared return type; `None` means the source omitted it
    pub return_type: Option<TypeName>,
    pub params: Vec<Param>,
    /// Interfaces declare bodyless signatures
    pub body: Option<Block>,
}

/// A function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeName,
    pub span: SourceSpan,
}

/// A variable declaration, possibly introducing several names
///
/// `i32 a, b, c;` carries three names and one explicit type; `var x = 5;`
/// carries one name, no type, and an initializer to infer from.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub names: Vec<Ident>,
    pub ty: Option<TypeName>,
    pub initializer: Option<Expr>,
    pub span: SourceSpan,
}

/// A namespace declaration
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: Ident,
    pub body: Block,
}

/// A block of statements
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: SourceSpan,
}

/// A statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// A nested block: `{ ... }`
    Block(Block),
    /// A local variable declaration
    Variable(VariableDecl),
    /// Conditional: `if (cond) stmt else stmt`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// Loop: `while (cond) stmt`
    While { condition: Expr, body: Box<Stmt> },
    /// Loop: `for (init; cond; update) stmt`
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// Expression statement
    Expr(Expr),
    /// Return statement with optional value
    Return(Option<Expr>),
}

/// An identifier with source location
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: SourceSpan,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// An expression
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: `42`
    Integer(i64),
    /// Float literal: `1.5`
    Float(f64),
    /// Boolean literal: `true` / `false`
    Bool(bool),
    /// String literal: `"hello"`
    Str(String),
    /// Identifier reference
    Ident(Ident),
    /// Binary operation: `a + b`, `a < b`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: `!a`, `-a`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Call: `f(args)` or `obj.method(args)`
    Call {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Member access: `target.member`
    Member {
        target: Box<Expr>,
        member: Ident,
    },
    /// Assignment: `target = value`
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Object construction: `new T(args)`
    New { ty: TypeName, args: Vec<Expr> },
    /// The implicit receiver inside a member function
    This,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Comparison and logical operators produce `bool` regardless of
    /// operand types
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::And
                | BinaryOp::Or
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

/// A type name as written in source
#[derive(Debug, Clone)]
pub struct TypeName {
    pub kind: TypeNameKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum TypeNameKind {
    /// Simple name: `i32`, `Player`
    Simple(Ident),
    /// Qualified name: `A::B`
    Qualified {
        left: Box<TypeName>,
        right: Ident,
    },
    /// Generic name: `Observable<Health>`
    Generic {
        base: Box<TypeName>,
        args: Vec<TypeName>,
    },
    /// Array name: `Element[]`
    Array { element: Box<TypeName> },
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeNameKind::Simple(ident) => write!(f, "{}", ident.name),
            TypeNameKind::Qualified { left, right } => {
                write!(f, "{}::{}", left, right.name)
            }
            TypeNameKind::Generic { base, args } => {
                write!(f, "{}<", base)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TypeNameKind::Array { element } => write!(f, "{}[]", element),
        }
    }
}
