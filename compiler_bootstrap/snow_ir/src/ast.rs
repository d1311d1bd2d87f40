//! A minimal AST-input contract for the IR builder.
//!
//! Source-level lexing, parsing and semantic analysis are external
//! collaborators; this module defines only the shape of what the builder
//! consumes from them — module/function/statement/expression node kinds,
//! plus the declared-type-name annotation the builder needs on every local
//! and parameter. It is not a parser and does not attempt to represent
//! every construct a real front end would support.

use snow_common::ConstantValue;

/// One of the roots `buildProgram` dispatches over.
#[derive(Debug, Clone)]
pub enum AstRoot {
    Module(ModuleNode),
    Function(FunctionNode),
    Stmt(Stmt),
}

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub name: String,
    pub constants: Vec<(String, ConstantValue)>,
    pub structs: Vec<StructNode>,
    pub functions: Vec<FunctionNode>,
}

#[derive(Debug, Clone)]
pub struct StructNode {
    pub name: String,
    /// Own (non-inherited) field names, in declaration order.
    pub fields: Vec<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: String,
    /// Struct name this function is a method of, if any.
    pub receiver: Option<String>,
    pub params: Vec<Param>,
    pub return_type: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: String,
        type_name: String,
        init: Expr,
    },
    Assign {
        name: String,
        value: Expr,
    },
    ExprStmt(Expr),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySym {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnarySym {
    Neg,
    Inc,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Const(ConstantValue),
    Ident(String),
    Member { base: String, field: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    Binary { op: BinarySym, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnarySym, operand: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
    ArrayLiteral(Vec<Expr>),
    New { struct_name: String, args: Vec<Expr> },
}
