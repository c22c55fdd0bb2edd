//! Typed syntax tree accepted by the compiler.
//!
//! The real front end (lexer, parser, type checker) lives outside this
//! crate's scope; this module defines the contract it hands us. The CLI
//! deserializes this shape from JSON as a stand-in for whatever the real
//! front end would produce in process.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub decls: Vec<TopDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum TopDecl {
    Function(FunctionDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Variable(VariableDecl),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub export: bool,
    #[serde(default)]
    pub import: bool,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: TypeNode,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: TypeNode,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub ty: TypeNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeNode {
    Name(String),
    Generic { name: String, args: Vec<TypeNode> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    Return { value: Option<Expr> },
    /// Anything the language grammar allows but this compiler does not
    /// implement. Carried through so the body compiler can raise a
    /// recoverable diagnostic rather than failing to deserialize.
    Other { label: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Paren {
        inner: Box<Expr>,
    },
    As {
        inner: Box<Expr>,
        ty: TypeNode,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Raw lexed text of a decimal integer, hex integer, or decimal
    /// floating-point literal; the lowerer classifies it.
    Number {
        text: String,
    },
    Ident {
        name: String,
    },
    Property {
        object: Box<Expr>,
        property: String,
    },
    Other {
        label: String,
    },
}
