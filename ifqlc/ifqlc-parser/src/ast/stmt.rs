use enum_as_inner::EnumAsInner;
use schemars::JsonSchema;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::span::Span;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
pub struct Program {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageClause>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub imports: Vec<ImportDef>,

    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageClause {
    pub name: String,

    /// `package stats 1.2.0` declares the version that imports are matched
    /// against.
    #[schemars(with = "Option<String>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// `import "path" [version] [as alias]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportDef {
    pub path: String,

    #[schemars(with = "Option<String>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionReq>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub enum StmtKind {
    VarDef(VarDef),
    Expr(Box<Expr>),
    Return(Box<Expr>),
}

/// `[var] name = value`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VarDef {
    pub name: String,
    pub value: Box<Expr>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Stmt {
        Stmt { kind, span: None }
    }
}
