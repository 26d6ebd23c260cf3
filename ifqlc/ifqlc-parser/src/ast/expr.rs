use enum_as_inner::EnumAsInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ast::{BinOp, Literal, LogicalOp, Stmt, UnOp};
use crate::span::Span;

impl Expr {
    pub fn new<K: Into<ExprKind>>(kind: K) -> Self {
        Expr {
            kind: kind.into(),
            span: None,
        }
    }
}

/// Expr is anything that has a value.
/// Most of these can contain other [Expr] themselves; literals should be [ExprKind::Literal].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(
    Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr, JsonSchema,
)]
pub enum ExprKind {
    Ident(String),
    Literal(Literal),

    Call(CallExpr),
    Member(MemberExpr),

    Object(Vec<Property>),
    Array(Vec<Expr>),
    ArrowFunction(Box<ArrowFunction>),

    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
}

impl ExprKind {
    pub fn into_expr(self, span: Span) -> Expr {
        Expr {
            span: Some(span),
            kind: self,
        }
    }
}

/// Function call. Arguments are always passed as a single object, so
/// `f(a: 1)` has one property `a`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub arguments: Vec<Property>,
}

/// Property access, either `a.b` or `a["b"]`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: String,
}

/// A `key: value` pair of an object literal or a call's argument list.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Property {
    pub key: String,
    pub value: Expr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Param {
    pub name: String,

    /// Default value, used when the caller doesn't pass this parameter.
    /// Must be a literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Box<Expr>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Expression with two operands and an operator, such as `1 + 2`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
}

/// `and` / `or`. Kept apart from [BinaryExpr] because the right side is only
/// evaluated when the left side doesn't decide the result.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogicalExpr {
    pub left: Box<Expr>,
    pub op: LogicalOp,
    pub right: Box<Expr>,
}

/// Expression with one operand and an operator, such as `-1`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub expr: Box<Expr>,
}

/// `test ? consequent : alternate`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalExpr {
    pub test: Box<Expr>,
    pub consequent: Box<Expr>,
    pub alternate: Box<Expr>,
}

impl From<Literal> for ExprKind {
    fn from(value: Literal) -> Self {
        ExprKind::Literal(value)
    }
}

impl From<ArrowFunction> for ExprKind {
    fn from(value: ArrowFunction) -> Self {
        ExprKind::ArrowFunction(Box::new(value))
    }
}
