use chrono::{DateTime, Utc};
use enum_as_inner::EnumAsInner;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::time::Duration;
use crate::Span;

/// A checked program, ready to be evaluated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ImportDeclaration>,

    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageClause {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionReq>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StatementKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner, Serialize, Deserialize)]
pub enum StatementKind {
    Variable(VariableDeclaration),
    Expression(Expression),
    Return(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub init: Expression,
}

/// Anything that has a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExpressionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner, Serialize, Deserialize, strum::AsRefStr)]
pub enum ExpressionKind {
    Identifier(String),
    Literal(Literal),
    /// The `$` placeholder for the field value of the current row. Only
    /// meaningful inside a predicate.
    Field,

    Call(CallExpression),
    Member(MemberExpression),

    Object(ObjectExpression),
    Array(Vec<Expression>),
    Function(Box<FunctionExpression>),

    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Unary(UnaryExpression),
    Conditional(ConditionalExpression),
}

#[derive(Debug, Clone, PartialEq, EnumAsInner, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Duration(Duration),
    /// The pattern, checked to compile.
    Regexp(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: ObjectExpression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectExpression {
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Expression,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// An arrow function: `(r, n=1) => r + n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpression {
    pub params: Vec<FunctionParam>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner, Serialize, Deserialize)]
pub enum FunctionBody {
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operator: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// `and` / `or`: the right side is only evaluated when the left side doesn't
/// decide the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpression {
    pub operator: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub operator: Operator,
    pub argument: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
}

/// Every operator of the language. Unary minus is [Operator::Subtraction].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Operator {
    #[strum(to_string = "*")]
    Multiplication,
    #[strum(to_string = "/")]
    Division,
    #[strum(to_string = "+")]
    Addition,
    #[strum(to_string = "-")]
    Subtraction,
    #[strum(to_string = "<=")]
    LessThanEqual,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = ">=")]
    GreaterThanEqual,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = "startswith")]
    StartsWith,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "not empty")]
    NotEmpty,
    #[strum(to_string = "empty")]
    Empty,
    #[strum(to_string = "==")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
    #[strum(to_string = "=~")]
    RegexpMatch,
    #[strum(to_string = "!~")]
    RegexpNotMatch,
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "not")]
    Not,
}

/// The kinds of values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Invalid,
    String,
    Int,
    UInt,
    Float,
    Bool,
    Time,
    Duration,
    Regex,
    Function,
    Array,
    Map,
    Table,
}

impl Expression {
    pub fn new<K: Into<ExpressionKind>>(kind: K) -> Self {
        Expression {
            kind: kind.into(),
            span: None,
        }
    }

    /// The kind of this expression, when it is known without evaluating
    /// anything; [Kind::Invalid] otherwise.
    pub fn value_kind(&self) -> Kind {
        match &self.kind {
            ExpressionKind::Literal(lit) => lit.kind(),
            ExpressionKind::Function(_) => Kind::Function,
            ExpressionKind::Array(_) => Kind::Array,
            ExpressionKind::Object(_) => Kind::Map,
            ExpressionKind::Binary(b) => match b.operator {
                Operator::LessThanEqual
                | Operator::LessThan
                | Operator::GreaterThanEqual
                | Operator::GreaterThan
                | Operator::StartsWith
                | Operator::In
                | Operator::Equal
                | Operator::NotEqual
                | Operator::RegexpMatch
                | Operator::RegexpNotMatch => Kind::Bool,
                _ => Kind::Invalid,
            },
            ExpressionKind::Logical(_) => Kind::Bool,
            ExpressionKind::Unary(u) if u.operator != Operator::Subtraction => Kind::Bool,
            _ => Kind::Invalid,
        }
    }
}

impl Literal {
    pub fn kind(&self) -> Kind {
        match self {
            Literal::String(_) => Kind::String,
            Literal::Integer(_) => Kind::Int,
            Literal::UnsignedInteger(_) => Kind::UInt,
            Literal::Float(_) => Kind::Float,
            Literal::Boolean(_) => Kind::Bool,
            Literal::DateTime(_) => Kind::Time,
            Literal::Duration(_) => Kind::Duration,
            Literal::Regexp(_) => Kind::Regex,
        }
    }
}

impl FunctionExpression {
    pub fn param(&self, key: &str) -> Option<&FunctionParam> {
        self.params.iter().find(|p| p.key == key)
    }
}

impl From<Literal> for ExpressionKind {
    fn from(value: Literal) -> Self {
        ExpressionKind::Literal(value)
    }
}

impl From<FunctionExpression> for ExpressionKind {
    fn from(value: FunctionExpression) -> Self {
        ExpressionKind::Function(Box::new(value))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::UnsignedInteger(u) => write!(f, "{u}u"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::DateTime(t) => {
                f.write_str(&t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
            }
            Literal::Duration(d) => write!(f, "{d}"),
            Literal::Regexp(pattern) => write!(f, "/{}/", pattern.replace('/', "\\/")),
        }
    }
}

/// Renders an expression as source text, with each compound expression in
/// parentheses.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExpressionKind::Identifier(name) => f.write_str(name),
            ExpressionKind::Literal(lit) => write!(f, "{lit}"),
            ExpressionKind::Field => f.write_str("$"),
            ExpressionKind::Call(call) => {
                write!(f, "{}(", call.callee)?;
                write_properties(f, &call.arguments)?;
                f.write_str(")")
            }
            ExpressionKind::Member(member) => write!(f, "{}.{}", member.object, member.property),
            ExpressionKind::Object(object) => {
                f.write_str("{")?;
                write_properties(f, object)?;
                f.write_str("}")
            }
            ExpressionKind::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ExpressionKind::Function(func) => {
                f.write_str("(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&param.key)?;
                    if let Some(default) = &param.default {
                        write!(f, "={default}")?;
                    }
                }
                f.write_str(") => ")?;
                match &func.body {
                    FunctionBody::Expression(body) => write!(f, "{body}"),
                    FunctionBody::Block(statements) => {
                        f.write_str("{")?;
                        for statement in statements {
                            match &statement.kind {
                                StatementKind::Variable(var) => {
                                    write!(f, " {} = {};", var.name, var.init)?
                                }
                                StatementKind::Expression(expr) => write!(f, " {expr};")?,
                                StatementKind::Return(expr) => write!(f, " return {expr};")?,
                            }
                        }
                        f.write_str(" }")
                    }
                }
            }
            ExpressionKind::Binary(b) => write!(f, "({} {} {})", b.left, b.operator, b.right),
            ExpressionKind::Logical(l) => write!(f, "({} {} {})", l.left, l.operator, l.right),
            ExpressionKind::Unary(u) => write!(f, "({} {})", u.operator, u.argument),
            ExpressionKind::Conditional(c) => {
                write!(f, "({} ? {} : {})", c.test, c.consequent, c.alternate)
            }
        }
    }
}

fn write_properties(f: &mut std::fmt::Formatter<'_>, object: &ObjectExpression) -> std::fmt::Result {
    for (i, property) in object.properties.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", property.key, property.value)?;
    }
    Ok(())
}
