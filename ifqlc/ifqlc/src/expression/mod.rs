//! Row predicates as they travel in `where` operations.
//!
//! A predicate is a tree of [Node]s tagged with their `type`. Integer
//! literals are written as strings, so that every `i64` survives JSON
//! parsers that read numbers as doubles.

use chrono::{DateTime, Utc};
use ifqlc_parser::error::codes;
use serde::{Deserialize, Serialize};

use crate::semantic::{self, ExpressionKind, FunctionBody, FunctionExpression, Literal};
use crate::time::Duration;
use crate::{Error, Result, WithErrorInfo};

/// A predicate over the rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub root: Node,

    /// Names that the predicate receives as parameters.
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Binary {
        operator: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        operator: Operator,
        node: Box<Node>,
    },
    StringLiteral {
        value: String,
    },
    IntegerLiteral {
        #[serde(with = "integer_string")]
        value: i64,
    },
    FloatLiteral {
        value: f64,
    },
    BooleanLiteral {
        value: bool,
    },
    DurationLiteral {
        value: Duration,
    },
    TimeLiteral {
        value: DateTime<Utc>,
    },
    RegexpLiteral {
        value: String,
    },
    Reference {
        name: String,
        kind: ReferenceKind,
    },
    MemberReference {
        object: Box<Node>,
        property: String,
    },
}

/// What a reference points at in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
    Tag,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Operator {
    #[serde(rename = "*")]
    #[strum(to_string = "*")]
    Multiplication,
    #[serde(rename = "/")]
    #[strum(to_string = "/")]
    Division,
    #[serde(rename = "+")]
    #[strum(to_string = "+")]
    Addition,
    #[serde(rename = "-")]
    #[strum(to_string = "-")]
    Subtraction,
    #[serde(rename = "<=")]
    #[strum(to_string = "<=")]
    LessThanEqual,
    #[serde(rename = "<")]
    #[strum(to_string = "<")]
    LessThan,
    #[serde(rename = ">=")]
    #[strum(to_string = ">=")]
    GreaterThanEqual,
    #[serde(rename = ">")]
    #[strum(to_string = ">")]
    GreaterThan,
    #[serde(rename = "startsWith")]
    #[strum(to_string = "startsWith")]
    StartsWith,
    #[serde(rename = "in")]
    #[strum(to_string = "in")]
    In,
    #[serde(rename = "notEmpty")]
    #[strum(to_string = "notEmpty")]
    NotEmpty,
    #[serde(rename = "empty")]
    #[strum(to_string = "empty")]
    Empty,
    #[serde(rename = "!")]
    #[strum(to_string = "!")]
    Not,
    #[serde(rename = "==")]
    #[strum(to_string = "==")]
    Equal,
    #[serde(rename = "!=")]
    #[strum(to_string = "!=")]
    NotEqual,
    #[serde(rename = "regexpMatch")]
    #[strum(to_string = "regexpMatch")]
    RegexpMatch,
    #[serde(rename = "regexpNotMatch")]
    #[strum(to_string = "regexpNotMatch")]
    RegexpNotMatch,
    #[serde(rename = "and")]
    #[strum(to_string = "and")]
    And,
    #[serde(rename = "or")]
    #[strum(to_string = "or")]
    Or,
}

impl From<semantic::Operator> for Operator {
    fn from(operator: semantic::Operator) -> Self {
        use semantic::Operator as S;
        match operator {
            S::Multiplication => Operator::Multiplication,
            S::Division => Operator::Division,
            S::Addition => Operator::Addition,
            S::Subtraction => Operator::Subtraction,
            S::LessThanEqual => Operator::LessThanEqual,
            S::LessThan => Operator::LessThan,
            S::GreaterThanEqual => Operator::GreaterThanEqual,
            S::GreaterThan => Operator::GreaterThan,
            S::StartsWith => Operator::StartsWith,
            S::In => Operator::In,
            S::NotEmpty => Operator::NotEmpty,
            S::Empty => Operator::Empty,
            S::Equal => Operator::Equal,
            S::NotEqual => Operator::NotEqual,
            S::RegexpMatch => Operator::RegexpMatch,
            S::RegexpNotMatch => Operator::RegexpNotMatch,
            S::And => Operator::And,
            S::Or => Operator::Or,
            S::Not => Operator::Not,
        }
    }
}

impl Operator {
    fn is_comparison(self) -> bool {
        use Operator::*;
        matches!(
            self,
            LessThanEqual
                | LessThan
                | GreaterThanEqual
                | GreaterThan
                | StartsWith
                | In
                | Equal
                | NotEqual
                | RegexpMatch
                | RegexpNotMatch
        )
    }
}

impl Node {
    /// Calls `f` on this node and then on each of its descendants, depth
    /// first.
    pub fn walk<'a, F: FnMut(&'a Node)>(&'a self, f: &mut F) {
        f(self);
        match self {
            Node::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Node::Unary { node, .. } => node.walk(f),
            Node::MemberReference { object, .. } => object.walk(f),
            _ => {}
        }
    }
}

impl Expression {
    /// Converts the body of a resolved predicate function such as
    /// `{ "host" == "a" and $ > 5.0 }`.
    ///
    /// A string on the left of a comparison names a tag, `$` is the field
    /// value and parameters of the function are tags too.
    pub fn from_predicate(function: &FunctionExpression) -> Result<Expression> {
        let FunctionBody::Expression(body) = &function.body else {
            return Err(Error::new_simple("a predicate must be a single expression")
                .with_code(codes::TYPE));
        };
        let params = function.params.iter().map(|p| p.key.clone()).collect();
        let root = to_node(body)?;
        log::debug!("converted predicate {body}");
        Ok(Expression { root, params })
    }

    /// Names of the tags the predicate reads.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags = Vec::new();
        self.root.walk(&mut |node| {
            if let Node::Reference {
                name,
                kind: ReferenceKind::Tag,
            } = node
            {
                tags.push(name.as_str());
            }
        });
        tags.sort_unstable();
        tags.dedup();
        tags
    }
}

fn to_node(expr: &semantic::Expression) -> Result<Node> {
    convert(expr).with_span_fallback(expr.span)
}

fn convert(expr: &semantic::Expression) -> Result<Node> {
    Ok(match &expr.kind {
        ExpressionKind::Binary(binary) => {
            let mut operator = Operator::from(binary.operator);
            let left = match &binary.left.kind {
                ExpressionKind::Literal(Literal::String(tag)) if operator.is_comparison() => {
                    tag_reference(tag)
                }
                _ => to_node(&binary.left)?,
            };
            if let ExpressionKind::Literal(Literal::Regexp(_)) = &binary.right.kind {
                operator = match operator {
                    Operator::Equal => Operator::RegexpMatch,
                    Operator::NotEqual => Operator::RegexpNotMatch,
                    other => other,
                };
            }
            Node::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(to_node(&binary.right)?),
            }
        }
        ExpressionKind::Logical(logical) => Node::Binary {
            operator: logical.operator.into(),
            left: Box::new(to_node(&logical.left)?),
            right: Box::new(to_node(&logical.right)?),
        },
        ExpressionKind::Unary(unary) => Node::Unary {
            operator: unary.operator.into(),
            node: Box::new(to_node(&unary.argument)?),
        },

        ExpressionKind::Literal(literal) => literal_node(literal)?,
        ExpressionKind::Field => Node::Reference {
            name: "$".to_string(),
            kind: ReferenceKind::Field,
        },
        ExpressionKind::Identifier(name) => tag_reference(name),
        ExpressionKind::Member(member) => Node::MemberReference {
            object: Box::new(to_node(&member.object)?),
            property: member.property.clone(),
        },

        other => {
            return Err(Error::new_simple(format!(
                "unsupported expression {} in a predicate",
                other.as_ref().to_lowercase()
            ))
            .with_code(codes::TYPE))
        }
    })
}

fn tag_reference(name: &str) -> Node {
    Node::Reference {
        name: name.to_string(),
        kind: ReferenceKind::Tag,
    }
}

fn literal_node(literal: &Literal) -> Result<Node> {
    Ok(match literal {
        Literal::String(value) => Node::StringLiteral {
            value: value.clone(),
        },
        Literal::Integer(value) => Node::IntegerLiteral { value: *value },
        Literal::UnsignedInteger(value) => Node::IntegerLiteral {
            value: i64::try_from(*value).map_err(|_| {
                Error::new_simple(format!("integer {value} is out of range in a predicate"))
                    .with_code(codes::TYPE)
            })?,
        },
        Literal::Float(value) if !value.is_finite() => {
            return Err(Error::new_simple(format!(
                "non-finite float {value} cannot be used in a predicate"
            ))
            .with_code(codes::TYPE));
        }
        Literal::Float(value) => Node::FloatLiteral { value: *value },
        Literal::Boolean(value) => Node::BooleanLiteral { value: *value },
        Literal::DateTime(value) => Node::TimeLiteral { value: *value },
        Literal::Duration(value) => Node::DurationLiteral { value: *value },
        Literal::Regexp(value) => Node::RegexpLiteral {
            value: value.clone(),
        },
    })
}

mod integer_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|e| de::Error::custom(format!("invalid integer literal {text:?}: {e}")))
    }
}
