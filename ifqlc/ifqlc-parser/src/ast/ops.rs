use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    JsonSchema,
)]
pub enum UnOp {
    #[strum(to_string = "not")]
    Not,
    #[strum(to_string = "-")]
    Neg,
    #[strum(to_string = "empty")]
    Empty,
    #[strum(to_string = "not empty")]
    NotEmpty,
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    JsonSchema,
)]
pub enum BinOp {
    #[strum(to_string = "*")]
    Mul,
    #[strum(to_string = "/")]
    Div,
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Sub,
    #[strum(to_string = "<=")]
    Lte,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = ">=")]
    Gte,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = "startswith")]
    StartsWith,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "==")]
    Eq,
    #[strum(to_string = "!=")]
    Ne,
    #[strum(to_string = "=~")]
    RegexMatch,
    #[strum(to_string = "!~")]
    RegexNotMatch,
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    JsonSchema,
)]
pub enum LogicalOp {
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
}
