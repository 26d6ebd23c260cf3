//! The abstract syntax tree of an IFQL source file, as produced by the
//! parser. Nodes keep their source [Span] so later stages can point errors at
//! them.

pub use expr::*;
pub use ops::*;
pub use stmt::*;

// re-export Literal from the lexer, since literals pass through unchanged
pub use crate::lexer::lr::{DurationSegment, DurationUnit, Literal};
pub use crate::span::Span;

mod expr;
mod ops;
mod stmt;
