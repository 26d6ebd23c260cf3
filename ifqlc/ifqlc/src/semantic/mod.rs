//! The semantic graph: a checked form of the AST, which the interpreter
//! evaluates and which travels inside query specs as resolved functions.

mod analyze;
pub mod fold;
mod graph;

pub use fold::SemanticFold;
pub use graph::*;

use ifqlc_parser::ast;
use ifqlc_parser::error::codes;

use crate::{ErrorSource, Result, WithErrorInfo};

/// Converts a parsed program into the semantic graph, validating the
/// constructs that don't depend on evaluation.
pub fn analyze(program: ast::Program) -> Result<Program> {
    analyze::analyze_program(program)
        .with_code_fallback(codes::SEMANTIC)
        .with_source(ErrorSource::Semantic)
}
