pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
mod test;

use crate::error::Error;

/// Build an IFQL AST from an IFQL source string.
pub fn parse_source(source: &str, source_id: u16) -> Result<ast::Program, Vec<Error>> {
    let mut errors = Vec::new();

    let (tokens, lex_errors) = ::chumsky::Parser::parse_recovery(&lexer::lexer(), source);

    log::debug!("lex errors: {:?}", lex_errors);
    errors.extend(
        lex_errors
            .into_iter()
            .map(|e| lexer::convert_lexer_error(source, e, source_id)),
    );

    let ast = if let Some(tokens) = tokens {
        let stream = parser::prepare_stream(tokens.into_iter(), source, source_id);

        let (ast, parse_errors) =
            ::chumsky::Parser::parse_recovery(&parser::stmt::source(), stream);

        log::debug!("parse errors: {:?}", parse_errors);
        errors.extend(
            parse_errors
                .into_iter()
                .map(parser::perror::convert_parser_error),
        );

        ast
    } else {
        None
    };

    if errors.is_empty() {
        Ok(ast.unwrap_or_default())
    } else {
        Err(errors)
    }
}
