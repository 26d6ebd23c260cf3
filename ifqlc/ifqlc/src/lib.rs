//! # ifqlc
//!
//! Compiler for the IFQL query language. Turns a query into a [QuerySpec]:
//! the graph of operations that a query engine plans and runs.
//!
//! You probably want to start with the [compile] wrapper function.
//!
//! For more granular access, refer to this diagram:
//! ```ascii
//!            IFQL
//!
//!    (parse) │
//! ifql_to_ast│
//!            ▼      json::from_ast
//!                   ────────►
//!             AST             AST JSON
//!
//!            │
//! ast_to_semantic
//!            ▼
//!
//!       semantic graph
//!
//!            │
//! semantic_to_spec  (interpret, resolving imports)
//!            ▼      json::from_spec
//!                   ────────►
//!         QuerySpec           QuerySpec JSON
//!                   ◄────────
//!                   json::to_spec
//! ```
//!
//! ## Common use-cases
//!
//! - Compile a query to a query spec.
//!
//!   ```
//!   # fn main() -> Result<(), ifqlc::ErrorMessages> {
//!   let spec = ifqlc::compile(r#"from(db:"telegraf").range(start:-1h).sum()"#)?;
//!   assert_eq!(spec.operations.len(), 3);
//!   assert_eq!(spec.edges.len(), 2);
//!   # Ok(())
//!   # }
//!   ```
//!
//! - Compile a query that imports packages from `<dir>/ifql_pkgs/`.
//!
//!   ```no_run
//!   # fn main() -> Result<(), ifqlc::ErrorMessages> {
//!   let options = ifqlc::Options::default().with_import_dir("queries");
//!   let spec = ifqlc::compile_with(
//!       "import \"stats\"\nstats.cpu(db:\"telegraf\")",
//!       &options,
//!   )?;
//!   println!("{}", ifqlc::json::from_spec(&spec)?);
//!   # Ok(())
//!   # }
//!   ```
//!
//! - Evaluate a row function, like the ones passed to `filter`, with
//!   [compiler::compile].

#![forbid(unsafe_code)]
// Our error type is 128 bytes, because it contains a few strings & an Enum,
// which is exactly the default warning level.
#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::path::PathBuf;

use anstream::adapter::strip_str;
use serde::{Deserialize, Serialize};

pub use error_message::{ErrorMessage, ErrorMessages, SourceLocation};
pub use ifqlc_parser::error::{Error, ErrorSource, Errors, MessageKind, Reason, WithErrorInfo};
pub use ifqlc_parser::lexer::lr;
pub use ifqlc_parser::span::Span;
pub use ifqlc_parser::{ast, error::codes};
pub use query::QuerySpec;

pub mod compiler;
mod error_message;
pub mod expression;
pub mod functions;
pub mod importer;
pub mod interpreter;
pub mod query;
pub mod semantic;
pub mod time;
pub(crate) mod utils;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Id of the main source in a [SourceTree].
const MAIN_SOURCE_ID: u16 = 0;

/// Compile an IFQL query into a query spec, with default [Options].
///
/// Imports are refused. Use [compile_with] to allow them.
pub fn compile(source: &str) -> Result<QuerySpec, ErrorMessages> {
    compile_with(source, &Options::default())
}

/// Compile an IFQL query into a query spec.
///
/// This is a wrapper for:
/// - [ifql_to_ast]: parse the source
/// - [ast_to_semantic]: check it and build the semantic graph
/// - [semantic_to_spec]: evaluate it, collecting the operations of the query
///
/// The returned spec is validated: ids are unique, edges point at known
/// operations and the graph has no cycles.
pub fn compile_with(source: &str, options: &Options) -> Result<QuerySpec, ErrorMessages> {
    let sources = SourceTree::from(source);

    ifql_to_ast(source)
        .and_then(ast_to_semantic)
        .and_then(|program| semantic_to_spec(&program, options))
        .map_err(|e| {
            let error_messages = e.composed(&sources);
            match options.display {
                DisplayOptions::AnsiColor => error_messages,
                DisplayOptions::Plain => ErrorMessages {
                    inner: error_messages
                        .inner
                        .into_iter()
                        .map(|e| ErrorMessage {
                            display: e.display.map(|s| strip_str(&s).to_string()),
                            ..e
                        })
                        .collect(),
                },
            }
        })
}

/// Compilation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Directory holding the `ifql_pkgs` directory that imports are read
    /// from. Without it, any import fails.
    pub import_dir: Option<PathBuf>,

    /// Whether to use ANSI colors in error messages.
    ///
    /// Colors are also stripped when the terminal doesn't support them; see
    /// `anstream` for the environment variables that control this.
    pub display: DisplayOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            import_dir: None,
            display: DisplayOptions::AnsiColor,
        }
    }
}

impl Options {
    pub fn with_import_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.import_dir = Some(dir.into());
        self
    }

    pub fn no_imports(mut self) -> Self {
        self.import_dir = None;
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum DisplayOptions {
    /// Plain text
    Plain,
    /// With ANSI colors
    AnsiColor,
}

/// Lex IFQL source into tokens.
pub fn ifql_to_tokens(source: &str) -> Result<lr::Tokens, ErrorMessages> {
    ifqlc_parser::lexer::lex_source(source, MAIN_SOURCE_ID).map_err(ErrorMessages::from)
}

/// Parse IFQL into an AST.
pub fn ifql_to_ast(source: &str) -> Result<ast::Program, ErrorMessages> {
    ifqlc_parser::parse_source(source, MAIN_SOURCE_ID).map_err(ErrorMessages::from)
}

/// Check an AST and convert it into the semantic graph.
pub fn ast_to_semantic(program: ast::Program) -> Result<semantic::Program, ErrorMessages> {
    semantic::analyze(program).map_err(ErrorMessages::from)
}

/// Evaluate a program, collecting the operations it creates into a query
/// spec. Imports are resolved according to `options`.
pub fn semantic_to_spec(
    program: &semantic::Program,
    options: &Options,
) -> Result<QuerySpec, ErrorMessages> {
    let registry = query::registry()?;

    let spec = match &options.import_dir {
        Some(dir) => {
            let importer = importer::FileImporter::new();
            evaluate(program, registry, &importer, dir.clone())?
        }
        None => evaluate(program, registry, &importer::NullImporter, PathBuf::from("."))?,
    };

    spec.validate()?;
    log::debug!(
        "compiled query with {} operations and {} edges",
        spec.operations.len(),
        spec.edges.len()
    );
    Ok(spec)
}

fn evaluate(
    program: &semantic::Program,
    registry: &query::Registry,
    importer: &dyn importer::Importer,
    import_dir: PathBuf,
) -> Result<QuerySpec> {
    let mut interpreter = interpreter::Interpreter::new(registry, importer, import_dir);
    interpreter.eval(program)?;
    Ok(interpreter.into_spec())
}

/// JSON serialization and deserialization functions
pub mod json {
    use super::*;

    /// JSON serialization
    pub fn from_spec(spec: &QuerySpec) -> Result<String, ErrorMessages> {
        serde_json::to_string(spec).map_err(convert_json_err)
    }

    /// JSON deserialization. Operation specs are decoded by the registry,
    /// according to their kind.
    pub fn to_spec(json: &str) -> Result<QuerySpec, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    /// JSON serialization
    pub fn from_ast(program: &ast::Program) -> Result<String, ErrorMessages> {
        serde_json::to_string(program).map_err(convert_json_err)
    }

    fn convert_json_err(err: serde_json::Error) -> ErrorMessages {
        ErrorMessages::from(Error::new_simple(err.to_string()))
    }
}

/// The source files that spans point into, by source id.
///
/// The main source of a compilation always has id 0.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceTree {
    /// Mapping from file paths into their contents.
    pub sources: HashMap<PathBuf, String>,

    source_ids: HashMap<u16, PathBuf>,
}

impl SourceTree {
    pub fn single(path: PathBuf, content: String) -> Self {
        SourceTree {
            sources: [(path.clone(), content)].into(),
            source_ids: [(MAIN_SOURCE_ID, path)].into(),
        }
    }

    pub fn insert(&mut self, path: PathBuf, content: String) -> u16 {
        let id = (self.source_ids.keys().max())
            .map(|id| id + 1)
            .unwrap_or(MAIN_SOURCE_ID);
        self.sources.insert(path.clone(), content);
        self.source_ids.insert(id, path);
        id
    }

    pub fn get_path(&self, source_id: u16) -> Option<&PathBuf> {
        self.source_ids.get(&source_id)
    }
}

impl<S: ToString> From<S> for SourceTree {
    fn from(source: S) -> Self {
        SourceTree::single(PathBuf::from(""), source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_display_options_from_str() {
        assert_eq!(DisplayOptions::from_str("plain"), Ok(DisplayOptions::Plain));
        assert_eq!(
            DisplayOptions::from_str("ansi_color"),
            Ok(DisplayOptions::AnsiColor)
        );
        assert!(DisplayOptions::from_str("html").is_err());
    }

    #[test]
    fn test_source_tree_ids() {
        let mut tree = SourceTree::from("from(db:\"a\")");
        assert_eq!(tree.get_path(0), Some(&PathBuf::from("")));

        let id = tree.insert(PathBuf::from("stats/cpu.ifql"), "package stats".to_string());
        assert_eq!(id, 1);
        assert_eq!(tree.get_path(1), Some(&PathBuf::from("stats/cpu.ifql")));
    }

    #[test]
    fn test_plain_errors() {
        let options = Options::default().with_display(DisplayOptions::Plain);
        let errors = compile_with("x = 1\ny = x + z", &options).unwrap_err();
        assert_eq!(errors.inner.len(), 1);
        assert_eq!(errors.inner[0].reason, r#"identifier "z" not found"#);

        let display = errors.inner[0].display.as_ref().unwrap();
        assert!(!display.contains('\u{1b}'));
        assert!(display.contains("y = x + z"));
    }

    #[test]
    fn test_imports_refused_by_default() {
        let errors = compile("import \"math\"\nmath.pi").unwrap_err();
        assert_snapshot!(
            errors.inner[0].reason,
            @r#"failed to import package "math": imports are not allowed"#
        );
        assert_eq!(errors.inner[0].code.as_deref(), Some("E0007"));
    }
}
