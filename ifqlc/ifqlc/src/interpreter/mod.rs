//! Evaluation of semantic programs.
//!
//! Most values are plain data, but calling a built-in function adds an
//! operation to the query being built and evaluates to a table: a handle on
//! that operation, whose methods add operations downstream of it.

mod arguments;
mod binary;
mod resolve;
mod scope;
mod value;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use ifqlc_parser::error::codes;

pub use arguments::Arguments;
pub use resolve::{resolve_function, value_to_expression};
pub use scope::{ScopeId, Scopes};
pub use value::{Array, ArrowFunction, Function, Value};

use crate::importer::Importer;
use crate::query::{Domain, QuerySpec, Registry};
use crate::semantic::*;
use crate::{Error, ErrorSource, Reason, Result, WithErrorInfo};

/// Evaluates the statements of programs, collecting the operations they
/// create.
pub struct Interpreter<'a> {
    registry: &'a Registry,
    importer: &'a dyn Importer,
    import_dir: PathBuf,

    scopes: Scopes,
    /// Scope of the top-level statements.
    globals: ScopeId,
    domain: Domain,

    /// Exports of the packages evaluated so far, by import path.
    packages: HashMap<String, Value>,
    /// Import paths of the packages being evaluated.
    importing: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(registry: &'a Registry, importer: &'a dyn Importer, import_dir: PathBuf) -> Self {
        let mut scopes = Scopes::new();
        for entry in registry.functions() {
            let function = Function::Builtin {
                entry: *entry,
                parent: None,
            };
            scopes.set(Scopes::ROOT, entry.name.to_string(), Value::Function(function));
        }
        let globals = scopes.nest(Scopes::ROOT);

        Interpreter {
            registry,
            importer,
            import_dir,
            scopes,
            globals,
            domain: Domain::new(),
            packages: HashMap::new(),
            importing: Vec::new(),
        }
    }

    /// Evaluates the imports and statements of a program. Names it binds
    /// stay visible to programs evaluated later.
    pub fn eval(&mut self, program: &Program) -> Result<()> {
        let globals = self.globals;
        self.eval_program(program, globals)
            .with_source(ErrorSource::Interpreter)
    }

    /// The value bound to a top-level name.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.lookup(self.globals, name)
    }

    pub fn into_spec(self) -> QuerySpec {
        self.domain.into_spec()
    }

    fn eval_program(&mut self, program: &Program, scope: ScopeId) -> Result<()> {
        for import in &program.imports {
            self.eval_import(import, scope)?;
        }

        for statement in &program.body {
            if statement.kind.is_return() {
                return Err(Error::new_simple("return statement outside of a function")
                    .with_code(codes::SEMANTIC)
                    .with_span(statement.span));
            }
            self.eval_statement(statement, scope)?;
            if scope == self.globals {
                self.collect_scopes();
            }
        }
        Ok(())
    }

    /// Frees the scopes that neither the top-level names nor the exports of
    /// imported packages can reach. Only safe between top-level statements,
    /// when no values are in flight.
    fn collect_scopes(&mut self) {
        let mut roots = vec![self.globals];
        for exports in self.packages.values() {
            exports.captured_scopes(&mut roots);
        }
        self.scopes.collect(roots);
    }

    fn eval_statement(&mut self, statement: &Statement, scope: ScopeId) -> Result<()> {
        match &statement.kind {
            StatementKind::Variable(var) => {
                let value = self.eval_expression(&var.init, scope)?;
                log::trace!("{} = {value}", var.name);
                self.scopes.set(scope, var.name.clone(), value);
            }
            StatementKind::Expression(expr) => {
                let value = self.eval_expression(expr, scope)?;
                log::trace!("evaluated statement to {value}");
            }
            StatementKind::Return(expr) => {
                let value = self.eval_expression(expr, scope)?;
                self.scopes.set_return(scope, value);
            }
        }
        Ok(())
    }

    fn eval_expression(&mut self, expr: &Expression, scope: ScopeId) -> Result<Value> {
        self.eval_expression_kind(&expr.kind, scope)
            .with_span_fallback(expr.span)
    }

    fn eval_expression_kind(&mut self, kind: &ExpressionKind, scope: ScopeId) -> Result<Value> {
        Ok(match kind {
            ExpressionKind::Identifier(name) => self
                .scopes
                .lookup(scope, name)
                .cloned()
                .ok_or_else(|| {
                    Error::new(Reason::NotFound {
                        name: name.clone(),
                        namespace: "identifier".to_string(),
                    })
                    .with_code(codes::NAME)
                })?,
            ExpressionKind::Literal(literal) => Value::from_literal(literal)?,
            ExpressionKind::Field => {
                return Err(Error::new_simple("$ can only be used in a predicate")
                    .with_code(codes::TYPE))
            }

            ExpressionKind::Call(call) => self.eval_call(call, scope)?,
            ExpressionKind::Member(member) => {
                let object = self.eval_expression(&member.object, scope)?;
                self.property(object, &member.property)?
            }

            ExpressionKind::Object(object) => Value::Map(self.eval_object(object, scope)?),
            ExpressionKind::Array(items) => {
                let elements = items
                    .iter()
                    .map(|item| self.eval_expression(item, scope))
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(Array::new(elements)?)
            }
            ExpressionKind::Function(function) => {
                let captured = self.scopes.snapshot(scope);
                Value::Function(Function::arrow((**function).clone(), captured))
            }

            ExpressionKind::Binary(binary) => {
                let left = self.eval_expression(&binary.left, scope)?;
                let right = self.eval_expression(&binary.right, scope)?;
                binary::eval_binary(binary.operator, &left, &right)?
            }
            ExpressionKind::Logical(logical) => {
                let left = self.eval_bool(&logical.left, scope, "logical operand")?;
                let decided = match logical.operator {
                    Operator::And => !left,
                    _ => left,
                };
                if decided {
                    Value::Bool(left)
                } else {
                    Value::Bool(self.eval_bool(&logical.right, scope, "logical operand")?)
                }
            }
            ExpressionKind::Unary(unary) => {
                let argument = self.eval_expression(&unary.argument, scope)?;
                binary::eval_unary(unary.operator, &argument)?
            }
            ExpressionKind::Conditional(conditional) => {
                if self.eval_bool(&conditional.test, scope, "conditional test")? {
                    self.eval_expression(&conditional.consequent, scope)?
                } else {
                    self.eval_expression(&conditional.alternate, scope)?
                }
            }
        })
    }

    fn eval_bool(&mut self, expr: &Expression, scope: ScopeId, what: &str) -> Result<bool> {
        match self.eval_expression(expr, scope)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::new_simple(format!(
                "{what} must be of type bool, but got {}",
                other.kind()
            ))
            .with_code(codes::TYPE)
            .with_span(expr.span)),
        }
    }

    fn eval_object(
        &mut self,
        object: &ObjectExpression,
        scope: ScopeId,
    ) -> Result<BTreeMap<String, Value>> {
        let mut values = BTreeMap::new();
        for property in &object.properties {
            let value = self.eval_expression(&property.value, scope)?;
            if values.insert(property.key.clone(), value).is_some() {
                return Err(Error::new_simple(format!(
                    "duplicate key {:?} in object",
                    property.key
                ))
                .with_code(codes::SEMANTIC)
                .with_span(property.span));
            }
        }
        Ok(values)
    }

    fn property(&self, object: Value, property: &str) -> Result<Value> {
        let not_found = || {
            Error::new(Reason::NotFound {
                name: property.to_string(),
                namespace: "property".to_string(),
            })
            .with_code(codes::NAME)
        };

        match object {
            Value::Table(id) => {
                let entry = self.registry.method(property).ok_or_else(not_found)?;
                Ok(Value::Function(Function::Builtin {
                    entry: *entry,
                    parent: Some(id),
                }))
            }
            Value::Map(mut map) => map.remove(property).ok_or_else(not_found),
            Value::Function(Function::Arrow(arrow)) if property == "resolve" => {
                Ok(Value::Function(Function::Resolve(arrow)))
            }
            other => Err(Error::new_simple(format!(
                "cannot access property {property:?} of a value of type {}",
                other.kind()
            ))
            .with_code(codes::TYPE)),
        }
    }

    fn eval_call(&mut self, call: &CallExpression, scope: ScopeId) -> Result<Value> {
        let function = match self.eval_expression(&call.callee, scope)? {
            Value::Function(function) => function,
            other => {
                return Err(Error::new_simple(format!(
                    "cannot call function, value is of type {}",
                    other.kind()
                ))
                .with_code(codes::TYPE))
            }
        };

        let mut values = HashMap::with_capacity(call.arguments.properties.len());
        for property in &call.arguments.properties {
            let value = self.eval_expression(&property.value, scope)?;
            if values.insert(property.key.clone(), value).is_some() {
                return Err(Error::new_simple(format!(
                    "duplicate keyword argument {:?}",
                    property.key
                ))
                .with_code(codes::ARGUMENT)
                .with_span(property.span));
            }
        }
        let mut args = Arguments::new(values);

        self.invoke(&function, &mut args)
            .and_then(|value| {
                let unused = args.unused();
                if unused.is_empty() {
                    Ok(value)
                } else {
                    Err(Error::new_simple(format!("unused arguments [{}]", unused.join(", ")))
                        .with_code(codes::ARGUMENT))
                }
            })
            .map_err(|e| wrap_call_error(callee_name(&call.callee), e))
    }

    fn invoke(&mut self, function: &Function, args: &mut Arguments) -> Result<Value> {
        match function {
            Function::Builtin { entry, parent } => {
                let id = self
                    .domain
                    .call(entry, parent.as_ref(), args, &self.scopes)?;
                Ok(Value::Table(id))
            }
            Function::Resolve(arrow) => {
                let resolved = resolve_function(&Function::Arrow(arrow.clone()), &self.scopes)?;
                Ok(Value::Function(Function::arrow(resolved, Scopes::ROOT)))
            }
            Function::Arrow(arrow) => {
                let scope = self.scopes.nest(arrow.scope);
                let result = self.call_arrow(arrow, args, scope);
                self.scopes.release(scope, result.as_ref().ok());
                result
            }
        }
    }

    fn call_arrow(
        &mut self,
        arrow: &ArrowFunction,
        args: &mut Arguments,
        scope: ScopeId,
    ) -> Result<Value> {
        for param in &arrow.expr.params {
            let value = match &param.default {
                Some(default) => match args.get(&param.key) {
                    Some(value) => value,
                    None => Value::from_literal(default)?,
                },
                None => args.get_required(&param.key)?,
            };
            self.scopes.set(scope, param.key.clone(), value);
        }

        match &arrow.expr.body {
            FunctionBody::Expression(body) => self.eval_expression(body, scope),
            FunctionBody::Block(statements) => {
                let last = statements.len().saturating_sub(1);
                if let Some(misplaced) = statements
                    .iter()
                    .enumerate()
                    .find(|(i, s)| s.kind.is_return() && *i != last)
                {
                    return Err(Error::new_simple(
                        "return statement is not the last statement in the block",
                    )
                    .with_code(codes::SEMANTIC)
                    .with_span(misplaced.1.span));
                }

                for statement in statements {
                    self.eval_statement(statement, scope)?;
                }
                self.scopes.take_return(scope).ok_or_else(|| {
                    Error::new_simple("arrow function has no return value")
                        .with_code(codes::SEMANTIC)
                })
            }
        }
    }

    fn eval_import(&mut self, import: &ImportDeclaration, scope: ScopeId) -> Result<()> {
        let (name, exports) = self.import_package(import).map_err(|e| {
            if e.is_bug() {
                return e;
            }
            let reason = format!("failed to import package {:?}: {e}", import.path);
            Error {
                reason: Reason::Simple(reason),
                ..e
            }
            .with_span(import.span)
            .with_code(codes::IMPORT)
        })?;

        let name = import.alias.clone().unwrap_or(name);
        log::debug!("imported package {:?} as {name}", import.path);
        self.scopes.set(scope, name, exports);
        Ok(())
    }

    /// Evaluates a package, once per interpreter, returning its name and
    /// exports.
    fn import_package(&mut self, import: &ImportDeclaration) -> Result<(String, Value)> {
        if self.importing.contains(&import.path) {
            return Err(Error::new_simple(format!(
                "import cycle through package {:?}",
                import.path
            )));
        }

        let package = self.importer.import(&import.path, &self.import_dir)?;
        if let Some(requirement) = &import.version {
            match &package.version {
                Some(version) if requirement.matches(version) => {}
                Some(version) => {
                    return Err(Error::new_simple(format!(
                        "package {:?} has version {version}, which does not match {requirement}",
                        package.name
                    )))
                }
                None => {
                    return Err(Error::new_simple(format!(
                        "package {:?} declares no version, but {requirement} was requested",
                        package.name
                    )))
                }
            }
        }

        if let Some(exports) = self.packages.get(&import.path) {
            return Ok((package.name.clone(), exports.clone()));
        }

        let program = crate::semantic::analyze(package.program.clone())?;
        let scope = self.scopes.nest(Scopes::ROOT);
        self.importing.push(import.path.clone());
        let result = self.eval_program(&program, scope);
        self.importing.pop();
        result?;

        let exports = Value::Map(
            self.scopes
                .values(scope)
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        );
        self.packages.insert(import.path.clone(), exports.clone());
        Ok((package.name.clone(), exports))
    }
}

fn callee_name(callee: &Expression) -> &str {
    match &callee.kind {
        ExpressionKind::Identifier(name) => name,
        ExpressionKind::Member(member) => &member.property,
        _ => "<anonymous function>",
    }
}

/// Names the function in the message of an error that happened while
/// calling it. Internal errors are left alone.
fn wrap_call_error(name: &str, error: Error) -> Error {
    if error.is_bug() {
        return error;
    }
    let reason = format!("error calling function {name:?}: {error}");
    Error {
        reason: Reason::Simple(reason),
        ..error
    }
}
