/// A trait to "fold" the semantic graph (similar to a visitor), so we can
/// transitively apply some logic to a whole tree by just defining how we want
/// to handle each node type.
use itertools::Itertools;

use super::graph::*;
use crate::Result;

// Fold pattern:
// - https://rust-unofficial.github.io/patterns/patterns/creational/fold.html
//
// Default implementations are free functions, so an implementor can override
// a method and still call the default for the cases it doesn't care about.
pub trait SemanticFold {
    fn fold_statement(&mut self, mut statement: Statement) -> Result<Statement> {
        statement.kind = fold_statement_kind(self, statement.kind)?;
        Ok(statement)
    }
    fn fold_statements(&mut self, statements: Vec<Statement>) -> Result<Vec<Statement>> {
        statements
            .into_iter()
            .map(|statement| self.fold_statement(statement))
            .collect()
    }
    fn fold_expression(&mut self, mut expr: Expression) -> Result<Expression> {
        expr.kind = self.fold_expression_kind(expr.kind)?;
        Ok(expr)
    }
    fn fold_expression_kind(&mut self, kind: ExpressionKind) -> Result<ExpressionKind> {
        fold_expression_kind(self, kind)
    }
    fn fold_expressions(&mut self, exprs: Vec<Expression>) -> Result<Vec<Expression>> {
        exprs.into_iter().map(|e| self.fold_expression(e)).collect()
    }
    fn fold_function(&mut self, function: FunctionExpression) -> Result<FunctionExpression> {
        fold_function(self, function)
    }
    fn fold_object(&mut self, object: ObjectExpression) -> Result<ObjectExpression> {
        fold_object(self, object)
    }
}

pub fn fold_statement_kind<F: ?Sized + SemanticFold>(
    fold: &mut F,
    kind: StatementKind,
) -> Result<StatementKind> {
    use StatementKind::*;
    Ok(match kind {
        Variable(var) => Variable(VariableDeclaration {
            name: var.name,
            init: fold.fold_expression(var.init)?,
        }),
        Expression(expr) => Expression(fold.fold_expression(expr)?),
        Return(expr) => Return(fold.fold_expression(expr)?),
    })
}

pub fn fold_expression_kind<F: ?Sized + SemanticFold>(
    fold: &mut F,
    kind: ExpressionKind,
) -> Result<ExpressionKind> {
    use ExpressionKind::*;
    Ok(match kind {
        Call(call) => Call(CallExpression {
            callee: Box::new(fold.fold_expression(*call.callee)?),
            arguments: fold.fold_object(call.arguments)?,
        }),
        Member(member) => Member(MemberExpression {
            object: Box::new(fold.fold_expression(*member.object)?),
            property: member.property,
        }),
        Object(object) => Object(fold.fold_object(object)?),
        Array(items) => Array(fold.fold_expressions(items)?),
        Function(function) => Function(Box::new(fold.fold_function(*function)?)),
        Binary(b) => Binary(BinaryExpression {
            operator: b.operator,
            left: Box::new(fold.fold_expression(*b.left)?),
            right: Box::new(fold.fold_expression(*b.right)?),
        }),
        Logical(l) => Logical(LogicalExpression {
            operator: l.operator,
            left: Box::new(fold.fold_expression(*l.left)?),
            right: Box::new(fold.fold_expression(*l.right)?),
        }),
        Unary(u) => Unary(UnaryExpression {
            operator: u.operator,
            argument: Box::new(fold.fold_expression(*u.argument)?),
        }),
        Conditional(c) => Conditional(ConditionalExpression {
            test: Box::new(fold.fold_expression(*c.test)?),
            consequent: Box::new(fold.fold_expression(*c.consequent)?),
            alternate: Box::new(fold.fold_expression(*c.alternate)?),
        }),

        // leaves
        Identifier(_) | Literal(_) | Field => kind,
    })
}

pub fn fold_function<F: ?Sized + SemanticFold>(
    fold: &mut F,
    function: FunctionExpression,
) -> Result<FunctionExpression> {
    let body = match function.body {
        FunctionBody::Expression(expr) => {
            FunctionBody::Expression(Box::new(fold.fold_expression(*expr)?))
        }
        FunctionBody::Block(statements) => FunctionBody::Block(fold.fold_statements(statements)?),
    };
    Ok(FunctionExpression {
        params: function.params,
        body,
    })
}

pub fn fold_object<F: ?Sized + SemanticFold>(
    fold: &mut F,
    object: ObjectExpression,
) -> Result<ObjectExpression> {
    Ok(ObjectExpression {
        properties: object
            .properties
            .into_iter()
            .map(|p| -> Result<_> {
                Ok(Property {
                    key: p.key,
                    value: fold.fold_expression(p.value)?,
                    span: p.span,
                })
            })
            .try_collect()?,
    })
}
