use chumsky::prelude::*;

use super::common::{ctrl, ident_part, keyword, new_line, string};
use super::perror::PError;
use super::stmt::block;
use crate::ast::*;
use crate::lexer::lr::TokenKind;
use crate::span::Span;

pub(crate) fn expr() -> impl Parser<TokenKind, Expr, Error = PError> + Clone {
    recursive(|expr| {
        let literal = select! { TokenKind::Literal(lit) => ExprKind::Literal(lit) };

        let ident = ident_part().map(ExprKind::Ident);

        let object = properties(expr.clone())
            .delimited_by(ctrl('{'), ctrl('}'))
            .map(ExprKind::Object)
            .labelled("object");

        // `{ "t1" == "val1" }` is a function of no parameters
        let predicate = expr
            .clone()
            .padded_by(new_line().repeated())
            .delimited_by(ctrl('{'), ctrl('}'))
            .map(|body| {
                ExprKind::from(ArrowFunction {
                    params: Vec::new(),
                    body: ArrowBody::Expr(Box::new(body)),
                })
            })
            .labelled("predicate");

        let array = expr
            .clone()
            .padded_by(new_line().repeated())
            .separated_by(ctrl(','))
            .allow_trailing()
            .then_ignore(new_line().repeated())
            .delimited_by(ctrl('['), ctrl(']'))
            .map(ExprKind::Array)
            .labelled("array");

        let parenthesized = expr
            .clone()
            .padded_by(new_line().repeated())
            .delimited_by(ctrl('('), ctrl(')'));

        let term = choice((
            literal,
            ident,
            array,
            object,
            predicate,
            arrow_function(expr.clone()),
        ))
        .map_with_span(ExprKind::into_expr)
        .or(parenthesized)
        .boxed();

        // Member access and calls
        #[derive(Clone)]
        enum Postfix {
            Member(String),
            Call(Vec<Property>),
        }

        let member_name = select! {
            TokenKind::Ident(name) => name,
            TokenKind::Keyword(name) => name,
            TokenKind::Literal(Literal::Boolean(b)) => b.to_string(),
        }
        .labelled("property name");

        let postfix = choice((
            new_line()
                .repeated()
                .ignore_then(ctrl('.'))
                .ignore_then(member_name)
                .map(Postfix::Member),
            string()
                .delimited_by(ctrl('['), ctrl(']'))
                .map(Postfix::Member),
            properties(expr.clone())
                .delimited_by(ctrl('('), ctrl(')'))
                .map(Postfix::Call)
                .labelled("function call"),
        ))
        .map_with_span(|postfix, span| (postfix, span));

        let term = term
            .then(postfix.repeated())
            .foldl(|object, (postfix, span)| {
                let span = Span::merge_opt(object.span, Some(span));
                let kind = match postfix {
                    Postfix::Member(property) => ExprKind::Member(MemberExpr {
                        object: Box::new(object),
                        property,
                    }),
                    Postfix::Call(arguments) => ExprKind::Call(CallExpr {
                        callee: Box::new(object),
                        arguments,
                    }),
                };
                Expr { kind, span }
            })
            .boxed();

        // Unary operators
        let unary_op = choice((
            keyword("not").then(keyword("empty")).to(UnOp::NotEmpty),
            keyword("not").to(UnOp::Not),
            keyword("empty").to(UnOp::Empty),
            ctrl('-').to(UnOp::Neg),
        ))
        .map_with_span(|op, span| (op, span));

        let term = unary_op
            .repeated()
            .then(term)
            .foldr(|(op, span), expr| {
                let span = Span::merge_opt(Some(span), expr.span);
                let kind = ExprKind::Unary(UnaryExpr {
                    op,
                    expr: Box::new(expr),
                });
                Expr { kind, span }
            })
            .boxed();

        // Binary operators
        let expr_ = term;
        let expr_ = binary_op_parser(expr_, operator_mul(), binary);
        let expr_ = binary_op_parser(expr_, operator_add(), binary);
        let expr_ = binary_op_parser(expr_, operator_relational(), binary);
        let expr_ = binary_op_parser(expr_, operator_equality(), binary);
        let expr_ = binary_op_parser(expr_, operator_logical(), logical);

        // `test ? consequent : alternate`, right associative
        expr_
            .then(
                new_line()
                    .repeated()
                    .ignore_then(ctrl('?'))
                    .ignore_then(expr.clone().padded_by(new_line().repeated()))
                    .then_ignore(ctrl(':'))
                    .then_ignore(new_line().repeated())
                    .then(expr)
                    .or_not(),
            )
            .map_with_span(|(test, branches), span| match branches {
                None => test,
                Some((consequent, alternate)) => ExprKind::Conditional(ConditionalExpr {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
                .into_expr(span),
            })
            .boxed()
    })
}

/// `key: value` pairs separated by commas, as used by object literals and
/// call arguments.
fn properties<E>(expr: E) -> impl Parser<TokenKind, Vec<Property>, Error = PError> + Clone
where
    E: Parser<TokenKind, Expr, Error = PError> + Clone,
{
    let key = ident_part().or(string());

    key.then_ignore(ctrl(':'))
        .then_ignore(new_line().repeated())
        .then(expr)
        .map_with_span(|(key, value), span| Property {
            key,
            value,
            span: Some(span),
        })
        .padded_by(new_line().repeated())
        .separated_by(ctrl(','))
        .allow_trailing()
        .then_ignore(new_line().repeated())
}

fn arrow_function<E>(expr: E) -> impl Parser<TokenKind, ExprKind, Error = PError> + Clone
where
    E: Parser<TokenKind, Expr, Error = PError> + Clone + 'static,
{
    let param = ident_part()
        .then(ctrl('=').ignore_then(expr.clone()).or_not())
        .map_with_span(|(name, default), span| Param {
            name,
            default: default.map(Box::new),
            span: Some(span),
        })
        .labelled("function parameter");

    let params = param
        .padded_by(new_line().repeated())
        .separated_by(ctrl(','))
        .allow_trailing()
        .then_ignore(new_line().repeated())
        .delimited_by(ctrl('('), ctrl(')'));

    let body = choice((
        block(expr.clone()).map(ArrowBody::Block),
        expr.map(|e| ArrowBody::Expr(Box::new(e))),
    ));

    params
        .then_ignore(just(TokenKind::ArrowFat))
        .then_ignore(new_line().repeated())
        .then(body)
        .map(|(params, body)| ExprKind::from(ArrowFunction { params, body }))
        .labelled("function definition")
}

fn binary(left: Expr, op: BinOp, right: Expr) -> ExprKind {
    ExprKind::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> ExprKind {
    ExprKind::Logical(LogicalExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn binary_op_parser<'a, Term, Op, O>(
    term: Term,
    op: Op,
    build: fn(Expr, O, Expr) -> ExprKind,
) -> impl Parser<TokenKind, Expr, Error = PError> + Clone + 'a
where
    Term: Parser<TokenKind, Expr, Error = PError> + Clone + 'a,
    Op: Parser<TokenKind, O, Error = PError> + Clone + 'a,
    O: Clone + 'a,
{
    let term = term.map_with_span(|e, s| (e, s)).boxed();

    // a new line may follow an operator, but one before it ends the expression
    let op = op.then_ignore(new_line().repeated());

    (term.clone())
        .then(op.then(term).repeated())
        .foldl(move |left, (op, right)| {
            let span = Span::merge(left.1, right.1);
            let kind = build(left.0, op, right.0);
            (kind.into_expr(span), span)
        })
        .map(|(e, _)| e)
        .boxed()
}

fn operator_mul() -> impl Parser<TokenKind, BinOp, Error = PError> + Clone {
    (ctrl('*').to(BinOp::Mul)).or(ctrl('/').to(BinOp::Div))
}

fn operator_add() -> impl Parser<TokenKind, BinOp, Error = PError> + Clone {
    (ctrl('+').to(BinOp::Add)).or(ctrl('-').to(BinOp::Sub))
}

fn operator_relational() -> impl Parser<TokenKind, BinOp, Error = PError> + Clone {
    choice((
        just(TokenKind::Lte).to(BinOp::Lte),
        just(TokenKind::Gte).to(BinOp::Gte),
        ctrl('<').to(BinOp::Lt),
        ctrl('>').to(BinOp::Gt),
        keyword("startswith").to(BinOp::StartsWith),
        keyword("in").to(BinOp::In),
    ))
}

fn operator_equality() -> impl Parser<TokenKind, BinOp, Error = PError> + Clone {
    choice((
        just(TokenKind::Eq).to(BinOp::Eq),
        just(TokenKind::Ne).to(BinOp::Ne),
        just(TokenKind::RegexMatch).to(BinOp::RegexMatch),
        just(TokenKind::RegexNotMatch).to(BinOp::RegexNotMatch),
    ))
}

fn operator_logical() -> impl Parser<TokenKind, LogicalOp, Error = PError> + Clone {
    (keyword("and").to(LogicalOp::And)).or(keyword("or").to(LogicalOp::Or))
}
