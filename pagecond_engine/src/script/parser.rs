//! Parser for predicate script bodies.
//!
//! Wraps the Pest grammar and builds the statement list evaluated by
//! [`PageScript`](super::PageScript).

use std::sync::LazyLock;

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser as PestParser;

use super::ScriptError;

#[derive(PestParser)]
#[grammar = "src/script/grammar.pest"]
struct ScriptParser;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left) | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg))
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
    Call { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

/// Parse a complete script body into statements.
pub(crate) fn parse_body(source: &str) -> Result<Vec<Statement>, ScriptError> {
    let mut pairs = ScriptParser::parse(Rule::body, source).map_err(|e| ScriptError::Parse(e.to_string()))?;
    let body = pairs.next().ok_or(ScriptError::Parse("empty parse tree".into()))?;
    body.into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(build_statement)
        .collect()
}

fn build_statement(pair: Pair<'_, Rule>) -> Result<Statement, ScriptError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ScriptError::Parse("empty statement".into()))?;
    match inner.as_rule() {
        Rule::return_stmt => {
            let value = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::expr)
                .map(|p| build_expr(p.into_inner()))
                .transpose()?;
            Ok(Statement::Return(value))
        },
        Rule::expr => Ok(Statement::Expr(build_expr(inner.into_inner())?)),
        other => Err(ScriptError::Parse(format!("unexpected statement {other:?}"))),
    }
}

fn build_expr(pairs: Pairs<'_, Rule>) -> Result<Expr, ScriptError> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, expr| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                _ => UnaryOp::Neg,
            };
            Ok(Expr::Unary {
                op,
                expr: Box::new(expr?),
            })
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::strict_eq | Rule::eq => BinaryOp::Eq,
                Rule::strict_ne | Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            })
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<'_, Rule>) -> Result<Expr, ScriptError> {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner()),
        Rule::boolean => Ok(Expr::Bool(pair.as_str() == "true")),
        Rule::null => Ok(Expr::Null),
        Rule::integer => pair
            .as_str()
            .parse()
            .map(Expr::Int)
            .map_err(|_| ScriptError::Parse(format!("integer literal '{}' out of range", pair.as_str()))),
        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Expr::Str(unescape(raw)))
        },
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner
                .next()
                .ok_or(ScriptError::Parse("call without a name".into()))?
                .as_str()
                .to_string();
            let args = inner.map(|arg| build_expr(arg.into_inner())).collect::<Result<_, _>>()?;
            Ok(Expr::Call { name, args })
        },
        other => Err(ScriptError::Parse(format!("unexpected token {other:?}"))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
