//! Predicate scripts.
//!
//! Page authors may attach free-form predicate bodies to a page. The engine hands them to
//! a [`ScriptHost`], which is the trust boundary: whatever host is plugged in runs author
//! code with whatever privileges it grants. The bundled [`PageScript`] host runs a small
//! expression language that can only read game state.
//!
//! A body is a sequence of `;`-separated statements. `return <expr>` ends the body with a
//! value; a body that never returns produces no value, which counts as false.
//!
//! ```text
//! return switch(3) && variable(10) >= 50;
//! return self_switch("A") || in_party(2);
//! return has_item(7) && party_size() > 1;
//! ```

mod parser;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, trace};
use thiserror::Error;
use variantly::Variantly;

use crate::state::{EvalContext, SelfSwitchKey};

use parser::{BinaryOp, Expr, Statement, UnaryOp, parse_body};

/// Runtime value of a script expression.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum ScriptValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
}

impl ScriptValue {
    /// `false`, `0`, `""` and `null` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(n) => *n != 0,
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
            Self::Null => false,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Faults raised while running a predicate. These are author errors and are returned to
/// the caller rather than swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("script host failure: {0}")]
    Host(String),
}

/// Executes predicate bodies.
pub trait ScriptHost {
    /// Run `body`. `Ok(None)` means the body finished without returning a value.
    ///
    /// # Errors
    /// Any fault raised by the body.
    fn run(&self, body: &str, ctx: &EvalContext<'_>) -> Result<Option<ScriptValue>, ScriptError>;
}

/// The bundled, read-only script host.
///
/// Each distinct body is parsed once; later runs reuse the parsed statements.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    compiled: RefCell<HashMap<String, Rc<[Statement]>>>,
}

impl PageScript {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, body: &str) -> Result<Rc<[Statement]>, ScriptError> {
        if let Some(statements) = self.compiled.borrow().get(body) {
            return Ok(Rc::clone(statements));
        }
        let statements: Rc<[Statement]> = parse_body(body)?.into();
        debug!("compiled script body `{body}`");
        self.compiled.borrow_mut().insert(body.to_string(), Rc::clone(&statements));
        Ok(statements)
    }
}

impl ScriptHost for PageScript {
    fn run(&self, body: &str, ctx: &EvalContext<'_>) -> Result<Option<ScriptValue>, ScriptError> {
        let statements = self.compile(body)?;
        for statement in statements.iter() {
            match statement {
                Statement::Return(Some(expr)) => return eval(expr, ctx).map(Some),
                Statement::Return(None) => return Ok(Some(ScriptValue::Null)),
                Statement::Expr(expr) => {
                    let value = eval(expr, ctx)?;
                    trace!("discarding statement value {value}");
                },
            }
        }
        Ok(None)
    }
}

fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<ScriptValue, ScriptError> {
    match expr {
        Expr::Int(n) => Ok(ScriptValue::Int(*n)),
        Expr::Str(s) => Ok(ScriptValue::Str(s.clone())),
        Expr::Bool(b) => Ok(ScriptValue::Bool(*b)),
        Expr::Null => Ok(ScriptValue::Null),
        Expr::Unary { op, expr } => {
            let value = eval(expr, ctx)?;
            match op {
                UnaryOp::Not => Ok(ScriptValue::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    ScriptValue::Int(n) => n.checked_neg().map(ScriptValue::Int).ok_or(ScriptError::Overflow),
                    other => Err(ScriptError::Type(format!("cannot negate a {}", other.type_name()))),
                },
            }
        },
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            let left = eval(lhs, ctx)?;
            if left.is_truthy() { Ok(left) } else { eval(rhs, ctx) }
        },
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            let left = eval(lhs, ctx)?;
            if left.is_truthy() { eval(rhs, ctx) } else { Ok(left) }
        },
        Expr::Binary { op, lhs, rhs } => {
            let left = eval(lhs, ctx)?;
            let right = eval(rhs, ctx)?;
            binary(*op, left, right)
        },
        Expr::Call { name, args } => {
            let values = args.iter().map(|arg| eval(arg, ctx)).collect::<Result<Vec<_>, _>>()?;
            call(name, &values, ctx)
        },
    }
}

fn binary(op: BinaryOp, left: ScriptValue, right: ScriptValue) -> Result<ScriptValue, ScriptError> {
    use ScriptValue::{Bool, Int, Str};
    match (op, left, right) {
        (BinaryOp::Eq, l, r) => Ok(Bool(l == r)),
        (BinaryOp::Ne, l, r) => Ok(Bool(l != r)),
        (BinaryOp::Lt, Int(l), Int(r)) => Ok(Bool(l < r)),
        (BinaryOp::Le, Int(l), Int(r)) => Ok(Bool(l <= r)),
        (BinaryOp::Gt, Int(l), Int(r)) => Ok(Bool(l > r)),
        (BinaryOp::Ge, Int(l), Int(r)) => Ok(Bool(l >= r)),
        (BinaryOp::Lt, Str(l), Str(r)) => Ok(Bool(l < r)),
        (BinaryOp::Le, Str(l), Str(r)) => Ok(Bool(l <= r)),
        (BinaryOp::Gt, Str(l), Str(r)) => Ok(Bool(l > r)),
        (BinaryOp::Ge, Str(l), Str(r)) => Ok(Bool(l >= r)),
        (BinaryOp::Add, Int(l), Int(r)) => l.checked_add(r).map(Int).ok_or(ScriptError::Overflow),
        (BinaryOp::Add, Str(l), r) => Ok(Str(format!("{l}{r}"))),
        (BinaryOp::Add, l, Str(r)) => Ok(Str(format!("{l}{r}"))),
        (BinaryOp::Sub, Int(l), Int(r)) => l.checked_sub(r).map(Int).ok_or(ScriptError::Overflow),
        (BinaryOp::Mul, Int(l), Int(r)) => l.checked_mul(r).map(Int).ok_or(ScriptError::Overflow),
        (BinaryOp::Div | BinaryOp::Rem, Int(_), Int(0)) => Err(ScriptError::DivisionByZero),
        (BinaryOp::Div, Int(l), Int(r)) => l.checked_div(r).map(Int).ok_or(ScriptError::Overflow),
        (BinaryOp::Rem, Int(l), Int(r)) => l.checked_rem(r).map(Int).ok_or(ScriptError::Overflow),
        (op, l, r) => Err(ScriptError::Type(format!(
            "{op:?} is not defined for {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

/// Built-in functions reading game state.
fn call(name: &str, args: &[ScriptValue], ctx: &EvalContext<'_>) -> Result<ScriptValue, ScriptError> {
    match name {
        "switch" | "$gameSwitches.value" => {
            let [id] = expect_args::<1>(name, args, "1")?;
            Ok(ScriptValue::Bool(ctx.state.switch(as_id(name, id)?)))
        },
        "variable" | "$gameVariables.value" => {
            let [id] = expect_args::<1>(name, args, "1")?;
            Ok(ScriptValue::Int(ctx.state.variable(as_id(name, id)?)))
        },
        "self_switch" => {
            let key = match args {
                [letter] => SelfSwitchKey::new(ctx.map_id, ctx.event_id, as_text(name, letter)?),
                [map_id, event_id, letter] => SelfSwitchKey::new(
                    as_id(name, map_id)?,
                    as_id(name, event_id)?,
                    as_text(name, letter)?,
                ),
                _ => {
                    return Err(ScriptError::Arity {
                        name: name.to_string(),
                        expected: "1 or 3",
                        found: args.len(),
                    });
                },
            };
            Ok(ScriptValue::Bool(ctx.state.self_switch(&key)))
        },
        "has_item" => {
            let [id] = expect_args::<1>(name, args, "1")?;
            Ok(ScriptValue::Bool(ctx.state.has_item(as_id(name, id)?)))
        },
        "in_party" => {
            let [id] = expect_args::<1>(name, args, "1")?;
            Ok(ScriptValue::Bool(ctx.state.party_actor_ids().contains(&as_id(name, id)?)))
        },
        "party_size" => {
            expect_args::<0>(name, args, "0")?;
            let size = i64::try_from(ctx.state.party_actor_ids().len()).map_err(|_| ScriptError::Overflow)?;
            Ok(ScriptValue::Int(size))
        },
        other => Err(ScriptError::UnknownFunction(other.to_string())),
    }
}

fn expect_args<'a, const N: usize>(
    name: &str,
    args: &'a [ScriptValue],
    expected: &'static str,
) -> Result<&'a [ScriptValue; N], ScriptError> {
    args.try_into().map_err(|_| ScriptError::Arity {
        name: name.to_string(),
        expected,
        found: args.len(),
    })
}

fn as_id(name: &str, value: &ScriptValue) -> Result<i32, ScriptError> {
    match value {
        ScriptValue::Int(n) => {
            i32::try_from(*n).map_err(|_| ScriptError::Type(format!("'{name}': id {n} is out of range")))
        },
        other => Err(ScriptError::Type(format!(
            "'{name}' expects an integer id, got a {}",
            other.type_name()
        ))),
    }
}

fn as_text(name: &str, value: &ScriptValue) -> Result<String, ScriptError> {
    match value {
        ScriptValue::Str(s) => Ok(s.clone()),
        other => Err(ScriptError::Type(format!(
            "'{name}' expects a letter, got a {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameSnapshot;

    fn run(body: &str, state: &GameSnapshot) -> Result<Option<ScriptValue>, ScriptError> {
        let ctx = EvalContext::new(1, 2, state);
        PageScript::new().run(body, &ctx)
    }

    #[test]
    fn bodies_are_compiled_once() {
        let mut state = GameSnapshot::new();
        let scripts = PageScript::new();
        let body = "return switch(4)";
        assert_eq!(scripts.run(body, &EvalContext::new(1, 2, &state)), Ok(Some(ScriptValue::Bool(false))));
        state.set_switch(4, true);
        assert_eq!(scripts.run(body, &EvalContext::new(1, 2, &state)), Ok(Some(ScriptValue::Bool(true))));
        assert_eq!(scripts.compiled.borrow().len(), 1);

        assert!(scripts.run("return (", &EvalContext::new(1, 2, &state)).is_err());
        assert_eq!(scripts.compiled.borrow().len(), 1);
    }

    fn truthy(body: &str, state: &GameSnapshot) -> bool {
        run(body, state)
            .expect("script runs")
            .is_some_and(|v| v.is_truthy())
    }

    #[test]
    fn body_without_return_has_no_value() {
        let state = GameSnapshot::new();
        assert_eq!(run("switch(1);", &state), Ok(None));
        assert_eq!(run("", &state), Ok(None));
    }

    #[test]
    fn bare_return_is_null() {
        let state = GameSnapshot::new();
        assert_eq!(run("return;", &state), Ok(Some(ScriptValue::Null)));
    }

    #[test]
    fn first_return_wins() {
        let state = GameSnapshot::new();
        assert_eq!(run("return 1; return 2;", &state), Ok(Some(ScriptValue::Int(1))));
    }

    #[test]
    fn reads_switches_variables_and_self_switches() {
        let mut state = GameSnapshot::new();
        state.set_switch(3, true);
        state.set_variable(10, 50);
        state.set_self_switch(SelfSwitchKey::new(1, 2, "A"), true);
        state.set_self_switch(SelfSwitchKey::new(4, 5, "B"), true);
        assert!(truthy("return switch(3) && variable(10) >= 50;", &state));
        assert!(truthy("return $gameVariables.value(10) === 50", &state));
        assert!(truthy("return self_switch('A');", &state));
        assert!(truthy("return self_switch(4, 5, \"B\");", &state));
        assert!(!truthy("return self_switch(\"B\");", &state));
    }

    #[test]
    fn reads_inventory_and_party() {
        let mut state = GameSnapshot::new();
        state.gain_item(7, 1);
        state.add_actor(1);
        state.add_actor(2);
        assert!(truthy("return has_item(7) && in_party(2) && party_size() == 2;", &state));
        assert!(!truthy("return in_party(3);", &state));
    }

    #[test]
    fn logical_operators_return_operands() {
        let state = GameSnapshot::new();
        assert_eq!(run("return 0 || 'x';", &state), Ok(Some(ScriptValue::Str("x".into()))));
        assert_eq!(run("return 0 && unknown();", &state), Ok(Some(ScriptValue::Int(0))));
    }

    #[test]
    fn equality_does_not_coerce() {
        let state = GameSnapshot::new();
        assert!(!truthy("return 1 == '1';", &state));
        assert!(truthy("return null === null;", &state));
    }

    #[test]
    fn arithmetic_and_string_concatenation() {
        let state = GameSnapshot::new();
        assert_eq!(run("return -7 / 2 + 10 % 4;", &state), Ok(Some(ScriptValue::Int(-1))));
        assert_eq!(run("return 'v' + 3;", &state), Ok(Some(ScriptValue::Str("v3".into()))));
    }

    #[test]
    fn faults_are_reported() {
        let state = GameSnapshot::new();
        assert_eq!(
            run("return unknown(1);", &state),
            Err(ScriptError::UnknownFunction("unknown".into()))
        );
        assert_eq!(run("return 1 / 0;", &state), Err(ScriptError::DivisionByZero));
        assert!(matches!(run("return switch();", &state), Err(ScriptError::Arity { .. })));
        assert!(matches!(run("return switch('a');", &state), Err(ScriptError::Type(_))));
        assert!(matches!(run("return true < 1;", &state), Err(ScriptError::Type(_))));
        assert!(matches!(run("return (", &state), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn truthiness_rules() {
        assert!(!ScriptValue::Int(0).is_truthy());
        assert!(!ScriptValue::Str(String::new()).is_truthy());
        assert!(!ScriptValue::Null.is_truthy());
        assert!(ScriptValue::Str("0".into()).is_truthy());
        assert!(ScriptValue::Int(-1).is_truthy());
        assert!(ScriptValue::Null.is_null());
    }
}
