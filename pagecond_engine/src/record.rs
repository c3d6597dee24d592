//! record.rs -- the canonical condition record of a page
//!
//! A `ConditionRecord` is built once per page from its plugin commands and then only read.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::SelfSwitchKey;

/// Comparison applied between a live variable value and a stored comparand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationalOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Authored symbol that matched no known operator; reported when evaluated.
    Unrecognized(String),
}

impl RelationalOp {
    /// Map an authored operator symbol (`===`, `!==`, `<`, `<=`, `>`, `>=`).
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim() {
            "===" => Self::Eq,
            "!==" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Eq => "===",
            Self::Ne => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Unrecognized(symbol) => symbol,
        }
    }

    /// Compare `live` against `comparand`; `None` for an unrecognized operator.
    pub fn compare(&self, live: i64, comparand: i64) -> Option<bool> {
        match self {
            Self::Eq => Some(live == comparand),
            Self::Ne => Some(live != comparand),
            Self::Lt => Some(live < comparand),
            Self::Le => Some(live <= comparand),
            Self::Gt => Some(live > comparand),
            Self::Ge => Some(live >= comparand),
            Self::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for RelationalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `variable(variable_id) <operator> comparand`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationalCheck {
    pub variable_id: i32,
    pub operator: RelationalOp,
    /// `None` when the authored value is not a number. Such a check equals nothing,
    /// so only `!==` holds.
    pub comparand: Option<i64>,
}

impl RelationalCheck {
    /// Whether the check holds for the live variable value; `None` for an unrecognized operator.
    pub fn holds(&self, live: i64) -> Option<bool> {
        match (self.comparand, &self.operator) {
            (Some(comparand), op) => op.compare(live, comparand),
            (None, RelationalOp::Unrecognized(_)) => None,
            (None, op) => Some(*op == RelationalOp::Ne),
        }
    }
}

impl fmt::Display for RelationalCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.comparand {
            Some(comparand) => write!(f, "variable {} {} {comparand}", self.variable_id, self.operator),
            None => write!(f, "variable {} {} <not a number>", self.variable_id, self.operator),
        }
    }
}

/// Extra conditions declared on one page.
///
/// Set-valued fields are deduplicated and unordered; `relational_checks` and `predicates`
/// keep first-declaration order. A key present in both halves of an ON/OFF pair is kept
/// as is and simply makes the page unsatisfiable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRecord {
    /// The page can never activate; every other field is left empty.
    pub locked: bool,
    pub self_switches_on: BTreeSet<SelfSwitchKey>,
    pub self_switches_off: BTreeSet<SelfSwitchKey>,
    pub switches_on: BTreeSet<i32>,
    pub switches_off: BTreeSet<i32>,
    pub items_present: BTreeSet<i32>,
    pub items_absent: BTreeSet<i32>,
    pub actors_in_party: BTreeSet<i32>,
    pub actors_absent: BTreeSet<i32>,
    pub relational_checks: Vec<RelationalCheck>,
    pub predicates: Vec<String>,
}

impl ConditionRecord {
    /// A record for a page that must never activate.
    pub fn locked() -> Self {
        Self {
            locked: true,
            ..Self::default()
        }
    }

    /// True if the record imposes no condition at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of individual conditions held (0 for a locked record).
    pub fn condition_count(&self) -> usize {
        self.self_switches_on.len()
            + self.self_switches_off.len()
            + self.switches_on.len()
            + self.switches_off.len()
            + self.items_present.len()
            + self.items_absent.len()
            + self.actors_in_party.len()
            + self.actors_absent.len()
            + self.relational_checks.len()
            + self.predicates.len()
    }
}
