//! Evaluation of a page's [`ConditionRecord`] against live game state.
//!
//! Categories run in a fixed order and the first failing one decides the result:
//! self-switches, switches, items, actors, variable checks, then predicate scripts.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::record::ConditionRecord;
use crate::script::{ScriptError, ScriptHost};
use crate::state::EvalContext;

/// True if every key resolves to `required`.
///
/// Used once with `true` for a category's "must be on" set and once with `false` for its
/// "must be off" set; both must pass.
pub fn check_polarity<'a, K: 'a>(
    keys: impl IntoIterator<Item = &'a K>,
    required: bool,
    resolve: impl Fn(&K) -> bool,
) -> bool {
    keys.into_iter().all(|key| resolve(key) == required)
}

fn check_pair<K>(on: &BTreeSet<K>, off: &BTreeSet<K>, resolve: impl Fn(&K) -> bool) -> bool {
    check_polarity(on, true, &resolve) && check_polarity(off, false, &resolve)
}

/// Evaluates condition records, running predicates through an injected script host.
#[derive(Clone, Copy)]
pub struct Evaluator<'s> {
    scripts: &'s dyn ScriptHost,
}

impl<'s> Evaluator<'s> {
    pub fn new(scripts: &'s dyn ScriptHost) -> Self {
        Self { scripts }
    }

    /// Returns whether the page is still eligible under its extra conditions.
    ///
    /// # Errors
    /// Faults raised by a predicate script are passed through untouched.
    pub fn evaluate(&self, record: &ConditionRecord, ctx: &EvalContext<'_>) -> Result<bool, ScriptError> {
        if record.locked {
            debug!("event {} page is locked", ctx.event_id);
            return Ok(false);
        }
        if let Some(category) = failing_flag_category(record, ctx) {
            debug!("event {} fails {category} conditions", ctx.event_id);
            return Ok(false);
        }
        if !relational_checks_pass(record, ctx) {
            debug!("event {} fails variable conditions", ctx.event_id);
            return Ok(false);
        }
        for body in &record.predicates {
            let passed = self.scripts.run(body, ctx)?.is_some_and(|value| value.is_truthy());
            if !passed {
                debug!("event {} fails script condition `{body}`", ctx.event_id);
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// First ON/OFF category that fails, if any.
fn failing_flag_category(record: &ConditionRecord, ctx: &EvalContext<'_>) -> Option<&'static str> {
    let state = ctx.state;

    if !check_pair(&record.self_switches_on, &record.self_switches_off, |key| {
        state.self_switch(key)
    }) {
        return Some("self switch");
    }

    if !check_pair(&record.switches_on, &record.switches_off, |id| state.switch(*id)) {
        return Some("switch");
    }

    let known = |id: &&i32| state.item_exists(**id);
    let holds = |id: &i32| state.has_item(*id);
    if !(check_polarity(record.items_present.iter().filter(known), true, holds)
        && check_polarity(record.items_absent.iter().filter(known), false, holds))
    {
        return Some("item");
    }

    if !(record.actors_in_party.is_empty() && record.actors_absent.is_empty()) {
        let party = state.party_actor_ids();
        if !check_pair(&record.actors_in_party, &record.actors_absent, |id| party.contains(id)) {
            return Some("actor");
        }
    }

    None
}

fn relational_checks_pass(record: &ConditionRecord, ctx: &EvalContext<'_>) -> bool {
    for check in &record.relational_checks {
        let live = ctx.state.variable(check.variable_id);
        match check.holds(live) {
            Some(true) => {},
            Some(false) => return false,
            None => warn!(
                "unknown operator '{}' in variable condition on variable {}; ignoring it",
                check.operator, check.variable_id
            ),
        }
    }
    true
}
