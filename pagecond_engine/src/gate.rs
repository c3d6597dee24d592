//! Activation gate.
//!
//! Wraps the host's native page predicate. Native conditions are always checked first;
//! extra conditions only apply to events whose note carries the configured tag.

use log::trace;

use crate::config::Config;
use crate::evaluate::Evaluator;
use crate::extract::extract;
use crate::host::{MapEvent, Page};
use crate::record::ConditionRecord;
use crate::script::{PageScript, ScriptError, ScriptHost};
use crate::state::{EvalContext, GameState};

/// Configuration and script host shared by every gated page check.
pub struct ExtraConditions {
    config: Config,
    tag: String,
    scripts: Box<dyn ScriptHost>,
}

impl ExtraConditions {
    /// Use the bundled [`PageScript`] host for predicates.
    pub fn new(config: Config) -> Self {
        Self::with_script_host(config, Box::new(PageScript::new()))
    }

    pub fn with_script_host(config: Config, scripts: Box<dyn ScriptHost>) -> Self {
        let tag = config.normalized_tag();
        Self { config, tag, scripts }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True if an event with this note opts in to extra conditions.
    pub fn applies_to(&self, note: &str) -> bool {
        note.trim().to_lowercase().contains(&self.tag)
    }

    /// The page's condition record, extracted on first use and cached on the page.
    pub fn record_for<'p>(&self, event: &MapEvent, page: &'p Page) -> &'p ConditionRecord {
        page.record_or_build(|| extract(&self.config.plugin_name, page.list(), event.map_id, event.id))
    }

    /// Evaluate the page's extra conditions only (native conditions are not consulted).
    ///
    /// # Errors
    /// Predicate script faults.
    pub fn evaluate(&self, event: &MapEvent, page: &Page, state: &dyn GameState) -> Result<bool, ScriptError> {
        let record = self.record_for(event, page);
        let ctx = EvalContext::new(event.map_id, event.id, state);
        Evaluator::new(self.scripts.as_ref()).evaluate(record, &ctx)
    }
}

/// Compose the host's native page predicate with extra conditions.
///
/// The returned predicate is a drop-in replacement for `native`: it returns `false`
/// whenever `native` does, `true` for untagged events whenever `native` does, and
/// otherwise the verdict of the page's extra conditions.
pub fn with_extra_conditions<'a, N>(
    native: N,
    extra: &'a ExtraConditions,
) -> impl Fn(&MapEvent, &Page, &dyn GameState) -> Result<bool, ScriptError> + 'a
where
    N: Fn(&MapEvent, &Page, &dyn GameState) -> bool + 'a,
{
    move |event: &MapEvent, page: &Page, state: &dyn GameState| {
        if !native(event, page, state) {
            return Ok(false);
        }
        if !extra.applies_to(&event.note) {
            trace!("event {} is untagged; native result stands", event.id);
            return Ok(true);
        }
        extra.evaluate(event, page, state)
    }
}
