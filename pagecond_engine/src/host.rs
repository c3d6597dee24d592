//! Host-side event model: map events, their pages, and page selection.
//!
//! Each runtime [`Page`] owns the lazily built condition record for its instruction list.
//! Pages are rebuilt whenever the map is rebuilt, which discards their records with them.

use std::cell::OnceCell;

use log::{debug, info};
use pagecond_data::{EventDef, InstructionDef, MapDef, NativeConditionsDef, PageDef};

use crate::record::ConditionRecord;
use crate::script::ScriptError;
use crate::state::{GameState, SelfSwitchKey};

/// One event page at runtime.
#[derive(Debug, Clone)]
pub struct Page {
    def: PageDef,
    extra: OnceCell<ConditionRecord>,
}

impl Page {
    pub fn new(def: PageDef) -> Self {
        Self {
            def,
            extra: OnceCell::new(),
        }
    }

    pub fn native_conditions(&self) -> &NativeConditionsDef {
        &self.def.conditions
    }

    pub fn list(&self) -> &[InstructionDef] {
        &self.def.list
    }

    /// The cached condition record, if it has been built.
    pub fn cached_record(&self) -> Option<&ConditionRecord> {
        self.extra.get()
    }

    /// Return the cached record, building it with `build` on first access.
    pub fn record_or_build(&self, build: impl FnOnce() -> ConditionRecord) -> &ConditionRecord {
        self.extra.get_or_init(build)
    }
}

/// A map event with its pages and the page currently in effect.
#[derive(Debug, Clone)]
pub struct MapEvent {
    pub map_id: i32,
    pub id: i32,
    pub name: String,
    pub note: String,
    pub pages: Vec<Page>,
    /// Index of the active page; `None` when no page qualifies.
    pub page_index: Option<usize>,
}

impl MapEvent {
    pub fn from_def(map_id: i32, def: &EventDef) -> Self {
        Self {
            map_id,
            id: def.id,
            name: def.name.clone(),
            note: def.note.clone(),
            pages: def.pages.iter().cloned().map(Page::new).collect(),
            page_index: None,
        }
    }

    /// The active page, if any.
    pub fn page(&self) -> Option<&Page> {
        self.page_index.and_then(|index| self.pages.get(index))
    }

    /// Pick the page to activate: the last page whose conditions are met.
    ///
    /// # Errors
    /// Faults raised by `meets_conditions` (predicate scripts) stop the scan.
    pub fn find_proper_page_index<P>(&self, state: &dyn GameState, meets_conditions: P) -> Result<Option<usize>, ScriptError>
    where
        P: Fn(&MapEvent, &Page, &dyn GameState) -> Result<bool, ScriptError>,
    {
        for (index, page) in self.pages.iter().enumerate().rev() {
            if meets_conditions(self, page, state)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Re-select the active page. Returns true if it changed.
    ///
    /// # Errors
    /// Faults raised by `meets_conditions` (predicate scripts).
    pub fn refresh<P>(&mut self, state: &dyn GameState, meets_conditions: P) -> Result<bool, ScriptError>
    where
        P: Fn(&MapEvent, &Page, &dyn GameState) -> Result<bool, ScriptError>,
    {
        let index = self.find_proper_page_index(state, meets_conditions)?;
        let changed = index != self.page_index;
        if changed {
            debug!("event {} ({}) switches to page {:?}", self.id, self.name, index.map(|i| i + 1));
        }
        self.page_index = index;
        Ok(changed)
    }
}

/// All events of one loaded map.
#[derive(Debug, Clone)]
pub struct GameMap {
    pub map_id: i32,
    pub events: Vec<MapEvent>,
}

impl GameMap {
    /// Build runtime events from a map definition. Null slots are skipped.
    pub fn from_def(map_id: i32, def: &MapDef) -> Self {
        let events: Vec<MapEvent> = def
            .events
            .iter()
            .flatten()
            .map(|event| MapEvent::from_def(map_id, event))
            .collect();
        info!("map {map_id} built with {} event(s)", events.len());
        Self { map_id, events }
    }

    pub fn event(&self, id: i32) -> Option<&MapEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Refresh every event. Returns the ids of events whose page changed.
    ///
    /// # Errors
    /// The first predicate fault aborts the refresh.
    pub fn refresh<P>(&mut self, state: &dyn GameState, meets_conditions: P) -> Result<Vec<i32>, ScriptError>
    where
        P: Fn(&MapEvent, &Page, &dyn GameState) -> Result<bool, ScriptError>,
    {
        let mut changed = Vec::new();
        for event in &mut self.events {
            if event.refresh(state, &meets_conditions)? {
                changed.push(event.id);
            }
        }
        Ok(changed)
    }
}

/// The host's own page conditions.
///
/// Switches must be ON, the variable at least the given value, the self-switch ON, the item
/// held (an item missing from the database is never held) and the actor in the party.
pub fn native_meets_conditions(event: &MapEvent, page: &Page, state: &dyn GameState) -> bool {
    let c = page.native_conditions();
    if c.switch1_valid && !state.switch(c.switch1_id) {
        return false;
    }
    if c.switch2_valid && !state.switch(c.switch2_id) {
        return false;
    }
    if c.variable_valid && state.variable(c.variable_id) < c.variable_value {
        return false;
    }
    if c.self_switch_valid {
        let key = SelfSwitchKey::new(event.map_id, event.id, c.self_switch_ch.as_str());
        if !state.self_switch(&key) {
            return false;
        }
    }
    if c.item_valid && !(state.item_exists(c.item_id) && state.has_item(c.item_id)) {
        return false;
    }
    if c.actor_valid && !state.party_actor_ids().contains(&c.actor_id) {
        return false;
    }
    true
}
