//! Game state -- the read-only view conditions are evaluated against.
//!
//! The host owns switches, variables, inventory and the party roster. The engine only
//! reads them through [`GameState`]. [`GameSnapshot`] is a plain in-memory implementation
//! used by the probe tool and by tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one self-switch: a per-event, per-letter flag on a given map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelfSwitchKey {
    pub map_id: i32,
    pub event_id: i32,
    pub letter: String,
}

impl SelfSwitchKey {
    pub fn new(map_id: i32, event_id: i32, letter: impl Into<String>) -> Self {
        Self {
            map_id,
            event_id,
            letter: letter.into(),
        }
    }
}

impl fmt::Display for SelfSwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.map_id, self.event_id, self.letter)
    }
}

/// Accessors for the live game state consulted during page evaluation.
pub trait GameState {
    /// Value of a global switch. Unset switches are OFF.
    fn switch(&self, id: i32) -> bool;

    /// Value of a self-switch. Unset self-switches are OFF.
    fn self_switch(&self, key: &SelfSwitchKey) -> bool;

    /// Value of a game variable. Unset variables are 0.
    fn variable(&self, id: i32) -> i64;

    /// True if the party holds at least one of the item.
    fn has_item(&self, id: i32) -> bool;

    /// True if the item database knows this id. Unknown items are never checked.
    fn item_exists(&self, _id: i32) -> bool {
        true
    }

    /// Actor ids of every party member.
    fn party_actor_ids(&self) -> HashSet<i32>;
}

/// Transient view used for one evaluation: live state plus the event being evaluated.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub map_id: i32,
    pub event_id: i32,
    pub state: &'a dyn GameState,
}

impl<'a> EvalContext<'a> {
    pub fn new(map_id: i32, event_id: i32, state: &'a dyn GameState) -> Self {
        Self {
            map_id,
            event_id,
            state,
        }
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("map_id", &self.map_id)
            .field("event_id", &self.event_id)
            .finish_non_exhaustive()
    }
}

/// Serializable in-memory game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Ids of switches that are ON.
    #[serde(default)]
    pub switches: BTreeSet<i32>,
    #[serde(default)]
    pub variables: BTreeMap<i32, i64>,
    /// Self-switches that are ON.
    #[serde(default)]
    pub self_switches: BTreeSet<SelfSwitchKey>,
    /// Item id to quantity held.
    #[serde(default)]
    pub items: BTreeMap<i32, u32>,
    /// Ids present in the item database; `None` treats every id as known.
    #[serde(default)]
    pub item_database: Option<BTreeSet<i32>>,
    /// Party roster in marching order.
    #[serde(default)]
    pub party: Vec<i32>,
}

impl GameSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_switch(&mut self, id: i32, on: bool) {
        if on {
            self.switches.insert(id);
        } else {
            self.switches.remove(&id);
        }
    }

    pub fn set_variable(&mut self, id: i32, value: i64) {
        self.variables.insert(id, value);
    }

    pub fn set_self_switch(&mut self, key: SelfSwitchKey, on: bool) {
        if on {
            self.self_switches.insert(key);
        } else {
            self.self_switches.remove(&key);
        }
    }

    /// Add (or with a negative amount, remove) items, clamping at zero.
    pub fn gain_item(&mut self, id: i32, amount: i64) {
        let held = i64::from(self.items.get(&id).copied().unwrap_or(0));
        let next = u32::try_from((held + amount).max(0)).unwrap_or(u32::MAX);
        if next == 0 {
            self.items.remove(&id);
        } else {
            self.items.insert(id, next);
        }
    }

    pub fn add_actor(&mut self, actor_id: i32) {
        if !self.party.contains(&actor_id) {
            self.party.push(actor_id);
        }
    }

    pub fn remove_actor(&mut self, actor_id: i32) {
        self.party.retain(|id| *id != actor_id);
    }
}

impl GameState for GameSnapshot {
    fn switch(&self, id: i32) -> bool {
        self.switches.contains(&id)
    }

    fn self_switch(&self, key: &SelfSwitchKey) -> bool {
        self.self_switches.contains(key)
    }

    fn variable(&self, id: i32) -> i64 {
        self.variables.get(&id).copied().unwrap_or(0)
    }

    fn has_item(&self, id: i32) -> bool {
        self.items.get(&id).is_some_and(|count| *count > 0)
    }

    fn item_exists(&self, id: i32) -> bool {
        self.item_database.as_ref().is_none_or(|known| known.contains(&id))
    }

    fn party_actor_ids(&self) -> HashSet<i32> {
        self.party.iter().copied().collect()
    }
}
