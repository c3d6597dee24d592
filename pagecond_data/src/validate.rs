use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Structural problem found in a `MapDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateEventId { id: i32 },
    EventIndexMismatch { index: usize, id: i32 },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateEventId { id } => {
                write!(f, "duplicate event id {id}")
            },
            ValidationError::EventIndexMismatch { index, id } => {
                write!(f, "event at index {index} declares id {id}")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate event ids and the native page conditions of a map.
///
/// ```
/// use pagecond_data::{EventDef, MapDef, PageDef, validate_map};
///
/// let map = MapDef {
///     events: vec![None, Some(EventDef { id: 1, pages: vec![PageDef::default()], ..EventDef::default() })],
/// };
/// assert!(validate_map(&map).is_empty());
/// ```
pub fn validate_map(map: &MapDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, event) in map.events.iter().enumerate() {
        let Some(event) = event else { continue };
        if !seen.insert(event.id) {
            errors.push(ValidationError::DuplicateEventId { id: event.id });
        }
        if usize::try_from(event.id).ok() != Some(index) {
            errors.push(ValidationError::EventIndexMismatch { index, id: event.id });
        }
        for (page_index, page) in event.pages.iter().enumerate() {
            let context = format!("event {} page {}", event.id, page_index + 1);
            validate_native_conditions(&page.conditions, &context, &mut errors);
        }
    }

    errors
}

fn validate_native_conditions(c: &NativeConditionsDef, context: &str, errors: &mut Vec<ValidationError>) {
    let checks = [
        (c.switch1_valid, c.switch1_id, "switch 1"),
        (c.switch2_valid, c.switch2_id, "switch 2"),
        (c.variable_valid, c.variable_id, "variable"),
        (c.item_valid, c.item_id, "item"),
        (c.actor_valid, c.actor_id, "actor"),
    ];
    for (valid, id, what) in checks {
        if valid && id <= 0 {
            errors.push(ValidationError::InvalidValue {
                context: format!("{context}: {what} condition enabled with id {id}"),
            });
        }
    }
    if c.self_switch_valid && c.self_switch_ch.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: format!("{context}: self switch condition enabled without a letter"),
        });
    }
}
